//! Request token to actor resolution.
//!
//! The resolver is called once per request; the resulting `ActorId` is the
//! only identity the lock and audit protocol ever sees.

use crate::error::{CoreError, CoreResult};
use crate::model::entity::ActorId;
use std::collections::HashMap;

/// Actor id used by `DevelopResolver`.
pub const DEVELOP_ACTOR_ID: ActorId = 0;

pub trait ActorResolver: Send + Sync {
    /// Resolves a raw token (with or without `Bearer ` prefix).
    fn resolve_actor(&self, token: &str) -> CoreResult<ActorId>;
}

/// Strips an optional `Bearer ` prefix from an authorization header value.
pub fn strip_bearer(header: &str) -> &str {
    let trimmed = header.trim();
    trimmed
        .strip_prefix("Bearer ")
        .map(str::trim_start)
        .unwrap_or(trimmed)
}

/// Fixed in-memory token table.
#[derive(Debug, Clone, Default)]
pub struct TokenTable {
    tokens: HashMap<String, ActorId>,
}

impl TokenTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>, actor: ActorId) -> Self {
        self.insert(token, actor);
        self
    }

    pub fn insert(&mut self, token: impl Into<String>, actor: ActorId) {
        self.tokens.insert(token.into(), actor);
    }
}

impl ActorResolver for TokenTable {
    fn resolve_actor(&self, token: &str) -> CoreResult<ActorId> {
        let token = strip_bearer(token);
        if token.is_empty() {
            return Err(CoreError::Unauthenticated);
        }
        self.tokens
            .get(token)
            .copied()
            .ok_or(CoreError::Unauthenticated)
    }
}

/// Accepts every request as `DEVELOP_ACTOR_ID`. Local development only.
#[derive(Debug, Clone, Copy, Default)]
pub struct DevelopResolver;

impl ActorResolver for DevelopResolver {
    fn resolve_actor(&self, _token: &str) -> CoreResult<ActorId> {
        Ok(DEVELOP_ACTOR_ID)
    }
}

#[cfg(test)]
mod tests {
    use super::{strip_bearer, ActorResolver, DevelopResolver, TokenTable};
    use crate::error::CoreError;

    #[test]
    fn strip_bearer_handles_prefixed_and_bare_tokens() {
        assert_eq!(strip_bearer("Bearer abc"), "abc");
        assert_eq!(strip_bearer("  Bearer   abc "), "abc");
        assert_eq!(strip_bearer("abc"), "abc");
    }

    #[test]
    fn token_table_resolves_known_tokens_only() {
        let table = TokenTable::new().with_token("alice-token", 1);
        assert_eq!(table.resolve_actor("Bearer alice-token").unwrap(), 1);
        assert!(matches!(
            table.resolve_actor("Bearer mallory"),
            Err(CoreError::Unauthenticated)
        ));
        assert!(matches!(
            table.resolve_actor(""),
            Err(CoreError::Unauthenticated)
        ));
    }

    #[test]
    fn develop_resolver_accepts_anything() {
        assert_eq!(DevelopResolver.resolve_actor("whatever").unwrap(), 0);
    }
}
