//! Identifiers and the catalogue of lockable entity kinds.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Primary key of every fleet record.
pub type RecordId = i64;

/// Authenticated caller, resolved from a request token.
pub type ActorId = i64;

/// Unix epoch milliseconds; the only timestamp representation in storage.
pub type EpochMs = i64;

/// Every mutable entity kind subject to the lock protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    CargoBike,
    Participant,
    EngagementType,
    Engagement,
    WorkshopType,
    Workshop,
    Person,
    ContactInformation,
}

impl EntityKind {
    pub const ALL: [EntityKind; 8] = [
        Self::CargoBike,
        Self::Participant,
        Self::EngagementType,
        Self::Engagement,
        Self::WorkshopType,
        Self::Workshop,
        Self::Person,
        Self::ContactInformation,
    ];

    /// Backing table. Only ever interpolated from this fixed set.
    pub fn table(self) -> &'static str {
        match self {
            Self::CargoBike => "cargo_bikes",
            Self::Participant => "participants",
            Self::EngagementType => "engagement_types",
            Self::Engagement => "engagements",
            Self::WorkshopType => "workshop_types",
            Self::Workshop => "workshops",
            Self::Person => "people",
            Self::ContactInformation => "contact_information",
        }
    }

    /// Name recorded in `action_log.entity`.
    pub fn entity_name(self) -> &'static str {
        match self {
            Self::CargoBike => "CargoBike",
            Self::Participant => "Participant",
            Self::EngagementType => "EngagementType",
            Self::Engagement => "Engagement",
            Self::WorkshopType => "WorkshopType",
            Self::Workshop => "Workshop",
            Self::Person => "Person",
            Self::ContactInformation => "ContactInformation",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.entity_name())
    }
}
