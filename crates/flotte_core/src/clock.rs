//! Time source for lock expiry, audit timestamps and interval defaults.

use crate::model::entity::EpochMs;
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

pub trait Clock: Send + Sync {
    /// Current instant in epoch milliseconds.
    fn now_ms(&self) -> EpochMs;

    /// Current calendar day, used as the default interval start.
    fn today(&self) -> NaiveDate {
        date_of(self.now_ms())
    }
}

/// Wall clock in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> EpochMs {
        Utc::now().timestamp_millis()
    }
}

/// Manually driven clock for deterministic expiry tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    pub fn new(now_ms: EpochMs) -> Self {
        Self {
            now_ms: AtomicI64::new(now_ms),
        }
    }

    /// Clock set to midnight UTC of `date`.
    pub fn at_date(date: NaiveDate) -> Self {
        let midnight = date.and_time(chrono::NaiveTime::MIN).and_utc();
        Self::new(midnight.timestamp_millis())
    }

    pub fn set(&self, now_ms: EpochMs) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, delta_ms: EpochMs) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> EpochMs {
        self.now_ms.load(Ordering::SeqCst)
    }
}

fn date_of(epoch_ms: EpochMs) -> NaiveDate {
    DateTime::<Utc>::from_timestamp_millis(epoch_ms)
        .map(|instant| instant.date_naive())
        .unwrap_or(NaiveDate::MIN)
}

#[cfg(test)]
mod tests {
    use super::{Clock, ManualClock};
    use chrono::NaiveDate;

    #[test]
    fn manual_clock_advances_and_tracks_the_day() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let clock = ManualClock::at_date(day);
        assert_eq!(clock.today(), day);

        clock.advance_ms(24 * 60 * 60 * 1000);
        assert_eq!(clock.today(), day.succ_opt().unwrap());

        clock.set(0);
        assert_eq!(clock.now_ms(), 0);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(1970, 1, 1).unwrap());
    }
}
