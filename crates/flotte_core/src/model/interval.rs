//! Date interval value type and its algebra.
//!
//! # Responsibility
//! - Represent activity and engagement date ranges.
//! - Provide the single definition of overlap and containment used by every
//!   scheduling check.
//! - Centralize default semantics for incoming raw ranges.
//!
//! # Invariants
//! - `start <= end` whenever `end` is bounded.
//! - Both bounds are inclusive; `end = None` is unbounded (+infinity).
//! - Values are immutable; updates construct a fresh interval.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Interval construction error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntervalError {
    #[error("interval end {end} is before start {start}")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },
}

/// Closed date range with an optional upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Bounds")]
pub struct Interval {
    start: NaiveDate,
    end: Option<NaiveDate>,
}

#[derive(Deserialize)]
struct Bounds {
    start: NaiveDate,
    end: Option<NaiveDate>,
}

impl TryFrom<Bounds> for Interval {
    type Error = IntervalError;

    fn try_from(bounds: Bounds) -> Result<Self, Self::Error> {
        Self::new(bounds.start, bounds.end)
    }
}

/// Interval fields exactly as supplied by a caller, before defaults apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawInterval {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl RawInterval {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }
}

impl Interval {
    /// Builds an interval, rejecting an end that precedes the start.
    pub fn new(start: NaiveDate, end: Option<NaiveDate>) -> Result<Self, IntervalError> {
        if let Some(end) = end {
            if end < start {
                return Err(IntervalError::EndBeforeStart { start, end });
            }
        }
        Ok(Self { start, end })
    }

    /// Unbounded interval beginning at `start`.
    pub fn open_ended(start: NaiveDate) -> Self {
        Self { start, end: None }
    }

    /// Applies default semantics to a caller-supplied range.
    ///
    /// A missing start becomes `today`; a missing end stays unbounded.
    pub fn normalize(raw: RawInterval, today: NaiveDate) -> Result<Self, IntervalError> {
        Self::new(raw.start.unwrap_or(today), raw.end)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.end
    }

    pub fn is_open_ended(&self) -> bool {
        self.end.is_none()
    }

    /// True iff both intervals share at least one day.
    pub fn overlaps(&self, other: &Interval) -> bool {
        let self_reaches_other = self.end.map_or(true, |end| other.start <= end);
        let other_reaches_self = other.end.map_or(true, |end| self.start <= end);
        self_reaches_other && other_reaches_self
    }

    /// True iff every day of `inner` lies within `self`.
    pub fn contains(&self, inner: &Interval) -> bool {
        if inner.start < self.start {
            return false;
        }
        match (self.end, inner.end) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(outer_end), Some(inner_end)) => inner_end <= outer_end,
        }
    }

    /// True iff `date` lies within the interval.
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.start <= date && self.end.map_or(true, |end| date <= end)
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.end {
            Some(end) => write!(f, "[{}, {}]", self.start, end),
            None => write!(f, "[{}, open)", self.start),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Interval, IntervalError, RawInterval};
    use chrono::NaiveDate;

    fn d(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, month, day).expect("valid test date")
    }

    fn closed(start: NaiveDate, end: NaiveDate) -> Interval {
        Interval::new(start, Some(end)).expect("valid test interval")
    }

    #[test]
    fn new_rejects_end_before_start() {
        let err = Interval::new(d(3, 2), Some(d(3, 1))).unwrap_err();
        assert_eq!(
            err,
            IntervalError::EndBeforeStart {
                start: d(3, 2),
                end: d(3, 1)
            }
        );
    }

    #[test]
    fn single_day_interval_is_valid() {
        let day = closed(d(5, 5), d(5, 5));
        assert!(day.contains_date(d(5, 5)));
        assert!(day.overlaps(&day));
    }

    #[test]
    fn overlap_is_inclusive_at_the_edges() {
        let january = closed(d(1, 1), d(1, 10));
        assert!(january.overlaps(&closed(d(1, 10), d(1, 20))));
        assert!(!january.overlaps(&closed(d(1, 11), d(1, 20))));
    }

    #[test]
    fn overlap_is_symmetric_and_reflexive() {
        let samples = [
            closed(d(1, 1), d(1, 10)),
            closed(d(1, 5), d(1, 20)),
            closed(d(2, 1), d(2, 1)),
            Interval::open_ended(d(1, 15)),
            Interval::open_ended(d(6, 1)),
        ];
        for a in &samples {
            assert!(a.overlaps(a));
            for b in &samples {
                assert_eq!(a.overlaps(b), b.overlaps(a), "{a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn open_ended_intervals_always_overlap_each_other() {
        assert!(Interval::open_ended(d(1, 1)).overlaps(&Interval::open_ended(d(12, 31))));
    }

    #[test]
    fn open_ended_overlaps_only_later_reaching_bounded() {
        let open = Interval::open_ended(d(3, 1));
        assert!(open.overlaps(&closed(d(2, 1), d(3, 1))));
        assert!(!open.overlaps(&closed(d(2, 1), d(2, 28))));
    }

    #[test]
    fn containment_of_bounded_inside_bounded() {
        let year = closed(d(1, 1), d(12, 31));
        assert!(year.contains(&closed(d(2, 1), d(3, 1))));
        assert!(year.contains(&year));
        let spills_into_next_year =
            closed(d(12, 1), NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid test date"));
        assert!(!year.contains(&spills_into_next_year));
    }

    #[test]
    fn bounded_outer_never_contains_open_inner() {
        let year = closed(d(1, 1), d(12, 31));
        assert!(!year.contains(&Interval::open_ended(d(2, 1))));
        assert!(Interval::open_ended(d(1, 1)).contains(&Interval::open_ended(d(2, 1))));
    }

    #[test]
    fn containment_implies_overlap() {
        let outer = closed(d(1, 1), d(6, 30));
        let inners = [
            closed(d(1, 1), d(1, 1)),
            closed(d(3, 3), d(4, 4)),
            closed(d(6, 30), d(6, 30)),
        ];
        for inner in &inners {
            assert!(outer.contains(inner));
            assert!(outer.overlaps(inner));
        }
    }

    #[test]
    fn narrowing_start_excludes_earlier_inner() {
        let narrowed = closed(d(3, 2), d(12, 31));
        assert!(!narrowed.contains(&closed(d(2, 1), d(3, 1))));
    }

    #[test]
    fn display_marks_open_end() {
        assert_eq!(closed(d(1, 1), d(1, 10)).to_string(), "[2024-01-01, 2024-01-10]");
        assert_eq!(Interval::open_ended(d(1, 1)).to_string(), "[2024-01-01, open)");
    }

    #[test]
    fn deserialization_rejects_inverted_bounds() {
        let parsed: Interval =
            serde_json::from_str(r#"{"start":"2024-01-01","end":null}"#).unwrap();
        assert_eq!(parsed, Interval::open_ended(d(1, 1)));

        let inverted = r#"{"start":"2024-02-01","end":"2024-01-01"}"#;
        assert!(serde_json::from_str::<Interval>(inverted).is_err());
    }

    #[test]
    fn normalize_defaults_missing_start_to_today_and_keeps_open_end() {
        let today = d(7, 14);
        let normalized = Interval::normalize(RawInterval::default(), today).unwrap();
        assert_eq!(normalized.start(), today);
        assert!(normalized.is_open_ended());
    }

    #[test]
    fn normalize_validates_bounds_against_defaulted_start() {
        let err = Interval::normalize(RawInterval::new(None, Some(d(7, 1))), d(7, 14)).unwrap_err();
        assert!(matches!(err, IntervalError::EndBeforeStart { .. }));
    }
}
