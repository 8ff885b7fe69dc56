//! The global "last N days" selector shared by every page.

use crate::error::{QaHubError, Result};
use std::fmt;
use std::str::FromStr;

/// One of the fixed, selectable date ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DateRange {
    Days7,
    Days15,
    #[default]
    Days30,
    Days60,
    Days90,
}

impl DateRange {
    /// All ranges in ascending order.
    pub fn all() -> &'static [DateRange] {
        &[
            DateRange::Days7,
            DateRange::Days15,
            DateRange::Days30,
            DateRange::Days60,
            DateRange::Days90,
        ]
    }

    pub fn days(self) -> u32 {
        match self {
            DateRange::Days7 => 7,
            DateRange::Days15 => 15,
            DateRange::Days30 => 30,
            DateRange::Days60 => 60,
            DateRange::Days90 => 90,
        }
    }

    pub fn from_days(days: u32) -> Option<DateRange> {
        DateRange::all().iter().copied().find(|r| r.days() == days)
    }

    /// Next longer range, wrapping to the shortest.
    pub fn next(self) -> DateRange {
        let all = DateRange::all();
        let idx = all.iter().position(|r| *r == self).unwrap_or(0);
        all[(idx + 1) % all.len()]
    }

    /// Next shorter range, wrapping to the longest.
    pub fn prev(self) -> DateRange {
        let all = DateRange::all();
        let idx = all.iter().position(|r| *r == self).unwrap_or(0);
        all[(idx + all.len() - 1) % all.len()]
    }

    /// "7, 15, 30, 60, 90", for error messages.
    pub fn allowed_values_label() -> String {
        DateRange::all()
            .iter()
            .map(|r| r.days().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn label(self) -> String {
        format!("Last {} days", self.days())
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.days())
    }
}

impl FromStr for DateRange {
    type Err = QaHubError;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u32>()
            .ok()
            .and_then(DateRange::from_days)
            .ok_or_else(|| {
                QaHubError::Validation(format!(
                    "Invalid date range '{}'. Choose one of: {}",
                    s,
                    DateRange::allowed_values_label()
                ))
            })
    }
}

/// Holds the currently selected range.
///
/// `set` reports whether the value actually changed so callers re-fetch only
/// on a real change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateFilter {
    range: DateRange,
}

impl DateFilter {
    pub fn new(range: DateRange) -> Self {
        Self { range }
    }

    pub fn range(&self) -> DateRange {
        self.range
    }

    pub fn days(&self) -> u32 {
        self.range.days()
    }

    /// Returns `true` if the selection changed.
    pub fn set(&mut self, range: DateRange) -> bool {
        if self.range == range {
            return false;
        }
        self.range = range;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_thirty_days() {
        assert_eq!(DateRange::default(), DateRange::Days30);
        assert_eq!(DateFilter::default().days(), 30);
    }

    #[test]
    fn test_parse_accepts_only_fixed_set() {
        for days in [7, 15, 30, 60, 90] {
            let parsed: DateRange = days.to_string().parse().unwrap();
            assert_eq!(parsed.days(), days);
        }
        for bad in ["0", "14", "365", "-7", "thirty", ""] {
            assert!(bad.parse::<DateRange>().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_next_and_prev_wrap() {
        assert_eq!(DateRange::Days7.next(), DateRange::Days15);
        assert_eq!(DateRange::Days90.next(), DateRange::Days7);
        assert_eq!(DateRange::Days7.prev(), DateRange::Days90);
        assert_eq!(DateRange::Days60.prev(), DateRange::Days30);
    }

    #[test]
    fn test_filter_set_reports_change() {
        let mut filter = DateFilter::default();
        assert!(!filter.set(DateRange::Days30));
        assert!(filter.set(DateRange::Days7));
        assert_eq!(filter.days(), 7);
        assert!(!filter.set(DateRange::Days7));
    }

    #[test]
    fn test_label() {
        assert_eq!(DateRange::Days15.label(), "Last 15 days");
        assert_eq!(DateRange::allowed_values_label(), "7, 15, 30, 60, 90");
    }
}
