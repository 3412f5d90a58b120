//! Time slot model.
//!
//! A slot is either a weekly-repeating window (day-of-week plus a
//! minute-of-day range, optionally bounded by a date range) or a one-off
//! window on a single date. Slots serve two purposes: event-level slots
//! restrict where matches may be placed, field rental slots block placement.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

use super::calendar::day_index;
use super::TimeWindow;

/// Minutes in a day; the upper bound for `end_minute`.
pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// An availability (or reservation) window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    /// Unique slot identifier.
    pub id: String,
    /// Day of week, Monday = 0 … Sunday = 6.
    pub day_of_week: u8,
    /// Window start, minutes after midnight.
    pub start_minute: u32,
    /// Window end, minutes after midnight (exclusive).
    pub end_minute: u32,
    /// First date the slot applies (one-off slots: the only date).
    pub start_date: Option<NaiveDate>,
    /// Last date the slot applies (inclusive).
    pub end_date: Option<NaiveDate>,
    /// Weekly recurrence. `false` = one-off on `start_date`.
    pub repeating: bool,
    /// Field the slot is bound to. `None` = any field without dedicated slots.
    pub field_id: Option<String>,
    /// Divisions allowed in the slot. Empty = all divisions.
    pub division_ids: Vec<String>,
    /// Rental price in cents. Not used for scheduling.
    pub price: Option<u32>,
}

impl TimeSlot {
    /// Creates a weekly slot on `day_of_week` between two minute offsets.
    pub fn weekly(id: impl Into<String>, day_of_week: u8, start_minute: u32, end_minute: u32) -> Self {
        Self {
            id: id.into(),
            day_of_week,
            start_minute,
            end_minute,
            start_date: None,
            end_date: None,
            repeating: true,
            field_id: None,
            division_ids: Vec::new(),
            price: None,
        }
    }

    /// Creates a one-off slot on a single date.
    pub fn one_off(id: impl Into<String>, date: NaiveDate, start_minute: u32, end_minute: u32) -> Self {
        Self {
            day_of_week: day_index(date),
            start_date: Some(date),
            end_date: Some(date),
            repeating: false,
            ..Self::weekly(id, 0, start_minute, end_minute)
        }
    }

    /// Binds the slot to a field.
    pub fn with_field(mut self, field_id: impl Into<String>) -> Self {
        self.field_id = Some(field_id.into());
        self
    }

    /// Restricts the slot to a division.
    pub fn with_division(mut self, division_id: impl Into<String>) -> Self {
        self.division_ids.push(division_id.into());
        self
    }

    /// Bounds the recurrence to a date range.
    pub fn with_date_range(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    /// Whether the slot admits a division.
    pub fn serves_division(&self, division_id: &str) -> bool {
        self.division_ids.is_empty() || self.division_ids.iter().any(|d| d == division_id)
    }

    /// Whether the slot's minute range and day are well formed.
    pub fn is_well_formed(&self) -> bool {
        self.day_of_week <= 6
            && self.start_minute < self.end_minute
            && self.end_minute <= MINUTES_PER_DAY
            && match (self.start_date, self.end_date) {
                (Some(s), Some(e)) => s <= e,
                _ => true,
            }
            && (self.repeating || self.start_date.is_some())
    }

    /// Whether the slot occurs on `date`.
    pub fn applies_on(&self, date: NaiveDate) -> bool {
        if !self.repeating {
            return self.start_date == Some(date);
        }
        if day_index(date) != self.day_of_week {
            return false;
        }
        if self.start_date.is_some_and(|s| date < s) {
            return false;
        }
        !self.end_date.is_some_and(|e| date > e)
    }

    /// The concrete window of this slot on `date`, if it occurs then.
    pub fn occurrence_on(&self, date: NaiveDate) -> Option<TimeWindow> {
        if !self.is_well_formed() || !self.applies_on(date) {
            return None;
        }
        let midnight: NaiveDateTime = date.and_hms_opt(0, 0, 0)?;
        Some(TimeWindow::new(
            midnight + TimeDelta::minutes(i64::from(self.start_minute)),
            midnight + TimeDelta::minutes(i64::from(self.end_minute)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[test]
    fn test_weekly_occurrence() {
        let s = TimeSlot::weekly("s", 2, 600, 720); // Wednesdays 10:00-12:00
        assert!(s.occurrence_on(date(3)).is_none());
        let w = s.occurrence_on(date(5)).unwrap();
        assert_eq!(w.start, date(5).and_hms_opt(10, 0, 0).unwrap());
        assert_eq!(w.end, date(5).and_hms_opt(12, 0, 0).unwrap());
    }

    #[test]
    fn test_date_range_bounds() {
        let s = TimeSlot::weekly("s", 0, 600, 720).with_date_range(Some(date(10)), Some(date(17)));
        assert!(!s.applies_on(date(3)));
        assert!(s.applies_on(date(10)));
        assert!(s.applies_on(date(17)));
        assert!(!s.applies_on(date(24)));
    }

    #[test]
    fn test_one_off() {
        let s = TimeSlot::one_off("r", date(4), 60, 120);
        assert_eq!(s.day_of_week, 1);
        assert!(s.applies_on(date(4)));
        assert!(!s.applies_on(date(11)));
    }

    #[test]
    fn test_division_filter() {
        let s = TimeSlot::weekly("s", 0, 0, 60).with_division("u10");
        assert!(s.serves_division("u10"));
        assert!(!s.serves_division("u12"));
        assert!(TimeSlot::weekly("t", 0, 0, 60).serves_division("any"));
    }

    #[test]
    fn test_malformed_slot_never_occurs() {
        let s = TimeSlot::weekly("bad", 0, 720, 600);
        assert!(!s.is_well_formed());
        assert!(s.occurrence_on(date(3)).is_none());
        assert!(!TimeSlot::weekly("day", 7, 0, 60).is_well_formed());
    }
}
