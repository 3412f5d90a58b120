//! Time windows and slot calendars.
//!
//! # Time Model
//! All instants are naive local date-times in the event's own time zone.
//! Durations are in milliseconds.
//!
//! # Precedence
//! A window is placeable on a field iff:
//! - no recurring slots are configured, OR it fits entirely inside a single
//!   occurrence of a slot qualifying for the field and division, AND
//! - it does not overlap a rental occurrence on that field.

use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeDelta, Timelike};
use serde::{Deserialize, Serialize};

use super::TimeSlot;

/// A time interval [start, end).
///
/// Half-open interval: touching windows do not overlap.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TimeWindow {
    /// Interval start (inclusive).
    pub start: NaiveDateTime,
    /// Interval end (exclusive).
    pub end: NaiveDateTime,
}

impl TimeWindow {
    /// Creates a new time window.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// Creates a window of `duration_ms` starting at `start`.
    pub fn starting_at(start: NaiveDateTime, duration_ms: i64) -> Self {
        Self::new(start, add_ms(start, duration_ms))
    }

    /// Duration of this window (ms).
    #[inline]
    pub fn duration_ms(&self) -> i64 {
        (self.end - self.start).num_milliseconds()
    }

    /// Whether an instant falls within this window.
    #[inline]
    pub fn contains(&self, t: NaiveDateTime) -> bool {
        t >= self.start && t < self.end
    }

    /// Whether `other` lies entirely inside this window.
    pub fn covers(&self, other: &Self) -> bool {
        other.start >= self.start && other.end <= self.end
    }

    /// Whether two windows overlap. Back-to-back windows do not.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Shifts both ends by `delta_ms`.
    pub fn shifted(&self, delta_ms: i64) -> Self {
        Self::new(add_ms(self.start, delta_ms), add_ms(self.end, delta_ms))
    }
}

/// Adds milliseconds to an instant.
#[inline]
pub fn add_ms(t: NaiveDateTime, ms: i64) -> NaiveDateTime {
    t + TimeDelta::milliseconds(ms)
}

/// Rounds `t` up to the next multiple of `granularity_minutes` within its day.
///
/// Instants already on a boundary are returned unchanged.
pub fn round_up(t: NaiveDateTime, granularity_minutes: i64) -> NaiveDateTime {
    let step = granularity_minutes.max(1) * 60;
    let secs = i64::from(t.time().num_seconds_from_midnight());
    let nanos = i64::from(t.time().nanosecond());
    let rem = secs % step;
    if rem == 0 && nanos == 0 {
        return t;
    }
    t - TimeDelta::seconds(rem) - TimeDelta::nanoseconds(nanos) + TimeDelta::seconds(step)
}

/// Recurring availability for a set of fields.
///
/// Holds the event's slot list. A field with dedicated slots only uses
/// those; other fields fall back to the field-agnostic slots.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlotCalendar {
    /// Configured slots.
    pub slots: Vec<TimeSlot>,
}

impl SlotCalendar {
    /// Creates a calendar from the given slots.
    pub fn new(slots: Vec<TimeSlot>) -> Self {
        Self { slots }
    }

    /// Whether any slots are configured. Without slots, every instant is available.
    pub fn is_constrained(&self) -> bool {
        !self.slots.is_empty()
    }

    /// Slots applicable to a field and division.
    pub fn slots_for<'a>(&'a self, field_id: &str, division_id: &str) -> Vec<&'a TimeSlot> {
        let dedicated = self
            .slots
            .iter()
            .any(|s| s.field_id.as_deref() == Some(field_id));
        self.slots
            .iter()
            .filter(|s| {
                let field_ok = if dedicated {
                    s.field_id.as_deref() == Some(field_id)
                } else {
                    s.field_id.is_none()
                };
                field_ok && s.serves_division(division_id)
            })
            .collect()
    }

    /// Whether a field has any usable slot for the division.
    pub fn has_slots_for(&self, field_id: &str, division_id: &str) -> bool {
        !self.slots_for(field_id, division_id).is_empty()
    }

    /// Earliest start at or after `from` such that `[start, start + duration)`
    /// fits inside one slot occurrence. Searches `horizon_days` ahead.
    pub fn next_fit(
        &self,
        field_id: &str,
        division_id: &str,
        from: NaiveDateTime,
        duration_ms: i64,
        granularity_minutes: i64,
        horizon_days: i64,
    ) -> Option<NaiveDateTime> {
        let slots = self.slots_for(field_id, division_id);
        if slots.is_empty() {
            return None;
        }
        let first = from.date();
        for offset in 0..=horizon_days.max(0) {
            let date = first + TimeDelta::days(offset);
            let mut windows: Vec<TimeWindow> =
                slots.iter().filter_map(|s| s.occurrence_on(date)).collect();
            windows.sort_by_key(|w| (w.start, w.end));
            for w in windows {
                if w.end <= from {
                    continue;
                }
                let candidate = round_up(from.max(w.start), granularity_minutes);
                if add_ms(candidate, duration_ms) <= w.end {
                    return Some(candidate);
                }
            }
        }
        None
    }

    /// Whether `window` lies inside a single qualifying slot occurrence.
    pub fn covers(&self, field_id: &str, division_id: &str, window: &TimeWindow) -> bool {
        self.slots_for(field_id, division_id).iter().any(|s| {
            s.occurrence_on(window.start.date())
                .is_some_and(|occ| occ.covers(window))
        })
    }
}

/// Finds the latest end of any occurrence of `slots` overlapping `window`.
///
/// Used for rental blocks: returns `None` when the window is free.
pub fn blocking_end(slots: &[TimeSlot], window: &TimeWindow) -> Option<NaiveDateTime> {
    let mut date: NaiveDate = window.start.date() - TimeDelta::days(1);
    let last = window.end.date();
    let mut blocked: Option<NaiveDateTime> = None;
    while date <= last {
        for slot in slots {
            if let Some(occ) = slot.occurrence_on(date) {
                if occ.overlaps(window) {
                    blocked = Some(blocked.map_or(occ.end, |b| b.max(occ.end)));
                }
            }
        }
        date = date + TimeDelta::days(1);
    }
    blocked
}

/// Monday = 0 … Sunday = 6.
pub fn day_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_monday() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        // 2024-06-03 is a Monday.
        NaiveDate::from_ymd_opt(2024, 6, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_time_window() {
        let w = TimeWindow::new(at(3, 9, 0), at(3, 10, 0));
        assert_eq!(w.duration_ms(), 3_600_000);
        assert!(w.contains(at(3, 9, 0)));
        assert!(w.contains(at(3, 9, 59)));
        assert!(!w.contains(at(3, 10, 0))); // exclusive end
    }

    #[test]
    fn test_time_window_overlap() {
        let a = TimeWindow::new(at(3, 9, 0), at(3, 10, 0));
        let b = TimeWindow::new(at(3, 9, 30), at(3, 10, 30));
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));

        let c = TimeWindow::new(at(3, 10, 0), at(3, 11, 0)); // back-to-back
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn test_round_up() {
        assert_eq!(round_up(at(3, 9, 0), 5), at(3, 9, 0));
        assert_eq!(round_up(at(3, 9, 1), 5), at(3, 9, 5));
        assert_eq!(round_up(at(3, 23, 58), 5), at(4, 0, 0));
        let with_secs = at(3, 9, 5) + TimeDelta::seconds(1);
        assert_eq!(round_up(with_secs, 5), at(3, 9, 10));
    }

    #[test]
    fn test_next_fit_weekly_slot() {
        // Mondays 18:00-20:00
        let cal = SlotCalendar::new(vec![TimeSlot::weekly("s1", 0, 18 * 60, 20 * 60)]);
        let hour = 3_600_000;
        assert_eq!(cal.next_fit("f1", "open", at(3, 8, 0), hour, 5, 30), Some(at(3, 18, 0)));
        assert_eq!(cal.next_fit("f1", "open", at(3, 19, 2), hour, 5, 30), Some(at(10, 18, 0)));
        assert_eq!(cal.next_fit("f1", "open", at(3, 18, 2), hour, 5, 30), Some(at(3, 18, 5)));
        // Does not fit in any occurrence.
        assert_eq!(cal.next_fit("f1", "open", at(3, 8, 0), 3 * hour, 5, 30), None);
    }

    #[test]
    fn test_dedicated_slots_shadow_global() {
        let cal = SlotCalendar::new(vec![
            TimeSlot::weekly("global", 0, 8 * 60, 12 * 60),
            TimeSlot::weekly("f2-only", 0, 18 * 60, 20 * 60).with_field("f2"),
        ]);
        assert_eq!(cal.slots_for("f1", "open").len(), 1);
        assert_eq!(cal.slots_for("f2", "open")[0].id, "f2-only");
    }

    #[test]
    fn test_covers() {
        let cal = SlotCalendar::new(vec![TimeSlot::weekly("s1", 0, 18 * 60, 20 * 60)]);
        assert!(cal.covers("f", "d", &TimeWindow::new(at(3, 18, 0), at(3, 20, 0))));
        assert!(!cal.covers("f", "d", &TimeWindow::new(at(3, 19, 0), at(3, 20, 30))));
        assert!(!cal.covers("f", "d", &TimeWindow::new(at(4, 18, 0), at(4, 19, 0))));
    }

    #[test]
    fn test_blocking_end() {
        let rentals = vec![TimeSlot::one_off(
            "r1",
            NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            9 * 60,
            11 * 60,
        )];
        let w = TimeWindow::new(at(3, 10, 0), at(3, 10, 30));
        assert_eq!(blocking_end(&rentals, &w), Some(at(3, 11, 0)));
        let free = TimeWindow::new(at(3, 11, 0), at(3, 12, 0));
        assert_eq!(blocking_end(&rentals, &free), None);
    }
}
