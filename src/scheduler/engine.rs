//! Resource-constrained placement engine.
//!
//! # Algorithm
//!
//! For an item of a given duration:
//! 1. Earliest start = max(clock, latest dependency end + its buffer),
//!    rounded up to the configured granularity.
//! 2. For every field serving the item's division, walk forward from the
//!    earliest start: align to the next slot occurrence that fits the whole
//!    duration (when slots are configured), then jump past any overlapping
//!    booking or rental until the interval is free. Bookings of the item's
//!    participants block the interval on every field.
//! 3. Pick the earliest start; ties go to the field with the fewest
//!    bookings, then to field order (number, id).
//!
//! # Complexity
//! O(f * b) per placement, where f = candidate fields, b = bookings per field.

use chrono::{NaiveDateTime, TimeDelta};
use std::collections::HashMap;
use tracing::debug;

use crate::config::SchedulerConfig;
use crate::error::{Result, SchedulingError};
use crate::models::{
    add_ms, blocking_end, round_up, DependencyGraph, Event, Schedulable, SlotCalendar, TimeSlot,
    TimeWindow,
};

/// Where and when an item was placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// Assigned field.
    pub field_id: String,
    /// Assigned interval.
    pub window: TimeWindow,
}

#[derive(Debug, Clone)]
struct Booking {
    key: String,
    window: TimeWindow,
}

#[derive(Debug, Clone)]
struct FieldLane {
    id: String,
    number: u32,
    division_ids: Vec<String>,
    rentals: Vec<TimeSlot>,
    bookings: Vec<Booking>,
}

impl FieldLane {
    fn serves(&self, division_id: &str) -> bool {
        self.division_ids.is_empty() || self.division_ids.iter().any(|d| d == division_id)
    }

    fn conflict_end(&self, window: &TimeWindow) -> Option<NaiveDateTime> {
        let booked = self
            .bookings
            .iter()
            .filter(|b| b.window.overlaps(window))
            .map(|b| b.window.end)
            .max();
        let rented = blocking_end(&self.rentals, window);
        booked.max(rented)
    }
}

/// Places matches onto fields and times.
///
/// Holds the committed state of one scheduling pass: a clock that only
/// moves forward, per-field bookings and per-participant bookings.
#[derive(Debug, Clone)]
pub struct Scheduler {
    config: SchedulerConfig,
    clock: NaiveDateTime,
    lanes: Vec<FieldLane>,
    calendar: SlotCalendar,
    division_fields: HashMap<String, Vec<String>>,
    participants: HashMap<String, Vec<Booking>>,
}

impl Scheduler {
    /// Creates a scheduler for an event's fields, slots and window.
    ///
    /// Fails with a configuration error when the event has no fields.
    pub fn for_event(event: &Event, config: &SchedulerConfig) -> Result<Self> {
        if event.fields.is_empty() {
            return Err(SchedulingError::NoFieldsConfigured);
        }
        let mut lanes: Vec<FieldLane> = event
            .fields
            .values()
            .map(|f| FieldLane {
                id: f.id.clone(),
                number: f.number,
                division_ids: f.division_ids.clone(),
                rentals: f.rental_slots.clone(),
                bookings: Vec::new(),
            })
            .collect();
        lanes.sort_by(|a, b| a.number.cmp(&b.number).then(a.id.cmp(&b.id)));

        let division_fields = event
            .divisions
            .iter()
            .filter(|d| !d.field_ids.is_empty())
            .map(|d| (d.id.clone(), d.field_ids.clone()))
            .collect();

        Ok(Self {
            config: config.clone(),
            clock: round_up(event.start, config.granularity_minutes),
            lanes,
            calendar: SlotCalendar::new(event.time_slots.clone()),
            division_fields,
            participants: HashMap::new(),
        })
    }

    /// Current clock.
    pub fn current_time(&self) -> NaiveDateTime {
        self.clock
    }

    /// Moves the clock forward to `t` (never backwards).
    pub fn advance_to(&mut self, t: NaiveDateTime) {
        let t = round_up(t, self.config.granularity_minutes);
        if t > self.clock {
            self.clock = t;
        }
    }

    /// Whether recurring slots constrain placement.
    pub fn has_time_slots(&self) -> bool {
        self.calendar.is_constrained()
    }

    /// Number of items booked on a field.
    pub fn field_load(&self, field_id: &str) -> usize {
        self.lanes
            .iter()
            .find(|l| l.id == field_id)
            .map_or(0, |l| l.bookings.len())
    }

    /// Fields eligible for a division, in tie-break order.
    pub fn fields_for_division(&self, division_id: &str) -> Vec<&str> {
        self.candidate_lanes(division_id)
            .into_iter()
            .map(|i| self.lanes[i].id.as_str())
            .collect()
    }

    fn candidate_lanes(&self, division_id: &str) -> Vec<usize> {
        let allow = self.division_fields.get(division_id);
        self.lanes
            .iter()
            .enumerate()
            .filter(|(_, lane)| lane.serves(division_id))
            .filter(|(_, lane)| allow.map_or(true, |ids| ids.iter().any(|id| *id == lane.id)))
            .filter(|(_, lane)| {
                !self.calendar.is_constrained() || self.calendar.has_slots_for(&lane.id, division_id)
            })
            .map(|(i, _)| i)
            .collect()
    }

    /// Earliest start allowed by the clock and by the item's dependencies.
    pub fn earliest_start<G: DependencyGraph>(&self, graph: &G, key: &str) -> NaiveDateTime {
        let ready = graph
            .dependencies(key)
            .iter()
            .filter_map(|d| d.window().map(|w| add_ms(w.end, d.buffer_ms())))
            .max();
        let t = ready.map_or(self.clock, |r| r.max(self.clock));
        round_up(t, self.config.granularity_minutes)
    }

    /// Places `key` for `duration_ms` and books the chosen field.
    ///
    /// The caller applies the returned placement to its own item.
    pub fn schedule_event<G: DependencyGraph>(
        &mut self,
        graph: &G,
        key: &str,
        duration_ms: i64,
    ) -> Result<Placement> {
        let node = graph
            .node(key)
            .ok_or_else(|| SchedulingError::UnknownMatch(key.to_string()))?;
        let division = node.division_id().to_string();
        let lanes = self.candidate_lanes(&division);
        if lanes.is_empty() {
            return Err(SchedulingError::NoFieldsForDivision { division });
        }
        let participants: Vec<String> = node.participant_ids().into_iter().map(str::to_string).collect();
        let earliest = self.earliest_start(graph, key);

        // (start, load, field order, lane index); the first three order candidates.
        let mut best: Option<(NaiveDateTime, usize, usize, usize)> = None;
        for (order, idx) in lanes.into_iter().enumerate() {
            let Some(start) = self.first_fit(idx, &division, &participants, earliest, duration_ms) else {
                continue;
            };
            let candidate = (start, self.lanes[idx].bookings.len(), order, idx);
            if best.map_or(true, |b| (candidate.0, candidate.1, candidate.2) < (b.0, b.1, b.2)) {
                best = Some(candidate);
            }
        }
        let (start, _, _, idx) = best.ok_or(SchedulingError::NoSlotAvailable {
            division: division.clone(),
            duration_ms,
        })?;

        let window = TimeWindow::starting_at(start, duration_ms);
        let lane = &mut self.lanes[idx];
        lane.bookings.push(Booking {
            key: key.to_string(),
            window,
        });
        debug!(key, field = %lane.id, start = %window.start, "placed");
        Ok(Placement {
            field_id: lane.id.clone(),
            window,
        })
    }

    fn first_fit(
        &self,
        lane_idx: usize,
        division_id: &str,
        participants: &[String],
        from: NaiveDateTime,
        duration_ms: i64,
    ) -> Option<NaiveDateTime> {
        let lane = &self.lanes[lane_idx];
        let granularity = self.config.granularity_minutes;
        let horizon = from + TimeDelta::days(self.config.slot_search_days);
        let mut t = round_up(from, granularity);
        loop {
            if t > horizon {
                return None;
            }
            if self.calendar.is_constrained() {
                let days_left = (horizon - t).num_days().max(0);
                t = self
                    .calendar
                    .next_fit(&lane.id, division_id, t, duration_ms, granularity, days_left)?;
            }
            let window = TimeWindow::starting_at(t, duration_ms);
            let busy = participants
                .iter()
                .filter_map(|p| self.participant_conflict_end(p, &window))
                .max();
            match lane.conflict_end(&window).max(busy) {
                Some(end) => t = round_up(end.max(add_ms(t, 1)), granularity),
                None => return Some(t),
            }
        }
    }

    /// Records an existing placement (e.g. a locked match) without searching.
    ///
    /// Returns `false` if the field is unknown to this scheduler.
    pub fn commit(&mut self, field_id: &str, key: &str, window: TimeWindow) -> bool {
        match self.lanes.iter_mut().find(|l| l.id == field_id) {
            Some(lane) => {
                lane.bookings.push(Booking {
                    key: key.to_string(),
                    window,
                });
                true
            }
            None => false,
        }
    }

    /// Removes every field and participant booking for `key`.
    pub fn release(&mut self, key: &str) {
        for lane in &mut self.lanes {
            lane.bookings.retain(|b| b.key != key);
        }
        for bookings in self.participants.values_mut() {
            bookings.retain(|b| b.key != key);
        }
    }

    /// Books a participant (team or official) for `key`'s interval.
    pub fn book_participant(&mut self, participant_id: &str, key: &str, window: TimeWindow) {
        self.participants
            .entry(participant_id.to_string())
            .or_default()
            .push(Booking {
                key: key.to_string(),
                window,
            });
    }

    /// Whether a participant has no booking overlapping `window`.
    pub fn is_participant_free(&self, participant_id: &str, window: &TimeWindow) -> bool {
        self.participants
            .get(participant_id)
            .map_or(true, |bookings| bookings.iter().all(|b| !b.window.overlaps(window)))
    }

    fn participant_conflict_end(&self, participant_id: &str, window: &TimeWindow) -> Option<NaiveDateTime> {
        self.participants
            .get(participant_id)?
            .iter()
            .filter(|b| b.window.overlaps(window))
            .map(|b| b.window.end)
            .max()
    }

    /// Filters `candidates` down to those free during `window`, keeping order.
    pub fn available_participants<'a>(
        &self,
        candidates: impl IntoIterator<Item = &'a str>,
        window: &TimeWindow,
    ) -> Vec<&'a str> {
        candidates
            .into_iter()
            .filter(|id| self.is_participant_free(id, window))
            .collect()
    }

    /// Whether `window` on `field_id` lies inside a configured slot.
    ///
    /// Always `true` when no slots are configured.
    pub fn slot_covers(&self, field_id: &str, division_id: &str, window: &TimeWindow) -> bool {
        !self.calendar.is_constrained() || self.calendar.covers(field_id, division_id, window)
    }
}
