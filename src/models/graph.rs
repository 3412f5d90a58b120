//! Navigation contracts consumed by the scheduler.
//!
//! The scheduler never touches `Match` directly. It works with anything
//! that can report its division, interval and rest buffer
//! ([`Schedulable`]) and a container that can walk dependencies
//! ([`DependencyGraph`]).

use super::{Match, MatchTable, TimeWindow};

/// An item the scheduler can place.
pub trait Schedulable {
    /// Stable key.
    fn key(&self) -> &str;
    /// Division used to select resources and slots.
    fn division_id(&self) -> &str;
    /// Current placement, if any.
    fn window(&self) -> Option<TimeWindow>;
    /// Rest required after this item before dependants start (ms).
    fn buffer_ms(&self) -> i64;
    /// Resource the item is bound to.
    fn resource_id(&self) -> Option<&str>;
    /// Pinned items are never moved.
    fn is_locked(&self) -> bool;
    /// Participants that must be free for the whole interval.
    fn participant_ids(&self) -> Vec<&str>;
}

/// A keyed collection with dependency edges.
pub trait DependencyGraph {
    /// Node type.
    type Node: Schedulable;

    /// Looks up a node.
    fn node(&self, key: &str) -> Option<&Self::Node>;

    /// Nodes that must finish before `key` starts.
    fn dependencies(&self, key: &str) -> Vec<&Self::Node>;

    /// Nodes waiting on `key`.
    fn dependants(&self, key: &str) -> Vec<&Self::Node>;
}

impl Schedulable for Match {
    fn key(&self) -> &str {
        &self.id
    }

    fn division_id(&self) -> &str {
        &self.division_id
    }

    fn window(&self) -> Option<TimeWindow> {
        Match::window(self)
    }

    fn buffer_ms(&self) -> i64 {
        self.buffer_ms
    }

    fn resource_id(&self) -> Option<&str> {
        self.field_id.as_deref()
    }

    fn is_locked(&self) -> bool {
        self.locked
    }

    fn participant_ids(&self) -> Vec<&str> {
        self.team_ids().collect()
    }
}

impl DependencyGraph for MatchTable {
    type Node = Match;

    fn node(&self, key: &str) -> Option<&Match> {
        self.get(key)
    }

    fn dependencies(&self, key: &str) -> Vec<&Match> {
        self.get(key)
            .map(|m| m.dependency_ids().filter_map(|id| self.get(id)).collect())
            .unwrap_or_default()
    }

    fn dependants(&self, key: &str) -> Vec<&Match> {
        self.get(key)
            .map(|m| m.dependant_ids().filter_map(|id| self.get(id)).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_table_navigation() {
        let mut table = MatchTable::new();
        let mut a = Match::new("a", "d");
        a.winner_next_id = Some("c".into());
        let mut b = Match::new("b", "d");
        b.winner_next_id = Some("c".into());
        let mut c = Match::new("c", "d");
        c.previous_left_id = Some("a".into());
        c.previous_right_id = Some("b".into());
        for m in [a, b, c] {
            table.insert(m.id.clone(), m);
        }

        let deps: Vec<&str> = table.dependencies("c").iter().map(|m| m.key()).collect();
        assert_eq!(deps, vec!["a", "b"]);
        let next: Vec<&str> = table.dependants("a").iter().map(|m| m.key()).collect();
        assert_eq!(next, vec!["c"]);
        assert!(table.dependencies("missing").is_empty());
    }
}
