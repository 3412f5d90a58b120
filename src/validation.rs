//! Input validation for events.
//!
//! Checks structural integrity of an event before scheduling. Detects:
//! - Duplicate IDs (divisions, officials, time slots) and map keys that
//!   disagree with the stored entity's id
//! - Dangling references (teams, fields, divisions, officials, match links)
//! - Malformed time slots
//! - Match links that are not mirrored on the other side
//! - Cycles in the match graph
//!
//! The only double edge allowed in the match graph is a grand final
//! feeding both slots of its reset match; it is checked explicitly.
//!
//! # Reference
//! Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4 (Topological Sort)

use crate::models::{Event, MatchTable};
use std::collections::{HashMap, HashSet};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two entities share the same ID.
    DuplicateId,
    /// A reference names an entity that doesn't exist.
    InvalidReference,
    /// A time slot has an impossible day, minute range or date range.
    MalformedTimeSlot,
    /// A match link is not mirrored by the linked match.
    InconsistentLink,
    /// The match graph contains a cycle.
    CyclicDependency,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates an event.
///
/// Checks:
/// 1. No duplicate division, official or time slot IDs; map keys match ids
/// 2. Team, field, official and match division references exist
///    (only when divisions are declared)
/// 3. Field allowlists, slot fields and match fields/teams/officials exist
/// 4. Time slots and field rentals are well formed
/// 5. Every match link points at an existing match that links back
/// 6. No cycles in the match graph
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_event(event: &Event) -> ValidationResult {
    let mut errors = Vec::new();
    let duplicate = |what: &str, id: &str| {
        ValidationError::new(ValidationErrorKind::DuplicateId, format!("Duplicate {what} ID: {id}"))
    };

    let mut division_ids = HashSet::new();
    for d in &event.divisions {
        if !division_ids.insert(d.id.as_str()) {
            errors.push(duplicate("division", &d.id));
        }
    }
    let mut official_ids = HashSet::new();
    for o in &event.officials {
        if !official_ids.insert(o.id.as_str()) {
            errors.push(duplicate("official", &o.id));
        }
    }
    let mut slot_ids = HashSet::new();
    for s in &event.time_slots {
        if !slot_ids.insert(s.id.as_str()) {
            errors.push(duplicate("time slot", &s.id));
        }
    }
    for (key, team) in &event.teams {
        if *key != team.id {
            errors.push(duplicate("team", &team.id));
        }
    }
    for (key, field) in &event.fields {
        if *key != field.id {
            errors.push(duplicate("field", &field.id));
        }
    }
    for (key, m) in &event.matches {
        if *key != m.id {
            errors.push(duplicate("match", &m.id));
        }
    }

    let mut reference = |owner: &str, what: &str, id: &str| {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidReference,
            format!("{owner} references unknown {what} '{id}'"),
        ));
    };
    let check_division = !event.divisions.is_empty();

    for team in event.teams.values() {
        if check_division && !division_ids.contains(team.division_id.as_str()) {
            reference(&format!("Team '{}'", team.id), "division", &team.division_id);
        }
    }
    for field in event.fields.values() {
        for d in &field.division_ids {
            if check_division && !division_ids.contains(d.as_str()) {
                reference(&format!("Field '{}'", field.id), "division", d);
            }
        }
    }
    for o in &event.officials {
        for d in &o.division_ids {
            if check_division && !division_ids.contains(d.as_str()) {
                reference(&format!("Official '{}'", o.id), "division", d);
            }
        }
    }
    for d in &event.divisions {
        for f in &d.field_ids {
            if !event.fields.contains_key(f) {
                reference(&format!("Division '{}'", d.id), "field", f);
            }
        }
    }
    for s in &event.time_slots {
        if let Some(f) = &s.field_id {
            if !event.fields.contains_key(f) {
                reference(&format!("Time slot '{}'", s.id), "field", f);
            }
        }
    }

    for m in event.matches.values() {
        let owner = format!("Match '{}'", m.id);
        if check_division && !division_ids.contains(m.division_id.as_str()) {
            reference(&owner, "division", &m.division_id);
        }
        if let Some(f) = &m.field_id {
            if !event.fields.contains_key(f) {
                reference(&owner, "field", f);
            }
        }
        for t in m.team_ids().chain(m.team_referee_id.as_deref()) {
            if !event.teams.contains_key(t) {
                reference(&owner, "team", t);
            }
        }
        if let Some(o) = &m.official_id {
            if !official_ids.contains(o.as_str()) {
                reference(&owner, "official", o);
            }
        }
        for link in [
            &m.previous_left_id,
            &m.previous_right_id,
            &m.winner_next_id,
            &m.loser_next_id,
        ]
        .into_iter()
        .flatten()
        {
            if !event.matches.contains_key(link) {
                reference(&owner, "match", link);
            }
        }
    }

    let slots = event
        .time_slots
        .iter()
        .map(|s| (format!("Time slot '{}'", s.id), s))
        .chain(event.fields.values().flat_map(|f| {
            f.rental_slots
                .iter()
                .map(move |s| (format!("Rental '{}' on field '{}'", s.id, f.id), s))
        }));
    for (label, slot) in slots {
        if !slot.is_well_formed() {
            errors.push(ValidationError::new(
                ValidationErrorKind::MalformedTimeSlot,
                format!("{label} is malformed"),
            ));
        }
    }

    errors.extend(check_links(&event.matches));

    if let Some(node) = find_cycle(&event.matches) {
        errors.push(ValidationError::new(
            ValidationErrorKind::CyclicDependency,
            format!("Circular dependency detected involving match '{node}'"),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Checks that forward and backward links agree.
fn check_links(matches: &MatchTable) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut inconsistent = |message: String| {
        errors.push(ValidationError::new(ValidationErrorKind::InconsistentLink, message));
    };

    for m in matches.values() {
        if m.feeds_reset() {
            let reset = m.winner_next_id.as_deref().unwrap_or_default();
            let both = matches.get(reset).is_some_and(|r| {
                r.previous_left_id.as_deref() == Some(m.id.as_str())
                    && r.previous_right_id.as_deref() == Some(m.id.as_str())
            });
            if !both {
                inconsistent(format!(
                    "Match '{}' feeds '{reset}' twice but is not both of its inputs",
                    m.id
                ));
            }
            continue;
        }
        for next in m.dependant_ids() {
            if matches.get(next).is_some_and(|n| n.slot_fed_by(&m.id).is_none()) {
                inconsistent(format!("Match '{}' feeds '{next}', which does not list it", m.id));
            }
        }
        for prev in m.dependency_ids() {
            let links_back = matches.get(prev).map(|p| {
                p.winner_next_id.as_deref() == Some(m.id.as_str())
                    || p.loser_next_id.as_deref() == Some(m.id.as_str())
            });
            if links_back == Some(false) {
                inconsistent(format!("Match '{}' lists '{prev}', which does not feed it", m.id));
            }
        }
    }
    errors
}

/// Finds a match on a cycle of the match graph, if any.
///
/// # Algorithm
/// Topological sort via DFS. If a back-edge is found (visiting a node
/// currently in the recursion stack), a cycle exists.
///
/// # Reference
/// Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4
pub fn find_cycle(matches: &MatchTable) -> Option<String> {
    // Adjacency: match -> matches it feeds.
    let mut adj: HashMap<&str, Vec<&str>> = HashMap::new();
    for m in matches.values() {
        adj.entry(m.id.as_str()).or_default().extend(m.dependant_ids());
        for prev in m.dependency_ids() {
            adj.entry(prev).or_default().push(m.id.as_str());
        }
    }

    let mut visited = HashSet::new();
    let mut in_stack = HashSet::new();
    for node in matches.keys() {
        if !visited.contains(node.as_str())
            && has_cycle_dfs(node.as_str(), &adj, &mut visited, &mut in_stack)
        {
            return Some(node.clone());
        }
    }
    None
}

fn has_cycle_dfs<'a>(
    node: &'a str,
    adj: &HashMap<&'a str, Vec<&'a str>>,
    visited: &mut HashSet<&'a str>,
    in_stack: &mut HashSet<&'a str>,
) -> bool {
    visited.insert(node);
    in_stack.insert(node);

    if let Some(neighbors) = adj.get(node) {
        for &next in neighbors {
            if in_stack.contains(next) {
                return true; // Back edge → cycle
            }
            if !visited.contains(next) && has_cycle_dfs(next, adj, visited, in_stack) {
                return true;
            }
        }
    }

    in_stack.remove(node);
    false
}
