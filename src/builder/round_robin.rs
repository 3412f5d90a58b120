//! Round-robin pairings (circle method).
//!
//! # Algorithm
//!
//! Fix the first team and rotate the others one position per round.
//! Round `r` pairs position `i` with position `m - 1 - i`. An odd field
//! is padded with a bye, and pairings against the bye are dropped.
//!
//! `m` teams give `m - 1` rounds in which every pair meets once. The cycle
//! repeats `games_per_opponent` times with home and away swapped on odd
//! repeats.
//!
//! # Reference
//! Kirkman (1847), "On a problem in combinations"

/// One round of (home, away) pairings.
pub type Round = Vec<(String, String)>;

/// Builds all rounds for `team_ids`.
pub fn round_robin_rounds(team_ids: &[String], games_per_opponent: u32) -> Vec<Round> {
    if team_ids.len() < 2 {
        return Vec::new();
    }
    let mut ring: Vec<Option<&String>> = team_ids.iter().map(Some).collect();
    if ring.len() % 2 == 1 {
        ring.push(None);
    }
    let m = ring.len();

    let mut cycle: Vec<Vec<(&String, &String)>> = Vec::with_capacity(m - 1);
    for _ in 0..m - 1 {
        let round = (0..m / 2)
            .filter_map(|i| match (ring[i], ring[m - 1 - i]) {
                (Some(a), Some(b)) => Some((a, b)),
                _ => None,
            })
            .collect();
        cycle.push(round);
        ring[1..].rotate_right(1);
    }

    let cycle = &cycle;
    (0..games_per_opponent.max(1))
        .flat_map(move |repeat| {
            cycle.iter().map(move |round| {
                round
                    .iter()
                    .map(|&(home, away)| {
                        if repeat % 2 == 1 {
                            (away.clone(), home.clone())
                        } else {
                            (home.clone(), away.clone())
                        }
                    })
                    .collect()
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn ids(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("t{i}")).collect()
    }

    fn unordered(a: &str, b: &str) -> (String, String) {
        if a < b {
            (a.to_string(), b.to_string())
        } else {
            (b.to_string(), a.to_string())
        }
    }

    #[test]
    fn test_even_count() {
        let rounds = round_robin_rounds(&ids(4), 1);
        assert_eq!(rounds.len(), 3);
        let mut seen = HashSet::new();
        for round in &rounds {
            assert_eq!(round.len(), 2);
            let mut playing = HashSet::new();
            for (h, a) in round {
                assert!(playing.insert(h.clone()) && playing.insert(a.clone()));
                assert!(seen.insert(unordered(h, a)));
            }
        }
        assert_eq!(seen.len(), 6);
    }

    #[test]
    fn test_odd_count_has_byes() {
        let rounds = round_robin_rounds(&ids(5), 1);
        assert_eq!(rounds.len(), 5);
        assert!(rounds.iter().all(|r| r.len() == 2));
        let pairs: HashSet<_> = rounds.iter().flatten().map(|(h, a)| unordered(h, a)).collect();
        assert_eq!(pairs.len(), 10);
    }

    #[test]
    fn test_repeat_swaps_home_and_away() {
        let rounds = round_robin_rounds(&ids(2), 2);
        assert_eq!(rounds.len(), 2);
        assert_eq!(rounds[0], vec![("t1".to_string(), "t2".to_string())]);
        assert_eq!(rounds[1], vec![("t2".to_string(), "t1".to_string())]);
    }

    #[test]
    fn test_too_few_teams() {
        assert!(round_robin_rounds(&ids(1), 3).is_empty());
    }
}
