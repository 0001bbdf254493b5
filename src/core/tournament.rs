use rand::Rng;
use serde::Serialize;
use thiserror::Error;

use crate::models::{CuisineLabel, CuisineMatch};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TournamentError {
    #[error("A tournament needs at least two cuisines, got {0}")]
    NotEnoughCuisines(usize),

    #[error("{0} is not part of the current match")]
    NotInMatch(String),

    #[error("The tournament is already finished")]
    AlreadyFinished,
}

/// What happened after a pick
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RoundOutcome {
    Next { round: u32, matchup: CuisineMatch },
    Champion(CuisineLabel),
}

/// Pick two distinct cuisines uniformly at random
pub fn pick_pair<R: Rng + ?Sized>(pool: &[CuisineLabel], rng: &mut R) -> Option<CuisineMatch> {
    if pool.len() < 2 {
        return None;
    }
    let picked = rand::seq::index::sample(rng, pool.len(), 2);
    Some(CuisineMatch {
        first: pool[picked.index(0)].clone(),
        second: pool[picked.index(1)].clone(),
    })
}

/// Single-elimination reduction of cuisines to one winner
///
/// Each pick removes the loser of the current match and keeps every
/// cuisine that was not playing, so the pool shrinks by exactly one per
/// round until a single champion remains.
#[derive(Debug, Clone, Serialize)]
pub struct Tournament {
    remaining: Vec<CuisineLabel>,
    current: Option<CuisineMatch>,
    round: u32,
    champion: Option<CuisineLabel>,
}

impl Tournament {
    /// Start with the first two distinct cuisines, in the given order, as round one
    pub fn start<I>(cuisines: I) -> Result<Self, TournamentError>
    where
        I: IntoIterator<Item = CuisineLabel>,
    {
        let mut remaining: Vec<CuisineLabel> = Vec::new();
        for cuisine in cuisines {
            if !remaining.contains(&cuisine) {
                remaining.push(cuisine);
            }
        }

        if remaining.len() < 2 {
            return Err(TournamentError::NotEnoughCuisines(remaining.len()));
        }

        let current = CuisineMatch {
            first: remaining[0].clone(),
            second: remaining[1].clone(),
        };

        Ok(Self {
            remaining,
            current: Some(current),
            round: 1,
            champion: None,
        })
    }

    /// Start with a randomly chosen opening match
    pub fn start_random<I, R>(cuisines: I, rng: &mut R) -> Result<Self, TournamentError>
    where
        I: IntoIterator<Item = CuisineLabel>,
        R: Rng + ?Sized,
    {
        let mut tournament = Self::start(cuisines)?;
        tournament.current = pick_pair(&tournament.remaining, rng);
        Ok(tournament)
    }

    pub fn remaining(&self) -> &[CuisineLabel] {
        &self.remaining
    }

    pub fn current_match(&self) -> Option<&CuisineMatch> {
        self.current.as_ref()
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn champion(&self) -> Option<&str> {
        self.champion.as_deref()
    }

    pub fn is_finished(&self) -> bool {
        self.champion.is_some()
    }

    /// Record `winner` for the current match and draw the next one
    pub fn select_winner<R: Rng + ?Sized>(
        &mut self,
        winner: &str,
        rng: &mut R,
    ) -> Result<RoundOutcome, TournamentError> {
        let matchup = self.current.take().ok_or(TournamentError::AlreadyFinished)?;
        if !matchup.contains(winner) {
            let err = TournamentError::NotInMatch(winner.to_string());
            self.current = Some(matchup);
            return Err(err);
        }

        self.remaining
            .retain(|c| c == winner || !matchup.contains(c));

        if self.remaining.len() <= 1 {
            let champion = self
                .remaining
                .first()
                .cloned()
                .unwrap_or_else(|| winner.to_string());
            tracing::debug!("Tournament won by {} after {} round(s)", champion, self.round);
            self.champion = Some(champion.clone());
            return Ok(RoundOutcome::Champion(champion));
        }

        let next = pick_pair(&self.remaining, rng).ok_or(TournamentError::NotEnoughCuisines(self.remaining.len()))?;
        self.round += 1;
        self.current = Some(next.clone());
        tracing::debug!("Round {}: {} ({} remaining)", self.round, next, self.remaining.len());

        Ok(RoundOutcome::Next {
            round: self.round,
            matchup: next,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn labels(names: &[&str]) -> Vec<CuisineLabel> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_requires_two_cuisines() {
        assert_eq!(
            Tournament::start(labels(&["Thai"])).unwrap_err(),
            TournamentError::NotEnoughCuisines(1)
        );
        assert_eq!(
            Tournament::start(labels(&["Thai", "Thai"])).unwrap_err(),
            TournamentError::NotEnoughCuisines(1)
        );
    }

    #[test]
    fn test_two_way_final() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut t = Tournament::start(labels(&["Italian", "Chinese"])).unwrap();

        assert_eq!(t.round(), 1);
        assert_eq!(
            t.current_match(),
            Some(&CuisineMatch {
                first: "Italian".to_string(),
                second: "Chinese".to_string()
            })
        );

        let outcome = t.select_winner("Italian", &mut rng).unwrap();
        assert_eq!(outcome, RoundOutcome::Champion("Italian".to_string()));
        assert_eq!(t.champion(), Some("Italian"));
        assert!(t.current_match().is_none());
        assert_eq!(
            t.select_winner("Italian", &mut rng).unwrap_err(),
            TournamentError::AlreadyFinished
        );
    }

    #[test]
    fn test_rejects_winner_outside_match() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut t = Tournament::start(labels(&["Thai", "Korean", "Indian"])).unwrap();

        let err = t.select_winner("Indian", &mut rng).unwrap_err();
        assert_eq!(err, TournamentError::NotInMatch("Indian".to_string()));
        // State untouched
        assert_eq!(t.remaining().len(), 3);
        assert!(t.current_match().is_some());
    }

    #[test]
    fn test_untouched_cuisines_survive_a_round() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut t = Tournament::start(labels(&["Thai", "Korean", "Indian", "Greek"])).unwrap();

        t.select_winner("Korean", &mut rng).unwrap();
        assert_eq!(t.remaining(), labels(&["Korean", "Indian", "Greek"]).as_slice());
        assert_eq!(t.round(), 2);
    }

    #[test]
    fn test_terminates_with_original_member() {
        for seed in 0..25 {
            let mut rng = StdRng::seed_from_u64(seed);
            let original = labels(&["A", "B", "C", "D", "E", "F", "G"]);
            let mut t = Tournament::start_random(original.clone(), &mut rng).unwrap();

            let mut size = t.remaining().len();
            loop {
                let matchup = t.current_match().cloned().unwrap();
                assert_ne!(matchup.first, matchup.second);
                assert!(t.remaining().contains(&matchup.first));
                assert!(t.remaining().contains(&matchup.second));

                let pick = if seed % 2 == 0 { matchup.first } else { matchup.second };
                let outcome = t.select_winner(&pick, &mut rng).unwrap();
                assert_eq!(t.remaining().len(), size - 1);
                size -= 1;

                if let RoundOutcome::Champion(winner) = outcome {
                    assert_eq!(winner, pick);
                    assert!(original.contains(&winner));
                    break;
                }
            }
            assert_eq!(t.remaining().len(), 1);
            assert_eq!(t.round(), 6);
        }
    }

    #[test]
    fn test_pick_pair_needs_two() {
        let mut rng = StdRng::seed_from_u64(4);
        assert!(pick_pair(&labels(&["Solo"]), &mut rng).is_none());
        let pair = pick_pair(&labels(&["X", "Y"]), &mut rng).unwrap();
        assert!(pair.contains("X") && pair.contains("Y"));
    }
}
