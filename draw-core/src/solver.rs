use rand::seq::SliceRandom;
use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::{Assignment, Email, Exclusion};

/// Full restarts allowed before a draw is reported as exhausted.
pub const DEFAULT_MAX_ATTEMPTS: usize = 400;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SolverConfig {
    pub max_attempts: usize,
    /// Candidate placements allowed per attempt. `None` lets every attempt
    /// run its depth-first search to completion.
    pub max_steps_per_attempt: Option<usize>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            max_steps_per_attempt: None,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SolveError {
    #[error("no possible receivers for: {}", givers.join(", "))]
    Infeasible { givers: Vec<Email> },
    #[error("no valid assignment found after {attempts} attempts")]
    Exhausted { attempts: usize },
}

impl SolveError {
    pub fn reason(&self) -> &'static str {
        match self {
            SolveError::Infeasible { .. } => "infeasible",
            SolveError::Exhausted { .. } => "search_exhausted",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssignmentViolation {
    #[error("{giver} has no receiver")]
    MissingGiver { giver: Email },
    #[error("{giver} is not part of the draw")]
    UnknownGiver { giver: Email },
    #[error("{receiver} is not part of the draw")]
    UnknownReceiver { receiver: Email },
    #[error("{receiver} receives more than one gift")]
    DuplicateReceiver { receiver: Email },
    #[error("{giver} is assigned to themselves")]
    SelfAssigned { giver: Email },
    #[error("{giver} must not gift {receiver}")]
    Excluded { giver: Email, receiver: Email },
}

/// Legal receivers for every giver, by roster position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionTable {
    roster: Vec<Email>,
    options: Vec<Vec<usize>>,
}

impl OptionTable {
    /// Receivers `giver` may draw, in roster order.
    pub fn options_for(&self, giver: &str) -> Option<Vec<&str>> {
        let index = self.roster.iter().position(|email| email == giver)?;
        Some(
            self.options[index]
                .iter()
                .map(|&receiver| self.roster[receiver].as_str())
                .collect(),
        )
    }

    /// Givers left without a single legal receiver.
    pub fn stranded(&self) -> Vec<Email> {
        self.options
            .iter()
            .enumerate()
            .filter(|(_, opts)| opts.is_empty())
            .map(|(giver, _)| self.roster[giver].clone())
            .collect()
    }

    /// Giver positions sorted by ascending option count. Ties keep roster order.
    fn most_constrained_first(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.options.len()).collect();
        order.sort_by_key(|&giver| self.options[giver].len());
        order
    }

    fn to_assignment(&self, mapping: &[Option<usize>]) -> Assignment {
        mapping
            .iter()
            .enumerate()
            .filter_map(|(giver, receiver)| {
                receiver.map(|r| (self.roster[giver].clone(), self.roster[r].clone()))
            })
            .collect()
    }
}

/// Builds the option table: everyone but yourself and anyone you are
/// excluded from gifting.
///
/// Exclusions naming identities outside the roster are ignored.
pub fn build_options(roster: &[Email], exclusions: &[Exclusion]) -> OptionTable {
    let index: HashMap<&str, usize> = roster
        .iter()
        .enumerate()
        .map(|(i, email)| (email.as_str(), i))
        .collect();

    let mut banned: Vec<HashSet<usize>> = (0..roster.len()).map(|i| HashSet::from([i])).collect();
    for exclusion in exclusions {
        if let (Some(&giver), Some(&receiver)) = (
            index.get(exclusion.giver.as_str()),
            index.get(exclusion.receiver.as_str()),
        ) {
            banned[giver].insert(receiver);
        }
    }

    let options = banned
        .iter()
        .map(|blocked| (0..roster.len()).filter(|r| !blocked.contains(r)).collect())
        .collect();

    OptionTable {
        roster: roster.to_vec(),
        options,
    }
}

/// Draws with the thread-local generator and the default budget.
pub fn draw(roster: &[Email], exclusions: &[Exclusion]) -> Result<Assignment, SolveError> {
    solve(roster, exclusions, &mut thread_rng())
}

pub fn solve<R: Rng + ?Sized>(
    roster: &[Email],
    exclusions: &[Exclusion],
    rng: &mut R,
) -> Result<Assignment, SolveError> {
    solve_with(roster, exclusions, &SolverConfig::default(), rng)
}

/// Finds a random derangement of `roster` that avoids every exclusion.
///
/// The first attempt walks givers most-constrained first; each retry
/// reshuffles the giver order and starts over from an empty map. Candidates
/// at every position are tried in shuffled order, so repeated calls on the
/// same input yield different valid draws.
pub fn solve_with<R: Rng + ?Sized>(
    roster: &[Email],
    exclusions: &[Exclusion],
    config: &SolverConfig,
    rng: &mut R,
) -> Result<Assignment, SolveError> {
    let table = build_options(roster, exclusions);

    let stranded = table.stranded();
    if !stranded.is_empty() {
        return Err(SolveError::Infeasible { givers: stranded });
    }

    let attempts = config.max_attempts.max(1);
    let mut order = table.most_constrained_first();
    for _ in 0..attempts {
        let search = Search::new(
            &table.options,
            &order,
            config.max_steps_per_attempt,
            &mut *rng,
        );
        if let Some(mapping) = search.run() {
            return Ok(table.to_assignment(&mapping));
        }
        order.shuffle(&mut *rng);
    }

    Err(SolveError::Exhausted { attempts })
}

/// One depth-first attempt. Owns its used-set and partial map.
struct Search<'a, R: Rng + ?Sized> {
    options: &'a [Vec<usize>],
    order: &'a [usize],
    used: Vec<bool>,
    mapping: Vec<Option<usize>>,
    steps: usize,
    max_steps: Option<usize>,
    rng: &'a mut R,
}

impl<'a, R: Rng + ?Sized> Search<'a, R> {
    fn new(
        options: &'a [Vec<usize>],
        order: &'a [usize],
        max_steps: Option<usize>,
        rng: &'a mut R,
    ) -> Self {
        Self {
            options,
            order,
            used: vec![false; options.len()],
            mapping: vec![None; options.len()],
            steps: 0,
            max_steps,
            rng,
        }
    }

    fn run(mut self) -> Option<Vec<Option<usize>>> {
        if self.backtrack(0) {
            Some(self.mapping)
        } else {
            None
        }
    }

    fn backtrack(&mut self, position: usize) -> bool {
        let Some(&giver) = self.order.get(position) else {
            return true;
        };

        let mut candidates: Vec<usize> = self.options[giver]
            .iter()
            .copied()
            .filter(|&receiver| !self.used[receiver])
            .collect();
        candidates.shuffle(&mut *self.rng);

        for receiver in candidates {
            if self.max_steps.is_some_and(|max| self.steps >= max) {
                return false;
            }
            self.steps += 1;

            self.mapping[giver] = Some(receiver);
            self.used[receiver] = true;
            if self.backtrack(position + 1) {
                return true;
            }
            self.used[receiver] = false;
            self.mapping[giver] = None;
        }
        false
    }
}

/// Checks that `assignment` is a derangement of `roster` avoiding every
/// exclusion. Reports the first violation in roster order.
pub fn verify_assignment(
    roster: &[Email],
    exclusions: &[Exclusion],
    assignment: &Assignment,
) -> Result<(), AssignmentViolation> {
    let members: HashSet<&str> = roster.iter().map(String::as_str).collect();
    let excluded: HashSet<(&str, &str)> = exclusions
        .iter()
        .map(|e| (e.giver.as_str(), e.receiver.as_str()))
        .collect();

    let mut received: HashSet<&str> = HashSet::new();
    for giver in roster {
        let receiver = assignment
            .get(giver)
            .ok_or_else(|| AssignmentViolation::MissingGiver {
                giver: giver.clone(),
            })?;
        if receiver == giver {
            return Err(AssignmentViolation::SelfAssigned {
                giver: giver.clone(),
            });
        }
        if !members.contains(receiver.as_str()) {
            return Err(AssignmentViolation::UnknownReceiver {
                receiver: receiver.clone(),
            });
        }
        if !received.insert(receiver.as_str()) {
            return Err(AssignmentViolation::DuplicateReceiver {
                receiver: receiver.clone(),
            });
        }
        if excluded.contains(&(giver.as_str(), receiver.as_str())) {
            return Err(AssignmentViolation::Excluded {
                giver: giver.clone(),
                receiver: receiver.clone(),
            });
        }
    }

    let mut strangers: Vec<&Email> = assignment
        .keys()
        .filter(|giver| !members.contains(giver.as_str()))
        .collect();
    strangers.sort();
    match strangers.first() {
        Some(giver) => Err(AssignmentViolation::UnknownGiver {
            giver: (*giver).clone(),
        }),
        None => Ok(()),
    }
}
