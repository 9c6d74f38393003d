use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

/// Score given to a strategy that has never been attempted.
pub const UNTRIED_SCORE: f64 = 0.5;

/// Running outcome counters for one strategy. `attempts >= successes` always.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyScore {
    pub successes: u64,
    pub attempts: u64,
}

impl StrategyScore {
    fn record(&mut self, success: bool) {
        self.attempts += 1;
        if success {
            self.successes += 1;
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.attempts == 0 {
            return UNTRIED_SCORE;
        }
        self.successes as f64 / self.attempts as f64
    }
}

/// Picks remediation candidates by observed success rate.
///
/// Counters live for the lifetime of the process and never decay.
#[derive(Default)]
pub struct StrategySelector {
    scores: RwLock<HashMap<String, StrategyScore>>,
}

impl StrategySelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_outcome(&self, name: &str, success: bool) {
        self.scores
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name.to_string())
            .or_default()
            .record(success);
    }

    /// Success rate for `name`, or the untried prior.
    pub fn score(&self, name: &str) -> f64 {
        score_of(&self.scores.read().unwrap_or_else(PoisonError::into_inner), name)
    }

    /// The highest scoring candidate. Ties go to the earliest candidate.
    pub fn best<S: AsRef<str>>(&self, candidates: &[S]) -> Option<String> {
        let scores = self.scores.read().unwrap_or_else(PoisonError::into_inner);

        let mut best: Option<(&str, f64)> = None;
        for candidate in candidates {
            let name = candidate.as_ref();
            let score = score_of(&scores, name);
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((name, score)),
            }
        }
        best.map(|(name, _)| name.to_string())
    }

    /// Point-in-time copy of every counter, ordered by name.
    pub fn snapshot(&self) -> BTreeMap<String, StrategyScore> {
        self.scores
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, score)| (name.clone(), *score))
            .collect()
    }
}

fn score_of(scores: &HashMap<String, StrategyScore>, name: &str) -> f64 {
    scores.get(name).map_or(UNTRIED_SCORE, StrategyScore::success_rate)
}
