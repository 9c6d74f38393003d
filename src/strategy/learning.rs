use std::sync::Arc;

use crate::recovery::ExecutionOutcome;
use crate::strategy::StrategySelector;

/// Feeds execution outcomes back into the selector.
pub struct LearningEngine {
    selector: Arc<StrategySelector>,
}

impl LearningEngine {
    pub fn new(selector: Arc<StrategySelector>) -> Self {
        Self { selector }
    }

    /// An outcome counts as a success when the strategy was applied.
    pub fn update(&self, strategy: &str, outcome: &ExecutionOutcome) {
        self.selector.record_outcome(strategy, outcome.applied());
    }
}
