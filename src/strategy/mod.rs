//! Remediation strategy catalog, selection and outcome learning.

pub mod learning;
pub mod library;
pub mod selector;

pub use self::learning::LearningEngine;
pub use self::library::{Action, HealingStrategy, SafetyLevel, StrategyLibrary};
pub use self::selector::{StrategyScore, StrategySelector};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StrategyError {
    #[error("unknown strategy '{0}'")]
    NotFound(String),
}
