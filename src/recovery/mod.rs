//! Turning a chosen strategy into applied (or planned) actions.

pub mod container;
pub mod executor;

pub use self::container::{ContainerControl, ContainerError, DockerCli};
pub use self::executor::{
    ActionReport, ActionStatus, ExecutionOutcome, ExecutionPlan, RecoveryExecutor, RejectReason,
};
