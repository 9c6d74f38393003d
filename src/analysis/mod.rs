//! Root-cause analysis over detected anomalies.

pub mod diagnosis;

pub use self::diagnosis::{Diagnosis, DiagnosisEngine, IssueType};
