//! Error handling for the crashtab scheduling core.
//!
//! Two families of failure exist and they never mix:
//!
//! - **Scheduler errors** ([`SchedulerError`]): configuration problems
//!   (unknown job, bad frequency, bad time-of-day) and state-persistence
//!   problems (corrupt state document). These surface to the caller.
//! - **Job-body errors** ([`crate::jobs::JobError`]): failures raised by an
//!   individual job during execution. These are caught by the orchestrator,
//!   recorded into the job's run record and never propagated.

use std::path::PathBuf;
use thiserror::Error;

/// A specialized Result type for scheduler operations.
pub type Result<T> = std::result::Result<T, SchedulerError>;

/// Errors surfaced by the scheduling core.
///
/// Configuration variants are detected at registry-build or configtest time;
/// `CorruptState` is fatal and makes the orchestrator refuse to proceed.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A job name or implementation reference could not be resolved in the
    /// handler registration table.
    #[error("job not found: {0}")]
    JobNotFound(String),

    /// A job specification entry is malformed (e.g. no frequency metadata).
    #[error("bad job description {entry:?}: {reason}")]
    JobDescription { entry: String, reason: String },

    /// A frequency string did not match `<integer><unit>` with a supported
    /// unit (s/m/h/d/w).
    #[error("unparseable frequency {value:?} (expected <integer><unit>, unit one of s/m/h/d/w)")]
    FrequencyFormat { value: String },

    /// The frequency is syntactically valid but incompatible with the rest
    /// of the schedule, e.g. a time-of-day anchor on a sub-day frequency.
    #[error("invalid frequency definition {value:?}: {reason}")]
    FrequencyDefinition { value: String, reason: String },

    /// A time-of-day string did not parse as `HH:MM` with hour in [0,24)
    /// and minute in [0,60).
    #[error("unparseable time of day {value:?} (expected HH:MM, 24-hour)")]
    TimeFormat { value: String },

    /// The persisted state document exists but cannot be deserialized.
    /// Never silently downgraded: losing run history is a correctness
    /// issue, not a recoverable one.
    #[error("corrupt state document at {path}: {reason}")]
    CorruptState { path: PathBuf, reason: String },

    /// I/O failure reading or writing the primary state document.
    #[error("state store I/O error")]
    Io(#[from] std::io::Error),

    /// Serialization failure writing the state document.
    #[error("state serialization error")]
    Serialization(#[source] serde_json::Error),
}

impl SchedulerError {
    /// True for errors that `configtest` reports as configuration
    /// problems (as opposed to runtime/persistence failures).
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::JobNotFound(_)
                | Self::JobDescription { .. }
                | Self::FrequencyFormat { .. }
                | Self::FrequencyDefinition { .. }
                | Self::TimeFormat { .. }
        )
    }

    /// Short machine-readable label, used in configtest output and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::JobNotFound(_) => "JobNotFoundError",
            Self::JobDescription { .. } => "JobDescriptionError",
            Self::FrequencyFormat { .. } => "FrequencyFormatError",
            Self::FrequencyDefinition { .. } => "FrequencyDefinitionError",
            Self::TimeFormat { .. } => "TimeFormatError",
            Self::CorruptState { .. } => "CorruptStateError",
            Self::Io(_) => "IoError",
            Self::Serialization(_) => "SerializationError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_classification() {
        assert!(SchedulerError::JobNotFound("x".into()).is_configuration());
        assert!(SchedulerError::FrequencyFormat { value: "3e".into() }.is_configuration());
        assert!(!SchedulerError::CorruptState {
            path: "/tmp/state.json".into(),
            reason: "truncated".into(),
        }
        .is_configuration());
    }

    #[test]
    fn test_kind_labels() {
        let err = SchedulerError::FrequencyDefinition {
            value: "3h".into(),
            reason: "anchored schedules must be whole days".into(),
        };
        assert_eq!(err.kind(), "FrequencyDefinitionError");
        assert!(err.to_string().contains("3h"));
    }
}
