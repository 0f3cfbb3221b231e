//! Error types for the intent lifecycle.
//!
//! Every error is fatal to the run. Nothing in this crate retries or
//! recovers; errors propagate to the caller, which reports them and exits
//! with [`HolonError::exit_code`].

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type for Holon operations
pub type Result<T> = std::result::Result<T, HolonError>;

/// Coarse error classification used for reporting and exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Wrong command-line usage.
    Usage,
    /// The intent descriptor could not be used.
    Input,
    /// An external stage could not be run or reported failure.
    Stage,
    /// The ledger could not be read or contained a bad record.
    Ledger,
    /// No plan exists for the target intent.
    NoCandidates,
    /// The run was interrupted.
    Cancelled,
}

/// Holon error types
#[derive(Debug, Error)]
pub enum HolonError {
    /// Wrong argument count or malformed invocation
    #[error("usage error: {message}")]
    Usage {
        /// Usage text or description of the problem
        message: String,
    },

    /// Intent descriptor is missing, unreadable, or lacks `intent_id`
    #[error("input error in {path:?}: {message}")]
    Input {
        /// Descriptor path
        path: PathBuf,
        /// What was wrong with it
        message: String,
    },

    /// The stage executable could not be started
    #[error("failed to spawn stage {stage}")]
    StageSpawn {
        /// Stage name
        stage: String,
        /// Underlying spawn failure
        #[source]
        source: std::io::Error,
    },

    /// The stage exited with a non-zero status
    #[error("stage {stage} failed ({status}): {stderr}")]
    StageFailed {
        /// Stage name
        stage: String,
        /// Exit status description
        status: String,
        /// Captured standard error
        stderr: String,
    },

    /// The stage did not finish within its time budget
    #[error("stage {stage} timed out after {}s", .timeout.as_secs_f64())]
    StageTimedOut {
        /// Stage name
        stage: String,
        /// Budget that was exceeded
        timeout: Duration,
    },

    /// A ledger line could not be parsed into a record
    #[error("malformed ledger record at {path:?} line {line}: {message}")]
    MalformedLedgerRecord {
        /// Ledger store path
        path: PathBuf,
        /// 1-based line number
        line: usize,
        /// Parser message
        message: String,
    },

    /// No plan in the ledger references the target intent
    #[error("no plans found for intent {intent_id}")]
    NoCandidates {
        /// Target intent
        intent_id: String,
    },

    /// The run was interrupted before completion
    #[error("orchestration cancelled: {reason}")]
    Cancelled {
        /// What interrupted the run
        reason: String,
    },

    /// I/O errors with context
    #[error("I/O error: {context} (path: {path:?})")]
    Io {
        /// Operation being performed
        context: String,
        /// Path involved, if any
        path: Option<PathBuf>,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl HolonError {
    /// Create a usage error
    pub fn usage(message: impl Into<String>) -> Self {
        HolonError::Usage {
            message: message.into(),
        }
    }

    /// Create an input error for a descriptor path
    pub fn input(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        HolonError::Input {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a no-candidates error
    pub fn no_candidates(intent_id: impl Into<String>) -> Self {
        HolonError::NoCandidates {
            intent_id: intent_id.into(),
        }
    }

    /// Create an I/O error with context
    pub fn io(
        context: impl Into<String>,
        path: Option<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        HolonError::Io {
            context: context.into(),
            path,
            source,
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            HolonError::Usage { .. } => ErrorKind::Usage,
            HolonError::Input { .. } => ErrorKind::Input,
            HolonError::StageSpawn { .. }
            | HolonError::StageFailed { .. }
            | HolonError::StageTimedOut { .. } => ErrorKind::Stage,
            HolonError::MalformedLedgerRecord { .. } | HolonError::Io { .. } => ErrorKind::Ledger,
            HolonError::NoCandidates { .. } => ErrorKind::NoCandidates,
            HolonError::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    /// Process exit code for this error. Always non-zero.
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::Usage => 2,
            ErrorKind::Input => 3,
            ErrorKind::Stage => 4,
            ErrorKind::Ledger => 5,
            ErrorKind::NoCandidates => 6,
            ErrorKind::Cancelled => 130,
        }
    }

    /// Name of the stage involved, for stage errors
    pub fn stage(&self) -> Option<&str> {
        match self {
            HolonError::StageSpawn { stage, .. }
            | HolonError::StageFailed { stage, .. }
            | HolonError::StageTimedOut { stage, .. } => Some(stage),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(HolonError::usage("bad args"), 2)]
    #[case(HolonError::input("intent.json", "missing intent_id"), 3)]
    #[case(
        HolonError::StageFailed {
            stage: "planner.sh".into(),
            status: "exit status: 1".into(),
            stderr: "boom".into(),
        },
        4
    )]
    #[case(
        HolonError::StageTimedOut {
            stage: "executor.sh".into(),
            timeout: Duration::from_secs(3),
        },
        4
    )]
    #[case(
        HolonError::MalformedLedgerRecord {
            path: "plans.jsonl".into(),
            line: 2,
            message: "expected value".into(),
        },
        5
    )]
    #[case(HolonError::no_candidates("i1"), 6)]
    #[case(HolonError::Cancelled { reason: "interrupt".into() }, 130)]
    fn test_exit_codes_are_non_zero_and_stable(#[case] error: HolonError, #[case] code: i32) {
        assert_eq!(error.exit_code(), code);
        assert_ne!(error.exit_code(), 0);
    }

    #[test]
    fn test_stage_failed_display_carries_stderr() {
        let error = HolonError::StageFailed {
            stage: "planner.sh".into(),
            status: "exit status: 1".into(),
            stderr: "no strategy".into(),
        };
        let display = error.to_string();
        assert!(display.contains("planner.sh"));
        assert!(display.contains("no strategy"));
        assert_eq!(error.stage(), Some("planner.sh"));
    }

    #[test]
    fn test_no_candidates_display() {
        let error = HolonError::no_candidates("intent-42");
        assert_eq!(error.kind(), ErrorKind::NoCandidates);
        assert!(error.to_string().contains("intent-42"));
        assert!(error.stage().is_none());
    }
}
