//! Execution request/result model and the execution error taxonomy.

use std::path::PathBuf;

use thiserror::Error;

use crate::content::ContentBlock;

/// A request to compile and run one user-supplied program.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    /// Complete source of the user's `run` module.
    pub code: String,
    /// Wall-clock budget for the produced binary, in seconds.
    pub timeout_secs: u64,
    /// Local crate directories the sandbox package may depend on.
    pub local_deps: Vec<PathBuf>,
}

impl ExecutionRequest {
    /// Build a request with no local dependencies.
    pub fn new(code: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            code: code.into(),
            timeout_secs,
            local_deps: Vec::new(),
        }
    }
}

/// The outcome of a successful execution.
#[derive(Debug, Clone, Default)]
pub struct ExecutionOutput {
    /// Combined stdout+stderr, possibly replaced by a spill summary.
    pub output: String,
    /// The child's exit code. Zero on this type — nonzero exits travel
    /// as [`ExecError`] — but carried so callers log one shape.
    pub exit_code: i32,
    /// Structured content the program returned, if any.
    pub content: Vec<ContentBlock>,
}

/// Execution failures, classified by who can act on them.
///
/// `Recoverable` is delivered to the model as an ordinary tool result so
/// it can adapt; `Fatal` and `Infrastructure` abort the agent turn.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ExecError {
    /// The build failed, the user's `run` returned an error, the program
    /// panicked, or it died on a signal. Carries everything the model
    /// needs to try again.
    #[error("execution failed with exit code {exit_code}")]
    Recoverable {
        /// Combined diagnostics (compiler output or runtime output).
        output: String,
        /// The child's exit code; negative when killed by a signal.
        exit_code: i32,
    },

    /// The generated driver hit an unrecoverable setup problem
    /// (exit code 3), e.g. an MCP server refusing to connect.
    #[error("driver reported a fatal setup failure")]
    Fatal {
        /// Output captured up to the fatal exit.
        output: String,
    },

    /// Workspace creation, file I/O, or a subprocess runner failure
    /// unrelated to the user's code.
    #[error("infrastructure failure: {0}")]
    Infrastructure(String),
}

impl ExecError {
    /// Whether the model should see this failure and may retry.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ExecError::Recoverable { .. })
    }

    /// The captured output, if this failure carries any.
    pub fn output(&self) -> Option<&str> {
        match self {
            ExecError::Recoverable { output, .. } | ExecError::Fatal { output } => Some(output),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable_carries_output_and_code() {
        let err = ExecError::Recoverable {
            output: "error[E0308]: mismatched types".into(),
            exit_code: 1,
        };
        assert!(err.is_recoverable());
        assert_eq!(err.output(), Some("error[E0308]: mismatched types"));
        assert_eq!(err.to_string(), "execution failed with exit code 1");
    }

    #[test]
    fn fatal_and_infrastructure_are_not_recoverable() {
        let fatal = ExecError::Fatal {
            output: "connecting to server \"api\": refused".into(),
        };
        assert!(!fatal.is_recoverable());
        assert!(fatal.output().is_some());

        let infra = ExecError::Infrastructure("tempdir: permission denied".into());
        assert!(!infra.is_recoverable());
        assert!(infra.output().is_none());
    }
}
