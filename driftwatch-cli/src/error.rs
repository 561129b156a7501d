//! CLI-specific error types and exit code mapping

use driftwatch_core::error::DriftwatchError;
use driftwatch_harness::HarnessError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// One or more scenarios failed.
    #[error("{failed} of {total} scenarios failed")]
    ScenariosFailed {
        /// Number of failed scenarios
        failed: usize,
        /// Number of scenarios run
        total: usize,
    },

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from driftwatch-core.
    #[error("{0}")]
    Core(#[from] DriftwatchError),

    /// Scenario construction error.
    #[error("scenario error: {0}")]
    Scenario(#[from] HarnessError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                                 |
    /// |------|-----------------------------------------|
    /// | 0    | Success                                 |
    /// | 1    | General / command error, failed scenario |
    /// | 2    | Configuration error                     |
    /// | 10   | IO error                                |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Core(DriftwatchError::Config(_)) => 2,
            Self::Io(_) | Self::Core(DriftwatchError::Io(_)) => 10,
            Self::Command(_)
            | Self::ScenariosFailed { .. }
            | Self::JsonSerialize(_)
            | Self::Core(_)
            | Self::Scenario(_) => 1,
        }
    }
}
