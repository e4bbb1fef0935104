//! CLI error types.

use std::fmt;

/// Errors surfaced by the CLI layer.
#[derive(Debug)]
pub enum CliError {
    /// The confirmation prompt failed (e.g. no interactive terminal).
    Prompt(dialoguer::Error),

    /// The run finished with one or more failed dependencies.
    ResolutionFailed { failed: usize },
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Prompt(e) => write!(f, "confirmation prompt failed: {}", e),
            CliError::ResolutionFailed { failed } => {
                write!(f, "{} dependencies failed to resolve", failed)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Prompt(e) => Some(e),
            CliError::ResolutionFailed { .. } => None,
        }
    }
}

impl From<dialoguer::Error> for CliError {
    fn from(e: dialoguer::Error) -> Self {
        CliError::Prompt(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_failed_display() {
        let err = CliError::ResolutionFailed { failed: 3 };
        assert_eq!(err.to_string(), "3 dependencies failed to resolve");
    }
}
