//! Error types shared across farmjob crates.

/// Top-level error type for farmjob operations.
///
/// Compilation only ever produces `Config`, `Input` and `Graph`; the
/// transparent variants exist for config loading and the CLI harness.
#[derive(Debug, thiserror::Error)]
pub enum FarmjobError {
    /// A required setting is missing, a template is unusable, or the
    /// requested output format is not allowed for the job type.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The frame-range expression or chunk size is invalid.
    #[error("Input error: {message}")]
    Input { message: String },

    /// The task graph violates its structural invariants.
    #[error("Task graph error: {message}")]
    Graph { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using FarmjobError.
pub type FarmjobResult<T> = Result<T, FarmjobError>;

impl FarmjobError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input {
            message: msg.into(),
        }
    }

    pub fn graph(msg: impl Into<String>) -> Self {
        Self::Graph {
            message: msg.into(),
        }
    }

    /// Whether this error was raised by settings validation.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }

    /// Whether this error was raised by frame-range parsing.
    pub fn is_input(&self) -> bool {
        matches!(self, Self::Input { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_message() {
        let err = FarmjobError::config("no render_output_path setting");
        assert_eq!(
            err.to_string(),
            "Configuration error: no render_output_path setting"
        );
        assert!(err.is_config());
        assert!(!err.is_input());
    }

    #[test]
    fn test_input_error_kind() {
        let err = FarmjobError::input("chunk size must be at least 1");
        assert!(err.is_input());
        assert!(err.to_string().starts_with("Input error"));
    }
}
