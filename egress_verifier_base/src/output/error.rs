// src/output/error.rs
//! Error tier of the verdict model
//!
//! Errors are faults in the verification machinery itself, as opposed to
//! failures (a blocked endpoint) or exceptions (an inconclusive run).

use std::error::Error as StdError;

/// Unclassified or unexpected fault recorded in an [`OutputModel`](super::OutputModel)
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// A line of probe output could not be interpreted
    #[error("line {line_number}: {reason}")]
    MalformedProbeLine { line_number: usize, reason: String },

    /// Probe output matched a generic failure pattern without a known cause
    #[error("unclassified probe error: {message}")]
    Unclassified { message: String },

    /// Any other fault, wrapped with what was being attempted
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl OutputError {
    /// Wrap an arbitrary error with a context message
    pub fn with_context(
        context: impl Into<String>,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self::Context {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn unclassified(message: impl Into<String>) -> Self {
        Self::Unclassified {
            message: message.into(),
        }
    }

    /// Whether this error came from interpreting probe output rather than
    /// from orchestration
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            OutputError::MalformedProbeLine { .. } | OutputError::Unclassified { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_display_includes_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "connection reset");
        let err = OutputError::with_context("fetching console output", io);
        assert_eq!(err.to_string(), "fetching console output: connection reset");
        assert!(err.source().is_some());
        assert!(!err.is_parse_error());
    }

    #[test]
    fn test_malformed_line_display() {
        let err = OutputError::MalformedProbeLine {
            line_number: 4,
            reason: "missing @NV@ prefix".to_string(),
        };
        assert_eq!(err.to_string(), "line 4: missing @NV@ prefix");
        assert!(err.is_parse_error());
    }
}
