//! Resolution errors

use thiserror::Error;

/// A fault reported by a resolution source.
///
/// "Not found" is not one of these; sources report it as `Ok(None)`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    #[error("Source {source_name} failed: {message}")]
    Source {
        source_name: String,
        message: String,
    },

    #[error("Source {source_name} panicked")]
    Panicked { source_name: String },

    #[error("{} sources failed: [{}]", .0.len(), join(.0))]
    Aggregate(Vec<TranslateError>),
}

impl TranslateError {
    pub fn failed(source_name: impl Into<String>, message: impl ToString) -> Self {
        Self::Source {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }

    /// The individual failures behind this error, flattened.
    pub fn causes(&self) -> Vec<&TranslateError> {
        match self {
            TranslateError::Aggregate(errors) => errors.iter().flat_map(|e| e.causes()).collect(),
            other => vec![other],
        }
    }
}

fn join(errors: &[TranslateError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for resolution sources
pub type TranslateResult<T> = std::result::Result<Option<T>, TranslateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_preserves_causes() {
        let nested = TranslateError::Aggregate(vec![
            TranslateError::failed("a", "timeout"),
            TranslateError::Aggregate(vec![TranslateError::Panicked {
                source_name: "b".into(),
            }]),
        ]);

        let causes = nested.causes();
        assert_eq!(causes.len(), 2);
        assert_eq!(causes[0], &TranslateError::failed("a", "timeout"));
        assert!(nested.to_string().contains("Source a failed: timeout"));
    }
}
