//! The engine's error taxonomy: evaluator, processor, sub-query and cast
//! failures, unified under [`EngineError`] and clause-annotated as they
//! cross pipeline-stage boundaries.

use thiserror::Error;
use tracing::{debug, warn};

use crate::value::CastError;

/// Raised while evaluating a single expression against a row.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{message}")]
pub struct EvaluatorError {
    /// The MySQL-phrased message.
    pub message: String,
}

impl EvaluatorError {
    /// Builds an evaluator error and emits a trace event.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        debug!(%message, "evaluator error");
        Self { message }
    }
}

/// Raised by a pipeline stage, usually wrapping an [`EvaluatorError`]
/// with a clause tag.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{message}")]
pub struct ProcessorError {
    /// The MySQL-phrased message, including any clause annotation.
    pub message: String,
}

impl ProcessorError {
    /// Builds a processor error and emits a trace event.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        debug!(%message, "processor error");
        Self { message }
    }

    /// Wraps an [`EvaluatorError`] with a clause tag, e.g. `"...
    /// (where clause)"` becomes MySQL's `"... in 'where clause'"`
    /// suffix.
    #[must_use]
    pub fn from_evaluator(err: EvaluatorError, clause: &str) -> Self {
        Self::new(format!("{} in '{clause}'", err.message))
    }
}

/// Raised validating a derived table (sub-query in `FROM` or as a
/// scalar expression).
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{message}")]
pub struct SubQueryError {
    /// The MySQL-phrased message.
    pub message: String,
}

impl SubQueryError {
    /// Builds a sub-query error and emits a trace event.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        debug!(%message, "sub-query error");
        Self { message }
    }
}

/// The top-level error returned by [`crate::engine::Engine::execute`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    /// An expression could not be evaluated against its row.
    #[error(transparent)]
    Evaluator(#[from] EvaluatorError),

    /// A pipeline stage rejected the query.
    #[error(transparent)]
    Processor(#[from] ProcessorError),

    /// A derived-table or scalar sub-query failed validation.
    #[error(transparent)]
    SubQuery(#[from] SubQueryError),

    /// A value could not be cast into its column's declared type.
    #[error(transparent)]
    Cast(#[from] CastError),

    /// A parsed statement this engine has no execution vocabulary for
    /// (`UPDATE`, `DELETE`).
    #[error("unsupported statement: {0}")]
    UnsupportedStatement(&'static str),
}

impl EngineError {
    /// Builds the [`EngineError::UnsupportedStatement`] variant and
    /// emits a warning trace event, since an unsupported statement
    /// reaching `execute` usually indicates a caller-side integration
    /// bug rather than routine control flow.
    #[must_use]
    pub fn unsupported_statement(kind: &'static str) -> Self {
        warn!(kind, "unsupported statement reached the engine");
        Self::UnsupportedStatement(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn processor_error_wraps_evaluator_with_clause_tag() {
        let eval_err = EvaluatorError::new("Unknown column 'x'");
        let wrapped = ProcessorError::from_evaluator(eval_err, "where clause");
        assert_eq!(wrapped.message, "Unknown column 'x' in 'where clause'");
    }

    #[test]
    fn engine_error_display_is_transparent() {
        let err: EngineError = EvaluatorError::new("boom").into();
        assert_eq!(err.to_string(), "boom");
    }
}
