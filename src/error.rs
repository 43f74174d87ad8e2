use thiserror::Error;

use crate::types::{BuildError, EvaluateError, RegistryError, ValidationError};

/// Unified error type covering registry lookups, ruleset construction,
/// validation, and evaluation.
///
/// Each stage keeps its own error enum; this wrapper exists for callers
/// that drive the whole pipeline and want a single `?`-able type.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Evaluate(#[from] EvaluateError),
}
