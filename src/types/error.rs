use thiserror::Error;

/// The kind of definition a registry lookup or registration refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionKind {
    Context,
    ContextAttribute,
    ContextAction,
    ServiceAttribute,
    ServiceAction,
    Input,
    Ruleset,
    Service,
}

impl DefinitionKind {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            DefinitionKind::Context => "context",
            DefinitionKind::ContextAttribute => "context attribute",
            DefinitionKind::ContextAction => "context action",
            DefinitionKind::ServiceAttribute => "service attribute",
            DefinitionKind::ServiceAction => "service action",
            DefinitionKind::Input => "input",
            DefinitionKind::Ruleset => "ruleset",
            DefinitionKind::Service => "service",
        }
    }
}

impl std::fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Errors raised by [`DefinitionRegistry`](crate::DefinitionRegistry)
/// registration and lookup operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("{kind} '{name}' is not registered")]
    NotFound { kind: DefinitionKind, name: String },

    #[error("implementation '{implementation}' is not registered as a {expected} implementation")]
    AbstractionMismatch {
        implementation: String,
        expected: DefinitionKind,
    },

    #[error("unknown context classification kind '{kind}'")]
    InvalidClassification { kind: String },

    #[error("'{name}' is not a valid primitive classification")]
    InvalidPrimitive { name: String },
}

/// Errors raised while assembling a ruleset through the builder API.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("rule '{rule}' references rule '{reference}' which was never started")]
    UnresolvedRuleReference { rule: String, reference: String },

    #[error("duplicate rule name '{name}'")]
    DuplicateRule { name: String },

    #[error("condition ended without an attribute")]
    MissingAttribute,

    #[error("action ended without an action binding")]
    MissingAction,

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    NotConfigured(#[from] EvaluateError),
}

/// Errors raised by explicit ruleset validation. Each variant names the
/// check that failed.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("ruleset '{ruleset}' has no root rules")]
    NoRootRules { ruleset: String },

    #[error("ruleset '{ruleset}' contains a cycle: {}", path.join(" -> "))]
    CycleDetected { ruleset: String, path: Vec<String> },
}

/// Errors raised while evaluating a ruleset, rule, or condition.
///
/// Attribute reads and action side effects are supplied by the host
/// application; their failures propagate to the evaluation caller wrapped
/// with the member's name. Nothing is caught or rolled back on the way up.
#[derive(Debug, Error)]
pub enum EvaluateError {
    #[error("'{name}' used before its {missing} was configured")]
    NotConfigured { name: String, missing: &'static str },

    #[error("context '{name}' has no bound value")]
    UnboundContext { name: String },

    #[error("attribute '{name}' failed to read its value")]
    AttributeRead {
        name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("action '{name}' failed")]
    ActionFailed {
        name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message() {
        let err = RegistryError::NotFound {
            kind: DefinitionKind::ContextAttribute,
            name: "Age".into(),
        };
        assert_eq!(err.to_string(), "context attribute 'Age' is not registered");
    }

    #[test]
    fn abstraction_mismatch_message() {
        let err = RegistryError::AbstractionMismatch {
            implementation: "ban".into(),
            expected: DefinitionKind::ServiceAction,
        };
        assert_eq!(
            err.to_string(),
            "implementation 'ban' is not registered as a service action implementation"
        );
    }

    #[test]
    fn unresolved_reference_message() {
        let err = BuildError::UnresolvedRuleReference {
            rule: "A".into(),
            reference: "B".into(),
        };
        assert_eq!(
            err.to_string(),
            "rule 'A' references rule 'B' which was never started"
        );
    }

    #[test]
    fn cycle_message_joins_path() {
        let err = ValidationError::CycleDetected {
            ruleset: "main".into(),
            path: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "ruleset 'main' contains a cycle: a -> b -> a");
    }

    #[test]
    fn not_configured_message() {
        let err = EvaluateError::NotConfigured {
            name: "Age".into(),
            missing: "parent context",
        };
        assert_eq!(err.to_string(), "'Age' used before its parent context was configured");
    }
}
