mod action;
mod attribute;
mod comparator;
mod condition;
mod context;
mod error;
mod input;
mod operator;
mod rule;
mod ruleset;
mod value;

pub use action::{Action, ContextAction, PerformFn, ServiceAction};
pub use attribute::{Attribute, ContextAttribute, DynError, ReadFn, ServiceAttribute};
pub use comparator::{Comparator, TextMatch};
pub use condition::{ChainType, Condition, ConditionCollection, StandardCondition};
pub use context::{
    BackingObject, ClassificationKind, Context, ContextCollection, ContextDefinition,
};
pub use error::{BuildError, DefinitionKind, EvaluateError, RegistryError, ValidationError};
pub use input::{BooleanInput, DateInput, FloatInput, Input, IntegerInput, TextInput};
pub use operator::Operator;
pub use rule::{Branch, Rule, RuleNode};
pub use ruleset::{RuleRelations, Ruleset};
pub use value::Value;
