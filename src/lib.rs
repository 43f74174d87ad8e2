//! A business-rule engine: operator-defined facts ("attributes") and
//! operations ("actions") bound to application contexts or services,
//! assembled by a fluent builder into named rulesets, which are boolean
//! condition trees whose outcomes fire actions and route to further rules.
//!
//! The host application registers implementation factories and definition
//! tuples with a [`DefinitionRegistry`], authors rules through
//! [`RulesetBuilder`], validates the resulting graph with
//! [`validate::validate`], and evaluates it against per-call context
//! values.
//!
//! ```
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use rulewright::{
//!     BackingObject, Comparator, ContextAttribute, DefinitionRegistry, IntegerInput,
//!     RulesetDefinition, ServiceMap, Value, validate,
//! };
//!
//! struct User { age: i64 }
//!
//! let mut registry = DefinitionRegistry::new(ServiceMap::new());
//! registry.register_input_impl("integer", |_| Box::new(IntegerInput::new()));
//! registry.register_context_attribute_impl("user_age", || {
//!     ContextAttribute::new(Comparator::number(), |object| {
//!         let user = object.downcast_ref::<User>().ok_or("expected a User")?;
//!         Ok(Value::Int(user.age))
//!     })
//! });
//! registry.register_input("Integer", "integer", Vec::new());
//! registry.register_context("User", "User", "object").unwrap();
//! registry.register_context_attribute("Age", "User", "user_age", "Integer");
//! registry.register_ruleset("access", RulesetDefinition {
//!     contexts: vec!["User".into()],
//!     ..RulesetDefinition::default()
//! });
//!
//! let ruleset = registry
//!     .ruleset_builder("access").unwrap()
//!     .start_rule("adult")
//!     .start_condition_collection_all()
//!     .start_condition()
//!     .context_attribute("User", "Age").unwrap()
//!     .operator("gte")
//!     .input_value(18_i64)
//!     .end().unwrap()
//!     .end()
//!     .end().unwrap()
//!     .build().unwrap();
//!
//! validate::validate(&ruleset).unwrap();
//!
//! let mut values: HashMap<String, BackingObject> = HashMap::new();
//! values.insert("User".to_owned(), Arc::new(User { age: 20 }));
//! assert!(ruleset.evaluate(values).unwrap());
//! ```

mod builder;
mod error;
mod registry;
pub mod transform;
mod types;
pub mod validate;

pub use builder::{
    ActionBuilder, ConditionBuilder, ConditionCollectionBuilder, ConditionHost, RuleBuilder,
    RulesetBuilder,
};
pub use error::RuleError;
pub use registry::{
    DefinitionRegistry, InputParam, RulesetDefinition, ServiceMap, ServiceResolver,
};
pub use types::{
    Action, Attribute, BackingObject, BooleanInput, Branch, BuildError, ChainType,
    ClassificationKind, Comparator, Condition, ConditionCollection, Context, ContextAction,
    ContextAttribute, ContextCollection, ContextDefinition, DateInput, DefinitionKind, DynError,
    EvaluateError, FloatInput, Input, IntegerInput, Operator, PerformFn, ReadFn, RegistryError,
    Rule, RuleNode, RuleRelations, Ruleset, ServiceAction, ServiceAttribute, StandardCondition,
    TextInput, TextMatch, ValidationError, Value,
};
