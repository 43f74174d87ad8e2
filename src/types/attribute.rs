//! Attribute abstractions: named, typed facts bound to a context or service.
//!
//! An attribute exposes a current value read from its backing object, the
//! [`Comparator`] that judges it, and the [`Input`] that supplies the
//! right-hand value. The two concrete variants differ only in where the
//! backing object comes from: a [`ContextAttribute`] reads through a shared
//! [`Context`] binding set per evaluation, a [`ServiceAttribute`] is
//! constructed once against a process-wide service object.

use std::fmt;

use super::comparator::Comparator;
use super::context::{BackingObject, Context};
use super::error::EvaluateError;
use super::input::Input;
use super::value::Value;

/// Error type produced by application-supplied reader and perform closures.
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// A registered closure that reads a typed value off a backing object.
pub type ReadFn = Box<dyn Fn(&BackingObject) -> Result<Value, DynError> + Send + Sync>;

/// Name, description, and input plumbing shared by attributes and actions.
#[derive(Default)]
pub(crate) struct MemberCore {
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) input: Option<Box<dyn Input>>,
}

impl MemberCore {
    pub(crate) fn set_input_value(&mut self, raw: Value) -> Result<(), EvaluateError> {
        match self.input.as_mut() {
            Some(input) => {
                input.set_raw(raw);
                Ok(())
            }
            None => Err(EvaluateError::NotConfigured {
                name: self.name.clone(),
                missing: "input",
            }),
        }
    }

    pub(crate) fn input_value(&self) -> Option<&Value> {
        self.input.as_ref().and_then(|input| input.raw())
    }

    pub(crate) fn typed_input_value(&self) -> Option<Value> {
        self.input.as_ref().and_then(|input| input.value())
    }
}

impl fmt::Debug for MemberCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberCore")
            .field("name", &self.name)
            .field("input", &self.input.as_ref().map(|i| i.name().to_owned()))
            .finish_non_exhaustive()
    }
}

/// The attribute role: a named, typed fact with a comparator and an input.
///
/// Using an attribute before its parent binding or input is configured
/// fails with [`EvaluateError::NotConfigured`] rather than producing a
/// default.
pub trait Attribute: fmt::Debug {
    /// The name the attribute was registered under.
    fn name(&self) -> &str;

    /// Optional human-readable description.
    fn description(&self) -> Option<&str>;

    /// The name of the parent context or service, once bound.
    fn parent_name(&self) -> Option<&str>;

    /// The parent context name for context-bound attributes, `None` for
    /// service-bound ones. Distinguishes the two variants in the
    /// round-trip representation.
    fn parent_context_name(&self) -> Option<&str>;

    /// Read the attribute's current value from its backing object.
    fn value(&self) -> Result<Value, EvaluateError>;

    /// The comparator judging this attribute.
    fn comparator(&self) -> &Comparator;

    fn comparator_mut(&mut self) -> &mut Comparator;

    /// The input supplying the right-hand value, if bound.
    fn input(&self) -> Option<&dyn Input>;

    /// Set the comparator's current operator. Unknown keys are silently
    /// ignored, matching [`Comparator::set_current_operator`].
    fn set_operator_value(&mut self, value: &str) {
        self.comparator_mut().set_current_operator(value);
    }

    /// The current operator key, if one was set.
    fn operator_value(&self) -> Option<&'static str> {
        self.comparator().current_operator().map(|op| op.value())
    }

    /// Store the raw authored right-hand value on the input.
    fn set_input_value(&mut self, raw: Value) -> Result<(), EvaluateError>;

    /// The raw authored right-hand value, if set.
    fn input_value(&self) -> Option<&Value>;

    /// The typed right-hand value produced by the input.
    fn typed_input_value(&self) -> Option<Value>;
}

/// An attribute bound to a parent [`Context`], reading its value from the
/// context's currently bound object.
pub struct ContextAttribute {
    core: MemberCore,
    context: Option<Context>,
    comparator: Comparator,
    read: ReadFn,
}

impl ContextAttribute {
    /// Create an attribute with its comparator and reader closure.
    ///
    /// The name and input are bound by the registry; the parent context is
    /// attached when the attribute is created through a
    /// [`ContextCollection`](super::context::ContextCollection).
    pub fn new(
        comparator: Comparator,
        read: impl Fn(&BackingObject) -> Result<Value, DynError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            core: MemberCore::default(),
            context: None,
            comparator,
            read: Box::new(read),
        }
    }

    /// Attach a human-readable description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.core.description = Some(description.into());
        self
    }

    pub fn set_name(&mut self, name: String) {
        self.core.name = name;
    }

    pub fn set_input(&mut self, input: Box<dyn Input>) {
        self.core.input = Some(input);
    }

    pub fn set_parent_context(&mut self, context: Context) {
        self.context = Some(context);
    }

    #[must_use]
    pub fn parent_context(&self) -> Option<&Context> {
        self.context.as_ref()
    }
}

impl Attribute for ContextAttribute {
    fn name(&self) -> &str {
        &self.core.name
    }

    fn description(&self) -> Option<&str> {
        self.core.description.as_deref()
    }

    fn parent_name(&self) -> Option<&str> {
        self.context.as_ref().map(Context::name)
    }

    fn parent_context_name(&self) -> Option<&str> {
        self.parent_name()
    }

    fn value(&self) -> Result<Value, EvaluateError> {
        let context = self.context.as_ref().ok_or(EvaluateError::NotConfigured {
            name: self.core.name.clone(),
            missing: "parent context",
        })?;
        let object = context.object().ok_or(EvaluateError::UnboundContext {
            name: context.name().to_owned(),
        })?;
        (self.read)(&object).map_err(|source| EvaluateError::AttributeRead {
            name: self.core.name.clone(),
            source,
        })
    }

    fn comparator(&self) -> &Comparator {
        &self.comparator
    }

    fn comparator_mut(&mut self) -> &mut Comparator {
        &mut self.comparator
    }

    fn input(&self) -> Option<&dyn Input> {
        self.core.input.as_deref()
    }

    fn set_input_value(&mut self, raw: Value) -> Result<(), EvaluateError> {
        self.core.set_input_value(raw)
    }

    fn input_value(&self) -> Option<&Value> {
        self.core.input_value()
    }

    fn typed_input_value(&self) -> Option<Value> {
        self.core.typed_input_value()
    }
}

impl fmt::Debug for ContextAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextAttribute")
            .field("name", &self.core.name)
            .field("context", &self.context.as_ref().map(Context::name))
            .finish_non_exhaustive()
    }
}

/// An attribute bound to a named, process-wide service object.
pub struct ServiceAttribute {
    core: MemberCore,
    service_name: String,
    service: BackingObject,
    comparator: Comparator,
    read: ReadFn,
}

impl ServiceAttribute {
    /// Create an attribute against a resolved service object.
    pub fn new(
        service_name: impl Into<String>,
        service: BackingObject,
        comparator: Comparator,
        read: impl Fn(&BackingObject) -> Result<Value, DynError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            core: MemberCore::default(),
            service_name: service_name.into(),
            service,
            comparator,
            read: Box::new(read),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.core.description = Some(description.into());
        self
    }

    pub fn set_name(&mut self, name: String) {
        self.core.name = name;
    }

    pub fn set_input(&mut self, input: Box<dyn Input>) {
        self.core.input = Some(input);
    }
}

impl Attribute for ServiceAttribute {
    fn name(&self) -> &str {
        &self.core.name
    }

    fn description(&self) -> Option<&str> {
        self.core.description.as_deref()
    }

    fn parent_name(&self) -> Option<&str> {
        Some(&self.service_name)
    }

    fn parent_context_name(&self) -> Option<&str> {
        None
    }

    fn value(&self) -> Result<Value, EvaluateError> {
        (self.read)(&self.service).map_err(|source| EvaluateError::AttributeRead {
            name: self.core.name.clone(),
            source,
        })
    }

    fn comparator(&self) -> &Comparator {
        &self.comparator
    }

    fn comparator_mut(&mut self) -> &mut Comparator {
        &mut self.comparator
    }

    fn input(&self) -> Option<&dyn Input> {
        self.core.input.as_deref()
    }

    fn set_input_value(&mut self, raw: Value) -> Result<(), EvaluateError> {
        self.core.set_input_value(raw)
    }

    fn input_value(&self) -> Option<&Value> {
        self.core.input_value()
    }

    fn typed_input_value(&self) -> Option<Value> {
        self.core.typed_input_value()
    }
}

impl fmt::Debug for ServiceAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAttribute")
            .field("name", &self.core.name)
            .field("service", &self.service_name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::context::ContextDefinition;
    use crate::types::input::IntegerInput;
    use std::sync::Arc;

    struct User {
        age: i64,
    }

    fn age_attribute() -> ContextAttribute {
        ContextAttribute::new(Comparator::number(), |object| {
            let user = object
                .downcast_ref::<User>()
                .ok_or("expected a User object")?;
            Ok(Value::Int(user.age))
        })
    }

    fn user_context() -> Context {
        Context::new(
            "User",
            ContextDefinition::new("User", "object").unwrap(),
        )
    }

    #[test]
    fn value_before_parent_context_is_not_configured() {
        let attribute = age_attribute();
        let err = attribute.value().unwrap_err();
        assert!(matches!(
            err,
            EvaluateError::NotConfigured {
                missing: "parent context",
                ..
            }
        ));
    }

    #[test]
    fn value_before_context_binding_is_unbound() {
        let mut attribute = age_attribute();
        attribute.set_parent_context(user_context());
        let err = attribute.value().unwrap_err();
        assert!(matches!(err, EvaluateError::UnboundContext { name } if name == "User"));
    }

    #[test]
    fn value_reads_through_the_context() {
        let mut attribute = age_attribute();
        let context = user_context();
        context.set_object(Arc::new(User { age: 20 }));
        attribute.set_parent_context(context);
        assert_eq!(attribute.value().unwrap(), Value::Int(20));
    }

    #[test]
    fn reader_failure_is_wrapped_with_the_attribute_name() {
        let mut attribute = age_attribute();
        attribute.set_name("Age".into());
        let context = user_context();
        context.set_object(Arc::new("not a user"));
        attribute.set_parent_context(context);
        let err = attribute.value().unwrap_err();
        assert!(matches!(err, EvaluateError::AttributeRead { name, .. } if name == "Age"));
    }

    #[test]
    fn operator_pass_through() {
        let mut attribute = age_attribute();
        assert_eq!(attribute.operator_value(), None);
        attribute.set_operator_value("gte");
        assert_eq!(attribute.operator_value(), Some("gte"));
        attribute.set_operator_value("bogus");
        assert_eq!(attribute.operator_value(), Some("gte"));
    }

    #[test]
    fn input_value_requires_an_input() {
        let mut attribute = age_attribute();
        attribute.set_name("Age".into());
        let err = attribute.set_input_value(Value::Int(18)).unwrap_err();
        assert!(matches!(
            err,
            EvaluateError::NotConfigured { missing: "input", .. }
        ));

        attribute.set_input(Box::new(IntegerInput::new()));
        attribute.set_input_value(Value::Text("18".into())).unwrap();
        assert_eq!(attribute.input_value(), Some(&Value::Text("18".into())));
        assert_eq!(attribute.typed_input_value(), Some(Value::Int(18)));
    }

    #[test]
    fn service_attribute_reads_its_service_object() {
        struct Clock {
            today: &'static str,
        }
        let mut attribute = ServiceAttribute::new(
            "clock",
            Arc::new(Clock { today: "2024-06-01" }),
            Comparator::text(),
            |object| {
                let clock = object.downcast_ref::<Clock>().ok_or("expected a Clock")?;
                Ok(Value::Text(clock.today.to_owned()))
            },
        );
        attribute.set_name("Today".into());
        assert_eq!(attribute.parent_name(), Some("clock"));
        assert_eq!(attribute.parent_context_name(), None);
        assert_eq!(attribute.value().unwrap(), Value::Text("2024-06-01".into()));
    }
}
