//! Action abstractions: named side effects bound to a context or service.

use std::fmt;

use super::attribute::{DynError, MemberCore};
use super::context::{BackingObject, Context};
use super::error::EvaluateError;
use super::input::Input;
use super::value::Value;

/// A registered closure that performs a side effect against a backing
/// object, given the action's typed input value.
pub type PerformFn =
    Box<dyn Fn(&BackingObject, Option<&Value>) -> Result<(), DynError> + Send + Sync>;

/// The action role: a named operation with an input and a `perform` side
/// effect. Failures from the underlying effect propagate to the evaluation
/// caller; nothing is retried or rolled back.
pub trait Action: fmt::Debug {
    /// The name the action was registered under.
    fn name(&self) -> &str;

    /// Optional human-readable description.
    fn description(&self) -> Option<&str>;

    /// The name of the parent context or service, once bound.
    fn parent_name(&self) -> Option<&str>;

    /// The parent context name for context-bound actions, `None` for
    /// service-bound ones.
    fn parent_context_name(&self) -> Option<&str>;

    /// The input supplying the action's parameter, if bound.
    fn input(&self) -> Option<&dyn Input>;

    /// Store the raw authored parameter on the input.
    fn set_input_value(&mut self, raw: Value) -> Result<(), EvaluateError>;

    /// The raw authored parameter, if set.
    fn input_value(&self) -> Option<&Value>;

    /// The typed parameter produced by the input.
    fn typed_input_value(&self) -> Option<Value>;

    /// Execute the side effect against the backing object.
    fn perform(&self) -> Result<(), EvaluateError>;
}

/// An action bound to a parent [`Context`], acting on the context's
/// currently bound object.
pub struct ContextAction {
    core: MemberCore,
    context: Option<Context>,
    effect: PerformFn,
}

impl ContextAction {
    /// Create an action with its perform closure. Name and input are bound
    /// by the registry; the parent context is attached when the action is
    /// created through a
    /// [`ContextCollection`](super::context::ContextCollection).
    pub fn new(
        effect: impl Fn(&BackingObject, Option<&Value>) -> Result<(), DynError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            core: MemberCore::default(),
            context: None,
            effect: Box::new(effect),
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

    pub fn set_parent_context(&mut self, context: Context) {
        self.context = Some(context);
    }
}

impl Action for ContextAction {
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

    fn perform(&self) -> Result<(), EvaluateError> {
        let context = self.context.as_ref().ok_or(EvaluateError::NotConfigured {
            name: self.core.name.clone(),
            missing: "parent context",
        })?;
        let object = context.object().ok_or(EvaluateError::UnboundContext {
            name: context.name().to_owned(),
        })?;
        let value = self.core.typed_input_value();
        (self.effect)(&object, value.as_ref()).map_err(|source| EvaluateError::ActionFailed {
            name: self.core.name.clone(),
            source,
        })
    }
}

impl fmt::Debug for ContextAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextAction")
            .field("name", &self.core.name)
            .field("context", &self.context.as_ref().map(Context::name))
            .finish_non_exhaustive()
    }
}

/// An action bound to a named, process-wide service object.
pub struct ServiceAction {
    core: MemberCore,
    service_name: String,
    service: BackingObject,
    effect: PerformFn,
}

impl ServiceAction {
    /// Create an action against a resolved service object.
    pub fn new(
        service_name: impl Into<String>,
        service: BackingObject,
        effect: impl Fn(&BackingObject, Option<&Value>) -> Result<(), DynError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            core: MemberCore::default(),
            service_name: service_name.into(),
            service,
            effect: Box::new(effect),
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

impl Action for ServiceAction {
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

    fn perform(&self) -> Result<(), EvaluateError> {
        let value = self.core.typed_input_value();
        (self.effect)(&self.service, value.as_ref()).map_err(|source| {
            EvaluateError::ActionFailed {
                name: self.core.name.clone(),
                source,
            }
        })
    }
}

impl fmt::Debug for ServiceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAction")
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
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Counter {
        calls: AtomicI64,
        last: AtomicI64,
    }

    fn increment_action(counter: Arc<Counter>) -> ServiceAction {
        ServiceAction::new("counter", counter, |object, value| {
            let counter = object.downcast_ref::<Counter>().ok_or("expected Counter")?;
            counter.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(Value::Int(v)) = value {
                counter.last.store(*v, Ordering::SeqCst);
            }
            Ok(())
        })
    }

    #[test]
    fn perform_runs_the_effect_with_the_typed_input() {
        let counter = Arc::new(Counter::default());
        let mut action = increment_action(counter.clone());
        action.set_input(Box::new(IntegerInput::new()));
        action.set_input_value(Value::Text("7".into())).unwrap();
        action.perform().unwrap();
        action.perform().unwrap();

        assert_eq!(counter.calls.load(Ordering::SeqCst), 2);
        assert_eq!(counter.last.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn context_action_without_parent_is_not_configured() {
        let mut action = ContextAction::new(|_, _| Ok(()));
        action.set_name("Ban".into());
        let err = action.perform().unwrap_err();
        assert!(matches!(
            err,
            EvaluateError::NotConfigured {
                missing: "parent context",
                ..
            }
        ));
    }

    #[test]
    fn context_action_acts_on_the_bound_object() {
        let context = Context::new(
            "User",
            ContextDefinition::new("User", "object").unwrap(),
        );
        let flags = Arc::new(Counter::default());
        context.set_object(flags.clone());

        let mut action = ContextAction::new(|object, _| {
            let counter = object.downcast_ref::<Counter>().ok_or("expected Counter")?;
            counter.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        action.set_parent_context(context);
        action.perform().unwrap();
        assert_eq!(flags.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn effect_failure_is_wrapped_with_the_action_name() {
        let mut action = ServiceAction::new("svc", Arc::new(()), |_, _| Err("boom".into()));
        action.set_name("Explode".into());
        let err = action.perform().unwrap_err();
        assert!(matches!(err, EvaluateError::ActionFailed { name, .. } if name == "Explode"));
    }
}
