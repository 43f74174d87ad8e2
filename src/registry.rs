//! The definition registry: a write-once-then-read catalog of everything a
//! ruleset can be built from.
//!
//! Two layers live here. *Implementation factories* are named constructor
//! closures registered by the host application, one per attribute, action,
//! or input kind, replacing any instantiate-class-by-name reflection
//! machinery. *Definition tuples* reference those factories
//! by id and wire them to contexts, services, and inputs. Lookups
//! instantiate fresh live objects on demand; nothing is cached across
//! calls.
//!
//! Service objects and `@name` input parameters are obtained through a
//! [`ServiceResolver`] passed in at construction, never through ambient
//! global state.

use std::collections::HashMap;

use tracing::debug;

use crate::builder::RulesetBuilder;
use crate::types::{
    BackingObject, Context, ContextAction, ContextAttribute, ContextCollection,
    ContextDefinition, DefinitionKind, Input, RegistryError, Ruleset, ServiceAction,
    ServiceAttribute, Value,
};

// ---------------------------------------------------------------------------
// Service resolution
// ---------------------------------------------------------------------------

/// Resolves named, process-wide service objects for service-bound members
/// and `@name` input parameters.
pub trait ServiceResolver: Send + Sync {
    /// The object registered under `name` with the host, if any.
    fn resolve(&self, name: &str) -> Option<BackingObject>;
}

/// A plain map-backed [`ServiceResolver`] for hosts without a service
/// container of their own.
#[derive(Default)]
pub struct ServiceMap {
    services: HashMap<String, BackingObject>,
}

impl ServiceMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service object under a name.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, object: BackingObject) -> Self {
        self.services.insert(name.into(), object);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, object: BackingObject) {
        self.services.insert(name.into(), object);
    }
}

impl ServiceResolver for ServiceMap {
    fn resolve(&self, name: &str) -> Option<BackingObject> {
        self.services.get(name).cloned()
    }
}

// ---------------------------------------------------------------------------
// Factories and definition tuples
// ---------------------------------------------------------------------------

/// A parameter handed to an input factory: a plain value, or a service
/// object resolved from an `@name` reference.
pub enum InputParam {
    Value(Value),
    Service(BackingObject),
}

type ContextAttributeFactory = Box<dyn Fn() -> ContextAttribute + Send + Sync>;
type ContextActionFactory = Box<dyn Fn() -> ContextAction + Send + Sync>;
type ServiceAttributeFactory = Box<dyn Fn(&str, BackingObject) -> ServiceAttribute + Send + Sync>;
type ServiceActionFactory = Box<dyn Fn(&str, BackingObject) -> ServiceAction + Send + Sync>;
type InputFactory = Box<dyn Fn(&[InputParam]) -> Box<dyn Input> + Send + Sync>;

enum Factory {
    ContextAttribute(ContextAttributeFactory),
    ContextAction(ContextActionFactory),
    ServiceAttribute(ServiceAttributeFactory),
    ServiceAction(ServiceActionFactory),
    Input(InputFactory),
}

struct MemberDefinition {
    implementation: String,
    input: String,
}

struct ServiceMemberDefinition {
    service: String,
    implementation: String,
    input: String,
}

struct InputDefinition {
    implementation: String,
    params: Vec<Value>,
}

/// What a registered ruleset is made of: its context names and the names
/// of ruleset-scoped service attributes and actions.
#[derive(Debug, Clone, Default)]
pub struct RulesetDefinition {
    pub contexts: Vec<String>,
    pub attributes: Vec<String>,
    pub actions: Vec<String>,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Catalog mapping names to registered definitions, and the factory that
/// instantiates live attributes, actions, inputs, contexts, and ruleset
/// shells from them.
///
/// Registration is last-write-wins: re-registering a name silently
/// replaces the previous definition. Populate the registry fully before
/// reading from it; a populated registry may be shared read-only.
pub struct DefinitionRegistry {
    resolver: Box<dyn ServiceResolver>,
    factories: HashMap<String, Factory>,
    contexts: HashMap<String, ContextDefinition>,
    context_attributes: HashMap<String, HashMap<String, MemberDefinition>>,
    context_actions: HashMap<String, HashMap<String, MemberDefinition>>,
    service_attributes: HashMap<String, ServiceMemberDefinition>,
    service_actions: HashMap<String, ServiceMemberDefinition>,
    inputs: HashMap<String, InputDefinition>,
    rulesets: HashMap<String, RulesetDefinition>,
}

impl DefinitionRegistry {
    #[must_use]
    pub fn new(resolver: impl ServiceResolver + 'static) -> Self {
        Self {
            resolver: Box::new(resolver),
            factories: HashMap::new(),
            contexts: HashMap::new(),
            context_attributes: HashMap::new(),
            context_actions: HashMap::new(),
            service_attributes: HashMap::new(),
            service_actions: HashMap::new(),
            inputs: HashMap::new(),
            rulesets: HashMap::new(),
        }
    }

    // -- implementation factories -------------------------------------------

    /// Register a constructor for a context-attribute implementation.
    pub fn register_context_attribute_impl(
        &mut self,
        id: impl Into<String>,
        factory: impl Fn() -> ContextAttribute + Send + Sync + 'static,
    ) {
        self.factories
            .insert(id.into(), Factory::ContextAttribute(Box::new(factory)));
    }

    /// Register a constructor for a context-action implementation.
    pub fn register_context_action_impl(
        &mut self,
        id: impl Into<String>,
        factory: impl Fn() -> ContextAction + Send + Sync + 'static,
    ) {
        self.factories
            .insert(id.into(), Factory::ContextAction(Box::new(factory)));
    }

    /// Register a constructor for a service-attribute implementation. The
    /// factory receives the service name and resolved service object.
    pub fn register_service_attribute_impl(
        &mut self,
        id: impl Into<String>,
        factory: impl Fn(&str, BackingObject) -> ServiceAttribute + Send + Sync + 'static,
    ) {
        self.factories
            .insert(id.into(), Factory::ServiceAttribute(Box::new(factory)));
    }

    /// Register a constructor for a service-action implementation.
    pub fn register_service_action_impl(
        &mut self,
        id: impl Into<String>,
        factory: impl Fn(&str, BackingObject) -> ServiceAction + Send + Sync + 'static,
    ) {
        self.factories
            .insert(id.into(), Factory::ServiceAction(Box::new(factory)));
    }

    /// Register a constructor for an input implementation. The factory
    /// receives the definition's parameters with `@name` references
    /// already resolved.
    pub fn register_input_impl(
        &mut self,
        id: impl Into<String>,
        factory: impl Fn(&[InputParam]) -> Box<dyn Input> + Send + Sync + 'static,
    ) {
        self.factories
            .insert(id.into(), Factory::Input(Box::new(factory)));
    }

    // -- definition registration --------------------------------------------

    /// Register a context.
    ///
    /// # Errors
    ///
    /// Fails on a malformed classification kind or primitive name.
    pub fn register_context(
        &mut self,
        name: impl Into<String>,
        classification: &str,
        kind: &str,
    ) -> Result<(), RegistryError> {
        let definition = ContextDefinition::new(classification, kind)?;
        let name = name.into();
        self.context_attributes.entry(name.clone()).or_default();
        self.context_actions.entry(name.clone()).or_default();
        self.contexts.insert(name, definition);
        Ok(())
    }

    /// Register an attribute under a parent context.
    pub fn register_context_attribute(
        &mut self,
        name: impl Into<String>,
        context: impl Into<String>,
        implementation: impl Into<String>,
        input: impl Into<String>,
    ) {
        self.context_attributes
            .entry(context.into())
            .or_default()
            .insert(
                name.into(),
                MemberDefinition {
                    implementation: implementation.into(),
                    input: input.into(),
                },
            );
    }

    /// Register an action under a parent context.
    pub fn register_context_action(
        &mut self,
        name: impl Into<String>,
        context: impl Into<String>,
        implementation: impl Into<String>,
        input: impl Into<String>,
    ) {
        self.context_actions
            .entry(context.into())
            .or_default()
            .insert(
                name.into(),
                MemberDefinition {
                    implementation: implementation.into(),
                    input: input.into(),
                },
            );
    }

    /// Register an attribute backed by a named service.
    pub fn register_service_attribute(
        &mut self,
        name: impl Into<String>,
        service: impl Into<String>,
        implementation: impl Into<String>,
        input: impl Into<String>,
    ) {
        self.service_attributes.insert(
            name.into(),
            ServiceMemberDefinition {
                service: service.into(),
                implementation: implementation.into(),
                input: input.into(),
            },
        );
    }

    /// Register an action backed by a named service.
    pub fn register_service_action(
        &mut self,
        name: impl Into<String>,
        service: impl Into<String>,
        implementation: impl Into<String>,
        input: impl Into<String>,
    ) {
        self.service_actions.insert(
            name.into(),
            ServiceMemberDefinition {
                service: service.into(),
                implementation: implementation.into(),
                input: input.into(),
            },
        );
    }

    /// Register an input. Text parameters of the form `@name` are resolved
    /// to service objects at instantiation time.
    pub fn register_input(
        &mut self,
        name: impl Into<String>,
        implementation: impl Into<String>,
        params: Vec<Value>,
    ) {
        self.inputs.insert(
            name.into(),
            InputDefinition {
                implementation: implementation.into(),
                params,
            },
        );
    }

    /// Register a ruleset shell definition.
    pub fn register_ruleset(&mut self, name: impl Into<String>, definition: RulesetDefinition) {
        self.rulesets.insert(name.into(), definition);
    }

    // -- lookups -------------------------------------------------------------

    /// A fresh context shell for the given name, with no value bound.
    ///
    /// # Errors
    ///
    /// `NotFound` when the context is unregistered.
    pub fn context(&self, name: &str) -> Result<Context, RegistryError> {
        let definition = self.contexts.get(name).ok_or_else(|| not_found(
            DefinitionKind::Context,
            name,
        ))?;
        Ok(Context::new(name, definition.clone()))
    }

    /// Instantiate a context attribute: construct through its factory,
    /// bind its input and name. The caller attaches the parent context.
    ///
    /// # Errors
    ///
    /// `NotFound` when the pair is unregistered; `AbstractionMismatch`
    /// when the implementation id is registered under a different kind.
    pub fn context_attribute(
        &self,
        context: &str,
        name: &str,
    ) -> Result<ContextAttribute, RegistryError> {
        let definition = self
            .context_attributes
            .get(context)
            .and_then(|members| members.get(name))
            .ok_or_else(|| not_found(
                DefinitionKind::ContextAttribute,
                &format!("{context}.{name}"),
            ))?;

        let factory = self.factory(
            &definition.implementation,
            DefinitionKind::ContextAttribute,
        )?;
        let Factory::ContextAttribute(make) = factory else {
            return Err(mismatch(&definition.implementation, DefinitionKind::ContextAttribute));
        };

        let mut attribute = make();
        attribute.set_input(self.input(&definition.input)?);
        attribute.set_name(name.to_owned());
        Ok(attribute)
    }

    /// Instantiate a context action. The caller attaches the parent
    /// context.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`context_attribute`](Self::context_attribute).
    pub fn context_action(
        &self,
        context: &str,
        name: &str,
    ) -> Result<ContextAction, RegistryError> {
        let definition = self
            .context_actions
            .get(context)
            .and_then(|members| members.get(name))
            .ok_or_else(|| not_found(
                DefinitionKind::ContextAction,
                &format!("{context}.{name}"),
            ))?;

        let factory = self.factory(&definition.implementation, DefinitionKind::ContextAction)?;
        let Factory::ContextAction(make) = factory else {
            return Err(mismatch(&definition.implementation, DefinitionKind::ContextAction));
        };

        let mut action = make();
        action.set_input(self.input(&definition.input)?);
        action.set_name(name.to_owned());
        Ok(action)
    }

    /// Instantiate a service attribute, resolving its backing service.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unregistered name or unresolvable service;
    /// `AbstractionMismatch` for a wrong-kind implementation.
    pub fn service_attribute(&self, name: &str) -> Result<ServiceAttribute, RegistryError> {
        let definition = self
            .service_attributes
            .get(name)
            .ok_or_else(|| not_found(DefinitionKind::ServiceAttribute, name))?;

        let factory = self.factory(
            &definition.implementation,
            DefinitionKind::ServiceAttribute,
        )?;
        let Factory::ServiceAttribute(make) = factory else {
            return Err(mismatch(&definition.implementation, DefinitionKind::ServiceAttribute));
        };

        let service = self.resolve_service(&definition.service)?;
        let mut attribute = make(&definition.service, service);
        attribute.set_input(self.input(&definition.input)?);
        attribute.set_name(name.to_owned());
        Ok(attribute)
    }

    /// Instantiate a service action, resolving its backing service.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`service_attribute`](Self::service_attribute).
    pub fn service_action(&self, name: &str) -> Result<ServiceAction, RegistryError> {
        let definition = self
            .service_actions
            .get(name)
            .ok_or_else(|| not_found(DefinitionKind::ServiceAction, name))?;

        let factory = self.factory(&definition.implementation, DefinitionKind::ServiceAction)?;
        let Factory::ServiceAction(make) = factory else {
            return Err(mismatch(&definition.implementation, DefinitionKind::ServiceAction));
        };

        let service = self.resolve_service(&definition.service)?;
        let mut action = make(&definition.service, service);
        action.set_input(self.input(&definition.input)?);
        action.set_name(name.to_owned());
        Ok(action)
    }

    /// Instantiate an input, resolving `@name` parameters to services and
    /// setting the input's name.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unregistered input name or unresolvable `@name`
    /// parameter; `AbstractionMismatch` for a wrong-kind implementation.
    pub fn input(&self, name: &str) -> Result<Box<dyn Input>, RegistryError> {
        let definition = self
            .inputs
            .get(name)
            .ok_or_else(|| not_found(DefinitionKind::Input, name))?;

        let factory = self.factory(&definition.implementation, DefinitionKind::Input)?;
        let Factory::Input(make) = factory else {
            return Err(mismatch(&definition.implementation, DefinitionKind::Input));
        };

        let mut params = Vec::with_capacity(definition.params.len());
        for param in &definition.params {
            match param {
                Value::Text(text) if text.starts_with('@') => {
                    params.push(InputParam::Service(self.resolve_service(&text[1..])?));
                }
                value => params.push(InputParam::Value(value.clone())),
            }
        }

        let mut input = make(&params);
        input.set_name(name.to_owned());
        Ok(input)
    }

    /// An empty ruleset shell: contexts built from the registered context
    /// names, ruleset-scoped service attributes and actions attached.
    ///
    /// # Errors
    ///
    /// `NotFound` when the ruleset or anything it references is
    /// unregistered.
    pub fn ruleset(&self, name: &str) -> Result<Ruleset, RegistryError> {
        let definition = self
            .rulesets
            .get(name)
            .ok_or_else(|| not_found(DefinitionKind::Ruleset, name))?;

        let mut contexts = ContextCollection::new();
        for context_name in &definition.contexts {
            contexts.add_context(self.context(context_name)?);
        }

        let mut ruleset = Ruleset::new(name, contexts);
        for attribute_name in &definition.attributes {
            ruleset.add_service_attribute(Box::new(self.service_attribute(attribute_name)?));
        }
        for action_name in &definition.actions {
            ruleset.add_service_action(Box::new(self.service_action(action_name)?));
        }

        debug!(ruleset = name, contexts = definition.contexts.len(), "assembled ruleset shell");
        Ok(ruleset)
    }

    /// A fresh builder bound to the registered ruleset shell.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`ruleset`](Self::ruleset).
    pub fn ruleset_builder(&self, name: &str) -> Result<RulesetBuilder<'_>, RegistryError> {
        Ok(RulesetBuilder::new(self, self.ruleset(name)?))
    }

    // -- enumerations --------------------------------------------------------

    /// Names of every registered ruleset.
    #[must_use]
    pub fn ruleset_names(&self) -> Vec<&str> {
        self.rulesets.keys().map(String::as_str).collect()
    }

    /// Names of every registered context.
    #[must_use]
    pub fn context_names(&self) -> Vec<&str> {
        self.contexts.keys().map(String::as_str).collect()
    }

    /// Every attribute registered under a context, fully instantiated.
    /// An unknown context yields an empty list.
    ///
    /// # Errors
    ///
    /// Propagates instantiation failures.
    pub fn all_context_attributes(
        &self,
        context: &str,
    ) -> Result<Vec<ContextAttribute>, RegistryError> {
        let Some(members) = self.context_attributes.get(context) else {
            return Ok(Vec::new());
        };
        members
            .keys()
            .map(|name| self.context_attribute(context, name))
            .collect()
    }

    /// Every action registered under a context, fully instantiated.
    ///
    /// # Errors
    ///
    /// Propagates instantiation failures.
    pub fn all_context_actions(
        &self,
        context: &str,
    ) -> Result<Vec<ContextAction>, RegistryError> {
        let Some(members) = self.context_actions.get(context) else {
            return Ok(Vec::new());
        };
        members
            .keys()
            .map(|name| self.context_action(context, name))
            .collect()
    }

    /// Every registered service attribute, fully instantiated.
    ///
    /// # Errors
    ///
    /// Propagates instantiation failures.
    pub fn all_service_attributes(&self) -> Result<Vec<ServiceAttribute>, RegistryError> {
        self.service_attributes
            .keys()
            .map(|name| self.service_attribute(name))
            .collect()
    }

    /// Every registered service action, fully instantiated.
    ///
    /// # Errors
    ///
    /// Propagates instantiation failures.
    pub fn all_service_actions(&self) -> Result<Vec<ServiceAction>, RegistryError> {
        self.service_actions
            .keys()
            .map(|name| self.service_action(name))
            .collect()
    }

    // -- internals -----------------------------------------------------------

    fn factory(
        &self,
        implementation: &str,
        expected: DefinitionKind,
    ) -> Result<&Factory, RegistryError> {
        self.factories
            .get(implementation)
            .ok_or_else(|| RegistryError::AbstractionMismatch {
                implementation: implementation.to_owned(),
                expected,
            })
    }

    fn resolve_service(&self, name: &str) -> Result<BackingObject, RegistryError> {
        self.resolver
            .resolve(name)
            .ok_or_else(|| not_found(DefinitionKind::Service, name))
    }
}

fn not_found(kind: DefinitionKind, name: &str) -> RegistryError {
    RegistryError::NotFound {
        kind,
        name: name.to_owned(),
    }
}

fn mismatch(implementation: &str, expected: DefinitionKind) -> RegistryError {
    RegistryError::AbstractionMismatch {
        implementation: implementation.to_owned(),
        expected,
    }
}
