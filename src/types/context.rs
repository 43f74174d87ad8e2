//! Contexts: named live bindings to application objects.
//!
//! A [`Context`] is shared by reference among every attribute and action
//! bound to it; rebinding its object between evaluations is how the same
//! ruleset is applied to different application data. The handle is a
//! single-threaded `Rc`, deliberately: a ruleset and the contexts it binds
//! are confined to one thread, and sharing one across threads is a compile
//! error rather than a data race.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use super::action::ContextAction;
use super::attribute::ContextAttribute;
use super::error::{DefinitionKind, RegistryError};
use crate::registry::DefinitionRegistry;

/// A dynamically typed backing object supplied by the host application:
/// a context's bound value or a named service. Reader and perform closures
/// downcast it to the concrete application type.
pub type BackingObject = Arc<dyn Any + Send + Sync>;

/// How a context classification is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationKind {
    /// One of the primitive kinds: `int`, `float`, `bool`, `string`.
    Primitive,
    /// A named application object type.
    Object,
    /// A named application interface.
    Interface,
}

const VALID_PRIMITIVES: &[&str] = &["int", "float", "bool", "string"];

/// What kind of thing a context binds: a classification name (type name or
/// primitive name) plus its kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextDefinition {
    classification: String,
    kind: ClassificationKind,
}

impl ContextDefinition {
    /// Create a definition from a classification name and kind string.
    ///
    /// # Errors
    ///
    /// Fails when the kind is not `primitive`/`object`/`interface`, or when
    /// a primitive classification names an unknown primitive.
    pub fn new(classification: &str, kind: &str) -> Result<Self, RegistryError> {
        let kind = match kind {
            "primitive" => ClassificationKind::Primitive,
            "object" => ClassificationKind::Object,
            "interface" => ClassificationKind::Interface,
            other => {
                return Err(RegistryError::InvalidClassification {
                    kind: other.to_owned(),
                })
            }
        };
        if kind == ClassificationKind::Primitive && !VALID_PRIMITIVES.contains(&classification) {
            return Err(RegistryError::InvalidPrimitive {
                name: classification.to_owned(),
            });
        }
        Ok(Self {
            classification: classification.to_owned(),
            kind,
        })
    }

    /// The classification name (type name or primitive name).
    #[must_use]
    pub fn classification(&self) -> &str {
        &self.classification
    }

    #[must_use]
    pub fn kind(&self) -> ClassificationKind {
        self.kind
    }

    /// Whether a backing object matches this definition.
    ///
    /// Primitive classifications are checked by downcast; `object` and
    /// `interface` classifications carry the name as metadata only and
    /// accept any object.
    #[must_use]
    pub fn matches(&self, object: &BackingObject) -> bool {
        match self.kind {
            ClassificationKind::Primitive => match self.classification.as_str() {
                "int" => object.is::<i64>(),
                "float" => object.is::<f64>(),
                "bool" => object.is::<bool>(),
                "string" => object.is::<String>(),
                _ => false,
            },
            ClassificationKind::Object | ClassificationKind::Interface => true,
        }
    }
}

struct ContextInner {
    name: String,
    definition: ContextDefinition,
    object: RefCell<Option<BackingObject>>,
}

/// A named live binding to an application object.
///
/// Cloning a `Context` clones the handle, not the binding: every clone sees
/// the same bound object.
#[derive(Clone)]
pub struct Context {
    inner: Rc<ContextInner>,
}

impl Context {
    #[must_use]
    pub fn new(name: impl Into<String>, definition: ContextDefinition) -> Self {
        Self {
            inner: Rc::new(ContextInner {
                name: name.into(),
                definition,
                object: RefCell::new(None),
            }),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    #[must_use]
    pub fn definition(&self) -> &ContextDefinition {
        &self.inner.definition
    }

    /// Bind the context to an application object. Every attribute and
    /// action holding this context sees the new binding immediately.
    pub fn set_object(&self, object: BackingObject) {
        *self.inner.object.borrow_mut() = Some(object);
    }

    /// The currently bound object, if any.
    #[must_use]
    pub fn object(&self) -> Option<BackingObject> {
        self.inner.object.borrow().clone()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("name", &self.inner.name)
            .field("bound", &self.inner.object.borrow().is_some())
            .finish()
    }
}

/// The set of contexts a ruleset consults during evaluation, keyed by name.
#[derive(Debug, Default)]
pub struct ContextCollection {
    contexts: Vec<Context>,
}

impl ContextCollection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a context. A context with the same name replaces the previous one.
    pub fn add_context(&mut self, context: Context) {
        if let Some(existing) = self
            .contexts
            .iter_mut()
            .find(|c| c.name() == context.name())
        {
            *existing = context;
        } else {
            self.contexts.push(context);
        }
    }

    /// Look up a context by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Context> {
        self.contexts.iter().find(|c| c.name() == name)
    }

    /// Iterate the contexts in registration order.
    pub fn contexts(&self) -> impl Iterator<Item = &Context> {
        self.contexts.iter()
    }

    /// Bind values into contexts by name. Keys naming no context in this
    /// collection are ignored.
    pub fn set_values(&self, values: impl IntoIterator<Item = (String, BackingObject)>) {
        for (name, object) in values {
            if let Some(context) = self.get(&name) {
                context.set_object(object);
            }
        }
    }

    /// Instantiate the named attribute through the registry and attach it
    /// to its parent context in this collection.
    ///
    /// # Errors
    ///
    /// Fails when the context is not in this collection or the registry
    /// lookup fails.
    pub fn create_context_attribute(
        &self,
        registry: &DefinitionRegistry,
        context_name: &str,
        attribute_name: &str,
    ) -> Result<ContextAttribute, RegistryError> {
        let context = self.get(context_name).ok_or_else(|| RegistryError::NotFound {
            kind: DefinitionKind::Context,
            name: context_name.to_owned(),
        })?;
        let mut attribute = registry.context_attribute(context_name, attribute_name)?;
        attribute.set_parent_context(context.clone());
        Ok(attribute)
    }

    /// Instantiate the named action through the registry and attach it to
    /// its parent context in this collection.
    ///
    /// # Errors
    ///
    /// Fails when the context is not in this collection or the registry
    /// lookup fails.
    pub fn create_context_action(
        &self,
        registry: &DefinitionRegistry,
        context_name: &str,
        action_name: &str,
    ) -> Result<ContextAction, RegistryError> {
        let context = self.get(context_name).ok_or_else(|| RegistryError::NotFound {
            kind: DefinitionKind::Context,
            name: context_name.to_owned(),
        })?;
        let mut action = registry.context_action(context_name, action_name)?;
        action.set_parent_context(context.clone());
        Ok(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object_context(name: &str) -> Context {
        Context::new(name, ContextDefinition::new("Anything", "object").unwrap())
    }

    #[test]
    fn definition_rejects_unknown_kind() {
        let err = ContextDefinition::new("User", "enum").unwrap_err();
        assert!(matches!(err, RegistryError::InvalidClassification { kind } if kind == "enum"));
    }

    #[test]
    fn definition_rejects_unknown_primitive() {
        let err = ContextDefinition::new("char", "primitive").unwrap_err();
        assert!(matches!(err, RegistryError::InvalidPrimitive { name } if name == "char"));
    }

    #[test]
    fn primitive_matching_by_downcast() {
        let def = ContextDefinition::new("int", "primitive").unwrap();
        assert!(def.matches(&(Arc::new(42_i64) as BackingObject)));
        assert!(!def.matches(&(Arc::new("42".to_owned()) as BackingObject)));

        let def = ContextDefinition::new("string", "primitive").unwrap();
        assert!(def.matches(&(Arc::new("hello".to_owned()) as BackingObject)));
    }

    #[test]
    fn object_classification_accepts_anything() {
        let def = ContextDefinition::new("User", "object").unwrap();
        assert!(def.matches(&(Arc::new(1_i64) as BackingObject)));
    }

    #[test]
    fn clones_share_the_binding() {
        let context = object_context("User");
        let clone = context.clone();
        assert!(clone.object().is_none());

        context.set_object(Arc::new(5_i64));
        let seen = clone.object().unwrap();
        assert_eq!(seen.downcast_ref::<i64>(), Some(&5));
    }

    #[test]
    fn set_values_ignores_unknown_keys() {
        let mut collection = ContextCollection::new();
        collection.add_context(object_context("User"));

        collection.set_values([
            ("User".to_owned(), Arc::new(1_i64) as BackingObject),
            ("Ghost".to_owned(), Arc::new(2_i64) as BackingObject),
        ]);

        assert!(collection.get("User").unwrap().object().is_some());
        assert!(collection.get("Ghost").is_none());
    }

    #[test]
    fn add_context_replaces_same_name() {
        let mut collection = ContextCollection::new();
        collection.add_context(object_context("User"));
        let replacement = object_context("User");
        replacement.set_object(Arc::new(9_i64));
        collection.add_context(replacement);

        let stored = collection.get("User").unwrap();
        assert!(stored.object().is_some());
        assert_eq!(collection.contexts().count(), 1);
    }
}
