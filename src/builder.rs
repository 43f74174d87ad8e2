//! The fluent builder chain that assembles a validated rule graph.
//!
//! Builders are strictly single-use: every `start_*` and `end()` consumes
//! the builder by value and moves out, so reusing a finished builder is a
//! compile error rather than a runtime surprise. `start_rule` opens a
//! [`RuleBuilder`]; condition collections nest recursively through
//! [`ConditionCollectionBuilder`]; then/else successor rules are recorded
//! as *named forward references* and resolved only at
//! [`RulesetBuilder::build`], so a rule may point at rules that have not
//! been started yet.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::registry::DefinitionRegistry;
use crate::types::{
    Action, Attribute, Branch, BuildError, ChainType, Condition, ConditionCollection,
    ContextCollection, Rule, RuleNode, RuleRelations, Ruleset, StandardCondition, Value,
};

struct Edge {
    from: String,
    branch: Branch,
    to: String,
}

/// Builder for a complete [`Ruleset`]. Obtained from
/// [`DefinitionRegistry::ruleset_builder`].
pub struct RulesetBuilder<'r> {
    registry: &'r DefinitionRegistry,
    ruleset: Ruleset,
    order: Vec<String>,
    nodes: HashMap<String, RuleNode>,
    edges: Vec<Edge>,
}

impl<'r> RulesetBuilder<'r> {
    pub(crate) fn new(registry: &'r DefinitionRegistry, ruleset: Ruleset) -> Self {
        Self {
            registry,
            ruleset,
            order: Vec::new(),
            nodes: HashMap::new(),
            edges: Vec::new(),
        }
    }

    /// Start authoring a new rule.
    #[must_use]
    pub fn start_rule(self, name: impl Into<String>) -> RuleBuilder<'r> {
        RuleBuilder {
            parent: self,
            node: RuleNode::new(Rule::new(name)),
        }
    }

    /// Resolve every pending then/else reference, compute root status and
    /// the diagnostic indexes, and return the completed ruleset.
    ///
    /// # Errors
    ///
    /// [`BuildError::UnresolvedRuleReference`] when a then/else target was
    /// never started.
    pub fn build(mut self) -> Result<Ruleset, BuildError> {
        for edge in &self.edges {
            if !self.nodes.contains_key(&edge.to) {
                return Err(BuildError::UnresolvedRuleReference {
                    rule: edge.from.clone(),
                    reference: edge.to.clone(),
                });
            }
        }

        let mut non_root: HashSet<String> = HashSet::new();
        let mut relations: HashMap<String, RuleRelations> = self
            .order
            .iter()
            .map(|name| (name.clone(), RuleRelations::default()))
            .collect();

        for edge in &self.edges {
            if let Some(node) = self.nodes.get_mut(&edge.from) {
                match edge.branch {
                    Branch::Then => node.add_then_rule(edge.to.clone()),
                    Branch::Else => node.add_else_rule(edge.to.clone()),
                }
            }
            if let Some(relation) = relations.get_mut(&edge.from) {
                match edge.branch {
                    Branch::Then => relation.then_rules.push(edge.to.clone()),
                    Branch::Else => relation.else_rules.push(edge.to.clone()),
                }
            }
            non_root.insert(edge.to.clone());
        }

        let adjacency: HashMap<String, Vec<String>> = relations
            .iter()
            .map(|(name, relation)| {
                let mut successors = relation.then_rules.clone();
                successors.extend(relation.else_rules.iter().cloned());
                (name.clone(), successors)
            })
            .collect();

        let roots: Vec<String> = self
            .order
            .iter()
            .filter(|name| !non_root.contains(*name))
            .cloned()
            .collect();

        for name in &self.order {
            if let Some(node) = self.nodes.remove(name) {
                self.ruleset.insert_node(node);
            }
        }
        self.ruleset.set_roots(roots);
        self.ruleset.set_indexes(adjacency, relations);

        debug!(
            ruleset = %self.ruleset.name(),
            rules = self.order.len(),
            roots = self.ruleset.root_rule_names().len(),
            "ruleset built"
        );
        Ok(self.ruleset)
    }
}

/// Anything a condition collection can be attached to: a rule (as its
/// condition root) or an enclosing collection (as a nested child).
pub trait ConditionHost: Sized {
    fn registry(&self) -> &DefinitionRegistry;
    fn contexts(&self) -> &ContextCollection;
    fn attach_collection(&mut self, collection: ConditionCollection);
}

/// Builder for a single rule: its condition tree, actions, and successor
/// references.
pub struct RuleBuilder<'r> {
    parent: RulesetBuilder<'r>,
    node: RuleNode,
}

impl<'r> RuleBuilder<'r> {
    /// Attach a human-readable description to the rule.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.node.rule_mut().set_description(description);
        self
    }

    /// Open a condition collection that becomes the rule's condition root.
    #[must_use]
    pub fn start_condition_collection(self, chain: ChainType) -> ConditionCollectionBuilder<Self> {
        ConditionCollectionBuilder {
            parent: self,
            collection: ConditionCollection::new(chain),
        }
    }

    /// Shorthand for `start_condition_collection(ChainType::All)`.
    #[must_use]
    pub fn start_condition_collection_all(self) -> ConditionCollectionBuilder<Self> {
        self.start_condition_collection(ChainType::All)
    }

    /// Shorthand for `start_condition_collection(ChainType::Any)`.
    #[must_use]
    pub fn start_condition_collection_any(self) -> ConditionCollectionBuilder<Self> {
        self.start_condition_collection(ChainType::Any)
    }

    /// Attach an already-assembled condition collection as the rule's
    /// condition root. Used by layers that reconstruct rules from data.
    #[must_use]
    pub fn with_condition_collection(mut self, collection: ConditionCollection) -> Self {
        self.node.rule_mut().set_conditions(collection);
        self
    }

    /// Open a builder for an action performed when the rule is true.
    #[must_use]
    pub fn start_then_action(self) -> ActionBuilder<'r> {
        ActionBuilder {
            parent: self,
            branch: Branch::Then,
            action: None,
            raw: None,
        }
    }

    /// Open a builder for an action performed when the rule is false.
    #[must_use]
    pub fn start_else_action(self) -> ActionBuilder<'r> {
        ActionBuilder {
            parent: self,
            branch: Branch::Else,
            action: None,
            raw: None,
        }
    }

    /// Record that the named rule follows this one when it evaluates true.
    /// The target may not have been started yet; it is resolved at
    /// [`RulesetBuilder::build`].
    #[must_use]
    pub fn add_then_rule(mut self, name: impl Into<String>) -> Self {
        self.parent.edges.push(Edge {
            from: self.node.name().to_owned(),
            branch: Branch::Then,
            to: name.into(),
        });
        self
    }

    /// Record that the named rule follows this one when it evaluates false.
    #[must_use]
    pub fn add_else_rule(mut self, name: impl Into<String>) -> Self {
        self.parent.edges.push(Edge {
            from: self.node.name().to_owned(),
            branch: Branch::Else,
            to: name.into(),
        });
        self
    }

    /// Finalize the rule into its node and return to the ruleset builder.
    ///
    /// # Errors
    ///
    /// [`BuildError::DuplicateRule`] when a rule with this name was
    /// already finished.
    pub fn end(mut self) -> Result<RulesetBuilder<'r>, BuildError> {
        let name = self.node.name().to_owned();
        if self.parent.nodes.contains_key(&name) {
            return Err(BuildError::DuplicateRule { name });
        }
        self.parent.order.push(name.clone());
        self.parent.nodes.insert(name, self.node);
        Ok(self.parent)
    }
}

impl ConditionHost for RuleBuilder<'_> {
    fn registry(&self) -> &DefinitionRegistry {
        self.parent.registry
    }

    fn contexts(&self) -> &ContextCollection {
        self.parent.ruleset.contexts()
    }

    fn attach_collection(&mut self, collection: ConditionCollection) {
        self.node.rule_mut().set_conditions(collection);
    }
}

/// Builder for an ALL/ANY condition collection, possibly nested inside
/// another collection.
pub struct ConditionCollectionBuilder<P: ConditionHost> {
    parent: P,
    collection: ConditionCollection,
}

impl<P: ConditionHost> ConditionCollectionBuilder<P> {
    /// Open a builder for a leaf condition in this collection.
    #[must_use]
    pub fn start_condition(self) -> ConditionBuilder<P> {
        ConditionBuilder {
            parent: self,
            attribute: None,
            operator: None,
            raw: None,
        }
    }

    /// Open a nested collection inside this one.
    #[must_use]
    pub fn start_condition_collection(self, chain: ChainType) -> ConditionCollectionBuilder<Self> {
        ConditionCollectionBuilder {
            parent: self,
            collection: ConditionCollection::new(chain),
        }
    }

    /// Shorthand for `start_condition_collection(ChainType::All)`.
    #[must_use]
    pub fn start_condition_collection_all(self) -> ConditionCollectionBuilder<Self> {
        self.start_condition_collection(ChainType::All)
    }

    /// Shorthand for `start_condition_collection(ChainType::Any)`.
    #[must_use]
    pub fn start_condition_collection_any(self) -> ConditionCollectionBuilder<Self> {
        self.start_condition_collection(ChainType::Any)
    }

    /// Close this collection and attach it to its parent.
    #[must_use]
    pub fn end(mut self) -> P {
        self.parent.attach_collection(self.collection);
        self.parent
    }
}

impl<P: ConditionHost> ConditionHost for ConditionCollectionBuilder<P> {
    fn registry(&self) -> &DefinitionRegistry {
        self.parent.registry()
    }

    fn contexts(&self) -> &ContextCollection {
        self.parent.contexts()
    }

    fn attach_collection(&mut self, collection: ConditionCollection) {
        self.collection.add_condition(Condition::Collection(collection));
    }
}

/// Builder for one leaf condition: attribute, operator, raw input value.
pub struct ConditionBuilder<P: ConditionHost> {
    parent: ConditionCollectionBuilder<P>,
    attribute: Option<Box<dyn Attribute>>,
    operator: Option<String>,
    raw: Option<Value>,
}

impl<P: ConditionHost> ConditionBuilder<P> {
    /// Base the condition on a context attribute, instantiated through the
    /// registry and attached to its context.
    ///
    /// # Errors
    ///
    /// Propagates registry lookup failures; a missing definition aborts
    /// construction of the enclosing rule.
    pub fn context_attribute(mut self, context: &str, name: &str) -> Result<Self, BuildError> {
        let attribute = self
            .parent
            .contexts()
            .create_context_attribute(self.parent.registry(), context, name)?;
        self.attribute = Some(Box::new(attribute));
        Ok(self)
    }

    /// Base the condition on a service attribute.
    ///
    /// # Errors
    ///
    /// Propagates registry lookup failures.
    pub fn service_attribute(mut self, name: &str) -> Result<Self, BuildError> {
        let attribute = self.parent.registry().service_attribute(name)?;
        self.attribute = Some(Box::new(attribute));
        Ok(self)
    }

    /// The operator key for the attribute's comparator.
    #[must_use]
    pub fn operator(mut self, value: impl Into<String>) -> Self {
        self.operator = Some(value.into());
        self
    }

    /// The raw right-hand value for the attribute's input.
    #[must_use]
    pub fn input_value(mut self, raw: impl Into<Value>) -> Self {
        self.raw = Some(raw.into());
        self
    }

    /// Complete the condition and return to the collection builder.
    ///
    /// # Errors
    ///
    /// [`BuildError::MissingAttribute`] when no attribute was set.
    pub fn end(mut self) -> Result<ConditionCollectionBuilder<P>, BuildError> {
        let mut attribute = self.attribute.take().ok_or(BuildError::MissingAttribute)?;
        if let Some(operator) = &self.operator {
            attribute.set_operator_value(operator);
        }
        if let Some(raw) = self.raw.take() {
            attribute.set_input_value(raw)?;
        }
        self.parent
            .collection
            .add_condition(Condition::Standard(StandardCondition::new(attribute)));
        Ok(self.parent)
    }
}

/// Builder for one then- or else-action of a rule.
pub struct ActionBuilder<'r> {
    parent: RuleBuilder<'r>,
    branch: Branch,
    action: Option<Box<dyn Action>>,
    raw: Option<Value>,
}

impl<'r> ActionBuilder<'r> {
    /// Use the named service action.
    ///
    /// # Errors
    ///
    /// Propagates registry lookup failures.
    pub fn service_action(mut self, name: &str) -> Result<Self, BuildError> {
        let action = self.parent.parent.registry.service_action(name)?;
        self.action = Some(Box::new(action));
        Ok(self)
    }

    /// Use the named context action, attached to its context.
    ///
    /// # Errors
    ///
    /// Propagates registry lookup failures.
    pub fn context_action(mut self, context: &str, name: &str) -> Result<Self, BuildError> {
        let action = self
            .parent
            .parent
            .ruleset
            .contexts()
            .create_context_action(self.parent.parent.registry, context, name)?;
        self.action = Some(Box::new(action));
        Ok(self)
    }

    /// The raw parameter value for the action's input.
    #[must_use]
    pub fn input_value(mut self, raw: impl Into<Value>) -> Self {
        self.raw = Some(raw.into());
        self
    }

    /// Complete the action and return to the rule builder.
    ///
    /// # Errors
    ///
    /// [`BuildError::MissingAction`] when no action was set.
    pub fn end(mut self) -> Result<RuleBuilder<'r>, BuildError> {
        let mut action = self.action.take().ok_or(BuildError::MissingAction)?;
        if let Some(raw) = self.raw.take() {
            action.set_input_value(raw)?;
        }
        match self.branch {
            Branch::Then => self.parent.node.rule_mut().add_then_action(action),
            Branch::Else => self.parent.node.rule_mut().add_else_action(action),
        }
        Ok(self.parent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{RulesetDefinition, ServiceMap};
    use crate::types::{Comparator, ContextAttribute, IntegerInput};

    fn registry() -> DefinitionRegistry {
        let mut registry = DefinitionRegistry::new(ServiceMap::new());
        registry.register_input_impl("integer", |_| Box::new(IntegerInput::new()));
        registry.register_context_attribute_impl("identity", || {
            ContextAttribute::new(Comparator::number(), |object| {
                Ok(Value::Int(*object.downcast_ref::<i64>().ok_or("not an i64")?))
            })
        });
        registry.register_input("Integer", "integer", Vec::new());
        registry
            .register_context("Score", "int", "primitive")
            .unwrap();
        registry.register_context_attribute("Value", "Score", "identity", "Integer");
        registry.register_ruleset(
            "main",
            RulesetDefinition {
                contexts: vec!["Score".into()],
                ..RulesetDefinition::default()
            },
        );
        registry
    }

    #[test]
    fn builds_a_rule_with_conditions() {
        let registry = registry();
        let ruleset = registry
            .ruleset_builder("main")
            .unwrap()
            .start_rule("high_score")
            .start_condition_collection_all()
            .start_condition()
            .context_attribute("Score", "Value")
            .unwrap()
            .operator("gte")
            .input_value(100_i64)
            .end()
            .unwrap()
            .end()
            .end()
            .unwrap()
            .build()
            .unwrap();

        let node = ruleset.node("high_score").unwrap();
        assert_eq!(node.rule().conditions().children().len(), 1);
        assert_eq!(ruleset.root_rule_names(), &["high_score"]);
    }

    #[test]
    fn nested_collections_attach_to_their_parent() {
        let registry = registry();
        let ruleset = registry
            .ruleset_builder("main")
            .unwrap()
            .start_rule("nested")
            .start_condition_collection_all()
            .start_condition_collection_any()
            .start_condition()
            .context_attribute("Score", "Value")
            .unwrap()
            .operator("eq")
            .input_value(1_i64)
            .end()
            .unwrap()
            .end()
            .end()
            .end()
            .unwrap()
            .build()
            .unwrap();

        let conditions = ruleset.node("nested").unwrap().rule().conditions();
        assert!(conditions.is_all());
        assert_eq!(conditions.children().len(), 1);
        assert!(conditions.children()[0].is_collection());
    }

    #[test]
    fn unresolved_forward_reference_fails_build() {
        let registry = registry();
        let result = registry
            .ruleset_builder("main")
            .unwrap()
            .start_rule("a")
            .add_then_rule("b")
            .end()
            .unwrap()
            .build();

        assert!(matches!(
            result,
            Err(BuildError::UnresolvedRuleReference { rule, reference })
                if rule == "a" && reference == "b"
        ));
    }

    #[test]
    fn forward_reference_resolves_once_target_started() {
        let registry = registry();
        let ruleset = registry
            .ruleset_builder("main")
            .unwrap()
            .start_rule("a")
            .add_then_rule("b")
            .end()
            .unwrap()
            .start_rule("b")
            .end()
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(ruleset.node("a").unwrap().then_rules(), &["b"]);
        // b has an incoming edge, so a is the only root.
        assert_eq!(ruleset.root_rule_names(), &["a"]);
    }

    #[test]
    fn duplicate_rule_names_error() {
        let registry = registry();
        let result = registry
            .ruleset_builder("main")
            .unwrap()
            .start_rule("a")
            .end()
            .unwrap()
            .start_rule("a")
            .end();

        assert!(matches!(result, Err(BuildError::DuplicateRule { name }) if name == "a"));
    }

    #[test]
    fn condition_without_attribute_errors() {
        let registry = registry();
        let result = registry
            .ruleset_builder("main")
            .unwrap()
            .start_rule("a")
            .start_condition_collection_all()
            .start_condition()
            .operator("eq")
            .end();

        assert!(matches!(result, Err(BuildError::MissingAttribute)));
    }

    #[test]
    fn missing_definition_aborts_the_condition() {
        let registry = registry();
        let builder = registry.ruleset_builder("main").unwrap();
        let result = builder
            .start_rule("a")
            .start_condition_collection_all()
            .start_condition()
            .context_attribute("Score", "Ghost");

        assert!(result.is_err());
    }

    #[test]
    fn adjacency_preserves_duplicates_nodes_collapse() {
        let registry = registry();
        let ruleset = registry
            .ruleset_builder("main")
            .unwrap()
            .start_rule("a")
            .add_then_rule("b")
            .add_then_rule("b")
            .add_else_rule("b")
            .end()
            .unwrap()
            .start_rule("b")
            .end()
            .unwrap()
            .build()
            .unwrap();

        // The node's successor sets collapse duplicates.
        assert_eq!(ruleset.node("a").unwrap().then_rules(), &["b"]);
        // The adjacency list keeps every authored edge.
        assert_eq!(ruleset.adjacency_list()["a"], vec!["b", "b", "b"]);
        // The relation list splits them by branch.
        let relations = &ruleset.relation_list()["a"];
        assert_eq!(relations.then_rules, vec!["b", "b"]);
        assert_eq!(relations.else_rules, vec!["b"]);
    }

    #[test]
    fn mutual_references_leave_no_roots() {
        let registry = registry();
        let ruleset = registry
            .ruleset_builder("main")
            .unwrap()
            .start_rule("a")
            .add_then_rule("b")
            .end()
            .unwrap()
            .start_rule("b")
            .add_then_rule("a")
            .end()
            .unwrap()
            .build()
            .unwrap();

        assert!(ruleset.root_rule_names().is_empty());
    }
}
