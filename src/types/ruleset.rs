//! The ruleset: a named, validated graph of rules plus its context bindings.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use tracing::debug;

use super::action::Action;
use super::attribute::Attribute;
use super::context::{BackingObject, ContextCollection};
use super::error::EvaluateError;
use super::rule::RuleNode;

/// One entry of the relation list: a rule's successors split by branch.
/// Diagnostic data for external graph rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuleRelations {
    pub then_rules: Vec<String>,
    pub else_rules: Vec<String>,
}

/// A complete ruleset.
///
/// The ruleset owns its [`RuleNode`]s in a name-keyed arena; successor
/// edges are name references resolved against the arena, so authored (and
/// possibly cyclic, pre-validation) graphs never form ownership cycles.
/// Built by a [`RulesetBuilder`](crate::RulesetBuilder), validated with
/// [`validate`](crate::validate::validate) before production use.
pub struct Ruleset {
    name: String,
    contexts: ContextCollection,
    nodes: HashMap<String, RuleNode>,
    roots: Vec<String>,
    service_attributes: Vec<Box<dyn Attribute>>,
    service_actions: Vec<Box<dyn Action>>,
    adjacency: HashMap<String, Vec<String>>,
    relations: HashMap<String, RuleRelations>,
}

impl Ruleset {
    /// An empty ruleset shell, ready for a builder to populate.
    #[must_use]
    pub fn new(name: impl Into<String>, contexts: ContextCollection) -> Self {
        Self {
            name: name.into(),
            contexts,
            nodes: HashMap::new(),
            roots: Vec::new(),
            service_attributes: Vec::new(),
            service_actions: Vec::new(),
            adjacency: HashMap::new(),
            relations: HashMap::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn contexts(&self) -> &ContextCollection {
        &self.contexts
    }

    /// Attach a ruleset-scoped service attribute.
    pub fn add_service_attribute(&mut self, attribute: Box<dyn Attribute>) {
        self.service_attributes.push(attribute);
    }

    /// Attach a ruleset-scoped service action.
    pub fn add_service_action(&mut self, action: Box<dyn Action>) {
        self.service_actions.push(action);
    }

    #[must_use]
    pub fn service_attributes(&self) -> &[Box<dyn Attribute>] {
        &self.service_attributes
    }

    #[must_use]
    pub fn service_actions(&self) -> &[Box<dyn Action>] {
        &self.service_actions
    }

    /// Look up a rule node by name.
    #[must_use]
    pub fn node(&self, name: &str) -> Option<&RuleNode> {
        self.nodes.get(name)
    }

    /// Iterate every rule node, in no particular order.
    pub fn nodes(&self) -> impl Iterator<Item = &RuleNode> {
        self.nodes.values()
    }

    /// Names of the root rules, in registration order. A node is a root
    /// iff no other node lists it as a then- or else-successor.
    #[must_use]
    pub fn root_rule_names(&self) -> &[String] {
        &self.roots
    }

    /// The adjacency list computed at build time: every rule's then+else
    /// successor names, duplicates preserved.
    #[must_use]
    pub fn adjacency_list(&self) -> &HashMap<String, Vec<String>> {
        &self.adjacency
    }

    /// The adjacency list with duplicate successors removed, as consumed
    /// by cycle detection.
    #[must_use]
    pub fn reduced_adjacency_list(&self) -> HashMap<String, Vec<String>> {
        self.adjacency
            .iter()
            .map(|(name, targets)| {
                let mut reduced: Vec<String> = Vec::with_capacity(targets.len());
                for target in targets {
                    if !reduced.contains(target) {
                        reduced.push(target.clone());
                    }
                }
                (name.clone(), reduced)
            })
            .collect()
    }

    /// The relation list computed at build time: successors split by
    /// branch, for diagnostic graph display.
    #[must_use]
    pub fn relation_list(&self) -> &HashMap<String, RuleRelations> {
        &self.relations
    }

    /// Evaluate the ruleset.
    ///
    /// Binds `values` into the matching contexts by name (unknown keys are
    /// ignored), then evaluates **every** root rule in registration order
    /// and ANDs the results. Roots are never short-circuited: each root's
    /// actions fire regardless of earlier roots' outcomes.
    ///
    /// # Errors
    ///
    /// Propagates the first attribute or action failure; earlier side
    /// effects are not rolled back.
    pub fn evaluate(
        &self,
        values: HashMap<String, BackingObject>,
    ) -> Result<bool, EvaluateError> {
        self.contexts.set_values(values);

        let mut result = true;
        for root in &self.roots {
            if let Some(node) = self.nodes.get(root) {
                let eval = node.evaluate()?;
                result = result && eval;
            }
        }
        debug!(ruleset = %self.name, roots = self.roots.len(), result, "ruleset evaluated");
        Ok(result)
    }

    pub(crate) fn insert_node(&mut self, node: RuleNode) {
        self.nodes.insert(node.name().to_owned(), node);
    }

    pub(crate) fn node_mut(&mut self, name: &str) -> Option<&mut RuleNode> {
        self.nodes.get_mut(name)
    }

    pub(crate) fn set_roots(&mut self, roots: Vec<String>) {
        self.roots = roots;
    }

    pub(crate) fn set_indexes(
        &mut self,
        adjacency: HashMap<String, Vec<String>>,
        relations: HashMap<String, RuleRelations>,
    ) {
        self.adjacency = adjacency;
        self.relations = relations;
    }
}

impl fmt::Debug for Ruleset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ruleset")
            .field("name", &self.name)
            .field("rules", &self.nodes.len())
            .field("roots", &self.roots)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Ruleset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ruleset '{}' ({} rules, {} roots, {} contexts)",
            self.name,
            self.nodes.len(),
            self.roots.len(),
            self.contexts.contexts().count(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::rule::Rule;

    fn ruleset_with_nodes(names: &[&str]) -> Ruleset {
        let mut ruleset = Ruleset::new("test", ContextCollection::new());
        for name in names {
            ruleset.insert_node(RuleNode::new(Rule::new(*name)));
        }
        ruleset
    }

    #[test]
    fn evaluate_ands_all_roots() {
        let mut ruleset = ruleset_with_nodes(&["a", "b"]);
        ruleset.set_roots(vec!["a".into(), "b".into()]);
        // Both rules have empty ALL conditions, so both evaluate true.
        assert!(ruleset.evaluate(HashMap::new()).unwrap());
    }

    #[test]
    fn reduced_adjacency_removes_duplicates() {
        let mut ruleset = ruleset_with_nodes(&["a", "b"]);
        ruleset.set_indexes(
            HashMap::from([
                ("a".to_owned(), vec!["b".to_owned(), "b".to_owned()]),
                ("b".to_owned(), vec![]),
            ]),
            HashMap::new(),
        );

        let reduced = ruleset.reduced_adjacency_list();
        assert_eq!(reduced["a"], vec!["b".to_owned()]);
        assert!(reduced["b"].is_empty());
    }

    #[test]
    fn display_summarizes() {
        let mut ruleset = ruleset_with_nodes(&["a"]);
        ruleset.set_roots(vec!["a".into()]);
        assert_eq!(
            ruleset.to_string(),
            "Ruleset 'test' (1 rules, 1 roots, 0 contexts)"
        );
    }
}
