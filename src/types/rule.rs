//! Rules and the graph nodes that wrap them.

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::action::Action;
use super::condition::ConditionCollection;
use super::error::EvaluateError;

/// Which branch of a rule an action or successor edge belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Branch {
    Then,
    Else,
}

/// A named rule: one condition tree plus ordered then- and else-actions.
///
/// The condition tree defaults to an empty ALL collection, which evaluates
/// true.
#[derive(Debug)]
pub struct Rule {
    name: String,
    description: Option<String>,
    conditions: ConditionCollection,
    then_actions: Vec<Box<dyn Action>>,
    else_actions: Vec<Box<dyn Action>>,
}

impl Rule {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            conditions: ConditionCollection::default(),
            then_actions: Vec::new(),
            else_actions: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
    }

    #[must_use]
    pub fn conditions(&self) -> &ConditionCollection {
        &self.conditions
    }

    pub fn set_conditions(&mut self, conditions: ConditionCollection) {
        self.conditions = conditions;
    }

    /// Append an action performed when the rule evaluates true.
    pub fn add_then_action(&mut self, action: Box<dyn Action>) {
        self.then_actions.push(action);
    }

    /// Append an action performed when the rule evaluates false.
    pub fn add_else_action(&mut self, action: Box<dyn Action>) {
        self.else_actions.push(action);
    }

    #[must_use]
    pub fn then_actions(&self) -> &[Box<dyn Action>] {
        &self.then_actions
    }

    #[must_use]
    pub fn else_actions(&self) -> &[Box<dyn Action>] {
        &self.else_actions
    }

    /// Evaluate the condition tree, then perform every then-action (on
    /// true) or else-action (on false) in order. Action failures propagate
    /// immediately; already-performed side effects are not rolled back.
    ///
    /// # Errors
    ///
    /// Propagates condition and action failures to the caller.
    pub fn evaluate(&self) -> Result<bool, EvaluateError> {
        let eval = self.conditions.evaluate()?;
        trace!(rule = %self.name, result = eval, "rule evaluated");
        let actions = if eval {
            &self.then_actions
        } else {
            &self.else_actions
        };
        for action in actions {
            action.perform()?;
        }
        Ok(eval)
    }
}

/// A rule wrapped with its authored successor edges.
///
/// Successors are stored as rule *names*, resolved against the owning
/// ruleset's node map only when needed; the graph may be cyclic before
/// validation without creating ownership cycles. Duplicate successor names
/// collapse.
#[derive(Debug)]
pub struct RuleNode {
    rule: Rule,
    then_rules: Vec<String>,
    else_rules: Vec<String>,
}

impl RuleNode {
    #[must_use]
    pub fn new(rule: Rule) -> Self {
        Self {
            rule,
            then_rules: Vec::new(),
            else_rules: Vec::new(),
        }
    }

    /// The name of the underlying rule, which is the node's identity.
    #[must_use]
    pub fn name(&self) -> &str {
        self.rule.name()
    }

    #[must_use]
    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    pub fn rule_mut(&mut self) -> &mut Rule {
        &mut self.rule
    }

    /// Record a successor to visit when this rule evaluates true.
    pub fn add_then_rule(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.then_rules.contains(&name) {
            self.then_rules.push(name);
        }
    }

    /// Record a successor to visit when this rule evaluates false.
    pub fn add_else_rule(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.else_rules.contains(&name) {
            self.else_rules.push(name);
        }
    }

    #[must_use]
    pub fn then_rules(&self) -> &[String] {
        &self.then_rules
    }

    #[must_use]
    pub fn else_rules(&self) -> &[String] {
        &self.else_rules
    }

    /// Evaluate the underlying rule. Successor edges are authored intent
    /// consumed by validation and diagnostics; they are not traversed here.
    ///
    /// # Errors
    ///
    /// Propagates the underlying rule's failure.
    pub fn evaluate(&self) -> Result<bool, EvaluateError> {
        self.rule.evaluate()
    }
}
