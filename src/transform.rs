//! The plain-data representation of a ruleset and its round-trip.
//!
//! [`to_data`] flattens a built [`Ruleset`] into a nested serde data
//! model: rule names, the condition tree with chain types, attribute and
//! action references as `{name, context?}` pairs, raw operator and input
//! values, and then/else successor name lists. [`from_data`] reconstructs a
//! ruleset from that model by driving the builder API against a populated
//! [`DefinitionRegistry`]. An external persistence layer serializes the
//! model however it likes (`serde_json` being the obvious choice) and
//! never touches engine internals.
//!
//! Rules are emitted depth-first from the root rules, each exactly once,
//! so `to_data(from_data(x))` is structurally identical to `x` for data in
//! that canonical order.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::builder::ConditionHost;
use crate::registry::DefinitionRegistry;
use crate::types::{
    Action, Attribute, Branch, BuildError, ChainType, Condition, ConditionCollection,
    ContextCollection, RuleNode, Ruleset, StandardCondition, Value,
};

// ---------------------------------------------------------------------------
// Data model
// ---------------------------------------------------------------------------

/// A reference to an attribute or action: its registered name plus the
/// parent context name, or no context for service-bound members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl MemberRef {
    /// Whether this reference names a context-bound member. An absent or
    /// empty context means service-bound.
    #[must_use]
    pub fn is_context_bound(&self) -> bool {
        self.context.as_deref().is_some_and(|c| !c.trim().is_empty())
    }
}

/// One node of the condition tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConditionData {
    Collection {
        chain: ChainType,
        #[serde(default)]
        children: Vec<ConditionData>,
    },
    Condition {
        attribute: MemberRef,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        operator: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        input_value: Option<Value>,
    },
}

fn default_conditions() -> ConditionData {
    ConditionData::Collection {
        chain: ChainType::All,
        children: Vec::new(),
    }
}

/// One then- or else-action call of a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionCallData {
    pub branch: Branch,
    pub action: MemberRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_value: Option<Value>,
}

/// One then- or else-successor reference of a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowupData {
    pub branch: Branch,
    pub rule: String,
}

/// One rule of the ruleset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleData {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_conditions")]
    pub conditions: ConditionData,
    #[serde(default)]
    pub actions: Vec<ActionCallData>,
    #[serde(default)]
    pub followups: Vec<FollowupData>,
}

/// The complete plain-data form of a ruleset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulesetData {
    pub name: String,
    #[serde(default)]
    pub rules: Vec<RuleData>,
}

impl RulesetData {
    /// Check the data against authoring invariants before building.
    /// Returns one message per violation; empty means clean.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut names: HashSet<&str> = HashSet::new();
        for rule in &self.rules {
            if !names.insert(rule.name.as_str()) {
                errors.push(format!("rule name '{}' already in use", rule.name));
            }
        }
        errors
    }
}

// ---------------------------------------------------------------------------
// Ruleset -> data
// ---------------------------------------------------------------------------

/// Flatten a ruleset into its plain-data form.
///
/// Rules are emitted depth-first from the roots (then-successors before
/// else-successors), each exactly once. Rules unreachable from any root do
/// not appear; a validated ruleset has none.
#[must_use]
pub fn to_data(ruleset: &Ruleset) -> RulesetData {
    let mut order: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for root in ruleset.root_rule_names() {
        visit(ruleset, root, &mut order, &mut seen);
    }

    RulesetData {
        name: ruleset.name().to_owned(),
        rules: order
            .iter()
            .filter_map(|name| ruleset.node(name))
            .map(rule_data)
            .collect(),
    }
}

fn visit(ruleset: &Ruleset, name: &str, order: &mut Vec<String>, seen: &mut HashSet<String>) {
    if !seen.insert(name.to_owned()) {
        return;
    }
    order.push(name.to_owned());
    if let Some(node) = ruleset.node(name) {
        for then_rule in node.then_rules() {
            visit(ruleset, then_rule, order, seen);
        }
        for else_rule in node.else_rules() {
            visit(ruleset, else_rule, order, seen);
        }
    }
}

fn rule_data(node: &RuleNode) -> RuleData {
    let rule = node.rule();

    let mut actions = Vec::new();
    for action in rule.then_actions() {
        actions.push(action_data(action.as_ref(), Branch::Then));
    }
    for action in rule.else_actions() {
        actions.push(action_data(action.as_ref(), Branch::Else));
    }

    let mut followups = Vec::new();
    for then_rule in node.then_rules() {
        followups.push(FollowupData {
            branch: Branch::Then,
            rule: then_rule.clone(),
        });
    }
    for else_rule in node.else_rules() {
        followups.push(FollowupData {
            branch: Branch::Else,
            rule: else_rule.clone(),
        });
    }

    RuleData {
        name: rule.name().to_owned(),
        description: rule.description().map(ToOwned::to_owned),
        conditions: collection_data(rule.conditions()),
        actions,
        followups,
    }
}

fn collection_data(collection: &ConditionCollection) -> ConditionData {
    ConditionData::Collection {
        chain: collection.chain(),
        children: collection.children().iter().map(condition_data).collect(),
    }
}

fn condition_data(condition: &Condition) -> ConditionData {
    match condition {
        Condition::Collection(collection) => collection_data(collection),
        Condition::Standard(standard) => ConditionData::Condition {
            attribute: MemberRef {
                name: standard.attribute().name().to_owned(),
                context: standard
                    .attribute()
                    .parent_context_name()
                    .map(ToOwned::to_owned),
            },
            operator: standard.operator_value().map(ToOwned::to_owned),
            input_value: standard.input_value().cloned(),
        },
    }
}

fn action_data(action: &dyn Action, branch: Branch) -> ActionCallData {
    ActionCallData {
        branch,
        action: MemberRef {
            name: action.name().to_owned(),
            context: action.parent_context_name().map(ToOwned::to_owned),
        },
        input_value: action.input_value().cloned(),
    }
}

// ---------------------------------------------------------------------------
// Data -> ruleset
// ---------------------------------------------------------------------------

/// Reconstruct a ruleset from its plain-data form by driving the builder
/// API against the registry.
///
/// # Errors
///
/// Propagates registry lookup failures and builder errors, including
/// [`BuildError::UnresolvedRuleReference`] for followups naming absent
/// rules.
pub fn from_data(
    registry: &DefinitionRegistry,
    data: &RulesetData,
) -> Result<Ruleset, BuildError> {
    let mut builder = registry.ruleset_builder(&data.name)?;

    for rule in &data.rules {
        let mut rule_builder = builder.start_rule(&rule.name);
        if let Some(description) = &rule.description {
            rule_builder = rule_builder.description(description);
        }

        let collection =
            collection_from_data(registry, rule_builder.contexts(), &rule.conditions)?;
        rule_builder = rule_builder.with_condition_collection(collection);

        for action in &rule.actions {
            let action_builder = match action.branch {
                Branch::Then => rule_builder.start_then_action(),
                Branch::Else => rule_builder.start_else_action(),
            };
            let action_builder = if action.action.is_context_bound() {
                action_builder.context_action(
                    action.action.context.as_deref().unwrap_or_default(),
                    &action.action.name,
                )?
            } else {
                action_builder.service_action(&action.action.name)?
            };
            let action_builder = match &action.input_value {
                Some(raw) => action_builder.input_value(raw.clone()),
                None => action_builder,
            };
            rule_builder = action_builder.end()?;
        }

        for followup in &rule.followups {
            rule_builder = match followup.branch {
                Branch::Then => rule_builder.add_then_rule(&followup.rule),
                Branch::Else => rule_builder.add_else_rule(&followup.rule),
            };
        }

        builder = rule_builder.end()?;
    }

    builder.build()
}

fn collection_from_data(
    registry: &DefinitionRegistry,
    contexts: &ContextCollection,
    data: &ConditionData,
) -> Result<ConditionCollection, BuildError> {
    match data {
        ConditionData::Collection { chain, children } => {
            let mut collection = ConditionCollection::new(*chain);
            for child in children {
                match child {
                    ConditionData::Collection { .. } => {
                        let nested = collection_from_data(registry, contexts, child)?;
                        collection.add_condition(Condition::Collection(nested));
                    }
                    ConditionData::Condition { .. } => {
                        collection.add_condition(condition_from_data(registry, contexts, child)?);
                    }
                }
            }
            Ok(collection)
        }
        // A bare leaf at the root is tolerated by wrapping it in an ALL
        // chain, which is the engine's default condition root.
        ConditionData::Condition { .. } => {
            let mut collection = ConditionCollection::new(ChainType::All);
            collection.add_condition(condition_from_data(registry, contexts, data)?);
            Ok(collection)
        }
    }
}

fn condition_from_data(
    registry: &DefinitionRegistry,
    contexts: &ContextCollection,
    data: &ConditionData,
) -> Result<Condition, BuildError> {
    let ConditionData::Condition {
        attribute,
        operator,
        input_value,
    } = data
    else {
        unreachable!("condition_from_data called with a collection");
    };

    let boxed: Box<dyn Attribute> = if attribute.is_context_bound() {
        Box::new(contexts.create_context_attribute(
            registry,
            attribute.context.as_deref().unwrap_or_default(),
            &attribute.name,
        )?)
    } else {
        Box::new(registry.service_attribute(&attribute.name)?)
    };

    let mut condition = StandardCondition::new(boxed);
    if let Some(operator) = operator {
        condition.set_operator_value(operator);
    }
    if let Some(raw) = input_value {
        condition.set_input_value(raw.clone())?;
    }
    Ok(Condition::Standard(condition))
}
