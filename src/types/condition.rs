//! The condition tree: leaves comparing one attribute against its input,
//! combined by ALL/ANY collections.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::attribute::Attribute;
use super::error::EvaluateError;
use super::value::Value;

/// How a [`ConditionCollection`] combines its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainType {
    /// Every child must evaluate true. An empty ALL chain evaluates true.
    All,
    /// At least one child must evaluate true. An empty ANY chain evaluates
    /// false.
    Any,
}

/// A node of the condition tree: a leaf comparison or a nested collection.
#[derive(Debug)]
pub enum Condition {
    Standard(StandardCondition),
    Collection(ConditionCollection),
}

impl Condition {
    /// Evaluate this node.
    ///
    /// # Errors
    ///
    /// Propagates attribute configuration and read failures.
    pub fn evaluate(&self) -> Result<bool, EvaluateError> {
        match self {
            Condition::Standard(condition) => condition.evaluate(),
            Condition::Collection(collection) => collection.evaluate(),
        }
    }

    /// Whether this node is a collection of conditions.
    #[must_use]
    pub fn is_collection(&self) -> bool {
        matches!(self, Condition::Collection(_))
    }
}

/// A leaf condition: one attribute compared against its input value with
/// its comparator's current operator.
#[derive(Debug)]
pub struct StandardCondition {
    attribute: Box<dyn Attribute>,
}

impl StandardCondition {
    #[must_use]
    pub fn new(attribute: Box<dyn Attribute>) -> Self {
        Self { attribute }
    }

    /// Compare the attribute's current value against the input's typed
    /// value. A missing typed input value compares false.
    ///
    /// # Errors
    ///
    /// Propagates attribute configuration and read failures.
    pub fn evaluate(&self) -> Result<bool, EvaluateError> {
        let left = self.attribute.value()?;
        let Some(right) = self.attribute.typed_input_value() else {
            return Ok(false);
        };
        Ok(self.attribute.comparator().compare(&left, &right))
    }

    #[must_use]
    pub fn attribute(&self) -> &dyn Attribute {
        self.attribute.as_ref()
    }

    pub fn set_operator_value(&mut self, value: &str) {
        self.attribute.set_operator_value(value);
    }

    #[must_use]
    pub fn operator_value(&self) -> Option<&'static str> {
        self.attribute.operator_value()
    }

    /// Store the raw authored right-hand value.
    ///
    /// # Errors
    ///
    /// Fails when the attribute has no input bound.
    pub fn set_input_value(&mut self, raw: Value) -> Result<(), EvaluateError> {
        self.attribute.set_input_value(raw)
    }

    #[must_use]
    pub fn input_value(&self) -> Option<&Value> {
        self.attribute.input_value()
    }
}

impl fmt::Display for StandardCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.attribute.name(),
            self.operator_value().unwrap_or("?"),
            self.input_value().map_or_else(|| "?".to_owned(), ToString::to_string),
        )
    }
}

/// An ordered ALL/ANY chain of child conditions, itself a condition.
#[derive(Debug)]
pub struct ConditionCollection {
    chain: ChainType,
    children: Vec<Condition>,
}

impl Default for ConditionCollection {
    fn default() -> Self {
        Self::new(ChainType::All)
    }
}

impl ConditionCollection {
    #[must_use]
    pub fn new(chain: ChainType) -> Self {
        Self {
            chain,
            children: Vec::new(),
        }
    }

    /// Append a child condition. Children evaluate in insertion order.
    pub fn add_condition(&mut self, condition: Condition) {
        self.children.push(condition);
    }

    #[must_use]
    pub fn chain(&self) -> ChainType {
        self.chain
    }

    #[must_use]
    pub fn is_all(&self) -> bool {
        self.chain == ChainType::All
    }

    #[must_use]
    pub fn is_any(&self) -> bool {
        self.chain == ChainType::Any
    }

    #[must_use]
    pub fn children(&self) -> &[Condition] {
        &self.children
    }

    /// Evaluate the chain with short-circuiting: an ALL chain stops at the
    /// first false child, an ANY chain at the first true child.
    ///
    /// # Errors
    ///
    /// Propagates the first child failure encountered.
    pub fn evaluate(&self) -> Result<bool, EvaluateError> {
        let mut result = self.is_all();
        for child in &self.children {
            let eval = child.evaluate()?;
            result = if self.is_all() {
                result && eval
            } else {
                result || eval
            };
            if (self.is_all() && !result) || (self.is_any() && result) {
                break;
            }
        }
        Ok(result)
    }
}
