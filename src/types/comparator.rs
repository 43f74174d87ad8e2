//! Relational comparison of typed values.
//!
//! A [`Comparator`] owns a fixed, ordered set of [`Operator`]s and at most
//! one *current* operator. Comparators are pure values: `compare` has no
//! side effects and never fails; an unset operator or mismatched operand
//! kinds simply compare `false`. Each attribute instance owns its own
//! comparator, so a fixed current operator is scoped to one condition.

use std::cmp::Ordering;

use regex::RegexBuilder;

use super::operator::Operator;
use super::value::Value;

// ---------------------------------------------------------------------------
// Operator tables
// ---------------------------------------------------------------------------

const NUMBER_OPERATORS: &[Operator] = &[
    Operator::new("eq", "equals", false),
    Operator::new("neq", "not equals", false),
    Operator::new("lt", "less than", false),
    Operator::new("lte", "less than or equal to", false),
    Operator::new("gt", "greater than", false),
    Operator::new("gte", "greater than or equal to", false),
    Operator::new("in", "is one of", true),
];

const TEXT_OPERATORS: &[Operator] = &[
    Operator::new("eq", "equals", false),
    Operator::new("neq", "not equals", false),
    Operator::new("ispre", "is prefix of", false),
    Operator::new("haspre", "has prefix of", false),
    Operator::new("issuf", "is suffix of", false),
    Operator::new("hassuf", "has suffix of", false),
    Operator::new("contns", "contains", false),
    Operator::new("contnd", "is contained in", false),
    Operator::new("ltabc", "comes alphabetically before", false),
    Operator::new("gtabc", "comes alphabetically after", false),
    Operator::new("in", "is one of", true),
];

const DATE_OPERATORS: &[Operator] = &[
    Operator::new("eq", "equals", false),
    Operator::new("neq", "not equals", false),
    Operator::new("isbef", "is before", false),
    Operator::new("isbefon", "is before or on", false),
    Operator::new("isaft", "is after", false),
    Operator::new("isafton", "is after or on", false),
    Operator::new("in", "is one of", true),
];

// ---------------------------------------------------------------------------
// Comparator
// ---------------------------------------------------------------------------

/// How the text comparator interprets the substring-family operators.
///
/// `Literal` treats both operands as plain text, which keeps rule-authored
/// values from injecting pattern metacharacters. `Regex` interprets the
/// pattern-side operand as a case-insensitive regular expression; an invalid
/// pattern compares `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextMatch {
    /// Case-insensitive literal substring/prefix/suffix matching.
    #[default]
    Literal,
    /// Case-insensitive regular-expression matching.
    Regex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Number,
    Text(TextMatch),
    Date,
}

/// A named family of relational operators plus the semantics of applying
/// one to two [`Value`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparator {
    kind: Kind,
    current: Option<usize>,
}

impl Comparator {
    /// A comparator over numeric values: `eq, neq, lt, lte, gt, gte, in`.
    #[must_use]
    pub fn number() -> Self {
        Self {
            kind: Kind::Number,
            current: None,
        }
    }

    /// A comparator over text values with literal substring matching.
    #[must_use]
    pub fn text() -> Self {
        Self::text_matching(TextMatch::Literal)
    }

    /// A text comparator with an explicit [`TextMatch`] mode.
    #[must_use]
    pub fn text_matching(matching: TextMatch) -> Self {
        Self {
            kind: Kind::Text(matching),
            current: None,
        }
    }

    /// A comparator over calendar dates: `eq, neq, isbef, isbefon, isaft,
    /// isafton, in`. Day granularity.
    #[must_use]
    pub fn date() -> Self {
        Self {
            kind: Kind::Date,
            current: None,
        }
    }

    /// The fixed operator set of this comparator, in registration order.
    #[must_use]
    pub fn operators(&self) -> &'static [Operator] {
        match self.kind {
            Kind::Number => NUMBER_OPERATORS,
            Kind::Text(_) => TEXT_OPERATORS,
            Kind::Date => DATE_OPERATORS,
        }
    }

    /// Set the current operator to the one with the given key.
    ///
    /// Unknown keys are silently ignored: the current operator stays
    /// whatever it was, possibly unset.
    pub fn set_current_operator(&mut self, value: &str) {
        if let Some(idx) = self.operators().iter().position(|op| op.value() == value) {
            self.current = Some(idx);
        }
    }

    /// The last successfully set operator, if any.
    #[must_use]
    pub fn current_operator(&self) -> Option<&'static Operator> {
        self.current.map(|idx| &self.operators()[idx])
    }

    /// Apply the current operator to `left` and `right`.
    ///
    /// Returns `false` when no current operator is set or when the operand
    /// kinds do not fit the operator.
    #[must_use]
    pub fn compare(&self, left: &Value, right: &Value) -> bool {
        let Some(op) = self.current_operator() else {
            return false;
        };
        match self.kind {
            Kind::Number => compare_number(op.value(), left, right),
            Kind::Text(matching) => compare_text(op.value(), matching, left, right),
            Kind::Date => compare_date(op.value(), left, right),
        }
    }
}

// ---------------------------------------------------------------------------
// Kind-specific semantics
// ---------------------------------------------------------------------------

fn number_eq(left: &Value, right: &Value) -> bool {
    match (left.as_f64(), right.as_f64()) {
        (Some(l), Some(r)) => l == r,
        _ => false,
    }
}

fn compare_number(op: &str, left: &Value, right: &Value) -> bool {
    if op == "in" {
        return membership(left, right, number_eq);
    }
    let (Some(l), Some(r)) = (left.as_f64(), right.as_f64()) else {
        return false;
    };
    let Some(ord) = l.partial_cmp(&r) else {
        // NaN on either side
        return op == "neq";
    };
    match op {
        "eq" => ord == Ordering::Equal,
        "neq" => ord != Ordering::Equal,
        "lt" => ord == Ordering::Less,
        "lte" => ord != Ordering::Greater,
        "gt" => ord == Ordering::Greater,
        "gte" => ord != Ordering::Less,
        _ => false,
    }
}

fn text_eq(left: &Value, right: &Value) -> bool {
    match (left.as_text(), right.as_text()) {
        (Some(l), Some(r)) => l.to_lowercase() == r.to_lowercase(),
        _ => false,
    }
}

/// Case-insensitive literal containment of `needle` inside `haystack`.
fn contains_caseless(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn starts_with_caseless(haystack: &str, prefix: &str) -> bool {
    haystack.to_lowercase().starts_with(&prefix.to_lowercase())
}

fn ends_with_caseless(haystack: &str, suffix: &str) -> bool {
    haystack.to_lowercase().ends_with(&suffix.to_lowercase())
}

/// Regex-mode matching: `pattern` is compiled case-insensitively with the
/// given anchors; an invalid pattern matches nothing.
fn regex_match(haystack: &str, pattern: &str, prefix: bool, suffix: bool) -> bool {
    let anchored = match (prefix, suffix) {
        (true, false) => format!("^(?:{pattern})"),
        (false, true) => format!("(?:{pattern})$"),
        _ => format!("(?:{pattern})"),
    };
    RegexBuilder::new(&anchored)
        .case_insensitive(true)
        .build()
        .map(|re| re.is_match(haystack))
        .unwrap_or(false)
}

fn compare_text(op: &str, matching: TextMatch, left: &Value, right: &Value) -> bool {
    if op == "in" {
        return membership(left, right, text_eq);
    }
    let (Some(l), Some(r)) = (left.as_text(), right.as_text()) else {
        return false;
    };
    let literal = matching == TextMatch::Literal;
    match op {
        "eq" => text_eq(left, right),
        "neq" => !text_eq(left, right),
        // left is a prefix of right
        "ispre" if literal => starts_with_caseless(r, l),
        "ispre" => regex_match(r, l, true, false),
        // left has right as a prefix
        "haspre" if literal => starts_with_caseless(l, r),
        "haspre" => regex_match(l, r, true, false),
        // left is a suffix of right
        "issuf" if literal => ends_with_caseless(r, l),
        "issuf" => regex_match(r, l, false, true),
        // left has right as a suffix
        "hassuf" if literal => ends_with_caseless(l, r),
        "hassuf" => regex_match(l, r, false, true),
        // left contains right
        "contns" if literal => contains_caseless(l, r),
        "contns" => regex_match(l, r, false, false),
        // left is contained in right
        "contnd" if literal => contains_caseless(r, l),
        "contnd" => regex_match(r, l, false, false),
        "ltabc" => l < r,
        "gtabc" => l > r,
        _ => false,
    }
}

fn date_eq(left: &Value, right: &Value) -> bool {
    match (left.as_date(), right.as_date()) {
        (Some(l), Some(r)) => l == r,
        _ => false,
    }
}

fn compare_date(op: &str, left: &Value, right: &Value) -> bool {
    if op == "in" {
        return membership(left, right, date_eq);
    }
    let (Some(l), Some(r)) = (left.as_date(), right.as_date()) else {
        return false;
    };
    match op {
        "eq" => l == r,
        "neq" => l != r,
        "isbef" => l < r,
        "isbefon" => l <= r,
        "isaft" => l > r,
        "isafton" => l >= r,
        _ => false,
    }
}

/// `in` semantics shared by every comparator kind: membership over a list
/// right operand using the kind's own equality, falling back to plain
/// equality when the right operand is a scalar.
fn membership(left: &Value, right: &Value, eq: fn(&Value, &Value) -> bool) -> bool {
    match right.as_list() {
        Some(items) => items.iter().any(|item| eq(left, item)),
        None => eq(left, right),
    }
}
