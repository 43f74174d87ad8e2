use std::fmt;

/// A relational operator offered by a [`Comparator`](super::Comparator).
///
/// `value` is the stable key authored into rules and stored by the
/// round-trip representation; `name` is the human-readable label used by
/// form rendering. `multiple` marks operators that expect a set of
/// right-hand values (e.g. `in`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operator {
    value: &'static str,
    name: &'static str,
    multiple: bool,
}

impl Operator {
    pub(crate) const fn new(value: &'static str, name: &'static str, multiple: bool) -> Self {
        Self {
            value,
            name,
            multiple,
        }
    }

    /// The stable key of this operator.
    #[must_use]
    pub fn value(&self) -> &'static str {
        self.value
    }

    /// The display name of this operator.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether this operator expects a set of right-hand values.
    #[must_use]
    pub fn multiple(&self) -> bool {
        self.multiple
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors() {
        let op = Operator::new("in", "is one of", true);
        assert_eq!(op.value(), "in");
        assert_eq!(op.name(), "is one of");
        assert!(op.multiple());
    }

    #[test]
    fn display_uses_value() {
        let op = Operator::new("gte", "greater than or equal to", false);
        assert_eq!(op.to_string(), "gte");
    }
}
