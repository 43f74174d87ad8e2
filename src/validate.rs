//! Root and cycle validation for built rulesets.
//!
//! A ruleset must have at least one root rule and an acyclic then/else
//! successor graph before it is evaluated in production. Validation is
//! explicit: [`validate`] is cheap enough to run on every save, but
//! [`Ruleset::evaluate`](crate::Ruleset::evaluate) never re-runs it, since
//! a ruleset already known good would pay for nothing.

use std::collections::HashMap;

use tracing::debug;

use crate::types::{Ruleset, ValidationError};

/// Whether the ruleset has at least one root rule.
#[must_use]
pub fn roots_exist(ruleset: &Ruleset) -> bool {
    !ruleset.root_rule_names().is_empty()
}

/// Whether the then/else successor graph reachable from the roots
/// contains a cycle.
///
/// Walks the de-duplicated union of then- and else-successors from each
/// root with a path-local visited list; a rule reappearing on the current
/// path is a cycle. Short-circuits on the first cycle found.
#[must_use]
pub fn has_cycle(ruleset: &Ruleset) -> bool {
    find_cycle(ruleset).is_some()
}

/// Run both checks, reporting which one failed.
///
/// # Errors
///
/// [`ValidationError::NoRootRules`] when every rule has an incoming edge;
/// [`ValidationError::CycleDetected`] with the offending path otherwise.
pub fn validate(ruleset: &Ruleset) -> Result<(), ValidationError> {
    if !roots_exist(ruleset) {
        return Err(ValidationError::NoRootRules {
            ruleset: ruleset.name().to_owned(),
        });
    }
    if let Some(path) = find_cycle(ruleset) {
        return Err(ValidationError::CycleDetected {
            ruleset: ruleset.name().to_owned(),
            path,
        });
    }
    debug!(ruleset = %ruleset.name(), "ruleset validated");
    Ok(())
}

/// The first cycle reachable from any root, as the path that closes it.
fn find_cycle(ruleset: &Ruleset) -> Option<Vec<String>> {
    let reduced = ruleset.reduced_adjacency_list();
    let mut path: Vec<String> = Vec::new();

    for root in ruleset.root_rule_names() {
        path.push(root.clone());
        for successor in reduced.get(root).map_or(&[] as &[String], Vec::as_slice) {
            if let Some(cycle) = walk(successor, &reduced, &mut path) {
                return Some(cycle);
            }
        }
        path.pop();
    }
    None
}

fn walk(
    node: &str,
    reduced: &HashMap<String, Vec<String>>,
    path: &mut Vec<String>,
) -> Option<Vec<String>> {
    if let Some(position) = path.iter().position(|seen| seen == node) {
        let mut cycle: Vec<String> = path[position..].to_vec();
        cycle.push(node.to_owned());
        return Some(cycle);
    }

    path.push(node.to_owned());
    for successor in reduced.get(node).map_or(&[] as &[String], Vec::as_slice) {
        if let Some(cycle) = walk(successor, reduced, path) {
            return Some(cycle);
        }
    }
    path.pop();
    None
}
