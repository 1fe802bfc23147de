//! Dependency resolution over a [`RuleSet`].
//!
//! [`needed_to_build`] turns a target into an ordered build plan and
//! [`required_by`] finds everything that transitively depends on a label.
//! Neither consults the tag store: they are pure graph computations.

use crate::errors::{self, Result};
use crate::labels::Label;
use crate::rules::Rule;
use crate::ruleset::{MatchMode, RuleSet};
use std::collections::BTreeSet;
use tracing::debug;

/// The concrete labels that must be satisfied before `dep` is.
///
/// A definite dependency stands for itself. A wildcard one stands for every
/// definite target in the rule set that it matches; if there are none it is
/// vacuously satisfied.
fn requirements(ruleset: &RuleSet, dep: &Label) -> BTreeSet<Label> {
    ruleset.targets_match(dep, MatchMode::Wildcard)
}

/// Compute the ordered list of rules that builds `target`.
///
/// Every rule in the result appears after the rules for all of its
/// dependencies, so running the actions in list order builds `target`. When
/// several rules apply to one concrete label (overlapping wildcard rules) all
/// of them must be satisfied, and all of them appear in the plan,
/// instantiated for that label.
///
/// The walk is a fixed point rather than a depth-first search: each pass
/// schedules every target whose requirements are already satisfied and queues
/// the unsatisfied requirements of the rest for the next pass.
///
/// # Errors
///
/// Gives up if a concrete target has no rule at all, if `target` is
/// wildcarded under [`MatchMode::Exact`], or if a whole pass makes no
/// progress (the graph is circular or incomplete). The latter lists every
/// unresolved label.
pub fn needed_to_build(ruleset: &RuleSet, target: &Label, mode: MatchMode) -> Result<Vec<Rule>> {
    // Exact matching has no wildcards, so a wildcarded target names nothing
    if mode == MatchMode::Exact && !target.is_definite() {
        return Err(errors::no_rule_for_target(target).into());
    }
    let mut targets = ruleset.targets_match(target, mode);
    if targets.is_empty() {
        return Err(errors::no_rule_for_target(target).into());
    }

    let mut plan: Vec<Rule> = Vec::new();
    let mut satisfied: BTreeSet<Label> = BTreeSet::new();
    let mut pass = 0usize;

    while !targets.is_empty() {
        pass += 1;
        debug!(pass, pending = targets.len(), scheduled = plan.len(), "resolution pass");

        let mut next_targets: BTreeSet<Label> = BTreeSet::new();
        let mut progressed = false;

        for current in &targets {
            if satisfied.contains(current) {
                progressed = true;
                continue;
            }

            let rules = ruleset.rules_for_target(current, MatchMode::Wildcard);
            if rules.is_empty() {
                return Err(errors::no_rule_for_target(current).into());
            }
            let instantiated: Vec<Rule> =
                rules.iter().map(|rule| rule.instantiate_for(current)).collect();

            let missing: BTreeSet<Label> = instantiated
                .iter()
                .flat_map(|rule| rule.deps.iter())
                .flat_map(|dep| requirements(ruleset, dep))
                .filter(|required| !satisfied.contains(required))
                .collect();

            if missing.is_empty() {
                debug!(target = %current, rules = instantiated.len(), "scheduled");
                plan.extend(instantiated);
                satisfied.insert(current.clone());
                progressed = true;
            } else {
                next_targets.insert(current.clone());
                next_targets.extend(missing);
            }
        }

        if !progressed && next_targets == targets {
            return Err(errors::circular_or_incomplete(target, &next_targets).into());
        }
        targets = next_targets;
    }

    Ok(plan)
}

/// Every label that directly or indirectly depends on `label`.
///
/// The search starts from the targets of the rules matching `label` (under
/// `mode`). Those seeds are only part of the result if something else found
/// by the search depends on them. Dependents found through a wildcard rule
/// are instantiated from the label they depend on.
///
/// # Errors
///
/// Gives up if `label` is definite and no rule matches it. A wildcard label
/// with no matching rules simply has no dependents.
pub fn required_by(ruleset: &RuleSet, label: &Label, mode: MatchMode) -> Result<BTreeSet<Label>> {
    let seeds: BTreeSet<Label> = ruleset
        .rules_for_target(label, mode)
        .into_iter()
        .map(|rule| rule.target.instantiate_from(label))
        .collect();

    if seeds.is_empty() {
        if label.is_definite() {
            return Err(errors::no_rules_match(label).into());
        }
        return Ok(BTreeSet::new());
    }

    let mut depends: BTreeSet<Label> = BTreeSet::new();
    let mut frontier = seeds;
    while !frontier.is_empty() {
        let mut found: BTreeSet<Label> = BTreeSet::new();
        for current in &frontier {
            for rule in ruleset.rules_which_depend_on(current, mode) {
                let dependent = rule.target.instantiate_from(current);
                if !depends.contains(&dependent) {
                    found.insert(dependent);
                }
            }
        }
        debug!(%label, found = found.len(), "required_by pass");
        depends.extend(found.iter().cloned());
        frontier = found;
    }

    Ok(depends)
}
