//! Splicing a sub-build into a parent build.
//!
//! A sub-build is described with no domains of its own. Including it under a
//! domain name rewrites every label it contains, exactly once, so that
//! `package:fred/built` becomes `package:(sub)fred/built` and
//! `package:(inner)fred/built` becomes `package:(sub(inner))fred/built`.
//!
//! This is done in two phases. [`RuleSet::mark_unswept`] flags every label
//! reachable from the rule set, including labels held inside actions. The
//! sweep then visits each label and prefixes its domain only while the flag
//! is still set. Actions are shared between rules, so the same inner label is
//! reached many times; the flag makes every visit after the first a no-op.

use crate::errors::{MuddleError, Result};
use crate::labels::{is_valid_domain, Label, WILDCARD};
use crate::rules::Rule;
use crate::ruleset::RuleSet;
use std::collections::BTreeSet;
use tracing::{debug, info};

fn rewrite_rule_labels(rule: &mut Rule, rewrite: &mut dyn FnMut(&mut Label)) {
    rewrite(&mut rule.target);
    rule.deps = std::mem::take(&mut rule.deps)
        .into_iter()
        .map(|mut dep| {
            rewrite(&mut dep);
            dep
        })
        .collect::<BTreeSet<Label>>();
    if let Some(action) = &rule.action {
        action.rewrite_inner_labels(rewrite);
    }
}

impl RuleSet {
    /// Flag every label in this rule set for the next domain sweep.
    pub fn mark_unswept(&mut self) {
        for rule in self.rules_mut() {
            rewrite_rule_labels(rule, &mut |label| label.mark_unswept());
        }
    }

    /// Move every still-unswept label into `domain`.
    ///
    /// Returns the number of labels changed. Rules are re-keyed by their
    /// rewritten targets.
    pub fn sweep_into_domain(&mut self, domain: &str) -> usize {
        let mut swept = 0usize;
        self.rewrite_rules(|rule| {
            rewrite_rule_labels(rule, &mut |label| {
                if label.sweep(domain) {
                    swept += 1;
                }
            })
        });
        debug!(domain, swept, "swept rule set into domain");
        swept
    }
}

/// Include the rule set `sub` in `parent` under `domain`.
///
/// # Errors
///
/// Returns a label syntax error if `domain` is not a valid, non-wildcard
/// domain name.
pub fn include_domain(parent: &mut RuleSet, mut sub: RuleSet, domain: &str) -> Result<()> {
    if domain == WILDCARD || !is_valid_domain(domain) {
        return Err(MuddleError::LabelSyntax {
            input: domain.to_string(),
            reason: format!("'{}' cannot be used as a domain name", domain),
        });
    }

    let rules = sub.len();
    sub.mark_unswept();
    sub.sweep_into_domain(domain);
    parent.merge(sub);
    info!(domain, rules, "included sub-build");
    Ok(())
}
