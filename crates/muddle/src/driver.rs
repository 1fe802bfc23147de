//! Sequential build driver.
//!
//! [`Builder`] interleaves the resolution algorithms with a [`TagStore`]:
//! it asks for a plan, skips targets that are already asserted, runs the
//! actions for the rest in plan order and asserts each target once all of
//! its rules have run.

use crate::errors::Result;
use crate::graph::{needed_to_build, required_by};
use crate::labels::Label;
use crate::rules::{Environment, Rule};
use crate::ruleset::{MatchMode, RuleSet};
use crate::storage::TagStore;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{info, warn};

/// What a call to [`Builder::build`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    /// Targets whose rules ran (or would have run, in just-print mode), in
    /// plan order
    pub built: Vec<Label>,
    /// Targets that were already asserted
    pub skipped: Vec<Label>,
}

/// Builds targets from a rule set, one action at a time.
pub struct Builder<'a, S: TagStore> {
    ruleset: &'a RuleSet,
    store: S,
    env: Environment,
    just_print: bool,
}

impl<'a, S: TagStore> Builder<'a, S> {
    pub fn new(ruleset: &'a RuleSet, store: S) -> Self {
        Self {
            ruleset,
            store,
            env: Environment::new(),
            just_print: false,
        }
    }

    /// In just-print mode the plan is walked but no action runs and nothing
    /// is asserted.
    pub fn just_print(mut self, just_print: bool) -> Self {
        self.just_print = just_print;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Build `target`, and everything it needs, unless already asserted.
    ///
    /// If an action fails the error is returned at once. Targets built
    /// before the failure stay asserted; the failed target does not.
    pub fn build(&mut self, target: &Label, mode: MatchMode) -> Result<BuildReport> {
        let plan = needed_to_build(self.ruleset, target, mode)?;
        let mut report = BuildReport::default();

        // Rules for one target are adjacent in the plan
        let mut start = 0;
        while start < plan.len() {
            let current = &plan[start].target;
            let end = plan[start..]
                .iter()
                .position(|rule| rule.target != *current)
                .map_or(plan.len(), |offset| start + offset);
            let group = &plan[start..end];
            start = end;

            if self.store.is_asserted(current) {
                report.skipped.push(current.clone());
                continue;
            }
            self.run_rules(current, group)?;
            report.built.push(current.clone());
        }

        info!(
            %target,
            built = report.built.len(),
            skipped = report.skipped.len(),
            just_print = self.just_print,
            "build finished"
        );
        Ok(report)
    }

    fn run_rules(&mut self, target: &Label, rules: &[Rule]) -> Result<()> {
        for rule in rules {
            let Some(action) = &rule.action else {
                continue;
            };
            if self.just_print {
                info!(label = %target, "would build");
                continue;
            }
            info!(label = %target, "building");
            if let Err(err) = action.build_label(&mut self.env, target) {
                warn!(label = %target, error = %err, "action failed");
                return Err(err);
            }
        }
        if !self.just_print {
            self.store.assert_label(target)?;
        }
        Ok(())
    }

    /// Retract `label` and every label that depends on it, so that the next
    /// build redoes them. Returns the labels retracted, sorted.
    pub fn retract_with_dependents(&self, label: &Label, mode: MatchMode) -> Result<Vec<Label>> {
        let mut labels: BTreeSet<Label> = required_by(self.ruleset, label, mode)?;
        labels.extend(self.ruleset.targets_match(label, mode));

        let mut retracted = Vec::new();
        for label in labels.into_iter().filter(Label::is_definite) {
            if self.just_print {
                info!(%label, "would retract");
            } else {
                self.store.retract_label(&label)?;
            }
            retracted.push(label);
        }
        Ok(retracted)
    }
}
