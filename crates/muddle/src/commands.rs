//! Command execution logic for the CLI.
//!
//! `CommandExecutor` owns the loaded rule set and the tag store and returns
//! plain data; `main` decides how to print it.

use crate::driver::{BuildReport, Builder};
use crate::errors::Result;
use crate::graph::{needed_to_build, required_by};
use crate::labels::Label;
use crate::rules::Rule;
use crate::ruleset::{MatchMode, RuleSet};
use crate::storage::TagStore;
use serde::Serialize;

/// One rule as reported to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleSummary {
    pub target: Label,
    pub depends: Vec<Label>,
    pub has_action: bool,
}

impl From<&Rule> for RuleSummary {
    fn from(rule: &Rule) -> Self {
        Self {
            target: rule.target.clone(),
            depends: rule.deps.iter().cloned().collect(),
            has_action: rule.action.is_some(),
        }
    }
}

pub struct CommandExecutor<S: TagStore> {
    ruleset: RuleSet,
    store: S,
}

impl<S: TagStore> CommandExecutor<S> {
    pub fn new(ruleset: RuleSet, store: S) -> Self {
        Self { ruleset, store }
    }

    pub fn ruleset(&self) -> &RuleSet {
        &self.ruleset
    }

    /// The ordered rules needed to build `label`.
    pub fn plan(&self, label: &str, mode: MatchMode) -> Result<Vec<RuleSummary>> {
        let target = Label::parse(label)?;
        let plan = needed_to_build(&self.ruleset, &target, mode)?;
        Ok(plan.iter().map(RuleSummary::from).collect())
    }

    /// Every label that depends on `label`, sorted.
    pub fn required_by(&self, label: &str, mode: MatchMode) -> Result<Vec<Label>> {
        let label = Label::parse(label)?;
        Ok(required_by(&self.ruleset, &label, mode)?.into_iter().collect())
    }

    /// Rules whose target matches `filter` (all rules if `None`).
    pub fn rules(
        &self,
        filter: Option<&str>,
        show_system: bool,
        ignore_empty: bool,
    ) -> Result<Vec<RuleSummary>> {
        let filter = filter.map(Label::parse).transpose()?;
        Ok(self
            .ruleset
            .rules()
            .into_iter()
            .filter(|rule| filter.as_ref().map_or(true, |f| f.just_match(&rule.target)))
            .filter(|rule| show_system || !rule.target.is_system())
            .filter(|rule| !ignore_empty || !rule.deps.is_empty())
            .map(|rule| {
                let mut summary = RuleSummary::from(rule);
                if !show_system {
                    summary.depends.retain(|dep| !dep.is_system());
                }
                summary
            })
            .collect())
    }

    /// The rule listing as text, between `-----` lines.
    pub fn rules_text(
        &self,
        filter: Option<&str>,
        show_system: bool,
        ignore_empty: bool,
    ) -> Result<String> {
        let filter = filter.map(Label::parse).transpose()?;
        Ok(self
            .ruleset
            .to_string_filtered(filter.as_ref(), true, show_system, ignore_empty))
    }

    /// Build `label`, skipping whatever the tag store already records.
    pub fn build(&self, label: &str, mode: MatchMode, just_print: bool) -> Result<BuildReport> {
        let target = Label::parse(label)?;
        Builder::new(&self.ruleset, self.store.clone())
            .just_print(just_print)
            .build(&target, mode)
    }
}
