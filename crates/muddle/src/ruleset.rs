//! The collection of rules for a build.
//!
//! A [`RuleSet`] maps each target label to the one rule that builds it.
//! Adding a rule for a target that already has one merges the two. Targets
//! may be wildcarded: such a rule adds its dependencies (and action) to
//! every concrete label it matches.

use crate::errors::{MuddleError, Result};
use crate::labels::Label;
use crate::rules::{DuplicateAction, Rule};
use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use tracing::debug;

/// How a label is compared against the labels in a rule set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Exact equality, no wildcard support
    Exact,
    /// Wildcards on either side match anything
    #[default]
    Wildcard,
    /// Exact equality except that the tag is ignored
    WithoutTag,
}

/// A mapping from target label to the rule that builds it.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    map: HashMap<Label, Rule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Add a rule, merging into any existing rule for the same target.
    pub fn add(&mut self, rule: Rule) {
        match self.map.entry(rule.target.clone()) {
            Entry::Occupied(mut existing) => existing.get_mut().merge(rule),
            Entry::Vacant(slot) => {
                slot.insert(rule);
            }
        }
    }

    /// Add every rule of `other` to this set.
    pub fn merge(&mut self, other: RuleSet) {
        for rule in other.into_rules() {
            self.add(rule);
        }
    }

    /// The rule for exactly this target, if any.
    pub fn rule_for_target(&self, target: &Label) -> Option<&Rule> {
        self.map.get(target)
    }

    /// The rule for exactly this target, creating an empty barrier rule if
    /// there is none.
    ///
    /// # Errors
    ///
    /// Returns [`MuddleError::Bug`] if `target` is wildcarded: a rule created
    /// on demand must be keyed by a definite label.
    pub fn rule_for_target_or_insert(&mut self, target: &Label) -> Result<&mut Rule> {
        if !target.is_definite() {
            return Err(MuddleError::bug(format!(
                "Attempt to create a rule for wildcarded label {}",
                target
            )));
        }
        Ok(self
            .map
            .entry(target.clone())
            .or_insert_with(|| Rule::barrier(target.clone())))
    }

    /// Every rule whose target matches `label`, sorted by target.
    ///
    /// Several rules can apply to one concrete label (an exact rule plus any
    /// number of wildcard rules); callers must satisfy all of them.
    pub fn rules_for_target(&self, label: &Label, mode: MatchMode) -> Vec<&Rule> {
        let mut rules: Vec<&Rule> = match mode {
            MatchMode::Exact => self.map.get(label).into_iter().collect(),
            MatchMode::Wildcard => self
                .map
                .iter()
                .filter(|(target, _)| target.just_match(label))
                .map(|(_, rule)| rule)
                .collect(),
            MatchMode::WithoutTag => self
                .map
                .iter()
                .filter(|(target, _)| target.match_without_tag(label))
                .map(|(_, rule)| rule)
                .collect(),
        };
        rules.sort_by(|a, b| a.target.cmp(&b.target));
        rules
    }

    /// The concrete targets `label` stands for.
    ///
    /// - `Exact`: just `label`.
    /// - `Wildcard`: `label` itself if it is definite, otherwise every
    ///   definite target that matches it.
    /// - `WithoutTag`: every definite target equal to `label` apart from
    ///   its tag.
    pub fn targets_match(&self, label: &Label, mode: MatchMode) -> BTreeSet<Label> {
        match mode {
            MatchMode::Exact => BTreeSet::from([label.clone()]),
            MatchMode::Wildcard if label.is_definite() => BTreeSet::from([label.clone()]),
            MatchMode::Wildcard => self
                .map
                .keys()
                .filter(|target| target.is_definite() && target.just_match(label))
                .cloned()
                .collect(),
            MatchMode::WithoutTag => self
                .map
                .keys()
                .filter(|target| target.is_definite() && target.match_without_tag(label))
                .cloned()
                .collect(),
        }
    }

    /// Every rule that has `label` among its dependencies, sorted by target.
    pub fn rules_which_depend_on(&self, label: &Label, mode: MatchMode) -> Vec<&Rule> {
        let mut rules: Vec<&Rule> = self
            .map
            .values()
            .filter(|rule| match mode {
                MatchMode::Exact => rule.deps.contains(label),
                MatchMode::Wildcard => rule.deps.iter().any(|dep| dep.just_match(label)),
                MatchMode::WithoutTag => rule.deps.iter().any(|dep| dep.match_without_tag(label)),
            })
            .collect();
        rules.sort_by(|a, b| a.target.cmp(&b.target));
        rules
    }

    /// Replace every label that unifies with `source`, as a target or as a
    /// dependency, by its copy unified with `target`.
    ///
    /// Rules whose targets collapse together are combined with
    /// [`Rule::catenate_and_merge`] under `on_duplicate`. The new map is
    /// built completely before it replaces the old one, so on error the rule
    /// set is unchanged.
    pub fn unify(
        &mut self,
        source: &Label,
        target: &Label,
        on_duplicate: DuplicateAction,
    ) -> Result<()> {
        let rewrite = |label: &Label| {
            if label.unifies(source) {
                label.copy_and_unify_with(target)
            } else {
                label.clone()
            }
        };

        let mut new_map: HashMap<Label, Rule> = HashMap::with_capacity(self.map.len());
        for rule in self.rules() {
            let mut rewritten = rule.clone();
            rewritten.target = rewrite(&rule.target);
            match new_map.entry(rewritten.target.clone()) {
                Entry::Occupied(mut existing) => {
                    existing.get_mut().catenate_and_merge(rewritten, on_duplicate)?
                }
                Entry::Vacant(slot) => {
                    slot.insert(rewritten);
                }
            }
        }

        for rule in new_map.values_mut() {
            rule.deps = rule.deps.iter().map(rewrite).collect();
        }

        debug!(
            %source,
            %target,
            before = self.map.len(),
            after = new_map.len(),
            "unified rule set"
        );
        self.map = new_map;
        Ok(())
    }

    /// All rules, sorted by target.
    pub fn rules(&self) -> Vec<&Rule> {
        let mut rules: Vec<&Rule> = self.map.values().collect();
        rules.sort_by(|a, b| a.target.cmp(&b.target));
        rules
    }

    /// All targets, sorted.
    pub fn targets(&self) -> Vec<&Label> {
        let mut targets: Vec<&Label> = self.map.keys().collect();
        targets.sort();
        targets
    }

    /// Consume the set, yielding its rules sorted by target.
    pub fn into_rules(self) -> Vec<Rule> {
        let mut rules: Vec<Rule> = self.map.into_values().collect();
        rules.sort_by(|a, b| a.target.cmp(&b.target));
        rules
    }

    /// Mutable access to every rule. Targets must not change identity here;
    /// use [`RuleSet::rewrite_rules`] for that.
    pub(crate) fn rules_mut(&mut self) -> impl Iterator<Item = &mut Rule> {
        self.map.values_mut()
    }

    /// Rebuild the set after applying `f` to every rule, in target order.
    /// Rules whose targets end up equal are merged.
    pub(crate) fn rewrite_rules(&mut self, mut f: impl FnMut(&mut Rule)) {
        let rules = std::mem::take(self).into_rules();
        for mut rule in rules {
            f(&mut rule);
            self.add(rule);
        }
    }

    /// Render the rule set between `-----` lines, one rule per line.
    ///
    /// - `match_label`: only rules whose target matches it.
    /// - `show_user` / `show_system`: which kinds of label to show.
    /// - `ignore_empty`: skip rules with no dependencies.
    pub fn to_string_filtered(
        &self,
        match_label: Option<&Label>,
        show_user: bool,
        show_system: bool,
        ignore_empty: bool,
    ) -> String {
        let mut out = String::from("-----\n");
        for rule in self.rules() {
            if ignore_empty && rule.deps.is_empty() {
                continue;
            }
            if let Some(pattern) = match_label {
                if !pattern.just_match(&rule.target) {
                    continue;
                }
            }
            let shown = if rule.target.is_system() { show_system } else { show_user };
            if shown {
                out.push_str(&rule.to_string_filtered(show_user, show_system));
                out.push('\n');
            }
        }
        out.push_str("-----\n");
        out
    }
}

impl fmt::Display for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_filtered(None, true, true, false))
    }
}
