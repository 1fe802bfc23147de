//! Rules and the actions that satisfy them.
//!
//! A [`Rule`] says: once every label in `deps` is asserted, run `action` to
//! assert `target`. A rule with no action is a barrier, satisfied as soon as
//! its dependencies are.

use crate::errors::{MuddleError, Result};
use crate::labels::Label;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// Variables handed to actions while they build labels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// All variables, sorted by name.
    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }
}

/// Something that can do the work for a label once its dependencies hold.
///
/// Implementations live outside the engine (VCS checkouts, make invocations,
/// file assembly). The engine only ever calls [`Action::build_label`] with a
/// concrete label, and never lets an action see the rule set.
pub trait Action: fmt::Debug + Send + Sync {
    /// Do whatever is needed to assert `label`.
    fn build_label(&self, env: &mut Environment, label: &Label) -> Result<()>;

    /// Apply `rewrite` to every label this action holds internally.
    ///
    /// The domain sweep uses this to reach labels that are not visible through
    /// a rule's target or dependencies. Actions are shared between rules, so
    /// implementations hold their labels behind interior mutability.
    fn rewrite_inner_labels(&self, _rewrite: &mut dyn FnMut(&mut Label)) {}
}

/// Runs two actions in turn.
#[derive(Debug)]
pub struct SequentialAction {
    first: Arc<dyn Action>,
    second: Arc<dyn Action>,
}

impl SequentialAction {
    pub fn new(first: Arc<dyn Action>, second: Arc<dyn Action>) -> Self {
        Self { first, second }
    }

    pub fn first(&self) -> &Arc<dyn Action> {
        &self.first
    }

    pub fn second(&self) -> &Arc<dyn Action> {
        &self.second
    }
}

impl Action for SequentialAction {
    fn build_label(&self, env: &mut Environment, label: &Label) -> Result<()> {
        self.first.build_label(env, label)?;
        self.second.build_label(env, label)
    }

    fn rewrite_inner_labels(&self, rewrite: &mut dyn FnMut(&mut Label)) {
        self.first.rewrite_inner_labels(rewrite);
        self.second.rewrite_inner_labels(rewrite);
    }
}

/// What to do when two rules being combined both carry an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateAction {
    /// Treat it as a bug in the build description
    #[default]
    Complain,
    /// The incoming action wins
    Replace,
    /// Run both, existing action first
    Sequence,
}

/// A target label, the action that produces it, and its prerequisites.
#[derive(Debug, Clone)]
pub struct Rule {
    pub target: Label,
    pub action: Option<Arc<dyn Action>>,
    pub deps: BTreeSet<Label>,
}

impl Rule {
    /// A rule with no dependencies yet.
    pub fn new(target: Label, action: Option<Arc<dyn Action>>) -> Self {
        Self {
            target,
            action,
            deps: BTreeSet::new(),
        }
    }

    /// A rule with no action: satisfied once its dependencies are.
    pub fn barrier(target: Label) -> Self {
        Self::new(target, None)
    }

    /// Add a dependency.
    pub fn add(&mut self, label: Label) {
        self.deps.insert(label);
    }

    /// Builder form of [`Rule::add`].
    pub fn with_dep(mut self, label: Label) -> Self {
        self.add(label);
        self
    }

    /// Merge another rule for the same target into this one.
    ///
    /// Dependencies are unioned. If `other` has an action it replaces ours,
    /// so the most recently merged action wins.
    pub fn merge(&mut self, other: Rule) {
        self.deps.extend(other.deps);
        if other.action.is_some() {
            self.action = other.action;
        }
    }

    /// Merge used while unifying a rule set: dependencies are unioned and an
    /// action clash is settled by `on_duplicate`.
    ///
    /// Two handles to the same action object are not a clash.
    ///
    /// # Errors
    ///
    /// Returns [`MuddleError::Bug`] for a clash under
    /// [`DuplicateAction::Complain`]; the rule is left unchanged.
    pub fn catenate_and_merge(&mut self, other: Rule, on_duplicate: DuplicateAction) -> Result<()> {
        let action = match (self.action.take(), other.action) {
            (None, incoming) => incoming,
            (existing, None) => existing,
            (Some(existing), Some(incoming)) if Arc::ptr_eq(&existing, &incoming) => Some(existing),
            (Some(existing), Some(incoming)) => match on_duplicate {
                DuplicateAction::Complain => {
                    self.action = Some(existing);
                    return Err(MuddleError::bug(format!(
                        "Duplicate action for {} while merging rules \
                         (is the same package declared in two domains?)",
                        self.target
                    )));
                }
                DuplicateAction::Replace => Some(incoming),
                DuplicateAction::Sequence => {
                    Some(Arc::new(SequentialAction::new(existing, incoming)) as Arc<dyn Action>)
                }
            },
        };
        self.action = action;
        self.deps.extend(other.deps);
        Ok(())
    }

    /// This rule as it applies to the concrete label `concrete`.
    ///
    /// The target becomes `concrete` (keeping this rule's annotations). If
    /// this rule's own target is wildcarded, its wildcard dependencies are
    /// filled in from `concrete`; a rule written for one definite target
    /// keeps its dependencies as they are.
    pub fn instantiate_for(&self, concrete: &Label) -> Rule {
        let mut target = concrete.clone();
        target.set_transient(self.target.is_transient() || concrete.is_transient());
        target.set_system(self.target.is_system());
        let deps = if self.target.is_definite() {
            self.deps.clone()
        } else {
            self.deps
                .iter()
                .map(|dep| dep.instantiate_from(concrete))
                .collect()
        };
        Rule {
            target,
            action: self.action.clone(),
            deps,
        }
    }

    /// Render as `target <- [ dep, dep ]`, showing only the requested kinds
    /// of dependency.
    pub fn to_string_filtered(&self, show_user: bool, show_system: bool) -> String {
        let deps: Vec<String> = self
            .deps
            .iter()
            .filter(|dep| if dep.is_system() { show_system } else { show_user })
            .map(Label::to_string)
            .collect();
        format!("{} <- [ {} ]", self.target, deps.join(", "))
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_filtered(true, true))
    }
}

/// The rule with the fewest direct dependencies, first in target order on
/// ties. There is no rational "best" rule; this is only meant for sets that
/// usually hold a single rule.
pub fn rule_with_least_dependencies<'a>(
    rules: impl IntoIterator<Item = &'a Rule>,
) -> Option<&'a Rule> {
    rules
        .into_iter()
        .min_by(|a, b| a.deps.len().cmp(&b.deps.len()).then_with(|| a.target.cmp(&b.target)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{label, RecordingAction};

    #[test]
    fn test_merge_unions_deps_and_replaces_action() {
        let (first, log) = RecordingAction::shared("first");
        let (second, _) = RecordingAction::shared("second");

        let mut rule = Rule::new(label("package:fred/built"), Some(first))
            .with_dep(label("package:fred/configured"));
        rule.merge(
            Rule::new(label("package:fred/built"), Some(second))
                .with_dep(label("checkout:fred/checked_out")),
        );
        assert_eq!(rule.deps.len(), 2);

        let mut env = Environment::new();
        rule.action
            .as_ref()
            .unwrap()
            .build_label(&mut env, &rule.target)
            .unwrap();
        assert!(log.lock().unwrap().is_empty(), "first action was replaced");
    }

    #[test]
    fn test_merge_keeps_action_when_incoming_has_none() {
        let (action, _) = RecordingAction::shared("keep");
        let mut rule = Rule::new(label("package:fred/built"), Some(action));
        rule.merge(Rule::barrier(label("package:fred/built")).with_dep(label("package:x/built")));
        assert!(rule.action.is_some());
        assert_eq!(rule.deps.len(), 1);
    }

    #[test]
    fn test_catenate_complains_on_duplicate() {
        let (a, _) = RecordingAction::shared("a");
        let (b, _) = RecordingAction::shared("b");
        let mut rule = Rule::new(label("package:fred/built"), Some(a.clone()));
        let err = rule
            .catenate_and_merge(
                Rule::new(label("package:fred/built"), Some(b)),
                DuplicateAction::Complain,
            )
            .unwrap_err();
        assert!(matches!(err, MuddleError::Bug(_)));
        assert!(Arc::ptr_eq(rule.action.as_ref().unwrap(), &a));
    }

    #[test]
    fn test_catenate_same_action_is_not_a_clash() {
        let (a, _) = RecordingAction::shared("a");
        let mut rule = Rule::new(label("package:fred/built"), Some(a.clone()));
        rule.catenate_and_merge(
            Rule::new(label("package:fred/built"), Some(a.clone()))
                .with_dep(label("package:x/built")),
            DuplicateAction::Complain,
        )
        .unwrap();
        assert!(Arc::ptr_eq(rule.action.as_ref().unwrap(), &a));
        assert_eq!(rule.deps.len(), 1);
    }

    #[test]
    fn test_catenate_sequence_runs_both_in_order() {
        let log = RecordingAction::new_log();
        let a: Arc<dyn Action> = Arc::new(RecordingAction::with_log("a", log.clone()));
        let b: Arc<dyn Action> = Arc::new(RecordingAction::with_log("b", log.clone()));

        let mut rule = Rule::new(label("package:fred/built"), Some(a));
        rule.catenate_and_merge(
            Rule::new(label("package:fred/built"), Some(b)),
            DuplicateAction::Sequence,
        )
        .unwrap();

        let mut env = Environment::new();
        rule.action
            .as_ref()
            .unwrap()
            .build_label(&mut env, &rule.target)
            .unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            vec!["a package:fred/built", "b package:fred/built"]
        );
    }

    #[test]
    fn test_catenate_replace() {
        let (a, _) = RecordingAction::shared("a");
        let (b, _) = RecordingAction::shared("b");
        let mut rule = Rule::new(label("package:fred/built"), Some(a));
        rule.catenate_and_merge(
            Rule::new(label("package:fred/built"), Some(b.clone())),
            DuplicateAction::Replace,
        )
        .unwrap();
        assert!(Arc::ptr_eq(rule.action.as_ref().unwrap(), &b));
    }

    #[test]
    fn test_instantiate_for_fills_wildcard_deps() {
        let rule = Rule::barrier(label("package:*{bob}/built[S]"))
            .with_dep(label("package:*{bob}/configured"))
            .with_dep(label("checkout:shared/checked_out"));
        let inst = rule.instantiate_for(&label("package:fred{bob}/built"));

        assert_eq!(inst.target, label("package:fred{bob}/built"));
        assert!(inst.target.is_system());
        let deps: Vec<String> = inst.deps.iter().map(Label::to_string).collect();
        assert_eq!(
            deps,
            vec!["checkout:shared/checked_out", "package:fred{bob}/configured"]
        );
    }

    #[test]
    fn test_instantiate_for_definite_rule_keeps_deps() {
        let rule =
            Rule::barrier(label("deployment:img/deployed")).with_dep(label("package:*/installed"));
        let inst = rule.instantiate_for(&label("deployment:img/deployed"));
        assert!(inst.deps.contains(&label("package:*/installed")));
    }

    #[test]
    fn test_display_filters_system_deps() {
        let rule = Rule::barrier(label("package:fred/built"))
            .with_dep(label("package:fred/configured"))
            .with_dep(label("package:fred/preconfig[S]"));
        assert_eq!(
            rule.to_string(),
            "package:fred/built <- [ package:fred/configured, package:fred/preconfig[S] ]"
        );
        assert_eq!(
            rule.to_string_filtered(true, false),
            "package:fred/built <- [ package:fred/configured ]"
        );
    }

    #[test]
    fn test_rule_with_least_dependencies() {
        let big = Rule::barrier(label("package:a/built"))
            .with_dep(label("package:x/built"))
            .with_dep(label("package:y/built"));
        let small = Rule::barrier(label("package:b/built")).with_dep(label("package:x/built"));
        let rules = vec![big, small];
        let best = rule_with_least_dependencies(&rules).unwrap();
        assert_eq!(best.target, label("package:b/built"));
        assert!(rule_with_least_dependencies(&Vec::new()).is_none());
    }

    #[test]
    fn test_environment() {
        let mut env = Environment::new();
        env.set("MUDDLE_ROOT", "/build");
        assert_eq!(env.get("MUDDLE_ROOT"), Some("/build"));
        assert_eq!(env.get("MISSING"), None);
        assert_eq!(env.vars().len(), 1);
    }
}
