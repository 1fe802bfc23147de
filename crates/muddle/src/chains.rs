//! Helpers for building the standard rule shapes.
//!
//! Build descriptions rarely write rules one at a time. Checkouts, packages
//! and deployments each follow a conventional lifecycle (see
//! [`crate::labels::tags`]), and these helpers add the rules that chain those
//! stages together.

use crate::errors::Result;
use crate::labels::{tags, Label, LabelKind, WILDCARD};
use crate::rules::{Action, Rule};
use crate::ruleset::RuleSet;
use std::sync::Arc;

/// Add a chain of rules: `label`, then one rule per tag in `tags`, each
/// depending on the one before. Every rule in the chain gets `action`.
///
/// The chained labels are copies of `label` with the tag replaced, so they
/// keep its annotations.
pub fn depend_chain(
    action: Option<Arc<dyn Action>>,
    label: &Label,
    tags: &[&str],
    ruleset: &mut RuleSet,
) -> Result<()> {
    ruleset.add(Rule::new(label.clone(), action.clone()));

    let mut last = label.clone();
    for tag in tags {
        let next = last.with_tag(tag)?;
        ruleset.add(Rule::new(next.clone(), action.clone()).with_dep(last));
        last = next;
    }
    Ok(())
}

/// A rule for `label` with no dependencies.
pub fn depend_none(action: Option<Arc<dyn Action>>, label: Label) -> Rule {
    Rule::new(label, action)
}

/// A rule for `label` that depends only on `dep`.
pub fn depend_one(action: Option<Arc<dyn Action>>, label: Label, dep: Label) -> Rule {
    Rule::new(label, action).with_dep(dep)
}

/// A rule for `label` that depends on the same label at `old_tag`.
pub fn depend_self(action: Option<Arc<dyn Action>>, label: Label, old_tag: &str) -> Result<Rule> {
    let dep = label.with_tag(old_tag)?;
    Ok(Rule::new(label, action).with_dep(dep))
}

/// The standard checkout rules: `checked_out` followed by `up_to_date`,
/// `changes_committed` and `changes_pushed`, with `pulled` hanging off
/// `checked_out`.
///
/// The rest of the chain is system labels. The user-visible `checked_out`
/// rule goes in first: merging keeps the existing target, so the checkout
/// itself still shows up in rule listings.
pub fn add_checkout_rules(
    ruleset: &mut RuleSet,
    checkout: &str,
    action: Option<Arc<dyn Action>>,
) -> Result<()> {
    let visible = Label::new(LabelKind::Checkout, checkout, None, tags::CHECKED_OUT)?;
    ruleset.add(depend_none(action.clone(), visible.clone()));

    let checked_out = visible.with_system(true);
    depend_chain(action.clone(), &checked_out, &tags::CHECKOUT_STAGES, ruleset)?;
    ruleset.add(depend_self(action, checked_out.with_tag(tags::PULLED)?, tags::CHECKED_OUT)?);
    Ok(())
}

/// Make `package{role}` depend on `checkout` being up to date before it is
/// configured.
pub fn package_depends_on_checkout(
    ruleset: &mut RuleSet,
    package: &str,
    role: Option<&str>,
    checkout: &str,
    action: Option<Arc<dyn Action>>,
) -> Result<()> {
    let preconfig =
        Label::new(LabelKind::Package, package, role, tags::PRECONFIG)?.with_system(true);
    let up_to_date = Label::new(LabelKind::Checkout, checkout, None, tags::UP_TO_DATE)?;
    ruleset.add(depend_one(action, preconfig, up_to_date));
    Ok(())
}

/// The standard package rules: `preconfig` through `postinstalled`, plus
/// transient `clean` and `distclean` rules with no dependencies.
pub fn add_package_rules(
    ruleset: &mut RuleSet,
    package: &str,
    role: Option<&str>,
    action: Option<Arc<dyn Action>>,
) -> Result<()> {
    let preconfig =
        Label::new(LabelKind::Package, package, role, tags::PRECONFIG)?.with_system(true);
    depend_chain(action.clone(), &preconfig, &tags::PACKAGE_STAGES, ruleset)?;

    // Transient: nobody wants to remember having cleaned
    for tag in [tags::CLEAN, tags::DISTCLEAN] {
        let label = Label::new(LabelKind::Package, package, role, tag)?
            .with_system(true)
            .with_transient(true);
        ruleset.add(depend_none(action.clone(), label));
    }
    Ok(())
}

/// Make package `package{role}` depend on another package being postinstalled
/// before it is configured.
pub fn package_depends_on_package(
    ruleset: &mut RuleSet,
    package: &str,
    role: Option<&str>,
    other: &str,
    other_role: Option<&str>,
) -> Result<()> {
    let preconfig =
        Label::new(LabelKind::Package, package, role, tags::PRECONFIG)?.with_system(true);
    let installed = Label::new(LabelKind::Package, other, other_role, tags::POSTINSTALLED)?;
    ruleset.rule_for_target_or_insert(&preconfig)?.add(installed);
    Ok(())
}

/// The standard deployment rules: `deployed`, a standalone transient
/// `instructionsapplied`, and `clean`.
pub fn add_deployment_rules(
    ruleset: &mut RuleSet,
    deployment: &str,
    action: Option<Arc<dyn Action>>,
) -> Result<()> {
    let deployed = Label::new(LabelKind::Deployment, deployment, None, tags::DEPLOYED)?;
    ruleset.add(depend_none(action.clone(), deployed.clone()));
    ruleset.add(depend_none(
        action.clone(),
        deployed.with_tag(tags::INSTRUCTIONS_APPLIED)?.with_transient(true),
    ));
    ruleset.add(depend_none(action, deployed.with_tag(tags::CLEAN)?));
    Ok(())
}

/// Make `deployment` depend on every package in each of `roles` having been
/// postinstalled.
pub fn deployment_depends_on_roles(
    ruleset: &mut RuleSet,
    deployment: &str,
    roles: &[&str],
) -> Result<()> {
    let deployed = Label::new(LabelKind::Deployment, deployment, None, tags::DEPLOYED)?;
    let rule = ruleset.rule_for_target_or_insert(&deployed)?;
    for role in roles {
        rule.add(Label::new(LabelKind::Package, WILDCARD, Some(*role), tags::POSTINSTALLED)?);
    }
    Ok(())
}

/// Make every package in `role` wait for `deployment` before it is
/// configured.
pub fn role_depends_on_deployment(
    ruleset: &mut RuleSet,
    role: &str,
    deployment: &str,
) -> Result<()> {
    let preconfig = Label::new(LabelKind::Package, WILDCARD, Some(role), tags::PRECONFIG)?;
    let deployed = Label::new(LabelKind::Deployment, deployment, None, tags::DEPLOYED)?;
    ruleset.add(depend_one(None, preconfig, deployed));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::needed_to_build;
    use crate::ruleset::MatchMode;
    use crate::test_utils::{label, RecordingAction};

    fn plan_for(ruleset: &RuleSet, target: &str) -> Vec<String> {
        needed_to_build(ruleset, &label(target), MatchMode::Wildcard)
            .unwrap()
            .iter()
            .map(|rule| rule.target.to_string())
            .collect()
    }

    #[test]
    fn test_depend_chain() {
        let mut ruleset = RuleSet::new();
        let (action, _) = RecordingAction::shared("chain");
        depend_chain(Some(action), &label("package:fred/a"), &["b", "c"], &mut ruleset).unwrap();

        assert_eq!(ruleset.len(), 3);
        assert!(ruleset.rules().iter().all(|rule| rule.action.is_some()));
        assert_eq!(
            plan_for(&ruleset, "package:fred/c"),
            vec!["package:fred/a", "package:fred/b", "package:fred/c"]
        );
    }

    #[test]
    fn test_depend_self() {
        let rule = depend_self(None, label("package:fred/built"), "configured").unwrap();
        assert!(rule.deps.contains(&label("package:fred/configured")));
        assert!(depend_none(None, label("package:fred/built")).deps.is_empty());
        assert_eq!(
            depend_one(None, label("package:a/built"), label("package:b/built")).deps.len(),
            1
        );
    }

    #[test]
    fn test_checkout_rules() {
        let mut ruleset = RuleSet::new();
        add_checkout_rules(&mut ruleset, "co", None).unwrap();

        assert_eq!(
            plan_for(&ruleset, "checkout:co/changes_pushed"),
            vec![
                "checkout:co/checked_out",
                "checkout:co/up_to_date[S]",
                "checkout:co/changes_committed[S]",
                "checkout:co/changes_pushed[S]"
            ]
        );
        let pulled = ruleset.rule_for_target(&label("checkout:co/pulled")).unwrap();
        assert!(pulled.deps.contains(&label("checkout:co/checked_out")));
    }

    #[test]
    fn test_package_rules_with_checkout() {
        let mut ruleset = RuleSet::new();
        add_checkout_rules(&mut ruleset, "co", None).unwrap();
        add_package_rules(&mut ruleset, "fred", Some("x86"), None).unwrap();
        package_depends_on_checkout(&mut ruleset, "fred", Some("x86"), "co", None).unwrap();

        assert_eq!(
            plan_for(&ruleset, "package:fred{x86}/built"),
            vec![
                "checkout:co/checked_out",
                "checkout:co/up_to_date[S]",
                "package:fred{x86}/preconfig[S]",
                "package:fred{x86}/configured[S]",
                "package:fred{x86}/built[S]"
            ]
        );

        let clean = ruleset.rule_for_target(&label("package:fred{x86}/clean")).unwrap();
        assert!(clean.target.is_transient());
        assert!(clean.deps.is_empty());
    }

    #[test]
    fn test_package_depends_on_package() {
        let mut ruleset = RuleSet::new();
        add_package_rules(&mut ruleset, "lib", Some("x86"), None).unwrap();
        add_package_rules(&mut ruleset, "app", Some("x86"), None).unwrap();
        package_depends_on_package(&mut ruleset, "app", Some("x86"), "lib", Some("x86")).unwrap();

        let plan = plan_for(&ruleset, "package:app{x86}/preconfig");
        assert_eq!(plan.last().unwrap(), "package:app{x86}/preconfig[S]");
        assert!(plan.contains(&"package:lib{x86}/postinstalled[S]".to_string()));
    }

    #[test]
    fn test_deployment_rules() {
        let mut ruleset = RuleSet::new();
        add_package_rules(&mut ruleset, "a", Some("x86"), None).unwrap();
        add_package_rules(&mut ruleset, "b", Some("arm"), None).unwrap();
        add_deployment_rules(&mut ruleset, "img", None).unwrap();
        deployment_depends_on_roles(&mut ruleset, "img", &["x86"]).unwrap();

        let plan = plan_for(&ruleset, "deployment:img/deployed");
        assert_eq!(plan.last().unwrap(), "deployment:img/deployed");
        assert!(plan.contains(&"package:a{x86}/postinstalled[S]".to_string()));
        assert!(!plan.iter().any(|t| t.starts_with("package:b")));

        let iapp = ruleset
            .rule_for_target(&label("deployment:img/instructionsapplied"))
            .unwrap();
        assert!(iapp.target.is_transient());
        assert!(iapp.deps.is_empty());
    }

    #[test]
    fn test_role_depends_on_deployment() {
        let mut ruleset = RuleSet::new();
        add_deployment_rules(&mut ruleset, "tools", None).unwrap();
        add_package_rules(&mut ruleset, "fred", Some("x86"), None).unwrap();
        role_depends_on_deployment(&mut ruleset, "x86", "tools").unwrap();

        let plan = plan_for(&ruleset, "package:fred{x86}/preconfig");
        assert_eq!(plan[0], "deployment:tools/deployed");
    }
}
