//! Property-based tests for dependency resolution
//!
//! Random acyclic rule sets check that plans respect every dependency, and
//! random back edges check that cycles are always reported.

use crate::errors::ErrorKind;
use crate::graph::{needed_to_build, required_by};
use crate::labels::Label;
use crate::rules::Rule;
use crate::ruleset::{MatchMode, RuleSet};
use proptest::prelude::*;
use std::collections::BTreeSet;

fn node(i: usize) -> Label {
    Label::parse(&format!("package:p{}/built", i)).unwrap()
}

// Generator for a DAG: node i may only depend on nodes below i
fn dag_strategy() -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1usize..12).prop_flat_map(|n| {
        (0..n)
            .map(|i| prop::collection::btree_set(0..i.max(1), 0..=i.min(4)))
            .collect::<Vec<_>>()
            .prop_map(|sets| {
                sets.into_iter()
                    .enumerate()
                    .map(|(i, deps)| deps.into_iter().filter(|&d| d < i).collect::<Vec<usize>>())
                    .collect::<Vec<_>>()
            })
    })
}

fn ruleset_from(edges: &[Vec<usize>]) -> RuleSet {
    let mut ruleset = RuleSet::new();
    for (i, deps) in edges.iter().enumerate() {
        let mut rule = Rule::barrier(node(i));
        for &d in deps {
            rule.add(node(d));
        }
        ruleset.add(rule);
    }
    ruleset
}

proptest! {
    #[test]
    fn prop_plan_respects_dependencies(edges in dag_strategy()) {
        let ruleset = ruleset_from(&edges);
        let top = node(edges.len() - 1);
        let plan = needed_to_build(&ruleset, &top, MatchMode::Wildcard).unwrap();

        let mut seen: BTreeSet<Label> = BTreeSet::new();
        for rule in &plan {
            for dep in &rule.deps {
                prop_assert!(seen.contains(dep), "{} scheduled before {}", rule.target, dep);
            }
            prop_assert!(seen.insert(rule.target.clone()), "{} scheduled twice", rule.target);
        }
        prop_assert_eq!(&plan.last().unwrap().target, &top);
    }

    #[test]
    fn prop_plan_is_deterministic(edges in dag_strategy()) {
        let ruleset = ruleset_from(&edges);
        let top = node(edges.len() - 1);
        let first: Vec<String> = needed_to_build(&ruleset, &top, MatchMode::Wildcard)
            .unwrap()
            .iter()
            .map(|r| r.target.to_string())
            .collect();
        let second: Vec<String> = needed_to_build(&ruleset.clone(), &top, MatchMode::Wildcard)
            .unwrap()
            .iter()
            .map(|r| r.target.to_string())
            .collect();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_back_edge_is_reported(edges in dag_strategy(), pick in any::<prop::sample::Index>()) {
        prop_assume!(edges.len() > 1);
        let mut ruleset = ruleset_from(&edges);
        // Close a cycle: the bottom node depends on the top node, and the
        // top node depends on the bottom one.
        let top = edges.len() - 1;
        let low = pick.index(top);
        ruleset.add(Rule::barrier(node(low)).with_dep(node(top)));
        ruleset.add(Rule::barrier(node(top)).with_dep(node(low)));

        let err = needed_to_build(&ruleset, &node(top), MatchMode::Wildcard).unwrap_err();
        prop_assert_eq!(err.kind(), ErrorKind::GiveUp);
        let message = err.to_string();
        let top_unsatisfied = format!("{} is still unsatisfied", node(top));
        let low_unsatisfied = format!("{} is still unsatisfied", node(low));
        prop_assert!(message.contains(&top_unsatisfied));
        prop_assert!(message.contains(&low_unsatisfied));
    }

    #[test]
    fn prop_required_by_is_inverse_of_plan(edges in dag_strategy()) {
        let ruleset = ruleset_from(&edges);
        for i in 0..edges.len() {
            let dependents = required_by(&ruleset, &node(i), MatchMode::Wildcard).unwrap();
            for dependent in &dependents {
                let plan = needed_to_build(&ruleset, dependent, MatchMode::Wildcard).unwrap();
                prop_assert!(plan.iter().any(|r| r.target == node(i)));
            }
            prop_assert!(!dependents.contains(&node(i)));
        }
    }
}
