//! Property-based tests for label parsing and identity
//!
//! These use `proptest` to check the label grammar and the identity rules
//! (equality, hashing, sweeping) over randomly generated labels.

use super::*;
use proptest::prelude::*;
use std::collections::hash_map::DefaultHasher;

fn hash_of(label: &Label) -> u64 {
    let mut hasher = DefaultHasher::new();
    label.hash(&mut hasher);
    hasher.finish()
}

// Generator for a single label part (never the wildcard)
fn part_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9._+-]{1,8}"
}

fn kind_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("checkout"),
        Just("package"),
        Just("deployment"),
        Just("synth"),
    ]
}

// Nested domains such as `a`, `a(b)`, `a(b(c))`
fn domain_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(part_strategy(), 1..4).prop_map(|parts| {
        let mut domain = parts[parts.len() - 1].clone();
        for outer in parts[..parts.len() - 1].iter().rev() {
            domain = format!("{}({})", outer, domain);
        }
        domain
    })
}

fn flags_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just(""), Just("T"), Just("S"), Just("TS")]
}

// Canonical label strings: no empty `{}` or `[]`, flags in T, S order
fn canonical_label_strategy() -> impl Strategy<Value = String> {
    (
        kind_strategy(),
        prop::option::of(domain_strategy()),
        part_strategy(),
        prop::option::of(part_strategy()),
        part_strategy(),
        flags_strategy(),
    )
        .prop_map(|(kind, domain, name, role, tag, flags)| {
            let mut s = format!("{}:", kind);
            if let Some(domain) = domain {
                s.push_str(&format!("({})", domain));
            }
            s.push_str(&name);
            if let Some(role) = role {
                s.push_str(&format!("{{{}}}", role));
            }
            s.push('/');
            s.push_str(&tag);
            if !flags.is_empty() {
                s.push_str(&format!("[{}]", flags));
            }
            s
        })
}

proptest! {
    #[test]
    fn prop_canonical_round_trip(s in canonical_label_strategy()) {
        let label = Label::parse(&s).unwrap();
        prop_assert_eq!(label.to_string(), s);
    }

    #[test]
    fn prop_empty_braces_are_ignored(
        kind in kind_strategy(),
        name in part_strategy(),
        tag in part_strategy(),
    ) {
        let plain = Label::parse(&format!("{}:{}/{}", kind, name, tag)).unwrap();
        let braced = Label::parse(&format!("{}:{}{{}}/{}[]", kind, name, tag)).unwrap();
        prop_assert_eq!(&plain, &braced);
        prop_assert_eq!(plain.to_string(), braced.to_string());
    }

    #[test]
    fn prop_hash_ignores_domain(s in canonical_label_strategy(), domain in domain_strategy()) {
        let label = Label::parse(&s).unwrap();
        let moved = label.with_domain(Some(domain.as_str())).unwrap();
        prop_assert_eq!(hash_of(&label), hash_of(&moved));
        prop_assert_eq!(label == moved, label.domain() == Some(domain.as_str()));
    }

    #[test]
    fn prop_annotations_do_not_affect_identity(s in canonical_label_strategy()) {
        let label = Label::parse(&s).unwrap();
        let flipped = label
            .clone()
            .with_transient(!label.is_transient())
            .with_system(!label.is_system());
        prop_assert_eq!(&label, &flipped);
        prop_assert_eq!(hash_of(&label), hash_of(&flipped));
    }

    #[test]
    fn prop_sweep_twice_equals_sweep_once(
        s in canonical_label_strategy(),
        domain in part_strategy(),
    ) {
        let mut once = Label::parse(&s).unwrap();
        once.mark_unswept();
        once.sweep(&domain);

        let mut twice = Label::parse(&s).unwrap();
        twice.mark_unswept();
        twice.sweep(&domain);
        prop_assert!(!twice.sweep(&domain));

        prop_assert_eq!(once.to_string(), twice.to_string());
        prop_assert!(!twice.is_unswept());
    }

    #[test]
    fn prop_label_matches_itself_exactly(s in canonical_label_strategy()) {
        let label = Label::parse(&s).unwrap();
        prop_assert!(label.is_definite());
        prop_assert_eq!(label.match_specificity(&label), Some(0));
        prop_assert!(label.just_match(&label));
        prop_assert!(label.unifies(&label));
    }

    #[test]
    fn prop_wildcard_tag_matches_every_tag(s in canonical_label_strategy()) {
        let label = Label::parse(&s).unwrap();
        let any_tag = label.with_tag(WILDCARD).unwrap();
        prop_assert!(label.unifies(&any_tag));
        prop_assert!(any_tag.just_match(&label));
        prop_assert_eq!(any_tag.match_specificity(&label), Some(-1));
        prop_assert!(label.match_without_tag(&any_tag));
    }

    #[test]
    fn prop_ordering_is_consistent_with_equality(
        a in canonical_label_strategy(),
        b in canonical_label_strategy(),
    ) {
        let a = Label::parse(&a).unwrap();
        let b = Label::parse(&b).unwrap();
        prop_assert_eq!(a.cmp(&b) == Ordering::Equal, a == b);
        prop_assert_eq!(a.cmp(&b), b.cmp(&a).reverse());
    }
}
