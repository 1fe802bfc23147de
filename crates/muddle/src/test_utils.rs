//! Shared test utilities
//!
//! Common helpers used across multiple test modules to reduce duplication.

#![cfg(test)]

use crate::errors::{MuddleError, Result};
use crate::labels::Label;
use crate::rules::{Action, Environment, Rule};
use crate::ruleset::RuleSet;
use std::sync::{Arc, Mutex};

pub type ActionLog = Arc<Mutex<Vec<String>>>;

/// Parse a label, panicking on bad test input.
pub fn label(s: &str) -> Label {
    Label::parse(s).unwrap()
}

/// Build a rule set from `(target, [deps])` pairs, all barrier rules.
pub fn ruleset_of(rules: &[(&str, &[&str])]) -> RuleSet {
    let mut ruleset = RuleSet::new();
    for (target, deps) in rules {
        let mut rule = Rule::barrier(label(target));
        for dep in *deps {
            rule.add(label(dep));
        }
        ruleset.add(rule);
    }
    ruleset
}

/// Action that appends `"<name> <label>"` to a shared log.
#[derive(Debug)]
pub struct RecordingAction {
    name: String,
    log: ActionLog,
}

impl RecordingAction {
    pub fn new_log() -> ActionLog {
        Arc::new(Mutex::new(Vec::new()))
    }

    pub fn with_log(name: &str, log: ActionLog) -> Self {
        Self {
            name: name.to_string(),
            log,
        }
    }

    /// A fresh action with its own log.
    pub fn shared(name: &str) -> (Arc<dyn Action>, ActionLog) {
        let log = Self::new_log();
        (Arc::new(Self::with_log(name, log.clone())), log)
    }
}

impl Action for RecordingAction {
    fn build_label(&self, _env: &mut Environment, label: &Label) -> Result<()> {
        self.log
            .lock()
            .unwrap()
            .push(format!("{} {}", self.name, label));
        Ok(())
    }
}

/// Action that always fails softly.
#[derive(Debug)]
pub struct FailingAction;

impl Action for FailingAction {
    fn build_label(&self, _env: &mut Environment, label: &Label) -> Result<()> {
        Err(MuddleError::failure(format!("cannot build {}", label)))
    }
}
