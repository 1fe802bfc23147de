//! muddle: label-and-rule dependency engine
//!
//! Every step of a multi-repository build is named by a [`Label`] such as
//! `package:(sub)busybox{rootfs}/installed`. A [`RuleSet`] says what each
//! label depends on and which [`Action`] builds it; [`needed_to_build`]
//! turns a target into an ordered plan and [`required_by`] answers "what
//! does this affect". Sub-builds are spliced in under a domain with
//! [`include_domain`].
//!
//! The library is also what the `muddle` binary is built on.

pub mod actions;
pub mod chains;
pub mod cli;
pub mod commands;
pub mod config;
pub mod domains;
pub mod driver;
pub mod errors;
pub mod graph;
pub mod labels;
pub mod output;
pub mod rules;
pub mod ruleset;
pub mod storage;

#[cfg(test)]
mod graph_proptests;
#[cfg(test)]
mod test_utils;

// Re-export commonly used types
pub use domains::include_domain;
pub use driver::{BuildReport, Builder};
pub use errors::{ErrorKind, MuddleError, Result};
pub use graph::{needed_to_build, required_by};
pub use labels::{Label, LabelKind};
pub use output::{ExitCode, JsonDocument, JsonError, JsonOutput};
pub use rules::{Action, DuplicateAction, Environment, Rule, SequentialAction};
pub use ruleset::{MatchMode, RuleSet};
pub use storage::{InMemoryTagStore, TagStore};
