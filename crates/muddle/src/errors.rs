//! Error taxonomy and actionable diagnostics.
//!
//! Errors fall into three kinds, distinguished by how they propagate:
//! - **Bug**: an internal invariant was violated. Always reported with full
//!   detail, never recovered locally.
//! - **Give up**: the user asked for something impossible (malformed label,
//!   no rule for a target, circular dependency graph). Reported as a clean
//!   message with possible causes and remediation steps.
//! - **Failure**: a soft failure an action helper may choose to retry
//!   differently. The resolution algorithms never raise this kind.

use crate::labels::Label;
use std::fmt;
use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, MuddleError>;

/// Propagation class of a [`MuddleError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Internal invariant violated
    Bug,
    /// User error, reported without a trace
    GiveUp,
    /// Soft failure
    Failure,
}

/// Errors raised by the dependency engine.
#[derive(Debug, Error)]
pub enum MuddleError {
    /// An internal invariant was violated
    #[error("internal error: {0}")]
    Bug(String),
    /// The request cannot be satisfied as described
    #[error("{0}")]
    GiveUp(ActionableError),
    /// A soft failure
    #[error("{0}")]
    Failure(String),
    /// A string did not match the label grammar
    #[error("Label string '{input}' is not a valid label: {reason}")]
    LabelSyntax { input: String, reason: String },
}

impl MuddleError {
    /// Create a bug error.
    pub fn bug(msg: impl Into<String>) -> Self {
        MuddleError::Bug(msg.into())
    }

    /// Create a soft failure.
    pub fn failure(msg: impl Into<String>) -> Self {
        MuddleError::Failure(msg.into())
    }

    /// Propagation class of this error. Label syntax errors are user errors.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MuddleError::Bug(_) => ErrorKind::Bug,
            MuddleError::GiveUp(_) | MuddleError::LabelSyntax { .. } => ErrorKind::GiveUp,
            MuddleError::Failure(_) => ErrorKind::Failure,
        }
    }
}

impl From<ActionableError> for MuddleError {
    fn from(error: ActionableError) -> Self {
        MuddleError::GiveUp(error)
    }
}

/// A give-up error: what went wrong, what might explain it, and what to try.
///
/// # Example
///
/// ```
/// use muddle::errors::ActionableError;
///
/// let error = ActionableError::new("No rule found for target package:fred/built")
///     .with_cause("The package may not be declared in the build description")
///     .with_remedy("List known rules: muddle rules");
///
/// assert!(error.to_string().contains("Possible causes:"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionableError {
    headline: String,
    causes: Vec<String>,
    remedies: Vec<String>,
}

impl ActionableError {
    pub fn new(headline: impl Into<String>) -> Self {
        Self {
            headline: headline.into(),
            causes: Vec::new(),
            remedies: Vec::new(),
        }
    }

    /// Something that may explain the failure.
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.causes.push(cause.into());
        self
    }

    /// Something the user can do about it.
    pub fn with_remedy(mut self, remedy: impl Into<String>) -> Self {
        self.remedies.push(remedy.into());
        self
    }

    /// The headline alone, without causes or remedies.
    pub fn message(&self) -> &str {
        &self.headline
    }

    pub fn causes(&self) -> &[String] {
        &self.causes
    }

    pub fn remedies(&self) -> &[String] {
        &self.remedies
    }

    /// Headline followed by a bulleted section per non-empty list.
    pub fn to_error_message(&self) -> String {
        let mut out = self.headline.clone();
        for (title, items) in [("Possible causes:", &self.causes), ("To fix:", &self.remedies)] {
            if items.is_empty() {
                continue;
            }
            out.push_str("\n\n");
            out.push_str(title);
            for item in items {
                out.push_str("\n  • ");
                out.push_str(item);
            }
        }
        out
    }
}

impl fmt::Display for ActionableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_error_message())
    }
}

impl std::error::Error for ActionableError {}

/// No rule builds the requested target.
pub fn no_rule_for_target(target: &Label) -> ActionableError {
    ActionableError::new(format!("No rule found for target {}", target))
        .with_cause("The checkout, package or deployment may not be declared")
        .with_cause("The label may name the wrong role, domain or tag")
        .with_remedy("List the known rules: muddle rules")
        .with_remedy(format!(
            "Search for similar targets: muddle rules --label '{}:*/*'",
            target.kind()
        ))
}

/// No rule matches a label whose dependents were requested.
pub fn no_rules_match(label: &Label) -> ActionableError {
    ActionableError::new(format!("No rules match label {}", label))
        .with_cause("The label may not be part of this build")
        .with_remedy("List the known rules: muddle rules")
}

/// The fixed-point resolution stopped making progress.
///
/// Every unresolved label is listed, sorted, so the cycle can be diagnosed.
pub fn circular_or_incomplete<'a>(
    target: &Label,
    unresolved: impl IntoIterator<Item = &'a Label>,
) -> ActionableError {
    let mut labels: Vec<&Label> = unresolved.into_iter().collect();
    labels.sort();
    labels.dedup();

    labels
        .into_iter()
        .fold(
            ActionableError::new(format!(
                "Dependency graph is circular or incomplete while building {}",
                target
            )),
            |error, label| error.with_cause(format!("{} is still unsatisfied", label)),
        )
        .with_remedy("Look for rules that depend on each other among the labels above")
        .with_remedy("Inspect their dependencies: muddle rules --label <label>")
}
