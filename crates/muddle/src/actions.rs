//! Actions created from a build description.

use crate::errors::Result;
use crate::labels::Label;
use crate::rules::{Action, Environment};
use std::sync::Mutex;
use tracing::info;

/// Logs the label it builds.
///
/// Concrete actions (VCS checkouts, make invocations) live outside this
/// crate; a description loaded from TOML gets one of these per step. The
/// owner label is the checkout, package or rule that declared the action,
/// and takes part in domain sweeps like any other label.
#[derive(Debug)]
pub struct EchoAction {
    description: String,
    owner: Mutex<Label>,
}

impl EchoAction {
    pub fn new(description: impl Into<String>, owner: Label) -> Self {
        Self {
            description: description.into(),
            owner: Mutex::new(owner),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn owner(&self) -> Label {
        self.owner.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Action for EchoAction {
    fn build_label(&self, _env: &mut Environment, label: &Label) -> Result<()> {
        info!(%label, owner = %self.owner(), action = %self.description, "building");
        Ok(())
    }

    fn rewrite_inner_labels(&self, rewrite: &mut dyn FnMut(&mut Label)) {
        let mut owner = self.owner.lock().unwrap_or_else(|e| e.into_inner());
        rewrite(&mut owner);
    }
}
