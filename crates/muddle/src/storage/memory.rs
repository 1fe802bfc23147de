//! In-memory tag store.

use crate::errors::{MuddleError, Result};
use crate::labels::Label;
use crate::storage::TagStore;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;
use tracing::debug;

/// Tag store held entirely in memory.
///
/// Uses `Rc<RefCell<>>` so clones share the same record. Transient labels
/// are kept apart from the others and left out of [`persisted_labels`].
///
/// [`persisted_labels`]: InMemoryTagStore::persisted_labels
#[derive(Debug, Clone, Default)]
pub struct InMemoryTagStore {
    persistent: Rc<RefCell<BTreeSet<Label>>>,
    transient: Rc<RefCell<BTreeSet<Label>>>,
}

impl InMemoryTagStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Asserted labels that would survive the session, sorted.
    pub fn persisted_labels(&self) -> Vec<Label> {
        self.persistent.borrow().iter().cloned().collect()
    }
}

impl TagStore for InMemoryTagStore {
    fn is_asserted(&self, label: &Label) -> bool {
        self.persistent.borrow().contains(label) || self.transient.borrow().contains(label)
    }

    fn assert_label(&self, label: &Label) -> Result<()> {
        if !label.is_definite() {
            return Err(MuddleError::bug(format!(
                "Attempt to assert wildcarded label {}",
                label
            )));
        }
        debug!(%label, "asserted");
        if label.is_transient() {
            self.transient.borrow_mut().insert(label.clone());
        } else {
            self.persistent.borrow_mut().insert(label.clone());
        }
        Ok(())
    }

    fn retract_label(&self, label: &Label) -> Result<()> {
        let removed =
            self.persistent.borrow_mut().remove(label) | self.transient.borrow_mut().remove(label);
        if removed {
            debug!(%label, "retracted");
        }
        Ok(())
    }

    fn asserted_labels(&self) -> Vec<Label> {
        let persistent = self.persistent.borrow();
        let transient = self.transient.borrow();
        persistent.union(&transient).cloned().collect()
    }
}
