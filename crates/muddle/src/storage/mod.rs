//! Tag persistence interface.
//!
//! The engine never decides on its own whether a label has been built. The
//! build driver asks a [`TagStore`] which labels are asserted, and asserts
//! each target once its action has run. The on-disk tag database lives
//! outside this crate; [`InMemoryTagStore`] backs tests and single-run
//! command-line builds.

use crate::errors::Result;
use crate::labels::Label;

pub mod memory;

pub use memory::InMemoryTagStore;

/// Record of which labels have been asserted (built).
///
/// Implementations must be `Clone`; clones share the same underlying record
/// so a driver and its caller see the same state.
///
/// # Examples
///
/// ```
/// use muddle::labels::Label;
/// use muddle::storage::{InMemoryTagStore, TagStore};
///
/// let store = InMemoryTagStore::new();
/// let label = Label::parse("package:fred/built").unwrap();
///
/// store.assert_label(&label).unwrap();
/// assert!(store.is_asserted(&label));
///
/// store.retract_label(&label).unwrap();
/// assert!(!store.is_asserted(&label));
/// ```
pub trait TagStore: Clone {
    /// True if `label` has been asserted.
    fn is_asserted(&self, label: &Label) -> bool;

    /// Record that `label` has been built.
    ///
    /// Transient labels are remembered for the lifetime of the store only.
    ///
    /// # Errors
    ///
    /// Returns a bug error if `label` is wildcarded; only concrete labels
    /// can be asserted.
    fn assert_label(&self, label: &Label) -> Result<()>;

    /// Forget that `label` was built. Retracting an unasserted label is not
    /// an error.
    fn retract_label(&self, label: &Label) -> Result<()>;

    /// Every asserted label, sorted.
    fn asserted_labels(&self) -> Vec<Label>;
}
