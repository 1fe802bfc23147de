//! Conventional tag values.
//!
//! The engine does not enforce this vocabulary; it is what the standard rule
//! helpers in [`crate::chains`] build their chains from.

// Checkouts. Not a strict chain: some of these are independent facts.
pub const CHECKED_OUT: &str = "checked_out";
pub const PULLED: &str = "pulled";
pub const UP_TO_DATE: &str = "up_to_date";
pub const CHANGES_COMMITTED: &str = "changes_committed";
pub const CHANGES_PUSHED: &str = "changes_pushed";

// Packages
pub const PRECONFIG: &str = "preconfig";
pub const CONFIGURED: &str = "configured";
pub const BUILT: &str = "built";
pub const INSTALLED: &str = "installed";
pub const POSTINSTALLED: &str = "postinstalled";
pub const CLEAN: &str = "clean";
pub const DISTCLEAN: &str = "distclean";

// Deployments. Independent of each other; instructions are always transient.
pub const DEPLOYED: &str = "deployed";
pub const INSTRUCTIONS_APPLIED: &str = "instructionsapplied";

/// The package lifecycle after `preconfig`, in build order.
pub const PACKAGE_STAGES: [&str; 4] = [CONFIGURED, BUILT, INSTALLED, POSTINSTALLED];

/// The checkout chain after `checked_out`.
pub const CHECKOUT_STAGES: [&str; 3] = [UP_TO_DATE, CHANGES_COMMITTED, CHANGES_PUSHED];
