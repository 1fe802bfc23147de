//! Command-line interface definitions using clap.

use crate::ruleset::MatchMode;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Multi-repository build orchestrator
///
/// Reads a build description, resolves labels against its rules and walks
/// the resulting plan. Labels look like `package:(domain)name{role}/tag`;
/// any part may be `*`.
///
/// Exit Codes:
///   0  - Command succeeded
///   1  - Generic error occurred
///   2  - Invalid label or argument
///   3  - No rule found for a target
///   4  - Dependency graph circular or incomplete
///  70  - Internal error (a bug in muddle or the build description)
#[derive(Parser)]
#[command(name = "muddle")]
#[command(about = "Label-and-rule build orchestrator", long_about = None)]
pub struct Cli {
    /// Suppress non-essential output (for scripting)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Build description to load
    #[arg(
        short = 'f',
        long,
        global = true,
        env = "MUDDLE_DESCRIPTION",
        default_value = "build.toml"
    )]
    pub description: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the ordered list of rules needed to build a label
    Plan {
        /// Target label
        label: String,

        /// How the label is matched against rule targets
        #[arg(long = "match", value_enum, default_value_t = MatchArg::Wildcard)]
        match_mode: MatchArg,
    },

    /// Show every label that depends on a label
    RequiredBy {
        /// Label to look up
        label: String,

        /// How the label is matched against rule targets
        #[arg(long = "match", value_enum, default_value_t = MatchArg::Wildcard)]
        match_mode: MatchArg,
    },

    /// List the rules in the build description
    Rules {
        /// Only show rules whose target matches this label
        #[arg(long)]
        label: Option<String>,

        /// Include system rules and dependencies
        #[arg(long)]
        show_system: bool,

        /// Skip rules with no dependencies
        #[arg(long)]
        ignore_empty: bool,
    },

    /// Build a label and everything it needs
    Build {
        /// Target label
        label: String,

        /// How the label is matched against rule targets
        #[arg(long = "match", value_enum, default_value_t = MatchArg::Wildcard)]
        match_mode: MatchArg,

        /// Show what would be built without running any action
        #[arg(short = 'n', long)]
        just_print: bool,
    },
}

/// Command-line spelling of [`MatchMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MatchArg {
    /// Exact label equality
    Exact,
    /// Wildcards match anything
    Wildcard,
    /// Ignore the tag
    WithoutTag,
}

impl From<MatchArg> for MatchMode {
    fn from(arg: MatchArg) -> Self {
        match arg {
            MatchArg::Exact => MatchMode::Exact,
            MatchArg::Wildcard => MatchMode::Wildcard,
            MatchArg::WithoutTag => MatchMode::WithoutTag,
        }
    }
}
