//! Build description loading.
//!
//! A build is described in a TOML file (`build.toml` by default):
//!
//! ```toml
//! [build]
//! name = "example"
//!
//! [[checkout]]
//! name = "co1"
//!
//! [[package]]
//! name = "fred"
//! role = "x86"
//! checkouts = ["co1"]
//!
//! [[deployment]]
//! name = "image"
//! roles = ["x86"]
//!
//! [[rule]]
//! target = "synth:release/built"
//! depends = ["deployment:image/deployed"]
//! action = "tag the release"
//!
//! [[subdomain]]
//! name = "sub"
//! description = "sub/build.toml"
//!
//! [[unify]]
//! source = "checkout:(sub)co1/*"
//! target = "checkout:co1/*"
//! policy = "complain"
//! ```
//!
//! Sub-domain descriptions are resolved relative to the file that includes
//! them and are loaded recursively. Every step gets an [`EchoAction`]; real
//! VCS and make actions are supplied by embedding programs.

use crate::actions::EchoAction;
use crate::chains;
use crate::domains::include_domain;
use crate::labels::{Label, LabelKind, WILDCARD};
use crate::rules::{Action, DuplicateAction, Rule};
use crate::ruleset::RuleSet;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Root of a build description file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildDescription {
    /// Build metadata (optional).
    pub build: Option<BuildSection>,
    #[serde(default)]
    pub checkout: Vec<CheckoutConfig>,
    #[serde(default)]
    pub package: Vec<PackageConfig>,
    #[serde(default)]
    pub deployment: Vec<DeploymentConfig>,
    /// Free-form rules.
    #[serde(default)]
    pub rule: Vec<RuleConfig>,
    /// Sub-builds to include under a domain.
    #[serde(default)]
    pub subdomain: Vec<SubdomainConfig>,
    /// Unifications applied after everything else is loaded.
    #[serde(default)]
    pub unify: Vec<UnifyConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuildSection {
    pub name: Option<String>,
}

/// A checkout, given the standard checkout rules.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutConfig {
    pub name: String,
}

/// A package, given the standard package rules.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageConfig {
    pub name: String,
    pub role: Option<String>,
    /// Checkouts that must be up to date before the package is configured.
    #[serde(default)]
    pub checkouts: Vec<String>,
    /// Packages in the same role that must be postinstalled first.
    #[serde(default)]
    pub depends: Vec<String>,
}

/// A deployment, built from every package in its roles.
#[derive(Debug, Clone, Deserialize)]
pub struct DeploymentConfig {
    pub name: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// A rule written out in full.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleConfig {
    pub target: Label,
    #[serde(default)]
    pub depends: Vec<Label>,
    /// Description of the action; a barrier rule if absent.
    pub action: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubdomainConfig {
    /// Domain name the sub-build is included under.
    pub name: String,
    /// Path to the sub-build's description, relative to this file.
    pub description: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnifyConfig {
    pub source: Label,
    pub target: Label,
    /// What to do when both sides carry an action (default: complain).
    #[serde(default)]
    pub policy: DuplicateAction,
}

fn echo(description: &str, owner: Label) -> Option<Arc<dyn Action>> {
    Some(Arc::new(EchoAction::new(description, owner)))
}

impl BuildDescription {
    /// Parse a description from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse build description")
    }

    /// Read and parse a description file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read build description {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("In {}", path.display()))
    }

    /// The build's name, if it has one.
    pub fn name(&self) -> Option<&str> {
        self.build.as_ref().and_then(|b| b.name.as_deref())
    }

    /// Build the rule set this description declares.
    ///
    /// `base_dir` is where sub-domain paths are resolved from.
    pub fn to_ruleset(&self, base_dir: &Path) -> Result<RuleSet> {
        self.to_ruleset_within(base_dir, &mut Vec::new())
    }

    fn to_ruleset_within(&self, base_dir: &Path, including: &mut Vec<PathBuf>) -> Result<RuleSet> {
        let mut ruleset = RuleSet::new();

        for checkout in &self.checkout {
            let owner = Label::new(LabelKind::Checkout, &checkout.name, None, WILDCARD)?;
            chains::add_checkout_rules(&mut ruleset, &checkout.name, echo("checkout", owner))
                .with_context(|| format!("Invalid checkout '{}'", checkout.name))?;
        }

        for package in &self.package {
            let role = package.role.as_deref();
            let owner = Label::new(LabelKind::Package, &package.name, role, WILDCARD)
                .with_context(|| format!("Invalid package '{}'", package.name))?;
            let action = echo("make", owner);
            chains::add_package_rules(&mut ruleset, &package.name, role, action.clone())?;
            for checkout in &package.checkouts {
                chains::package_depends_on_checkout(
                    &mut ruleset,
                    &package.name,
                    role,
                    checkout,
                    action.clone(),
                )?;
            }
            for other in &package.depends {
                chains::package_depends_on_package(&mut ruleset, &package.name, role, other, role)?;
            }
        }

        for deployment in &self.deployment {
            let owner = Label::new(LabelKind::Deployment, &deployment.name, None, WILDCARD)
                .with_context(|| format!("Invalid deployment '{}'", deployment.name))?;
            chains::add_deployment_rules(&mut ruleset, &deployment.name, echo("deploy", owner))?;
            let roles: Vec<&str> = deployment.roles.iter().map(String::as_str).collect();
            chains::deployment_depends_on_roles(&mut ruleset, &deployment.name, &roles)?;
        }

        for rule in &self.rule {
            let action = rule
                .action
                .as_deref()
                .and_then(|description| echo(description, rule.target.clone()));
            let mut new_rule = Rule::new(rule.target.clone(), action);
            for dep in &rule.depends {
                new_rule.add(dep.clone());
            }
            ruleset.add(new_rule);
        }

        for sub in &self.subdomain {
            let path = base_dir.join(&sub.description);
            let sub_rules = load_ruleset_within(&path, including)
                .with_context(|| format!("Failed to load sub-domain '{}'", sub.name))?;
            include_domain(&mut ruleset, sub_rules, &sub.name)?;
        }

        for unify in &self.unify {
            ruleset
                .unify(&unify.source, &unify.target, unify.policy)
                .with_context(|| {
                    format!("Failed to unify {} with {}", unify.source, unify.target)
                })?;
        }

        debug!(
            rules = ruleset.len(),
            name = self.name().unwrap_or("<unnamed>"),
            "loaded build description"
        );
        Ok(ruleset)
    }
}

/// Load the description at `path` and build its rule set.
pub fn load_ruleset(path: &Path) -> Result<RuleSet> {
    load_ruleset_within(path, &mut Vec::new())
}

fn load_ruleset_within(path: &Path, including: &mut Vec<PathBuf>) -> Result<RuleSet> {
    let canonical = path
        .canonicalize()
        .with_context(|| format!("Build description not found: {}", path.display()))?;
    if including.contains(&canonical) {
        bail!("Build description {} includes itself", path.display());
    }

    let description = BuildDescription::load(&canonical)?;
    let base_dir = canonical.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();

    including.push(canonical);
    let ruleset = description.to_ruleset_within(&base_dir, including);
    including.pop();
    ruleset
}
