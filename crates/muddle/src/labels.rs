//! Label parsing, matching and ordering.
//!
//! A label names one lifecycle stage of a checkout, package or deployment:
//!
//! ```text
//! type:(domain)name{role}/tag[flags]
//! ```
//!
//! - `type`, `name`, `role` and `tag` are drawn from `[A-Za-z0-9._+-]+`, or are
//!   the wildcard `*`.
//! - `domain` is optional and may nest, `outer(inner)`. It names the
//!   (sub-)build a label belongs to.
//! - `role` is optional. An absent role means "not applicable", which is not
//!   the same as the wildcard role.
//! - `flags` is a string of single letters: `T` marks the label transient,
//!   `S` marks it as a system label. Other letters are kept for display only.
//!
//! Equality and ordering use `(kind, domain, name, role, tag)`. Hashing
//! leaves the domain out, so a label hashes the same before and after its
//! domain is rewritten. The flags never take part in identity.

pub mod tags;

use crate::errors::{MuddleError, Result};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::OnceLock;

/// The wildcard label component.
pub const WILDCARD: &str = "*";

/// Regex for the full label grammar.
///
/// The domain capture is loose (any run of part characters and parentheses);
/// its nesting is checked separately by [`is_valid_domain`].
static LABEL_REGEX: OnceLock<Regex> = OnceLock::new();

fn label_regex() -> &'static Regex {
    LABEL_REGEX.get_or_init(|| {
        Regex::new(concat!(
            r"^(?P<type>[A-Za-z0-9._+-]+|\*):",
            r"(?:\((?P<domain>[A-Za-z0-9._+()*-]+)\))?",
            r"(?P<name>[A-Za-z0-9._+-]+|\*)",
            r"(?:\{(?P<role>[A-Za-z0-9._+-]+|\*)?\})?",
            r"/(?P<tag>[A-Za-z0-9._+-]+|\*)",
            r"(?:\[(?P<flags>[A-Za-z0-9]*)\])?$",
        ))
        .expect("Label regex should compile")
    })
}

fn is_part_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '+' | '-')
}

/// True if `value` is a non-wildcard label part.
fn is_valid_part(value: &str) -> bool {
    !value.is_empty() && value.chars().all(is_part_char)
}

/// `part` or `part(nested)`, with no wildcards and no empty components.
fn is_nested_domain(domain: &str) -> bool {
    match domain.find('(') {
        None => is_valid_part(domain),
        Some(open) => {
            let (head, rest) = domain.split_at(open);
            is_valid_part(head)
                && rest.len() > 2
                && rest.ends_with(')')
                && is_nested_domain(&rest[1..rest.len() - 1])
        }
    }
}

/// Check a domain string: either the wildcard or a (possibly nested) domain.
///
/// # Examples
///
/// ```
/// use muddle::labels::is_valid_domain;
///
/// assert!(is_valid_domain("outer"));
/// assert!(is_valid_domain("outer(inner(deepest))"));
/// assert!(is_valid_domain("*"));
///
/// assert!(!is_valid_domain("()"));
/// assert!(!is_valid_domain("((outer))"));
/// assert!(!is_valid_domain("outer()"));
/// assert!(!is_valid_domain("outer(inner)trailer"));
/// ```
pub fn is_valid_domain(domain: &str) -> bool {
    domain == WILDCARD || is_nested_domain(domain)
}

fn check_part(what: &str, value: &str) -> Result<()> {
    if value == WILDCARD || is_valid_part(value) {
        Ok(())
    } else {
        Err(MuddleError::LabelSyntax {
            input: value.to_string(),
            reason: format!("label {} '{}' is not allowed", what, value),
        })
    }
}

fn check_domain(value: &str) -> Result<()> {
    if is_valid_domain(value) {
        Ok(())
    } else {
        Err(MuddleError::LabelSyntax {
            input: value.to_string(),
            reason: format!("label domain '{}' is not allowed", value),
        })
    }
}

/// What sort of entity a label refers to.
///
/// Variants are declared in the lexicographic order of their string forms so
/// the derived ordering agrees with sorting labels as strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LabelKind {
    /// `*`
    Wildcard,
    /// `checkout`: a source tree pulled from version control
    Checkout,
    /// `deployment`: an assembly of build products
    Deployment,
    /// `package`: a build step over checkouts
    Package,
    /// `synth`: labels invented to steer the dependency mechanism
    Synthetic,
}

impl LabelKind {
    /// The string used for this kind in label strings.
    pub fn as_str(self) -> &'static str {
        match self {
            LabelKind::Wildcard => WILDCARD,
            LabelKind::Checkout => "checkout",
            LabelKind::Deployment => "deployment",
            LabelKind::Package => "package",
            LabelKind::Synthetic => "synth",
        }
    }
}

impl fmt::Display for LabelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LabelKind {
    type Err = MuddleError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            WILDCARD => Ok(LabelKind::Wildcard),
            "checkout" => Ok(LabelKind::Checkout),
            "deployment" => Ok(LabelKind::Deployment),
            "package" => Ok(LabelKind::Package),
            "synth" => Ok(LabelKind::Synthetic),
            other => Err(MuddleError::LabelSyntax {
                input: other.to_string(),
                reason: format!(
                    "unknown label type '{}' (expected checkout, package, deployment, synth or *)",
                    other
                ),
            }),
        }
    }
}

/// A structured identifier for an entity at a given lifecycle stage.
///
/// Labels are values: deriving a new label copies. The only in-place
/// changes are to the annotations (`transient`, `system`) and the one-shot
/// unswept marker used when a sub-build is renamed into a domain.
#[derive(Debug, Clone)]
pub struct Label {
    kind: LabelKind,
    domain: Option<String>,
    name: String,
    role: Option<String>,
    tag: String,
    transient: bool,
    system: bool,
    unswept: bool,
    /// Unrecognised flag letters, in the order they were parsed
    other_flags: String,
}

impl Label {
    /// Construct a label with no domain.
    ///
    /// # Errors
    ///
    /// Returns [`MuddleError::LabelSyntax`] if any part contains characters
    /// outside `[A-Za-z0-9._+-]` and is not the wildcard.
    pub fn new(kind: LabelKind, name: &str, role: Option<&str>, tag: &str) -> Result<Self> {
        check_part("name", name)?;
        if let Some(role) = role {
            check_part("role", role)?;
        }
        check_part("tag", tag)?;

        Ok(Self {
            kind,
            domain: None,
            name: name.to_string(),
            role: role.map(str::to_string),
            tag: tag.to_string(),
            transient: false,
            system: false,
            unswept: false,
            other_flags: String::new(),
        })
    }

    /// Parse a label string.
    ///
    /// The whole string must match the grammar; leading or trailing garbage
    /// is an error.
    ///
    /// # Examples
    ///
    /// ```
    /// use muddle::labels::{Label, LabelKind};
    ///
    /// let label = Label::parse("package:(sub)busybox{rootfs}/installed[T]").unwrap();
    /// assert_eq!(label.kind(), LabelKind::Package);
    /// assert_eq!(label.domain(), Some("sub"));
    /// assert_eq!(label.name(), "busybox");
    /// assert_eq!(label.role(), Some("rootfs"));
    /// assert_eq!(label.tag(), "installed");
    /// assert!(label.is_transient());
    ///
    /// assert!(Label::parse("package:busybox").is_err()); // No tag
    /// assert!(Label::parse("package:busybox/built ").is_err()); // Trailing garbage
    /// ```
    pub fn parse(label_string: &str) -> Result<Self> {
        let syntax_error = |reason: &str| MuddleError::LabelSyntax {
            input: label_string.to_string(),
            reason: reason.to_string(),
        };

        let caps = label_regex()
            .captures(label_string)
            .ok_or_else(|| syntax_error("expected 'type:(domain)name{role}/tag[flags]'"))?;

        let kind: LabelKind = caps["type"].parse()?;
        let domain = caps.name("domain").map(|m| m.as_str());
        if let Some(domain) = domain {
            if !is_valid_domain(domain) {
                return Err(syntax_error("domain must be 'name' or 'name(nested)'"));
            }
        }

        let mut label = Self::new(
            kind,
            &caps["name"],
            caps.name("role").map(|m| m.as_str()),
            &caps["tag"],
        )?;
        label.domain = domain.map(str::to_string);

        if let Some(flags) = caps.name("flags") {
            for flag in flags.as_str().chars() {
                match flag {
                    'T' => label.transient = true,
                    'S' => label.system = true,
                    other => label.other_flags.push(other),
                }
            }
        }

        Ok(label)
    }

    /// The kind of entity this label refers to.
    pub fn kind(&self) -> LabelKind {
        self.kind
    }

    /// The (possibly nested) domain, if any.
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Tag changes for transient labels are not persisted.
    pub fn is_transient(&self) -> bool {
        self.transient
    }

    /// System labels are synthesised by the engine and hidden by default.
    pub fn is_system(&self) -> bool {
        self.system
    }

    pub fn set_transient(&mut self, transient: bool) {
        self.transient = transient;
    }

    pub fn set_system(&mut self, system: bool) {
        self.system = system;
    }

    /// Copy with the transient annotation set.
    pub fn with_transient(mut self, transient: bool) -> Self {
        self.transient = transient;
        self
    }

    /// Copy with the system annotation set.
    pub fn with_system(mut self, system: bool) -> Self {
        self.system = system;
        self
    }

    /// Copy with a different tag.
    pub fn with_tag(&self, tag: &str) -> Result<Self> {
        check_part("tag", tag)?;
        let mut label = self.clone();
        label.tag = tag.to_string();
        Ok(label)
    }

    /// Copy with a different name.
    pub fn with_name(&self, name: &str) -> Result<Self> {
        check_part("name", name)?;
        let mut label = self.clone();
        label.name = name.to_string();
        Ok(label)
    }

    /// Copy with a different role (or none).
    pub fn with_role(&self, role: Option<&str>) -> Result<Self> {
        if let Some(role) = role {
            check_part("role", role)?;
        }
        let mut label = self.clone();
        label.role = role.map(str::to_string);
        Ok(label)
    }

    /// Copy with a different domain (or none).
    pub fn with_domain(&self, domain: Option<&str>) -> Result<Self> {
        if let Some(domain) = domain {
            check_domain(domain)?;
        }
        let mut label = self.clone();
        label.domain = domain.map(str::to_string);
        Ok(label)
    }

    /// Copy with a different kind.
    pub fn with_kind(&self, kind: LabelKind) -> Self {
        let mut label = self.clone();
        label.kind = kind;
        label
    }

    /// Identity fields in comparison order: kind, domain, name, role, tag.
    fn fields(&self) -> [Option<&str>; 5] {
        [
            Some(self.kind.as_str()),
            self.domain.as_deref(),
            Some(self.name.as_str()),
            self.role.as_deref(),
            Some(self.tag.as_str()),
        ]
    }

    /// True if no component is the wildcard.
    pub fn is_definite(&self) -> bool {
        self.fields().iter().all(|field| *field != Some(WILDCARD))
    }

    /// True if every field of `self` equals the corresponding field of
    /// `other`, or `other`'s field is the wildcard.
    ///
    /// Wildcards in `self` only match an identical wildcard in `other`.
    pub fn unifies(&self, other: &Label) -> bool {
        self.fields()
            .iter()
            .zip(other.fields().iter())
            .all(|(mine, theirs)| *theirs == Some(WILDCARD) || mine == theirs)
    }

    /// Match specificity: minus the number of fields that only matched
    /// because one side was a wildcard, or `None` if some field differs
    /// with neither side wildcarded.
    ///
    /// # Examples
    ///
    /// ```
    /// use muddle::labels::Label;
    ///
    /// let concrete = Label::parse("package:fred{bob}/built").unwrap();
    /// let pattern = Label::parse("package:*{bob}/*").unwrap();
    /// let other = Label::parse("package:jim{bob}/built").unwrap();
    ///
    /// assert_eq!(concrete.match_specificity(&concrete), Some(0));
    /// assert_eq!(concrete.match_specificity(&pattern), Some(-2));
    /// assert_eq!(concrete.match_specificity(&other), None);
    /// ```
    pub fn match_specificity(&self, other: &Label) -> Option<i32> {
        let mut wildcards = 0;
        for (mine, theirs) in self.fields().iter().zip(other.fields().iter()) {
            if mine == theirs {
                continue;
            }
            if *mine == Some(WILDCARD) || *theirs == Some(WILDCARD) {
                wildcards += 1;
            } else {
                return None;
            }
        }
        Some(-wildcards)
    }

    /// Boolean form of [`Label::match_specificity`].
    ///
    /// Fields are checked in the order name, tag, kind, role, domain:
    /// dependencies most often differ by name and tag, and least often by
    /// domain, so mismatches are found early.
    pub fn just_match(&self, other: &Label) -> bool {
        fn part_matches(mine: Option<&str>, theirs: Option<&str>) -> bool {
            mine == theirs || mine == Some(WILDCARD) || theirs == Some(WILDCARD)
        }

        part_matches(Some(&self.name), Some(&other.name))
            && part_matches(Some(&self.tag), Some(&other.tag))
            && part_matches(Some(self.kind.as_str()), Some(other.kind.as_str()))
            && part_matches(self.role.as_deref(), other.role.as_deref())
            && part_matches(self.domain.as_deref(), other.domain.as_deref())
    }

    /// Equality on kind, domain, name and role, ignoring the tag.
    pub fn match_without_tag(&self, other: &Label) -> bool {
        self.kind == other.kind
            && self.domain == other.domain
            && self.name == other.name
            && self.role == other.role
    }

    /// Copy of `self` with every field that is not wildcarded in `target`
    /// overwritten by `target`'s value. An absent role or domain counts as a
    /// concrete value.
    ///
    /// # Examples
    ///
    /// ```
    /// use muddle::labels::Label;
    ///
    /// let label = Label::parse("checkout:(sub)co1/checked_out").unwrap();
    /// let target = Label::parse("checkout:co1/*").unwrap();
    /// assert_eq!(label.copy_and_unify_with(&target).to_string(), "checkout:co1/checked_out");
    /// ```
    pub fn copy_and_unify_with(&self, target: &Label) -> Label {
        let mut label = self.clone();
        if target.kind != LabelKind::Wildcard {
            label.kind = target.kind;
        }
        if target.domain.as_deref() != Some(WILDCARD) {
            label.domain = target.domain.clone();
        }
        if target.name != WILDCARD {
            label.name = target.name.clone();
        }
        if target.role.as_deref() != Some(WILDCARD) {
            label.role = target.role.clone();
        }
        if target.tag != WILDCARD {
            label.tag = target.tag.clone();
        }
        label
    }

    /// Fill the wildcarded fields of `self` from `concrete`, keeping
    /// `self`'s annotations. A definite label is returned unchanged.
    ///
    /// This is how a wildcard dependency is turned into the concrete label it
    /// stands for once the target being built is known.
    pub fn instantiate_from(&self, concrete: &Label) -> Label {
        if self.is_definite() {
            return self.clone();
        }
        let mut label = concrete.copy_and_unify_with(self);
        label.transient = self.transient;
        label.system = self.system;
        label.unswept = self.unswept;
        label.other_flags = self.other_flags.clone();
        label
    }

    /// Mark this label for the next domain sweep.
    pub fn mark_unswept(&mut self) {
        self.unswept = true;
    }

    /// True if this label is waiting for a domain sweep.
    pub fn is_unswept(&self) -> bool {
        self.unswept
    }

    /// Move this label into `domain`, once.
    ///
    /// Only acts if the label is still marked unswept; the marker is cleared
    /// so a second sweep is a no-op. An existing domain is nested:
    /// `inner` becomes `domain(inner)`. A wildcard domain already matches any
    /// domain and is left alone.
    ///
    /// Returns true if the label was changed.
    pub fn sweep(&mut self, domain: &str) -> bool {
        if !self.unswept {
            return false;
        }
        self.unswept = false;
        self.domain = match self.domain.take() {
            Some(inner) if inner == WILDCARD => Some(inner),
            Some(inner) => Some(format!("{}({})", domain, inner)),
            None => Some(domain.to_string()),
        };
        true
    }

    /// Flags suffix, canonical order `T`, `S`, then unrecognised letters.
    fn flags(&self) -> String {
        let mut flags = String::new();
        if self.transient {
            flags.push('T');
        }
        if self.system {
            flags.push('S');
        }
        flags.push_str(&self.other_flags);
        flags
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.kind)?;
        if let Some(domain) = &self.domain {
            write!(f, "({})", domain)?;
        }
        f.write_str(&self.name)?;
        if let Some(role) = &self.role {
            write!(f, "{{{}}}", role)?;
        }
        write!(f, "/{}", self.tag)?;
        let flags = self.flags();
        if !flags.is_empty() {
            write!(f, "[{}]", flags)?;
        }
        Ok(())
    }
}

impl FromStr for Label {
    type Err = MuddleError;

    fn from_str(s: &str) -> Result<Self> {
        Label::parse(s)
    }
}

impl PartialEq for Label {
    fn eq(&self, other: &Self) -> bool {
        self.fields() == other.fields()
    }
}

impl Eq for Label {}

impl PartialOrd for Label {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Label {
    fn cmp(&self, other: &Self) -> Ordering {
        self.kind
            .cmp(&other.kind)
            .then_with(|| self.domain.cmp(&other.domain))
            .then_with(|| self.name.cmp(&other.name))
            .then_with(|| self.role.cmp(&other.role))
            .then_with(|| self.tag.cmp(&other.tag))
    }
}

impl Hash for Label {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // The domain is left out so a label hashes the same before and after
        // it is swept into a domain.
        self.kind.hash(state);
        self.name.hash(state);
        self.role.hash(state);
        self.tag.hash(state);
    }
}

impl Serialize for Label {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Label {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Label::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Render labels space-separated, in the order given.
pub fn label_list_to_string<'a>(labels: impl IntoIterator<Item = &'a Label>) -> String {
    labels
        .into_iter()
        .map(Label::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod label_proptests;
