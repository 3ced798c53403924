//! Parsed tag records
//!
//! [`Tag`] is the namespace independent base record. [`PmsTag`] and
//! [`AsmTag`] wrap it and interpret the reserved options of their store;
//! [`StoreTag`] is the closed set of variants a namespace parser may emit.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Remote store a tag targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreType {
    /// Hierarchical parameter store
    Pms,
    /// Secrets store
    Asm,
}

impl StoreType {
    /// Namespace name used in field annotations
    #[inline]
    #[must_use]
    pub const fn namespace(self) -> &'static str {
        match self {
            Self::Pms => "pms",
            Self::Asm => "asm",
        }
    }

    /// Both stores in synchronization order
    #[inline]
    #[must_use]
    pub const fn all() -> [Self; 2] {
        [Self::Pms, Self::Asm]
    }
}

impl Display for StoreType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.namespace())
    }
}

/// Parameter tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Free standard tier
    Std,
    /// Advanced tier (larger values, billed)
    Adv,
    /// Let the store pick per request
    Eval,
    /// Defer to the serializer default tier
    #[default]
    Default,
}

impl Tier {
    /// Resolve `Default` against a fallback
    #[inline]
    #[must_use]
    pub fn or(self, fallback: Tier) -> Tier {
        match self {
            Self::Default => fallback,
            other => other,
        }
    }

    /// Annotation spelling
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Std => "std",
            Self::Adv => "adv",
            Self::Eval => "eval",
            Self::Default => "default",
        }
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "std" => Ok(Self::Std),
            "adv" => Ok(Self::Adv),
            "eval" => Ok(Self::Eval),
            "" | "default" => Ok(Self::Default),
            other => Err(format!("unknown tier '{other}'")),
        }
    }
}

impl Display for Tier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to an encryption key as written in a `keyid=` option
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyRef {
    /// The account default key (`keyid=default`)
    AccountDefault,
    /// A key registered by name with the serializer (`keyid=local://name`)
    Local(String),
    /// An explicit key id, alias or ARN
    Explicit(String),
}

impl KeyRef {
    /// Scheme marking serializer-registered keys
    pub const LOCAL_SCHEME: &'static str = "local://";

    /// Parse a `keyid` value; empty means no key
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            return None;
        }
        if raw == "default" {
            return Some(Self::AccountDefault);
        }
        Some(match raw.strip_prefix(Self::LOCAL_SCHEME) {
            Some(name) => Self::Local(name.to_string()),
            None => Self::Explicit(raw.to_string()),
        })
    }

    /// Key name without the local scheme
    #[must_use]
    pub fn key_name(&self) -> &str {
        match self {
            Self::AccountDefault => "default",
            Self::Local(name) | Self::Explicit(name) => name,
        }
    }
}

/// Namespace independent tag record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    name: String,
    prefix: String,
    named: BTreeMap<String, String>,
    tags: IndexMap<String, String>,
    full_name: String,
}

impl Tag {
    /// Create a tag; the full name is derived from `prefix` and `name`
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        prefix: impl Into<String>,
        named: BTreeMap<String, String>,
        tags: IndexMap<String, String>,
    ) -> Self {
        let name = name.into();
        let prefix = prefix.into();
        let full_name = format!("{prefix}/{name}");
        Self {
            name,
            prefix,
            named,
            tags,
            full_name,
        }
    }

    /// Short logical name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rendered absolute prefix
    #[inline]
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// `prefix/name`
    #[inline]
    #[must_use]
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Reserved options recognised by the namespace
    #[inline]
    #[must_use]
    pub fn named(&self) -> &BTreeMap<String, String> {
        &self.named
    }

    /// Value of a reserved option
    #[inline]
    #[must_use]
    pub fn named_value(&self, key: &str) -> Option<&str> {
        self.named.get(key).map(String::as_str)
    }

    /// Freeform metadata in declaration order
    #[inline]
    #[must_use]
    pub fn tags(&self) -> &IndexMap<String, String> {
        &self.tags
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name)
    }
}

/// Parameter store tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PmsTag {
    base: Tag,
}

impl PmsTag {
    /// Reserved option keys
    pub const RESERVED: &'static [&'static str] =
        &["keyid", "description", "pattern", "overwrite", "tier"];

    /// Wrap a base record parsed with [`Self::RESERVED`]
    #[inline]
    #[must_use]
    pub fn new(base: Tag) -> Self {
        Self { base }
    }

    /// Base record
    #[inline]
    #[must_use]
    pub fn base(&self) -> &Tag {
        &self.base
    }

    /// Encryption key, if the parameter is encrypted
    #[must_use]
    pub fn key_id(&self) -> Option<KeyRef> {
        KeyRef::parse(self.base.named_value("keyid").unwrap_or_default())
    }

    /// Encrypted parameters carry a key id
    #[must_use]
    pub fn secure(&self) -> bool {
        self.base
            .named_value("keyid")
            .is_some_and(|k| !k.is_empty())
    }

    /// Optional human readable description
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.base.named_value("description").filter(|d| !d.is_empty())
    }

    /// Optional regular expression the value must match
    #[must_use]
    pub fn pattern(&self) -> Option<&str> {
        self.base.named_value("pattern").filter(|p| !p.is_empty())
    }

    /// Whether a create may replace an existing parameter; defaults to true
    #[must_use]
    pub fn overwrite(&self) -> bool {
        self.base
            .named_value("overwrite")
            .map_or(true, |v| v.parse().unwrap_or(false))
    }

    /// Requested tier; unknown spellings fall back to `Default`
    #[must_use]
    pub fn tier(&self) -> Tier {
        self.base
            .named_value("tier")
            .and_then(|t| t.parse().ok())
            .unwrap_or_default()
    }
}

/// Secrets store tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsmTag {
    base: Tag,
}

impl AsmTag {
    /// Reserved option keys
    pub const RESERVED: &'static [&'static str] = &["keyid", "description", "vid", "vs", "strkey"];

    /// Wrap a base record parsed with [`Self::RESERVED`]
    #[inline]
    #[must_use]
    pub fn new(base: Tag) -> Self {
        Self { base }
    }

    /// Base record
    #[inline]
    #[must_use]
    pub fn base(&self) -> &Tag {
        &self.base
    }

    /// Encryption key; `None` lets the store use its own default key
    #[must_use]
    pub fn key_id(&self) -> Option<KeyRef> {
        KeyRef::parse(self.base.named_value("keyid").unwrap_or_default())
    }

    /// Secrets are always stored encrypted
    #[inline]
    #[must_use]
    pub fn secure(&self) -> bool {
        true
    }

    /// Optional human readable description
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.base.named_value("description").filter(|d| !d.is_empty())
    }

    /// Pinned version id
    #[must_use]
    pub fn version_id(&self) -> Option<&str> {
        self.base.named_value("vid").filter(|v| !v.is_empty())
    }

    /// Pinned version stage label
    #[must_use]
    pub fn version_stage(&self) -> Option<&str> {
        self.base.named_value("vs").filter(|v| !v.is_empty())
    }

    /// JSON key a provisioning tool generates a random secret into
    #[must_use]
    pub fn string_key(&self) -> Option<&str> {
        self.base.named_value("strkey").filter(|v| !v.is_empty())
    }
}

/// Tag produced by a namespace parser
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreTag {
    /// Parameter store tag
    Pms(PmsTag),
    /// Secrets store tag
    Asm(AsmTag),
    /// Tag from a caller-registered namespace; never synchronized
    Custom(Tag),
}

impl StoreTag {
    /// Shared base record
    #[must_use]
    pub fn base(&self) -> &Tag {
        match self {
            Self::Pms(t) => t.base(),
            Self::Asm(t) => t.base(),
            Self::Custom(t) => t,
        }
    }

    /// Store the tag targets, `None` for custom namespaces
    #[must_use]
    pub fn store_type(&self) -> Option<StoreType> {
        match self {
            Self::Pms(_) => Some(StoreType::Pms),
            Self::Asm(_) => Some(StoreType::Asm),
            Self::Custom(_) => None,
        }
    }

    /// Whether reads must request decryption
    #[must_use]
    pub fn secure(&self) -> bool {
        match self {
            Self::Pms(t) => t.secure(),
            Self::Asm(t) => t.secure(),
            Self::Custom(_) => false,
        }
    }

    /// `prefix/name`
    #[inline]
    #[must_use]
    pub fn full_name(&self) -> &str {
        self.base().full_name()
    }

    /// Parameter store view
    #[must_use]
    pub fn as_pms(&self) -> Option<&PmsTag> {
        match self {
            Self::Pms(t) => Some(t),
            _ => None,
        }
    }

    /// Secrets store view
    #[must_use]
    pub fn as_asm(&self) -> Option<&AsmTag> {
        match self {
            Self::Asm(t) => Some(t),
            _ => None,
        }
    }
}
