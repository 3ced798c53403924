//! Tag grammar
//!
//! An annotation literal is a comma separated token list:
//!
//! ```text
//! "test, prefix=simple, keyid=default, owner=team-a"
//! ```
//!
//! A token without `=` is the bare name. `name=` is an alternative spelling
//! and the two are mutually exclusive. `prefix=` overrides the contextual
//! prefix. Keys reserved by the namespace go to [`Tag::named`], every other
//! key becomes freeform metadata in [`Tag::tags`].

use crate::error::TagError;
use crate::prefix::render_prefix;
use crate::tag::{AsmTag, PmsTag, StoreTag, StoreType, Tag};
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Parse an annotation literal into a base [`Tag`]
///
/// `prefix` is the contextual prefix of the field before rendering; it is
/// replaced by an explicit `prefix=` option. Keys are trimmed and lower
/// cased, values are trimmed and split on the first `=` only.
///
/// # Errors
/// Returns [`TagError`] for an empty literal, a duplicate name, a blank key
/// or a literal without a name.
pub fn parse_tag(
    raw: &str,
    prefix: &str,
    environment: &str,
    service: &str,
    reserved: &[&str],
) -> Result<Tag, TagError> {
    if raw.trim().is_empty() {
        return Err(TagError::Empty);
    }

    let mut name: Option<String> = None;
    let mut explicit_prefix: Option<String> = None;
    let mut named = BTreeMap::new();
    let mut tags = IndexMap::new();

    for token in raw.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }

        let Some((key, value)) = token.split_once('=') else {
            set_name(&mut name, token)?;
            continue;
        };

        let key = key.trim().to_lowercase();
        let value = value.trim();
        if key.is_empty() {
            return Err(TagError::EmptyKey(token.to_string()));
        }

        match key.as_str() {
            "name" => set_name(&mut name, value)?,
            "prefix" => explicit_prefix = Some(value.to_string()),
            k if reserved.contains(&k) => {
                named.insert(key, value.to_string());
            }
            _ => {
                tags.insert(key, value.to_string());
            }
        }
    }

    let name = name
        .filter(|n| !n.is_empty())
        .ok_or_else(|| TagError::MissingName(raw.to_string()))?;
    let rendered = render_prefix(
        explicit_prefix.as_deref().unwrap_or(prefix),
        environment,
        service,
    );

    tracing::trace!(tag = raw, name = %name, prefix = %rendered, "parsed tag");
    Ok(Tag::new(name, rendered, named, tags))
}

fn set_name(slot: &mut Option<String>, candidate: &str) -> Result<(), TagError> {
    match slot {
        Some(existing) => Err(TagError::duplicate(existing.as_str(), candidate)),
        None => {
            *slot = Some(candidate.to_string());
            Ok(())
        }
    }
}

/// Namespace specific tag parser
///
/// Implement this trait to attach a new annotation namespace to the walker.
pub trait TagParser: Send + Sync + 'static {
    /// Parse one annotation literal for a field
    ///
    /// # Errors
    /// Returns [`TagError`] when the literal is malformed.
    fn parse_tag_string(
        &self,
        raw: &str,
        prefix: &str,
        environment: &str,
        service: &str,
    ) -> Result<StoreTag, TagError>;
}

impl TagParser for Arc<dyn TagParser> {
    fn parse_tag_string(
        &self,
        raw: &str,
        prefix: &str,
        environment: &str,
        service: &str,
    ) -> Result<StoreTag, TagError> {
        (**self).parse_tag_string(raw, prefix, environment, service)
    }
}

/// Parser for the `pms` namespace
#[derive(Debug, Clone, Copy, Default)]
pub struct PmsTagParser;

impl TagParser for PmsTagParser {
    fn parse_tag_string(
        &self,
        raw: &str,
        prefix: &str,
        environment: &str,
        service: &str,
    ) -> Result<StoreTag, TagError> {
        parse_tag(raw, prefix, environment, service, PmsTag::RESERVED)
            .map(|base| StoreTag::Pms(PmsTag::new(base)))
    }
}

/// Parser for the `asm` namespace
#[derive(Debug, Clone, Copy, Default)]
pub struct AsmTagParser;

impl TagParser for AsmTagParser {
    fn parse_tag_string(
        &self,
        raw: &str,
        prefix: &str,
        environment: &str,
        service: &str,
    ) -> Result<StoreTag, TagError> {
        parse_tag(raw, prefix, environment, service, AsmTag::RESERVED)
            .map(|base| StoreTag::Asm(AsmTag::new(base)))
    }
}

/// Parser for caller defined namespaces with its own reserved keys
#[derive(Debug, Clone, Default)]
pub struct GenericTagParser {
    reserved: Vec<String>,
}

impl GenericTagParser {
    /// Create a parser that routes `reserved` keys to the named options
    #[must_use]
    pub fn new<I, S>(reserved: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            reserved: reserved
                .into_iter()
                .map(|k| k.into().to_lowercase())
                .collect(),
        }
    }

    /// Reserved keys
    #[inline]
    #[must_use]
    pub fn reserved(&self) -> &[String] {
        &self.reserved
    }
}

impl TagParser for GenericTagParser {
    fn parse_tag_string(
        &self,
        raw: &str,
        prefix: &str,
        environment: &str,
        service: &str,
    ) -> Result<StoreTag, TagError> {
        let reserved: Vec<&str> = self.reserved.iter().map(String::as_str).collect();
        parse_tag(raw, prefix, environment, service, &reserved).map(StoreTag::Custom)
    }
}

/// Namespace to parser registration, in registration order
#[derive(Default)]
pub struct TagParserRegistry {
    parsers: Vec<(String, Box<dyn TagParser>)>,
}

impl fmt::Debug for TagParserRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagParserRegistry")
            .field("namespaces", &self.namespaces().collect::<Vec<_>>())
            .finish()
    }
}

impl TagParserRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            parsers: Vec::new(),
        }
    }

    /// Registry with the built-in parsers for the given stores
    #[must_use]
    pub fn for_stores(stores: &[StoreType]) -> Self {
        let mut registry = Self::new();
        for store in stores {
            match store {
                StoreType::Pms => registry.register(store.namespace(), PmsTagParser),
                StoreType::Asm => registry.register(store.namespace(), AsmTagParser),
            }
        }
        registry
    }

    /// Register a parser, replacing any parser already bound to `namespace`
    pub fn register<P: TagParser>(&mut self, namespace: impl Into<String>, parser: P) {
        self.register_boxed(namespace, Box::new(parser));
    }

    /// Register an already boxed parser
    pub fn register_boxed(&mut self, namespace: impl Into<String>, parser: Box<dyn TagParser>) {
        let namespace = namespace.into();
        match self.parsers.iter_mut().find(|(ns, _)| *ns == namespace) {
            Some(slot) => slot.1 = parser,
            None => self.parsers.push((namespace, parser)),
        }
    }

    /// Parser bound to `namespace`
    #[must_use]
    pub fn get(&self, namespace: &str) -> Option<&dyn TagParser> {
        self.parsers
            .iter()
            .find(|(ns, _)| ns == namespace)
            .map(|(_, p)| &**p)
    }

    /// Registered namespaces in registration order
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.parsers.iter().map(|(ns, _)| ns.as_str())
    }

    /// Namespace and parser pairs in registration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &dyn TagParser)> {
        self.parsers.iter().map(|(ns, p)| (ns.as_str(), &**p))
    }

    /// Number of registered namespaces
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    /// Whether no namespace is registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }
}
