//! Structural walker
//!
//! Builds a [`NodeTree`] from a derived [`Structure`]. Every field is
//! visited in declaration order; scalar fields become leaves when at least
//! one registered namespace annotates them, sub-structures become internal
//! nodes whose children live under `parent prefix + "/" + lowercase(field)`.

use crate::error::ParseError;
use crate::field::{Field, FieldMut, FieldRef, Structure};
use crate::node::{Node, NodeId, NodeTree};
use ssm_tag::{StoreTag, TagParser, TagParserRegistry};
use std::collections::BTreeMap;
use tracing::debug;

/// Default bound for descending into absent optionals
pub const DEFAULT_MAX_DEPTH: usize = 16;

/// Walker bound to an environment, a service and a set of namespaces
#[derive(Debug)]
pub struct Parser {
    environment: String,
    service: String,
    prefix: String,
    registry: TagParserRegistry,
    max_depth: usize,
    absent_optionals: bool,
}

#[derive(Clone, Copy)]
struct Position<'p> {
    nav: &'p str,
    prefix: &'p str,
    accessor: &'p [usize],
    absent: bool,
    depth: usize,
}

impl Parser {
    /// Create a walker with no namespaces registered
    #[must_use]
    pub fn new(environment: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            service: service.into(),
            prefix: String::new(),
            registry: TagParserRegistry::new(),
            max_depth: DEFAULT_MAX_DEPTH,
            absent_optionals: false,
        }
    }

    /// Default prefix for the root; local unless it starts with `/`
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Replace the namespace registry
    #[must_use]
    pub fn with_registry(mut self, registry: TagParserRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Structure depth bound for absent optionals and [`Self::materialize`]
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Describe absent optionals through default stand-ins
    ///
    /// Their fields become nodes flagged [`Node::is_absent`]; the parsed
    /// value is left untouched.
    #[must_use]
    pub fn with_absent_optionals(mut self, enabled: bool) -> Self {
        self.absent_optionals = enabled;
        self
    }

    /// Register a namespace parser
    #[must_use]
    pub fn register<P: TagParser>(mut self, namespace: impl Into<String>, parser: P) -> Self {
        self.registry.register(namespace, parser);
        self
    }

    /// Registered namespaces
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &TagParserRegistry {
        &self.registry
    }

    /// Environment segment
    #[inline]
    #[must_use]
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Service segment
    #[inline]
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Build the node tree for `root`
    ///
    /// # Errors
    /// Returns [`ParseError::InvalidArgument`] when `root` is a scalar or an
    /// absent optional, and [`ParseError::Tag`] for the first malformed
    /// annotation.
    pub fn parse(&self, root: &dyn Field) -> Result<NodeTree, ParseError> {
        let structure = match root.as_field() {
            FieldRef::Struct(structure) => structure,
            FieldRef::Scalar(_) => {
                return Err(ParseError::invalid_argument(
                    "expected a structure, got a scalar value",
                ))
            }
            FieldRef::Absent => {
                return Err(ParseError::invalid_argument("root structure is absent"));
            }
        };

        let mut tree = NodeTree::new(structure.type_name());
        let root = Position {
            nav: "",
            prefix: &self.prefix,
            accessor: &[],
            absent: false,
            depth: 0,
        };
        self.parse_struct(&mut tree, NodeId::ROOT, structure, root)?;
        debug!(
            root = structure.type_name(),
            nodes = tree.len(),
            "parsed structure"
        );
        Ok(tree)
    }

    fn parse_struct(
        &self,
        tree: &mut NodeTree,
        parent: NodeId,
        structure: &dyn Structure,
        at: Position<'_>,
    ) -> Result<(), ParseError> {
        let owner = structure.type_name();

        for (index, descriptor) in structure.fields().iter().enumerate() {
            let Some(field) = structure.field(index) else {
                continue;
            };
            let local_path = join_nav(at.nav, descriptor.name);
            let mut path = at.accessor.to_vec();
            path.push(index);

            let prototype;
            let (field, absent): (&dyn Field, bool) = match field.as_field() {
                FieldRef::Absent => {
                    prototype = if self.absent_optionals && at.depth < self.max_depth {
                        field.prototype()
                    } else {
                        None
                    };
                    if let Some(standin) = prototype.as_deref() {
                        (standin, true)
                    } else {
                        debug!(field = %local_path, "skipping absent optional");
                        continue;
                    }
                }
                FieldRef::Scalar(_) | FieldRef::Struct(_) => (field, at.absent),
            };

            match field.as_field() {
                FieldRef::Absent => {}
                FieldRef::Scalar(_) => {
                    let tags = self.parse_tags(owner, descriptor.name, descriptor.annotations, at.prefix)?;
                    if tags.is_empty() {
                        continue;
                    }
                    debug!(field = %local_path, namespaces = tags.len(), absent, "leaf");
                    let node = Node::new(local_path, descriptor.name, owner, Some(parent), tags, path, false);
                    let id = tree.push(node.with_absent(absent));
                    tree.attach(parent, id);
                }
                FieldRef::Struct(child) => {
                    let tags = self.parse_tags(owner, descriptor.name, descriptor.annotations, at.prefix)?;
                    let child_prefix = join_prefix(at.prefix, &descriptor.name.to_lowercase());
                    let has_tags = !tags.is_empty();
                    let node = Node::new(
                        local_path.clone(),
                        descriptor.name,
                        owner,
                        Some(parent),
                        tags,
                        path.clone(),
                        true,
                    );
                    let id = tree.push(node.with_absent(absent));
                    let nested = Position {
                        nav: &local_path,
                        prefix: &child_prefix,
                        accessor: &path,
                        absent,
                        depth: at.depth + 1,
                    };
                    self.parse_struct(tree, id, child, nested)?;

                    let has_children = tree.get(id).is_some_and(|n| !n.children().is_empty());
                    if has_tags || has_children {
                        tree.attach(parent, id);
                    } else {
                        tree.discard_last(id);
                    }
                }
            }
        }
        Ok(())
    }

    fn parse_tags(
        &self,
        owner: &'static str,
        field: &'static str,
        annotations: &'static [crate::field::Annotation],
        prefix: &str,
    ) -> Result<BTreeMap<String, StoreTag>, ParseError> {
        let mut tags = BTreeMap::new();
        for annotation in annotations {
            let Some(parser) = self.registry.get(annotation.namespace) else {
                continue;
            };
            let tag = parser
                .parse_tag_string(annotation.literal, prefix, &self.environment, &self.service)
                .map_err(|source| ParseError::Tag {
                    type_name: owner,
                    field,
                    namespace: annotation.namespace.to_string(),
                    source,
                })?;
            tags.insert(annotation.namespace.to_string(), tag);
        }
        Ok(tags)
    }

    /// Instantiate absent optional fields top-down
    ///
    /// Descends at most `max_depth` structure levels. Returns the number of
    /// fields that were materialized.
    pub fn materialize(&self, root: &mut dyn Field) -> usize {
        materialize_level(root, self.max_depth)
    }
}

fn materialize_level(field: &mut dyn Field, depth: usize) -> usize {
    if depth == 0 {
        return 0;
    }
    let FieldMut::Struct(structure) = field.as_field_mut() else {
        return 0;
    };

    let mut created = 0;
    for index in 0..structure.fields().len() {
        let Some(child) = structure.field_mut(index) else {
            continue;
        };
        if matches!(child.as_field_mut(), FieldMut::Absent) && child.materialize() {
            created += 1;
        }
        created += materialize_level(child, depth - 1);
    }
    created
}

fn join_nav(nav: &str, name: &str) -> String {
    if nav.is_empty() {
        name.to_string()
    } else {
        format!("{nav}.{name}")
    }
}

fn join_prefix(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{}/{segment}", prefix.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nav_paths_are_dotted() {
        assert_eq!(join_nav("", "sub"), "sub");
        assert_eq!(join_nav("sub", "apa"), "sub.apa");
    }

    #[test]
    fn nested_prefix_stays_local_or_global() {
        assert_eq!(join_prefix("", "sub"), "sub");
        assert_eq!(join_prefix("parser-prefix", "sub"), "parser-prefix/sub");
        assert_eq!(join_prefix("/global/", "sub"), "/global/sub");
    }

    #[test]
    fn scalar_root_is_rejected() {
        let parser = Parser::new("dev", "svc");
        let value = 5_i32;
        assert!(matches!(
            parser.parse(&value),
            Err(ParseError::InvalidArgument(_))
        ));
    }
}
