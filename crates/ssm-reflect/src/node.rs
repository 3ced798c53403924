//! Node tree
//!
//! Arena of nodes produced by the walker. Parents are referenced by
//! [`NodeId`], never owned. Nodes do not borrow the walked structure: each
//! node keeps the index path to its field and is resolved against the root
//! on demand.

use crate::field::{resolve, resolve_mut, Field};
use crate::filter::FieldFilters;
use ssm_tag::StoreTag;
use std::collections::BTreeMap;
use std::fmt;

/// Index of a node in its [`NodeTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// The root node
    pub const ROOT: NodeId = NodeId(0);

    /// Raw arena index
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One field (or the root structure) in the tree
#[derive(Debug, Clone)]
pub struct Node {
    local_path: String,
    field_name: &'static str,
    owner: &'static str,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    tags: BTreeMap<String, StoreTag>,
    accessor: Vec<usize>,
    is_struct: bool,
    absent: bool,
}

impl Node {
    pub(crate) fn new(
        local_path: String,
        field_name: &'static str,
        owner: &'static str,
        parent: Option<NodeId>,
        tags: BTreeMap<String, StoreTag>,
        accessor: Vec<usize>,
        is_struct: bool,
    ) -> Self {
        Self {
            local_path,
            field_name,
            owner,
            parent,
            children: Vec::new(),
            tags,
            accessor,
            is_struct,
            absent: false,
        }
    }

    pub(crate) fn with_absent(mut self, absent: bool) -> Self {
        self.absent = absent;
        self
    }

    /// Dotted path from the root, empty for the root
    #[inline]
    #[must_use]
    pub fn local_path(&self) -> &str {
        &self.local_path
    }

    /// Field identifier, empty for the root
    #[inline]
    #[must_use]
    pub fn field_name(&self) -> &'static str {
        self.field_name
    }

    /// Type owning the field; the root type for the root node
    #[inline]
    #[must_use]
    pub fn owner(&self) -> &'static str {
        self.owner
    }

    /// Parent node
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child nodes in field declaration order
    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Tags keyed by namespace
    #[inline]
    #[must_use]
    pub fn tags(&self) -> &BTreeMap<String, StoreTag> {
        &self.tags
    }

    /// Tag for `namespace`
    #[inline]
    #[must_use]
    pub fn tag(&self, namespace: &str) -> Option<&StoreTag> {
        self.tags.get(namespace)
    }

    /// Whether the node carries any tag
    #[inline]
    #[must_use]
    pub fn has_tags(&self) -> bool {
        !self.tags.is_empty()
    }

    /// Whether the node is a structure
    #[inline]
    #[must_use]
    pub fn is_struct(&self) -> bool {
        self.is_struct
    }

    /// Whether the field lies under an optional that is currently absent
    ///
    /// Resolving such a node for writing instantiates the optionals on the
    /// way.
    #[inline]
    #[must_use]
    pub fn is_absent(&self) -> bool {
        self.absent
    }

    /// Index path from the root structure
    #[inline]
    #[must_use]
    pub fn accessor(&self) -> &[usize] {
        &self.accessor
    }

    /// Read handle of the field within `root`
    #[must_use]
    pub fn resolve<'a>(&self, root: &'a dyn Field) -> Option<&'a dyn Field> {
        resolve(root, &self.accessor)
    }

    /// Write handle of the field within `root`, materializing absent parents
    pub fn resolve_mut<'a>(&self, root: &'a mut dyn Field) -> Option<&'a mut dyn Field> {
        resolve_mut(root, &self.accessor, true)
    }
}

/// Arena of nodes rooted at [`NodeId::ROOT`]
#[derive(Debug, Clone)]
pub struct NodeTree {
    nodes: Vec<Node>,
}

impl NodeTree {
    pub(crate) fn new(root_type: &'static str) -> Self {
        Self {
            nodes: vec![Node::new(
                String::new(),
                "",
                root_type,
                None,
                BTreeMap::new(),
                Vec::new(),
                true,
            )],
        }
    }

    pub(crate) fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub(crate) fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.0].children.push(child);
    }

    /// Drop the most recently pushed node
    pub(crate) fn discard_last(&mut self, id: NodeId) {
        if id.0 + 1 == self.nodes.len() && id != NodeId::ROOT {
            self.nodes.pop();
        }
    }

    /// Root node
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    /// Node by id
    #[inline]
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Number of nodes including the root
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether only the root exists
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// All nodes with their ids, root first, depth first
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Nodes without children, excluding the root
    pub fn leaves(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.iter()
            .filter(|(id, n)| *id != NodeId::ROOT && n.children.is_empty())
    }

    /// Node by dotted local path
    #[must_use]
    pub fn find(&self, local_path: &str) -> Option<(NodeId, &Node)> {
        self.iter()
            .find(|(id, n)| *id != NodeId::ROOT && n.local_path == local_path)
    }

    /// Ancestors of `id`, nearest first, ending at the root
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &Node)> {
        std::iter::successors(self.get(id).and_then(Node::parent), move |current| {
            self.get(*current).and_then(Node::parent)
        })
        .filter_map(move |pid| self.get(pid).map(|n| (pid, n)))
    }

    /// Remote path to node map for one namespace
    ///
    /// A node carrying a tag for `namespace` is included when the filter
    /// admits its local path; its children are not visited, so an annotated
    /// sub-structure is stored as one JSON value.
    #[must_use]
    pub fn parameter_map(&self, namespace: &str, filter: &FieldFilters) -> BTreeMap<String, NodeId> {
        let mut map = BTreeMap::new();
        self.collect(NodeId::ROOT, namespace, filter, &mut map);
        map
    }

    fn collect(
        &self,
        id: NodeId,
        namespace: &str,
        filter: &FieldFilters,
        map: &mut BTreeMap<String, NodeId>,
    ) {
        let node = &self.nodes[id.0];
        if let Some(tag) = node.tag(namespace) {
            if filter.is_included(&node.local_path) {
                if let Some(previous) = map.insert(tag.full_name().to_string(), id) {
                    tracing::warn!(
                        path = tag.full_name(),
                        field = %node.local_path,
                        shadowed = %self.nodes[previous.0].local_path,
                        "two fields map to the same remote path"
                    );
                }
            }
            return;
        }
        for child in &node.children {
            self.collect(*child, namespace, filter, map);
        }
    }

    /// Log every node at debug level
    pub fn dump(&self) {
        for (id, node) in self.iter() {
            let depth = self.ancestors(id).count();
            let tags: Vec<String> = node
                .tags
                .iter()
                .map(|(ns, tag)| format!("{ns}:{}", tag.full_name()))
                .collect();
            tracing::debug!(
                node = %id,
                depth,
                path = %node.local_path,
                owner = node.owner,
                structure = node.is_struct,
                absent = node.absent,
                tags = ?tags,
                "node"
            );
        }
    }
}
