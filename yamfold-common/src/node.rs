use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::ops::Index;

use crate::{CollectionStyle, ScalarStyle, Tag};

/// Index of a [`Node`] inside its [`Tree`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Mapping,
    Sequence,
    Scalar,
    Alias,
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            NodeKind::Document => "document",
            NodeKind::Mapping => "mapping",
            NodeKind::Sequence => "sequence",
            NodeKind::Scalar => "scalar",
            NodeKind::Alias => "alias",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeData {
    Document {
        root: Option<NodeId>,
        /// Document started with an explicit `---` marker.
        explicit_start: bool,
    },
    // flow style like `{x: Y, a: B}`
    // or block style like:
    //     x: Y
    //     a: B
    //
    // keys on even, values on odd positions
    Mapping {
        children: Vec<NodeId>,
        style: CollectionStyle,
    },
    // flow style like `[x, x, x]`
    // or block style like:
    //     - x
    //     - x
    Sequence {
        children: Vec<NodeId>,
        style: CollectionStyle,
    },
    Scalar {
        value: String,
        style: ScalarStyle,
    },
    /// `*name`, pointing back to the node that declared `&name`.
    Alias {
        name: String,
        target: Option<NodeId>,
    },
}

impl NodeData {
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeData::Document { .. } => NodeKind::Document,
            NodeData::Mapping { .. } => NodeKind::Mapping,
            NodeData::Sequence { .. } => NodeKind::Sequence,
            NodeData::Scalar { .. } => NodeKind::Scalar,
            NodeData::Alias { .. } => NodeKind::Alias,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub anchor: Option<String>,
    pub tag: Option<Tag>,
    pub data: NodeData,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Node {
            anchor: None,
            tag: None,
            data,
        }
    }

    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.data.kind()
    }

    /// Children of a container, keys and values interleaved for mappings.
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        match &self.data {
            NodeData::Mapping { children, .. } | NodeData::Sequence { children, .. } => children,
            NodeData::Document {
                root: Some(root), ..
            } => core::slice::from_ref(root),
            _ => &[],
        }
    }

    /// Scalar text, `None` for every other kind.
    #[must_use]
    pub fn scalar(&self) -> Option<&str> {
        match &self.data {
            NodeData::Scalar { value, .. } => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_mapping(&self) -> bool {
        matches!(self.data, NodeData::Mapping { .. })
    }

    #[must_use]
    pub fn is_alias(&self) -> bool {
        matches!(self.data, NodeData::Alias { .. })
    }
}

/// A single YAML document stored as an arena of [`Node`]s.
///
/// Nodes are owned by the arena and refer to their children by [`NodeId`], so aliases are plain
/// lookups and may point anywhere in the tree, including at one of their own ancestors.
#[derive(Clone, Debug)]
pub struct Tree {
    nodes: Vec<Node>,
    anchors: HashMap<String, NodeId>,
}

const DOCUMENT: NodeId = NodeId(0);

impl Default for Tree {
    fn default() -> Self {
        Tree::new()
    }
}

impl Tree {
    #[must_use]
    pub fn new() -> Self {
        Tree {
            nodes: vec![Node::new(NodeData::Document {
                root: None,
                explicit_start: false,
            })],
            anchors: HashMap::new(),
        }
    }

    /// Id of the `Document` node every tree starts with.
    #[must_use]
    pub fn document(&self) -> NodeId {
        DOCUMENT
    }

    /// Content root of the document.
    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        match self.nodes[DOCUMENT.0].data {
            NodeData::Document { root, .. } => root,
            _ => None,
        }
    }

    #[must_use]
    pub fn explicit_start(&self) -> bool {
        matches!(
            self.nodes[DOCUMENT.0].data,
            NodeData::Document {
                explicit_start: true,
                ..
            }
        )
    }

    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Most recent node that declared `&name`.
    #[must_use]
    pub fn anchor(&self, name: &str) -> Option<NodeId> {
        self.anchors.get(name).copied()
    }

    fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn add_scalar(&mut self, value: impl Into<String>, style: ScalarStyle) -> NodeId {
        self.push(Node::new(NodeData::Scalar {
            value: value.into(),
            style,
        }))
    }

    pub fn add_mapping(&mut self, style: CollectionStyle) -> NodeId {
        self.push(Node::new(NodeData::Mapping {
            children: Vec::new(),
            style,
        }))
    }

    pub fn add_sequence(&mut self, style: CollectionStyle) -> NodeId {
        self.push(Node::new(NodeData::Sequence {
            children: Vec::new(),
            style,
        }))
    }

    /// Adds `*name`, targeting whichever node currently owns the anchor.
    pub fn add_alias(&mut self, name: impl Into<String>) -> NodeId {
        let name = name.into();
        let target = self.anchor(&name);
        self.add_alias_to(name, target)
    }

    pub fn add_alias_to(&mut self, name: impl Into<String>, target: Option<NodeId>) -> NodeId {
        self.push(Node::new(NodeData::Alias {
            name: name.into(),
            target,
        }))
    }

    /// Declares `&name` on `id`. A later declaration of the same name shadows earlier ones.
    pub fn set_anchor(&mut self, id: NodeId, name: impl Into<String>) {
        let name = name.into();
        self.anchors.insert(name.clone(), id);
        self.nodes[id.0].anchor = Some(name);
    }

    pub fn set_tag(&mut self, id: NodeId, tag: Tag) {
        self.nodes[id.0].tag = Some(tag);
    }

    /// # Panics
    ///
    /// Panics if the root was already set.
    pub fn set_root(&mut self, id: NodeId) {
        match self.nodes[DOCUMENT.0].data {
            NodeData::Document { ref mut root, .. } if root.is_none() => *root = Some(id),
            _ => panic!("Document root can only be set once"),
        }
    }

    pub fn set_explicit_start(&mut self, explicit: bool) {
        if let NodeData::Document {
            ref mut explicit_start,
            ..
        } = self.nodes[DOCUMENT.0].data
        {
            *explicit_start = explicit;
        }
    }

    /// # Panics
    ///
    /// Panics if `seq` is not a sequence.
    pub fn push_item(&mut self, seq: NodeId, item: NodeId) {
        match self.nodes[seq.0].data {
            NodeData::Sequence {
                ref mut children, ..
            } => children.push(item),
            _ => panic!("Cannot push item into non-sequence node {seq}"),
        }
    }

    /// Appends a key/value pair, which keeps mapping children at even length.
    ///
    /// # Panics
    ///
    /// Panics if `map` is not a mapping.
    pub fn push_pair(&mut self, map: NodeId, key: NodeId, value: NodeId) {
        match self.nodes[map.0].data {
            NodeData::Mapping {
                ref mut children, ..
            } => {
                children.push(key);
                children.push(value);
            }
            _ => panic!("Cannot push pair into non-mapping node {map}"),
        }
    }

    /// Key/value pairs of a mapping in document order, empty for other kinds.
    pub fn pairs(&self, map: NodeId) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        let children = match &self.nodes[map.0].data {
            NodeData::Mapping { children, .. } => children.as_slice(),
            _ => &[],
        };
        children.chunks_exact(2).map(|pair| (pair[0], pair[1]))
    }
}

impl Index<NodeId> for Tree {
    type Output = Node;

    fn index(&self, index: NodeId) -> &Self::Output {
        &self.nodes[index.0]
    }
}
