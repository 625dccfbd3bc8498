//! Arena-allocated DOM for section content.
//!
//! Every section a rendering engine exposes is parsed into one of these. Nodes
//! live in a single vector and link to each other by index, which keeps
//! depth-first walks cheap and lets `NodeId` be a plain `Copy` handle that
//! engines and the indexer can pass around.

use html5ever::{LocalName, QualName};

/// Handle to a node inside an [`ArenaDom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Sentinel for a missing link.
    pub const NONE: NodeId = NodeId(u32::MAX);

    pub fn is_some(&self) -> bool {
        self.0 != u32::MAX
    }

    pub fn is_none(&self) -> bool {
        self.0 == u32::MAX
    }
}

/// Payload of a node.
#[derive(Debug, Clone)]
pub enum NodeData {
    Document,
    Element {
        name: QualName,
        attrs: Vec<Attribute>,
        /// Cached `id` attribute for selector matching.
        id: Option<String>,
        /// Cached `class` tokens for selector matching.
        classes: Vec<String>,
    },
    Text(String),
    Comment(String),
    Doctype(String),
}

#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: QualName,
    pub value: String,
}

#[derive(Debug)]
pub struct Node {
    pub data: NodeData,
    pub parent: NodeId,
    pub first_child: NodeId,
    pub last_child: NodeId,
    pub prev_sibling: NodeId,
    pub next_sibling: NodeId,
}

impl Node {
    fn detached(data: NodeData) -> Self {
        Self {
            data,
            parent: NodeId::NONE,
            first_child: NodeId::NONE,
            last_child: NodeId::NONE,
            prev_sibling: NodeId::NONE,
            next_sibling: NodeId::NONE,
        }
    }
}

/// Arena-based document tree.
pub struct ArenaDom {
    nodes: Vec<Node>,
    document: NodeId,
}

impl ArenaDom {
    /// Create a tree holding only the document root.
    pub fn new() -> Self {
        let mut dom = Self {
            nodes: Vec::new(),
            document: NodeId::NONE,
        };
        dom.document = dom.alloc(Node::detached(NodeData::Document));
        dom
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn document(&self) -> NodeId {
        self.document
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get_mut(id.0 as usize)
    }

    pub fn create_element(&mut self, name: QualName, attrs: Vec<Attribute>) -> NodeId {
        let id = attrs
            .iter()
            .find(|a| a.name.local.as_ref() == "id")
            .map(|a| a.value.clone());
        let classes = attrs
            .iter()
            .find(|a| a.name.local.as_ref() == "class")
            .map(|a| a.value.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        self.alloc(Node::detached(NodeData::Element {
            name,
            attrs,
            id,
            classes,
        }))
    }

    pub fn create_text(&mut self, text: String) -> NodeId {
        self.alloc(Node::detached(NodeData::Text(text)))
    }

    pub fn create_comment(&mut self, text: String) -> NodeId {
        self.alloc(Node::detached(NodeData::Comment(text)))
    }

    pub fn create_doctype(&mut self, name: String) -> NodeId {
        self.alloc(Node::detached(NodeData::Doctype(name)))
    }

    /// Append `child` as the last child of `parent`.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        let last = self.get(parent).map_or(NodeId::NONE, |n| n.last_child);

        if let Some(node) = self.get_mut(child) {
            node.parent = parent;
            node.prev_sibling = last;
            node.next_sibling = NodeId::NONE;
        }
        if let Some(node) = self.get_mut(last) {
            node.next_sibling = child;
        }
        if let Some(node) = self.get_mut(parent) {
            if node.first_child.is_none() {
                node.first_child = child;
            }
            node.last_child = child;
        }
    }

    /// Insert `new_node` immediately before `sibling`.
    pub fn insert_before(&mut self, sibling: NodeId, new_node: NodeId) {
        let Some((parent, prev)) = self.get(sibling).map(|n| (n.parent, n.prev_sibling)) else {
            return;
        };

        if let Some(node) = self.get_mut(new_node) {
            node.parent = parent;
            node.prev_sibling = prev;
            node.next_sibling = sibling;
        }
        if let Some(node) = self.get_mut(sibling) {
            node.prev_sibling = new_node;
        }
        if prev.is_some() {
            if let Some(node) = self.get_mut(prev) {
                node.next_sibling = new_node;
            }
        } else if let Some(node) = self.get_mut(parent) {
            node.first_child = new_node;
        }
    }

    /// Unlink `id` from its parent and siblings.
    pub fn detach(&mut self, id: NodeId) {
        let Some((parent, prev, next)) = self
            .get(id)
            .map(|n| (n.parent, n.prev_sibling, n.next_sibling))
        else {
            return;
        };

        if prev.is_some() {
            if let Some(node) = self.get_mut(prev) {
                node.next_sibling = next;
            }
        } else if let Some(node) = self.get_mut(parent) {
            node.first_child = next;
        }

        if next.is_some() {
            if let Some(node) = self.get_mut(next) {
                node.prev_sibling = prev;
            }
        } else if let Some(node) = self.get_mut(parent) {
            node.last_child = prev;
        }

        if let Some(node) = self.get_mut(id) {
            node.parent = NodeId::NONE;
            node.prev_sibling = NodeId::NONE;
            node.next_sibling = NodeId::NONE;
        }
    }

    /// Append text to `parent`, merging into a trailing text node.
    ///
    /// Adjacent text never ends up split across two nodes, which the
    /// position addressing relies on.
    pub fn append_text(&mut self, parent: NodeId, text: &str) {
        let last = self.get(parent).map_or(NodeId::NONE, |n| n.last_child);
        if let Some(Node {
            data: NodeData::Text(existing),
            ..
        }) = self.get_mut(last)
        {
            existing.push_str(text);
            return;
        }
        let node = self.create_text(text.to_string());
        self.append(parent, node);
    }

    /// Insert text before `sibling`, merging into a preceding text node.
    pub fn insert_text_before(&mut self, sibling: NodeId, text: &str) {
        let prev = self.get(sibling).map_or(NodeId::NONE, |n| n.prev_sibling);
        if let Some(Node {
            data: NodeData::Text(existing),
            ..
        }) = self.get_mut(prev)
        {
            existing.push_str(text);
            return;
        }
        let node = self.create_text(text.to_string());
        self.insert_before(sibling, node);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).map(|n| n.parent).filter(NodeId::is_some)
    }

    pub fn children(&self, parent: NodeId) -> Children<'_> {
        Children {
            dom: self,
            next: self.get(parent).map_or(NodeId::NONE, |n| n.first_child),
        }
    }

    /// Walk the subtree rooted at `root` in document order, root included.
    pub fn descendants(&self, root: NodeId) -> Descendants<'_> {
        let stack = if self.get(root).is_some() {
            vec![root]
        } else {
            Vec::new()
        };
        Descendants { dom: self, stack }
    }

    /// First node under the document matching `predicate`, in document order.
    pub fn find<F>(&self, predicate: F) -> Option<NodeId>
    where
        F: Fn(&Node) -> bool,
    {
        self.descendants(self.document)
            .find(|&id| self.get(id).is_some_and(&predicate))
    }

    pub fn find_by_tag(&self, tag: &str) -> Option<NodeId> {
        self.find(|node| match &node.data {
            NodeData::Element { name, .. } => name.local.as_ref() == tag,
            _ => false,
        })
    }

    /// The root element (`<html>`).
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(self.document).find(|&id| self.is_element(id))
    }

    /// The `<body>` element, falling back to the root element.
    pub fn body(&self) -> Option<NodeId> {
        let root = self.document_element()?;
        self.children(root)
            .find(|&id| self.element_name(id).is_some_and(|n| n.as_ref() == "body"))
            .or(Some(root))
    }
}

impl Default for ArenaDom {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Children<'a> {
    dom: &'a ArenaDom,
    next: NodeId,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next;
        let node = self.dom.get(id)?;
        self.next = node.next_sibling;
        Some(id)
    }
}

/// Pre-order traversal of a subtree.
pub struct Descendants<'a> {
    dom: &'a ArenaDom,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        // Pushed last-to-first so the leftmost child pops next.
        let mut child = self.dom.get(id).map_or(NodeId::NONE, |n| n.last_child);
        while let Some(node) = self.dom.get(child) {
            self.stack.push(child);
            child = node.prev_sibling;
        }
        Some(id)
    }
}

/// Element and text accessors.
impl ArenaDom {
    pub fn element_name(&self, id: NodeId) -> Option<&LocalName> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { name, .. } => Some(&name.local),
            _ => None,
        })
    }

    pub fn element_qualname(&self, id: NodeId) -> Option<&QualName> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { name, .. } => Some(name),
            _ => None,
        })
    }

    pub fn get_attr(&self, id: NodeId, attr_name: &str) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|a| a.name.local.as_ref() == attr_name)
                .map(|a| a.value.as_str()),
            _ => None,
        })
    }

    pub fn element_id(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { id, .. } => id.as_deref(),
            _ => None,
        })
    }

    pub fn element_classes(&self, id: NodeId) -> &[String] {
        match self.get(id).map(|n| &n.data) {
            Some(NodeData::Element { classes, .. }) => classes,
            _ => &[],
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.get(id)
            .is_some_and(|n| matches!(n.data, NodeData::Element { .. }))
    }

    pub fn is_comment(&self, id: NodeId) -> bool {
        self.get(id)
            .is_some_and(|n| matches!(n.data, NodeData::Comment(_)))
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        self.get(id)
            .is_some_and(|n| matches!(n.data, NodeData::Text(_)))
    }

    /// Contents of a text node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Text(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// Text nodes of a subtree in document order.
    pub fn text_nodes(&self, root: NodeId) -> impl Iterator<Item = (NodeId, &str)> + '_ {
        self.descendants(root)
            .filter_map(|id| self.text(id).map(|t| (id, t)))
    }

    /// Concatenated descendant text, like DOM `textContent`.
    pub fn text_content(&self, id: NodeId) -> String {
        self.text_nodes(id).map(|(_, t)| t).collect()
    }
}
