//! Defines the cursor contract the engine navigates host trees through.
use std::cmp::Ordering;
use std::fmt::Debug;

/// The kind of node a cursor is positioned on, aligned with the XPath 1.0 data model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Root,
    Element,
    Attribute,
    Text,
    Comment,
}

/// A movable cursor over a read-only, hierarchical tree.
///
/// This trait is the only thing the engine knows about a host tree. Query
/// operators hold cursors, duplicate them with `Clone` and reposition them with
/// the `move_*` methods; they never mutate the tree itself.
///
/// Every movement reports whether it succeeded. A failed movement must leave
/// the cursor where it was.
///
/// Attributes are reached from their owner element with
/// [`move_to_next_attribute`](Navigator::move_to_next_attribute): the first call
/// on an element moves to its first attribute, further calls on an attribute
/// move to the next one. [`move_to_parent`](Navigator::move_to_parent) on an
/// attribute returns to the owner element. Attributes have no siblings and no
/// children.
pub trait Navigator: Clone + Debug {
    /// The kind of the current node.
    fn node_type(&self) -> NodeType;

    /// The local part of the current node's name. Empty for unnamed nodes
    /// (root, text, comment).
    fn local_name(&self) -> &str;

    /// The namespace prefix of the current node's name, or an empty string.
    fn prefix(&self) -> &str;

    /// The namespace URI of the current node, if the host tree tracks one.
    ///
    /// When this returns `None`, prefixed name tests fall back to comparing the
    /// prefix as written in the expression.
    fn namespace_uri(&self) -> Option<&str> {
        None
    }

    /// The string value of the current node, as defined by the XPath 1.0
    /// `string()` function.
    /// - For a text or comment node, this is its content.
    /// - For an attribute, this is its value.
    /// - For an element or the root, this is the concatenation of all
    ///   descendant text nodes in document order.
    fn value(&self) -> String;

    /// Moves to the root node of the tree the cursor is in.
    fn move_to_root(&mut self);

    /// Moves to the parent node. Returns `false` on the root.
    fn move_to_parent(&mut self) -> bool;

    /// Moves to the first attribute of an element, or to the next attribute of
    /// the owner element when positioned on an attribute.
    fn move_to_next_attribute(&mut self) -> bool;

    /// Moves to the first child node.
    fn move_to_child(&mut self) -> bool;

    /// Moves to the first sibling node (the first child of the parent).
    fn move_to_first(&mut self) -> bool;

    /// Moves to the next sibling node.
    fn move_to_next(&mut self) -> bool;

    /// Moves to the previous sibling node.
    fn move_to_previous(&mut self) -> bool;

    /// Moves to the same position as `other`. Returns `false` if `other`
    /// belongs to a tree this cursor cannot reach.
    fn move_to(&mut self, other: &Self) -> bool;
}

/// The position of a node in its tree, derived only through cursor movement.
///
/// Each entry is `(0, i)` for the `i`-th attribute of the node above it, or
/// `(1, i)` for its `i`-th child. Two cursors sit on the same node iff their
/// keys are equal, and comparing keys gives document order: ancestors sort
/// before descendants, attributes before children.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeKey(Vec<(u8, usize)>);

impl NodeKey {
    pub fn of<N: Navigator>(node: &N) -> Self {
        let mut nav = node.clone();
        let mut path = Vec::new();
        loop {
            if nav.node_type() == NodeType::Attribute {
                let local = nav.local_name().to_string();
                let prefix = nav.prefix().to_string();
                if !nav.move_to_parent() {
                    break;
                }
                let mut attr = nav.clone();
                let mut index = 0;
                while attr.move_to_next_attribute() {
                    if attr.local_name() == local && attr.prefix() == prefix {
                        break;
                    }
                    index += 1;
                }
                path.push((0, index));
                continue;
            }
            let mut index = 0;
            while nav.move_to_previous() {
                index += 1;
            }
            path.push((1, index));
            if !nav.move_to_parent() {
                break;
            }
        }
        path.reverse();
        NodeKey(path)
    }
}

/// Compares two cursors by document order.
pub fn document_order<N: Navigator>(a: &N, b: &N) -> Ordering {
    NodeKey::of(a).cmp(&NodeKey::of(b))
}

// Test utilities - publicly available for integration testing in downstream crates
pub mod tests {
    use super::*;

    const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

    #[derive(Debug, Clone)]
    struct MockNodeData {
        node_type: NodeType,
        prefix: String,
        local_name: String,
        namespace_uri: Option<String>,
        value: String,
        parent: Option<usize>,
        children: Vec<usize>,
        attributes: Vec<usize>,
    }

    /// A small arena-backed tree for exercising the engine without a real
    /// document model.
    #[derive(Debug)]
    pub struct MockTree {
        nodes: Vec<MockNodeData>,
    }

    impl Default for MockTree {
        fn default() -> Self {
            Self::new()
        }
    }

    fn split_name(name: &str) -> (String, String) {
        match name.split_once(':') {
            Some((prefix, local)) => (prefix.to_string(), local.to_string()),
            None => (String::new(), name.to_string()),
        }
    }

    impl MockTree {
        pub const ROOT: usize = 0;

        /// Creates a tree holding only the root node.
        pub fn new() -> Self {
            MockTree {
                nodes: vec![MockNodeData {
                    node_type: NodeType::Root,
                    prefix: String::new(),
                    local_name: String::new(),
                    namespace_uri: None,
                    value: String::new(),
                    parent: None,
                    children: vec![],
                    attributes: vec![],
                }],
            }
        }

        fn push(&mut self, parent: usize, data: MockNodeData, as_attribute: bool) -> usize {
            let id = self.nodes.len();
            self.nodes.push(MockNodeData {
                parent: Some(parent),
                ..data
            });
            if as_attribute {
                self.nodes[parent].attributes.push(id);
            } else {
                self.nodes[parent].children.push(id);
            }
            id
        }

        fn named(node_type: NodeType, name: &str, uri: Option<&str>, value: &str) -> MockNodeData {
            let (prefix, local_name) = split_name(name);
            MockNodeData {
                node_type,
                prefix,
                local_name,
                namespace_uri: uri.map(str::to_string),
                value: value.to_string(),
                parent: None,
                children: vec![],
                attributes: vec![],
            }
        }

        /// Appends an element; `name` may carry a prefix (`ns:item`).
        pub fn element(&mut self, parent: usize, name: &str) -> usize {
            self.push(parent, Self::named(NodeType::Element, name, None, ""), false)
        }

        /// Appends an element that reports `uri` as its namespace.
        pub fn element_ns(&mut self, parent: usize, name: &str, uri: &str) -> usize {
            self.push(parent, Self::named(NodeType::Element, name, Some(uri), ""), false)
        }

        /// Adds an attribute to `owner`. `xml:`-prefixed names get the XML namespace.
        pub fn attribute(&mut self, owner: usize, name: &str, value: &str) -> usize {
            let uri = name.starts_with("xml:").then_some(XML_NAMESPACE);
            self.push(owner, Self::named(NodeType::Attribute, name, uri, value), true)
        }

        pub fn text(&mut self, parent: usize, value: &str) -> usize {
            self.push(parent, Self::named(NodeType::Text, "", None, value), false)
        }

        pub fn comment(&mut self, parent: usize, value: &str) -> usize {
            self.push(parent, Self::named(NodeType::Comment, "", None, value), false)
        }

        /// A cursor positioned on the root.
        pub fn navigator(&self) -> MockNavigator<'_> {
            self.navigator_at(Self::ROOT)
        }

        pub fn navigator_at(&self, id: usize) -> MockNavigator<'_> {
            MockNavigator { id, tree: self }
        }

        fn string_value(&self, id: usize) -> String {
            let node = &self.nodes[id];
            match node.node_type {
                NodeType::Root | NodeType::Element => node
                    .children
                    .iter()
                    .filter(|&&c| matches!(self.nodes[c].node_type, NodeType::Element | NodeType::Text))
                    .map(|&c| self.string_value(c))
                    .collect(),
                _ => node.value.clone(),
            }
        }

        fn siblings(&self, id: usize) -> Option<&[usize]> {
            let node = &self.nodes[id];
            if node.node_type == NodeType::Attribute {
                return None;
            }
            node.parent.map(|p| self.nodes[p].children.as_slice())
        }
    }

    /// A cursor over a [`MockTree`].
    #[derive(Debug, Clone, Copy)]
    pub struct MockNavigator<'a> {
        pub id: usize,
        pub tree: &'a MockTree,
    }

    impl PartialEq for MockNavigator<'_> {
        fn eq(&self, other: &Self) -> bool {
            self.id == other.id && std::ptr::eq(self.tree, other.tree)
        }
    }
    impl Eq for MockNavigator<'_> {}

    impl<'a> MockNavigator<'a> {
        fn data(&self) -> &'a MockNodeData {
            &self.tree.nodes[self.id]
        }

        fn move_within_siblings(&mut self, step: isize) -> bool {
            let Some(siblings) = self.tree.siblings(self.id) else {
                return false;
            };
            let Some(index) = siblings.iter().position(|&s| s == self.id) else {
                return false;
            };
            match index.checked_add_signed(step).and_then(|i| siblings.get(i)) {
                Some(&next) => {
                    self.id = next;
                    true
                }
                None => false,
            }
        }
    }

    impl Navigator for MockNavigator<'_> {
        fn node_type(&self) -> NodeType {
            self.data().node_type
        }

        fn local_name(&self) -> &str {
            &self.data().local_name
        }

        fn prefix(&self) -> &str {
            &self.data().prefix
        }

        fn namespace_uri(&self) -> Option<&str> {
            self.data().namespace_uri.as_deref()
        }

        fn value(&self) -> String {
            self.tree.string_value(self.id)
        }

        fn move_to_root(&mut self) {
            self.id = MockTree::ROOT;
        }

        fn move_to_parent(&mut self) -> bool {
            match self.data().parent {
                Some(parent) => {
                    self.id = parent;
                    true
                }
                None => false,
            }
        }

        fn move_to_next_attribute(&mut self) -> bool {
            let data = self.data();
            let next = match data.node_type {
                NodeType::Element => data.attributes.first().copied(),
                NodeType::Attribute => data.parent.and_then(|owner| {
                    let attributes = &self.tree.nodes[owner].attributes;
                    attributes
                        .iter()
                        .position(|&a| a == self.id)
                        .and_then(|i| attributes.get(i + 1).copied())
                }),
                _ => None,
            };
            match next {
                Some(id) => {
                    self.id = id;
                    true
                }
                None => false,
            }
        }

        fn move_to_child(&mut self) -> bool {
            match self.data().children.first() {
                Some(&child) => {
                    self.id = child;
                    true
                }
                None => false,
            }
        }

        fn move_to_first(&mut self) -> bool {
            match self.tree.siblings(self.id).and_then(|s| s.first()) {
                Some(&first) => {
                    self.id = first;
                    true
                }
                None => false,
            }
        }

        fn move_to_next(&mut self) -> bool {
            self.move_within_siblings(1)
        }

        fn move_to_previous(&mut self) -> bool {
            self.move_within_siblings(-1)
        }

        fn move_to(&mut self, other: &Self) -> bool {
            if std::ptr::eq(self.tree, other.tree) {
                self.id = other.id;
                true
            } else {
                false
            }
        }
    }

    /// Creates a simple mock tree for testing:
    /// <root> <!-- id 0 -->
    ///   <para id="p1" xml:lang="en">Hello</para> <!-- id 1, attr 2&3, text 4 -->
    ///   <!-- comment node --> <!-- id 5 -->
    ///   <div></div> <!-- id 6 -->
    ///   <para>World</para> <!-- id 7, text 8 -->
    /// </root>
    pub fn create_test_tree() -> MockTree {
        let mut tree = MockTree::new();
        let para = tree.element(MockTree::ROOT, "para");
        tree.attribute(para, "id", "p1");
        tree.attribute(para, "xml:lang", "en");
        tree.text(para, "Hello");
        tree.comment(MockTree::ROOT, " comment node ");
        tree.element(MockTree::ROOT, "div");
        let para2 = tree.element(MockTree::ROOT, "para");
        tree.text(para2, "World");
        tree
    }
}
