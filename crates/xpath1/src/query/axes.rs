//! Lazy cursors for walking each XPath axis, plus node tests.
//!
//! Every axis is a small state machine over a single cursor: no axis ever
//! materializes the nodes it visits. Forward axes yield in document order,
//! reverse axes (ancestor, preceding, preceding-sibling) yield nearest first.

use crate::navigator::{Navigator, NodeType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Attribute,
    SelfAxis,
    Parent,
    Ancestor,
    AncestorOrSelf,
    FollowingSibling,
    PrecedingSibling,
    Following,
    Preceding,
}

impl Axis {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "child" => Axis::Child,
            "descendant" => Axis::Descendant,
            "descendant-or-self" => Axis::DescendantOrSelf,
            "attribute" => Axis::Attribute,
            "self" => Axis::SelfAxis,
            "parent" => Axis::Parent,
            "ancestor" => Axis::Ancestor,
            "ancestor-or-self" => Axis::AncestorOrSelf,
            "following-sibling" => Axis::FollowingSibling,
            "preceding-sibling" => Axis::PrecedingSibling,
            "following" => Axis::Following,
            "preceding" => Axis::Preceding,
            _ => return None,
        })
    }

    /// The node type name tests and `*` select on this axis.
    pub fn principal_node_type(self) -> NodeType {
        match self {
            Axis::Attribute => NodeType::Attribute,
            _ => NodeType::Element,
        }
    }
}

/// A namespace prefix from the expression and the URI it was bound to at
/// compile time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceBinding {
    pub prefix: String,
    pub uri: String,
}

impl NamespaceBinding {
    fn matches<N: Navigator>(&self, node: &N) -> bool {
        match node.namespace_uri() {
            Some(uri) => uri == self.uri,
            None => node.prefix() == self.prefix,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    /// `*`
    Any,
    /// `prefix:*`
    Namespace(NamespaceBinding),
    /// `local` or `prefix:local`. An unprefixed name matches in any namespace.
    Name {
        namespace: Option<NamespaceBinding>,
        local: String,
    },
    /// `node()`
    Node,
    /// `text()`
    Text,
    /// `comment()`
    Comment,
}

impl NodeTest {
    pub fn matches<N: Navigator>(&self, node: &N, axis: Axis) -> bool {
        let principal = || node.node_type() == axis.principal_node_type();
        match self {
            NodeTest::Node => true,
            NodeTest::Text => node.node_type() == NodeType::Text,
            NodeTest::Comment => node.node_type() == NodeType::Comment,
            NodeTest::Any => principal(),
            NodeTest::Namespace(ns) => principal() && ns.matches(node),
            NodeTest::Name { namespace, local } => {
                principal()
                    && node.local_name() == local
                    && namespace.as_ref().is_none_or(|ns| ns.matches(node))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Walk {
    Start,
    Running,
    Done,
}

/// Walks one axis from one context node.
#[derive(Debug, Clone)]
pub struct AxisIter<N> {
    axis: Axis,
    cursor: N,
    walk: Walk,
    /// Levels below the walk's anchor for the descendant and preceding axes.
    depth: usize,
}

impl<N: Navigator> AxisIter<N> {
    pub fn new(axis: Axis, context: N) -> Self {
        AxisIter {
            axis,
            cursor: context,
            walk: Walk::Start,
            depth: 0,
        }
    }

    fn finish(&mut self) -> Option<N> {
        self.walk = Walk::Done;
        None
    }

    fn emit(&mut self) -> Option<N> {
        self.walk = Walk::Running;
        Some(self.cursor.clone())
    }

    /// Emits the current node once, then stops.
    fn emit_last(&mut self) -> Option<N> {
        self.walk = Walk::Done;
        Some(self.cursor.clone())
    }

    fn emit_if(&mut self, moved: bool) -> Option<N> {
        if moved { self.emit() } else { self.finish() }
    }

    /// Preorder step below the anchor, never leaving its subtree.
    fn next_descendant(&mut self) -> Option<N> {
        if self.cursor.move_to_child() {
            self.depth += 1;
            return self.emit();
        }
        loop {
            if self.depth == 0 {
                return self.finish();
            }
            if self.cursor.move_to_next() {
                return self.emit();
            }
            self.cursor.move_to_parent();
            self.depth -= 1;
        }
    }

    /// Next node in document order, optionally skipping the current subtree.
    fn next_in_document(&mut self, descend: bool) -> Option<N> {
        if descend && self.cursor.move_to_child() {
            return self.emit();
        }
        loop {
            if self.cursor.move_to_next() {
                return self.emit();
            }
            if !self.cursor.move_to_parent() {
                return self.finish();
            }
        }
    }

    /// Previous node in document order that is not an ancestor of the anchor.
    fn next_preceding(&mut self) -> Option<N> {
        loop {
            if self.cursor.move_to_previous() {
                // Deepest last descendant of the previous sibling comes first.
                while self.cursor.move_to_child() {
                    self.depth += 1;
                    while self.cursor.move_to_next() {}
                }
                return self.emit();
            }
            if self.depth == 0 {
                if !self.cursor.move_to_parent() {
                    return self.finish();
                }
                continue;
            }
            self.cursor.move_to_parent();
            self.depth -= 1;
            return self.emit();
        }
    }

    fn is_attribute(&self) -> bool {
        self.cursor.node_type() == NodeType::Attribute
    }
}

impl<N: Navigator> Iterator for AxisIter<N> {
    type Item = N;

    fn next(&mut self) -> Option<N> {
        let start = match self.walk {
            Walk::Done => return None,
            Walk::Start => true,
            Walk::Running => false,
        };
        match self.axis {
            Axis::SelfAxis => self.emit_last(),
            Axis::Parent => {
                if start && self.cursor.move_to_parent() {
                    self.emit_last()
                } else {
                    self.finish()
                }
            }
            Axis::Child => {
                let moved = if start {
                    self.cursor.move_to_child()
                } else {
                    self.cursor.move_to_next()
                };
                self.emit_if(moved)
            }
            Axis::Attribute => {
                let owner_ok = !start || self.cursor.node_type() == NodeType::Element;
                let moved = owner_ok && self.cursor.move_to_next_attribute();
                self.emit_if(moved)
            }
            Axis::Ancestor => {
                let moved = self.cursor.move_to_parent();
                self.emit_if(moved)
            }
            Axis::AncestorOrSelf => {
                if start {
                    self.emit()
                } else {
                    let moved = self.cursor.move_to_parent();
                    self.emit_if(moved)
                }
            }
            Axis::Descendant => self.next_descendant(),
            Axis::DescendantOrSelf => {
                if start {
                    self.emit()
                } else {
                    self.next_descendant()
                }
            }
            Axis::FollowingSibling => {
                let moved = !self.is_attribute() && self.cursor.move_to_next();
                self.emit_if(moved)
            }
            Axis::PrecedingSibling => {
                let moved = !self.is_attribute() && self.cursor.move_to_previous();
                self.emit_if(moved)
            }
            Axis::Following => {
                if start && self.is_attribute() {
                    // The owner's children follow its attributes.
                    self.cursor.move_to_parent();
                    self.next_in_document(true)
                } else if start {
                    self.next_in_document(false)
                } else {
                    self.next_in_document(true)
                }
            }
            Axis::Preceding => {
                if start && self.is_attribute() {
                    self.cursor.move_to_parent();
                }
                self.next_preceding()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigator::tests::{MockNavigator, MockTree, create_test_tree};

    fn walk<'a>(tree: &'a MockTree, axis: Axis, from: usize) -> Vec<usize> {
        AxisIter::new(axis, tree.navigator_at(from))
            .map(|n: MockNavigator<'a>| n.id)
            .collect()
    }

    #[test]
    fn test_child_and_attribute() {
        let tree = create_test_tree();
        assert_eq!(walk(&tree, Axis::Child, 0), vec![1, 5, 6, 7]);
        assert_eq!(walk(&tree, Axis::Child, 6), Vec::<usize>::new());
        assert_eq!(walk(&tree, Axis::Attribute, 1), vec![2, 3]);
        assert_eq!(walk(&tree, Axis::Attribute, 2), Vec::<usize>::new());
    }

    #[test]
    fn test_ancestor_is_nearest_first() {
        let tree = create_test_tree();
        assert_eq!(walk(&tree, Axis::Ancestor, 4), vec![1, 0]);
        assert_eq!(walk(&tree, Axis::AncestorOrSelf, 2), vec![2, 1, 0]);
        assert_eq!(walk(&tree, Axis::Parent, 0), Vec::<usize>::new());
        assert_eq!(walk(&tree, Axis::Parent, 3), vec![1]);
    }

    #[test]
    fn test_descendant_in_document_order() {
        let tree = create_test_tree();
        assert_eq!(walk(&tree, Axis::Descendant, 0), vec![1, 4, 5, 6, 7, 8]);
        assert_eq!(walk(&tree, Axis::DescendantOrSelf, 7), vec![7, 8]);
        assert_eq!(walk(&tree, Axis::Descendant, 2), Vec::<usize>::new());
    }

    #[test]
    fn test_siblings() {
        let tree = create_test_tree();
        assert_eq!(walk(&tree, Axis::FollowingSibling, 1), vec![5, 6, 7]);
        assert_eq!(walk(&tree, Axis::PrecedingSibling, 7), vec![6, 5, 1]);
        assert_eq!(walk(&tree, Axis::FollowingSibling, 2), Vec::<usize>::new());
    }

    #[test]
    fn test_following_and_preceding() {
        let tree = create_test_tree();
        assert_eq!(walk(&tree, Axis::Following, 4), vec![5, 6, 7, 8]);
        assert_eq!(walk(&tree, Axis::Following, 1), vec![5, 6, 7, 8]);
        // From an attribute, the owner's content follows.
        assert_eq!(walk(&tree, Axis::Following, 3), vec![4, 5, 6, 7, 8]);
        assert_eq!(walk(&tree, Axis::Preceding, 6), vec![5, 4, 1]);
        // Ancestors are excluded.
        assert_eq!(walk(&tree, Axis::Preceding, 8), vec![6, 5, 4, 1]);
        assert_eq!(walk(&tree, Axis::Preceding, 2), Vec::<usize>::new());
    }

    #[test]
    fn test_node_tests() {
        let tree = create_test_tree();
        let para = tree.navigator_at(1);
        let lang = tree.navigator_at(3);
        let text = tree.navigator_at(4);
        let name = |local: &str| NodeTest::Name {
            namespace: None,
            local: local.to_string(),
        };
        assert!(name("para").matches(&para, Axis::Child));
        assert!(!name("para").matches(&para, Axis::Attribute));
        assert!(NodeTest::Any.matches(&lang, Axis::Attribute));
        assert!(!NodeTest::Any.matches(&text, Axis::Child));
        assert!(NodeTest::Text.matches(&text, Axis::Child));
        assert!(NodeTest::Node.matches(&text, Axis::Child));

        let xml = NamespaceBinding {
            prefix: "x".to_string(),
            uri: "http://www.w3.org/XML/1998/namespace".to_string(),
        };
        let qualified = NodeTest::Name {
            namespace: Some(xml.clone()),
            local: "lang".to_string(),
        };
        assert!(qualified.matches(&lang, Axis::Attribute));
        assert!(NodeTest::Namespace(xml).matches(&lang, Axis::Attribute));
    }
}
