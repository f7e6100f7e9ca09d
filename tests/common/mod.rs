//! A `Navigator` over `roxmltree` documents, shared by the integration tests
//! and benchmarks.
#![allow(dead_code)]

use navpath::{Navigator, NodeType, Value, select};
use roxmltree::{Document, Node};

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// A cursor over a parsed XML document.
///
/// roxmltree keeps attributes as data on their element, so an attribute
/// position is the owner element plus the attribute's index. Processing
/// instructions are skipped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct XmlNavigator<'a, 'input> {
    node: Node<'a, 'input>,
    attribute: Option<usize>,
}

fn visible(node: &Node) -> bool {
    !node.is_pi()
}

impl<'a, 'input> XmlNavigator<'a, 'input> {
    /// A cursor on the document root.
    pub fn root(doc: &'a Document<'input>) -> Self {
        XmlNavigator {
            node: doc.root(),
            attribute: None,
        }
    }

    fn attr(&self) -> Option<roxmltree::Attribute<'a, 'input>> {
        self.attribute.and_then(|i| self.node.attributes().nth(i))
    }

    fn jump(&mut self, target: Option<Node<'a, 'input>>) -> bool {
        match target {
            Some(node) => {
                self.node = node;
                true
            }
            None => false,
        }
    }
}

impl Navigator for XmlNavigator<'_, '_> {
    fn node_type(&self) -> NodeType {
        if self.attribute.is_some() {
            NodeType::Attribute
        } else if self.node.is_root() {
            NodeType::Root
        } else if self.node.is_text() {
            NodeType::Text
        } else if self.node.is_comment() {
            NodeType::Comment
        } else {
            NodeType::Element
        }
    }

    fn local_name(&self) -> &str {
        match self.attr() {
            Some(attr) => attr.name(),
            None if self.node.is_element() => self.node.tag_name().name(),
            None => "",
        }
    }

    fn prefix(&self) -> &str {
        let uri = match self.attribute {
            Some(_) => self.attr().and_then(|a| a.namespace()),
            None => self.node.tag_name().namespace(),
        };
        match uri {
            Some(XML_NAMESPACE) => "xml",
            Some(uri) => self.node.lookup_prefix(uri).unwrap_or(""),
            None => "",
        }
    }

    fn namespace_uri(&self) -> Option<&str> {
        match self.attribute {
            Some(_) => self.attr().and_then(|a| a.namespace()),
            None if self.node.is_element() => self.node.tag_name().namespace(),
            None => None,
        }
    }

    fn value(&self) -> String {
        if self.attribute.is_some() {
            return self.attr().map(|a| a.value().to_string()).unwrap_or_default();
        }
        if self.node.is_element() || self.node.is_root() {
            self.node
                .descendants()
                .filter(|n| n.is_text())
                .filter_map(|n| n.text())
                .collect()
        } else {
            self.node.text().unwrap_or("").to_string()
        }
    }

    fn move_to_root(&mut self) {
        self.node = self.node.document().root();
        self.attribute = None;
    }

    fn move_to_parent(&mut self) -> bool {
        if self.attribute.take().is_some() {
            return true;
        }
        let parent = self.node.parent();
        self.jump(parent)
    }

    fn move_to_next_attribute(&mut self) -> bool {
        let next = match self.attribute {
            Some(i) => i + 1,
            None if self.node.is_element() => 0,
            None => return false,
        };
        if next < self.node.attributes().len() {
            self.attribute = Some(next);
            true
        } else {
            false
        }
    }

    fn move_to_child(&mut self) -> bool {
        if self.attribute.is_some() {
            return false;
        }
        let child = self.node.children().find(visible);
        self.jump(child)
    }

    fn move_to_first(&mut self) -> bool {
        if self.attribute.is_some() {
            return false;
        }
        let first = self.node.parent().and_then(|p| p.children().find(visible));
        self.jump(first)
    }

    fn move_to_next(&mut self) -> bool {
        if self.attribute.is_some() {
            return false;
        }
        let next = self.node.next_siblings().skip(1).find(visible);
        self.jump(next)
    }

    fn move_to_previous(&mut self) -> bool {
        if self.attribute.is_some() {
            return false;
        }
        let previous = self.node.prev_siblings().skip(1).find(visible);
        self.jump(previous)
    }

    fn move_to(&mut self, other: &Self) -> bool {
        if !std::ptr::eq(self.node.document(), other.node.document()) {
            return false;
        }
        *self = *other;
        true
    }
}

/// A readable label for a selected node: `name`, `@name`, `#text`, `#comment` or `/`.
pub fn label(nav: &XmlNavigator) -> String {
    match nav.node_type() {
        NodeType::Root => "/".to_string(),
        NodeType::Element => nav.local_name().to_string(),
        NodeType::Attribute => format!("@{}", nav.local_name()),
        NodeType::Text => "#text".to_string(),
        NodeType::Comment => "#comment".to_string(),
    }
}

/// Labels of the nodes `expr` selects from the root.
pub fn select_labels(doc: &Document, expr: &str) -> Vec<String> {
    let root = XmlNavigator::root(doc);
    select(&root, expr)
        .expect("expression should compile")
        .map(|n| label(&n))
        .collect()
}

/// String values of the nodes `expr` selects from the root.
pub fn select_values(doc: &Document, expr: &str) -> Vec<String> {
    let root = XmlNavigator::root(doc);
    select(&root, expr)
        .expect("expression should compile")
        .map(|n| n.value())
        .collect()
}

/// The string value of evaluating `expr` at the root.
pub fn eval_string(doc: &Document, expr: &str) -> String {
    eval(doc, expr, |v| v.to_string())
}

pub fn eval_number(doc: &Document, expr: &str) -> f64 {
    eval(doc, expr, |v| v.to_number())
}

pub fn eval_bool(doc: &Document, expr: &str) -> bool {
    eval(doc, expr, |v| v.to_bool())
}

fn eval<T>(doc: &Document, expr: &str, coerce: impl FnOnce(&Value<XmlNavigator>) -> T) -> T {
    let root = XmlNavigator::root(doc);
    let value = navpath::evaluate(&root, expr).expect("expression should compile");
    coerce(&value)
}

pub const LIBRARY: &str = r#"<?xml version="1.0"?>
<library xmlns:bk="urn:books">
  <!-- catalogue -->
  <shelf id="s1" xml:lang="en">
    <book id="b1" year="1999"><title>Alpha</title><price>10</price></book>
    <book id="b2" year="2005"><title>Beta</title><price>25.5</price></book>
    <bk:note>first shelf</bk:note>
  </shelf>
  <shelf id="s2" xml:lang="de-CH">
    <book id="b3" year="2011"><title>Gamma</title><price>7</price>
      <book id="b4" year="2012"><title>Delta</title><price>3</price></book>
    </book>
  </shelf>
</library>"#;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
