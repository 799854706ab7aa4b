/*!
A compact binary representation of an XML element tree.

A document is kept as an owned tree of [`Node`]s. The tree can be:

- built by hand or parsed from XML text via [`Node::parse`],
- written to a dense byte stream via [`Node::encode`] and read back via [`Node::decode`],
- printed back as XML text via the `Display` implementation.

The binary form is much faster to load than the XML text and usually smaller,
while keeping the same logical model: elements, attributes, text and CDATA.

Whitespace-only text is not stored in the binary form.
Everything else round-trips exactly.

See the [`codec`] module for the wire format.

[`Node`]: struct.Node.html
[`Node::parse`]: struct.Node.html#method.parse
[`Node::encode`]: struct.Node.html#method.encode
[`Node::decode`]: struct.Node.html#method.decode
[`codec`]: codec/index.html
*/

#![doc(html_root_url = "https://docs.rs/xmlbin/0.1.0")]

#![forbid(unsafe_code)]
#![warn(missing_docs)]

#[macro_use]
extern crate log;
extern crate xmlparser;

use std::fmt;
use std::slice;

pub use xmlparser::TextPos;

pub mod codec;
mod parse;
mod writer;


pub use codec::{Error, FormatError, StreamError, read_node, write_node};
pub use parse::*;


/// An element node.
///
/// Owns its attributes and its content. The content order is the document order
/// of the original text and elements.
///
/// # Examples
///
/// ```
/// use xmlbin::Node;
///
/// let node = Node::new("svg")
///     .with_attribute("width", "10")
///     .with_child(Node::new("rect"))
///     .with_text("caption");
///
/// assert_eq!(node.name(), "svg");
/// assert_eq!(node.attribute("width"), Some("10"));
/// assert_eq!(node.children().count(), 1);
/// assert_eq!(node.text(), "caption");
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Node {
    name: String,
    attributes: Vec<Attribute>,
    content: Vec<Content>,
}

impl Node {
    /// Creates a new element without attributes and content.
    pub fn new<S: Into<String>>(name: S) -> Self {
        Node {
            name: name.into(),
            attributes: Vec::new(),
            content: Vec::new(),
        }
    }

    /// Returns element's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets element's name.
    pub fn set_name<S: Into<String>>(&mut self, name: S) {
        self.name = name.into();
    }

    /// Returns element's attributes in insertion order.
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Returns element's attribute value.
    ///
    /// # Examples
    ///
    /// ```
    /// let node = xmlbin::Node::new("e").with_attribute("a", "b");
    ///
    /// assert_eq!(node.attribute("a"), Some("b"));
    /// assert_eq!(node.attribute("c"), None);
    /// ```
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.iter().find(|a| a.name == name).map(|a| a.value.as_str())
    }

    /// Checks that element has a specified attribute.
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.name == name)
    }

    /// Sets an attribute value.
    ///
    /// An existing attribute keeps its position and gets a new value.
    /// Otherwise the attribute is appended.
    ///
    /// # Examples
    ///
    /// ```
    /// let mut node = xmlbin::Node::new("e");
    /// node.set_attribute("a", "1");
    /// node.set_attribute("b", "2");
    /// node.set_attribute("a", "3");
    ///
    /// let names: Vec<_> = node.attributes().iter().map(|a| a.name()).collect();
    /// assert_eq!(names, ["a", "b"]);
    /// assert_eq!(node.attribute("a"), Some("3"));
    /// ```
    pub fn set_attribute<N, V>(&mut self, name: N, value: V)
        where N: Into<String>, V: Into<String>
    {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(attr) => attr.value = value,
            None => self.attributes.push(Attribute { name, value }),
        }
    }

    /// Removes an attribute and returns its value.
    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let idx = self.attributes.iter().position(|a| a.name == name)?;
        Some(self.attributes.remove(idx).value)
    }

    /// Returns element's content.
    pub fn content(&self) -> &[Content] {
        &self.content
    }

    /// Returns element's content for modification.
    pub fn content_mut(&mut self) -> &mut Vec<Content> {
        &mut self.content
    }

    /// Appends a content item.
    pub fn push(&mut self, content: Content) {
        self.content.push(content);
    }

    /// Appends a child element.
    pub fn push_element(&mut self, node: Node) {
        self.content.push(Content::Element(node));
    }

    /// Appends a text item.
    pub fn push_text<S: Into<String>>(&mut self, text: S) {
        self.content.push(Content::Text(text.into()));
    }

    /// Appends a CDATA item.
    pub fn push_cdata<S: Into<String>>(&mut self, text: S) {
        self.content.push(Content::CData(text.into()));
    }

    /// Sets an attribute and returns the element.
    pub fn with_attribute<N, V>(mut self, name: N, value: V) -> Self
        where N: Into<String>, V: Into<String>
    {
        self.set_attribute(name, value);
        self
    }

    /// Appends a child element and returns the element.
    pub fn with_child(mut self, node: Node) -> Self {
        self.push_element(node);
        self
    }

    /// Appends a text item and returns the element.
    pub fn with_text<S: Into<String>>(mut self, text: S) -> Self {
        self.push_text(text);
        self
    }

    /// Appends a CDATA item and returns the element.
    pub fn with_cdata<S: Into<String>>(mut self, text: S) -> Self {
        self.push_cdata(text);
        self
    }

    /// Returns true if this element has any content.
    pub fn has_children(&self) -> bool {
        !self.content.is_empty()
    }

    /// Returns an iterator over child elements.
    pub fn children(&self) -> Children<'_> {
        Children(self.content.iter())
    }

    /// Returns the first child element with a specified name.
    pub fn first_child(&self, name: &str) -> Option<&Node> {
        self.children().find(|n| n.name == name)
    }

    /// Returns the concatenated text and CDATA of this element.
    ///
    /// Only direct content is used.
    ///
    /// # Examples
    ///
    /// ```
    /// let node = xmlbin::Node::parse("<p>a<b>c</b><![CDATA[<d>]]></p>").unwrap();
    ///
    /// assert_eq!(node.text(), "a<d>");
    /// ```
    pub fn text(&self) -> String {
        let mut s = String::new();
        for item in &self.content {
            match *item {
                Content::Text(ref text) | Content::CData(ref text) => s.push_str(text),
                Content::Element(_) => {}
            }
        }
        s
    }

    /// Returns an iterator over this element and its descendant elements.
    ///
    /// Elements are visited in document order.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        macro_rules! writeln_indented {
            ($depth:expr, $f:expr, $fmt:expr) => {
                for _ in 0..$depth { write!($f, "    ")?; }
                writeln!($f, $fmt)?;
            };
            ($depth:expr, $f:expr, $fmt:expr, $($arg:tt)*) => {
                for _ in 0..$depth { write!($f, "    ")?; }
                writeln!($f, $fmt, $($arg)*)?;
            };
        }

        fn print_node(node: &Node, depth: usize, f: &mut fmt::Formatter)
            -> Result<(), fmt::Error>
        {
            writeln_indented!(depth, f, "Element {{");
            writeln_indented!(depth, f, "    name: {:?}", node.name);

            if !node.attributes.is_empty() {
                writeln_indented!(depth, f, "    attributes: [");
                for attr in &node.attributes {
                    writeln_indented!(depth + 2, f, "{:?}", attr);
                }
                writeln_indented!(depth, f, "    ]");
            }

            if !node.content.is_empty() {
                writeln_indented!(depth, f, "    content: [");
                for item in &node.content {
                    match *item {
                        Content::Element(ref child) => print_node(child, depth + 2, f)?,
                        Content::Text(ref text) => {
                            writeln_indented!(depth + 2, f, "Text({:?})", text);
                        }
                        Content::CData(ref text) => {
                            writeln_indented!(depth + 2, f, "CData({:?})", text);
                        }
                    }
                }
                writeln_indented!(depth, f, "    ]");
            }

            writeln_indented!(depth, f, "}}");
            Ok(())
        }

        print_node(self, 0, f)
    }
}


/// An attribute.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Attribute {
    name: String,
    value: String,
}

impl Attribute {
    /// Creates a new attribute.
    pub fn new<N, V>(name: N, value: V) -> Self
        where N: Into<String>, V: Into<String>
    {
        Attribute { name: name.into(), value: value.into() }
    }

    /// Returns attribute's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns attribute's value.
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "Attribute {{ name: {:?}, value: {:?} }}", self.name, self.value)
    }
}


/// A content item of an element.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Content {
    /// A child element.
    Element(Node),
    /// A character data.
    ///
    /// Whitespace-only text is not preserved by the binary encoding.
    Text(String),
    /// A CDATA section.
    ///
    /// Always preserved as is.
    CData(String),
}

impl Content {
    /// Returns the element, if this item is an element.
    pub fn as_element(&self) -> Option<&Node> {
        match *self {
            Content::Element(ref node) => Some(node),
            _ => None,
        }
    }

    /// Returns the text, if this item is a text or a CDATA.
    pub fn as_text(&self) -> Option<&str> {
        match *self {
            Content::Text(ref text) | Content::CData(ref text) => Some(text),
            Content::Element(_) => None,
        }
    }

    /// Checks that item is an element.
    pub fn is_element(&self) -> bool {
        match *self {
            Content::Element(_) => true,
            _ => false,
        }
    }

    /// Checks that item is a text.
    pub fn is_text(&self) -> bool {
        match *self {
            Content::Text(_) => true,
            _ => false,
        }
    }

    /// Checks that item is a CDATA section.
    pub fn is_cdata(&self) -> bool {
        match *self {
            Content::CData(_) => true,
            _ => false,
        }
    }

    /// Checks that item is a text that consists only of XML whitespaces.
    ///
    /// Such items are skipped by the encoder. CDATA is never treated as whitespace.
    pub fn is_whitespace_text(&self) -> bool {
        match *self {
            Content::Text(ref text) => is_xml_whitespace(text),
            _ => false,
        }
    }
}

impl From<Node> for Content {
    fn from(node: Node) -> Self {
        Content::Element(node)
    }
}


/// Checks that the string consists only of
/// [XML whitespaces](https://www.w3.org/TR/xml/#NT-S).
///
/// An empty string is also a whitespace string.
///
/// # Examples
///
/// ```
/// assert!(xmlbin::is_xml_whitespace(" \t\r\n"));
/// assert!(xmlbin::is_xml_whitespace(""));
/// assert!(!xmlbin::is_xml_whitespace(" a "));
/// // Not an XML whitespace.
/// assert!(!xmlbin::is_xml_whitespace("\u{A0}"));
/// ```
pub fn is_xml_whitespace(text: &str) -> bool {
    text.bytes().all(|c| match c {
        b' ' | b'\t' | b'\r' | b'\n' => true,
        _ => false,
    })
}


/// Iterator over child elements.
#[derive(Clone)]
pub struct Children<'a>(slice::Iter<'a, Content>);

impl<'a> Iterator for Children<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.by_ref().filter_map(Content::as_element).next()
    }
}

impl<'a> DoubleEndedIterator for Children<'a> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.0.by_ref().rev().filter_map(Content::as_element).next()
    }
}


/// Iterator over an element and its descendants.
#[derive(Clone)]
pub struct Descendants<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        // Reversed, so the first child is popped first.
        self.stack.extend(node.children().rev());
        Some(node)
    }
}
