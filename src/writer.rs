use std::fmt::{self, Write};

use crate::{
    Content,
    Node,
};

#[derive(Clone, Copy, PartialEq)]
enum Escape {
    Text,
    AttributeValue,
}

/// Writes an element as a compact XML string.
///
/// No indentation is added, so the text content is preserved as is.
///
/// # Examples
///
/// ```
/// let node = xmlbin::Node::new("e")
///     .with_attribute("a", "\"1\"")
///     .with_text("a < b")
///     .with_cdata("<c/>");
///
/// assert_eq!(node.to_string(), "<e a=\"&quot;1&quot;\">a &lt; b<![CDATA[<c/>]]></e>");
/// ```
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write_element(self, f)
    }
}

fn write_element(node: &Node, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "<{}", node.name)?;
    for attr in &node.attributes {
        write!(f, " {}=\"", attr.name)?;
        write_escaped(&attr.value, Escape::AttributeValue, f)?;
        f.write_char('"')?;
    }

    if node.content.is_empty() {
        return f.write_str("/>");
    }

    f.write_char('>')?;
    for item in &node.content {
        match *item {
            Content::Element(ref child) => write_element(child, f)?,
            Content::Text(ref text) => write_escaped(text, Escape::Text, f)?,
            Content::CData(ref text) => write_cdata(text, f)?,
        }
    }

    write!(f, "</{}>", node.name)
}

// `]]>` cannot appear inside a CDATA section, so it's split between two sections.
fn write_cdata(text: &str, f: &mut fmt::Formatter) -> fmt::Result {
    f.write_str("<![CDATA[")?;
    f.write_str(&text.replace("]]>", "]]]]><![CDATA[>"))?;
    f.write_str("]]>")
}

fn write_escaped(text: &str, escape: Escape, f: &mut fmt::Formatter) -> fmt::Result {
    let is_attr = escape == Escape::AttributeValue;

    let mut last = 0;
    for (idx, c) in text.bytes().enumerate() {
        let replacement = match c {
            b'&' => "&amp;",
            b'<' => "&lt;",
            b'>' if !is_attr => "&gt;",
            b'"' if is_attr => "&quot;",
            // Otherwise would be normalized by a parser.
            b'\r' => "&#xD;",
            b'\n' if is_attr => "&#xA;",
            b'\t' if is_attr => "&#x9;",
            _ => continue,
        };

        f.write_str(&text[last..idx])?;
        f.write_str(replacement)?;
        last = idx + 1;
    }

    f.write_str(&text[last..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_element() {
        assert_eq!(Node::new("e").to_string(), "<e/>");
    }

    #[test]
    fn attribute_whitespaces() {
        let node = Node::new("e").with_attribute("a", "1\t2\n3\r4");
        assert_eq!(node.to_string(), "<e a=\"1&#x9;2&#xA;3&#xD;4\"/>");
    }

    #[test]
    fn split_cdata() {
        let node = Node::new("e").with_cdata("a]]>b");
        assert_eq!(node.to_string(), "<e><![CDATA[a]]]]><![CDATA[>b]]></e>");
    }

    #[test]
    fn nested() {
        let node = Node::new("a")
            .with_child(Node::new("b").with_text("t"))
            .with_text("&");
        assert_eq!(node.to_string(), "<a><b>t</b>&amp;</a>");
    }
}
