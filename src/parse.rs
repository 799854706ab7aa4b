use std::error;
use std::fmt;

use xmlparser::{
    self,
    ElementEnd,
    EntityDefinition,
    StrSpan,
    TextPos,
    Token,
};

use crate::codec::MAX_DEPTH;
use crate::{
    Attribute,
    Content,
    Node,
};

const ENTITY_DEPTH: u8 = 10;

// The length of a text or an attribute value after which
// no more DTD entities are expanded into it.
const ENTITY_EXPANSION_LIMIT: usize = 1 << 20;


/// Parsing options.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ParsingOptions {
    /// Allow DTD parsing.
    ///
    /// When set, internal entities declared in the DTD are expanded as text.
    /// Otherwise a document with a DTD is rejected.
    ///
    /// Default: false
    pub allow_dtd: bool,
}

impl Default for ParsingOptions {
    fn default() -> Self {
        ParsingOptions {
            allow_dtd: false,
        }
    }
}


/// A list of all possible XML parsing errors.
#[derive(Debug)]
pub enum ParseError {
    /// Incorrect tree structure.
    #[allow(missing_docs)]
    UnexpectedCloseTag { expected: String, actual: String, pos: TextPos },

    /// The document ended before the root element was closed.
    UnexpectedEndOfStream,

    /// A reference to an entity that was not defined in the DTD.
    UnknownEntityReference(String, TextPos),

    /// A reference that is not terminated by `;` or has an invalid character code.
    MalformedReference(TextPos),

    /// A possible entity reference loop.
    EntityReferenceLoop(TextPos),

    /// Entity expansion produces too much text.
    EntityExpansionLimit(TextPos),

    /// Elements are nested deeper than `codec::MAX_DEPTH`.
    ElementTooDeep(TextPos),

    /// An element has a duplicated attributes.
    DuplicatedAttribute(String, TextPos),

    /// The document contains a DTD, but `ParsingOptions::allow_dtd` is not set.
    DtdDetected,

    /// The XML document must have at least one element.
    NoRootNode,

    /// Errors detected by the `xmlparser` crate.
    ParserError(xmlparser::Error),
}

impl From<xmlparser::Error> for ParseError {
    fn from(e: xmlparser::Error) -> Self {
        ParseError::ParserError(e)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ParseError::UnexpectedCloseTag { ref expected, ref actual, pos } => {
                write!(f, "expected '{}' tag, not '{}' at {}", expected, actual, pos)
            }
            ParseError::UnexpectedEndOfStream => {
                write!(f, "unexpected end of stream")
            }
            ParseError::UnknownEntityReference(ref name, pos) => {
                write!(f, "unknown entity reference '{}' at {}", name, pos)
            }
            ParseError::MalformedReference(pos) => {
                write!(f, "malformed reference at {}", pos)
            }
            ParseError::EntityReferenceLoop(pos) => {
                write!(f, "a possible entity reference loop is detected at {}", pos)
            }
            ParseError::EntityExpansionLimit(pos) => {
                write!(f, "entity expansion at {} produces too much text", pos)
            }
            ParseError::ElementTooDeep(pos) => {
                write!(f, "an element at {} is nested deeper than {} levels", pos, MAX_DEPTH)
            }
            ParseError::DuplicatedAttribute(ref name, pos) => {
                write!(f, "attribute '{}' at {} is already defined", name, pos)
            }
            ParseError::DtdDetected => {
                write!(f, "XML with DTD detected")
            }
            ParseError::NoRootNode => {
                write!(f, "the document does not have a root node")
            }
            ParseError::ParserError(ref err) => {
                write!(f, "{}", err)
            }
        }
    }
}

impl error::Error for ParseError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            ParseError::ParserError(ref err) => Some(err),
            _ => None,
        }
    }
}


impl Node {
    /// Parses the input XML string into an element tree.
    ///
    /// Returns the root element. Comments, processing instructions
    /// and the XML declaration are skipped. Namespaces are not resolved,
    /// so prefixed names are stored as is.
    ///
    /// # Examples
    ///
    /// ```
    /// let node = xmlbin::Node::parse("<e a='b'>text</e>").unwrap();
    ///
    /// assert_eq!(node.name(), "e");
    /// assert_eq!(node.attribute("a"), Some("b"));
    /// assert_eq!(node.text(), "text");
    /// ```
    pub fn parse(text: &str) -> Result<Node, ParseError> {
        Self::parse_with_options(text, ParsingOptions::default())
    }

    /// Parses the input XML string with the specified options.
    ///
    /// # Examples
    ///
    /// ```
    /// let opt = xmlbin::ParsingOptions { allow_dtd: true };
    /// let node = xmlbin::Node::parse_with_options(
    ///     "<!DOCTYPE e [<!ENTITY n 'name'>]><e>&n;</e>", opt
    /// ).unwrap();
    ///
    /// assert_eq!(node.text(), "name");
    /// ```
    pub fn parse_with_options(text: &str, opt: ParsingOptions) -> Result<Node, ParseError> {
        parse(text, opt)
    }
}


struct Entity<'d> {
    name: &'d str,
    value: &'d str,
}

struct ParserData<'d> {
    text: &'d str,
    opt: ParsingOptions,
    entities: Vec<Entity<'d>>,
    // An element that is waiting for its attributes.
    pending: Option<Node>,
    // Open elements.
    stack: Vec<Node>,
    root: Option<Node>,
}

#[derive(Clone, Copy, PartialEq)]
enum Normalization {
    Text,
    Attribute,
}

fn parse(text: &str, opt: ParsingOptions) -> Result<Node, ParseError> {
    let mut pd = ParserData {
        text,
        opt,
        entities: Vec::new(),
        pending: None,
        stack: Vec::new(),
        root: None,
    };

    for token in xmlparser::Tokenizer::from(text) {
        process_token(token?, &mut pd)?;
    }

    if !pd.stack.is_empty() || pd.pending.is_some() {
        return Err(ParseError::UnexpectedEndOfStream);
    }

    pd.root.ok_or(ParseError::NoRootNode)
}

fn process_token<'d>(token: Token<'d>, pd: &mut ParserData<'d>) -> Result<(), ParseError> {
    match token {
        Token::DtdStart { .. } | Token::EmptyDtd { .. } => {
            if !pd.opt.allow_dtd {
                return Err(ParseError::DtdDetected);
            }
        }
        Token::EntityDeclaration { name, definition, .. } => {
            if let EntityDefinition::EntityValue(value) = definition {
                pd.entities.push(Entity { name: name.as_str(), value: value.as_str() });
            }
        }
        Token::ElementStart { prefix, local, span } => {
            // The root element is at the depth 0.
            if pd.stack.len() > MAX_DEPTH {
                return Err(ParseError::ElementTooDeep(text_pos_at(pd.text, span.start())));
            }

            pd.pending = Some(Node::new(gen_qname_string(prefix.as_str(), local.as_str())));
        }
        Token::Attribute { prefix, local, value, .. } => {
            process_attribute(prefix, local, value, pd)?;
        }
        Token::ElementEnd { end, span } => {
            process_element(end, span, pd)?;
        }
        Token::Text { text } => {
            // Whitespaces outside the root element.
            if pd.stack.is_empty() {
                return Ok(());
            }

            let mut buf = String::with_capacity(text.as_str().len());
            expand(text.as_str(), text.start(), Normalization::Text, 0, pd, &mut buf)?;
            append_text(buf, pd);
        }
        Token::Cdata { text, .. } => {
            if let Some(parent) = pd.stack.last_mut() {
                parent.push_cdata(text.as_str());
            }
        }
        _ => {}
    }

    Ok(())
}

fn process_attribute<'d>(
    prefix: StrSpan<'d>,
    local: StrSpan<'d>,
    value: StrSpan<'d>,
    pd: &mut ParserData<'d>,
) -> Result<(), ParseError> {
    let mut buf = String::with_capacity(value.as_str().len());
    expand(value.as_str(), value.start(), Normalization::Attribute, 0, pd, &mut buf)?;

    let name = gen_qname_string(prefix.as_str(), local.as_str());
    let attr_pos = if prefix.as_str().is_empty() { local } else { prefix }.start();

    // `ElementStart` always precedes attributes.
    if let Some(ref mut node) = pd.pending {
        if node.has_attribute(&name) {
            let pos = text_pos_at(pd.text, attr_pos);
            return Err(ParseError::DuplicatedAttribute(name, pos));
        }

        node.attributes.push(Attribute { name, value: buf });
    }

    Ok(())
}

fn process_element<'d>(
    end: ElementEnd<'d>,
    span: StrSpan<'d>,
    pd: &mut ParserData<'d>,
) -> Result<(), ParseError> {
    match end {
        ElementEnd::Open => {
            if let Some(node) = pd.pending.take() {
                pd.stack.push(node);
            }
        }
        ElementEnd::Empty => {
            if let Some(node) = pd.pending.take() {
                append_element(node, pd);
            }
        }
        ElementEnd::Close(prefix, local) => {
            let actual = gen_qname_string(prefix.as_str(), local.as_str());
            let expected = match pd.stack.pop() {
                Some(node) => {
                    if node.name == actual {
                        append_element(node, pd);
                        return Ok(());
                    }

                    node.name
                }
                None => String::new(),
            };

            return Err(ParseError::UnexpectedCloseTag {
                expected,
                actual,
                pos: text_pos_at(pd.text, span.start()),
            });
        }
    }

    Ok(())
}

fn append_element(node: Node, pd: &mut ParserData) {
    match pd.stack.last_mut() {
        Some(parent) => parent.push_element(node),
        None => pd.root = Some(node),
    }
}

// Adjacent text runs, like the ones split by a comment, are merged.
fn append_text(text: String, pd: &mut ParserData) {
    let parent = match pd.stack.last_mut() {
        Some(parent) => parent,
        None => return,
    };

    if let Some(Content::Text(prev)) = parent.content.last_mut() {
        prev.push_str(&text);
        return;
    }

    parent.content.push(Content::Text(text));
}

// Resolves references and normalizes whitespaces.
//
// https://www.w3.org/TR/xml/#sec-line-ends
// https://www.w3.org/TR/xml/#AVNormalize
//
// `pos` is the position of `text` in the original document. Nested entities
// report errors at the position of the outermost reference.
fn expand(
    text: &str,
    pos: usize,
    mode: Normalization,
    depth: u8,
    pd: &ParserData,
    buf: &mut String,
) -> Result<(), ParseError> {
    let err_pos = |idx: usize| {
        let idx = if depth == 0 { pos + idx } else { pos };
        text_pos_at(pd.text, idx)
    };

    let mut chars = text.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        match c {
            '&' => {
                let end = match text[idx..].find(';') {
                    Some(end) => idx + end,
                    None => return Err(ParseError::MalformedReference(err_pos(idx))),
                };

                let name = &text[idx + 1..end];
                while let Some(&(i, _)) = chars.peek() {
                    if i > end {
                        break;
                    }
                    chars.next();
                }

                if name.starts_with('#') {
                    match parse_char_ref(&name[1..]) {
                        Some(ch) => buf.push(ch),
                        None => return Err(ParseError::MalformedReference(err_pos(idx))),
                    }
                    continue;
                }

                if let Some(ch) = predefined_entity(name) {
                    buf.push(ch);
                    continue;
                }

                let entity = match pd.entities.iter().find(|e| e.name == name) {
                    Some(entity) => entity,
                    None => {
                        let pos = err_pos(idx);
                        return Err(ParseError::UnknownEntityReference(name.to_string(), pos));
                    }
                };

                if depth >= ENTITY_DEPTH {
                    return Err(ParseError::EntityReferenceLoop(err_pos(idx)));
                }

                if buf.len() > ENTITY_EXPANSION_LIMIT {
                    return Err(ParseError::EntityExpansionLimit(err_pos(idx)));
                }

                let outer_pos = if depth == 0 { pos + idx } else { pos };
                expand(entity.value, outer_pos, mode, depth + 1, pd, buf)?;
            }
            '\r' => {
                // \r in \r\n should be ignored.
                if let Some(&(_, '\n')) = chars.peek() {
                    continue;
                }

                buf.push(if mode == Normalization::Text { '\n' } else { ' ' });
            }
            '\n' | '\t' if mode == Normalization::Attribute => buf.push(' '),
            _ => buf.push(c),
        }
    }

    Ok(())
}

fn parse_char_ref(code: &str) -> Option<char> {
    let n = if code.starts_with('x') {
        u32::from_str_radix(&code[1..], 16).ok()?
    } else {
        code.parse::<u32>().ok()?
    };

    std::char::from_u32(n)
}

fn predefined_entity(name: &str) -> Option<char> {
    match name {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "apos" => Some('\''),
        "quot" => Some('"'),
        _ => None,
    }
}

fn gen_qname_string(prefix: &str, local: &str) -> String {
    if prefix.is_empty() {
        local.to_string()
    } else {
        format!("{}:{}", prefix, local)
    }
}

fn text_pos_at(text: &str, pos: usize) -> TextPos {
    let mut pos = pos.min(text.len());
    while !text.is_char_boundary(pos) {
        pos -= 1;
    }

    let before = &text[..pos];
    let row = before.bytes().filter(|c| *c == b'\n').count() + 1;
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let col = before[line_start..].chars().count() + 1;
    TextPos::new(row as u32, col as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_pos_01() {
        let text = "<e>\n  <a/>\n</e>";
        assert_eq!(text_pos_at(text, 0), TextPos::new(1, 1));
        assert_eq!(text_pos_at(text, 6), TextPos::new(2, 3));
        assert_eq!(text_pos_at(text, 100), TextPos::new(3, 5));
    }

    #[test]
    fn char_ref_01() {
        assert_eq!(parse_char_ref("x41"), Some('A'));
        assert_eq!(parse_char_ref("65"), Some('A'));
        assert_eq!(parse_char_ref("xD800"), None);
        assert_eq!(parse_char_ref("x"), None);
        assert_eq!(parse_char_ref("abc"), None);
    }
}
