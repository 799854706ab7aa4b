/*!
Binary encoding of an element tree.

# Format

Every element is written as:

```text
string(name)
u8(attributes count)
attributes count × (string(name), string(value))
content items
u8(ELEMENT_END)
```

A content item is a tag byte followed by a payload:

| Tag | Value | Payload |
|---------------|-------|-------------------|
| `ELEMENT`     | 0     | a nested element  |
| `CDATA`       | 1     | string            |
| `TEXT`        | 2     | string            |
| `ELEMENT_END` | 3     | none              |

A string is a big-endian `u16` length of the UTF-8 data followed by the data itself.

There is no children count. The content list is closed only by `ELEMENT_END`.
Text items that contain only XML whitespaces are not written at all.
Elements cannot be nested deeper than [`MAX_DEPTH`] levels.

[`MAX_DEPTH`]: constant.MAX_DEPTH.html
*/

use std::error;
use std::fmt;
use std::io::{self, Read, Write};
use std::mem;

use crate::{
    is_xml_whitespace,
    Attribute,
    Content,
    Node,
};

/// The maximum number of attributes per element.
pub const MAX_ATTRIBUTES: usize = 255;

/// The maximum length of a string in bytes.
///
/// Applies to names, attribute values, text and CDATA.
pub const MAX_STRING_LEN: usize = 65535;

/// The maximum element nesting depth.
///
/// The root element has a depth of 0. Deeper trees are rejected
/// by both the encoder and the decoder.
pub const MAX_DEPTH: usize = 1024;


/// A content tag.
///
/// Discriminants are the actual byte values of the format.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum Tag {
    /// A nested element follows.
    Element = 0,
    /// A CDATA string follows.
    CData = 1,
    /// A text string follows.
    Text = 2,
    /// The end of the current element.
    ElementEnd = 3,
}

impl Tag {
    /// Converts a byte into a tag.
    ///
    /// # Examples
    ///
    /// ```
    /// use xmlbin::codec::Tag;
    ///
    /// assert_eq!(Tag::from_u8(3), Some(Tag::ElementEnd));
    /// assert_eq!(Tag::from_u8(4), None);
    /// ```
    pub fn from_u8(byte: u8) -> Option<Tag> {
        match byte {
            0 => Some(Tag::Element),
            1 => Some(Tag::CData),
            2 => Some(Tag::Text),
            3 => Some(Tag::ElementEnd),
            _ => None,
        }
    }

    /// Returns the tag byte.
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}


/// A codec error.
#[derive(Debug)]
pub enum Error {
    /// The tree cannot be represented in the binary format.
    UnsupportedFormat(FormatError),

    /// The input is not a valid encoded element.
    MalformedStream(StreamError),

    /// An error from the underlying reader or writer.
    ///
    /// An unexpected end of the input is reported as
    /// `MalformedStream(StreamError::UnexpectedEnd)` instead.
    Io(io::Error),
}

impl Error {
    /// Checks that this is an `UnsupportedFormat` error.
    pub fn is_unsupported_format(&self) -> bool {
        match *self {
            Error::UnsupportedFormat(_) => true,
            _ => false,
        }
    }

    /// Checks that this is a `MalformedStream` error.
    pub fn is_malformed_stream(&self) -> bool {
        match *self {
            Error::MalformedStream(_) => true,
            _ => false,
        }
    }
}

impl From<FormatError> for Error {
    fn from(e: FormatError) -> Self {
        Error::UnsupportedFormat(e)
    }
}

impl From<StreamError> for Error {
    fn from(e: StreamError) -> Self {
        Error::MalformedStream(e)
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::UnsupportedFormat(ref e) => write!(f, "unsupported format: {}", e),
            Error::MalformedStream(ref e) => write!(f, "malformed stream: {}", e),
            Error::Io(ref e) => write!(f, "{}", e),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::UnsupportedFormat(ref e) => Some(e),
            Error::MalformedStream(ref e) => Some(e),
            Error::Io(ref e) => Some(e),
        }
    }
}


/// A tree that exceeds the format limits.
#[derive(Clone, PartialEq, Debug)]
pub enum FormatError {
    /// An element has more than 255 attributes.
    ///
    /// Contains the element name and the attributes count.
    TooManyAttributes(String, usize),

    /// A string is longer than 65535 bytes.
    StringTooLong(usize),

    /// Elements are nested deeper than `MAX_DEPTH`.
    ///
    /// Contains the name of the first element that is too deep.
    TooDeep(String),
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            FormatError::TooManyAttributes(ref name, count) => {
                write!(f, "element '{}' has {} attributes, but only {} are allowed",
                       name, count, MAX_ATTRIBUTES)
            }
            FormatError::StringTooLong(len) => {
                write!(f, "a string of {} bytes is longer than {} bytes", len, MAX_STRING_LEN)
            }
            FormatError::TooDeep(ref name) => {
                write!(f, "element '{}' is nested deeper than {} levels", name, MAX_DEPTH)
            }
        }
    }
}

impl error::Error for FormatError {}


/// An invalid input.
///
/// Each variant contains an offset in bytes from the start of the decoded element.
#[derive(Clone, PartialEq, Debug)]
pub enum StreamError {
    /// The input ended before the element was closed.
    ///
    /// The offset points to the start of the incomplete field.
    UnexpectedEnd(usize),

    /// An unknown content tag.
    UnknownTag(u8, usize),

    /// A string is not a valid UTF-8.
    InvalidUtf8(usize),

    /// An element has a duplicated attribute.
    DuplicatedAttribute(String, usize),

    /// Elements are nested deeper than `MAX_DEPTH`.
    ///
    /// The offset points to the `ELEMENT` tag of the first element that is too deep.
    TooDeep(usize),
}

impl StreamError {
    /// Returns the offset of the error in bytes.
    pub fn pos(&self) -> usize {
        match *self {
            StreamError::UnexpectedEnd(pos) => pos,
            StreamError::UnknownTag(_, pos) => pos,
            StreamError::InvalidUtf8(pos) => pos,
            StreamError::DuplicatedAttribute(_, pos) => pos,
            StreamError::TooDeep(pos) => pos,
        }
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            StreamError::UnexpectedEnd(pos) => {
                write!(f, "unexpected end of stream at {}", pos)
            }
            StreamError::UnknownTag(tag, pos) => {
                write!(f, "unknown content tag 0x{:02X} at {}", tag, pos)
            }
            StreamError::InvalidUtf8(pos) => {
                write!(f, "a string at {} is not a valid UTF-8", pos)
            }
            StreamError::DuplicatedAttribute(ref name, pos) => {
                write!(f, "attribute '{}' at {} is already defined", name, pos)
            }
            StreamError::TooDeep(pos) => {
                write!(f, "an element at {} is nested deeper than {} levels", pos, MAX_DEPTH)
            }
        }
    }
}

impl error::Error for StreamError {}


impl Node {
    /// Writes the element and its subtree into the writer.
    ///
    /// The data is written directly, so a buffered writer is preferred.
    ///
    /// # Examples
    ///
    /// ```
    /// let node = xmlbin::Node::new("e");
    ///
    /// let mut data = Vec::new();
    /// node.encode(&mut data).unwrap();
    /// assert_eq!(data, b"\x00\x01e\x00\x03");
    /// ```
    pub fn encode<W: Write>(&self, mut out: W) -> Result<(), Error> {
        write_node(self, &mut out)
    }

    /// Reads a single element from the reader.
    ///
    /// Reads exactly as many bytes as the element occupies,
    /// so the data after it stays in the reader.
    ///
    /// # Examples
    ///
    /// ```
    /// let mut data: &[u8] = b"\x00\x01e\x00\x03tail";
    /// let node = xmlbin::Node::decode(&mut data).unwrap();
    ///
    /// assert_eq!(node.name(), "e");
    /// assert_eq!(data, b"tail");
    /// ```
    pub fn decode<R: Read>(mut input: R) -> Result<Node, Error> {
        read_node(&mut input)
    }

    /// Encodes the element into a new buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut data = Vec::new();
        write_node(self, &mut data)?;
        Ok(data)
    }

    /// Decodes an element from the start of the data.
    ///
    /// Any data after the element is ignored.
    pub fn from_bytes(mut data: &[u8]) -> Result<Node, Error> {
        read_node(&mut data)
    }
}


/// Writes an element and its subtree.
///
/// Stops at the first error. The data already written is not reverted.
pub fn write_node<W: Write + ?Sized>(node: &Node, out: &mut W) -> Result<(), Error> {
    let mut w = Writer { out, len: 0 };
    write_element(node, 0, &mut w)?;
    debug!("encoded element '{}' into {} bytes", node.name, w.len);
    Ok(())
}

/// Reads a single element and its subtree.
///
/// Reads the input byte by byte and never past the closing `ELEMENT_END`.
pub fn read_node<R: Read + ?Sized>(input: &mut R) -> Result<Node, Error> {
    let mut r = Reader { input, pos: 0 };

    // Open ancestors of the current element.
    let mut stack: Vec<Node> = Vec::new();
    let mut node = read_head(&mut r)?;
    loop {
        let tag_pos = r.pos;
        let byte = r.read_u8()?;
        match Tag::from_u8(byte) {
            Some(Tag::Element) => {
                // The stack holds every ancestor, so its length is the current depth.
                if stack.len() >= MAX_DEPTH {
                    return Err(StreamError::TooDeep(tag_pos).into());
                }

                let child = read_head(&mut r)?;
                trace!("element '{}' at {}, depth {}", child.name, tag_pos, stack.len() + 1);
                stack.push(mem::replace(&mut node, child));
            }
            Some(Tag::Text) => {
                let text = r.read_str()?;
                node.content.push(Content::Text(text));
            }
            Some(Tag::CData) => {
                let text = r.read_str()?;
                node.content.push(Content::CData(text));
            }
            Some(Tag::ElementEnd) => {
                match stack.pop() {
                    Some(parent) => {
                        let child = mem::replace(&mut node, parent);
                        node.content.push(Content::Element(child));
                    }
                    None => {
                        debug!("decoded element '{}' from {} bytes", node.name, r.pos);
                        return Ok(node);
                    }
                }
            }
            None => {
                return Err(StreamError::UnknownTag(byte, tag_pos).into());
            }
        }
    }
}

fn write_element<W: Write + ?Sized>(
    node: &Node,
    depth: usize,
    w: &mut Writer<W>,
) -> Result<(), Error> {
    if depth > MAX_DEPTH {
        return Err(FormatError::TooDeep(node.name.clone()).into());
    }

    w.write_str(&node.name)?;
    write_attributes(node, w)?;

    for item in &node.content {
        match *item {
            Content::Element(ref child) => {
                w.write_tag(Tag::Element)?;
                write_element(child, depth + 1, w)?;
            }
            Content::Text(ref text) => {
                if !is_xml_whitespace(text) {
                    w.write_tag(Tag::Text)?;
                    w.write_str(text)?;
                }
            }
            Content::CData(ref text) => {
                w.write_tag(Tag::CData)?;
                w.write_str(text)?;
            }
        }
    }

    w.write_tag(Tag::ElementEnd)
}

fn write_attributes<W: Write + ?Sized>(node: &Node, w: &mut Writer<W>) -> Result<(), Error> {
    let count = node.attributes.len();
    if count > MAX_ATTRIBUTES {
        return Err(FormatError::TooManyAttributes(node.name.clone(), count).into());
    }

    w.write_bytes(&[count as u8])?;
    for attr in &node.attributes {
        w.write_str(&attr.name)?;
        w.write_str(&attr.value)?;
    }

    Ok(())
}

// Reads the element name and attributes.
fn read_head<R: Read + ?Sized>(r: &mut Reader<R>) -> Result<Node, Error> {
    let mut node = Node::new(r.read_str()?);

    let count = r.read_u8()? as usize;
    node.attributes.reserve(count);
    for _ in 0..count {
        let pos = r.pos;
        let name = r.read_str()?;
        let value = r.read_str()?;

        if node.has_attribute(&name) {
            return Err(StreamError::DuplicatedAttribute(name, pos).into());
        }

        node.attributes.push(Attribute { name, value });
    }

    Ok(node)
}


struct Writer<'a, W: Write + ?Sized> {
    out: &'a mut W,
    len: usize,
}

impl<'a, W: Write + ?Sized> Writer<'a, W> {
    fn write_bytes(&mut self, data: &[u8]) -> Result<(), Error> {
        self.out.write_all(data)?;
        self.len += data.len();
        Ok(())
    }

    fn write_tag(&mut self, tag: Tag) -> Result<(), Error> {
        self.write_bytes(&[tag.to_u8()])
    }

    fn write_str(&mut self, text: &str) -> Result<(), Error> {
        let len = text.len();
        if len > MAX_STRING_LEN {
            return Err(FormatError::StringTooLong(len).into());
        }

        self.write_bytes(&(len as u16).to_be_bytes())?;
        self.write_bytes(text.as_bytes())
    }
}


struct Reader<'a, R: Read + ?Sized> {
    input: &'a mut R,
    pos: usize,
}

impl<'a, R: Read + ?Sized> Reader<'a, R> {
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        match self.input.read_exact(buf) {
            Ok(()) => {
                self.pos += buf.len();
                Ok(())
            }
            Err(ref e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                Err(StreamError::UnexpectedEnd(self.pos).into())
            }
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn read_u8(&mut self) -> Result<u8, Error> {
        let mut buf = [0; 1];
        self.read_bytes(&mut buf)?;
        Ok(buf[0])
    }

    fn read_str(&mut self) -> Result<String, Error> {
        let start = self.pos;

        let mut len = [0; 2];
        self.read_bytes(&mut len)?;

        let mut buf = vec![0; u16::from_be_bytes(len) as usize];
        self.read_bytes(&mut buf).map_err(|e| match e {
            // Point to the string start and not to its data.
            Error::MalformedStream(StreamError::UnexpectedEnd(_)) => {
                Error::MalformedStream(StreamError::UnexpectedEnd(start))
            }
            e => e,
        })?;

        String::from_utf8(buf).map_err(|_| StreamError::InvalidUtf8(start).into())
    }
}
