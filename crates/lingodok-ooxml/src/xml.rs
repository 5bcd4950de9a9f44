//! Lossless XML tree codec
//!
//! Parts are parsed into an owned tree of [`Node`]s and written back out
//! byte-for-byte. Every node remembers how it was spelled in the source
//! (entity forms, attribute quoting, spacing inside start tags, CDATA
//! sections) and keeps emitting that spelling until it is mutated.
//!
//! ```
//! use lingodok_ooxml::xml::{self, CodecOptions};
//!
//! let source = r#"<?xml version="1.0"?><w:p><w:t xml:space='preserve'>A &amp; B</w:t></w:p>"#;
//! let options = CodecOptions::default();
//! let doc = xml::parse(source, &options)?;
//!
//! assert_eq!(doc.root().find("w:t").unwrap().text(), "A & B");
//! assert_eq!(xml::serialize(&doc, &options), source);
//! # Ok::<(), lingodok_ooxml::OoxmlError>(())
//! ```

use std::borrow::Cow;

use quick_xml::escape::{escape, partial_escape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{OoxmlError, Result};

/// Parser and serializer settings, passed to every codec call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecOptions {
    /// Reject end tags that do not match their start tag
    pub check_end_names: bool,

    /// Drop leading and trailing whitespace of text nodes (lossy)
    pub trim_text: bool,

    /// Write childless elements as `<a></a>` instead of their source form
    pub expand_empty_elements: bool,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            check_end_names: true,
            trim_text: false,
            expand_empty_elements: false,
        }
    }
}

/// A parsed XML part: prolog, single root element, epilog
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    bom: bool,
    prolog: Vec<Node>,
    root: Element,
    epilog: Vec<Node>,
}

impl XmlDocument {
    /// Create a document around a root element with no prolog
    pub fn new(root: Element) -> Self {
        Self {
            bom: false,
            prolog: Vec::new(),
            root,
            epilog: Vec::new(),
        }
    }

    /// The root element
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// The root element, mutably
    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    /// Declaration, comments and whitespace before the root element
    pub fn prolog(&self) -> &[Node] {
        &self.prolog
    }
}

/// One node of an XML tree
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// An element with ordered attributes and children
    Element(Element),
    /// Character data (including CDATA sections)
    Text(Text),
    /// Comments, processing instructions and declarations, kept verbatim
    Markup(String),
}

impl Node {
    /// Borrow as an element
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Borrow as a mutable element
    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }
}

/// An XML element
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    tag: String,
    attributes: Attributes,
    /// Child nodes in document order
    pub children: Vec<Node>,
    self_closing: bool,
}

impl Element {
    /// Create an empty element with a qualified tag name such as `w:t`
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Attributes::default(),
            children: Vec::new(),
            self_closing: true,
        }
    }

    /// Builder: add an attribute
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.set(name, value);
        self
    }

    /// Builder: append a child node
    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// Builder: append a text child
    pub fn with_text(self, content: impl Into<String>) -> Self {
        self.with_child(Node::Text(Text::new(content)))
    }

    /// Qualified tag name, prefix included
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Ordered attributes
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Ordered attributes, mutably
    pub fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }

    /// Child elements in document order, skipping text and markup
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// First element with the given tag in pre-order, starting with `self`
    pub fn find(&self, tag: &str) -> Option<&Element> {
        if self.tag == tag {
            return Some(self);
        }
        self.child_elements().find_map(|child| child.find(tag))
    }

    /// Mutable variant of [`Element::find`]
    pub fn find_mut(&mut self, tag: &str) -> Option<&mut Element> {
        if self.tag == tag {
            return Some(self);
        }
        self.children
            .iter_mut()
            .filter_map(Node::as_element_mut)
            .find_map(|child| child.find_mut(tag))
    }

    /// Concatenated content of the direct text children
    pub fn text(&self) -> Cow<'_, str> {
        let mut texts = self.children.iter().filter_map(|node| match node {
            Node::Text(t) => Some(t.content()),
            _ => None,
        });
        let first = match texts.next() {
            Some(first) => first,
            None => return Cow::Borrowed(""),
        };
        match texts.next() {
            None => Cow::Borrowed(first),
            Some(second) => {
                let mut joined = String::from(first);
                joined.push_str(second);
                texts.for_each(|t| joined.push_str(t));
                Cow::Owned(joined)
            }
        }
    }

    /// Replace the direct text children with a single text node
    ///
    /// Markup children (comments, processing instructions) are kept; the
    /// new text takes the position of the first text child.
    pub fn set_text(&mut self, content: impl Into<String>) {
        let at = self
            .children
            .iter()
            .position(|n| matches!(n, Node::Text(_)))
            .unwrap_or(self.children.len());
        self.children.retain(|n| !matches!(n, Node::Text(_)));
        let at = at.min(self.children.len());
        self.children.insert(at, Node::Text(Text::new(content)));
    }
}

/// Ordered attribute list that remembers its source spelling
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    entries: Vec<(String, String)>,
    raw: Option<String>,
}

impl Attributes {
    /// Look up a decoded attribute value
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing an existing value in place
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        self.raw = None;
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Remove an attribute, returning its value
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let index = self.entries.iter().position(|(k, _)| k == name)?;
        self.raw = None;
        Some(self.entries.remove(index).1)
    }

    /// Iterate `(name, value)` pairs in source order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of attributes
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no attributes
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn write_to(&self, out: &mut String) {
        if let Some(raw) = &self.raw {
            out.push_str(raw);
            return;
        }
        for (name, value) in &self.entries {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape(value.as_str()));
            out.push('"');
        }
    }
}

/// Character data
#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    content: String,
    raw: Option<String>,
}

impl Text {
    /// Create a text node that will be escaped on output
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            raw: None,
        }
    }

    /// Decoded content
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Replace the content; the source spelling is dropped
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.raw = None;
    }

    /// Whether the node still carries its source spelling
    pub fn is_pristine(&self) -> bool {
        self.raw.is_some()
    }

    fn write_to(&self, out: &mut String) {
        match &self.raw {
            Some(raw) => out.push_str(raw),
            None => out.push_str(&partial_escape(self.content.as_str())),
        }
    }
}

/// Parse XML text into a document tree
pub fn parse(xml: &str, options: &CodecOptions) -> Result<XmlDocument> {
    let (bom, body) = match xml.strip_prefix('\u{feff}') {
        Some(rest) => (true, rest),
        None => (false, xml),
    };

    let mut reader = Reader::from_str(body);
    let config = reader.config_mut();
    config.trim_text(options.trim_text);
    config.check_end_names = options.check_end_names;
    config.expand_empty_elements = options.expand_empty_elements;

    let mut builder = TreeBuilder::default();

    loop {
        let position = reader.buffer_position() as u64;
        let event = reader.read_event().map_err(|e| {
            OoxmlError::malformed(String::new(), reader.error_position() as u64, e.to_string())
        })?;

        match event {
            Event::Start(e) => {
                let element = element_from_start(&e, false, position)?;
                builder.stack.push(element);
            }
            Event::Empty(e) => {
                let element = element_from_start(&e, true, position)?;
                builder.attach(Node::Element(element), position)?;
            }
            Event::End(_) => {
                let element = builder.stack.pop().ok_or_else(|| {
                    OoxmlError::malformed(String::new(), position, "unexpected end tag")
                })?;
                builder.attach(Node::Element(element), position)?;
            }
            Event::Text(e) => {
                let raw = utf8(&e, position)?;
                let content = e
                    .unescape()
                    .map_err(|err| OoxmlError::malformed(String::new(), position, err.to_string()))?;
                let text = Text {
                    content: content.into_owned(),
                    raw: Some(raw.to_string()),
                };
                builder.attach(Node::Text(text), position)?;
            }
            Event::CData(e) => {
                let inner = utf8(&e, position)?;
                let text = Text {
                    content: inner.to_string(),
                    raw: Some(format!("<![CDATA[{inner}]]>")),
                };
                builder.attach(Node::Text(text), position)?;
            }
            Event::Comment(e) => {
                let markup = format!("<!--{}-->", utf8(&e, position)?);
                builder.attach(Node::Markup(markup), position)?;
            }
            Event::Decl(e) => {
                let markup = format!("<?{}?>", utf8(&e, position)?);
                builder.attach(Node::Markup(markup), position)?;
            }
            Event::PI(e) => {
                let markup = format!("<?{}?>", utf8(&e, position)?);
                builder.attach(Node::Markup(markup), position)?;
            }
            Event::DocType(e) => {
                let markup = format!("<!DOCTYPE {}>", utf8(&e, position)?);
                builder.attach(Node::Markup(markup), position)?;
            }
            Event::Eof => break,
        }
    }

    let end = reader.buffer_position() as u64;
    if let Some(open) = builder.stack.last() {
        return Err(OoxmlError::malformed(
            String::new(),
            end,
            format!("unclosed element <{}>", open.tag),
        ));
    }
    let root = builder
        .root
        .ok_or_else(|| OoxmlError::malformed(String::new(), end, "no root element"))?;

    Ok(XmlDocument {
        bom,
        prolog: builder.prolog,
        root,
        epilog: builder.epilog,
    })
}

/// Serialize a document tree back to XML text
pub fn serialize(doc: &XmlDocument, options: &CodecOptions) -> String {
    let mut out = String::new();
    if doc.bom {
        out.push('\u{feff}');
    }
    for node in &doc.prolog {
        write_node(node, &mut out, options);
    }
    write_element(&doc.root, &mut out, options);
    for node in &doc.epilog {
        write_node(node, &mut out, options);
    }
    out
}

#[derive(Default)]
struct TreeBuilder {
    stack: Vec<Element>,
    prolog: Vec<Node>,
    root: Option<Element>,
    epilog: Vec<Node>,
}

impl TreeBuilder {
    fn attach(&mut self, node: Node, position: u64) -> Result<()> {
        if let Some(parent) = self.stack.last_mut() {
            parent.children.push(node);
            return Ok(());
        }

        match node {
            Node::Element(element) if self.root.is_none() => {
                self.root = Some(element);
                Ok(())
            }
            Node::Element(element) => Err(OoxmlError::malformed(
                String::new(),
                position,
                format!("second root element <{}>", element.tag),
            )),
            Node::Text(text) if !text.content.trim().is_empty() => Err(OoxmlError::malformed(
                String::new(),
                position,
                "text outside the root element",
            )),
            other if self.root.is_none() => {
                self.prolog.push(other);
                Ok(())
            }
            other => {
                self.epilog.push(other);
                Ok(())
            }
        }
    }
}

fn element_from_start(start: &BytesStart<'_>, self_closing: bool, position: u64) -> Result<Element> {
    let tag = utf8(start.name().as_ref(), position)?.to_string();
    let raw = utf8(start.attributes_raw(), position)?.to_string();

    let mut entries = Vec::new();
    for attr in start.attributes() {
        let attr =
            attr.map_err(|e| OoxmlError::malformed(String::new(), position, e.to_string()))?;
        let name = utf8(attr.key.as_ref(), position)?.to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| OoxmlError::malformed(String::new(), position, e.to_string()))?;
        entries.push((name, value.into_owned()));
    }

    Ok(Element {
        tag,
        attributes: Attributes {
            entries,
            raw: Some(raw),
        },
        children: Vec::new(),
        self_closing,
    })
}

fn utf8(bytes: &[u8], position: u64) -> Result<&str> {
    std::str::from_utf8(bytes)
        .map_err(|e| OoxmlError::malformed(String::new(), position, e.to_string()))
}

fn write_node(node: &Node, out: &mut String, options: &CodecOptions) {
    match node {
        Node::Element(element) => write_element(element, out, options),
        Node::Text(text) => text.write_to(out),
        Node::Markup(markup) => out.push_str(markup),
    }
}

fn write_element(element: &Element, out: &mut String, options: &CodecOptions) {
    out.push('<');
    out.push_str(&element.tag);
    element.attributes.write_to(out);

    if element.children.is_empty() && element.self_closing && !options.expand_empty_elements {
        out.push_str("/>");
        return;
    }

    out.push('>');
    for child in &element.children {
        write_node(child, out, options);
    }
    out.push_str("</");
    out.push_str(&element.tag);
    out.push('>');
}
