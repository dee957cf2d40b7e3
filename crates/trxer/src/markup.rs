//! Minimal XML/XHTML document tree.
//!
//! Used both for the report template (which is rewritten and serialized
//! again) and for TRX input (which is only read). Element and attribute
//! names are kept exactly as written; lookups by local name ignore any
//! namespace prefix.

use quick_xml::escape::minimal_escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

/// HTML elements that never have content
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (line {line})")]
pub struct MarkupError {
    pub message: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Declaration, doctype, comments and processing instructions before the root
    pub prolog: Vec<Node>,
    pub root: Element,
    pub epilog: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    /// Text written out verbatim, without escaping
    Raw(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
    Declaration(String),
    DocType(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Name without namespace prefix
    pub fn local_name(&self) -> &str {
        local(&self.name)
    }

    pub fn is(&self, local_name: &str) -> bool {
        self.local_name().eq_ignore_ascii_case(local_name)
    }

    /// Attribute value by local name, ignoring case
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| local(&a.name).eq_ignore_ascii_case(name))
            .map(|a| a.value.as_str())
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// First child element with the given local name
    pub fn child(&self, local_name: &str) -> Option<&Element> {
        self.elements().find(|e| e.is(local_name))
    }

    pub fn children_named<'s>(&'s self, local_name: &'s str) -> impl Iterator<Item = &'s Element> + 's {
        self.elements().filter(move |e| e.is(local_name))
    }

    /// Concatenated text of all descendants
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(t) | Node::Raw(t) | Node::CData(t) => out.push_str(t),
            Node::Element(e) => collect_text(&e.children, out),
            _ => {}
        }
    }
}

fn local(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

/// Parse a well-formed document with a single root element
pub fn parse(source: &str) -> Result<Document, MarkupError> {
    MarkupParser::new(source).parse()
}

struct MarkupParser<'a> {
    source: &'a str,
    reader: Reader<&'a [u8]>,
    stack: Vec<Element>,
    prolog: Vec<Node>,
    epilog: Vec<Node>,
    root: Option<Element>,
}

impl<'a> MarkupParser<'a> {
    fn new(source: &'a str) -> Self {
        let mut reader = Reader::from_str(source);
        reader.config_mut().trim_text_start = false;
        reader.config_mut().trim_text_end = false;
        Self {
            source,
            reader,
            stack: Vec::new(),
            prolog: Vec::new(),
            epilog: Vec::new(),
            root: None,
        }
    }

    fn parse(mut self) -> Result<Document, MarkupError> {
        loop {
            let event = self
                .reader
                .read_event()
                .map_err(|e| self.error_at(e.to_string(), self.reader.error_position()))?;
            match event {
                Event::Start(e) => {
                    let element = self.element(&e)?;
                    self.stack.push(element);
                }
                Event::End(_) => {
                    let element = self
                        .stack
                        .pop()
                        .ok_or_else(|| self.error("Unexpected closing tag"))?;
                    self.finish_element(element)?;
                }
                Event::Empty(e) => {
                    let element = self.element(&e)?;
                    self.finish_element(element)?;
                }
                Event::Text(e) => {
                    let text = e
                        .unescape()
                        .map_err(|err| self.error(format!("Invalid text content: {err}")))?
                        .into_owned();
                    self.push_text(text)?;
                }
                Event::CData(e) => self.push_node(Node::CData(lossy(&e))),
                Event::Comment(e) => self.push_node(Node::Comment(lossy(&e))),
                Event::PI(e) => self.push_node(Node::ProcessingInstruction(lossy(&e))),
                Event::Decl(e) => self.push_node(Node::Declaration(lossy(&e))),
                Event::DocType(e) => self.push_node(Node::DocType(lossy(&e).trim().to_string())),
                Event::Eof => break,
            }
        }

        if let Some(open) = self.stack.last() {
            return Err(self.error(format!("Unclosed element <{}>", open.name)));
        }
        let root = self
            .root
            .take()
            .ok_or_else(|| self.error("Document has no root element"))?;
        Ok(Document {
            prolog: self.prolog,
            root,
            epilog: self.epilog,
        })
    }

    fn element(&self, start: &BytesStart<'_>) -> Result<Element, MarkupError> {
        let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()));
        for attribute in start.attributes() {
            let attribute =
                attribute.map_err(|e| self.error(format!("Invalid attribute: {e}")))?;
            let value = attribute
                .unescape_value()
                .map_err(|e| self.error(format!("Invalid attribute value: {e}")))?;
            element.attributes.push(Attribute {
                name: String::from_utf8_lossy(attribute.key.as_ref()).into_owned(),
                value: value.into_owned(),
            });
        }
        Ok(element)
    }

    fn finish_element(&mut self, element: Element) -> Result<(), MarkupError> {
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(Node::Element(element)),
            None if self.root.is_none() => self.root = Some(element),
            None => return Err(self.error("Document has more than one root element")),
        }
        Ok(())
    }

    fn push_text(&mut self, text: String) -> Result<(), MarkupError> {
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(Node::Text(text)),
            None if text.trim().is_empty() => {}
            None => return Err(self.error("Text outside the root element")),
        }
        Ok(())
    }

    fn push_node(&mut self, node: Node) {
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None if self.root.is_none() => self.prolog.push(node),
            None => self.epilog.push(node),
        }
    }

    fn error(&self, message: impl Into<String>) -> MarkupError {
        self.error_at(message, self.reader.buffer_position())
    }

    fn error_at(&self, message: impl Into<String>, position: u64) -> MarkupError {
        let end = (position as usize).min(self.source.len());
        let line = self.source.as_bytes()[..end]
            .iter()
            .filter(|b| **b == b'\n')
            .count()
            + 1;
        MarkupError {
            message: message.into(),
            line,
        }
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Serialize a document back to markup text
pub fn serialize(document: &Document) -> String {
    let mut out = String::new();
    for node in &document.prolog {
        write_node(node, &mut out);
        out.push('\n');
    }
    write_element(&document.root, &mut out);
    for node in &document.epilog {
        out.push('\n');
        write_node(node, &mut out);
    }
    out
}

fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Element(e) => write_element(e, out),
        Node::Text(t) => out.push_str(&minimal_escape(t.as_str())),
        Node::Raw(t) => out.push_str(t),
        Node::CData(t) => {
            out.push_str("<![CDATA[");
            out.push_str(t);
            out.push_str("]]>");
        }
        Node::Comment(t) => {
            out.push_str("<!--");
            out.push_str(t);
            out.push_str("-->");
        }
        Node::ProcessingInstruction(t) => {
            out.push_str("<?");
            out.push_str(t);
            out.push_str("?>");
        }
        Node::Declaration(t) => {
            out.push_str("<?");
            out.push_str(t);
            out.push_str("?>");
        }
        Node::DocType(t) => {
            out.push_str("<!DOCTYPE ");
            out.push_str(t);
            out.push('>');
        }
    }
}

fn write_element(element: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&element.name);
    for attribute in &element.attributes {
        out.push(' ');
        out.push_str(&attribute.name);
        out.push_str("=\"");
        out.push_str(&minimal_escape(attribute.value.as_str()).replace('"', "&quot;"));
        out.push('"');
    }

    let is_void = VOID_ELEMENTS
        .iter()
        .any(|v| element.local_name().eq_ignore_ascii_case(v));
    if element.children.is_empty() && is_void {
        out.push_str("/>");
        return;
    }

    out.push('>');
    for child in &element.children {
        write_node(child, out);
    }
    out.push_str("</");
    out.push_str(&element.name);
    out.push('>');
}
