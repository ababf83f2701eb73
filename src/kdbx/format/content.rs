//! # XML Content Decoding
//!
//! Turns the decompressed payload into an owned element tree. Only
//! well-formedness is checked; element names and nesting are not interpreted.
//!
//! Whitespace-only text between child elements is dropped, while leaf text is
//! kept exactly as written (after entity unescaping), so a value consisting of
//! a single space survives. The payload must hold exactly one root element;
//! only whitespace, comments and processing instructions may follow it.

use log::{debug, trace};
use quick_xml::{
    events::{BytesStart, Event},
    Reader,
};

use crate::kdbx::types::error::{KdbxError, Result};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// A node in the decoded tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An XML element with its attributes (in document order) and children.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Value of the first attribute with the given name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Child elements, skipping text nodes.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    /// First child element with the given name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.child_elements().find(|element| element.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.child_elements().filter(move |element| element.name == name)
    }

    /// Concatenation of this element's direct text children.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(text) => Some(text.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }

    fn count_elements(&self) -> usize {
        1 + self.child_elements().map(Element::count_elements).sum::<usize>()
    }

    fn push_text(&mut self, text: &str) {
        if let Some(Node::Text(last)) = self.children.last_mut() {
            last.push_str(text);
        } else {
            self.children.push(Node::Text(text.to_string()));
        }
    }

    fn drop_layout_whitespace(&mut self) {
        let has_elements = self.children.iter().any(|node| matches!(node, Node::Element(_)));
        if has_elements {
            self.children.retain(|node| match node {
                Node::Text(text) => !text.trim().is_empty(),
                Node::Element(_) => true,
            });
        }
    }
}

/// The structured result of a successful decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedContent {
    root: Element,
}

impl DecodedContent {
    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn into_root(self) -> Element {
        self.root
    }

    /// Follows a path of child element names starting below the root.
    ///
    /// An empty path returns the root itself.
    pub fn find(&self, path: &[&str]) -> Option<&Element> {
        path.iter()
            .try_fold(&self.root, |element, name| element.child(name))
    }

    /// Total number of elements in the tree, root included.
    pub fn element_count(&self) -> usize {
        self.root.count_elements()
    }
}

/// Parses a UTF-8 XML payload into a [`DecodedContent`] tree.
///
/// # Errors
/// `MalformedContent` on syntax errors, mismatched end tags, invalid UTF-8,
/// a missing root element, a second root element, elements left open at end
/// of input, or non-whitespace text outside the root.
pub fn decode(bytes: &[u8]) -> Result<DecodedContent> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().check_end_names = true;

    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let element = start_element(&e)?;
                if stack.is_empty() {
                    ensure_single_root(&root, &element)?;
                }
                stack.push(element);
            }
            Ok(Event::Empty(e)) => {
                let element = start_element(&e)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Element(element)),
                    None => {
                        ensure_single_root(&root, &element)?;
                        root = Some(element);
                    }
                }
            }
            Ok(Event::End(e)) => {
                let mut element = stack.pop().ok_or_else(|| {
                    malformed(format!(
                        "Unexpected closing tag </{}>",
                        String::from_utf8_lossy(e.name().as_ref())
                    ))
                })?;
                if e.name().as_ref() != element.name.as_bytes() {
                    return Err(malformed(format!(
                        "Closing tag </{}> does not match <{}>",
                        String::from_utf8_lossy(e.name().as_ref()),
                        element.name
                    )));
                }
                element.drop_layout_whitespace();
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Element(element)),
                    None => root = Some(element),
                }
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|e| malformed(format!("Failed to decode text: {}", e)))?;
                append_text(&mut stack, &text)?;
            }
            Ok(Event::CData(e)) => {
                let text = std::str::from_utf8(e.as_ref())
                    .map_err(|e| malformed(format!("CDATA is not valid UTF-8: {}", e)))?;
                append_text(&mut stack, text)?;
            }
            Ok(Event::Eof) => {
                if let Some(open) = stack.last() {
                    return Err(malformed(format!("Unexpected end of input inside <{}>", open.name)));
                }
                return match root {
                    Some(root) => Ok(finish(root)),
                    None => Err(malformed("No root element found".to_string())),
                };
            }
            Err(e) => {
                return Err(malformed(format!(
                    "XML error at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            // Declarations, comments, processing instructions, DOCTYPE
            Ok(_) => {}
        }
        buf.clear();
    }
}

fn start_element(e: &BytesStart<'_>) -> Result<Element> {
    let name = std::str::from_utf8(e.name().as_ref())
        .map_err(|err| malformed(format!("Element name is not valid UTF-8: {}", err)))?
        .to_string();

    let attributes = e
        .attributes()
        .map(|attr_result| {
            let attr = attr_result
                .map_err(|e| malformed(format!("Failed to parse XML attribute: {}", e)))?;
            let key = std::str::from_utf8(attr.key.as_ref())
                .map_err(|e| malformed(format!("Attribute name is not valid UTF-8: {}", e)))?
                .to_string();
            let value = attr
                .unescape_value()
                .map_err(|e| malformed(format!("Failed to decode XML value: {}", e)))?
                .into_owned();
            Ok((key, value))
        })
        .collect::<Result<Vec<_>>>()?;

    trace!("<{}> with {} attributes", name, attributes.len());
    Ok(Element {
        name,
        attributes,
        children: Vec::new(),
    })
}

fn ensure_single_root(root: &Option<Element>, next: &Element) -> Result<()> {
    match root {
        Some(existing) => Err(malformed(format!(
            "Second root element <{}> after <{}>",
            next.name, existing.name
        ))),
        None => Ok(()),
    }
}

fn append_text(stack: &mut [Element], text: &str) -> Result<()> {
    match stack.last_mut() {
        Some(element) => {
            element.push_text(text);
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(malformed("Text outside the root element".to_string())),
    }
}

fn finish(root: Element) -> DecodedContent {
    let content = DecodedContent { root };
    debug!(
        "Decoded content: root <{}>, {} elements",
        content.root.name,
        content.element_count()
    );
    content
}

fn malformed(message: String) -> KdbxError {
    KdbxError::MalformedContent(message)
}
