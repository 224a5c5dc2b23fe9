//! XML backend.
//!
//! Objects, arrays and values become elements named after their key (array
//! elements are named `item`). A scalar written with
//! [`FieldOptions::PREFER_ATTRIBUTE`] becomes an attribute of the enclosing
//! element instead; readers look at attributes before child elements.
//!
//! XML has no null literal, so nulls are inferred. An element is null when it
//! is named `null`, or has no attributes, no children and no text (or the text
//! `null`). Two marker attributes keep real values from looking null:
//!
//! - `__empty="1"` on an empty string or an empty container
//! - `__literal="1"` on a value whose text is the word `null`
//!
//! The whole document is parsed when the reader is created, so malformed
//! markup fails there. The cursor never records a fault during the walk.
//!
//! ```rust
//! use omniser::backend::{FormatCursor, Key, XmlCursor};
//! use omniser::{FieldOptions, OutputOptions};
//!
//! let mut cursor = XmlCursor::writer("player", 2);
//! cursor.begin_write_root().unwrap();
//! cursor.begin_write_value(Key::Name("name"), FieldOptions::PREFER_ATTRIBUTE);
//! cursor.write_scalar(omniser::backend::ScalarRef::Str("Ada"));
//! cursor.end_value();
//! cursor.end_root();
//!
//! let out = Box::new(cursor).finish(OutputOptions::empty()).unwrap();
//! assert!(out.as_text().unwrap().ends_with(r#"<player name="Ada"/>"#));
//! ```

use super::text::{format_text, parse_text};
use super::{FormatCursor, Key, Mismatch, Output, Presence, Scalar, ScalarKind, ScalarRef};
use crate::format::Format;
use crate::options::{FieldOptions, OutputOptions};
use crate::{Error, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

const EMPTY_MARKER: &str = "__empty";
const LITERAL_MARKER: &str = "__literal";
const ITEM: &str = "item";
const NULL: &str = "null";

#[derive(Debug, Clone, Default)]
struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<usize>,
    text: Option<String>,
}

impl Element {
    fn named(name: impl Into<String>) -> Self {
        Element {
            name: name.into(),
            ..Element::default()
        }
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn has_text(&self) -> bool {
        self.text.as_deref().is_some_and(|t| !t.is_empty())
    }

    fn is_null(&self) -> bool {
        self.name == NULL
            || (self.attributes.is_empty()
                && self.children.is_empty()
                && self
                    .text
                    .as_deref()
                    .map_or(true, |t| t.is_empty() || t == NULL))
    }

    fn mark(&mut self, marker: &str) {
        self.attributes.push((marker.to_string(), "1".to_string()));
    }
}

#[derive(Debug)]
enum Target {
    Attribute(String),
    Element(usize),
}

/// Cursor over an in-memory element tree.
#[derive(Debug)]
pub struct XmlCursor {
    reading: bool,
    elements: Vec<Element>,
    root: Option<usize>,
    root_name: String,
    stack: Vec<usize>,
    pending: Option<Target>,
    attribute_value: Option<String>,
    indent: usize,
}

impl XmlCursor {
    /// Creates a cursor that writes a document rooted at `root_name`.
    #[must_use]
    pub fn writer(root_name: &str, indent: usize) -> Self {
        XmlCursor {
            reading: false,
            elements: Vec::new(),
            root: None,
            root_name: root_name.to_string(),
            stack: Vec::new(),
            pending: None,
            attribute_value: None,
            indent,
        }
    }

    /// Parses `text` and opens it for reading.
    ///
    /// # Errors
    ///
    /// Fails on malformed XML, unclosed elements or a missing root element.
    pub fn reader(text: &str) -> Result<Self> {
        let (elements, root) = parse(text)?;
        Ok(XmlCursor {
            reading: true,
            root_name: elements[root].name.clone(),
            elements,
            root: Some(root),
            ..Self::writer("", 0)
        })
    }

    fn top(&self) -> usize {
        self.stack.last().copied().or(self.root).unwrap_or(0)
    }

    fn add_child(&mut self, key: Key<'_>, null: bool) -> usize {
        let name = match key {
            Key::Name(name) => name,
            Key::Index(_) if null => NULL,
            Key::Index(_) => ITEM,
        };
        let idx = self.elements.len();
        self.elements.push(Element::named(name));
        let parent = self.top();
        if let Some(parent) = self.elements.get_mut(parent) {
            parent.children.push(idx);
        }
        idx
    }

    fn find_child(&self, key: Key<'_>) -> Option<usize> {
        let parent = self.elements.get(*self.stack.last()?)?;
        match key {
            Key::Name(name) => parent
                .children
                .iter()
                .copied()
                .find(|&child| self.elements[child].name == name),
            Key::Index(index) => parent.children.get(index).copied(),
        }
    }

    fn open_container(&mut self, key: Key<'_>) -> Presence {
        let Some(idx) = self.find_child(key) else {
            return Presence::Missing;
        };
        let element = &self.elements[idx];
        if element.is_null() {
            return Presence::Null;
        }
        if element.children.is_empty() && element.has_text() {
            return Presence::WrongKind("text");
        }
        self.stack.push(idx);
        Presence::Present
    }

    fn close_container(&mut self) {
        let Some(idx) = self.stack.pop() else {
            return;
        };
        if self.reading {
            return;
        }
        let element = &mut self.elements[idx];
        if element.is_null() {
            element.mark(EMPTY_MARKER);
        }
    }

    fn render(&self, pretty: bool) -> Result<String> {
        let root = self
            .root
            .ok_or_else(|| Error::xml("no root element was written"))?;
        let mut writer = if pretty {
            Writer::new_with_indent(Vec::new(), b' ', self.indent)
        } else {
            Writer::new(Vec::new())
        };
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(Error::xml)?;
        self.write_element(&mut writer, root)?;
        String::from_utf8(writer.into_inner()).map_err(Error::xml)
    }

    fn write_element(&self, writer: &mut Writer<Vec<u8>>, idx: usize) -> Result<()> {
        let element = &self.elements[idx];
        let mut start = BytesStart::new(element.name.as_str());
        for (key, value) in &element.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if element.children.is_empty() && !element.has_text() {
            return writer.write_event(Event::Empty(start)).map_err(Error::xml);
        }

        writer.write_event(Event::Start(start)).map_err(Error::xml)?;
        if let Some(text) = element.text.as_deref().filter(|t| !t.is_empty()) {
            writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(Error::xml)?;
        }
        for &child in &element.children {
            self.write_element(writer, child)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(element.name.as_str())))
            .map_err(Error::xml)
    }
}

fn parse(text: &str) -> Result<(Vec<Element>, usize)> {
    let mut reader = Reader::from_str(text);
    let mut elements: Vec<Element> = Vec::new();
    let mut stack: Vec<usize> = Vec::new();
    let mut root = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            Error::xml(format!("{e} at byte {}", reader.buffer_position()))
        })?;
        match event {
            Event::Start(start) => {
                let idx = open_element(&mut elements, &start, &stack, &mut root)?;
                stack.push(idx);
            }
            Event::Empty(start) => {
                open_element(&mut elements, &start, &stack, &mut root)?;
            }
            Event::End(_) => {
                let idx = stack
                    .pop()
                    .ok_or_else(|| Error::xml("closing tag without an open element"))?;
                let element = &mut elements[idx];
                // Whitespace between child elements is layout, not content
                if !element.children.is_empty() {
                    element.text = None;
                }
            }
            Event::Text(content) => {
                let unescaped = content.unescape().map_err(Error::xml)?;
                append_text(&mut elements, &stack, &unescaped)?;
            }
            Event::CData(content) => {
                let raw = std::str::from_utf8(&content).map_err(Error::xml)?;
                append_text(&mut elements, &stack, raw)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(Error::xml("unclosed element at end of input"));
    }
    let root = root.ok_or_else(|| Error::unexpected_eof("an XML root element"))?;
    Ok((elements, root))
}

fn open_element(
    elements: &mut Vec<Element>,
    start: &BytesStart<'_>,
    stack: &[usize],
    root: &mut Option<usize>,
) -> Result<usize> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(Error::xml)?
        .to_string();
    let mut element = Element::named(name);
    for attribute in start.attributes() {
        let attribute = attribute.map_err(Error::xml)?;
        let key = std::str::from_utf8(attribute.key.as_ref())
            .map_err(Error::xml)?
            .to_string();
        let value = attribute.unescape_value().map_err(Error::xml)?.into_owned();
        element.attributes.push((key, value));
    }

    let idx = elements.len();
    elements.push(element);
    match stack.last() {
        Some(&parent) => elements[parent].children.push(idx),
        None if root.is_none() => *root = Some(idx),
        None => return Err(Error::xml("more than one root element")),
    }
    Ok(idx)
}

fn append_text(elements: &mut [Element], stack: &[usize], text: &str) -> Result<()> {
    match stack.last() {
        Some(&top) => {
            elements[top]
                .text
                .get_or_insert_with(String::new)
                .push_str(text);
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(Error::xml("text outside the root element")),
    }
}

impl FormatCursor for XmlCursor {
    fn format(&self) -> Format {
        Format::Xml
    }

    fn is_reading(&self) -> bool {
        self.reading
    }

    fn begin_write_root(&mut self) -> Result<()> {
        if self.root.is_some() {
            return Err(Error::xml("root element already written"));
        }
        self.elements.push(Element::named(self.root_name.as_str()));
        self.root = Some(0);
        self.stack.push(0);
        Ok(())
    }

    fn begin_read_root(&mut self) -> Result<()> {
        let root = self
            .root
            .ok_or_else(|| Error::unexpected_eof("an XML root element"))?;
        self.stack.push(root);
        Ok(())
    }

    fn end_root(&mut self) {
        self.stack.pop();
    }

    fn begin_read_value(&mut self, key: Key<'_>, _options: FieldOptions) -> Presence {
        if let Key::Name(name) = key {
            let parent = self.stack.last().and_then(|&idx| self.elements.get(idx));
            if let Some(value) = parent.and_then(|p| p.attribute(name)) {
                self.attribute_value = Some(value.to_string());
                return Presence::Present;
            }
        }
        let Some(idx) = self.find_child(key) else {
            return Presence::Missing;
        };
        if self.elements[idx].is_null() {
            return Presence::Null;
        }
        self.stack.push(idx);
        Presence::Present
    }

    fn read_scalar(&mut self, kind: ScalarKind) -> std::result::Result<Scalar, Mismatch> {
        if let Some(value) = &self.attribute_value {
            return parse_text(kind, value);
        }
        let element = &self.elements[self.top()];
        if !element.children.is_empty() {
            return Err(Mismatch::new(kind.name(), "element with children"));
        }
        parse_text(kind, element.text.as_deref().unwrap_or_default())
    }

    fn begin_write_value(&mut self, key: Key<'_>, options: FieldOptions) {
        let target = match key {
            Key::Name(name) if options.contains(FieldOptions::PREFER_ATTRIBUTE) => {
                Target::Attribute(name.to_string())
            }
            _ => Target::Element(self.add_child(key, false)),
        };
        self.pending = Some(target);
    }

    fn write_scalar(&mut self, value: ScalarRef<'_>) {
        let text = format_text(value);
        match self.pending.take() {
            Some(Target::Attribute(name)) => {
                let top = self.top();
                self.elements[top].attributes.push((name, text));
            }
            Some(Target::Element(idx)) => {
                let element = &mut self.elements[idx];
                if text.is_empty() {
                    element.mark(EMPTY_MARKER);
                } else {
                    if text == NULL {
                        element.mark(LITERAL_MARKER);
                    }
                    element.text = Some(text);
                }
            }
            None => {}
        }
    }

    fn end_value(&mut self) {
        if self.reading {
            if self.attribute_value.take().is_none() {
                self.stack.pop();
            }
        } else {
            self.pending = None;
        }
    }

    fn write_null(&mut self, key: Key<'_>, _options: FieldOptions) {
        self.add_child(key, true);
    }

    fn begin_read_object(&mut self, key: Key<'_>) -> Presence {
        self.open_container(key)
    }

    fn begin_write_object(&mut self, key: Key<'_>) {
        let idx = self.add_child(key, false);
        self.stack.push(idx);
    }

    fn end_object(&mut self) {
        self.close_container();
    }

    fn begin_read_array(&mut self, key: Key<'_>) -> Presence {
        self.open_container(key)
    }

    fn array_len(&self) -> usize {
        self.elements
            .get(self.top())
            .map_or(0, |element| element.children.len())
    }

    fn begin_write_array(&mut self, key: Key<'_>, _len: usize) {
        let idx = self.add_child(key, false);
        self.stack.push(idx);
    }

    fn end_array(&mut self) {
        self.close_container();
    }

    fn finish(self: Box<Self>, options: OutputOptions) -> Result<Output> {
        let text = self.render(options.contains(OutputOptions::PRETTY_PRINT))?;
        Ok(Output::Text(text))
    }
}
