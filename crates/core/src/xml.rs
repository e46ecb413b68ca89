//! Minimal XML node tree
//!
//! Policy and feed documents are assembled as a tree of [`Element`]s and
//! serialized once through `quick_xml`, so escaping and tag balance never
//! depend on string concatenation.

use std::io::{self, Write};

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::error::{Error, Result};

/// A child of an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An XML element with ordered attributes and children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Add an attribute
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// Append a child element
    pub fn child(mut self, element: Element) -> Self {
        self.push(element);
        self
    }

    /// Append a text node
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    /// Append `<name>text</name>`
    pub fn text_child(self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.child(Element::new(name).text(text))
    }

    pub fn push(&mut self, element: Element) {
        self.children.push(Node::Element(element));
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Child elements, in document order
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// First child element with the given name
    pub fn find(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.name == name)
    }

    /// Concatenated text of direct text children
    pub fn text_content(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(t) => Some(t.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }

    fn write_to<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.children.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        for node in &self.children {
            match node {
                Node::Element(e) => e.write_to(writer)?,
                Node::Text(t) => writer.write_event(Event::Text(BytesText::new(t)))?,
            }
        }
        writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;
        Ok(())
    }
}

/// Serialize a complete document: UTF-8 declaration followed by `root`.
pub fn to_document(root: &Element) -> Result<String> {
    let mut buf = Vec::with_capacity(1024);
    let mut writer = Writer::new(&mut buf);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    root.write_to(&mut writer)?;

    String::from_utf8(buf).map_err(|e| Error::General(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_element_is_self_closing() {
        let doc = to_document(&Element::new("a").attr("x", "1")).unwrap();
        assert_eq!(doc, r#"<?xml version="1.0" encoding="UTF-8"?><a x="1"/>"#);
    }

    #[test]
    fn test_nested_elements_and_text() {
        let root = Element::new("root")
            .text_child("ID", "abc")
            .child(Element::new("list").text_child("item", "1"));
        let doc = to_document(&root).unwrap();
        assert_eq!(
            doc,
            r#"<?xml version="1.0" encoding="UTF-8"?><root><ID>abc</ID><list><item>1</item></list></root>"#
        );
    }

    #[test]
    fn test_text_is_escaped() {
        let doc = to_document(&Element::new("k").text("a<b&c")).unwrap();
        assert!(doc.contains("<k>a&lt;b&amp;c</k>"));
    }

    #[test]
    fn test_navigation() {
        let root = Element::new("Owner")
            .attr("kind", "user")
            .text_child("ID", "123");
        assert_eq!(root.name(), "Owner");
        assert_eq!(root.attribute("kind"), Some("user"));
        assert_eq!(root.find("ID").unwrap().text_content(), "123");
        assert!(root.find("DisplayName").is_none());
    }
}
