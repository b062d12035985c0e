//! Generic XML attribute/child tree reader.
//!
//! This module does not know anything about CGML. It turns well-formed XML
//! text into a recursive tree of tags, attributes and text, the same way a
//! caller of `harel::parse_scxml` walks a `roxmltree::Node` tree — except we
//! materialize the walk into an owned structure once, up front, so the
//! semantic parser (`crate::parser`) never touches `roxmltree` directly.

use std::collections::HashMap;

use thiserror::Error;

/// Errors raised while reading raw text into an [`XmlNode`] tree.
#[derive(Debug, Error)]
pub enum XmlError {
    #[error("malformed XML: {0}")]
    Malformed(#[from] roxmltree::Error),
}

/// An attribute or text value, opportunistically converted to a number.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlValue {
    Int(i64),
    Float(f64),
    Str(String),
}

impl XmlValue {
    fn from_str(s: &str) -> Self {
        if let Ok(i) = s.parse::<i64>() {
            XmlValue::Int(i)
        } else if let Ok(f) = s.parse::<f64>() {
            XmlValue::Float(f)
        } else {
            XmlValue::Str(s.to_string())
        }
    }

    pub fn as_str(&self) -> std::borrow::Cow<'_, str> {
        match self {
            XmlValue::Int(i) => std::borrow::Cow::Owned(i.to_string()),
            XmlValue::Float(f) => std::borrow::Cow::Owned(f.to_string()),
            XmlValue::Str(s) => std::borrow::Cow::Borrowed(s),
        }
    }
}

/// A single tag, with its attributes (keyed `@name`), text content (keyed
/// `#text`) and ordered children. Repeated child tags stay as repeated
/// entries in `children` — normalizing singleton-vs-list is the caller's
/// job (see [`XmlNode::children_named`]).
#[derive(Debug, Clone, Default)]
pub struct XmlNode {
    pub tag: String,
    pub attrs: HashMap<String, XmlValue>,
    pub text: Option<String>,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    pub fn attr(&self, name: &str) -> Option<&XmlValue> {
        self.attrs.get(name)
    }

    pub fn attr_str(&self, name: &str) -> Option<std::borrow::Cow<'_, str>> {
        self.attr(name).map(XmlValue::as_str)
    }

    /// All children whose local tag name (namespace already stripped) is
    /// `name`, in document order — the "normalize singleton-or-list" helper
    /// required by the CGML typed model.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> {
        self.children.iter().filter(move |c| c.tag == name)
    }

    pub fn child_named<'a>(&'a self, name: &'a str) -> Option<&'a XmlNode> {
        self.children_named(name).next()
    }

    pub fn text_trimmed(&self) -> Option<String> {
        self.text.as_ref().map(|t| t.trim().to_string())
    }
}

/// Parses `text` into an [`XmlNode`] tree rooted at the document element.
pub fn read(text: &str) -> Result<XmlNode, XmlError> {
    let doc = roxmltree::Document::parse(text)?;
    Ok(convert(&doc.root_element()))
}

fn convert(node: &roxmltree::Node) -> XmlNode {
    let tag = node.tag_name().name().to_string();

    let mut attrs = HashMap::new();
    for attr in node.attributes() {
        attrs.insert(attr.name().to_string(), XmlValue::from_str(attr.value()));
    }

    let mut children = Vec::new();
    let mut text_parts = Vec::new();
    for child in node.children() {
        if child.is_element() {
            children.push(convert(&child));
        } else if child.is_text() {
            if let Some(t) = child.text() {
                if !t.trim().is_empty() {
                    text_parts.push(t.to_string());
                }
            }
        }
    }

    let text = if text_parts.is_empty() {
        None
    } else {
        Some(text_parts.concat())
    };

    XmlNode { tag, attrs, text, children }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_default_namespace_from_tags() {
        let xml = r#"<graphml xmlns="http://graphml.graphdrawing.org/xmlns">
            <graph id="g0"><node id="n1"/></graph>
        </graphml>"#;
        let root = read(xml).unwrap();
        assert_eq!(root.tag, "graphml");
        let graph = root.child_named("graph").unwrap();
        assert_eq!(graph.attr_str("id").as_deref(), Some("g0"));
        assert_eq!(graph.children_named("node").count(), 1);
    }

    #[test]
    fn coerces_numeric_attributes() {
        let xml = r#"<root a="3" b="1.5" c="hi"/>"#;
        let root = read(xml).unwrap();
        assert_eq!(root.attr("a"), Some(&XmlValue::Int(3)));
        assert_eq!(root.attr("b"), Some(&XmlValue::Float(1.5)));
        assert_eq!(root.attr("c"), Some(&XmlValue::Str("hi".into())));
    }

    #[test]
    fn rejects_malformed_xml() {
        let xml = "<graphml><graph></graphml>";
        assert!(matches!(read(xml), Err(XmlError::Malformed(_))));
    }

    #[test]
    fn repeated_children_normalize_to_a_list() {
        let xml = r#"<graph><node id="a"/><node id="b"/><node id="c"/></graph>"#;
        let root = read(xml).unwrap();
        let ids: Vec<_> = root
            .children_named("node")
            .map(|n| n.attr_str("id").unwrap().into_owned())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
