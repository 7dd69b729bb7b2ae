//! Virtual nodes.
//!
//! The tree handed to the external diff/patch backend. Handlers are not
//! part of structural equality (closures have no useful equality); two
//! trees compare equal when their shape, attributes, styles and handler
//! names line up.

use crate::value::Callable;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum VNode {
    Element(VElement),
    Text(String),
}

impl VNode {
    pub fn text(content: impl Into<String>) -> VNode {
        VNode::Text(content.into())
    }

    pub fn as_element(&self) -> Option<&VElement> {
        match self {
            VNode::Element(el) => Some(el),
            VNode::Text(_) => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut VElement> {
        match self {
            VNode::Element(el) => Some(el),
            VNode::Text(_) => None,
        }
    }

    /// Concatenated text content, elements flattened depth first.
    pub fn text_content(&self) -> String {
        match self {
            VNode::Text(text) => text.clone(),
            VNode::Element(el) => el
                .children
                .iter()
                .map(|child| child.text_content())
                .collect(),
        }
    }
}

#[derive(Clone, PartialEq)]
pub struct VElement {
    pub tag: String,
    pub properties: Properties,
    pub children: Vec<VNode>,
    /// Reconciliation key; component roots carry their stable id here.
    pub key: Option<String>,
}

impl VElement {
    pub fn new(tag: impl Into<String>) -> VElement {
        VElement {
            tag: tag.into(),
            properties: Properties::default(),
            children: Vec::new(),
            key: None,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.properties.attributes.get(name).map(String::as_str)
    }
}

impl fmt::Debug for VElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VElement")
            .field("tag", &self.tag)
            .field("key", &self.key)
            .field("properties", &self.properties)
            .field("children", &self.children)
            .finish()
    }
}

#[derive(Clone, Default)]
pub struct Properties {
    pub attributes: BTreeMap<String, String>,
    /// Event name (without the `on` prefix) -> handler.
    pub handlers: BTreeMap<String, Callable>,
    pub style: BTreeMap<String, String>,
    /// Raw markup content; set by the `html` directive, bypasses text
    /// escaping entirely.
    pub inner_html: Option<String>,
}

impl Properties {
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
            && self.handlers.is_empty()
            && self.style.is_empty()
            && self.inner_html.is_none()
    }
}

impl PartialEq for Properties {
    fn eq(&self, other: &Self) -> bool {
        self.attributes == other.attributes
            && self.style == other.style
            && self.inner_html == other.inner_html
            && self
                .handlers
                .keys()
                .eq(other.handlers.keys())
    }
}

impl fmt::Debug for Properties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Properties")
            .field("attributes", &self.attributes)
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("style", &self.style)
            .field("inner_html", &self.inner_html)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use std::rc::Rc;

    #[test]
    fn test_structural_equality_ignores_handler_bodies() {
        let mut a = VElement::new("button");
        a.properties
            .handlers
            .insert("click".to_string(), Rc::new(|_| Value::Null));
        let mut b = VElement::new("button");
        b.properties
            .handlers
            .insert("click".to_string(), Rc::new(|_| Value::Bool(true)));
        assert_eq!(a, b);

        b.properties.handlers.clear();
        assert_ne!(a, b);
    }

    #[test]
    fn test_text_content() {
        let mut el = VElement::new("p");
        el.children.push(VNode::text("a"));
        let mut inner = VElement::new("b");
        inner.children.push(VNode::text("c"));
        el.children.push(VNode::Element(inner));
        assert_eq!(VNode::Element(el).text_content(), "ac");
    }
}
