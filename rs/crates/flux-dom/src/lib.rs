//! flux-dom: Shared DomNode types for Flux renderers
//!
//! This crate defines the Rust representation of a server-rendered HTML tree.
//! Components build `DomNode`s with the fluent builder below; the HTML
//! renderer and the live component envelope both consume this type.

use std::collections::HashMap;

/// A single node in the DOM tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomNode {
    /// HTML tag name (e.g. "div", "button", "input")
    pub tag: String,

    /// HTML attributes (class, placeholder, data-*, etc.)
    pub attrs: Option<HashMap<String, String>>,

    /// Text content for leaf nodes, escaped on output
    pub text: Option<String>,

    /// Raw inner HTML, emitted verbatim after `text`
    pub html: Option<String>,

    /// Child nodes
    pub children: Option<Vec<DomNode>>,
}

impl DomNode {
    /// Create an empty element
    pub fn new(tag: &str) -> Self {
        DomNode {
            tag: tag.to_string(),
            ..Default::default()
        }
    }

    /// Create a simple text node
    pub fn text(tag: &str, content: &str) -> Self {
        DomNode {
            tag: tag.to_string(),
            text: Some(content.to_string()),
            ..Default::default()
        }
    }

    /// Create a node whose only content is trusted raw HTML.
    ///
    /// An empty tag renders the HTML without any wrapping element.
    pub fn raw(html: &str) -> Self {
        DomNode {
            tag: String::new(),
            html: Some(html.to_string()),
            ..Default::default()
        }
    }

    pub fn div() -> Self { Self::new("div") }
    pub fn span() -> Self { Self::new("span") }
    pub fn button() -> Self { Self::new("button") }
    pub fn form() -> Self { Self::new("form") }
    pub fn input() -> Self { Self::new("input") }
    pub fn label() -> Self { Self::new("label") }
    pub fn paragraph() -> Self { Self::new("p") }
    pub fn hyperlink() -> Self { Self::new("a") }
    pub fn icon() -> Self { Self::new("i") }

    /// Hidden `<input>` carrying a name/value pair
    pub fn hidden_input(name: &str, value: &str) -> Self {
        Self::input()
            .attr("type", "hidden")
            .attr("name", name)
            .attr("value", value)
    }

    // ── Builder ─────────────────────────────────────────────────────

    /// Set an attribute, replacing any previous value
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Set an attribute only when `cond` holds
    pub fn attr_if(self, cond: bool, name: &str, value: &str) -> Self {
        if cond { self.attr(name, value) } else { self }
    }

    /// Append a class, keeping existing ones
    pub fn class(mut self, class: &str) -> Self {
        let merged = match self.class_attr() {
            Some(existing) if !existing.is_empty() => format!("{} {}", existing, class),
            _ => class.to_string(),
        };
        self.set_attr("class", &merged);
        self
    }

    pub fn id(self, id: &str) -> Self { self.attr("id", id) }
    pub fn name(self, name: &str) -> Self { self.attr("name", name) }
    pub fn value(self, value: &str) -> Self { self.attr("value", value) }
    pub fn input_type(self, kind: &str) -> Self { self.attr("type", kind) }
    pub fn href(self, href: &str) -> Self { self.attr("href", href) }
    pub fn style(self, style: &str) -> Self { self.attr("style", style) }

    /// Set the escaped text content
    pub fn with_text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    /// Set trusted raw inner HTML
    pub fn with_html(mut self, html: &str) -> Self {
        self.html = Some(html.to_string());
        self
    }

    pub fn child(mut self, child: DomNode) -> Self {
        self.children.get_or_insert_with(Vec::new).push(child);
        self
    }

    pub fn child_if(self, cond: bool, child: DomNode) -> Self {
        if cond { self.child(child) } else { self }
    }

    pub fn children<I: IntoIterator<Item = DomNode>>(mut self, children: I) -> Self {
        self.children.get_or_insert_with(Vec::new).extend(children);
        self
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn set_attr(&mut self, name: &str, value: &str) {
        self.attrs
            .get_or_insert_with(HashMap::new)
            .insert(name.to_string(), value.to_string());
    }

    /// Get an attribute value if present
    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs.as_ref()?.get(name).map(|s| s.as_str())
    }

    /// Get a class attribute if present
    pub fn class_attr(&self) -> Option<&str> {
        self.get_attr("class")
    }

    /// Iterate over children (empty slice if none)
    pub fn children_iter(&self) -> &[DomNode] {
        match &self.children {
            Some(c) => c,
            None => &[],
        }
    }

    /// Depth-first search for the first node matching `pred`
    pub fn find(&self, pred: &dyn Fn(&DomNode) -> bool) -> Option<&DomNode> {
        if pred(self) {
            return Some(self);
        }
        self.children_iter().iter().find_map(|c| c.find(pred))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_tree() {
        let node = DomNode::div()
            .class("card")
            .class("shadow")
            .child(DomNode::text("h1", "Count: 0"))
            .child(DomNode::button().attr("data-flux-action", "increment").with_text("+"));

        assert_eq!(node.tag, "div");
        assert_eq!(node.class_attr(), Some("card shadow"));
        assert_eq!(node.children_iter().len(), 2);
        assert_eq!(node.children_iter()[1].get_attr("data-flux-action"), Some("increment"));
    }

    #[test]
    fn test_attr_if_and_find() {
        let node = DomNode::form().child(
            DomNode::input()
                .name("first_name")
                .attr_if(true, "readonly", "readonly")
                .attr_if(false, "disabled", "disabled"),
        );

        let input = node.find(&|n| n.get_attr("name") == Some("first_name")).unwrap();
        assert_eq!(input.get_attr("readonly"), Some("readonly"));
        assert_eq!(input.get_attr("disabled"), None);
    }

    #[test]
    fn test_hidden_input() {
        let node = DomNode::hidden_input("flux_mount[post_id]", "P1");
        assert_eq!(node.get_attr("type"), Some("hidden"));
        assert_eq!(node.get_attr("value"), Some("P1"));
    }
}
