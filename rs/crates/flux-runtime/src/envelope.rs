//! Identity envelope and the HTML attributes of the client protocol.

use flux_dom::DomNode;

use crate::component::{Identity, MountParams};

pub const DATA_FLUX_KIND: &str = "data-flux-kind";
pub const DATA_FLUX_ID: &str = "data-flux-id";
pub const DATA_FLUX_ACTION: &str = "data-flux-action";
pub const DATA_FLUX_TARGET_KIND: &str = "data-flux-target-kind";
pub const DATA_FLUX_TARGET_ID: &str = "data-flux-target-id";
pub const DATA_FLUX_INDICATOR: &str = "data-flux-indicator";
pub const DATA_FLUX_CONFIRM: &str = "data-flux-confirm";
pub const DATA_FLUX_INCLUDE: &str = "data-flux-include";
pub const DATA_FLUX_LAZY: &str = "data-flux-lazy";

const VOID_ELEMENTS: &[&str] = &["area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr"];

/// Form field name carrying one mount parameter: `flux_mount[<name>]`.
pub fn mount_field(name: &str) -> String {
    format!("flux_mount[{}]", name)
}

/// Parse `flux_mount[<name>]` back into `<name>`.
pub fn parse_mount_field(field: &str) -> Option<&str> {
    field
        .strip_prefix("flux_mount[")?
        .strip_suffix(']')
        .filter(|name| !name.is_empty())
}

/// Builder helpers for interactive elements.
pub trait FluxNode: Sized {
    /// Dispatch `action` when clicked (or submitted, on forms).
    fn flux_action(self, action: &str) -> Self;
    /// Dispatch to another instance instead of the enclosing one.
    fn flux_target(self, target: &Identity) -> Self;
    /// Elements put in a busy state while the request is in flight.
    fn flux_indicator(self, selector: &str) -> Self;
    /// Ask the user to confirm before dispatching.
    fn flux_confirm(self, message: &str) -> Self;
    /// Extra inputs, anywhere in the document, to post along.
    fn flux_include(self, selector: &str) -> Self;
}

impl FluxNode for DomNode {
    fn flux_action(self, action: &str) -> Self {
        self.attr(DATA_FLUX_ACTION, action)
    }

    fn flux_target(self, target: &Identity) -> Self {
        self.attr(DATA_FLUX_TARGET_KIND, &target.kind)
            .attr(DATA_FLUX_TARGET_ID, &target.id)
    }

    fn flux_indicator(self, selector: &str) -> Self {
        self.attr(DATA_FLUX_INDICATOR, selector)
    }

    fn flux_confirm(self, message: &str) -> Self {
        self.attr(DATA_FLUX_CONFIRM, message)
    }

    fn flux_include(self, selector: &str) -> Self {
        self.attr(DATA_FLUX_INCLUDE, selector)
    }
}

fn bears_identity(node: &DomNode, identity: &Identity) -> bool {
    node.get_attr(DATA_FLUX_KIND) == Some(identity.kind.as_str())
        && node.get_attr(DATA_FLUX_ID) == Some(identity.id.as_str())
        && !VOID_ELEMENTS.contains(&node.tag.as_str())
}

fn has_carrier(node: &DomNode, field: &str) -> bool {
    node.children_iter()
        .iter()
        .any(|c| c.tag == "input" && c.get_attr("name") == Some(field))
}

/// Guarantee a root bearing the identity attributes plus one hidden mount
/// carrier per parameter. Idempotent: enveloping twice changes nothing.
pub fn envelope(node: DomNode, identity: &Identity, mount: &MountParams) -> DomNode {
    let mut root = if bears_identity(&node, identity) {
        node
    } else {
        DomNode::div()
            .attr(DATA_FLUX_KIND, &identity.kind)
            .attr(DATA_FLUX_ID, &identity.id)
            .child(node)
    };

    for (name, value) in mount {
        let field = mount_field(name);
        if !has_carrier(&root, &field) {
            root = root.child(DomNode::hidden_input(&field, value));
        }
    }
    root
}

/// Shell without an id; the client loads it through a first-load dispatch.
pub fn lazy_shell(kind: &str, mount: &MountParams) -> DomNode {
    let shell = DomNode::div()
        .attr(DATA_FLUX_KIND, kind)
        .attr(DATA_FLUX_LAZY, "1")
        .child(
            DomNode::div()
                .class("flux-loading")
                .attr("role", "status")
                .with_text("Loading…"),
        );
    mount.iter().fold(shell, |shell, (name, value)| {
        shell.child(DomNode::hidden_input(&mount_field(name), value))
    })
}

/// Neutral fragment for runtime errors. Keeps whatever identity is known
/// so the client can still swap it in place.
pub fn error_fragment(kind: &str, id: Option<&str>, message: &str) -> DomNode {
    let mut node = DomNode::div()
        .class("flux-error")
        .attr("role", "alert")
        .attr(DATA_FLUX_KIND, kind)
        .child(DomNode::text("p", message));
    if let Some(id) = id {
        node.set_attr(DATA_FLUX_ID, id);
    }
    node
}
