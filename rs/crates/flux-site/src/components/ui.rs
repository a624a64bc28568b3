//! Small form-building blocks shared by the site components.

use flux_dom::DomNode;
use flux_runtime::View;

/// Error or success banner for the latest lifecycle step.
pub fn feedback(view: &View<'_>) -> Option<DomNode> {
    if let Some(error) = view.last_error() {
        return Some(
            DomNode::div()
                .class("alert alert-danger")
                .attr("role", "alert")
                .with_text(error),
        );
    }
    view.last_success().map(|success| {
        DomNode::div()
            .class("alert alert-success")
            .attr("role", "status")
            .with_text(success)
    })
}

/// Hidden spinner revealed by the client while `class` is an indicator.
pub fn spinner(class: &str) -> DomNode {
    DomNode::span()
        .class(class)
        .class("spinner-border spinner-border-sm align-middle ms-2")
        .attr("role", "status")
        .attr("hidden", "hidden")
        .child(DomNode::text("span", "Loading").class("visually-hidden"))
}

pub fn field(label: &str, control: DomNode) -> DomNode {
    DomNode::div()
        .class("mb-3")
        .child(DomNode::text("label", label).class("form-label"))
        .child(control)
}

pub fn text_input(name: &str, value: &str) -> DomNode {
    DomNode::input()
        .input_type("text")
        .class("form-control")
        .name(name)
        .value(value)
}

pub fn datetime_input(name: &str, value: &str) -> DomNode {
    // datetime-local wants the T separator
    DomNode::input()
        .input_type("datetime-local")
        .class("form-control")
        .name(name)
        .value(&value.replacen(' ', "T", 1))
}

pub fn textarea(name: &str, value: &str) -> DomNode {
    DomNode::text("textarea", value)
        .class("form-control")
        .name(name)
        .attr("rows", "4")
}

/// `<select>` with `(value, label)` options, `current` preselected.
pub fn select(name: &str, current: &str, options: &[(&str, &str)]) -> DomNode {
    DomNode::new("select")
        .class("form-select")
        .name(name)
        .children(options.iter().map(|(value, label)| {
            DomNode::text("option", label)
                .value(value)
                .attr_if(*value == current, "selected", "selected")
        }))
}
