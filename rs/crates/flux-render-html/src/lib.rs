//! flux-render-html: Render Flux DomNode trees to HTML strings
//!
//! Produces fragment HTML for live component replies and full page shells
//! for server-rendered pages. Attribute order is sorted so identical trees
//! always produce byte-identical HTML.

use std::fmt::Write;

use flux_dom::DomNode;

/// Void elements that must not have closing tags
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input",
    "link", "meta", "param", "source", "track", "wbr",
];

/// Render a DomNode tree to an HTML string.
pub fn render_to_html(node: &DomNode) -> String {
    let mut buf = String::with_capacity(4096);
    write_node(node, &mut buf);
    buf
}

/// Options for rendering a full HTML page.
#[derive(Debug, Clone, Default)]
pub struct PageOptions {
    pub body: DomNode,
    pub title: Option<String>,
    pub description: Option<String>,
    /// `<link rel="canonical">` target
    pub canonical_url: Option<String>,
    /// Content of `<meta name="robots">`
    pub robots: Option<String>,
    /// Stylesheet URLs, linked in order
    pub styles: Vec<String>,
}

/// Render a full HTML document around already-built body content.
///
/// Empty optional values are skipped so callers can pass stored fields
/// straight through.
pub fn render_page(opts: &PageOptions) -> String {
    let body_html = render_to_html(&opts.body);
    let present = |v: &Option<String>| v.as_deref().filter(|s| !s.trim().is_empty()).map(str::to_string);

    let mut head = String::from("<meta charset=\"utf-8\" />\n");
    head.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\" />\n");
    // write! into a String cannot fail
    if let Some(title) = present(&opts.title) {
        let _ = writeln!(head, "<title>{}</title>", escape_html(&title));
    }
    if let Some(desc) = present(&opts.description) {
        let _ = writeln!(head, "<meta name=\"description\" content=\"{}\" />", escape_attr(&desc));
    }
    if let Some(robots) = present(&opts.robots) {
        let _ = writeln!(head, "<meta name=\"robots\" content=\"{}\" />", escape_attr(&robots));
    }
    if let Some(url) = present(&opts.canonical_url) {
        let _ = writeln!(head, "<link rel=\"canonical\" href=\"{}\" />", escape_attr(&url));
    }
    for href in &opts.styles {
        let _ = writeln!(head, "<link rel=\"stylesheet\" href=\"{}\" />", escape_attr(href));
    }

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n{}</head>\n<body>\n{}\n</body>\n</html>",
        head, body_html
    )
}

fn write_node(node: &DomNode, buf: &mut String) {
    // Tagless nodes are fragments: content only
    if node.tag.is_empty() {
        write_content(node, buf);
        return;
    }

    buf.push('<');
    buf.push_str(&node.tag);
    if let Some(attrs) = &node.attrs {
        let mut sorted: Vec<(&String, &String)> = attrs.iter().collect();
        sorted.sort_unstable_by(|a, b| a.0.cmp(b.0));
        for (name, value) in sorted {
            let _ = write!(buf, " {}=\"{}\"", name, escape_attr(value));
        }
    }
    buf.push('>');

    if VOID_ELEMENTS.contains(&node.tag.as_str()) {
        return;
    }
    write_content(node, buf);
    let _ = write!(buf, "</{}>", node.tag);
}

fn write_content(node: &DomNode, buf: &mut String) {
    if let Some(text) = &node.text {
        buf.push_str(&escape_html(text));
    }
    if let Some(html) = &node.html {
        buf.push_str(html);
    }
    for child in node.children_iter() {
        write_node(child, buf);
    }
}

fn escape(s: &str, quotes: bool) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if quotes => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape text content.
pub fn escape_html(s: &str) -> String {
    escape(s, false)
}

/// Escape a double-quoted attribute value.
pub fn escape_attr(s: &str) -> String {
    escape(s, true)
}
