//! Client protocol script, embedded at compile time.

use axum::extract::Query;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use flux_dom::DomNode;
use std::collections::HashMap;

pub const CLIENT_JS: &str = include_str!("../assets/flux.js");

/// Cache-busting token appended to the script URL.
pub const SCRIPT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// `<script>` element loading the client from `endpoint`.
pub fn script_tag(endpoint: &str) -> DomNode {
    DomNode::new("script")
        .attr("src", &format!("{}?v={}", endpoint, SCRIPT_VERSION))
        .attr("data-flux-endpoint", endpoint)
        .attr("defer", "defer")
}

/// Versioned requests are immutable; bare ones revalidate.
pub(crate) async fn serve_script(Query(query): Query<HashMap<String, String>>) -> Response {
    let cache = if query.get("v").map(String::as_str) == Some(SCRIPT_VERSION) {
        "public, max-age=31536000, immutable"
    } else {
        "public, max-age=300, must-revalidate"
    };
    (
        [
            (header::CONTENT_TYPE, "application/javascript; charset=utf-8"),
            (header::CACHE_CONTROL, cache),
        ],
        CLIENT_JS,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_tag_points_at_endpoint() {
        let html = flux_render_html::render_to_html(&script_tag("/flux"));
        assert!(html.contains(r#"src="/flux?v="#));
        assert!(html.contains(r#"data-flux-endpoint="/flux""#));
        assert!(html.ends_with("</script>"));
    }

    #[test]
    fn test_client_covers_protocol_fields() {
        for needle in ["flux_kind", "flux_id", "flux_action", "flux_mount[", "X-Flux-Redirect", "X-Flux-Refresh", "data-flux-confirm", "data-flux-include"] {
            assert!(CLIENT_JS.contains(needle), "client script lacks {}", needle);
        }
    }
}
