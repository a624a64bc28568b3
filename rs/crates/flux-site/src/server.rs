use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use flux_dom::DomNode;
use flux_render_html::{render_page, PageOptions};
use flux_runtime::{FluxNode, Identity, MountParams, RequestContext, Runtime};

use crate::components::{contact_form, post_content, post_details, post_recommendations, post_seo};
use crate::error::AppError;
use crate::stores::{BlogStore, PostQuery, POST_STATUS_PUBLISHED};

const BOOTSTRAP_CSS: &str = "https://cdn.jsdelivr.net/npm/bootstrap@5.3.3/dist/css/bootstrap.min.css";
const BOOTSTRAP_ICONS: &str = "https://cdn.jsdelivr.net/npm/bootstrap-icons@1.11.3/font/bootstrap-icons.min.css";

// ── Shared state ────────────────────────────────────────────────────

pub struct AppState {
    pub runtime: Runtime,
}

// ── Router ──────────────────────────────────────────────────────────

pub fn router(state: Arc<AppState>) -> Router {
    let live = state.runtime.router();
    Router::new()
        .route("/health", get(health))
        .route("/", get(homepage))
        .route("/blog/posts/:id", get(post_page))
        .route("/admin/blog/posts/:id", get(admin_post_page))
        .route("/contact", get(contact_page))
        .with_state(state)
        .merge(live)
}

// ── Helpers ─────────────────────────────────────────────────────────

fn page(runtime: &Runtime, title: &str, content: DomNode) -> Html<String> {
    render(runtime, content, PageOptions {
        title: Some(title.to_string()),
        ..Default::default()
    })
}

/// Wrap `content` in the site layout with the client script appended.
fn render(runtime: &Runtime, content: DomNode, opts: PageOptions) -> Html<String> {
    let body = DomNode::new("main")
        .class("container py-5")
        .child(content)
        .child(runtime.script_tag());
    Html(render_page(&PageOptions {
        body,
        styles: vec![BOOTSTRAP_CSS.to_string(), BOOTSTRAP_ICONS.to_string()],
        ..opts
    }))
}

fn params(pairs: &[(&str, &str)]) -> MountParams {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

fn blog(ctx: &RequestContext) -> Result<Arc<dyn BlogStore>, AppError> {
    ctx.service::<dyn BlogStore>()
        .ok_or_else(|| AppError::Internal("blog store not configured".into()))
}

/// Identity carried by a rendered component root, if it mounted.
fn identity_of(node: &DomNode) -> Option<Identity> {
    let kind = node.get_attr(flux_runtime::envelope::DATA_FLUX_KIND)?;
    let id = node.get_attr(flux_runtime::envelope::DATA_FLUX_ID)?;
    Some(Identity::new(kind, id))
}

// ── Handlers ────────────────────────────────────────────────────────

async fn health() -> &'static str {
    "ok"
}

async fn homepage(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Result<Html<String>, AppError> {
    let ctx = state.runtime.context(&headers);
    let posts = blog(&ctx)?
        .post_list(&PostQuery {
            status: Some(POST_STATUS_PUBLISHED.to_string()),
            limit: 0,
        })
        .await?;

    let list = DomNode::new("ul").class("list-unstyled").children(posts.iter().map(|post| {
        DomNode::new("li")
            .class("mb-2")
            .child(DomNode::text("a", &post.title).href(&format!("/blog/posts/{}", post.id)))
            .child(DomNode::text("small", &format!(" ({})", post.published_at_display())).class("text-muted"))
            .child(DomNode::text("a", "edit").class("ms-2 small").href(&format!("/admin/blog/posts/{}", post.id)))
    }));

    let content = DomNode::div()
        .child(DomNode::text("h1", "Blog"))
        .child(list)
        .child(DomNode::text("a", "Contact us").href("/contact"));
    Ok(page(&state.runtime, "Blog", content))
}

async fn post_page(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Html<String>, AppError> {
    let ctx = state.runtime.context(&headers);
    let post = blog(&ctx)?
        .post_find_by_id(&id)
        .await?
        .filter(|post| post.is_published())
        .ok_or_else(|| AppError::NotFound(format!("post {}", id)))?;

    let mut article = DomNode::new("article").child(DomNode::text("h1", &post.title));
    if !post.image_url.is_empty() {
        article = article.child(
            DomNode::new("img")
                .class("img-fluid rounded mb-3")
                .attr("src", &post.image_url)
                .attr("alt", &post.title),
        );
    }
    article = article.child(DomNode::text("p", &post.summary).class("lead"));
    article = article.children(
        post.content
            .split("\n\n")
            .map(str::trim)
            .filter(|para| !para.is_empty())
            .map(|para| DomNode::text("p", para)),
    );

    let recommendations = state
        .runtime
        .placeholder(post_recommendations::KIND, &params(&[("post_id", &post.id)]));

    let content = DomNode::div().child(article).child(recommendations);
    let description = if post.meta_description.is_empty() { &post.summary } else { &post.meta_description };
    Ok(render(
        &state.runtime,
        content,
        PageOptions {
            title: Some(post.title.clone()),
            description: Some(description.clone()),
            canonical_url: Some(post.canonical_url.clone()),
            robots: Some(post.meta_robots.clone()),
            ..Default::default()
        },
    ))
}

async fn admin_post_page(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Html<String> {
    let runtime = &state.runtime;
    let ctx = runtime.context(&headers);
    let mount = params(&[("post_id", &id)]);

    let editor = runtime.ssr(&ctx, post_content::KIND, mount.clone()).await;
    let details = runtime.ssr(&ctx, post_details::KIND, mount.clone()).await;
    let seo = runtime.ssr(&ctx, post_seo::KIND, mount).await;

    // Toolbar button outside the details card, posting to it by identity.
    let mut toolbar = DomNode::div()
        .class("d-flex justify-content-between align-items-center mb-4")
        .child(DomNode::text("h1", "Edit post").class("h3 mb-0"));
    if let Some(target) = identity_of(&details) {
        toolbar = toolbar.child(
            DomNode::button()
                .input_type("button")
                .class("btn btn-outline-primary")
                .flux_action("regenerate_image")
                .flux_target(&target)
                .flux_confirm("Regenerate the featured image? The current image will be replaced.")
                .flux_indicator("this")
                .child(DomNode::icon().class("bi bi-stars me-1"))
                .child(DomNode::text("span", "Regenerate image")),
        );
    }

    let content = DomNode::div()
        .child(toolbar)
        .child(
            DomNode::div()
                .class("row g-4")
                .child(DomNode::div().class("col-12").child(editor))
                .child(DomNode::div().class("col-lg-7").child(details))
                .child(DomNode::div().class("col-lg-5").child(seo)),
        );
    page(runtime, "Edit post", content)
}

async fn contact_page(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Html<String> {
    let runtime = &state.runtime;
    let ctx = runtime.context(&headers);
    let user_id = ctx.user_id().unwrap_or_default().to_string();
    let form = runtime
        .ssr(&ctx, contact_form::KIND, params(&[("user_id", &user_id)]))
        .await;

    let content = DomNode::div()
        .class("col-lg-8 mx-auto")
        .child(DomNode::text("h1", "Contact us").class("mb-4"))
        .child(form);
    page(runtime, "Contact us", content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::{CookieContext, Signer};
    use crate::{components, seed};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    fn app() -> Router {
        let services = Arc::new(seed::services(Signer::new(b"test signing key").unwrap()));
        let runtime = components::register(Runtime::builder())
            .unwrap()
            .contexts(Arc::new(CookieContext::new(services)))
            .build();
        router(Arc::new(AppState { runtime }))
    }

    async fn fetch(app: Router, uri: &str, cookie: Option<&str>) -> (StatusCode, String) {
        let mut request = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let response = app.oneshot(request.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_health_and_home() {
        let (status, body) = fetch(app(), "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");

        let (status, body) = fetch(app(), "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("/blog/posts/1"));
        assert!(!body.contains("Notes on instance eviction"));
    }

    #[tokio::test]
    async fn test_admin_page_embeds_editors_and_toolbar() {
        let (status, body) = fetch(app(), "/admin/blog/posts/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(r#"data-flux-kind="admin_blog_post_content""#));
        assert!(body.contains("FormPostUpdateContent"));
        assert!(body.contains(r#"data-flux-kind="admin_blog_post_details""#));
        assert!(body.contains(r#"data-flux-kind="admin_blog_post_seo""#));
        assert!(body.contains(r#"data-flux-target-kind="admin_blog_post_details""#));
        assert!(body.contains("data-flux-endpoint=\"/flux\""));
    }

    #[tokio::test]
    async fn test_admin_page_for_missing_post_still_renders() {
        let (status, body) = fetch(app(), "/admin/blog/posts/404", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Post not found"));
        assert!(body.contains(r#"data-flux-kind="admin_blog_post_seo""#));
    }

    #[tokio::test]
    async fn test_post_page_has_lazy_recommendations() {
        let (status, body) = fetch(app(), "/blog/posts/2", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Forms that remember"));
        assert!(body.contains("<p>This post is part of the demo content shipped with the site.</p>"));
        assert!(body.contains(r#"<meta name="description" content="Keeping form state"#));
        assert!(!body.contains(r#"rel="canonical""#));
        assert!(body.contains(r#"data-flux-kind="blog_post_recommendations""#));
        assert!(body.contains(r#"data-flux-lazy="1""#));
    }

    #[tokio::test]
    async fn test_unpublished_post_is_not_found() {
        let (status, _) = fetch(app(), "/blog/posts/6", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_contact_page_prefills_cookie_user() {
        let (status, body) = fetch(app(), "/contact", Some("flux_user=demo")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(r#"value="demo@example.com""#));

        let (_, body) = fetch(app(), "/contact", None).await;
        assert!(!body.contains("demo@example.com"));
        assert!(body.contains("FormContact"));
    }

    fn attr_value(html: &str, marker: &str) -> String {
        let start = html.find(marker).unwrap() + marker.len();
        html[start..start + html[start..].find('"').unwrap()].to_string()
    }

    #[tokio::test]
    async fn test_toolbar_targets_details_instance_only() {
        let app = app();
        let (_, page) = fetch(app.clone(), "/admin/blog/posts/1", None).await;
        let details_id = attr_value(&page, r#"data-flux-target-id=""#);
        assert!(page.contains(r#"data-flux-kind="admin_blog_post_seo""#));

        let body = format!(
            "flux_kind=admin_blog_post_details&flux_id={}&flux_action=regenerate_image&flux_mount%5Bpost_id%5D=1",
            details_id
        );
        let request = Request::builder()
            .method("POST")
            .uri("/flux")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let fragment = String::from_utf8(bytes.to_vec()).unwrap();

        assert!(fragment.contains(&format!(r#"data-flux-id="{}""#, details_id)));
        assert!(fragment.contains("Image regenerated successfully"));
        assert!(!fragment.contains("admin_blog_post_seo"));
    }

    #[tokio::test]
    async fn test_script_served_from_endpoint() {
        let (status, body) = fetch(app(), "/flux", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("data-flux-action"));
    }
}
