//! Fixtures for component tests: seeded in-memory stores behind a runtime.

use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, Request};
use flux_dom::DomNode;
use flux_runtime::{Identity, MountParams, RequestContext, Runtime, Services};
use std::sync::Arc;
use tower::ServiceExt;

use crate::security::{CookieContext, Signer, USER_COOKIE};
use crate::stores::{
    BlogStore, ImageGenerator, MemoryBlogStore, MemoryRecordStore, MemoryUserStore, PlaceholderImages, Post, RecordStore,
    User, UserStore, POST_STATUS_PUBLISHED,
};

pub struct Fixture {
    pub runtime: Runtime,
    pub blog: Arc<MemoryBlogStore>,
    pub users: Arc<MemoryUserStore>,
    pub records: Arc<MemoryRecordStore>,
    pub ctx: RequestContext,
}

impl Fixture {
    pub async fn ssr(&self, kind: &str, params: &[(&str, &str)]) -> DomNode {
        self.render_for(self.ctx.clone(), kind, params).await
    }

    /// Server-render as a signed-in user.
    pub async fn ssr_as(&self, user_id: &str, kind: &str, params: &[(&str, &str)]) -> DomNode {
        self.render_for(self.ctx.clone().with_user(user_id), kind, params).await
    }

    async fn render_for(&self, ctx: RequestContext, kind: &str, params: &[(&str, &str)]) -> DomNode {
        let params: MountParams = params.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        self.runtime.ssr(&ctx, kind, params).await
    }

    /// Stored state of a live instance.
    pub async fn state(&self, kind: &str, id: &str) -> serde_json::Value {
        self.runtime.store().get(&Identity::new(kind, id)).await.unwrap().unwrap().state
    }

    /// POST an urlencoded body to the action endpoint.
    pub async fn post(&self, body: &str) -> (HeaderMap, String) {
        self.send(body, None).await
    }

    /// POST as a signed-in user.
    pub async fn post_as(&self, user_id: &str, body: &str) -> (HeaderMap, String) {
        self.send(body, Some(user_id)).await
    }

    async fn send(&self, body: &str, user_id: Option<&str>) -> (HeaderMap, String) {
        let mut request = Request::builder()
            .method("POST")
            .uri("/flux")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(user_id) = user_id {
            request = request.header(header::COOKIE, format!("{}={}", USER_COOKIE, user_id));
        }
        let request = request.body(Body::from(body.to_string())).unwrap();
        let response = self.runtime.router().oneshot(request).await.unwrap();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (headers, String::from_utf8(bytes.to_vec()).unwrap())
    }
}

fn published(id: &str, title: &str, published_at: &str) -> Post {
    let mut post = Post::new(id, title);
    post.status = POST_STATUS_PUBLISHED.to_string();
    post.summary = format!("About {}", title);
    post.published_at = published_at.to_string();
    post
}

fn build(with_images: bool) -> Fixture {
    let blog = Arc::new(MemoryBlogStore::new());
    blog.insert(published("P1", "X", "2024-01-01 09:00:00"));
    for n in 2..=6 {
        blog.insert(published(&format!("P{}", n), &format!("Post {}", n), &format!("2024-0{}-01 09:00:00", n)));
    }
    blog.insert(Post::new("D1", "Unfinished draft"));

    let users = Arc::new(MemoryUserStore::new());
    users.insert(User {
        id: "u1".into(),
        email: "ada@example.com".into(),
        first_name: "Ada".into(),
        last_name: String::new(),
    });
    let records = Arc::new(MemoryRecordStore::new());

    let mut services = Services::new();
    services
        .insert::<dyn BlogStore>(blog.clone())
        .insert::<dyn UserStore>(users.clone())
        .insert::<dyn RecordStore>(records.clone())
        .insert::<Signer>(Arc::new(Signer::new(b"test signing key").unwrap()));
    if with_images {
        services.insert::<dyn ImageGenerator>(Arc::new(PlaceholderImages::default()));
    }
    let services = Arc::new(services);

    let runtime = super::register(Runtime::builder())
        .unwrap()
        .contexts(Arc::new(CookieContext::new(services.clone())))
        .build();

    Fixture {
        runtime,
        blog,
        users,
        records,
        ctx: RequestContext::new(services),
    }
}

pub fn fixture() -> Fixture {
    build(true)
}

pub fn fixture_without_images() -> Fixture {
    build(false)
}

pub fn html_of(node: &DomNode) -> String {
    flux_render_html::render_to_html(node)
}

/// `value` of the input named `name` in rendered HTML.
pub fn input_value(html: &str, name: &str) -> String {
    let marker = format!("name=\"{}\"", name);
    let tag_start = html.find(&marker).unwrap();
    let rest = &html[tag_start..];
    let tag = &rest[..rest.find('>').unwrap()];
    let value = &tag[tag.find("value=\"").unwrap() + 7..];
    value[..value.find('"').unwrap()].to_string()
}

pub fn id_of(node: &DomNode) -> String {
    node.get_attr("data-flux-id").unwrap_or_default().to_string()
}

fn encode(value: &str) -> String {
    value
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => (b as char).to_string(),
            b' ' => "+".to_string(),
            _ => format!("%{:02X}", b),
        })
        .collect()
}

/// Urlencoded action body for `kind/id` with extra form fields.
pub fn post_form(kind: &str, id: &str, action: &str, fields: &[(&str, &str)]) -> String {
    let mut pairs = vec![
        format!("flux_kind={}", encode(kind)),
        format!("flux_id={}", encode(id)),
        format!("flux_action={}", encode(action)),
    ];
    pairs.extend(fields.iter().map(|(k, v)| format!("{}={}", encode(k), encode(v))));
    pairs.join("&")
}
