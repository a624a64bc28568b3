//! "Keep Reading" block under a blog post. Loaded lazily after the page.

use async_trait::async_trait;
use flux_dom::DomNode;
use flux_runtime::{Component, ComponentError, FluxNode, FormValues, MountParams, Scope, View};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::ui;
use crate::stores::{BlogStore, Post, PostQuery, POST_STATUS_PUBLISHED};

pub const KIND: &str = "blog_post_recommendations";

const CANDIDATES: usize = 18;
const SHOWN: usize = 3;
const SUMMARY_LIMIT: usize = 160;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub image_url: String,
}

impl From<Post> for Recommendation {
    fn from(post: Post) -> Self {
        Self {
            summary: truncate(&post.summary, SUMMARY_LIMIT),
            id: post.id,
            title: post.title,
            image_url: post.image_url,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PostRecommendations {
    pub post_id: String,
    pub posts: Vec<Recommendation>,
}

pub enum RecommendationsAction {
    Refresh,
}

impl FromStr for RecommendationsAction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "refresh" => Ok(Self::Refresh),
            _ => Err(()),
        }
    }
}

/// Cut at a char boundary, marking the cut with "...".
fn truncate(text: &str, limit: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", text[..cut].trim_end()),
        None => text.to_string(),
    }
}

/// Random published posts other than `current`.
fn pick(candidates: Vec<Post>, current: &str) -> Vec<Recommendation> {
    let mut pool: Vec<Post> = candidates
        .into_iter()
        .filter(|p| p.id != current && p.is_published())
        .collect();
    pool.shuffle(&mut rand::thread_rng());
    pool.into_iter().take(SHOWN).map(Recommendation::from).collect()
}

impl PostRecommendations {
    async fn load(&mut self, scope: &mut Scope<'_>) -> Result<(), ComponentError> {
        let store = scope
            .ctx()
            .service::<dyn BlogStore>()
            .ok_or_else(|| ComponentError::rejected("Blog store is not configured"))?;
        let query = PostQuery {
            status: Some(POST_STATUS_PUBLISHED.to_string()),
            limit: CANDIDATES,
        };
        match store.post_list(&query).await {
            Ok(list) => {
                self.posts = pick(list, &self.post_id);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(post_id = %self.post_id, error = %err, "listing recommendations failed");
                self.posts.clear();
                Err(ComponentError::rejected("Unable to load more posts right now"))
            }
        }
    }
}

fn card(post: &Recommendation) -> DomNode {
    let href = format!("/blog/posts/{}", post.id);
    let mut body = DomNode::div()
        .class("card-body")
        .child(DomNode::new("h6").child(DomNode::text("a", &post.title).href(&href)));
    if !post.summary.is_empty() {
        body = body.child(DomNode::text("p", &post.summary).class("small text-muted mb-0"));
    }

    let mut card = DomNode::div().class("card h-100");
    if !post.image_url.is_empty() {
        card = card.child(
            DomNode::new("img")
                .class("card-img-top")
                .attr("src", &post.image_url)
                .attr("alt", &post.title)
                .attr("loading", "lazy"),
        );
    }
    DomNode::div().class("col-md-4").child(card.child(body))
}

#[async_trait]
impl Component for PostRecommendations {
    const KIND: &'static str = KIND;
    type Action = RecommendationsAction;

    async fn mount(&mut self, scope: &mut Scope<'_>, params: &MountParams) -> Result<(), ComponentError> {
        self.post_id = params.get("post_id").map(|s| s.trim().to_string()).unwrap_or_default();
        self.load(scope).await
    }

    async fn handle(
        &mut self,
        scope: &mut Scope<'_>,
        action: RecommendationsAction,
        _form: &FormValues,
    ) -> Result<(), ComponentError> {
        match action {
            RecommendationsAction::Refresh => self.load(scope).await,
        }
    }

    fn render(&self, view: &View<'_>) -> Result<DomNode, ComponentError> {
        let refresh = DomNode::button()
            .input_type("button")
            .class("btn btn-sm btn-outline-secondary")
            .flux_action("refresh")
            .flux_indicator("this")
            .child(DomNode::icon().class("bi bi-shuffle me-1"))
            .child(DomNode::text("span", "Show others"));

        let header = DomNode::div()
            .class("d-flex justify-content-between align-items-center mb-3")
            .child(DomNode::text("h4", "Keep Reading").class("mb-0"))
            .child(refresh);

        let mut section = DomNode::new("section").class("post-recommendations mt-5").child(header);
        if let Some(banner) = ui::feedback(view) {
            section = section.child(banner);
        }
        if self.posts.is_empty() {
            if view.last_error().is_none() {
                section = section.child(DomNode::text("p", "No other posts yet.").class("text-muted"));
            }
            return Ok(section);
        }
        Ok(section.child(DomNode::div().class("row g-4").children(self.posts.iter().map(card))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::testing::{fixture, html_of, id_of, post_form};
    use flux_runtime::{RequestContext, Runtime, Services, StaticContext};
    use std::sync::Arc;

    fn links(html: &str) -> Vec<String> {
        html.match_indices("href=\"/blog/posts/")
            .map(|(at, m)| {
                let rest = &html[at + m.len()..];
                rest[..rest.find('"').unwrap()].to_string()
            })
            .collect()
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 160), "short");
        let long = "a".repeat(200);
        let cut = truncate(&long, 160);
        assert_eq!(cut.len(), 163);
        assert!(cut.ends_with("..."));
        assert_eq!(truncate("héllo wörld", 5), "héllo...");
    }

    #[test]
    fn test_pick_excludes_current_and_drafts() {
        let mut posts: Vec<Post> = (1..=5)
            .map(|n| {
                let mut p = Post::new(&format!("P{}", n), "t");
                p.status = POST_STATUS_PUBLISHED.into();
                p
            })
            .collect();
        posts.push(Post::new("D1", "draft"));

        for _ in 0..20 {
            let picked = pick(posts.clone(), "P1");
            assert_eq!(picked.len(), SHOWN);
            assert!(picked.iter().all(|r| r.id != "P1" && r.id != "D1"));
        }
    }

    #[tokio::test]
    async fn test_lazy_mount_lists_three_others() {
        let fx = fixture();
        let html = html_of(&fx.ssr(KIND, &[("post_id", "P1")]).await);
        assert!(html.contains("Keep Reading"));
        let ids = links(&html);
        assert_eq!(ids.len(), 3);
        assert!(!ids.contains(&"P1".to_string()));
        assert!(!ids.contains(&"D1".to_string()));
    }

    #[tokio::test]
    async fn test_first_load_through_endpoint() {
        let fx = fixture();
        let body = "flux_kind=blog_post_recommendations&flux_action=&flux_mount%5Bpost_id%5D=P2";
        let (_, html) = fx.post(body).await;
        assert!(html.contains(r#"data-flux-id=""#));
        assert_eq!(links(&html).len(), 3);
        assert!(!links(&html).contains(&"P2".to_string()));
    }

    #[tokio::test]
    async fn test_refresh_reshuffles_within_pool() {
        let fx = fixture();
        let id = id_of(&fx.ssr(KIND, &[("post_id", "P1")]).await);
        let (_, html) = fx.post(&post_form(KIND, &id, "refresh", &[])).await;
        let ids = links(&html);
        assert_eq!(ids.len(), 3);
        assert!(ids.iter().all(|id| id != "P1"));
    }

    #[tokio::test]
    async fn test_store_unavailable() {
        let fx = fixture();
        fx.blog.set_offline(true);
        let html = html_of(&fx.ssr(KIND, &[("post_id", "P1")]).await);
        assert!(html.contains("Unable to load more posts right now"));
        assert!(!html.contains("No other posts yet."));
    }

    #[tokio::test]
    async fn test_store_not_configured() {
        let runtime = Runtime::builder()
            .register::<PostRecommendations>()
            .unwrap()
            .contexts(Arc::new(StaticContext(Arc::new(Services::new()))))
            .build();
        let ctx = RequestContext::new(Arc::new(Services::new()));
        let node = runtime
            .ssr(&ctx, KIND, [("post_id".to_string(), "P1".to_string())].into_iter().collect())
            .await;
        assert!(html_of(&node).contains("Blog store is not configured"));
    }
}
