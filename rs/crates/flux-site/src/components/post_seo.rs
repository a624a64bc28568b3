//! Admin editor tab: canonical URL and meta tags.

use async_trait::async_trait;
use flux_dom::DomNode;
use flux_runtime::{Component, ComponentError, FluxNode, FormValues, MountParams, Scope, View};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::ui;
use crate::stores::BlogStore;

pub const KIND: &str = "admin_blog_post_seo";

const ROBOTS_OPTIONS: &[(&str, &str)] = &[
    ("", "- not selected -"),
    ("INDEX, FOLLOW", "INDEX, FOLLOW"),
    ("NOINDEX, FOLLOW", "NOINDEX, FOLLOW"),
    ("INDEX, NOFOLLOW", "INDEX, NOFOLLOW"),
    ("NOINDEX, NOFOLLOW", "NOINDEX, NOFOLLOW"),
];

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PostSeo {
    pub post_id: String,
    pub loaded: bool,
    pub canonical_url: String,
    pub meta_description: String,
    pub meta_keywords: String,
    pub meta_robots: String,
}

pub enum SeoAction {
    Save,
}

impl FromStr for SeoAction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "save" => Ok(Self::Save),
            _ => Err(()),
        }
    }
}

#[async_trait]
impl Component for PostSeo {
    const KIND: &'static str = KIND;
    type Action = SeoAction;

    async fn mount(&mut self, scope: &mut Scope<'_>, params: &MountParams) -> Result<(), ComponentError> {
        self.post_id = params.get("post_id").map(|s| s.trim().to_string()).unwrap_or_default();
        if self.post_id.is_empty() {
            return Err(ComponentError::rejected("Post ID is required"));
        }
        let store = scope
            .ctx()
            .service::<dyn BlogStore>()
            .ok_or_else(|| ComponentError::rejected("Blog store not available"))?;

        let post = match store.post_find_by_id(&self.post_id).await {
            Ok(Some(post)) => post,
            Ok(None) => return Err(ComponentError::rejected("Post not found")),
            Err(err) => {
                tracing::error!(post_id = %self.post_id, error = %err, "loading post for SEO failed");
                return Err(ComponentError::rejected("Error loading post"));
            }
        };

        self.canonical_url = post.canonical_url;
        self.meta_description = post.meta_description;
        self.meta_keywords = post.meta_keywords;
        self.meta_robots = post.meta_robots;
        self.loaded = true;
        Ok(())
    }

    async fn handle(
        &mut self,
        scope: &mut Scope<'_>,
        action: SeoAction,
        form: &FormValues,
    ) -> Result<(), ComponentError> {
        let SeoAction::Save = action;

        let store = scope
            .ctx()
            .service::<dyn BlogStore>()
            .ok_or_else(|| ComponentError::rejected("Blog store not available"))?;
        let mut post = match store.post_find_by_id(&self.post_id).await {
            Ok(Some(post)) => post,
            _ => return Err(ComponentError::rejected("Post not found")),
        };

        post.canonical_url = form.trimmed("post_canonical_url");
        post.meta_description = form.trimmed("post_meta_description");
        post.meta_keywords = form.trimmed("post_meta_keywords");
        post.meta_robots = form.trimmed("post_meta_robots");

        if let Err(err) = store.post_update(&post).await {
            tracing::error!(post_id = %self.post_id, error = %err, "saving post SEO failed");
            return Err(ComponentError::rejected("System error. Saving post failed"));
        }

        self.canonical_url = post.canonical_url;
        self.meta_description = post.meta_description;
        self.meta_keywords = post.meta_keywords;
        self.meta_robots = post.meta_robots;
        scope.success("Post saved successfully");
        Ok(())
    }

    fn render(&self, view: &View<'_>) -> Result<DomNode, ComponentError> {
        let mut body = DomNode::div().class("card-body");
        if let Some(banner) = ui::feedback(view) {
            body = body.child(banner);
        }
        if !self.loaded {
            return Ok(DomNode::div().class("card post-seo").child(body));
        }

        let save = DomNode::button()
            .input_type("submit")
            .class("btn btn-primary")
            .flux_action("save")
            .flux_indicator("this, .post-seo-spinner")
            .child(DomNode::icon().class("bi bi-save me-1"))
            .child(DomNode::text("span", "Save"))
            .child(ui::spinner("post-seo-spinner"));

        let form = DomNode::form()
            .id("FormPostUpdateSEO")
            .flux_action("save")
            .child(ui::field("Meta Description", ui::text_input("post_meta_description", &self.meta_description)))
            .child(ui::field("Meta Keywords", ui::text_input("post_meta_keywords", &self.meta_keywords)))
            .child(ui::field("Meta Robots", ui::select("post_meta_robots", &self.meta_robots, ROBOTS_OPTIONS)))
            .child(ui::field("Canonical URL", ui::text_input("post_canonical_url", &self.canonical_url)))
            .child(DomNode::hidden_input("post_id", &self.post_id))
            .child(DomNode::div().class("mt-3 text-end").child(save));

        Ok(DomNode::div().class("card post-seo").child(body.child(form)))
    }
}
