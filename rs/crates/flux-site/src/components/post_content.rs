//! Admin editor tab: title, summary and body.

use async_trait::async_trait;
use flux_dom::DomNode;
use flux_runtime::{Component, ComponentError, FluxNode, FormValues, MountParams, Scope, View};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::ui;
use crate::stores::BlogStore;

pub const KIND: &str = "admin_blog_post_content";

/// Editor value that gets the auto-growing plain textarea.
const EDITOR_MARKDOWN: &str = "markdown";

const AUTO_RESIZE_SCRIPT: &str = "(function(){var t=document.querySelector('textarea[name=\"post_content\"]');\
if(!t)return;var r=function(){t.style.height='auto';t.style.height=t.scrollHeight+'px';};\
r();t.addEventListener('input',r);})();";

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PostContent {
    pub post_id: String,
    pub editor: String,
    pub loaded: bool,
    pub title: String,
    pub summary: String,
    pub content: String,
}

pub enum ContentAction {
    Save,
}

impl FromStr for ContentAction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "save" => Ok(Self::Save),
            _ => Err(()),
        }
    }
}

impl PostContent {
    fn help(text: &str) -> DomNode {
        DomNode::text("div", text).class("form-text")
    }

    fn content_field(&self) -> DomNode {
        let area = ui::textarea("post_content", &self.content)
            .attr("rows", "12")
            .attr_if(!self.editor.is_empty(), "data-editor", &self.editor);
        let field = ui::field("Content", area)
            .child(Self::help("The content of this blog post to display on the post details page."));
        if self.editor == EDITOR_MARKDOWN {
            field.child(DomNode::new("script").child(DomNode::raw(AUTO_RESIZE_SCRIPT)))
        } else {
            field
        }
    }
}

#[async_trait]
impl Component for PostContent {
    const KIND: &'static str = KIND;
    type Action = ContentAction;

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
                tracing::error!(post_id = %self.post_id, error = %err, "loading post for content failed");
                return Err(ComponentError::rejected("Error loading post"));
            }
        };

        self.editor = post.editor;
        self.title = post.title;
        self.summary = post.summary;
        self.content = post.content;
        self.loaded = true;
        Ok(())
    }

    async fn handle(
        &mut self,
        scope: &mut Scope<'_>,
        action: ContentAction,
        form: &FormValues,
    ) -> Result<(), ComponentError> {
        let ContentAction::Save = action;

        let title = form.trimmed("post_title");
        let summary = form.trimmed("post_summary");
        // body text is stored as typed
        let content = form.get("post_content").unwrap_or_default().to_string();
        if title.is_empty() {
            return Err(ComponentError::rejected("Title is required"));
        }

        let store = scope
            .ctx()
            .service::<dyn BlogStore>()
            .ok_or_else(|| ComponentError::rejected("Blog store not available"))?;
        let mut post = match store.post_find_by_id(&self.post_id).await {
            Ok(Some(post)) => post,
            _ => return Err(ComponentError::rejected("Post not found")),
        };

        post.title = title;
        post.summary = summary;
        post.content = content;

        if let Err(err) = store.post_update(&post).await {
            tracing::error!(post_id = %self.post_id, error = %err, "saving post content failed");
            return Err(ComponentError::rejected("System error. Saving post failed"));
        }

        self.title = post.title;
        self.summary = post.summary;
        self.content = post.content;
        scope.success("Post saved successfully");
        Ok(())
    }

    fn render(&self, view: &View<'_>) -> Result<DomNode, ComponentError> {
        let mut body = DomNode::div().class("card-body");
        if let Some(banner) = ui::feedback(view) {
            body = body.child(banner);
        }
        if !self.loaded {
            return Ok(DomNode::div().class("card post-content").child(body));
        }

        let save = DomNode::button()
            .input_type("submit")
            .class("btn btn-primary")
            .flux_action("save")
            .flux_indicator("this, .post-content-spinner")
            .child(DomNode::icon().class("bi bi-save me-1"))
            .child(DomNode::text("span", "Save"))
            .child(ui::spinner("post-content-spinner"));

        let form = DomNode::form()
            .id("FormPostUpdateContent")
            .flux_action("save")
            .child(
                ui::field("Title", ui::text_input("post_title", &self.title))
                    .child(Self::help("The title of this blog as will be seen everywhere")),
            )
            .child(
                ui::field("Summary", ui::text_input("post_summary", &self.summary))
                    .child(Self::help("A short summary of this blog post to display on the post listing page.")),
            )
            .child(self.content_field())
            .child(DomNode::hidden_input("post_id", &self.post_id))
            .child(DomNode::div().class("mt-3 text-end").child(save));

        Ok(DomNode::div().class("card post-content").child(body.child(form)))
    }
}
