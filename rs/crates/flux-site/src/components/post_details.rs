//! Admin editor tab: status, image, featured flag, publish date, editor, notes.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use flux_dom::DomNode;
use flux_runtime::{Component, ComponentError, FluxNode, FormValues, MountParams, Scope, View};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::ui;
use crate::stores::{
    BlogStore, ImageGenerator, Post, NULL_DATETIME, POST_STATUS_DRAFT, POST_STATUS_PUBLISHED, POST_STATUS_TRASH,
    POST_STATUS_UNPUBLISHED,
};

pub const KIND: &str = "admin_blog_post_details";

const STATUS_OPTIONS: &[(&str, &str)] = &[
    ("", "- not selected -"),
    (POST_STATUS_DRAFT, "Draft"),
    (POST_STATUS_PUBLISHED, "Published"),
    (POST_STATUS_UNPUBLISHED, "Unpublished"),
    (POST_STATUS_TRASH, "In Trash Bin"),
];

const FEATURED_OPTIONS: &[(&str, &str)] = &[("", "- not selected -"), ("no", "No"), ("yes", "Yes")];

const EDITOR_OPTIONS: &[(&str, &str)] = &[
    ("", "- not selected -"),
    ("blockarea", "BlockArea"),
    ("blockeditor", "BlockEditor"),
    ("markdown", "Markdown"),
    ("markdown_easymde", "Markdown (EasyMDE)"),
    ("htmlarea", "HTML Area (WYSIWYG)"),
    ("textarea", "Text Area"),
];

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailsForm {
    pub status: String,
    pub image_url: String,
    pub featured: String,
    pub published_at: String,
    pub editor: String,
    pub memo: String,
}

impl DetailsForm {
    fn from_post(post: &Post) -> Self {
        Self {
            status: post.status.clone(),
            image_url: post.image_url.clone(),
            featured: post.featured.clone(),
            published_at: post.published_at_display().to_string(),
            editor: post.editor.clone(),
            memo: post.memo.clone(),
        }
    }

    fn from_values(form: &FormValues) -> Self {
        Self {
            status: form.trimmed("post_status"),
            image_url: form.trimmed("post_image_url"),
            featured: form.trimmed("post_featured"),
            published_at: form.trimmed("post_published_at"),
            editor: form.trimmed("post_editor"),
            memo: form.trimmed("post_memo"),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PostDetails {
    pub post_id: String,
    pub title: String,
    pub loaded: bool,
    pub form: DetailsForm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailsAction {
    Save,
    RegenerateImage,
}

impl FromStr for DetailsAction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "save" => Ok(Self::Save),
            "regenerate_image" => Ok(Self::RegenerateImage),
            _ => Err(()),
        }
    }
}

/// Normalize a submitted publish date to `YYYY-MM-DD HH:MM:SS`.
///
/// Accepts a space or `T` separator, with or without seconds, or a bare
/// date. Blank input means "not published".
pub fn normalize_published_at(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return Some(NULL_DATETIME.to_string());
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string());
    }
    let padded: String = format!("{}:00", input.replacen(' ', "T", 1)).chars().take(19).collect();
    NaiveDateTime::parse_from_str(&padded, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
}

impl PostDetails {
    /// The stored post, or a user-facing reason it cannot be edited.
    async fn load(&self, scope: &Scope<'_>) -> Result<(std::sync::Arc<dyn BlogStore>, Post), ComponentError> {
        let store = scope
            .ctx()
            .service::<dyn BlogStore>()
            .ok_or_else(|| ComponentError::rejected("Blog store not available"))?;
        match store.post_find_by_id(&self.post_id).await {
            Ok(Some(post)) => Ok((store, post)),
            Ok(None) => Err(ComponentError::rejected("Post not found")),
            Err(err) => {
                tracing::warn!(post_id = %self.post_id, error = %err, "post lookup failed");
                Err(ComponentError::rejected("Post not found"))
            }
        }
    }

    /// Validate and store the submitted form. The instance keeps its
    /// previous values unless the store accepted the update.
    async fn save(&mut self, scope: &mut Scope<'_>, form: &FormValues) -> Result<(), ComponentError> {
        let mut submitted = DetailsForm::from_values(form);
        if submitted.status.is_empty() {
            return Err(ComponentError::rejected("Status is required"));
        }
        let published_at = normalize_published_at(&submitted.published_at)
            .ok_or_else(|| ComponentError::rejected("Published at is not a valid date"))?;

        let (store, mut post) = self.load(scope).await?;
        post.status = submitted.status.clone();
        post.image_url = submitted.image_url.clone();
        post.featured = submitted.featured.clone();
        post.published_at = published_at;
        post.editor = submitted.editor.clone();
        post.memo = submitted.memo.clone();

        if let Err(err) = store.post_update(&post).await {
            tracing::error!(post_id = %self.post_id, error = %err, "saving post details failed");
            return Err(ComponentError::rejected("System error. Saving post failed"));
        }

        submitted.published_at = post.published_at_display().to_string();
        self.form = submitted;
        scope.success("Post saved successfully");
        Ok(())
    }

    async fn regenerate_image(&mut self, scope: &mut Scope<'_>) -> Result<(), ComponentError> {
        let (store, mut post) = self.load(scope).await?;
        let generator = scope
            .ctx()
            .service::<dyn ImageGenerator>()
            .ok_or_else(|| ComponentError::rejected("Failed to initialize AI engine"))?;

        let image_url = match generator.generate_image(&post.title, &post.summary).await {
            Ok(url) => url,
            Err(err) => {
                tracing::error!(post_id = %self.post_id, error = %err, "image generation failed");
                return Err(ComponentError::rejected("Failed to generate image"));
            }
        };

        post.image_url = image_url.clone();
        if let Err(err) = store.post_update(&post).await {
            tracing::error!(post_id = %self.post_id, error = %err, "saving generated image failed");
            return Err(ComponentError::rejected("Failed to save generated image"));
        }

        self.form.image_url = image_url;
        scope.success("Image regenerated successfully");
        Ok(())
    }

    fn details_form(&self) -> DomNode {
        let f = &self.form;
        let save = DomNode::button()
            .input_type("submit")
            .class("btn btn-primary")
            .flux_action("save")
            .flux_indicator("this, .post-save-spinner")
            .child(DomNode::icon().class("bi bi-save me-1"))
            .child(DomNode::text("span", "Save"))
            .child(ui::spinner("post-save-spinner"));

        let regenerate = DomNode::button()
            .input_type("button")
            .class("btn btn-outline-warning me-2")
            .flux_action("regenerate_image")
            .flux_confirm("Regenerate image? This will replace the current image URL for this post.")
            .flux_indicator("this, .post-image-spinner")
            .child(DomNode::icon().class("bi bi-magic me-1"))
            .child(DomNode::text("span", "Regenerate Image"))
            .child(ui::spinner("post-image-spinner"));

        DomNode::form()
            .id("FormPostUpdateDetails")
            .flux_action("save")
            .child(ui::field("Status", ui::select("post_status", &f.status, STATUS_OPTIONS)))
            .child(ui::field("Image URL", ui::text_input("post_image_url", &f.image_url)))
            .child_if(
                !f.image_url.is_empty(),
                DomNode::new("img")
                    .attr("src", &f.image_url)
                    .attr("alt", "")
                    .class("img-thumbnail mb-3")
                    .style("max-height: 120px;"),
            )
            .child(ui::field("Featured", ui::select("post_featured", &f.featured, FEATURED_OPTIONS)))
            .child(ui::field("Published At", ui::datetime_input("post_published_at", &f.published_at)))
            .child(ui::field("Editor", ui::select("post_editor", &f.editor, EDITOR_OPTIONS)))
            .child(ui::field("Admin Notes", ui::textarea("post_memo", &f.memo)))
            .child(DomNode::hidden_input("post_id", &self.post_id))
            .child(
                DomNode::div()
                    .class("mt-3 d-flex justify-content-between align-items-center")
                    .child(
                        DomNode::new("details")
                            .class("small")
                            .child(DomNode::text("summary", "Advanced Tools"))
                            .child(DomNode::div().class("border rounded p-2 mt-2").child(regenerate)),
                    )
                    .child(save),
            )
    }
}

#[async_trait]
impl Component for PostDetails {
    const KIND: &'static str = KIND;
    type Action = DetailsAction;

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
                tracing::error!(post_id = %self.post_id, error = %err, "loading post for details failed");
                return Err(ComponentError::rejected("Error loading post"));
            }
        };

        self.title = post.title.clone();
        self.form = DetailsForm::from_post(&post);
        self.loaded = true;
        Ok(())
    }

    async fn handle(
        &mut self,
        scope: &mut Scope<'_>,
        action: DetailsAction,
        form: &FormValues,
    ) -> Result<(), ComponentError> {
        match action {
            DetailsAction::Save => self.save(scope, form).await,
            DetailsAction::RegenerateImage => self.regenerate_image(scope).await,
        }
    }

    fn render(&self, view: &View<'_>) -> Result<DomNode, ComponentError> {
        let mut root = DomNode::div().class("card post-details");
        if self.loaded {
            root = root.child(
                DomNode::div()
                    .class("card-header")
                    .child(DomNode::text("h5", &self.title).class("mb-0")),
            );
        }
        let mut body = DomNode::div().class("card-body");
        if let Some(banner) = ui::feedback(view) {
            body = body.child(banner);
        }
        if self.loaded {
            body = body.child(self.details_form());
        }
        Ok(root.child(body))
    }
}
