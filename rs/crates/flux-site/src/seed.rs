//! Demo content for a fresh process.

use std::sync::Arc;

use flux_runtime::Services;

use crate::security::Signer;

use crate::stores::{
    BlogStore, ImageGenerator, MemoryBlogStore, MemoryRecordStore, MemoryUserStore, PlaceholderImages, Post,
    RecordStore, User, UserStore, POST_STATUS_DRAFT, POST_STATUS_PUBLISHED,
};

const POSTS: &[(&str, &str, &str, &str)] = &[
    (
        "1",
        "Rendering on the server again",
        "Why sending HTML over the wire keeps pages fast and forms simple.",
        "2024-03-04 09:00:00",
    ),
    (
        "2",
        "Forms that remember",
        "Keeping form state on the server between clicks, without a client store.",
        "2024-03-18 09:00:00",
    ),
    (
        "3",
        "Loading indicators done right",
        "Disable the button, show the spinner, restore both when the fragment lands.",
        "2024-04-02 09:00:00",
    ),
    (
        "4",
        "Confirm before you regenerate",
        "Small prompts in front of destructive actions save a lot of support mail.",
        "2024-04-20 09:00:00",
    ),
    (
        "5",
        "Lazy sections below the fold",
        "Render the article first and let the recommendations arrive a moment later.",
        "2024-05-06 09:00:00",
    ),
];

pub fn blog() -> MemoryBlogStore {
    let blog = MemoryBlogStore::new();
    for (id, title, summary, published_at) in POSTS {
        let mut post = Post::new(id, title);
        post.summary = summary.to_string();
        post.content = format!("{}\n\nThis post is part of the demo content shipped with the site.", summary);
        post.status = POST_STATUS_PUBLISHED.to_string();
        post.published_at = published_at.to_string();
        blog.insert(post);
    }
    let mut draft = Post::new("6", "Notes on instance eviction");
    draft.status = POST_STATUS_DRAFT.to_string();
    blog.insert(draft);
    blog
}

pub fn users() -> MemoryUserStore {
    let users = MemoryUserStore::new();
    users.insert(User {
        id: "demo".into(),
        email: "demo@example.com".into(),
        first_name: "Demo".into(),
        last_name: String::new(),
    });
    users
}

/// Every service the site components look up.
pub fn services(signer: Signer) -> Services {
    let mut services = Services::new();
    services
        .insert::<dyn BlogStore>(Arc::new(blog()))
        .insert::<dyn UserStore>(Arc::new(users()))
        .insert::<dyn RecordStore>(Arc::new(MemoryRecordStore::new()))
        .insert::<dyn ImageGenerator>(Arc::new(PlaceholderImages::default()))
        .insert::<Signer>(Arc::new(signer));
    services
}
