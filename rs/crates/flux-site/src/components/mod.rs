//! Live components of the site.

pub mod contact_form;
pub mod post_content;
pub mod post_details;
pub mod post_recommendations;
pub mod post_seo;
pub mod ui;

#[cfg(test)]
pub(crate) mod testing;

use flux_runtime::RuntimeBuilder;

pub use contact_form::ContactForm;
pub use post_content::PostContent;
pub use post_details::PostDetails;
pub use post_recommendations::PostRecommendations;
pub use post_seo::PostSeo;

/// Register every site component.
pub fn register(builder: RuntimeBuilder) -> flux_runtime::Result<RuntimeBuilder> {
    builder
        .register::<PostContent>()?
        .register::<PostDetails>()?
        .register::<PostSeo>()?
        .register::<ContactForm>()?
        .register::<PostRecommendations>()
}
