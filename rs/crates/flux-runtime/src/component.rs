//! Component programming model.
//!
//! A component is a plain Rust value: its fields are its state, `Default`
//! is its zero value, and serde snapshots it between requests. Actions are
//! a per-component enum parsed from the wire name.

use async_trait::async_trait;
use flux_dom::DomNode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use crate::context::RequestContext;
use crate::error::ComponentError;

/// Name → value map passed to Mount, small and string valued.
pub type MountParams = BTreeMap<String, String>;

/// `(kind, id)` of a live instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identity {
    pub kind: String,
    pub id: String,
}

impl Identity {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self { kind: kind.into(), id: id.into() }
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

/// Submitted form values, multi-valued. Unknown keys are simply never read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormValues(BTreeMap<String, Vec<String>>);

impl FormValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.entry(name.into()).or_default().push(value.into());
    }

    /// First value for `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name)?.first().map(|s| s.as_str())
    }

    /// First value for `name`, trimmed, empty when absent
    pub fn trimmed(&self, name: &str) -> String {
        self.get(name).unwrap_or_default().trim().to_string()
    }

    pub fn get_all(&self, name: &str) -> &[String] {
        self.0.get(name).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = FormValues::new();
        for (k, v) in iter {
            values.append(k, v);
        }
        values
    }
}

/// Client navigation requested by a Handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub url: String,
    pub after: Option<Duration>,
}

/// Transient outcome of the latest lifecycle step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub last_error: Option<String>,
    pub last_success: Option<String>,
    // one-shot directives, taken by the dispatcher
    #[serde(skip)]
    pub redirect: Option<Redirect>,
    #[serde(skip)]
    pub refresh: bool,
}

impl Feedback {
    pub fn clear(&mut self) {
        *self = Feedback::default();
    }
}

/// What Mount and Handle see: context, identity and mutable feedback.
pub struct Scope<'a> {
    ctx: &'a RequestContext,
    identity: &'a Identity,
    feedback: &'a mut Feedback,
}

impl<'a> Scope<'a> {
    pub fn new(ctx: &'a RequestContext, identity: &'a Identity, feedback: &'a mut Feedback) -> Self {
        Self { ctx, identity, feedback }
    }

    pub fn ctx(&self) -> &RequestContext {
        self.ctx
    }

    pub fn identity(&self) -> &Identity {
        self.identity
    }

    pub fn feedback(&self) -> &Feedback {
        self.feedback
    }

    /// Record a user-facing error, clearing any success message.
    pub fn error(&mut self, msg: impl Into<String>) {
        self.feedback.last_error = Some(msg.into());
        self.feedback.last_success = None;
    }

    /// Record a user-facing success, clearing any error message.
    pub fn success(&mut self, msg: impl Into<String>) {
        self.feedback.last_success = Some(msg.into());
        self.feedback.last_error = None;
    }

    /// Ask the client to navigate once the fragment is swapped.
    pub fn redirect(&mut self, url: impl Into<String>) {
        self.feedback.redirect = Some(Redirect { url: url.into(), after: None });
    }

    pub fn redirect_after(&mut self, url: impl Into<String>, after: Duration) {
        self.feedback.redirect = Some(Redirect { url: url.into(), after: Some(after) });
    }

    /// Ask the client to reload the host page after the swap.
    pub fn refresh(&mut self) {
        self.feedback.refresh = true;
    }
}

/// What Render sees. Read-only.
pub struct View<'a> {
    ctx: &'a RequestContext,
    identity: &'a Identity,
    feedback: &'a Feedback,
}

impl<'a> View<'a> {
    pub fn new(ctx: &'a RequestContext, identity: &'a Identity, feedback: &'a Feedback) -> Self {
        Self { ctx, identity, feedback }
    }

    pub fn ctx(&self) -> &RequestContext {
        self.ctx
    }

    pub fn kind(&self) -> &str {
        &self.identity.kind
    }

    pub fn id(&self) -> &str {
        &self.identity.id
    }

    pub fn identity(&self) -> &Identity {
        self.identity
    }

    pub fn last_error(&self) -> Option<&str> {
        self.feedback.last_error.as_deref()
    }

    pub fn last_success(&self) -> Option<&str> {
        self.feedback.last_success.as_deref()
    }
}

/// A server-side stateful unit rendering an HTML fragment.
#[async_trait]
pub trait Component: Default + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Stable kind, unique across the process.
    const KIND: &'static str;

    /// Actions this component understands. A name that does not parse is
    /// ignored and the component is simply re-rendered.
    type Action: FromStr + Send;

    /// One-time initialization from mount parameters.
    async fn mount(&mut self, scope: &mut Scope<'_>, params: &MountParams) -> Result<(), ComponentError>;

    /// Respond to an action with the submitted form values.
    async fn handle(
        &mut self,
        scope: &mut Scope<'_>,
        action: Self::Action,
        form: &FormValues,
    ) -> Result<(), ComponentError>;

    /// Project state to HTML. Must not mutate anything.
    fn render(&self, view: &View<'_>) -> Result<DomNode, ComponentError>;
}

/// Whether a Handle call reached the component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    Dispatched,
    Ignored,
}

/// Object-safe face of `Component` used by the runtime.
#[async_trait]
pub(crate) trait ErasedComponent: Send + Sync {
    async fn mount(&mut self, scope: &mut Scope<'_>, params: &MountParams) -> Result<(), ComponentError>;

    async fn handle(
        &mut self,
        scope: &mut Scope<'_>,
        action: &str,
        form: &FormValues,
    ) -> Result<Handled, ComponentError>;

    fn render(&self, view: &View<'_>) -> Result<DomNode, ComponentError>;

    fn snapshot(&self) -> Result<serde_json::Value, serde_json::Error>;
}

pub(crate) struct Erased<C>(pub C);

#[async_trait]
impl<C: Component> ErasedComponent for Erased<C> {
    async fn mount(&mut self, scope: &mut Scope<'_>, params: &MountParams) -> Result<(), ComponentError> {
        self.0.mount(scope, params).await
    }

    async fn handle(
        &mut self,
        scope: &mut Scope<'_>,
        action: &str,
        form: &FormValues,
    ) -> Result<Handled, ComponentError> {
        let parsed = match action.parse::<C::Action>() {
            Ok(parsed) => parsed,
            Err(_) => return Ok(Handled::Ignored),
        };
        self.0.handle(scope, parsed, form).await?;
        Ok(Handled::Dispatched)
    }

    fn render(&self, view: &View<'_>) -> Result<DomNode, ComponentError> {
        self.0.render(view)
    }

    fn snapshot(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(&self.0)
    }
}
