//! HTTP action dispatcher.
//!
//! `POST <endpoint>` with an urlencoded body:
//!   flux_kind=<kind>&flux_id=<id>&flux_action=<action>&flux_mount[k]=v&...
//!
//! The reply is always an HTML fragment with status 200. Runtime errors are
//! rendered as an error fragment and tagged with `X-Flux-Error`; only a
//! malformed request gets a 400.

use axum::extract::rejection::FormRejection;
use axum::extract::{Form, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use flux_dom::DomNode;
use tracing::Instrument;

use crate::component::{FormValues, Identity, MountParams, Redirect};
use crate::context::RequestContext;
use crate::envelope::{envelope, error_fragment, parse_mount_field};
use crate::error::{FluxError, Result};
use crate::lifecycle::Instance;
use crate::locks::Token;
use crate::runtime::Runtime;
use crate::store::{Phase, Record};

pub const FIELD_KIND: &str = "flux_kind";
pub const FIELD_ID: &str = "flux_id";
pub const FIELD_ACTION: &str = "flux_action";

pub const HEADER_ERROR: &str = "x-flux-error";
pub const HEADER_REDIRECT: &str = "x-flux-redirect";
pub const HEADER_REDIRECT_AFTER: &str = "x-flux-redirect-after";
pub const HEADER_REFRESH: &str = "x-flux-refresh";

// ── Request ─────────────────────────────────────────────────────────

/// A decoded action request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    pub kind: String,
    /// Absent on the first-load path.
    pub id: Option<String>,
    /// Empty means re-render only.
    pub action: String,
    pub mount_params: MountParams,
    /// Everything that is not a protocol field.
    pub form: FormValues,
}

impl ActionRequest {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: None,
            action: String::new(),
            mount_params: MountParams::new(),
            form: FormValues::new(),
        }
    }

    /// Split raw form pairs into protocol fields and component values.
    /// `None` when `flux_kind` is missing or empty.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Option<Self> {
        let mut kind = None;
        let mut request = Self::new(String::new());

        for (name, value) in pairs {
            match name.as_str() {
                FIELD_KIND => kind = Some(value.trim().to_string()),
                FIELD_ID => request.id = Some(value.trim().to_string()).filter(|id| !id.is_empty()),
                FIELD_ACTION => request.action = value.trim().to_string(),
                _ => match parse_mount_field(&name) {
                    Some(param) => {
                        request.mount_params.entry(param.to_string()).or_insert(value);
                    }
                    None => request.form.append(name, value),
                },
            }
        }

        request.kind = kind.filter(|k| !k.is_empty())?;
        Some(request)
    }
}

// ── Reply ───────────────────────────────────────────────────────────

/// Fragment plus directives, ready to become an HTTP response.
#[derive(Debug)]
pub struct Reply {
    pub fragment: DomNode,
    pub redirect: Option<Redirect>,
    pub refresh: bool,
    /// `X-Flux-Error` tag when the fragment reports a runtime error.
    pub error: Option<&'static str>,
}

impl Reply {
    fn ok(fragment: DomNode, redirect: Option<Redirect>, refresh: bool) -> Self {
        Self { fragment, redirect, refresh, error: None }
    }

    /// Error fragment for `err`. When the instance is known the fragment
    /// keeps its identity and mount carriers so it stays addressable.
    fn failure(kind: &str, target: Option<(&Identity, &MountParams)>, err: &FluxError) -> Self {
        let id = target.map(|(identity, _)| identity.id.as_str());
        match err {
            FluxError::UnknownKind(_) | FluxError::KindConflict(_) => {
                tracing::warn!(kind, "action for unknown kind");
            }
            FluxError::InstanceGone { .. } => {
                tracing::info!(kind, id, "instance gone, asking client to refresh");
            }
            _ => tracing::error!(kind, id, error = %err, "dispatch failed"),
        }

        let message = match err {
            FluxError::UnknownKind(_) | FluxError::KindConflict(_) => "Unknown component.",
            FluxError::InstanceGone { .. } => "This section has expired. Reloading the page…",
            FluxError::RenderFault(_) => "This section could not be displayed.",
            _ => "Something went wrong. Please try again.",
        };
        let fragment = error_fragment(kind, id, message);
        Self {
            fragment: match target {
                Some((identity, mount)) => envelope(fragment, identity, mount),
                None => fragment,
            },
            redirect: None,
            refresh: matches!(err, FluxError::InstanceGone { .. }),
            error: Some(err.tag()),
        }
    }

    pub fn html(&self) -> String {
        flux_render_html::render_to_html(&self.fragment)
    }
}

fn header_value(value: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(value).ok()
}

pub(crate) fn into_response(reply: Reply, redirect_delay: std::time::Duration) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));

    if let Some(tag) = reply.error {
        headers.insert(HEADER_ERROR, HeaderValue::from_static(tag));
    }
    if let Some(redirect) = &reply.redirect {
        match header_value(&redirect.url) {
            Some(url) => {
                let after = redirect.after.unwrap_or(redirect_delay).as_secs();
                headers.insert(HEADER_REDIRECT, url);
                headers.insert(HEADER_REDIRECT_AFTER, HeaderValue::from(after));
            }
            None => tracing::warn!(url = %redirect.url, "redirect url is not a valid header value"),
        }
    }
    if reply.refresh {
        headers.insert(HEADER_REFRESH, HeaderValue::from_static("1"));
    }

    (StatusCode::OK, headers, reply.html()).into_response()
}

// ── Dispatch ────────────────────────────────────────────────────────

impl Runtime {
    /// Run one action request to completion.
    ///
    /// The instance token is taken before the work is spawned, so queued
    /// requests run in the order they were accepted. The work itself runs in
    /// its own task: a dropped connection does not cancel it, a panic is
    /// contained, and the dispatch budget aborts it.
    pub async fn dispatch(&self, ctx: RequestContext, request: ActionRequest) -> Reply {
        let span = tracing::info_span!(
            "dispatch",
            kind = %request.kind,
            id = request.id.as_deref().unwrap_or(""),
            action = %request.action,
        );
        self.dispatch_inner(ctx, request).instrument(span).await
    }

    async fn dispatch_inner(&self, ctx: RequestContext, request: ActionRequest) -> Reply {
        let ActionRequest { kind, id, action, mount_params, form } = request;
        let deadline = tokio::time::Instant::now() + self.config().dispatch_timeout;

        let factory = match self.registry().lookup(&kind) {
            Ok(factory) => factory,
            Err(err) => return Reply::failure(&kind, None, &err),
        };

        let (token, record, cold) = match tokio::time::timeout_at(deadline, self.resolve(&kind, id, &mount_params)).await {
            Ok(Ok(resolved)) => resolved,
            Ok(Err(err)) => return Reply::failure(&kind, None, &err),
            Err(_) => {
                let err = FluxError::HandlerFault("timed out waiting for the instance".to_string());
                return Reply::failure(&kind, None, &err);
            }
        };
        let identity = record.identity.clone();
        let carriers = if cold { mount_params.clone() } else { record.mount_params.clone() };
        let target = Some((&identity, &carriers));

        let runtime = self.clone();
        let mut task = tokio::spawn(
            async move {
                let _token = token;
                runtime.step(&ctx, &factory, record, cold.then_some(mount_params), &action, &form).await
            }
            .in_current_span(),
        );

        match tokio::time::timeout_at(deadline, &mut task).await {
            Ok(Ok(Ok(reply))) => reply,
            Ok(Ok(Err(err))) => Reply::failure(&kind, target, &err),
            Ok(Err(join_err)) => {
                let cause = if join_err.is_panic() { "component panicked" } else { "dispatch cancelled" };
                Reply::failure(&kind, target, &FluxError::HandlerFault(cause.to_string()))
            }
            Err(_) => {
                task.abort();
                Reply::failure(&kind, target, &FluxError::HandlerFault("dispatch timed out".to_string()))
            }
        }
    }

    /// Find the instance and take its token. On a miss with mount params,
    /// or without an id, a fresh instance is created (cold path).
    async fn resolve(&self, kind: &str, id: Option<String>, mount_params: &MountParams) -> Result<(Token, Record, bool)> {
        if let Some(id) = id {
            let identity = Identity::new(kind, id);
            let token = self.inner.locks.acquire(&identity).await;
            if let Some(record) = self.store().get(&identity).await? {
                return Ok((token, record, false));
            }
            if mount_params.is_empty() {
                return Err(FluxError::InstanceGone { kind: identity.kind, id: identity.id });
            }
            tracing::debug!(kind, id = %identity.id, "unknown id, reconstructing from mount params");
        }

        let record = self.store().create(kind).await?;
        let token = self.inner.locks.acquire(&record.identity).await;
        Ok((token, record, true))
    }

    /// Mount if needed, Handle, save, Render. Caller holds the token.
    async fn step(
        &self,
        ctx: &RequestContext,
        factory: &crate::registry::Factory,
        record: Record,
        cold_params: Option<MountParams>,
        action: &str,
        form: &FormValues,
    ) -> Result<Reply> {
        let mut instance = Instance::from_record(factory, record)?;

        if instance.phase() == Phase::New {
            let params = cold_params.unwrap_or_else(|| instance.mount_params().clone());
            instance.mount(ctx, params).await?;
            self.store().save(&instance.to_record()?).await?;
        }

        instance.handle(ctx, action, form).await?;
        let (redirect, refresh) = instance.take_directives();
        self.store().save(&instance.to_record()?).await?;

        let fragment = instance.render(ctx)?;
        Ok(Reply::ok(fragment, redirect, refresh))
    }
}

// ── Axum handler ────────────────────────────────────────────────────

pub(crate) async fn handle_action(
    State(runtime): State<Runtime>,
    headers: HeaderMap,
    body: std::result::Result<Form<Vec<(String, String)>>, FormRejection>,
) -> Response {
    let Form(pairs) = match body {
        Ok(form) => form,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "malformed action request");
            return (StatusCode::BAD_REQUEST, "malformed action request").into_response();
        }
    };
    let Some(request) = ActionRequest::from_pairs(pairs) else {
        return (StatusCode::BAD_REQUEST, "flux_kind is required").into_response();
    };

    let ctx = runtime.context(&headers);
    let reply = runtime.dispatch(ctx, request).await;
    into_response(reply, runtime.config().redirect_delay)
}
