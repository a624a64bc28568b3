//! Lifecycle engine: NEW --Mount--> READY --Handle--> READY.
//!
//! An `Instance` is a component loaded out of its store record. It is only
//! ever touched while the caller holds the instance token.

use flux_dom::DomNode;

use crate::component::{ErasedComponent, Feedback, FormValues, Handled, Identity, MountParams, Redirect, Scope, View};
use crate::context::RequestContext;
use crate::envelope::envelope;
use crate::error::{ComponentError, FluxError, Result, StoreError};
use crate::registry::Factory;
use crate::store::{Phase, Record};

/// Shown when Mount fails for a reason the user cannot act on.
pub const MOUNT_FAULT_MESSAGE: &str = "This section could not be loaded. Please try again later.";

pub struct Instance {
    identity: Identity,
    phase: Phase,
    component: Box<dyn ErasedComponent>,
    mount_params: MountParams,
    feedback: Feedback,
}

impl Instance {
    /// Load a record. Records still in `New` get a zero-valued component.
    pub(crate) fn from_record(factory: &Factory, record: Record) -> Result<Self> {
        let component = match record.phase {
            Phase::New => factory.create(),
            Phase::Ready => factory.restore(record.state).map_err(StoreError::from)?,
        };
        Ok(Self {
            identity: record.identity,
            phase: record.phase,
            component,
            mount_params: record.mount_params,
            feedback: record.feedback,
        })
    }

    pub(crate) fn to_record(&self) -> Result<Record> {
        let state = match self.phase {
            Phase::New => serde_json::Value::Null,
            Phase::Ready => self.component.snapshot().map_err(StoreError::from)?,
        };
        Ok(Record {
            identity: self.identity.clone(),
            phase: self.phase,
            state,
            mount_params: self.mount_params.clone(),
            feedback: self.feedback.clone(),
        })
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn mount_params(&self) -> &MountParams {
        &self.mount_params
    }

    pub fn feedback(&self) -> &Feedback {
        &self.feedback
    }

    /// Run Mount. Never fails the request: component errors end up in
    /// `last_error` and the instance still becomes READY.
    pub async fn mount(&mut self, ctx: &RequestContext, params: MountParams) -> Result<()> {
        if self.phase != Phase::New {
            return Err(FluxError::Lifecycle("mount on a mounted instance"));
        }
        self.mount_params = params;
        self.feedback.clear();

        let mut scope = Scope::new(ctx, &self.identity, &mut self.feedback);
        match self.component.mount(&mut scope, &self.mount_params).await {
            Ok(()) => {}
            Err(ComponentError::Rejected(msg)) => {
                tracing::debug!(kind = %self.identity.kind, id = %self.identity.id, "mount rejected: {}", msg);
                scope.error(msg);
            }
            Err(ComponentError::Fault(err)) => {
                tracing::warn!(kind = %self.identity.kind, id = %self.identity.id, error = %err, "mount failed");
                scope.error(MOUNT_FAULT_MESSAGE);
            }
        }
        self.phase = Phase::Ready;
        Ok(())
    }

    /// Run Handle for `action`. An empty action skips the component and
    /// keeps the previous feedback.
    pub async fn handle(&mut self, ctx: &RequestContext, action: &str, form: &FormValues) -> Result<Handled> {
        if self.phase != Phase::Ready {
            return Err(FluxError::Lifecycle("handle before mount"));
        }
        if action.is_empty() {
            return Ok(Handled::Ignored);
        }
        self.feedback.clear();

        let mut scope = Scope::new(ctx, &self.identity, &mut self.feedback);
        match self.component.handle(&mut scope, action, form).await {
            Ok(handled) => {
                if handled == Handled::Ignored {
                    tracing::debug!(kind = %self.identity.kind, id = %self.identity.id, action, "unknown action ignored");
                }
                Ok(handled)
            }
            Err(ComponentError::Rejected(msg)) => {
                scope.error(msg);
                Ok(Handled::Dispatched)
            }
            Err(ComponentError::Fault(err)) => Err(FluxError::HandlerFault(format!("{:#}", err))),
        }
    }

    /// Render and wrap in the identity envelope.
    pub fn render(&self, ctx: &RequestContext) -> Result<DomNode> {
        if self.phase != Phase::Ready {
            return Err(FluxError::Lifecycle("render before mount"));
        }
        let view = View::new(ctx, &self.identity, &self.feedback);
        let node = self.component.render(&view).map_err(|err| match err {
            ComponentError::Rejected(msg) => FluxError::RenderFault(msg),
            ComponentError::Fault(err) => FluxError::RenderFault(format!("{:#}", err)),
        })?;
        Ok(envelope(node, &self.identity, &self.mount_params))
    }

    /// Take the one-shot directives left by the latest Handle.
    pub fn take_directives(&mut self) -> (Option<Redirect>, bool) {
        (
            self.feedback.redirect.take(),
            std::mem::take(&mut self.feedback.refresh),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Services;
    use crate::registry::Registry;
    use crate::testing::Counter;
    use std::sync::Arc;

    fn ctx() -> RequestContext {
        RequestContext::new(Arc::new(Services::new()))
    }

    fn fresh(id: &str) -> Instance {
        let mut registry = Registry::new();
        registry.register::<Counter>().unwrap();
        let factory = registry.lookup("test_counter").unwrap();
        Instance::from_record(&factory, Record::new(Identity::new("test_counter", id))).unwrap()
    }

    fn params(pairs: &[(&str, &str)]) -> MountParams {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[tokio::test]
    async fn test_mount_then_render() {
        let mut instance = fresh("a");
        instance.mount(&ctx(), params(&[("label", "Clicks")])).await.unwrap();
        assert_eq!(instance.phase(), Phase::Ready);

        let html = flux_render_html::render_to_html(&instance.render(&ctx()).unwrap());
        assert!(html.contains(r#"data-flux-kind="test_counter""#));
        assert!(html.contains(r#"data-flux-id="a""#));
        assert!(html.contains("Clicks"));
        assert!(html.contains(r#"name="flux_mount[label]""#));
    }

    #[tokio::test]
    async fn test_mount_runs_once() {
        let mut instance = fresh("a");
        instance.mount(&ctx(), MountParams::new()).await.unwrap();
        let err = instance.mount(&ctx(), MountParams::new()).await.unwrap_err();
        assert!(matches!(err, FluxError::Lifecycle(_)));
    }

    #[tokio::test]
    async fn test_mount_errors_are_recorded_not_raised() {
        let mut rejected = fresh("a");
        rejected.mount(&ctx(), params(&[("start", "reject")])).await.unwrap();
        assert_eq!(rejected.feedback().last_error.as_deref(), Some("Label not found"));
        assert!(rejected.render(&ctx()).is_ok());

        let mut faulted = fresh("b");
        faulted.mount(&ctx(), params(&[("start", "fault")])).await.unwrap();
        assert_eq!(faulted.feedback().last_error.as_deref(), Some(MOUNT_FAULT_MESSAGE));
        assert_eq!(faulted.phase(), Phase::Ready);
    }

    #[tokio::test]
    async fn test_handle_before_mount_is_rejected() {
        let mut instance = fresh("a");
        let err = instance.handle(&ctx(), "increment", &FormValues::new()).await.unwrap_err();
        assert!(matches!(err, FluxError::Lifecycle(_)));
        assert!(instance.render(&ctx()).is_err());
    }

    #[tokio::test]
    async fn test_handle_outcomes() {
        let mut instance = fresh("a");
        instance.mount(&ctx(), MountParams::new()).await.unwrap();

        let handled = instance.handle(&ctx(), "increment", &FormValues::new()).await.unwrap();
        assert_eq!(handled, Handled::Dispatched);
        assert_eq!(instance.feedback().last_success.as_deref(), Some("Count is 1"));

        instance.handle(&ctx(), "reject", &FormValues::new()).await.unwrap();
        assert_eq!(instance.feedback().last_error.as_deref(), Some("Count is locked"));
        assert_eq!(instance.feedback().last_success, None);

        let err = instance.handle(&ctx(), "fault", &FormValues::new()).await.unwrap_err();
        assert!(matches!(err, FluxError::HandlerFault(msg) if msg.contains("database unreachable")));
    }

    #[tokio::test]
    async fn test_empty_action_keeps_feedback_and_unknown_is_noop() {
        let mut instance = fresh("a");
        instance.mount(&ctx(), params(&[("greet", "1")])).await.unwrap();

        assert_eq!(instance.handle(&ctx(), "", &FormValues::new()).await.unwrap(), Handled::Ignored);
        assert_eq!(instance.feedback().last_success.as_deref(), Some("Mounted"));

        let before = instance.to_record().unwrap().state;
        assert_eq!(instance.handle(&ctx(), "dance", &FormValues::new()).await.unwrap(), Handled::Ignored);
        assert_eq!(instance.to_record().unwrap().state, before);
    }

    #[tokio::test]
    async fn test_render_is_pure() {
        let mut instance = fresh("a");
        instance.mount(&ctx(), MountParams::new()).await.unwrap();
        instance.handle(&ctx(), "increment", &FormValues::new()).await.unwrap();

        let first = instance.render(&ctx()).unwrap();
        let second = instance.render(&ctx()).unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_render_fault() {
        let mut instance = fresh("a");
        instance.mount(&ctx(), MountParams::new()).await.unwrap();
        instance.handle(&ctx(), "break", &FormValues::new()).await.unwrap();
        assert!(matches!(instance.render(&ctx()), Err(FluxError::RenderFault(_))));
    }

    #[tokio::test]
    async fn test_record_roundtrip_preserves_state() {
        let mut registry = Registry::new();
        registry.register::<Counter>().unwrap();
        let factory = registry.lookup("test_counter").unwrap();

        let mut instance = fresh("a");
        instance.mount(&ctx(), params(&[("start", "4")])).await.unwrap();
        instance.handle(&ctx(), "increment", &FormValues::new()).await.unwrap();
        let record = instance.to_record().unwrap();

        let restored = Instance::from_record(&factory, record).unwrap();
        assert_eq!(restored.phase(), Phase::Ready);
        assert_eq!(restored.to_record().unwrap().state["count"], 5);
        assert_eq!(restored.feedback().last_success.as_deref(), Some("Count is 5"));
    }

    #[tokio::test]
    async fn test_directives_are_one_shot() {
        let mut instance = fresh("a");
        instance.mount(&ctx(), MountParams::new()).await.unwrap();
        instance.handle(&ctx(), "redirect", &FormValues::new()).await.unwrap();

        let (redirect, refresh) = instance.take_directives();
        assert_eq!(redirect.map(|r| r.url), Some("/done".to_string()));
        assert!(!refresh);
        assert_eq!(instance.take_directives(), (None, false));
    }
}
