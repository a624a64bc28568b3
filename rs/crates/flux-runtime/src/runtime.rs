//! The runtime handle shared by page handlers and the action endpoint.

use axum::http::HeaderMap;
use axum::routing::post;
use axum::Router;
use flux_dom::DomNode;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::component::{Component, Identity, MountParams};
use crate::config::RuntimeConfig;
use crate::context::{ContextProvider, RequestContext, Services, StaticContext};
use crate::dispatch::handle_action;
use crate::envelope::{error_fragment, lazy_shell};
use crate::error::{FluxError, Result};
use crate::lifecycle::Instance;
use crate::locks::InstanceLocks;
use crate::registry::Registry;
use crate::script::{script_tag, serve_script};
use crate::store::{MemoryStore, StateStore};

pub(crate) struct Inner {
    pub(crate) registry: Registry,
    pub(crate) store: Arc<dyn StateStore>,
    pub(crate) locks: InstanceLocks,
    pub(crate) config: RuntimeConfig,
    pub(crate) contexts: Arc<dyn ContextProvider>,
}

/// Cheap to clone; every clone shares the same registry and store.
#[derive(Clone)]
pub struct Runtime {
    pub(crate) inner: Arc<Inner>,
}

pub struct RuntimeBuilder {
    registry: Registry,
    store: Option<Arc<dyn StateStore>>,
    config: RuntimeConfig,
    contexts: Option<Arc<dyn ContextProvider>>,
}

impl RuntimeBuilder {
    pub fn register<C: Component>(mut self) -> Result<Self> {
        self.registry.register::<C>()?;
        Ok(self)
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(mut self, store: Arc<dyn StateStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// How action requests obtain their context. Defaults to an anonymous
    /// context without services.
    pub fn contexts(mut self, contexts: Arc<dyn ContextProvider>) -> Self {
        self.contexts = Some(contexts);
        self
    }

    pub fn build(self) -> Runtime {
        let contexts = self
            .contexts
            .unwrap_or_else(|| Arc::new(StaticContext(Arc::new(Services::new()))));
        Runtime {
            inner: Arc::new(Inner {
                registry: self.registry,
                store: self.store.unwrap_or_else(|| Arc::new(MemoryStore::new())),
                locks: InstanceLocks::new(),
                config: self.config,
                contexts,
            }),
        }
    }
}

impl Runtime {
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder {
            registry: Registry::new(),
            store: None,
            config: RuntimeConfig::default(),
            contexts: None,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.inner.store
    }

    /// Context for a request, as built by the configured provider.
    pub fn context(&self, headers: &HeaderMap) -> RequestContext {
        self.inner.contexts.context(headers)
    }

    /// Server-side render: allocate, Mount, Render. Never fails; runtime
    /// errors become an error fragment so the host page still renders.
    pub async fn ssr(&self, ctx: &RequestContext, kind: &str, params: MountParams) -> DomNode {
        match self.mount_inline(ctx, kind, params).await {
            Ok(node) => node,
            Err(err) => {
                tracing::error!(kind, error = %err, "server-side render failed");
                let message = match err {
                    FluxError::UnknownKind(_) => "Unknown component.",
                    _ => "This section could not be displayed.",
                };
                error_fragment(kind, None, message)
            }
        }
    }

    async fn mount_inline(&self, ctx: &RequestContext, kind: &str, params: MountParams) -> Result<DomNode> {
        let factory = self.registry().lookup(kind)?;
        let record = self.store().create(kind).await?;
        let _token = self.inner.locks.acquire(&record.identity).await;

        let mut instance = Instance::from_record(&factory, record)?;
        instance.mount(ctx, params).await?;
        self.store().save(&instance.to_record()?).await?;
        tracing::debug!(kind, id = %instance.identity().id, "mounted inline");
        instance.render(ctx)
    }

    /// Lazy placeholder: a shell the client script loads after page load.
    pub fn placeholder(&self, kind: &str, params: &MountParams) -> DomNode {
        if !self.registry().contains(kind) {
            tracing::error!(kind, "placeholder for unknown kind");
            return error_fragment(kind, None, "Unknown component.");
        }
        lazy_shell(kind, params)
    }

    /// The `<script>` tag every page embedding components must include.
    pub fn script_tag(&self) -> DomNode {
        script_tag(&self.config().endpoint)
    }

    /// Action endpoint (`POST`) and client script (`GET`).
    pub fn router(&self) -> Router {
        Router::new()
            .route(&self.config().endpoint, post(handle_action).get(serve_script))
            .with_state(self.clone())
    }

    /// Remove an instance explicitly.
    pub async fn purge(&self, identity: &Identity) -> Result<bool> {
        let _token = self.inner.locks.acquire(identity).await;
        Ok(self.store().purge(identity).await?)
    }

    /// One eviction pass: expire idle instances, drop unused lock slots.
    pub async fn sweep(&self) -> Result<usize> {
        let expired = self.store().expire(self.config().instance_ttl).await?;
        let pruned = self.inner.locks.prune();
        if expired > 0 || pruned > 0 {
            tracing::debug!(expired, pruned, "sweep");
        }
        Ok(expired)
    }

    /// Run `sweep` every `sweep_interval` until the task is aborted.
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        let runtime = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(runtime.config().sweep_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(err) = runtime.sweep().await {
                    tracing::warn!(error = %err, "sweep failed");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{DATA_FLUX_ID, DATA_FLUX_KIND, DATA_FLUX_LAZY};
    use crate::testing::Counter;
    use std::time::Duration;

    fn runtime(config: RuntimeConfig) -> Runtime {
        Runtime::builder().register::<Counter>().unwrap().config(config).build()
    }

    fn ctx() -> RequestContext {
        RequestContext::new(Arc::new(Services::new()))
    }

    fn params(pairs: &[(&str, &str)]) -> MountParams {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[tokio::test]
    async fn test_ssr_allocates_and_stores_instance() {
        let rt = runtime(RuntimeConfig::default());
        let node = rt.ssr(&ctx(), "test_counter", params(&[("label", "X")])).await;

        assert_eq!(node.get_attr(DATA_FLUX_KIND), Some("test_counter"));
        let id = node.get_attr(DATA_FLUX_ID).unwrap().to_string();
        let record = rt.store().get(&Identity::new("test_counter", id)).await.unwrap().unwrap();
        assert_eq!(record.state["mounts"], 1);
        assert_eq!(record.mount_params.get("label").map(String::as_str), Some("X"));
    }

    #[tokio::test]
    async fn test_ssr_allocates_new_id_each_time() {
        let rt = runtime(RuntimeConfig::default());
        let a = rt.ssr(&ctx(), "test_counter", MountParams::new()).await;
        let b = rt.ssr(&ctx(), "test_counter", MountParams::new()).await;
        assert_ne!(a.get_attr(DATA_FLUX_ID), b.get_attr(DATA_FLUX_ID));
    }

    #[tokio::test]
    async fn test_ssr_never_fails_host_page() {
        let rt = runtime(RuntimeConfig::default());

        let unknown = rt.ssr(&ctx(), "nope", MountParams::new()).await;
        assert_eq!(unknown.class_attr(), Some("flux-error"));

        let rejected = rt.ssr(&ctx(), "test_counter", params(&[("start", "reject")])).await;
        let html = flux_render_html::render_to_html(&rejected);
        assert!(html.contains("Label not found"));
        assert!(rejected.get_attr(DATA_FLUX_ID).is_some());
    }

    #[test]
    fn test_placeholder_is_lazy_shell() {
        let rt = runtime(RuntimeConfig::default());
        let shell = rt.placeholder("test_counter", &params(&[("label", "X")]));
        assert_eq!(shell.get_attr(DATA_FLUX_LAZY), Some("1"));
        assert_eq!(shell.get_attr(DATA_FLUX_ID), None);
        assert_eq!(rt.placeholder("nope", &MountParams::new()).class_attr(), Some("flux-error"));
    }

    #[tokio::test]
    async fn test_sweep_expires_idle_instances() {
        let rt = runtime(RuntimeConfig {
            instance_ttl: Duration::from_millis(100),
            ..RuntimeConfig::default()
        });
        rt.ssr(&ctx(), "test_counter", MountParams::new()).await;
        assert_eq!(rt.store().len().await.unwrap(), 1);

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(rt.sweep().await.unwrap(), 1);
        assert_eq!(rt.store().len().await.unwrap(), 0);
        assert!(rt.inner.locks.is_empty());
    }

    #[tokio::test]
    async fn test_purge() {
        let rt = runtime(RuntimeConfig::default());
        let node = rt.ssr(&ctx(), "test_counter", MountParams::new()).await;
        let identity = Identity::new("test_counter", node.get_attr(DATA_FLUX_ID).unwrap());
        assert!(rt.purge(&identity).await.unwrap());
        assert!(rt.store().get(&identity).await.unwrap().is_none());
    }
}
