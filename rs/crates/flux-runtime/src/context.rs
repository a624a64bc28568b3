//! Request-scoped context handed to components.
//!
//! Components never hold on to the application; they resolve the
//! collaborators they need from the context on every Mount/Handle call.

use axum::http::HeaderMap;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// Type-keyed map of shared collaborators (stores, generators, ...).
///
/// Keys are the `Arc<T>` types, so trait objects work:
/// `services.insert::<dyn BlogStore>(store)`.
#[derive(Default)]
pub struct Services {
    entries: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Services {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: ?Sized + Send + Sync + 'static>(&mut self, service: Arc<T>) -> &mut Self {
        self.entries.insert(TypeId::of::<Arc<T>>(), Box::new(service));
        self
    }

    pub fn with<T: ?Sized + Send + Sync + 'static>(mut self, service: Arc<T>) -> Self {
        self.insert(service);
        self
    }

    pub fn get<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.entries
            .get(&TypeId::of::<Arc<T>>())
            .and_then(|b| b.downcast_ref::<Arc<T>>())
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Immutable per-request value: collaborators plus the requesting user.
#[derive(Clone)]
pub struct RequestContext {
    services: Arc<Services>,
    user_id: Option<String>,
}

impl RequestContext {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services, user_id: None }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Resolve a collaborator by capability.
    pub fn service<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.services.get::<T>()
    }
}

/// Builds the context for an incoming action request. Authentication lives
/// outside the runtime; implementors map headers to a user.
pub trait ContextProvider: Send + Sync + 'static {
    fn context(&self, headers: &HeaderMap) -> RequestContext;
}

/// Anonymous context over a fixed service set.
pub struct StaticContext(pub Arc<Services>);

impl ContextProvider for StaticContext {
    fn context(&self, _headers: &HeaderMap) -> RequestContext {
        RequestContext::new(Arc::clone(&self.0))
    }
}
