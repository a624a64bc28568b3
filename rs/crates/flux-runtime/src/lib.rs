//! flux-runtime: server-driven live components
//!
//! A live component is a server-side value that renders an HTML fragment.
//! The browser never holds component state: it posts actions to a single
//! endpoint and swaps the returned fragment in place.
//!
//! Request flow:
//!   page handler ──ssr/placeholder──▶ HTML with data-flux-kind/id
//!   click/submit ──POST /flux──▶ resolve ▶ [Mount] ▶ Handle ▶ Render ▶ fragment
//!
//! Modules:
//!   component  `Component` trait, `Scope`/`View`, form values, feedback
//!   registry   kind → factory
//!   store      instance records, `StateStore`, in-memory backend
//!   locks      per-instance exclusive tokens
//!   lifecycle  NEW → READY transitions and error containment
//!   dispatch   the HTTP action endpoint
//!   envelope   identity envelope and protocol attributes
//!   runtime    `Runtime` handle: ssr, placeholders, router, sweeper
//!   script     embedded client protocol script

pub mod component;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod lifecycle;
pub mod locks;
pub mod registry;
pub mod runtime;
pub mod script;
pub mod store;

#[cfg(test)]
mod testing;

pub use component::{Component, FormValues, Identity, MountParams, Redirect, Scope, View};
pub use config::RuntimeConfig;
pub use context::{ContextProvider, RequestContext, Services, StaticContext};
pub use dispatch::{ActionRequest, Reply};
pub use envelope::FluxNode;
pub use error::{ComponentError, FluxError, Result, StoreError};
pub use runtime::{Runtime, RuntimeBuilder};
pub use store::{MemoryStore, StateStore};
