use thiserror::Error;

/// Runtime-level failures. Every variant except `Store` is rendered as an
/// error fragment with status 200; see `dispatch`.
#[derive(Error, Debug)]
pub enum FluxError {
    #[error("component kind already registered: {0}")]
    KindConflict(String),
    #[error("unknown component kind: {0}")]
    UnknownKind(String),
    #[error("component instance is gone: {kind}/{id}")]
    InstanceGone { kind: String, id: String },
    #[error("handler fault: {0}")]
    HandlerFault(String),
    #[error("render fault: {0}")]
    RenderFault(String),
    #[error("invalid lifecycle transition: {0}")]
    Lifecycle(&'static str),
    #[error("state store: {0}")]
    Store(#[from] StoreError),
}

impl FluxError {
    /// Tag sent in the `X-Flux-Error` header
    pub fn tag(&self) -> &'static str {
        match self {
            Self::KindConflict(_) => "kind-conflict",
            Self::UnknownKind(_) => "unknown-kind",
            Self::InstanceGone { .. } => "instance-gone",
            Self::HandlerFault(_) | Self::Lifecycle(_) | Self::Store(_) => "handler-fault",
            Self::RenderFault(_) => "render-fault",
        }
    }
}

/// Errors a component returns from Mount, Handle or Render.
#[derive(Error, Debug)]
pub enum ComponentError {
    /// A message meant for the user; recorded as `last_error`.
    #[error("{0}")]
    Rejected(String),
    /// Anything else. Logged, never shown verbatim.
    #[error(transparent)]
    Fault(#[from] anyhow::Error),
}

impl ComponentError {
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, FluxError>;
