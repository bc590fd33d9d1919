use thiserror::Error;

/// Errors surfaced by the routing core.
///
/// The transport layer maps these to client errors (`InvalidFrame`,
/// `InvalidRequest`), service-unavailable (`BackendUnavailable`) and internal
/// failures (`BackendInferenceFailure`).
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    #[error("backend '{backend}' is not loaded or warmed up")]
    BackendUnavailable { backend: String },

    #[error("backend '{backend}' inference failed: {source:#}")]
    BackendInferenceFailure {
        backend: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl DetectError {
    pub(crate) fn unavailable(backend: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            backend: backend.into(),
        }
    }

    pub(crate) fn inference(backend: impl Into<String>, source: anyhow::Error) -> Self {
        Self::BackendInferenceFailure {
            backend: backend.into(),
            source,
        }
    }

    /// True for errors caused by the caller's input rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidFrame(_) | Self::InvalidRequest(_))
    }
}
