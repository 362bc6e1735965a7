use thiserror::Error;

/// Podgress controller errors
#[derive(Error, Debug)]
pub enum PodgressError {
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors returned by an [`ExposureStore`](crate::apis::pods::store::ExposureStore)
#[derive(Error, Debug)]
pub enum StoreError {
    /// The object does not exist; a signal, not a failure
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        kind: &'static str,
        namespace: String,
        name: String,
    },

    #[error("Kubernetes error: {0}")]
    Kubernetes(#[from] kube::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}
