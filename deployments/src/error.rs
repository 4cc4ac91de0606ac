use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum DeploymentsError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Kubernetes client configuration error: {0}")]
    KubeConfigError(#[from] kube::config::KubeconfigError),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Error parsing cluster response: {0}")]
    YamlParseError(#[from] serde_yaml::Error),

    #[error("Error serializing request: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Request to {url} failed with status code {status}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("Cluster request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Cluster client was already closed")]
    ClientClosed,

    #[error("{field} missing from {object}")]
    MalformedResponse {
        object: &'static str,
        field: &'static str,
    },

    #[error("Expected object of kind {expected}, got {actual}")]
    UnexpectedKind { expected: &'static str, actual: String },

    #[error("Deployment config {deployment} is part of space {actual}, expected space {expected}")]
    SpaceMismatch {
        deployment: String,
        expected: String,
        actual: String,
    },

    #[error("No config map with name: {0}")]
    ConfigMapNotFound(String),

    #[error("Unknown or missing provider {provider:?} for environments config map {config_map}")]
    UnknownProvider {
        config_map: String,
        provider: Option<String>,
    },

    #[error("Namespace property missing from environment {0}")]
    NamespaceMissing(String),

    #[error("Unknown environment: {0}")]
    UnknownEnvironment(String),

    #[error("No resource quota with name: {0}")]
    ResourceQuotaNotFound(String),

    #[error("Invalid resource quantity: {0:?}")]
    InvalidQuantity(String),

    #[error("Resource quantity {0} cannot be represented as an unscaled 64-bit integer")]
    QuantityNotRepresentable(String),

    #[error("Value {0} cannot be represented as 32-bit integer")]
    Int32Overflow(i64),
}

impl DeploymentsError {
    pub fn malformed(object: &'static str, field: &'static str) -> Self {
        Self::MalformedResponse { object, field }
    }

    /// Errors that carry a failure reported by, or on the way to, the cluster
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::KubeError(_) | Self::HttpError(_) | Self::UnexpectedStatus { .. }
        )
    }

    /// HTTP status the cluster answered with, from either the raw or the
    /// typed client
    pub fn cluster_status(&self) -> Option<u16> {
        match self {
            Self::UnexpectedStatus { status, .. } => Some(*status),
            Self::KubeError(kube::Error::Api(response)) => Some(response.code),
            _ => None,
        }
    }
}

pub type DeploymentsResult<T> = Result<T, DeploymentsError>;
