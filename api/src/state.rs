use std::sync::Arc;
use wit_auth::ClusterToken;
use wit_deployments::{ClusterConnector, DeploymentsClient, DeploymentsResult};

/// Shared by all workers: how to reach the cluster on behalf of a caller
pub struct DeploymentsState {
    connector: Arc<dyn ClusterConnector>,
    user_namespace: Option<String>,
}

impl DeploymentsState {
    pub fn new(connector: impl ClusterConnector + 'static, user_namespace: Option<String>) -> Self {
        Self {
            connector: Arc::new(connector),
            user_namespace,
        }
    }

    /// A client for the caller's namespaces. The caller owns it and must
    /// close it.
    pub async fn client(&self, token: &ClusterToken) -> DeploymentsResult<DeploymentsClient> {
        DeploymentsClient::connect(
            self.connector.as_ref(),
            token.as_str(),
            self.user_namespace.as_deref(),
        )
        .await
    }
}
