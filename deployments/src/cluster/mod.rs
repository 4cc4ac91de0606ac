mod kube_cluster;
mod objects;
pub mod paths;

#[cfg(any(test, feature = "fake"))]
pub mod fake;

use crate::error::DeploymentsResult;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ConfigMap, Pod, ReplicationController, ResourceQuota};
use serde::de::DeserializeOwned;

pub use kube_cluster::{KubeCluster, KubeConnector};
pub use objects::{ObjectList, ObjectMeta, RawObject};

/// Everything the deployments logic needs from a cluster, scoped to the
/// credentials of a single user.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// GETs a raw API object at `path` (relative to the cluster URL).
    /// A 404 is `Ok(None)` when `allow_missing` is set, an error otherwise.
    async fn fetch(&self, path: &str, allow_missing: bool) -> DeploymentsResult<Option<String>>;

    /// PUTs `body` at `path` and returns the response body
    async fn put(&self, path: &str, body: &serde_json::Value) -> DeploymentsResult<String>;

    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> DeploymentsResult<Option<ConfigMap>>;

    async fn list_replication_controllers(
        &self,
        namespace: &str,
    ) -> DeploymentsResult<Vec<ReplicationController>>;

    async fn list_pods(&self, namespace: &str) -> DeploymentsResult<Vec<Pod>>;

    async fn get_resource_quota(
        &self,
        namespace: &str,
        name: &str,
    ) -> DeploymentsResult<Option<ResourceQuota>>;

    /// Releases connections held by this handle. Calls made afterwards fail.
    fn close(&self);
}

#[async_trait]
pub trait ClusterConnector: Send + Sync {
    async fn connect(&self, token: &str) -> DeploymentsResult<Box<dyn ClusterApi>>;
}

/// Fetches `path` and deserializes the YAML (or JSON) body into `T`
pub async fn fetch_object<T: DeserializeOwned>(
    cluster: &dyn ClusterApi,
    path: &str,
    allow_missing: bool,
) -> DeploymentsResult<Option<T>> {
    match cluster.fetch(path, allow_missing).await? {
        None => Ok(None),
        Some(body) => Ok(Some(serde_yaml::from_str(&body)?)),
    }
}
