use super::{paths, ClusterApi, ClusterConnector};
use crate::config::Config;
use crate::error::{DeploymentsError, DeploymentsResult};
use async_trait::async_trait;
use http::header::ACCEPT;
use k8s_openapi::api::core::v1::{ConfigMap, Pod, ReplicationController, ResourceQuota};
use kube::api::{Api, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use reqwest::StatusCode;
use serde_json::json;
use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::debug;
use url::Url;

const YAML_CONTENT: &str = "application/yaml";

/// Opens a [`KubeCluster`] per bearer token
pub struct KubeConnector {
    config: Config,
}

impl KubeConnector {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ClusterConnector for KubeConnector {
    async fn connect(&self, token: &str) -> DeploymentsResult<Box<dyn ClusterApi>> {
        Ok(Box::new(KubeCluster::new(&self.config, token).await?))
    }
}

#[derive(Clone)]
struct Clients {
    kube: kube::Client,
    http: reqwest::Client,
}

/// A cluster handle authenticated with a single user's token. Typed resources
/// go through `kube`, raw OpenShift objects through a plain HTTP client.
pub struct KubeCluster {
    base_url: Url,
    token: String,
    timeout: Duration,
    clients: Mutex<Option<Clients>>,
}

impl KubeCluster {
    pub async fn new(config: &Config, token: &str) -> DeploymentsResult<Self> {
        let kubeconfig = kubeconfig(config, token)?;
        let kube_config =
            kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await?;
        let kube = kube::Client::try_from(kube_config)?;
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.cluster_insecure_skip_tls_verify)
            .build()?;

        Ok(Self {
            base_url: config.cluster_url.clone(),
            token: token.to_owned(),
            timeout: config.request_timeout(),
            clients: Mutex::new(Some(Clients { kube, http })),
        })
    }

    fn clients(&self) -> DeploymentsResult<Clients> {
        self.clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(DeploymentsError::ClientClosed)
    }

    async fn timed<F, T, E>(&self, future: F) -> DeploymentsResult<T>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<DeploymentsError>,
    {
        tokio::time::timeout(self.timeout, future)
            .await
            .map_err(|_| DeploymentsError::Timeout(self.timeout))?
            .map_err(Into::into)
    }
}

fn kubeconfig(config: &Config, token: &str) -> DeploymentsResult<Kubeconfig> {
    let cluster = config
        .cluster_url
        .host_str()
        .unwrap_or("cluster")
        .to_owned();
    let user = "user";
    Ok(serde_json::from_value(json!({
        "apiVersion": "v1",
        "kind": "Config",
        "clusters": [{
            "name": cluster,
            "cluster": {
                "server": config.cluster_url.as_str(),
                "insecure-skip-tls-verify": config.cluster_insecure_skip_tls_verify,
            },
        }],
        "users": [{
            "name": user,
            "user": {
                "token": token,
            },
        }],
        "contexts": [{
            "name": "default",
            "context": {
                "cluster": cluster,
                "user": user,
            },
        }],
        "current-context": "default",
    }))?)
}

#[async_trait]
impl ClusterApi for KubeCluster {
    #[tracing::instrument(err, skip(self))]
    async fn fetch(&self, path: &str, allow_missing: bool) -> DeploymentsResult<Option<String>> {
        let url = paths::url(&self.base_url, path);
        let response = self
            .timed(
                self.clients()?
                    .http
                    .get(url.clone())
                    .bearer_auth(&self.token)
                    .header(ACCEPT, YAML_CONTENT)
                    .send(),
            )
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND && allow_missing {
            debug!("not found");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(DeploymentsError::UnexpectedStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(Some(self.timed(response.text()).await?))
    }

    #[tracing::instrument(err, skip(self, body))]
    async fn put(&self, path: &str, body: &serde_json::Value) -> DeploymentsResult<String> {
        let url = paths::url(&self.base_url, path);
        let response = self
            .timed(
                self.clients()?
                    .http
                    .put(url.clone())
                    .bearer_auth(&self.token)
                    .header(ACCEPT, YAML_CONTENT)
                    .json(body)
                    .send(),
            )
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeploymentsError::UnexpectedStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        self.timed(response.text()).await
    }

    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> DeploymentsResult<Option<ConfigMap>> {
        let api = Api::<ConfigMap>::namespaced(self.clients()?.kube, namespace);
        self.timed(api.get_opt(name)).await
    }

    async fn list_replication_controllers(
        &self,
        namespace: &str,
    ) -> DeploymentsResult<Vec<ReplicationController>> {
        let api = Api::<ReplicationController>::namespaced(self.clients()?.kube, namespace);
        Ok(self.timed(api.list(&ListParams::default())).await?.items)
    }

    async fn list_pods(&self, namespace: &str) -> DeploymentsResult<Vec<Pod>> {
        let api = Api::<Pod>::namespaced(self.clients()?.kube, namespace);
        Ok(self.timed(api.list(&ListParams::default())).await?.items)
    }

    async fn get_resource_quota(
        &self,
        namespace: &str,
        name: &str,
    ) -> DeploymentsResult<Option<ResourceQuota>> {
        let api = Api::<ResourceQuota>::namespaced(self.clients()?.kube, namespace);
        self.timed(api.get_opt(name)).await
    }

    fn close(&self) {
        if self
            .clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
        {
            debug!(cluster_url = %self.base_url, "closed cluster client");
        }
    }
}
