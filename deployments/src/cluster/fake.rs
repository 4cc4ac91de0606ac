//! In-memory cluster used by tests

use super::{ClusterApi, ClusterConnector};
use crate::error::{DeploymentsError, DeploymentsResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::{
    ConfigMap, Pod, PodStatus, ReplicationController, ReplicationControllerStatus, ResourceQuota,
    ResourceQuotaStatus,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference, Time};
use k8s_openapi::Metadata;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const FAKE_URL: &str = "https://cluster.fake";

#[derive(Debug, Clone, Default)]
pub struct FakeCluster {
    objects: HashMap<String, String>,
    statuses: HashMap<String, u16>,
    config_maps: Vec<ConfigMap>,
    replication_controllers: Vec<ReplicationController>,
    pods: Vec<Pod>,
    resource_quotas: Vec<ResourceQuota>,
    puts: Arc<Mutex<Vec<(String, Value)>>>,
    closes: Arc<AtomicUsize>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Default::default()
    }

    /// Serves `body` (as JSON text) for GETs of `path`
    pub fn with_object(mut self, path: impl Into<String>, body: Value) -> Self {
        self.objects.insert(path.into(), body.to_string());
        self
    }

    /// Serves a raw YAML/JSON body for GETs of `path`
    pub fn with_raw_object(mut self, path: impl Into<String>, body: impl Into<String>) -> Self {
        self.objects.insert(path.into(), body.into());
        self
    }

    /// Answers requests for `path` with an HTTP error status
    pub fn with_status(mut self, path: impl Into<String>, status: u16) -> Self {
        self.statuses.insert(path.into(), status);
        self
    }

    pub fn with_config_map(mut self, config_map: ConfigMap) -> Self {
        self.config_maps.push(config_map);
        self
    }

    pub fn with_replication_controller(mut self, rc: ReplicationController) -> Self {
        self.replication_controllers.push(rc);
        self
    }

    pub fn with_pod(mut self, pod: Pod) -> Self {
        self.pods.push(pod);
        self
    }

    pub fn with_resource_quota(mut self, quota: ResourceQuota) -> Self {
        self.resource_quotas.push(quota);
        self
    }

    /// How many times any handle sharing this cluster's state was closed
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn puts(&self) -> Vec<(String, Value)> {
        self.puts
            .lock()
            .map(|puts| puts.clone())
            .unwrap_or_default()
    }

    fn ensure_open(&self) -> DeploymentsResult<()> {
        match self.close_count() {
            0 => Ok(()),
            _ => Err(DeploymentsError::ClientClosed),
        }
    }

    fn status_error(path: &str, status: u16) -> DeploymentsError {
        DeploymentsError::UnexpectedStatus {
            url: format!("{FAKE_URL}{path}"),
            status,
        }
    }
}

fn in_namespace<'a, K>(objects: &'a [K], namespace: &'a str) -> impl Iterator<Item = &'a K>
where
    K: Metadata<Ty = ObjectMeta>,
{
    objects
        .iter()
        .filter(move |o| o.metadata().namespace.as_deref() == Some(namespace))
}

fn named<'a, K>(objects: &'a [K], namespace: &'a str, name: &'a str) -> Option<K>
where
    K: Metadata<Ty = ObjectMeta> + Clone,
{
    in_namespace(objects, namespace)
        .find(|o| o.metadata().name.as_deref() == Some(name))
        .cloned()
}

#[async_trait]
impl ClusterApi for FakeCluster {
    async fn fetch(&self, path: &str, allow_missing: bool) -> DeploymentsResult<Option<String>> {
        self.ensure_open()?;
        match (self.statuses.get(path), self.objects.get(path)) {
            (Some(404), _) if allow_missing => Ok(None),
            (Some(status), _) => Err(Self::status_error(path, *status)),
            (None, Some(body)) => Ok(Some(body.clone())),
            (None, None) if allow_missing => Ok(None),
            (None, None) => Err(Self::status_error(path, 404)),
        }
    }

    async fn put(&self, path: &str, body: &Value) -> DeploymentsResult<String> {
        self.ensure_open()?;
        if let Some(status) = self.statuses.get(path) {
            return Err(Self::status_error(path, *status));
        }
        if let Ok(mut puts) = self.puts.lock() {
            puts.push((path.to_owned(), body.clone()));
        }
        Ok(body.to_string())
    }

    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> DeploymentsResult<Option<ConfigMap>> {
        self.ensure_open()?;
        Ok(named(&self.config_maps, namespace, name))
    }

    async fn list_replication_controllers(
        &self,
        namespace: &str,
    ) -> DeploymentsResult<Vec<ReplicationController>> {
        self.ensure_open()?;
        Ok(in_namespace(&self.replication_controllers, namespace)
            .cloned()
            .collect())
    }

    async fn list_pods(&self, namespace: &str) -> DeploymentsResult<Vec<Pod>> {
        self.ensure_open()?;
        Ok(in_namespace(&self.pods, namespace).cloned().collect())
    }

    async fn get_resource_quota(
        &self,
        namespace: &str,
        name: &str,
    ) -> DeploymentsResult<Option<ResourceQuota>> {
        self.ensure_open()?;
        Ok(named(&self.resource_quotas, namespace, name))
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Hands out handles to the same [`FakeCluster`], or fails every connection
#[derive(Debug, Clone, Default)]
pub struct FakeConnector {
    cluster: FakeCluster,
    refuse: bool,
}

impl FakeConnector {
    pub fn new(cluster: FakeCluster) -> Self {
        Self {
            cluster,
            refuse: false,
        }
    }

    pub fn refusing() -> Self {
        Self {
            cluster: FakeCluster::new(),
            refuse: true,
        }
    }

    pub fn cluster(&self) -> &FakeCluster {
        &self.cluster
    }
}

#[async_trait]
impl ClusterConnector for FakeConnector {
    async fn connect(&self, _token: &str) -> DeploymentsResult<Box<dyn ClusterApi>> {
        if self.refuse {
            return Err(FakeCluster::status_error("/", 401));
        }
        Ok(Box::new(self.cluster.clone()))
    }
}

fn owner(uid: &str) -> OwnerReference {
    OwnerReference {
        api_version: "v1".to_owned(),
        kind: "Owner".to_owned(),
        name: format!("owner-{uid}"),
        uid: uid.to_owned(),
        controller: Some(true),
        block_owner_deletion: None,
    }
}

fn meta(namespace: &str, name: &str, uid: &str) -> ObjectMeta {
    ObjectMeta {
        namespace: Some(namespace.to_owned()),
        name: Some(name.to_owned()),
        uid: Some(uid.to_owned()),
        ..Default::default()
    }
}

pub fn user(name: &str) -> Value {
    json!({
        "kind": "User",
        "apiVersion": "v1",
        "metadata": {"name": name, "uid": format!("user-{name}")},
    })
}

/// The `fabric8-environments` config map, one entry per `(env, namespace)`
pub fn environments_config_map(namespace: &str, envs: &[(&str, &str)]) -> ConfigMap {
    ConfigMap {
        metadata: ObjectMeta {
            labels: Some(BTreeMap::from([(
                "provider".to_owned(),
                "fabric8".to_owned(),
            )])),
            ..meta(namespace, "fabric8-environments", "cm-1")
        },
        data: Some(
            envs.iter()
                .map(|(env, ns)| {
                    (
                        (*env).to_owned(),
                        format!("name: {env}\nnamespace: {ns}\norder: 1"),
                    )
                })
                .collect(),
        ),
        ..Default::default()
    }
}

pub fn build_config_list(names: &[&str], space: &str) -> Value {
    json!({
        "kind": "BuildConfigList",
        "apiVersion": "v1",
        "items": names.iter().map(|name| json!({
            "kind": "BuildConfig",
            "metadata": {"name": name, "labels": {"space": space}},
        })).collect::<Vec<_>>(),
    })
}

pub fn deployment_config(name: &str, space: &str, uid: &str) -> Value {
    json!({
        "kind": "DeploymentConfig",
        "apiVersion": "v1",
        "metadata": {"name": name, "uid": uid, "labels": {"space": space}},
        "spec": {"replicas": 1},
    })
}

pub fn scale(name: &str, replicas: i32) -> Value {
    json!({
        "kind": "Scale",
        "apiVersion": "extensions/v1beta1",
        "metadata": {"name": name},
        "spec": {"replicas": replicas},
        "status": {"replicas": replicas},
    })
}

pub fn replication_controller(
    namespace: &str,
    uid: &str,
    dc_uid: &str,
    created: DateTime<Utc>,
    replicas: i32,
    phase: Option<&str>,
) -> ReplicationController {
    ReplicationController {
        metadata: ObjectMeta {
            owner_references: Some(vec![owner(dc_uid)]),
            creation_timestamp: Some(Time(created)),
            annotations: phase.map(|phase| {
                BTreeMap::from([(
                    "openshift.io/deployment.phase".to_owned(),
                    phase.to_owned(),
                )])
            }),
            ..meta(namespace, &format!("rc-{uid}"), uid)
        },
        status: Some(ReplicationControllerStatus {
            replicas,
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn pod(namespace: &str, name: &str, rc_uid: &str, phase: &str, deleting: bool) -> Pod {
    Pod {
        metadata: ObjectMeta {
            owner_references: Some(vec![owner(rc_uid)]),
            deletion_timestamp: deleting.then(|| Time(Utc::now())),
            ..meta(namespace, name, &format!("pod-{name}"))
        },
        status: Some(PodStatus {
            phase: Some(phase.to_owned()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// `compute-resources` quota as `(hard, used)` pairs for cpu and memory limits
pub fn compute_resources(
    namespace: &str,
    cpu: (&str, &str),
    memory: (&str, &str),
) -> ResourceQuota {
    let quantities = |cpu: &str, memory: &str| {
        BTreeMap::from([
            ("cpu-limits".to_owned(), Quantity(cpu.to_owned())),
            ("memory-limits".to_owned(), Quantity(memory.to_owned())),
        ])
    };
    ResourceQuota {
        metadata: meta(namespace, "compute-resources", &format!("quota-{namespace}")),
        status: Some(ResourceQuotaStatus {
            hard: Some(quantities(cpu.0, memory.0)),
            used: Some(quantities(cpu.1, memory.1)),
        }),
        ..Default::default()
    }
}
