use crate::cluster::ClusterApi;
use crate::error::{DeploymentsError, DeploymentsResult};
use crate::quantity::quantity_to_i32;
use crate::resolver::is_controlled_by;
use crate::types::{EnvStatCores, EnvStatMemory, EnvStats, PodStats};
use k8s_openapi::api::core::v1::{Pod, ResourceQuota};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use std::collections::BTreeMap;
use tracing::debug;

pub const COMPUTE_RESOURCES_QUOTA: &str = "compute-resources";
pub const CPU_LIMITS: &str = "cpu-limits";
pub const MEMORY_LIMITS: &str = "memory-limits";
pub const MEMORY_UNITS: &str = "bytes";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PodState {
    Starting,
    Running,
    Stopping,
}

fn pod_state(pod: &Pod) -> Option<PodState> {
    if pod.metadata.deletion_timestamp.is_some() {
        return Some(PodState::Stopping);
    }
    match pod.status.as_ref()?.phase.as_deref()? {
        "Pending" => Some(PodState::Starting),
        "Running" => Some(PodState::Running),
        // Succeeded, Failed and Unknown pods are not counted anywhere
        _ => None,
    }
}

pub fn pod_stats<'a, I>(pods: I) -> PodStats
where
    I: IntoIterator<Item = &'a Pod>,
{
    pods.into_iter()
        .filter_map(pod_state)
        .fold(PodStats::default(), |mut stats, state| {
            match state {
                PodState::Starting => stats.starting += 1,
                PodState::Running => stats.running += 1,
                PodState::Stopping => stats.stopping += 1,
            }
            stats
        })
}

/// Pod counts for the pods controlled by replication controller `rc_uid`.
///
/// CPU and memory are left empty at this level: there is no per-deployment
/// source for them yet.
#[tracing::instrument(err, skip(cluster))]
pub async fn deployment_stats(
    cluster: &dyn ClusterApi,
    namespace: &str,
    rc_uid: &str,
) -> DeploymentsResult<EnvStats> {
    let pods = cluster.list_pods(namespace).await?;
    let owned: Vec<&Pod> = pods
        .iter()
        .filter(|pod| is_controlled_by(&pod.metadata, rc_uid))
        .collect();
    debug!(total = pods.len(), owned = owned.len(), "listed pods");

    Ok(EnvStats {
        cpucores: EnvStatCores::default(),
        memory: EnvStatMemory::default(),
        pods: Some(pod_stats(owned)),
    })
}

/// Quota figures of the `compute-resources` ResourceQuota in `namespace`
#[tracing::instrument(err, skip(cluster))]
pub async fn environment_stats(
    cluster: &dyn ClusterApi,
    namespace: &str,
) -> DeploymentsResult<EnvStats> {
    let quota = cluster
        .get_resource_quota(namespace, COMPUTE_RESOURCES_QUOTA)
        .await?
        .ok_or_else(|| DeploymentsError::ResourceQuotaNotFound(COMPUTE_RESOURCES_QUOTA.to_owned()))?;
    quota_stats(&quota)
}

pub fn quota_stats(quota: &ResourceQuota) -> DeploymentsResult<EnvStats> {
    let status = quota.status.as_ref();
    let hard = status.and_then(|status| status.hard.as_ref());
    let used = status.and_then(|status| status.used.as_ref());

    Ok(EnvStats {
        cpucores: EnvStatCores {
            quota: quantity(hard, CPU_LIMITS)?,
            used: quantity(used, CPU_LIMITS)?,
        },
        memory: EnvStatMemory {
            quota: quantity(hard, MEMORY_LIMITS)?,
            used: quantity(used, MEMORY_LIMITS)?,
            units: Some(MEMORY_UNITS.to_owned()),
        },
        pods: None,
    })
}

/// A key absent from the quota reads as 0
fn quantity(
    quantities: Option<&BTreeMap<String, Quantity>>,
    key: &str,
) -> DeploymentsResult<Option<i32>> {
    match quantities.and_then(|quantities| quantities.get(key)) {
        Some(quantity) => quantity_to_i32(quantity).map(Some),
        None => Ok(Some(0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::fake::{self, FakeCluster};

    #[test]
    fn classification() {
        let pods = [
            fake::pod("ns", "a", "rc-1", "Running", false),
            fake::pod("ns", "b", "rc-1", "Running", false),
            fake::pod("ns", "c", "rc-1", "Pending", false),
            fake::pod("ns", "d", "rc-1", "Running", true),
            fake::pod("ns", "e", "rc-1", "Pending", true),
            fake::pod("ns", "f", "rc-1", "Succeeded", true),
            fake::pod("ns", "g", "rc-1", "Succeeded", false),
            fake::pod("ns", "h", "rc-1", "Failed", false),
            fake::pod("ns", "i", "rc-1", "Unknown", false),
        ];
        assert_eq!(
            pod_stats(&pods),
            PodStats {
                starting: 1,
                running: 2,
                stopping: 3,
            }
        );
    }

    #[test]
    fn pod_without_status_is_not_counted() {
        let mut pod = fake::pod("ns", "a", "rc-1", "Running", false);
        pod.status = None;
        assert_eq!(pod_stats([&pod]), PodStats::default());
    }

    #[tokio::test]
    async fn decoy_pods_are_excluded() {
        let cluster = FakeCluster::new()
            .with_pod(fake::pod("ns-run", "mine", "rc-1", "Running", false))
            .with_pod(fake::pod("ns-run", "decoy", "rc-2", "Running", false))
            .with_pod(fake::pod("ns-stage", "elsewhere", "rc-1", "Pending", false));

        let stats = deployment_stats(&cluster, "ns-run", "rc-1").await.unwrap();
        assert_eq!(
            stats.pods,
            Some(PodStats {
                starting: 0,
                running: 1,
                stopping: 0,
            })
        );
        assert_eq!(stats.cpucores, EnvStatCores::default());
        assert_eq!(stats.memory, EnvStatMemory::default());
    }

    #[tokio::test]
    async fn quota_figures() {
        let cluster = FakeCluster::new().with_resource_quota(fake::compute_resources(
            "ns-run",
            ("2", "500m"),
            ("1Gi", "256Mi"),
        ));
        let stats = environment_stats(&cluster, "ns-run").await.unwrap();
        assert_eq!(
            stats,
            EnvStats {
                cpucores: EnvStatCores {
                    used: Some(500),
                    quota: Some(2),
                },
                memory: EnvStatMemory {
                    used: Some(268_435_456),
                    quota: Some(1_073_741_824),
                    units: Some("bytes".to_owned()),
                },
                pods: None,
            }
        );
    }

    #[test]
    fn absent_quota_keys_read_as_zero() {
        let mut quota = fake::compute_resources("ns-run", ("2", "1"), ("1Gi", "512Mi"));
        if let Some(status) = quota.status.as_mut() {
            status.hard.as_mut().unwrap().remove(MEMORY_LIMITS);
            status.used = None;
        }
        let stats = quota_stats(&quota).unwrap();
        assert_eq!(
            stats.cpucores,
            EnvStatCores {
                used: Some(0),
                quota: Some(2),
            }
        );
        assert_eq!(stats.memory.quota, Some(0));
        assert_eq!(stats.memory.used, Some(0));
        assert_eq!(stats.memory.units.as_deref(), Some(MEMORY_UNITS));
    }

    #[tokio::test]
    async fn missing_quota_is_an_error() {
        let err = environment_stats(&FakeCluster::new(), "ns-run")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No resource quota with name: compute-resources");
    }

    #[tokio::test]
    async fn oversized_quota_is_an_error() {
        let cluster = FakeCluster::new().with_resource_quota(fake::compute_resources(
            "ns-run",
            ("2", "1"),
            ("3000000000", "1"),
        ));
        assert!(matches!(
            environment_stats(&cluster, "ns-run").await,
            Err(DeploymentsError::Int32Overflow(3_000_000_000))
        ));
    }
}
