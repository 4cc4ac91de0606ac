use crate::cluster::{fetch_object, paths, ClusterApi, RawObject};
use crate::error::{DeploymentsError, DeploymentsResult};
use k8s_openapi::api::core::v1::ReplicationController;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
use tracing::debug;

pub const SPACE_LABEL: &str = "space";
pub const DEPLOYMENT_PHASE_ANNOTATION: &str = "openshift.io/deployment.phase";

const DEPLOYMENT_CONFIG: &str = "deployment config";

/// The DeploymentConfig of an application and its current replication
/// controller in one namespace
#[derive(Debug, Clone)]
pub struct CurrentDeployment {
    pub dc_uid: String,
    pub current: ReplicationController,
}

/// Whether `meta` names `uid` as its managing controller
pub fn is_controlled_by(meta: &ObjectMeta, uid: &str) -> bool {
    meta.owner_references
        .iter()
        .flatten()
        .any(|owner| owner.controller == Some(true) && owner.uid == uid)
}

/// A controller counts as shown to users if it runs pods or is in the middle
/// of rolling out. Mirrors the rule used by the OpenShift web console.
pub fn is_visible(rc: &ReplicationController) -> bool {
    let replicas = rc.status.as_ref().map_or(0, |status| status.replicas);
    let phase = rc
        .metadata
        .annotations
        .as_ref()
        .and_then(|annotations| annotations.get(DEPLOYMENT_PHASE_ANNOTATION))
        .map(String::as_str);
    replicas > 0 || matches!(phase, Some("New" | "Pending" | "Running"))
}

/// Picks the newest visible controller
pub fn select_current<I>(candidates: I) -> Option<ReplicationController>
where
    I: IntoIterator<Item = ReplicationController>,
{
    let mut newest: Option<ReplicationController> = None;
    for rc in candidates {
        let is_newer = newest.as_ref().map_or(true, |newest| {
            created(newest).map(|t| t.0) < created(&rc).map(|t| t.0)
        });
        if is_newer && is_visible(&rc) {
            newest = Some(rc);
        }
    }
    newest
}

fn created(rc: &ReplicationController) -> Option<&Time> {
    rc.metadata.creation_timestamp.as_ref()
}

/// Fetches the DeploymentConfig `name` and checks it belongs to `space`.
/// Returns its UID, or `None` if there is no such DeploymentConfig.
#[tracing::instrument(err, skip(cluster))]
pub async fn deployment_config_uid(
    cluster: &dyn ClusterApi,
    space: &str,
    name: &str,
    namespace: &str,
) -> DeploymentsResult<Option<String>> {
    let path = paths::deployment_config(namespace, name);
    let Some(dc) = fetch_object::<RawObject>(cluster, &path, true).await? else {
        debug!("no deployment config");
        return Ok(None);
    };
    dc.expect_kind("DeploymentConfig")?;
    let metadata = dc.metadata(DEPLOYMENT_CONFIG)?;

    let dc_space = metadata
        .label(SPACE_LABEL)
        .ok_or_else(|| DeploymentsError::malformed(DEPLOYMENT_CONFIG, "space label"))?;
    if dc_space != space {
        return Err(DeploymentsError::SpaceMismatch {
            deployment: name.to_owned(),
            expected: space.to_owned(),
            actual: dc_space.to_owned(),
        });
    }

    Ok(Some(metadata.uid(DEPLOYMENT_CONFIG)?.to_owned()))
}

/// Resolves the replication controller users currently see for application
/// `name` of `space` in `namespace`. `None` means there is nothing deployed.
#[tracing::instrument(err, skip(cluster))]
pub async fn current_deployment(
    cluster: &dyn ClusterApi,
    space: &str,
    name: &str,
    namespace: &str,
) -> DeploymentsResult<Option<CurrentDeployment>> {
    let Some(dc_uid) = deployment_config_uid(cluster, space, name, namespace).await? else {
        return Ok(None);
    };

    let owned: Vec<_> = cluster
        .list_replication_controllers(namespace)
        .await?
        .into_iter()
        .filter(|rc| is_controlled_by(&rc.metadata, &dc_uid))
        .collect();
    debug!(%dc_uid, candidates = owned.len(), "found replication controllers");

    Ok(select_current(owned).map(|current| CurrentDeployment { dc_uid, current }))
}
