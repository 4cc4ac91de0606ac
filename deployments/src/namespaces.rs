use crate::cluster::{fetch_object, paths, ClusterApi, RawObject};
use crate::error::{DeploymentsError, DeploymentsResult};
use crate::types::NamespaceMap;
use k8s_openapi::api::core::v1::ConfigMap;
use tracing::debug;

pub const ENVIRONMENTS_CONFIG_MAP: &str = "fabric8-environments";
pub const PROVIDER_LABEL: &str = "provider";
pub const PROVIDER: &str = "fabric8";

const NAMESPACE_PROPERTY: &str = "namespace";

/// Name of the user owning the cluster token, which is also the name of the
/// user's own namespace.
#[tracing::instrument(err, skip_all)]
pub async fn user_namespace(cluster: &dyn ClusterApi) -> DeploymentsResult<String> {
    let user: RawObject = fetch_object(cluster, paths::CURRENT_USER, false)
        .await?
        .ok_or_else(|| DeploymentsError::malformed("user", "metadata"))?;
    user.expect_kind("User")?;
    Ok(user.metadata("user")?.name("user")?.to_owned())
}

/// Reads the environments config map from the user's namespace. Every entry
/// must name a namespace, otherwise nothing is returned.
#[tracing::instrument(err, skip(cluster))]
pub async fn namespace_map(
    cluster: &dyn ClusterApi,
    user_namespace: &str,
) -> DeploymentsResult<NamespaceMap> {
    let config_map = cluster
        .get_config_map(user_namespace, ENVIRONMENTS_CONFIG_MAP)
        .await?
        .ok_or_else(|| DeploymentsError::ConfigMapNotFound(ENVIRONMENTS_CONFIG_MAP.to_owned()))?;
    parse_namespace_map(&config_map)
}

pub fn parse_namespace_map(config_map: &ConfigMap) -> DeploymentsResult<NamespaceMap> {
    let provider = config_map
        .metadata
        .labels
        .as_ref()
        .and_then(|labels| labels.get(PROVIDER_LABEL));
    if provider.map(String::as_str) != Some(PROVIDER) {
        return Err(DeploymentsError::UnknownProvider {
            config_map: ENVIRONMENTS_CONFIG_MAP.to_owned(),
            provider: provider.cloned(),
        });
    }

    let map = config_map
        .data
        .iter()
        .flatten()
        .map(|(env, properties)| {
            let namespace = namespace_property(properties)
                .ok_or_else(|| DeploymentsError::NamespaceMissing(env.clone()))?;
            Ok((env.clone(), namespace.to_owned()))
        })
        .collect::<DeploymentsResult<NamespaceMap>>()?;

    debug!(environments = map.len(), "resolved namespaces");
    Ok(map)
}

fn namespace_property(properties: &str) -> Option<&str> {
    properties
        .lines()
        .find(|line| line.starts_with(NAMESPACE_PROPERTY))
        .and_then(|line| line.split_once(':'))
        .map(|(_, value)| value.trim())
}
