//! Raw OpenShift API paths, relative to the cluster URL

use url::form_urlencoded::byte_serialize;
use url::Url;

pub const CURRENT_USER: &str = "/oapi/v1/users/~";

pub fn build_configs(namespace: &str, space: &str) -> String {
    let selector: String = byte_serialize(format!("space={space}").as_bytes()).collect();
    format!("/oapi/v1/namespaces/{namespace}/buildconfigs?labelSelector={selector}")
}

pub fn deployment_config(namespace: &str, name: &str) -> String {
    format!("/oapi/v1/namespaces/{namespace}/deploymentconfigs/{name}")
}

pub fn deployment_config_scale(namespace: &str, name: &str) -> String {
    format!("{}/scale", deployment_config(namespace, name))
}

/// Appends `path` (which may carry a query) to `base`, keeping any path
/// prefix `base` already has
pub fn url(base: &Url, path: &str) -> Url {
    let (path, query) = match path.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (path, None),
    };
    let mut url = base.clone();
    url.set_path(&format!("{}{path}", base.path().trim_end_matches('/')));
    url.set_query(query);
    url
}
