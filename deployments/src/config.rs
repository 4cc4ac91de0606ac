use url::Url;

#[derive(Debug, Clone, clap::Args)]
#[group(skip)]
pub struct Config {
    /// Base URL of the OpenShift cluster API
    #[arg(long, env = "CLUSTER_URL")]
    pub cluster_url: Url,

    #[arg(long, env = "CLUSTER_INSECURE_SKIP_TLS_VERIFY")]
    pub cluster_insecure_skip_tls_verify: bool,

    /// Timeout applied to each individual cluster request
    #[arg(long, env = "CLUSTER_REQUEST_TIMEOUT", default_value = "30s")]
    pub cluster_request_timeout: humantime::Duration,

    /// Use this namespace instead of asking the cluster who the user is
    #[arg(long, env = "USER_NAMESPACE")]
    pub user_namespace: Option<String>,
}

impl Config {
    pub fn request_timeout(&self) -> std::time::Duration {
        self.cluster_request_timeout.into()
    }
}
