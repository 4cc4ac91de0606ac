use crate::cluster::{fetch_object, paths, ClusterApi, ClusterConnector, ObjectList};
use crate::error::{DeploymentsError, DeploymentsResult};
use crate::namespaces::namespace_map;
use crate::resolver::{current_deployment, deployment_config_uid};
use crate::stats::{deployment_stats, environment_stats};
use crate::types::{Application, Deployment, Environment, NamespaceMap, Space};
use tracing::{debug, info};

const BUILD_CONFIG_LIST: &str = "build config list";
const BUILD_CONFIG: &str = "build config";
const SCALE: &str = "deployment config scale";

/// Deployments view of one user's cluster namespaces.
///
/// Owns the cluster handle it was built from. [`DeploymentsClient::close`]
/// must be called once the work is done; a client dropped without it is
/// closed on drop.
pub struct DeploymentsClient {
    cluster: Box<dyn ClusterApi>,
    user_namespace: String,
    namespaces: NamespaceMap,
    closed: bool,
}

impl DeploymentsClient {
    /// Connects with `token` and resolves the user's environments
    pub async fn connect(
        connector: &dyn ClusterConnector,
        token: &str,
        user_namespace: Option<&str>,
    ) -> DeploymentsResult<Self> {
        let cluster = connector.connect(token).await?;
        Self::new(cluster, user_namespace).await
    }

    /// Takes ownership of `cluster`, closing it if the environments cannot be
    /// resolved.
    pub async fn new(
        cluster: Box<dyn ClusterApi>,
        user_namespace: Option<&str>,
    ) -> DeploymentsResult<Self> {
        match Self::resolve(cluster.as_ref(), user_namespace).await {
            Ok((user_namespace, namespaces)) => Ok(Self {
                cluster,
                user_namespace,
                namespaces,
                closed: false,
            }),
            Err(err) => {
                cluster.close();
                Err(err)
            }
        }
    }

    async fn resolve(
        cluster: &dyn ClusterApi,
        user_namespace: Option<&str>,
    ) -> DeploymentsResult<(String, NamespaceMap)> {
        let user_namespace = match user_namespace {
            Some(namespace) => namespace.to_owned(),
            None => crate::namespaces::user_namespace(cluster).await?,
        };
        let namespaces = namespace_map(cluster, &user_namespace).await?;
        Ok((user_namespace, namespaces))
    }

    pub fn user_namespace(&self) -> &str {
        &self.user_namespace
    }

    pub fn namespaces(&self) -> &NamespaceMap {
        &self.namespaces
    }

    fn environment_namespace(&self, env: &str) -> DeploymentsResult<&str> {
        self.namespaces
            .get(env)
            .map(String::as_str)
            .ok_or_else(|| DeploymentsError::UnknownEnvironment(env.to_owned()))
    }

    pub async fn get_environments(&self) -> DeploymentsResult<Vec<Environment>> {
        let mut environments = Vec::with_capacity(self.namespaces.len());
        for env in self.namespaces.keys() {
            environments.push(self.get_environment(env).await?);
        }
        Ok(environments)
    }

    pub async fn get_environment(&self, env: &str) -> DeploymentsResult<Environment> {
        let namespace = self.environment_namespace(env)?;
        Ok(Environment {
            name: env.to_owned(),
            namespace: namespace.to_owned(),
            quota: environment_stats(self.cluster.as_ref(), namespace).await?,
        })
    }

    /// Names of the applications (BuildConfigs) labeled with `space`
    #[tracing::instrument(err, skip(self))]
    pub async fn get_application_names(&self, space: &str) -> DeploymentsResult<Vec<String>> {
        let path = paths::build_configs(&self.user_namespace, space);
        let list: ObjectList = fetch_object(self.cluster.as_ref(), &path, false)
            .await?
            .ok_or_else(|| DeploymentsError::malformed(BUILD_CONFIG_LIST, "items"))?;
        list.expect_kind("BuildConfigList")?;
        list.items(BUILD_CONFIG_LIST)?
            .iter()
            .map(|item| Ok(item.metadata(BUILD_CONFIG)?.name(BUILD_CONFIG)?.to_owned()))
            .collect()
    }

    pub async fn get_space(&self, space: &str) -> DeploymentsResult<Space> {
        let names = self.get_application_names(space).await?;
        debug!(space, applications = names.len(), "found applications");

        let mut applications = Vec::with_capacity(names.len());
        for name in names {
            applications.push(self.get_application(space, &name).await?);
        }
        Ok(Space {
            name: space.to_owned(),
            applications,
        })
    }

    /// An application with its deployment in every environment where it has one
    pub async fn get_application(&self, space: &str, app: &str) -> DeploymentsResult<Application> {
        let mut pipeline = Vec::new();
        for env in self.namespaces.keys() {
            if let Some(deployment) = self.get_deployment(space, app, env).await? {
                pipeline.push(deployment);
            }
        }
        Ok(Application {
            name: app.to_owned(),
            pipeline,
        })
    }

    pub async fn get_deployment(
        &self,
        space: &str,
        app: &str,
        env: &str,
    ) -> DeploymentsResult<Option<Deployment>> {
        let namespace = self.environment_namespace(env)?;
        let cluster = self.cluster.as_ref();
        let Some(deployment) = current_deployment(cluster, space, app, namespace).await? else {
            return Ok(None);
        };

        let rc = deployment.current;
        let uid = rc
            .metadata
            .uid
            .clone()
            .ok_or_else(|| DeploymentsError::malformed("replication controller", "uid"))?;
        let stats = deployment_stats(cluster, namespace, &uid).await?;

        Ok(Some(Deployment {
            name: env.to_owned(),
            version: rc
                .metadata
                .labels
                .as_ref()
                .and_then(|labels| labels.get("version"))
                .cloned(),
            created: rc.metadata.creation_timestamp.map(|time| time.0),
            uid,
            dc_uid: deployment.dc_uid,
            stats,
        }))
    }

    /// Sets the replica count of an application's DeploymentConfig in `env`.
    /// Returns the previous count, or `None` if the application is not
    /// deployed there.
    #[tracing::instrument(err, skip(self))]
    pub async fn scale_deployment(
        &self,
        space: &str,
        app: &str,
        env: &str,
        replicas: i32,
    ) -> DeploymentsResult<Option<i32>> {
        let namespace = self.environment_namespace(env)?;
        let cluster = self.cluster.as_ref();
        if deployment_config_uid(cluster, space, app, namespace)
            .await?
            .is_none()
        {
            return Ok(None);
        }

        let path = paths::deployment_config_scale(namespace, app);
        let mut scale: serde_json::Value = fetch_object(cluster, &path, false)
            .await?
            .ok_or_else(|| DeploymentsError::malformed(SCALE, "spec"))?;
        match scale.get("kind").and_then(|kind| kind.as_str()) {
            Some("Scale") => (),
            kind => {
                return Err(DeploymentsError::UnexpectedKind {
                    expected: "Scale",
                    actual: kind.unwrap_or("<none>").to_owned(),
                })
            }
        }

        let spec_replicas = scale
            .pointer_mut("/spec/replicas")
            .ok_or_else(|| DeploymentsError::malformed(SCALE, "spec.replicas"))?;
        let previous = spec_replicas
            .as_i64()
            .map(crate::quantity::i64_to_i32)
            .transpose()?
            .ok_or_else(|| DeploymentsError::malformed(SCALE, "spec.replicas"))?;
        *spec_replicas = replicas.into();

        cluster.put(&path, &scale).await?;
        info!(previous, replicas, "scaled deployment");
        Ok(Some(previous))
    }

    /// Releases the underlying cluster handle
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.closed {
            self.closed = true;
            self.cluster.close();
        }
    }
}

impl Drop for DeploymentsClient {
    fn drop(&mut self) {
        self.release();
    }
}
