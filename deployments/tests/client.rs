use chrono::{Duration, TimeZone, Utc};
use serde_json::json;
use std::collections::HashSet;
use wit_deployments::cluster::fake::{self, FakeCluster, FakeConnector};
use wit_deployments::cluster::paths;
use wit_deployments::{DeploymentsClient, DeploymentsError, EnvStatMemory, PodStats};

const USER: &str = "me";

fn base_cluster(envs: &[(&str, &str)]) -> FakeCluster {
    FakeCluster::new()
        .with_object(paths::CURRENT_USER, fake::user(USER))
        .with_config_map(fake::environments_config_map(USER, envs))
}

/// One application `myapp` in `myspace`, deployed to `run` only
fn myspace_cluster() -> FakeCluster {
    let created = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
    base_cluster(&[("run", "ns-run"), ("stage", "ns-stage")])
        .with_object(
            paths::build_configs(USER, "myspace"),
            fake::build_config_list(&["myapp"], "myspace"),
        )
        .with_object(
            paths::deployment_config("ns-run", "myapp"),
            fake::deployment_config("myapp", "myspace", "dc-1"),
        )
        .with_replication_controller(fake::replication_controller(
            "ns-run", "rc-1", "dc-1", created, 2, None,
        ))
        .with_pod(fake::pod("ns-run", "p1", "rc-1", "Running", false))
        .with_pod(fake::pod("ns-run", "p2", "rc-1", "Running", false))
        .with_pod(fake::pod("ns-run", "p3", "rc-1", "Pending", false))
        .with_pod(fake::pod("ns-run", "decoy", "rc-other", "Running", false))
}

async fn client(cluster: &FakeCluster) -> DeploymentsClient {
    DeploymentsClient::new(Box::new(cluster.clone()), None)
        .await
        .unwrap()
}

#[tokio::test]
async fn space_with_one_running_application() {
    let cluster = myspace_cluster();
    let client = client(&cluster).await;

    let space = client.get_space("myspace").await.unwrap();
    assert_eq!(space.name, "myspace");
    assert_eq!(space.applications.len(), 1);

    let app = &space.applications[0];
    assert_eq!(app.name, "myapp");
    assert_eq!(app.pipeline.len(), 1);

    let deployment = &app.pipeline[0];
    assert_eq!(deployment.name, "run");
    assert_eq!(deployment.uid, "rc-1");
    assert_eq!(deployment.dc_uid, "dc-1");
    assert_eq!(
        deployment.stats.pods,
        Some(PodStats {
            starting: 1,
            running: 2,
            stopping: 0,
        })
    );
    assert_eq!(deployment.stats.memory, EnvStatMemory::default());

    client.close();
    assert_eq!(cluster.close_count(), 1);
}

#[tokio::test]
async fn application_pipeline_spans_environments() {
    let created = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
    let cluster = myspace_cluster()
        .with_object(
            paths::deployment_config("ns-stage", "myapp"),
            fake::deployment_config("myapp", "myspace", "dc-2"),
        )
        .with_replication_controller(fake::replication_controller(
            "ns-stage",
            "rc-2",
            "dc-2",
            created + Duration::hours(1),
            0,
            Some("Running"),
        ));
    let client = client(&cluster).await;

    let app = client.get_application("myspace", "myapp").await.unwrap();
    let envs: HashSet<_> = app.pipeline.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(envs, HashSet::from(["run", "stage"]));

    let stage = app.pipeline.iter().find(|d| d.name == "stage").unwrap();
    assert_eq!(stage.uid, "rc-2");
    assert_eq!(stage.stats.pods, Some(PodStats::default()));
}

#[tokio::test]
async fn application_without_deployments_has_empty_pipeline() {
    let client = client(&myspace_cluster()).await;
    let app = client.get_application("myspace", "nothing").await.unwrap();
    assert_eq!(app.name, "nothing");
    assert!(app.pipeline.is_empty());
}

#[tokio::test]
async fn space_without_build_configs_is_empty() {
    let cluster = base_cluster(&[("run", "ns-run")]).with_object(
        paths::build_configs(USER, "empty"),
        fake::build_config_list(&[], "empty"),
    );
    let space = client(&cluster).await.get_space("empty").await.unwrap();
    assert!(space.applications.is_empty());
}

#[tokio::test]
async fn wrong_space_aborts_the_whole_space() {
    let cluster = myspace_cluster()
        .with_object(
            paths::build_configs(USER, "myspace"),
            fake::build_config_list(&["myapp", "stolen"], "myspace"),
        )
        .with_object(
            paths::deployment_config("ns-run", "stolen"),
            fake::deployment_config("stolen", "otherspace", "dc-9"),
        );
    let err = client(&cluster).await.get_space("myspace").await.unwrap_err();
    assert!(matches!(err, DeploymentsError::SpaceMismatch { .. }));
}

#[tokio::test]
async fn malformed_build_config_list_is_an_error() {
    let cluster = base_cluster(&[("run", "ns-run")]).with_object(
        paths::build_configs(USER, "myspace"),
        json!({"kind": "BuildConfigList", "items": [{"kind": "BuildConfig"}]}),
    );
    let err = client(&cluster).await.get_space("myspace").await.unwrap_err();
    assert_eq!(err.to_string(), "metadata missing from build config");

    let cluster = base_cluster(&[("run", "ns-run")]).with_object(
        paths::build_configs(USER, "myspace"),
        json!({"kind": "Status", "items": []}),
    );
    let err = client(&cluster).await.get_space("myspace").await.unwrap_err();
    assert!(matches!(err, DeploymentsError::UnexpectedKind { .. }));
}

#[tokio::test]
async fn cluster_errors_carry_url_and_status() {
    let cluster =
        base_cluster(&[("run", "ns-run")]).with_status(paths::build_configs(USER, "myspace"), 403);
    let err = client(&cluster).await.get_space("myspace").await.unwrap_err();
    assert!(matches!(
        &err,
        DeploymentsError::UnexpectedStatus { url, status: 403 } if url.ends_with("space%3Dmyspace")
    ));
    assert!(err.is_upstream());
}

#[tokio::test]
async fn deployment_in_unknown_environment() {
    let client = client(&myspace_cluster()).await;
    assert!(matches!(
        client.get_deployment("myspace", "myapp", "prod").await,
        Err(DeploymentsError::UnknownEnvironment(env)) if env == "prod"
    ));
    assert!(client
        .get_deployment("myspace", "myapp", "stage")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn environments_report_quotas() {
    let cluster = myspace_cluster()
        .with_resource_quota(fake::compute_resources("ns-run", ("2", "1"), ("1Gi", "512Mi")))
        .with_resource_quota(fake::compute_resources("ns-stage", ("1", "0"), ("512Mi", "0")));
    let client = client(&cluster).await;

    let environments = client.get_environments().await.unwrap();
    let names: HashSet<_> = environments.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, HashSet::from(["run", "stage"]));

    let run = client.get_environment("run").await.unwrap();
    assert_eq!(run.namespace, "ns-run");
    assert_eq!(run.quota.cpucores.quota, Some(2));
    assert_eq!(run.quota.memory.used, Some(536_870_912));
    assert_eq!(run.quota.memory.units.as_deref(), Some("bytes"));
    assert_eq!(run.quota.pods, None);

    assert!(matches!(
        client.get_environment("prod").await,
        Err(DeploymentsError::UnknownEnvironment(_))
    ));
}

#[tokio::test]
async fn environments_fail_without_quota() {
    let cluster = myspace_cluster().with_resource_quota(fake::compute_resources(
        "ns-run",
        ("2", "1"),
        ("1Gi", "512Mi"),
    ));
    let err = client(&cluster).await.get_environments().await.unwrap_err();
    assert!(matches!(err, DeploymentsError::ResourceQuotaNotFound(_)));
}

#[tokio::test]
async fn incomplete_namespace_map_fails_construction_and_closes() {
    let mut config_map = fake::environments_config_map(USER, &[("run", "ns-run")]);
    config_map
        .data
        .as_mut()
        .unwrap()
        .insert("stage".to_owned(), "name: Stage".to_owned());
    let cluster = FakeCluster::new()
        .with_object(paths::CURRENT_USER, fake::user(USER))
        .with_config_map(config_map);

    let result = DeploymentsClient::new(Box::new(cluster.clone()), None).await;
    assert!(matches!(
        result,
        Err(DeploymentsError::NamespaceMissing(env)) if env == "stage"
    ));
    assert_eq!(cluster.close_count(), 1);
}

#[tokio::test]
async fn user_namespace_override_skips_user_lookup() {
    let cluster = FakeCluster::new().with_config_map(fake::environments_config_map(
        "team",
        &[("run", "team-run")],
    ));
    let client = DeploymentsClient::new(Box::new(cluster), Some("team"))
        .await
        .unwrap();
    assert_eq!(client.user_namespace(), "team");
    assert_eq!(client.namespaces().get("run").map(String::as_str), Some("team-run"));
}

#[tokio::test]
async fn dropped_client_is_closed_once() {
    let connector = FakeConnector::new(myspace_cluster());
    let client = DeploymentsClient::connect(&connector, "token", None)
        .await
        .unwrap();
    drop(client);
    assert_eq!(connector.cluster().close_count(), 1);
}

#[tokio::test]
async fn scaling_writes_new_replica_count() {
    let cluster = myspace_cluster().with_object(
        paths::deployment_config_scale("ns-run", "myapp"),
        fake::scale("myapp", 2),
    );
    let client = client(&cluster).await;

    let previous = client
        .scale_deployment("myspace", "myapp", "run", 5)
        .await
        .unwrap();
    assert_eq!(previous, Some(2));

    let puts = cluster.puts();
    assert_eq!(puts.len(), 1);
    assert_eq!(puts[0].0, paths::deployment_config_scale("ns-run", "myapp"));
    assert_eq!(puts[0].1["spec"]["replicas"], json!(5));
    assert_eq!(puts[0].1["kind"], json!("Scale"));
}

#[tokio::test]
async fn scaling_missing_deployment_is_none() {
    let client = client(&myspace_cluster()).await;
    assert_eq!(
        client
            .scale_deployment("myspace", "myapp", "stage", 1)
            .await
            .unwrap(),
        None
    );
    assert!(matches!(
        client.scale_deployment("otherspace", "myapp", "run", 1).await,
        Err(DeploymentsError::SpaceMismatch { .. })
    ));
}
