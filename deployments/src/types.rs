use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Logical environment name (`run`, `stage`...) to cluster namespace
pub type NamespaceMap = HashMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvStatCores {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvStatMemory {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PodStats {
    pub starting: u32,
    pub running: u32,
    pub stopping: u32,
}

/// Point-in-time resource usage. Pod counts are only filled for a
/// deployment, quota figures only for an environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvStats {
    pub cpucores: EnvStatCores,
    pub memory: EnvStatMemory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pods: Option<PodStats>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub name: String,
    pub namespace: String,
    pub quota: EnvStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    /// Name of the environment this deployment runs in
    pub name: String,
    /// UID of the current replication controller
    pub uid: String,
    pub dc_uid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    pub stats: EnvStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub name: String,
    pub pipeline: Vec<Deployment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Space {
    pub name: String,
    pub applications: Vec<Application>,
}
