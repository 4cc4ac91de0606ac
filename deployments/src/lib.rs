pub mod cluster;
mod client;
mod config;
mod error;
pub mod namespaces;
pub mod quantity;
pub mod resolver;
pub mod stats;
mod types;

pub use client::DeploymentsClient;
pub use cluster::{ClusterApi, ClusterConnector, KubeConnector};
pub use config::Config;
pub use error::{DeploymentsError, DeploymentsResult};
pub use types::*;
