use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use wit_deployments::KubeConnector;

mod result;
mod routes;
mod server;
mod state;

#[derive(Parser)]
struct Config {
    /// Turn debug logs on
    #[clap(long)]
    debug: bool,

    #[clap(flatten)]
    server: server::Config,

    #[clap(flatten)]
    deployments: wit_deployments::Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::parse();

    let default_level = if config.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let user_namespace = config.deployments.user_namespace.clone();
    let state = state::DeploymentsState::new(KubeConnector::new(config.deployments), user_namespace);

    tokio::select! {
        result = server::serve(config.server, state) => {
            warn!("API server finished");
            result
        }

        _ = tokio::signal::ctrl_c() => {
            warn!("SIGINT received, exiting");
            Ok(())
        }
    }
}
