use crate::state::DeploymentsState;
use actix_web::middleware::Logger;
use actix_web::{error::InternalError, web, App, HttpResponse, HttpServer};
use anyhow::Result;
use serde_json::json;

#[derive(clap::Args)]
#[group(skip)]
pub struct Config {
    #[arg(long, env = "API_PORT", default_value = "8080")]
    api_port: u16,
}

pub async fn serve(config: Config, state: DeploymentsState) -> Result<()> {
    let api_port = config.api_port;
    let state = web::Data::new(state);

    let server = HttpServer::new(move || {
        let query_cfg = web::QueryConfig::default().error_handler(|err, _req| {
            let message = err.to_string();
            let res = HttpResponse::BadRequest().json(json!({
                "message": message,
            }));
            InternalError::from_response(err, res).into()
        });
        App::new()
            .wrap(Logger::default())
            .app_data(query_cfg)
            .app_data(state.clone())
            .configure(crate::routes::config)
    });

    tracing::info!(api_port, "listening");
    Ok(server.bind(("0.0.0.0", api_port))?.run().await?)
}
