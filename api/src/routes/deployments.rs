use crate::result::{ApiError, ApiResult};
use crate::state::DeploymentsState;
use actix_web::{get, put, web, HttpResponse};
use serde::{Deserialize, Serialize};
use wit_auth::ClusterToken;

#[derive(Serialize)]
struct Data<T> {
    data: T,
}

fn data<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(Data { data })
}

#[get("/environments")]
async fn get_environments(state: web::Data<DeploymentsState>, token: ClusterToken) -> ApiResult {
    let client = state.client(&token).await?;
    let result = client.get_environments().await;
    client.close();
    Ok(data(result?))
}

#[get("/environments/{env}")]
async fn get_environment(
    state: web::Data<DeploymentsState>,
    token: ClusterToken,
    env: web::Path<String>,
) -> ApiResult {
    let client = state.client(&token).await?;
    let result = client.get_environment(&env).await;
    client.close();
    Ok(data(result?))
}

#[get("/spaces/{space}")]
async fn get_space(
    state: web::Data<DeploymentsState>,
    token: ClusterToken,
    space: web::Path<String>,
) -> ApiResult {
    let client = state.client(&token).await?;
    let result = client.get_space(&space).await;
    client.close();
    Ok(data(result?))
}

#[get("/spaces/{space}/applications/{app}")]
async fn get_application(
    state: web::Data<DeploymentsState>,
    token: ClusterToken,
    path: web::Path<(String, String)>,
) -> ApiResult {
    let (space, app) = path.into_inner();
    let client = state.client(&token).await?;
    let result = client.get_application(&space, &app).await;
    client.close();
    Ok(data(result?))
}

#[get("/spaces/{space}/applications/{app}/deployments/{env}")]
async fn get_deployment(
    state: web::Data<DeploymentsState>,
    token: ClusterToken,
    path: web::Path<(String, String, String)>,
) -> ApiResult {
    let (space, app, env) = path.into_inner();
    let client = state.client(&token).await?;
    let result = client.get_deployment(&space, &app, &env).await;
    client.close();
    match result? {
        Some(deployment) => Ok(data(deployment)),
        None => Err(not_deployed(&app, &env)),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScaleQuery {
    pod_count: i32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Scaled {
    previous_pod_count: i32,
    pod_count: i32,
}

#[put("/spaces/{space}/applications/{app}/deployments/{env}")]
async fn scale_deployment(
    state: web::Data<DeploymentsState>,
    token: ClusterToken,
    path: web::Path<(String, String, String)>,
    query: web::Query<ScaleQuery>,
) -> ApiResult {
    let (space, app, env) = path.into_inner();
    let pod_count = query.pod_count;
    if pod_count < 0 {
        return Err(ApiError::BadRequest(format!(
            "podCount must not be negative, got {pod_count}"
        )));
    }

    let client = state.client(&token).await?;
    let result = client
        .scale_deployment(&space, &app, &env, pod_count)
        .await;
    client.close();
    match result? {
        Some(previous_pod_count) => Ok(data(Scaled {
            previous_pod_count,
            pod_count,
        })),
        None => Err(not_deployed(&app, &env)),
    }
}

fn not_deployed(app: &str, env: &str) -> ApiError {
    ApiError::NotFound(format!("{app} is not deployed to {env}"))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/deployments")
            .service(get_environments)
            .service(get_environment)
            .service(get_space)
            .service(get_application)
            .service(get_deployment)
            .service(scale_deployment),
    );
}
