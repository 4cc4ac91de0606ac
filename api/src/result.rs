use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use wit_auth::AuthError;
use wit_deployments::DeploymentsError;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    AuthError(#[from] AuthError),

    #[error("{0}")]
    DeploymentsError(#[from] DeploymentsError),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::AuthError(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::DeploymentsError(err) => match err {
                DeploymentsError::UnknownEnvironment(_) => StatusCode::NOT_FOUND,
                err if err.cluster_status() == Some(401) => StatusCode::UNAUTHORIZED,
                err if err.cluster_status() == Some(403) => StatusCode::FORBIDDEN,
                DeploymentsError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                err if err.is_upstream() => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "message": self.to_string(),
        }))
    }
}

pub type ApiResult = Result<HttpResponse, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;

    #[test]
    fn status_codes() {
        let cases = [
            (
                ApiError::from(DeploymentsError::UnknownEnvironment("prod".to_owned())),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::NotFound("no deployment".to_owned()),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::from(AuthError::EmptyToken),
                StatusCode::UNAUTHORIZED,
            ),
            (
                ApiError::from(DeploymentsError::UnexpectedStatus {
                    url: "https://cluster/oapi".to_owned(),
                    status: 500,
                }),
                StatusCode::BAD_GATEWAY,
            ),
            (
                ApiError::from(DeploymentsError::UnexpectedStatus {
                    url: "https://cluster/oapi".to_owned(),
                    status: 403,
                }),
                StatusCode::FORBIDDEN,
            ),
            (
                ApiError::from(DeploymentsError::UnexpectedStatus {
                    url: "https://cluster/oapi/v1/users/~".to_owned(),
                    status: 401,
                }),
                StatusCode::UNAUTHORIZED,
            ),
            (
                ApiError::from(DeploymentsError::from(kube::Error::Api(ErrorResponse {
                    status: "Failure".to_owned(),
                    message: "Unauthorized".to_owned(),
                    reason: "Unauthorized".to_owned(),
                    code: 401,
                }))),
                StatusCode::UNAUTHORIZED,
            ),
            (
                ApiError::from(DeploymentsError::from(kube::Error::Api(ErrorResponse {
                    status: "Failure".to_owned(),
                    message: "resourcequotas is forbidden".to_owned(),
                    reason: "Forbidden".to_owned(),
                    code: 403,
                }))),
                StatusCode::FORBIDDEN,
            ),
            (
                ApiError::from(DeploymentsError::from(kube::Error::Api(ErrorResponse {
                    status: "Failure".to_owned(),
                    message: "etcdserver: request timed out".to_owned(),
                    reason: "InternalError".to_owned(),
                    code: 500,
                }))),
                StatusCode::BAD_GATEWAY,
            ),
            (
                ApiError::from(DeploymentsError::Timeout(std::time::Duration::from_secs(1))),
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                ApiError::from(DeploymentsError::Int32Overflow(3_000_000_000)),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ApiError::from(DeploymentsError::SpaceMismatch {
                    deployment: "app".to_owned(),
                    expected: "a".to_owned(),
                    actual: "b".to_owned(),
                }),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.status_code(), status, "{err}");
        }
    }
}
