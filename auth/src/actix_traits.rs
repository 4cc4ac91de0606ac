use crate::cluster_token::ClusterToken;
use crate::error::AuthError;
use actix_web::{dev::Payload, FromRequest, HttpRequest};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use futures::future::{ready, BoxFuture, FutureExt, TryFutureExt};

impl FromRequest for ClusterToken {
    type Error = AuthError;
    type Future = BoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        BearerAuth::from_request(req, payload)
            .map_err(|e| AuthError::BearerAuthenticationError(e.to_string()))
            .and_then(|bearer| ready(ClusterToken::new(bearer.token())))
            .boxed()
    }
}

impl From<AuthError> for actix_web::Error {
    fn from(err: AuthError) -> Self {
        actix_web::error::ErrorUnauthorized(err.to_string())
    }
}
