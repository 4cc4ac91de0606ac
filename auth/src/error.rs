#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("Bearer authentication error: {0}")]
    BearerAuthenticationError(String),

    #[error("Empty bearer token")]
    EmptyToken,
}
