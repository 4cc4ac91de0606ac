mod cluster_token;
mod error;

#[cfg(feature = "actix")]
mod actix_traits;

pub use cluster_token::ClusterToken;
pub use error::AuthError;
