mod deployments;
mod status;

pub fn config(cfg: &mut actix_web::web::ServiceConfig) {
    deployments::config(cfg);
    status::config(cfg);
}
