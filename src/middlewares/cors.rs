use actix_cors::Cors;

/// Landing page, seller portal and back-office are served from other origins.
pub fn create_cors() -> Cors {
    Cors::default()
        .allowed_origin_fn(|_, _req_head| true)
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allow_any_header()
        .expose_headers(vec!["content-disposition"])
        .max_age(3600)
}
