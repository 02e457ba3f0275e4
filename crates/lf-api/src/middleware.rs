//! lost-found/crates/lf-api/src/middleware.rs Middleware
//!
//! Request logging and cross-origin policy for the report API.

use actix_cors::Cors;
use actix_web::http::header;
use actix_web::middleware::Logger;

/// Access log line per request:
/// remote-ip "request-line" status-code response-size duration
pub fn standard_middleware() -> Logger {
    Logger::new("%a \"%r\" %s %b %Dms")
}

/// The mobile and web clients live on other origins and send bearer tokens.
pub fn cors_policy() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
        .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(3600)
}
