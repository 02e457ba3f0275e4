//! # lf-api
//!
//! The web routing and orchestration layer for the lost & found board.

pub mod error;
pub mod forms;
pub mod handlers;
pub mod middleware;

use actix_web::web;

pub use error::ApiError;
pub use handlers::AppState;

/// Configures the routes for the report API.
///
/// # Developer Note
/// A plain `ServiceConfig` hook lets the binary mount the API under a
/// different prefix (e.g., /api/v1/) without touching this crate.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/sign-up", web::post().to(handlers::sign_up))
            .route("/sign-in", web::post().to(handlers::sign_in))
            .route("/sign-out", web::post().to(handlers::sign_out)),
    )
    .service(
        web::scope("/reports")
            // The filtered list (e.g., /reports?kind=found&q=wallet&sort=oldest)
            .route("", web::get().to(handlers::list_reports))
            .route("", web::post().to(handlers::create_report))
            .route("/{id}", web::get().to(handlers::get_report))
            .route("/{id}", web::put().to(handlers::update_report))
            .route("/{id}", web::delete().to(handlers::delete_report))
            .route("/{id}/resolve", web::post().to(handlers::resolve_report)),
    );
}
