//! # Lost & Found Binary
//!
//! The entry point that assembles the application based on compile-time features.

mod settings;

use std::sync::Arc;

use actix_files::Files;
use actix_web::{web, App, HttpServer};
use lf_api::{configure_routes, middleware, AppState};

use crate::settings::Settings;

// Feature-gated imports
#[cfg(feature = "db-sqlite")]
use lf_db_sqlite::SqliteReportCollection;

#[cfg(feature = "storage-local")]
use lf_storage_local::LocalBlobStore;

#[cfg(feature = "auth-simple")]
use lf_auth_simple::SimpleAuthProvider;

#[cfg(not(all(feature = "db-sqlite", feature = "storage-local", feature = "auth-simple")))]
compile_error!("lost-found needs one plugin each for storage, media and auth: enable db-sqlite, storage-local and auth-simple");

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let settings = Settings::load()?;

    // 1. Initialize Document Collection
    let collection = SqliteReportCollection::new(&settings.database_url).await?;

    // 2. Initialize Blob Storage
    std::fs::create_dir_all(&settings.uploads_dir)?;
    let store = LocalBlobStore::new(settings.uploads_dir.clone(), settings.media_url_prefix.clone());

    // 3. Initialize Identity Provider
    let auth = SimpleAuthProvider::new();

    // 4. Wrap in AppState
    let state = web::Data::new(AppState {
        auth: Arc::new(auth),
        collection: Arc::new(collection),
        blobs: Arc::new(store),
        resolve_policy: settings.resolve_policy,
        search_fields: settings.search_fields,
    });

    log::info!(
        "lost-found starting on http://{}:{} (resolve policy {:?}, search {:?})",
        settings.server.host,
        settings.server.port,
        settings.resolve_policy,
        settings.search_fields
    );

    let media_prefix = settings.media_url_prefix.clone();
    let uploads_dir = settings.uploads_dir.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(middleware::cors_policy())
            .wrap(middleware::standard_middleware())
            .app_data(state.clone())
            .service(Files::new(&media_prefix, &uploads_dir))
            .configure(configure_routes)
    })
    .bind((settings.server.host.as_str(), settings.server.port))?
    .run()
    .await?;

    Ok(())
}
