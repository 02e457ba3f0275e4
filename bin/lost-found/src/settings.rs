//! Typed settings layered from defaults, an optional `lost-found.toml` and
//! `LF__*` environment variables (e.g. `LF__SERVER__PORT=9000`,
//! `LF__RESOLVE_POLICY=owner_only`).

use std::path::PathBuf;

use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use lf_core::models::{ResolvePolicy, SearchFields};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database_url: String,
    /// Root directory for uploaded photos.
    pub uploads_dir: PathBuf,
    /// Path the uploads directory is served under.
    pub media_url_prefix: String,
    pub resolve_policy: ResolvePolicy,
    pub search_fields: SearchFields,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        Self::build(
            Config::builder()
                .add_source(File::with_name("lost-found").required(false))
                .add_source(
                    Environment::with_prefix("LF")
                        .separator("__")
                        .try_parsing(true),
                ),
        )
    }

    fn build(
        sources: ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        // Defaults sit underneath whatever sources were already added.
        sources
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("database_url", "sqlite:lost_found.db")?
            .set_default("uploads_dir", "./data/uploads")?
            .set_default("media_url_prefix", "/media")?
            .set_default("resolve_policy", "any_viewer")?
            .set_default("search_fields", "title_only")?
            .build()?
            .try_deserialize()
    }
}
