use std::path::PathBuf;

use common::config::MqAppConfig;
use common::storage::s3_store::S3Settings;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Filesystem,
    S3,
}

/// Bucket name per artifact kind.
#[derive(Debug, Deserialize, Clone)]
pub struct BucketConfig {
    pub checkers: String,
    pub templates: String,
    pub makefiles: String,
    pub testdata: String,
    pub submissions: String,
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            checkers: "noj-checkers".into(),
            templates: "noj-templates".into(),
            makefiles: "noj-makefiles".into(),
            testdata: "noj-testdata".into(),
            submissions: "noj-submissions".into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Root directory for the filesystem backend.
    pub root: PathBuf,
    /// Largest single object accepted by the store, in bytes.
    pub max_object_size: u64,
    #[serde(default)]
    pub buckets: BucketConfig,
    /// Required when `backend = "s3"`.
    pub s3: Option<S3Settings>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub mq: MqAppConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", vec!["http://localhost:5173"])?
            .set_default("server.cors.max_age", 3600)?
            .set_default("storage.backend", "filesystem")?
            .set_default("storage.root", "./data/objects")?
            .set_default("storage.max_object_size", 200 * 1024 * 1024)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., PIPELINE__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("PIPELINE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
