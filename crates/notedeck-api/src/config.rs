//! Runtime configuration loaded from the environment.
//!
//! Every setting has a default so a bare `notedeck-api` starts against a
//! local PostgreSQL and MinIO. Values that are present but malformed abort
//! start-up with `Error::Config` instead of silently falling back.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use notedeck_core::{Error, Result};
use notedeck_db::s3::DEFAULT_REGION;
use notedeck_db::pool::DEFAULT_MAX_CONNECTIONS;
use notedeck_db::{PoolConfig, DEFAULT_BUCKET, DEFAULT_URL_TTL};

pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost/notedeck";
pub const DEFAULT_MINIO_ENDPOINT: &str = "http://localhost:9000";
pub const DEFAULT_STATIC_DIR: &str = "./frontend/dist";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 32 << 20;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// What a mutation of a note id that does not exist returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingNotePolicy {
    /// 404 Not Found.
    #[default]
    NotFound,
    /// 200 OK with nothing changed.
    Ignore,
}

impl FromStr for MissingNotePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "not_found" | "404" => Ok(Self::NotFound),
            "ignore" => Ok(Self::Ignore),
            other => Err(Error::Config(format!(
                "MISSING_NOTE_POLICY must be 'not_found' or 'ignore', got '{}'",
                other
            ))),
        }
    }
}

/// Whether mutating requests must carry signed init data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    Off,
    Enforce,
}

impl FromStr for AuthMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "" => Ok(Self::Off),
            "enforce" => Ok(Self::Enforce),
            other => Err(Error::Config(format!(
                "AUTH_MODE must be 'off' or 'enforce', got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => f.write_str("off"),
            Self::Enforce => f.write_str("enforce"),
        }
    }
}

/// HTTP listener and request limits.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory served for paths no API route matches. `None` disables it.
    pub static_dir: Option<PathBuf>,
    pub max_upload_bytes: usize,
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            static_dir: Some(PathBuf::from(DEFAULT_STATIC_DIR)),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool: PoolConfig,
    pub run_migrations: bool,
}

/// Object store connection and bucket settings.
#[derive(Clone)]
pub struct StorageConfig {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub bucket: String,
    pub url_ttl: Duration,
}

// Keeps the secret key out of logs.
impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("endpoint", &self.endpoint)
            .field("access_key", &self.access_key)
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("url_ttl", &self.url_ttl)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Default)]
pub struct AuthConfig {
    pub mode: AuthMode,
    pub bot_token: Option<String>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("mode", &self.mode)
            .field("bot_token", &self.bot_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Complete application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub missing_note_policy: MissingNotePolicy,
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let server = ServerConfig {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&get, "PORT", 8080)?,
            static_dir: match lookup("STATIC_DIR") {
                Some(dir) if dir.trim().is_empty() => None,
                Some(dir) => Some(PathBuf::from(dir)),
                None => Some(PathBuf::from(DEFAULT_STATIC_DIR)),
            },
            max_upload_bytes: parse_or(&get, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            request_timeout: Duration::from_secs(parse_or(
                &get,
                "REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT.as_secs(),
            )?),
        };

        let database = DatabaseConfig {
            url: get("DATABASE_URL")
                .or_else(|| get("PG_DSN"))
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            pool: PoolConfig::new()
                .max_connections(parse_or(&get, "DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?)
                .acquire_timeout(Duration::from_secs(parse_or(
                    &get,
                    "DB_ACQUIRE_TIMEOUT_SECS",
                    PoolConfig::default().acquire_timeout.as_secs(),
                )?)),
            run_migrations: parse_bool_or(&get, "RUN_MIGRATIONS", true)?,
        };

        let use_ssl = parse_bool_or(&get, "MINIO_USE_SSL", false)?;
        let url_ttl_secs: u64 =
            parse_or(&get, "ATTACHMENT_URL_TTL_SECS", DEFAULT_URL_TTL.as_secs())?;
        if url_ttl_secs == 0 || url_ttl_secs > DEFAULT_URL_TTL.as_secs() {
            return Err(Error::Config(format!(
                "ATTACHMENT_URL_TTL_SECS must be between 1 and {}, got {}",
                DEFAULT_URL_TTL.as_secs(),
                url_ttl_secs
            )));
        }
        let storage = StorageConfig {
            endpoint: normalize_endpoint(
                &get("MINIO_ENDPOINT").unwrap_or_else(|| DEFAULT_MINIO_ENDPOINT.to_string()),
                use_ssl,
            ),
            access_key: get("MINIO_ACCESS_KEY").unwrap_or_default(),
            secret_key: get("MINIO_SECRET_KEY").unwrap_or_default(),
            region: get("MINIO_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            bucket: get("MINIO_BUCKET").unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
            url_ttl: Duration::from_secs(url_ttl_secs),
        };

        let missing_note_policy = match get("MISSING_NOTE_POLICY") {
            Some(v) => v.parse()?,
            None => MissingNotePolicy::default(),
        };

        let auth = AuthConfig {
            mode: match get("AUTH_MODE") {
                Some(v) => v.parse()?,
                None => AuthMode::default(),
            },
            bot_token: get("BOT_TOKEN"),
        };
        if auth.mode == AuthMode::Enforce && auth.bot_token.is_none() {
            return Err(Error::Config(
                "AUTH_MODE=enforce requires BOT_TOKEN".to_string(),
            ));
        }

        Ok(Self {
            server,
            database,
            storage,
            missing_note_policy,
            auth,
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("{}={:?}: {}", key, raw, e))),
        None => Ok(default),
    }
}

fn parse_bool_or<G>(get: &G, key: &str, default: bool) -> Result<bool>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if v == "true" || v == "1" || v == "yes" => Ok(true),
        Some(v) if v == "false" || v == "0" || v == "no" => Ok(false),
        Some(v) => Err(Error::Config(format!("{} must be a boolean, got '{}'", key, v))),
    }
}

/// MinIO endpoints are often given as bare `host:port`.
fn normalize_endpoint(endpoint: &str, use_ssl: bool) -> String {
    let endpoint = endpoint.trim().trim_end_matches('/');
    if endpoint.contains("://") {
        endpoint.to_string()
    } else if use_ssl {
        format!("https://{}", endpoint)
    } else {
        format!("http://{}", endpoint)
    }
}
