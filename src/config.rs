use crate::error::{config_error, env_error, AppResult};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;

/// Default Gemini model used for description generation
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-lite";

/// Default Gemini REST API root
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Audience claim carried by access tokens from the auth service
pub const DEFAULT_JWT_AUDIENCE: &str = "authenticated";

/// Optional settings file, read before environment overrides
pub const CONFIG_FILE: &str = "config/evently.toml";

/// Main configuration structure for the service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API key for the Gemini API
    pub gemini_api_key: String,
    /// Gemini model name
    pub gemini_model: String,
    /// Base URL of the Gemini REST API
    pub gemini_base_url: String,
    /// Secret used to verify session tokens
    pub jwt_secret: String,
    /// Expected `aud` claim on session tokens
    pub jwt_audience: String,
    /// Interface to bind
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Redis connection URL; the in-memory store is used when unset
    pub redis_url: Option<String>,
}

/// Non-secret settings that may come from `config/evently.toml`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub gemini_model: Option<String>,
    pub gemini_base_url: Option<String>,
    pub jwt_audience: Option<String>,
    pub redis_url: Option<String>,
}

impl FileConfig {
    /// Read the settings file if it exists
    pub fn read(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

impl Config {
    /// Load configuration from environment and config file
    pub fn load() -> AppResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        let file = FileConfig::read(Path::new(CONFIG_FILE))?;
        Self::from_sources(|key| env::var(key).ok(), file)
    }

    /// Build a config from a variable lookup and file settings.
    ///
    /// Values from `lookup` win over the file; the file wins over defaults.
    pub fn from_sources<F>(lookup: F, file: FileConfig) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // Required secrets
        let gemini_api_key = var("GEMINI_API_KEY").ok_or_else(|| env_error("GEMINI_API_KEY"))?;
        let jwt_secret = var("JWT_SECRET").ok_or_else(|| env_error("JWT_SECRET"))?;

        let gemini_model = var("GEMINI_MODEL")
            .or(file.gemini_model)
            .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());
        let gemini_base_url = var("GEMINI_BASE_URL")
            .or(file.gemini_base_url)
            .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string());
        let jwt_audience = var("JWT_AUDIENCE")
            .or(file.jwt_audience)
            .unwrap_or_else(|| DEFAULT_JWT_AUDIENCE.to_string());

        let host = var("HOST")
            .or(file.host)
            .unwrap_or_else(|| "127.0.0.1".to_string())
            .parse::<IpAddr>()
            .map_err(|_| config_error("Invalid HOST format"))?;

        let port = match var("PORT") {
            Some(p) => p
                .parse::<u16>()
                .map_err(|_| config_error("Invalid PORT format"))?,
            None => file.port.unwrap_or(3000),
        };

        let redis_url = var("REDIS_URL").or(file.redis_url);

        Ok(Config {
            gemini_api_key,
            gemini_model,
            gemini_base_url,
            jwt_secret,
            jwt_audience,
            host,
            port,
            redis_url,
        })
    }

    /// Socket address the server binds to
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
