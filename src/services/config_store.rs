// Configuration Storage Service
// Reads the gateway config file and layers environment overrides on top

use crate::services::providers::{GenerationConfig, GEMINI_DEFAULT_URL};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub news: NewsConfig,
    #[serde(default)]
    pub api_keys: HashMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            server: ServerConfig::default(),
            model: ModelConfig::default(),
            news: NewsConfig::default(),
            api_keys: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
    #[serde(default = "default_max_upload")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
            max_upload_bytes: default_max_upload(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    #[serde(default = "default_model_url")]
    pub api_url: String,
    #[serde(default = "default_analysis_model")]
    pub analysis_model: String,
    #[serde(default = "default_chat_priorities")]
    pub chat_priorities: Vec<String>,
    #[serde(default = "default_chat_fallback")]
    pub chat_fallback_model: String,
    #[serde(default = "default_selection_refresh")]
    pub selection_refresh_secs: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_url: default_model_url(),
            analysis_model: default_analysis_model(),
            chat_priorities: default_chat_priorities(),
            chat_fallback_model: default_chat_fallback(),
            selection_refresh_secs: default_selection_refresh(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ModelConfig {
    pub fn generation(&self) -> GenerationConfig {
        GenerationConfig {
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn selection_refresh(&self) -> Duration {
        Duration::from_secs(self.selection_refresh_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsConfig {
    #[serde(default = "default_news_url")]
    pub api_url: String,
    #[serde(default = "default_cache_file")]
    pub cache_file: PathBuf,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_news_limit")]
    pub default_limit: usize,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            api_url: default_news_url(),
            cache_file: default_cache_file(),
            cache_ttl_secs: default_cache_ttl(),
            default_limit: default_news_limit(),
        }
    }
}

fn default_version() -> String { env!("CARGO_PKG_VERSION").to_string() }
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8000 }
fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string(), "http://localhost:3001".to_string()]
}
fn default_max_upload() -> usize { 25 * 1024 * 1024 }
fn default_model_url() -> String { GEMINI_DEFAULT_URL.to_string() }
fn default_analysis_model() -> String { "gemini-2.5-pro".to_string() }
fn default_chat_priorities() -> Vec<String> {
    ["flash", "gemini-1.5-pro", "gemini-1.0-pro", "gemini-pro"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_chat_fallback() -> String { "gemini-pro".to_string() }
fn default_selection_refresh() -> u64 { 3600 }
fn default_temperature() -> f64 { 0.2 }
fn default_max_output_tokens() -> u32 { 2048 }
fn default_request_timeout() -> u64 { 80 }
fn default_news_url() -> String { "https://newsdata.io/api/1/news".to_string() }
fn default_cache_file() -> PathBuf { PathBuf::from("news_cache.json") }
fn default_cache_ttl() -> u64 { 4 * 3600 }
fn default_news_limit() -> usize { 20 }

pub struct ConfigStore {
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        Self {
            config_file: config_dir.join("config.json"),
        }
    }

    pub fn with_file(config_file: PathBuf) -> Self {
        Self { config_file }
    }

    /// Get default config directory
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("authenex"))
    }

    /// `AUTHENEX_CONFIG` if set, otherwise the platform config directory.
    pub fn from_env() -> Option<Self> {
        match env::var("AUTHENEX_CONFIG") {
            Ok(path) if !path.trim().is_empty() => Some(Self::with_file(PathBuf::from(path))),
            _ => Self::default_config_dir().map(Self::new),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.config_file
    }

    /// Load configuration from file
    pub fn load(&self) -> Result<AppConfig, String> {
        if !self.config_file.exists() {
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.config_file)
            .map_err(|e| format!("Failed to read config: {}", e))?;

        serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config: {}", e))
    }

    /// Get provider API key from config file
    pub fn get_api_key(&self, provider: &str) -> Result<Option<String>, String> {
        let config = self.load()?;
        Ok(config
            .api_keys
            .get(provider)
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty()))
    }
}

/// Apply overrides from `lookup` (normally the process environment).
pub fn apply_overrides<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(host) = get("HOST") {
        config.server.host = host;
    }
    if let Some(port) = get("PORT") {
        match port.parse() {
            Ok(p) => config.server.port = p,
            Err(_) => warn!("[CONFIG] Ignoring invalid PORT={}", port),
        }
    }
    if let Some(origins) = get("AUTHENEX_CORS_ORIGINS") {
        config.server.cors_origins = origins
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();
    }
    if let Some(url) = get("GEMINI_API_URL") {
        config.model.api_url = url;
    }
    if let Some(model) = get("AUTHENEX_ANALYSIS_MODEL") {
        config.model.analysis_model = model;
    }
    if let Some(secs) = get("AUTHENEX_MODEL_REFRESH_SECS") {
        match secs.parse() {
            Ok(s) => config.model.selection_refresh_secs = s,
            Err(_) => warn!("[CONFIG] Ignoring invalid AUTHENEX_MODEL_REFRESH_SECS={}", secs),
        }
    }
    if let Some(path) = get("AUTHENEX_NEWS_CACHE_FILE") {
        config.news.cache_file = PathBuf::from(path);
    }
    if let Some(secs) = get("AUTHENEX_NEWS_CACHE_TTL_SECS") {
        match secs.parse() {
            Ok(s) => config.news.cache_ttl_secs = s,
            Err(_) => warn!("[CONFIG] Ignoring invalid AUTHENEX_NEWS_CACHE_TTL_SECS={}", secs),
        }
    }
}

/// Config file (or defaults) with environment overrides applied.
pub fn load_config() -> AppConfig {
    let mut config = match ConfigStore::from_env() {
        Some(store) => store.load().unwrap_or_else(|e| {
            warn!("[CONFIG] {} ({}), using defaults", e, store.path().display());
            AppConfig::default()
        }),
        None => AppConfig::default(),
    };
    apply_overrides(&mut config, |key| env::var(key).ok());
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.model.chat_fallback_model, "gemini-pro");
        assert_eq!(config.news.cache_ttl_secs, 4 * 3600);
        assert_eq!(config.model.chat_priorities[0], "flash");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"server": {{"port": 9100}}, "news": {{"cacheTtlSecs": 60}}, "apiKeys": {{"gemini": " k-123 "}}}}"#
        )
        .unwrap();

        let store = ConfigStore::with_file(file.path().to_path_buf());
        let config = store.load().unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.news.cache_ttl_secs, 60);
        assert_eq!(config.model.analysis_model, "gemini-2.5-pro");
        assert_eq!(store.get_api_key("gemini").unwrap().as_deref(), Some("k-123"));
        assert_eq!(store.get_api_key("newsdata").unwrap(), None);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().to_path_buf());
        assert_eq!(store.load().unwrap().server.port, 8000);
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        let store = ConfigStore::with_file(file.path().to_path_buf());
        assert!(store.load().unwrap_err().contains("Failed to parse config"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        let vars: HashMap<&str, &str> = HashMap::from([
            ("PORT", "9000"),
            ("AUTHENEX_CORS_ORIGINS", "https://a.example, https://b.example"),
            ("AUTHENEX_NEWS_CACHE_TTL_SECS", "abc"),
            ("AUTHENEX_ANALYSIS_MODEL", "gemini-1.5-flash"),
        ]);
        apply_overrides(&mut config, |k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.cors_origins, vec!["https://a.example", "https://b.example"]);
        assert_eq!(config.news.cache_ttl_secs, 4 * 3600);
        assert_eq!(config.model.analysis_model, "gemini-1.5-flash");
    }
}
