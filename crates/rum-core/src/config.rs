use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per chunk (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_secs: 0.25,
            max_delay_secs: 30,
        }
    }
}

fn default_auth_token_env() -> String {
    "RUM_TOKEN".to_string()
}

/// Global configuration loaded from `~/.config/rum/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Fixed chunk size in bytes for resumable transfers.
    pub chunk_size_bytes: u64,
    /// Platform upload ceiling in bytes; larger files are rejected before any network call.
    pub max_file_bytes: u64,
    /// Maximum number of sessions transferring at once.
    pub max_concurrent_uploads: usize,
    /// Default ingest endpoint used by `add` when no --endpoint is given.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Name of the environment variable holding the bearer token. The token
    /// itself is never written to disk.
    #[serde(default = "default_auth_token_env")]
    pub auth_token_env: String,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            chunk_size_bytes: 1024 * 1024,
            max_file_bytes: 10 * 1024 * 1024 * 1024,
            max_concurrent_uploads: 2,
            endpoint: None,
            auth_token_env: default_auth_token_env(),
            retry: None,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("rum")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<UploadConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = UploadConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: UploadConfig = toml::from_str(&data)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = UploadConfig::default();
        assert_eq!(cfg.chunk_size_bytes, 1024 * 1024);
        assert_eq!(cfg.max_file_bytes, 10 * 1024 * 1024 * 1024);
        assert_eq!(cfg.max_concurrent_uploads, 2);
        assert_eq!(cfg.auth_token_env, "RUM_TOKEN");
        assert!(cfg.endpoint.is_none());
        assert!(cfg.retry.is_none());
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = UploadConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: UploadConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.chunk_size_bytes, cfg.chunk_size_bytes);
        assert_eq!(parsed.max_file_bytes, cfg.max_file_bytes);
        assert_eq!(parsed.max_concurrent_uploads, cfg.max_concurrent_uploads);
        assert_eq!(parsed.auth_token_env, cfg.auth_token_env);
    }

    #[test]
    fn config_toml_custom_values() {
        let toml = r#"
            chunk_size_bytes = 262144
            max_file_bytes = 1073741824
            max_concurrent_uploads = 4
            endpoint = "https://ingest.example.com/videos"
            auth_token_env = "PLATFORM_TOKEN"
        "#;
        let cfg: UploadConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.chunk_size_bytes, 262144);
        assert_eq!(cfg.max_file_bytes, 1073741824);
        assert_eq!(cfg.max_concurrent_uploads, 4);
        assert_eq!(
            cfg.endpoint.as_deref(),
            Some("https://ingest.example.com/videos")
        );
        assert_eq!(cfg.auth_token_env, "PLATFORM_TOKEN");
        assert!(cfg.retry.is_none());
    }

    #[test]
    fn config_toml_retry_section() {
        let toml = r#"
            chunk_size_bytes = 1048576
            max_file_bytes = 10737418240
            max_concurrent_uploads = 2

            [retry]
            max_attempts = 3
            base_delay_secs = 0.5
            max_delay_secs = 15
        "#;
        let cfg: UploadConfig = toml::from_str(toml).unwrap();
        let retry = cfg.retry.as_ref().unwrap();
        assert_eq!(retry.max_attempts, 3);
        assert!((retry.base_delay_secs - 0.5).abs() < 1e-9);
        assert_eq!(retry.max_delay_secs, 15);
    }
}
