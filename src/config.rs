//! Runtime configuration: defaults, then an optional JSON file, then environment.

use crate::error::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const CONFIG_DIR_NAME: &str = "tubegrab";
const CONFIG_FILE_NAME: &str = "config.json";

/// Read-only settings for one session. Nothing here is ever written back.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Explicit yt-dlp executable; falls back to the embedded binary, then PATH
    pub ytdlp_path: Option<PathBuf>,
    /// yt-dlp format selector, also the output container
    pub format: String,
    /// Forwarded as `--socket-timeout`
    pub socket_timeout_secs: Option<u32>,
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_filter: String,
    pub dark_mode: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            format: "mp4".to_string(),
            socket_timeout_secs: None,
            log_filter: "tubegrab=info".to_string(),
            dark_mode: true,
        }
    }
}

impl AppConfig {
    /// Loads the config from the platform config directory and the environment.
    ///
    /// A missing file is not an error; a broken one is.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match default_config_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "reading config file");
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Malformed {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies `TUBEGRAB_*` overrides looked up through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("TUBEGRAB_YTDLP").filter(|v| !v.trim().is_empty()) {
            self.ytdlp_path = Some(PathBuf::from(path.trim()));
        }
        if let Some(format) = lookup("TUBEGRAB_FORMAT").filter(|v| !v.trim().is_empty()) {
            self.format = format.trim().to_string();
        }
        if let Some(filter) = lookup("TUBEGRAB_LOG").filter(|v| !v.trim().is_empty()) {
            self.log_filter = filter.trim().to_string();
        }
        if self.format.trim().is_empty() {
            warn!("empty format in config, using mp4");
            self.format = "mp4".to_string();
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_single_mp4_download() {
        let config = AppConfig::default();
        assert_eq!(config.format, "mp4");
        assert!(config.ytdlp_path.is_none());
        assert_eq!(config.log_filter, "tubegrab=info");
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "ytdlp_path": "/opt/bin/yt-dlp", "socket_timeout_secs": 15 }"#)
            .unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.ytdlp_path, Some(PathBuf::from("/opt/bin/yt-dlp")));
        assert_eq!(config.socket_timeout_secs, Some(15));
        assert_eq!(config.format, "mp4");
        assert!(config.dark_mode);
    }

    #[test]
    fn malformed_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = AppConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }));
    }

    #[test]
    fn environment_overrides_file_values() {
        let env: HashMap<&str, &str> = [
            ("TUBEGRAB_YTDLP", " /usr/local/bin/yt-dlp "),
            ("TUBEGRAB_FORMAT", "webm"),
            ("TUBEGRAB_LOG", ""),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.ytdlp_path, Some(PathBuf::from("/usr/local/bin/yt-dlp")));
        assert_eq!(config.format, "webm");
        assert_eq!(config.log_filter, "tubegrab=info");
    }
}
