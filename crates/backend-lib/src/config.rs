// ============================
// taskchat-backend-lib/src/config.rs
// ============================
//! Configuration management.
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Result;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Data directory path for the flat-file record store
    pub data_dir: PathBuf,
    /// Log level used when RUST_LOG is not set
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:4000".parse().unwrap(),
            data_dir: PathBuf::from("data"),
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from config files and environment variables,
    /// falling back to defaults for anything unspecified.
    pub fn load() -> Result<Self> {
        let settings = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file("config.toml"))
            .merge(Yaml::file("config.yaml"))
            .merge(Json::file("config.json"))
            .merge(Env::prefixed("TASKCHAT_"))
            .extract()?;

        Ok(settings)
    }

    /// Load settings from an explicit TOML file, still honoring env overrides.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("TASKCHAT_"))
            .extract()?;

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.bind_addr.port(), 4000);
        assert_eq!(settings.data_dir, PathBuf::from("data"));
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bind_addr = \"0.0.0.0:9000\"").unwrap();
        writeln!(file, "log_level = \"debug\"").unwrap();

        let settings = Settings::load_from(file.path()).unwrap();
        assert_eq!(settings.bind_addr.port(), 9000);
        assert_eq!(settings.log_level, "debug");
        // untouched field keeps its default
        assert_eq!(settings.data_dir, PathBuf::from("data"));
    }
}
