use serde::Deserialize;
use std::path::Path;

/// Environment variable naming an alternative config file
pub const CONFIG_ENV: &str = "SURVIVAL_SERVER_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "server.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub database_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:2567".to_string(),
            database_url: "sqlite:survival.db?mode=rwc".to_string(),
        }
    }
}

impl ServerConfig {
    /// Read `$SURVIVAL_SERVER_CONFIG` or `server.toml`; defaults when neither exists
    pub fn load() -> Result<Self, String> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let path = Path::new(&path);
        if !path.exists() {
            tracing::info!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        Self::load_from(path)
    }

    pub fn load_from(path: &Path) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {:?}: {}", path, e))?;
        toml::from_str(&contents).map_err(|e| format!("Failed to parse {:?}: {}", path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("server.toml");
        std::fs::write(&path, "bind_addr = \"127.0.0.1:9000\"\n").unwrap();

        let config = ServerConfig::load_from(&path).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.database_url, ServerConfig::default().database_url);
    }

    #[test]
    fn test_bad_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("server.toml");
        std::fs::write(&path, "bind_addr = 12").unwrap();
        assert!(ServerConfig::load_from(&path).is_err());
    }
}
