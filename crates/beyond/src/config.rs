//! TOML configuration. Every field has a default, so an empty file (or no
//! file) is a valid configuration.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BeyondError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Endpoint speaking the websocket protocol.
    #[serde(default = "default_websocket_path")]
    pub websocket_path: String,
    /// Page served for every other GET path.
    #[serde(default)]
    pub index_file: Option<PathBuf>,
    /// Updates queued per connection before a render waits for the socket.
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8080
}
fn default_websocket_path() -> String {
    "/websocket".into()
}
fn default_outbound_buffer() -> usize {
    64
}
fn default_log_level() -> String {
    "info".into()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            websocket_path: default_websocket_path(),
            index_file: None,
            outbound_buffer: default_outbound_buffer(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|err| BeyondError::Config(format!("server.host `{}`: {err}", self.host)))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(text).map_err(|err| BeyondError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.server.websocket_path.starts_with('/') {
            return Err(BeyondError::Config(format!(
                "server.websocket_path must start with '/', got `{}`",
                self.server.websocket_path
            )));
        }
        if self.server.outbound_buffer == 0 {
            return Err(BeyondError::Config(
                "server.outbound_buffer must be at least 1".to_string(),
            ));
        }
        self.server.socket_addr()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::from_toml_str("").expect("empty config");
        assert_eq!(config, Config::default());
        assert_eq!(
            config.server.socket_addr().expect("addr"),
            "127.0.0.1:8080".parse::<SocketAddr>().expect("literal")
        );
        assert_eq!(config.server.websocket_path, "/websocket");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::from_toml_str(
            r#"
[server]
port = 9000
index_file = "index.html"

[logging]
json = true
"#,
        )
        .expect("config");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.index_file, Some(PathBuf::from("index.html")));
        assert_eq!(config.server.outbound_buffer, 64);
        assert!(config.logging.json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn rejects_invalid_values() {
        let err = Config::from_toml_str("[server]\nwebsocket_path = \"ws\"\n").expect_err("path");
        assert!(matches!(err, BeyondError::Config(_)));
        let err = Config::from_toml_str("[server]\noutbound_buffer = 0\n").expect_err("buffer");
        assert!(matches!(err, BeyondError::Config(_)));
        let err = Config::from_toml_str("[server]\nhost = \"example.com\"\n").expect_err("host");
        assert!(matches!(err, BeyondError::Config(_)));
        let err = Config::from_toml_str("[server]\nport = \"eighty\"\n").expect_err("port");
        assert!(matches!(err, BeyondError::Config(_)));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("beyond.toml");
        std::fs::write(&path, "[server]\nport = 0\n").expect("write config");
        let config = Config::load(&path).expect("load");
        assert_eq!(config.server.port, 0);

        let missing = Config::load(&dir.path().join("missing.toml")).expect_err("missing");
        assert!(matches!(missing, BeyondError::Io(_)));
    }
}
