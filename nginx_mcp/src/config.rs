//! # Server Settings
//!
//! Process-wide, read-only configuration for the proxy being controlled. Settings are
//! assembled once at startup and then shared behind an `Arc`; nothing below `main`
//! reads the environment on its own.
//!
//! ## Sources (lowest to highest precedence)
//!
//! 1. Built-in defaults ([`Settings::default`]).
//! 2. A TOML file: the path given with `--config`, or `nginx_mcp.toml` in the current
//!    directory when it exists.
//! 3. `NGINX_*` environment variables ([`Settings::apply_env_overlay`]).
//! 4. Command-line flags, applied by the shell module.
//!
//! ```toml
//! host = "localhost"
//! port = 8080
//! project_dir = "/srv/proxy"
//! timeout_ms = 20000
//!
//! [environment]
//! COMPOSE_PROJECT_NAME = "edge"
//! ```

use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

/// Default per-strategy command timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;
/// Default timeout for HTTP probes against the proxy.
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 5_000;
/// Settings file picked up from the current directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "nginx_mcp.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read settings file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse settings file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// Settings for the proxy instance and the command engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Host the proxy answers HTTP on.
    pub host: String,
    pub port: u16,
    /// Path of the `stub_status` endpoint.
    pub status_path: String,
    /// Directory holding the compose project; commands run from here.
    pub project_dir: PathBuf,
    /// Binary providing `compose` (normally `docker`).
    pub compose_binary: String,
    /// Compose service name of the proxy container.
    pub service_name: String,
    /// Timeout for each execution strategy, in milliseconds.
    pub timeout_ms: u64,
    pub http_timeout_ms: u64,
    /// Certificate directory inside the container.
    pub ssl_dir: String,
    /// Extra variables for every spawned command.
    pub environment: BTreeMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 80,
            status_path: "/nginx_status".to_string(),
            project_dir: PathBuf::from("."),
            compose_binary: "docker".to_string(),
            service_name: "nginx".to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            http_timeout_ms: DEFAULT_HTTP_TIMEOUT_MS,
            ssl_dir: "/etc/nginx/ssl".to_string(),
            environment: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Loads defaults, the settings file and the process environment overlay.
    ///
    /// An explicit `path` must exist; without one, [`DEFAULT_CONFIG_FILE`] is used only
    /// if present.
    pub async fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = match path {
            Some(path) => Self::from_file(path).await?,
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if tokio::fs::try_exists(fallback).await.unwrap_or(false) {
                    Self::from_file(fallback).await?
                } else {
                    Self::default()
                }
            }
        };
        settings.apply_env_overlay(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reads a TOML settings file on top of the defaults.
    pub async fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let settings: Settings = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Overrides fields from `NGINX_*` variables found through `lookup`.
    pub fn apply_env_overlay<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(v) = get("NGINX_HOST") {
            self.host = v;
        }
        if let Some(v) = get("NGINX_PORT") {
            self.port = parse_number("NGINX_PORT", &v)?;
        }
        if let Some(v) = get("NGINX_STATUS_PATH") {
            self.status_path = v;
        }
        if let Some(v) = get("NGINX_PROJECT_DIR") {
            self.project_dir = PathBuf::from(v);
        }
        if let Some(v) = get("NGINX_COMPOSE_BINARY") {
            self.compose_binary = v;
        }
        if let Some(v) = get("NGINX_SERVICE") {
            self.service_name = v;
        }
        if let Some(v) = get("NGINX_TIMEOUT_MS") {
            self.timeout_ms = parse_number("NGINX_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = get("NGINX_HTTP_TIMEOUT_MS") {
            self.http_timeout_ms = parse_number("NGINX_HTTP_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = get("NGINX_SSL_DIR") {
            self.ssl_dir = v;
        }
        Ok(())
    }

    /// Checks the invariants the rest of the server relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(invalid("timeout_ms", "0", "must be a positive integer"));
        }
        if self.http_timeout_ms == 0 {
            return Err(invalid("http_timeout_ms", "0", "must be a positive integer"));
        }
        if self.host.trim().is_empty() {
            return Err(invalid("host", &self.host, "must not be empty"));
        }
        if self.compose_binary.trim().is_empty() {
            return Err(invalid(
                "compose_binary",
                &self.compose_binary,
                "must not be empty",
            ));
        }
        if self.service_name.trim().is_empty() {
            return Err(invalid("service_name", &self.service_name, "must not be empty"));
        }
        if !self.status_path.starts_with('/') {
            return Err(invalid("status_path", &self.status_path, "must start with '/'"));
        }
        Ok(())
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    /// Base URL of the proxy, without a trailing slash.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// `<compose_binary> compose` followed by `args`.
    pub fn compose_args<I, S>(&self, args: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut argv = vec![self.compose_binary.clone(), "compose".to_string()];
        argv.extend(args.into_iter().map(Into::into));
        argv
    }
}

fn invalid(key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_number<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|e| invalid(key, value, &e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        assert_eq!(settings.timeout_ms, 15_000);
        assert_eq!(settings.base_url(), "http://localhost:80");
        settings.validate().unwrap();
    }

    #[test]
    fn env_overlay_overrides_fields() {
        let mut settings = Settings::default();
        settings
            .apply_env_overlay(lookup(&[
                ("NGINX_HOST", "proxy.internal"),
                ("NGINX_PORT", "8080"),
                ("NGINX_TIMEOUT_MS", "2500"),
                ("NGINX_SERVICE", "edge"),
                ("NGINX_PROJECT_DIR", "/srv/edge"),
            ]))
            .unwrap();
        assert_eq!(settings.host, "proxy.internal");
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.command_timeout(), Duration::from_millis(2500));
        assert_eq!(settings.service_name, "edge");
        assert_eq!(settings.project_dir, PathBuf::from("/srv/edge"));
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let mut settings = Settings::default();
        settings
            .apply_env_overlay(lookup(&[("NGINX_HOST", "   ")]))
            .unwrap();
        assert_eq!(settings.host, "localhost");
    }

    #[test]
    fn bad_port_is_rejected() {
        let mut settings = Settings::default();
        let err = settings
            .apply_env_overlay(lookup(&[("NGINX_PORT", "99999")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "NGINX_PORT"));
    }

    #[test]
    fn zero_timeout_fails_validation() {
        let settings = Settings {
            timeout_ms: 0,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn compose_args_prefix_binary() {
        let settings = Settings::default();
        assert_eq!(
            settings.compose_args(["ps", "nginx"]),
            vec!["docker", "compose", "ps", "nginx"]
        );
    }
}
