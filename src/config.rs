//! Generator configuration.
//!
//! The configuration is a small JSON file:
//!
//! ```json
//! {
//!   "url": "https://petstore.swagger.io/v2/swagger.json",
//!   "webserver": "apache",
//!   "ratelimit": 100,
//!   "ratelimit_whitelist": "10.0.0.0/8",
//!   "restricted_endpoints": [
//!     { "path": "/admin", "ip_allowed": "192.168.1.0/24" }
//!   ],
//!   "verbose": false
//! }
//! ```

use crate::error::{Error, Result};
use clap::ValueEnum;
use log::debug;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::path::Path;

/// Default decay window of the rate-limit counter, in seconds.
pub const DEFAULT_RATELIMIT_WINDOW: u64 = 60;

/// Settings driving rule generation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Location of the Swagger/OpenAPI document (URL or file path)
    #[serde(default)]
    pub url: String,
    /// Requests allowed per window; `0` disables rate limiting
    #[serde(default, deserialize_with = "deserialize_ratelimit")]
    pub ratelimit: u64,
    /// `@ipMatch` expression of clients exempt from rate limiting
    #[serde(default)]
    pub ratelimit_whitelist: String,
    /// Counter decay window in seconds
    #[serde(default = "default_ratelimit_window")]
    pub ratelimit_window: u64,
    /// Endpoints only reachable from given addresses
    #[serde(default)]
    pub restricted_endpoints: Vec<RestrictedEndpoint>,
    /// Target web server ("apache" or "nginx")
    #[serde(default)]
    pub webserver: String,
    /// Enable debug logging
    #[serde(default)]
    pub verbose: bool,
}

/// An endpoint restricted to a set of client addresses.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RestrictedEndpoint {
    /// Path template exactly as written in the document
    pub path: String,
    /// `@ipMatch` expression (addresses or CIDR ranges, comma separated)
    pub ip_allowed: String,
}

/// Supported web server dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum WebServer {
    /// Apache httpd with mod_security2
    Apache,
    /// nginx with the ModSecurity-nginx connector
    Nginx,
}

impl WebServer {
    /// Name used in configuration files
    pub fn as_str(&self) -> &'static str {
        match self {
            WebServer::Apache => "apache",
            WebServer::Nginx => "nginx",
        }
    }

    /// Parses a dialect name, ignoring case and surrounding whitespace.
    ///
    /// Returns `None` for anything that is not a supported dialect.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "apache" => Some(WebServer::Apache),
            "nginx" => Some(WebServer::Nginx),
            _ => None,
        }
    }
}

impl fmt::Display for WebServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_ratelimit_window() -> u64 {
    DEFAULT_RATELIMIT_WINDOW
}

/// Accepts the threshold either as a number or as a numeric string.
fn deserialize_ratelimit<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Threshold {
        Number(u64),
        Text(String),
    }

    match Threshold::deserialize(deserializer)? {
        Threshold::Number(n) => Ok(n),
        Threshold::Text(text) if text.trim().is_empty() => Ok(0),
        Threshold::Text(text) => text.trim().parse().map_err(|_| {
            serde::de::Error::custom(format!("invalid ratelimit '{}', expected an integer", text))
        }),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: String::new(),
            ratelimit: 0,
            ratelimit_whitelist: String::new(),
            ratelimit_window: DEFAULT_RATELIMIT_WINDOW,
            restricted_endpoints: Vec::new(),
            webserver: String::new(),
            verbose: false,
        }
    }
}

impl Config {
    /// Reads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or fails [`Config::validate`].
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Reading configuration from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_json(&content).map_err(|e| match e {
            Error::ParseError { message, .. } => Error::ParseError {
                location: path.display().to_string(),
                message,
            },
            other => other,
        })?;
        Ok(config)
    }

    /// Decodes and validates a configuration from JSON text.
    pub fn from_json(content: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(content).map_err(|e| Error::ParseError {
            location: "<config>".to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that serde alone cannot.
    pub fn validate(&self) -> Result<()> {
        if self.ratelimit_window == 0 {
            return Err(Error::ConfigError(
                "ratelimit_window must be at least one second".to_string(),
            ));
        }
        if let Some(entry) = self
            .restricted_endpoints
            .iter()
            .find(|r| r.ip_allowed.trim().is_empty())
        {
            return Err(Error::ConfigError(format!(
                "restricted endpoint {} has an empty ip_allowed",
                entry.path
            )));
        }
        Ok(())
    }

    /// The configured dialect, or `None` when it is not recognized
    pub fn web_server(&self) -> Option<WebServer> {
        WebServer::parse(&self.webserver)
    }

    /// Rate limiting needs both a threshold and a whitelist.
    pub fn rate_limit_enabled(&self) -> bool {
        self.ratelimit > 0 && !self.ratelimit_whitelist.trim().is_empty()
    }

    /// The `@ipMatch` expression for an endpoint, if it is restricted.
    ///
    /// Several entries for the same path are merged into one comma-separated list.
    pub fn allowed_ips_for(&self, path: &str) -> Option<String> {
        let allowed: Vec<&str> = self
            .restricted_endpoints
            .iter()
            .filter(|r| r.path == path)
            .map(|r| r.ip_allowed.trim())
            .collect();

        if allowed.is_empty() {
            None
        } else {
            Some(allowed.join(","))
        }
    }
}
