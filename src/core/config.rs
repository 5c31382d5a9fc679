//! Process configuration
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 2.0.0: Endpoint list moved to a YAML file, token/password auth schemes
//! - 1.0.0: Environment based configuration

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;

use crate::wire::transport::{http_to_ws_scheme, origin_for};

/// One remote VM node the bot keeps a connection to
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EndpointConfig {
    pub url: String,
    pub node: String,
    #[serde(default)]
    pub origin: Option<String>,
}

impl EndpointConfig {
    /// Origin header to present, the configured override or one derived from the URL
    pub fn origin(&self) -> String {
        self.origin.clone().unwrap_or_else(|| origin_for(&self.url))
    }
}

/// Contents of the endpoints YAML file
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointsFile {
    pub endpoints: Vec<EndpointConfig>,
}

impl EndpointsFile {
    /// Load and validate the endpoints file
    pub fn load(path: &str) -> Result<Vec<EndpointConfig>> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read endpoints file {path}"))?;
        Self::parse(&contents)
    }

    /// Parse and validate endpoints from YAML
    pub fn parse(contents: &str) -> Result<Vec<EndpointConfig>> {
        let file: EndpointsFile = serde_yaml::from_str(contents)?;
        if file.endpoints.is_empty() {
            return Err(anyhow!("No endpoints configured"));
        }

        let mut seen = HashSet::new();
        let mut endpoints = Vec::with_capacity(file.endpoints.len());
        for mut endpoint in file.endpoints {
            if endpoint.node.trim().is_empty() {
                return Err(anyhow!("Endpoint {} has an empty node id", endpoint.url));
            }
            if !seen.insert(endpoint.node.clone()) {
                return Err(anyhow!("Duplicate endpoint node id: {}", endpoint.node));
            }
            endpoint.url = http_to_ws_scheme(&endpoint.url);
            if !endpoint.url.starts_with("ws://") && !endpoint.url.starts_with("wss://") {
                return Err(anyhow!("Endpoint URL must be ws:// or wss://: {}", endpoint.url));
            }
            endpoints.push(endpoint);
        }
        Ok(endpoints)
    }
}

/// How the bot authenticates against an endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthConfig {
    /// Account token, sent whenever the server demands authentication
    Token { token: String },
    /// Privilege password, used for elevation after attaching to a node
    Password { password: Option<String>, elevate: bool },
}

impl AuthConfig {
    /// Password to elevate with after attach, if elevation is configured
    pub fn elevation_password(&self) -> Option<&str> {
        match self {
            AuthConfig::Password {
                password: Some(password),
                elevate: true,
            } => Some(password),
            _ => None,
        }
    }

    pub fn scheme_name(&self) -> &'static str {
        match self {
            AuthConfig::Token { .. } => "token",
            AuthConfig::Password { .. } => "password",
        }
    }
}

/// Bot configuration loaded at startup
#[derive(Debug, Clone)]
pub struct Config {
    pub username: String,
    pub command_prefix: String,
    pub emoji_shorthand: bool,
    pub auth: AuthConfig,
    pub endpoints: Vec<EndpointConfig>,
    pub database_path: String,
    pub log_level: String,
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), EndpointsFile::load)
    }

    /// Build configuration from a variable lookup and an endpoints loader
    pub fn from_lookup<F, L>(var: F, load_endpoints: L) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
        L: FnOnce(&str) -> Result<Vec<EndpointConfig>>,
    {
        let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        let username = non_empty("BOT_USERNAME")
            .ok_or_else(|| anyhow!("BOT_USERNAME must be set"))?;
        let command_prefix = non_empty("COMMAND_PREFIX").unwrap_or_else(|| "!".to_string());
        let emoji_shorthand = parse_bool(non_empty("EMOJI_SHORTHAND").as_deref(), false)?;

        let auth = match non_empty("AUTH_SCHEME").as_deref().unwrap_or("password") {
            "token" => AuthConfig::Token {
                token: non_empty("AUTH_TOKEN")
                    .ok_or_else(|| anyhow!("AUTH_TOKEN must be set for the token scheme"))?,
            },
            "password" => {
                let password = non_empty("ADMIN_PASSWORD");
                let elevate = parse_bool(non_empty("ELEVATE").as_deref(), password.is_some())?;
                if elevate && password.is_none() {
                    return Err(anyhow!("ELEVATE requires ADMIN_PASSWORD"));
                }
                AuthConfig::Password { password, elevate }
            }
            other => return Err(anyhow!("Unknown AUTH_SCHEME: {other}")),
        };

        let endpoints_path =
            non_empty("ENDPOINTS_CONFIG_PATH").unwrap_or_else(|| "endpoints.yaml".to_string());
        let endpoints = load_endpoints(&endpoints_path)
            .with_context(|| format!("Invalid endpoints config at {endpoints_path}"))?;

        Ok(Config {
            username,
            command_prefix,
            emoji_shorthand,
            auth,
            endpoints,
            database_path: non_empty("DATABASE_PATH").unwrap_or_else(|| "vmbot.db".to_string()),
            log_level: non_empty("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn parse_bool(value: Option<&str>, default: bool) -> Result<bool> {
    match value.map(|v| v.trim().to_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(anyhow!("Invalid boolean value: {v}")),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn endpoints() -> Result<Vec<EndpointConfig>> {
        Ok(vec![EndpointConfig {
            url: "ws://127.0.0.1:6004".to_string(),
            node: "vm1".to_string(),
            origin: None,
        }])
    }

    fn config_from(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned(), |_| endpoints())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("BOT_USERNAME", "emojibot")]).unwrap();
        assert_eq!(config.command_prefix, "!");
        assert!(!config.emoji_shorthand);
        assert_eq!(
            config.auth,
            AuthConfig::Password {
                password: None,
                elevate: false
            }
        );
        assert_eq!(config.database_path, "vmbot.db");
    }

    #[test]
    fn test_missing_username_is_fatal() {
        assert!(config_from(&[]).is_err());
    }

    #[test]
    fn test_token_scheme_requires_token() {
        assert!(config_from(&[("BOT_USERNAME", "b"), ("AUTH_SCHEME", "token")]).is_err());
        let config = config_from(&[
            ("BOT_USERNAME", "b"),
            ("AUTH_SCHEME", "token"),
            ("AUTH_TOKEN", "secret"),
        ])
        .unwrap();
        assert_eq!(
            config.auth,
            AuthConfig::Token {
                token: "secret".to_string()
            }
        );
        assert_eq!(config.auth.elevation_password(), None);
    }

    #[test]
    fn test_password_enables_elevation_by_default() {
        let config = config_from(&[("BOT_USERNAME", "b"), ("ADMIN_PASSWORD", "hunter2")]).unwrap();
        assert_eq!(config.auth.elevation_password(), Some("hunter2"));

        let config = config_from(&[
            ("BOT_USERNAME", "b"),
            ("ADMIN_PASSWORD", "hunter2"),
            ("ELEVATE", "false"),
        ])
        .unwrap();
        assert_eq!(config.auth.elevation_password(), None);
    }

    #[test]
    fn test_unknown_scheme_is_fatal() {
        assert!(config_from(&[("BOT_USERNAME", "b"), ("AUTH_SCHEME", "oauth")]).is_err());
    }

    #[test]
    fn test_parse_endpoints_file() {
        let yaml = r#"
endpoints:
  - url: "https://vm.example.com/collab"
    node: vm1
  - url: "ws://10.0.0.2:6004"
    node: vm2
    origin: "https://example.com"
"#;
        let endpoints = EndpointsFile::parse(yaml).unwrap();
        assert_eq!(endpoints.len(), 2);
        assert_eq!(endpoints[0].url, "wss://vm.example.com/collab");
        assert_eq!(endpoints[0].origin(), "https://vm.example.com");
        assert_eq!(endpoints[1].origin(), "https://example.com");
    }

    #[test]
    fn test_duplicate_nodes_rejected() {
        let yaml = r#"
endpoints:
  - { url: "ws://a", node: vm1 }
  - { url: "ws://b", node: vm1 }
"#;
        assert!(EndpointsFile::parse(yaml).is_err());
    }

    #[test]
    fn test_empty_endpoints_rejected() {
        assert!(EndpointsFile::parse("endpoints: []").is_err());
    }
}
