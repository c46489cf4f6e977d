// Runtime configuration for rolegate
// Layering: compiled defaults < rolegate.toml < ROLEGATE_* environment

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::errors::{GateError, GateResult};
use crate::session::SessionPolicy;
use crate::store::CookieOptions;

pub const CONFIG_FILE: &str = "rolegate.toml";
pub const ENV_PREFIX: &str = "ROLEGATE_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateConfig {
    pub protected_prefix: String,
    pub public_root: String,
    pub cookie_max_age_secs: i64,
    /// Artificial delay standing in for the remote permission service.
    pub save_latency_ms: u64,
    pub store_path: String,
    pub log_level: String,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Default for GateConfig {
    fn default() -> Self {
        GateConfig {
            protected_prefix: "/admin".to_string(),
            public_root: "/".to_string(),
            cookie_max_age_secs: 86_400,
            save_latency_ms: 500,
            store_path: "data/rolegate".to_string(),
            log_level: "info".to_string(),
            server: ServerConfig::default(),
        }
    }
}

impl GateConfig {
    pub fn figment(path: Option<&Path>) -> Figment {
        let file = path.unwrap_or_else(|| Path::new(CONFIG_FILE));
        Figment::from(Serialized::defaults(GateConfig::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn load(path: Option<&Path>) -> GateResult<Self> {
        let config: GateConfig = Self::figment(path).extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> GateResult<()> {
        if !self.protected_prefix.starts_with('/') || self.protected_prefix == "/" {
            return Err(GateError::config(format!(
                "protected_prefix must be a non-root absolute path, got {:?}",
                self.protected_prefix
            )));
        }
        if !self.public_root.starts_with('/') {
            return Err(GateError::config("public_root must start with '/'"));
        }
        if self.public_root.starts_with(&self.protected_prefix) {
            return Err(GateError::config("public_root cannot sit inside the protected area"));
        }
        if self.cookie_max_age_secs <= 0 {
            return Err(GateError::config("cookie_max_age_secs must be positive"));
        }
        Ok(())
    }

    pub fn cookie_options(&self) -> CookieOptions {
        CookieOptions::with_max_age_secs(self.cookie_max_age_secs)
    }

    pub fn save_latency(&self) -> Duration {
        Duration::from_millis(self.save_latency_ms)
    }

    pub fn session_policy(&self) -> SessionPolicy {
        SessionPolicy {
            protected_prefix: self.protected_prefix.clone(),
            public_root: self.public_root.clone(),
            cookie: self.cookie_options(),
        }
    }

    pub fn to_toml(&self) -> GateResult<String> {
        toml::to_string_pretty(self).map_err(|e| GateError::config(e.to_string()))
    }
}
