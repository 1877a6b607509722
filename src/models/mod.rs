// Application configuration models

use serde::Deserialize;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub session: SessionSettings,
}

impl AppConfig {
    /// Validate the configuration before use
    pub fn validate(&self) -> Result<(), String> {
        if self.session.timeout_secs == 0 {
            return Err("session.timeout_secs must be greater than zero".to_string());
        }

        if self.session.check_period_ms == 0 {
            return Err("session.check_period_ms must be greater than zero".to_string());
        }

        if self.session.manager == SessionManagerKind::Shared && self.session.redis_url.is_none() {
            return Err(
                "session.redis_url is required when session.manager is 'shared'".to_string(),
            );
        }

        Ok(())
    }
}

/// Which session store backend to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionManagerKind {
    /// In-process map with periodic pruning
    Memory,
    /// Redis store shared across instances
    Shared,
}

impl Default for SessionManagerKind {
    fn default() -> Self {
        SessionManagerKind::Memory
    }
}

/// Session store settings
#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    #[serde(default)]
    pub manager: SessionManagerKind,
    /// Session max age in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// How often the in-memory store prunes expired entries, in milliseconds
    #[serde(default = "default_check_period_ms")]
    pub check_period_ms: u64,
    /// Redis connection URL, required for the shared manager
    pub redis_url: Option<String>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            manager: SessionManagerKind::Memory,
            timeout_secs: default_timeout_secs(),
            check_period_ms: default_check_period_ms(),
            redis_url: None,
        }
    }
}

fn default_timeout_secs() -> u64 {
    3600 // 1 hour session max age
}

fn default_check_period_ms() -> u64 {
    3_600_000 // prune expired entries every 1h
}
