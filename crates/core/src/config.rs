use std::env;

use serde::{Deserialize, Serialize};

use crate::error::YieldError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// ── Yielder config ────────────────────────────────────────────

/// Construction parameters for a yielder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct YieldConfig {
    /// Admission cap on concurrently running tasks. `None` = unbounded.
    #[serde(default)]
    pub pool_size: Option<usize>,
    /// Release results in spawn order instead of arrival order.
    #[serde(default)]
    pub ordered: bool,
}

impl YieldConfig {
    /// Arrival-order delivery, no admission cap.
    pub fn unordered() -> Self {
        Self::default()
    }

    /// Spawn-order delivery, no admission cap.
    pub fn ordered() -> Self {
        Self {
            pool_size: None,
            ordered: true,
        }
    }

    /// Cap concurrently running tasks at `pool_size`.
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = Some(pool_size);
        self
    }

    /// Build config from environment variables (call `load_dotenv()` first).
    ///
    /// Reads `YIELDPOOL_POOL_SIZE` and `YIELDPOOL_ORDERED`. When
    /// `YIELDPOOL_PROFILE` is set (e.g. `BATCH`), each key is first looked
    /// up as `{PROFILE}_{KEY}`.
    pub fn from_env() -> Result<Self, YieldError> {
        let profile = env_opt("YIELDPOOL_PROFILE")
            .unwrap_or_default()
            .to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Result<Self, YieldError> {
        let p = profile.to_uppercase();

        let pool_size = match profiled_env_opt(&p, "YIELDPOOL_POOL_SIZE") {
            Some(raw) => Some(raw.trim().parse::<usize>().map_err(|e| {
                YieldError::Config(format!("YIELDPOOL_POOL_SIZE={raw:?}: {e}"))
            })?),
            None => None,
        };
        let ordered = match profiled_env_opt(&p, "YIELDPOOL_ORDERED") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| {
                YieldError::Config(format!("YIELDPOOL_ORDERED={raw:?}: expected a boolean"))
            })?,
            None => false,
        };

        let config = Self { pool_size, ordered };
        config.validate()?;
        Ok(config)
    }

    /// Parse a `[yielder]`-less TOML table, e.g. `pool_size = 4\nordered = true`.
    pub fn from_toml(s: &str) -> Result<Self, YieldError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), YieldError> {
        if self.pool_size == Some(0) {
            return Err(YieldError::Config("pool_size must be positive".into()));
        }
        Ok(())
    }

    /// Print a one-line summary for startup logs.
    pub fn log_summary(&self) {
        match self.pool_size {
            Some(n) => tracing::info!(pool_size = n, ordered = self.ordered, "yielder config"),
            None => tracing::info!(pool_size = "unbounded", ordered = self.ordered, "yielder config"),
        }
    }
}
