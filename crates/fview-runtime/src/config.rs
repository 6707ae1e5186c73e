#![forbid(unsafe_code)]

//! Runtime configuration.
//!
//! [`RuntimeConfig::from_env`] reads:
//!
//! - `FVIEW_DEBUG_LOG`: debug log destination (the file must already exist).
//! - `FVIEW_MAX_ACTIONS_PER_TICK`: coordinator jobs run per tick; unparsable
//!   or zero values fall back to the default.

use std::env;
use std::path::PathBuf;

/// Jobs drained from the coordinator per [`Application::tick`](crate::Application::tick).
pub const DEFAULT_MAX_ACTIONS_PER_TICK: usize = 256;

/// Environment variable overriding [`RuntimeConfig::max_actions_per_tick`].
pub const MAX_ACTIONS_ENV: &str = "FVIEW_MAX_ACTIONS_PER_TICK";

/// Settings applied by [`Application::with_config`](crate::Application::with_config).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RuntimeConfig {
    /// Debug log destination; `None` leaves the log at its default.
    pub debug_log_path: Option<PathBuf>,
    /// Upper bound on coordinator jobs run per tick. Excess jobs wait.
    pub max_actions_per_tick: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            debug_log_path: None,
            max_actions_per_tick: DEFAULT_MAX_ACTIONS_PER_TICK,
        }
    }
}

impl RuntimeConfig {
    /// Configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Configuration from an arbitrary variable lookup.
    #[must_use]
    pub fn from_vars<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let debug_log_path = get(fview_core::debug_log::LOG_PATH_ENV)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);
        let max_actions_per_tick = get(MAX_ACTIONS_ENV)
            .and_then(|value| value.trim().parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_MAX_ACTIONS_PER_TICK);
        Self {
            debug_log_path,
            max_actions_per_tick,
        }
    }

    #[must_use]
    pub fn with_debug_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_log_path = Some(path.into());
        self
    }

    /// Set the per-tick job budget (clamped to at least one).
    #[must_use]
    pub fn with_max_actions_per_tick(mut self, limit: usize) -> Self {
        self.max_actions_per_tick = limit.max(1);
        self
    }
}
