use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::behavior::EventBehavior;
use crate::bot::ResourceLimits;
use crate::error::{Error, Result};
use crate::paths::Paths;
use crate::topic::validate_pattern;

/// Weights used to order candidate bots for an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityConfig {
    #[serde(default = "default_coordinator_weight")]
    pub coordinator_weight: i64,
    #[serde(default = "default_specialist_weight")]
    pub specialist_weight: i64,
    #[serde(default = "default_monitor_weight")]
    pub monitor_weight: i64,
    #[serde(default = "default_participant_weight")]
    pub participant_weight: i64,
    /// Weight of any role not listed above.
    #[serde(default = "default_other_weight")]
    pub default_weight: i64,
    /// Added when the bot's pattern equals the event type exactly.
    #[serde(default = "default_exact_match_bonus")]
    pub exact_match_bonus: i64,
}

fn default_coordinator_weight() -> i64 {
    100
}

fn default_specialist_weight() -> i64 {
    50
}

fn default_monitor_weight() -> i64 {
    25
}

fn default_participant_weight() -> i64 {
    25
}

fn default_other_weight() -> i64 {
    10
}

fn default_exact_match_bonus() -> i64 {
    20
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            coordinator_weight: default_coordinator_weight(),
            specialist_weight: default_specialist_weight(),
            monitor_weight: default_monitor_weight(),
            participant_weight: default_participant_weight(),
            default_weight: default_other_weight(),
            exact_match_bonus: default_exact_match_bonus(),
        }
    }
}

/// Sandbox limits for `when`/`condition` expressions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardConfig {
    #[serde(default = "default_max_operations")]
    pub max_operations: u64,
    #[serde(default = "default_max_expr_depth")]
    pub max_expr_depth: usize,
    #[serde(default = "default_max_string_size")]
    pub max_string_size: usize,
    #[serde(default = "default_max_collection_size")]
    pub max_array_size: usize,
    #[serde(default = "default_max_collection_size")]
    pub max_map_size: usize,
}

fn default_max_operations() -> u64 {
    10_000
}

fn default_max_expr_depth() -> usize {
    32
}

fn default_max_string_size() -> usize {
    100_000
}

fn default_max_collection_size() -> usize {
    1_000
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            max_operations: default_max_operations(),
            max_expr_depth: default_max_expr_depth(),
            max_string_size: default_max_string_size(),
            max_array_size: default_max_collection_size(),
            max_map_size: default_max_collection_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterceptorConfig {
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
    /// On lock failure return `block` instead of `continue`.
    #[serde(default)]
    pub fail_closed_on_lock_error: bool,
    /// Bots scoring below this are declined by the default decision maker.
    #[serde(default)]
    pub min_priority: i64,
    #[serde(default)]
    pub priority: PriorityConfig,
    #[serde(default)]
    pub guard: GuardConfig,
    /// Limits for routine actions that declare none.
    #[serde(default)]
    pub default_limits: ResourceLimits,
    /// Event-type pattern -> behavior, layered over the built-in table.
    #[serde(default)]
    pub behaviors: HashMap<String, EventBehavior>,
    /// Role -> implicit subscription patterns, replacing the built-in table
    /// for the listed roles.
    #[serde(default)]
    pub role_defaults: HashMap<String, Vec<String>>,
}

fn default_lock_timeout_ms() -> u64 {
    5000
}

impl Default for InterceptorConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout_ms(),
            fail_closed_on_lock_error: false,
            min_priority: 0,
            priority: PriorityConfig::default(),
            guard: GuardConfig::default(),
            default_limits: ResourceLimits::default(),
            behaviors: HashMap::new(),
            role_defaults: HashMap::new(),
        }
    }
}

impl InterceptorConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: InterceptorConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the interceptor cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.lock_timeout_ms == 0 {
            return Err(Error::Config("lockTimeoutMs must be positive".to_string()));
        }
        let patterns = self
            .behaviors
            .keys()
            .chain(self.role_defaults.values().flatten());
        for pattern in patterns {
            validate_pattern(pattern)
                .map_err(|e| Error::Config(format!("pattern '{}': {}", pattern, e)))?;
        }
        Ok(())
    }

    pub fn load_or_default(paths: &Paths) -> Result<Self> {
        let config_path = paths.config_file();
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn lock_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.lock_timeout_ms)
    }
}
