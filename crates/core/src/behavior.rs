//! Per-event-type interception behavior.
//!
//! The registry answers one question for the interceptor: given an event
//! type, may bots intercept it, and under which barrier rules. Lookups try the
//! exact type first, then the most specific matching wildcard pattern.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::event::Progression;
use crate::topic::{specificity, topic_matches};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterceptionMode {
    /// Bots are asked one after another in priority order.
    #[default]
    Sequential,
    /// Like sequential, gated by a barrier configuration.
    Barrier,
    /// Bots react, but the event always continues.
    Passive,
}

/// Aggregation rules applied while bots are evaluated for one event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarrierConfig {
    /// Stop once this many responses have been collected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quorum: Option<usize>,
    /// Stop at the first blocking response.
    #[serde(default)]
    pub block_on_first: bool,
    /// Deadline for the whole bot loop, measured from its start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Overall progression applied when the deadline fires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_action: Option<Progression>,
}

impl BarrierConfig {
    pub fn timeout_progression(&self) -> Progression {
        self.timeout_action.clone().unwrap_or(Progression::Block)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBehavior {
    #[serde(default)]
    pub mode: InterceptionMode,
    pub interceptable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barrier_config: Option<BarrierConfig>,
}

impl EventBehavior {
    pub fn sequential() -> Self {
        Self {
            mode: InterceptionMode::Sequential,
            interceptable: true,
            barrier_config: None,
        }
    }

    pub fn barrier(config: BarrierConfig) -> Self {
        Self {
            mode: InterceptionMode::Barrier,
            interceptable: true,
            barrier_config: Some(config),
        }
    }

    pub fn not_interceptable() -> Self {
        Self {
            mode: InterceptionMode::Passive,
            interceptable: false,
            barrier_config: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BehaviorRegistry {
    entries: HashMap<String, EventBehavior>,
}

impl BehaviorRegistry {
    /// Empty registry: every event type resolves to "not interceptable".
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Built-in table.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.insert("chat/message", EventBehavior::sequential());
        registry.insert("chat/message/+", EventBehavior::sequential());
        registry.insert(
            "swarm/resource/#",
            EventBehavior::barrier(BarrierConfig {
                quorum: Some(1),
                block_on_first: true,
                ..Default::default()
            }),
        );
        registry.insert("webhook/#", EventBehavior::sequential());
        registry.insert("swarm/state/#", EventBehavior::not_interceptable());
        registry.insert("system/#", EventBehavior::not_interceptable());
        registry
    }

    /// Built-in table with `overrides` layered on top.
    pub fn with_overrides(overrides: &HashMap<String, EventBehavior>) -> Self {
        let mut registry = Self::with_defaults();
        for (pattern, behavior) in overrides {
            registry.insert(pattern, behavior.clone());
        }
        registry
    }

    pub fn insert(&mut self, pattern: &str, behavior: EventBehavior) {
        self.entries.insert(pattern.to_string(), behavior);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lookup(&self, event_type: &str) -> Option<&EventBehavior> {
        if let Some(behavior) = self.entries.get(event_type) {
            return Some(behavior);
        }
        self.entries
            .iter()
            .filter(|(pattern, _)| topic_matches(pattern, event_type).is_some())
            .max_by(|(a, _), (b, _)| specificity(a).cmp(&specificity(b)).then_with(|| b.cmp(a)))
            .map(|(_, behavior)| behavior)
    }
}

impl Default for BehaviorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_lookup() {
        let registry = BehaviorRegistry::with_defaults();
        let behavior = registry.lookup("chat/message").unwrap();
        assert!(behavior.interceptable);
        assert_eq!(behavior.mode, InterceptionMode::Sequential);
    }

    #[test]
    fn test_wildcard_lookup_prefers_specific() {
        let mut registry = BehaviorRegistry::empty();
        registry.insert("swarm/#", EventBehavior::not_interceptable());
        registry.insert("swarm/resource/+", EventBehavior::sequential());
        assert!(registry.lookup("swarm/resource/created").unwrap().interceptable);
        assert!(!registry.lookup("swarm/other").unwrap().interceptable);
    }

    #[test]
    fn test_unknown_type_has_no_behavior() {
        let registry = BehaviorRegistry::with_defaults();
        assert!(registry.lookup("calendar/reminder").is_none());
        assert!(!registry.lookup("system/internal").unwrap().interceptable);
    }

    #[test]
    fn test_overrides_replace_defaults() {
        let mut overrides = HashMap::new();
        overrides.insert("system/#".to_string(), EventBehavior::sequential());
        let registry = BehaviorRegistry::with_overrides(&overrides);
        assert!(registry.lookup("system/error").unwrap().interceptable);
    }

    #[test]
    fn test_barrier_config_deserialize() {
        let raw = r#"{"mode": "barrier", "interceptable": true,
                      "barrierConfig": {"quorum": 2, "blockOnFirst": true, "timeoutMs": 50, "timeoutAction": "continue"}}"#;
        let behavior: EventBehavior = serde_json::from_str(raw).unwrap();
        let barrier = behavior.barrier_config.unwrap();
        assert_eq!(barrier.quorum, Some(2));
        assert!(barrier.block_on_first);
        assert_eq!(barrier.timeout_progression(), Progression::Continue);
    }
}
