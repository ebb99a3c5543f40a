use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::Progression;

/// What a single bot proposes for an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotResponse {
    pub progression: Progression,
    #[serde(default)]
    pub reason: String,
    /// Preempts every lower-priority bot for this event.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub exclusive: bool,
}

impl BotResponse {
    pub fn new(progression: Progression, reason: impl Into<String>) -> Self {
        Self {
            progression,
            reason: reason.into(),
            exclusive: false,
        }
    }

    pub fn proceed(reason: impl Into<String>) -> Self {
        Self::new(Progression::Continue, reason)
    }

    pub fn block(reason: impl Into<String>) -> Self {
        Self::new(Progression::Block, reason)
    }

    pub fn exclusive(mut self, exclusive: bool) -> Self {
        self.exclusive = exclusive;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotEventResponse {
    pub bot_id: String,
    pub response: BotResponse,
    pub timestamp: DateTime<Utc>,
}

impl BotEventResponse {
    pub fn new(bot_id: &str, response: BotResponse) -> Self {
        Self {
            bot_id: bot_id.to_string(),
            response,
            timestamp: Utc::now(),
        }
    }
}

/// Outcome of running an event through the interceptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterceptionResult {
    pub intercepted: bool,
    pub progression: Progression,
    pub responses: Vec<BotEventResponse>,
    /// Combined human-readable reason from every responding bot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl InterceptionResult {
    /// Canonical "nothing to do" result.
    pub fn not_intercepted() -> Self {
        Self {
            intercepted: false,
            progression: Progression::Continue,
            responses: Vec::new(),
            reason: None,
        }
    }

    pub fn not_intercepted_with(progression: Progression) -> Self {
        Self {
            progression,
            ..Self::not_intercepted()
        }
    }
}
