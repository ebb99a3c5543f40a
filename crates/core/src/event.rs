use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::response::BotEventResponse;

/// Directive telling the event pipeline whether to proceed.
///
/// Serialized as a bare string: `"continue"`, `"block"`, or any other
/// directive a bot chooses to emit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Progression {
    Continue,
    Block,
    Other(String),
}

impl Progression {
    pub fn as_str(&self) -> &str {
        match self {
            Progression::Continue => "continue",
            Progression::Block => "block",
            Progression::Other(s) => s.as_str(),
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(self, Progression::Block)
    }
}

impl Default for Progression {
    fn default() -> Self {
        Progression::Continue
    }
}

impl From<String> for Progression {
    fn from(s: String) -> Self {
        match s.as_str() {
            "continue" => Progression::Continue,
            "block" => Progression::Block,
            _ => Progression::Other(s),
        }
    }
}

impl From<&str> for Progression {
    fn from(s: &str) -> Self {
        Progression::from(s.to_string())
    }
}

impl From<Progression> for String {
    fn from(p: Progression) -> Self {
        match p {
            Progression::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for Progression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record of a decision already reached for an event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventProgression {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_decision: Option<Progression>,
    /// Bots that already processed the event, in processing order.
    #[serde(default)]
    pub processed_by: Vec<BotEventResponse>,
}

/// A domain event flowing through the swarm (chat message, resource change,
/// webhook, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceEvent {
    pub id: String,
    /// Hierarchical topic, e.g. `chat/message`.
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progression: Option<EventProgression>,
}

impl ServiceEvent {
    pub fn new(event_type: &str, data: serde_json::Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event_type: event_type.to_string(),
            timestamp: Utc::now(),
            data: Some(data),
            progression: None,
        }
    }

    /// The final decision recorded by an earlier pass, if any.
    pub fn final_decision(&self) -> Option<&Progression> {
        self.progression
            .as_ref()
            .and_then(|p| p.final_decision.as_ref())
    }

    pub fn lock_key(&self) -> String {
        format!("event_interception:{}", self.id)
    }
}

/// Conversation the event belongs to, used to scope resource allocation.
pub fn extract_chat_id(event: &ServiceEvent) -> Option<String> {
    let data = event.data.as_ref()?;
    ["chatId", "chat_id", "conversationId", "swarmId"]
        .iter()
        .find_map(|key| data.get(*key).and_then(|v| v.as_str()))
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}
