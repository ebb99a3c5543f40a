use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::{Error, Result};

/// Role a bot plays inside a swarm. Unknown roles are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BotRole {
    Coordinator,
    Specialist,
    Monitor,
    Participant,
    Other(String),
}

impl BotRole {
    pub fn as_str(&self) -> &str {
        match self {
            BotRole::Coordinator => "coordinator",
            BotRole::Specialist => "specialist",
            BotRole::Monitor => "monitor",
            BotRole::Participant => "participant",
            BotRole::Other(s) => s.as_str(),
        }
    }
}

impl Default for BotRole {
    fn default() -> Self {
        BotRole::Participant
    }
}

impl From<String> for BotRole {
    fn from(s: String) -> Self {
        match s.as_str() {
            "coordinator" => BotRole::Coordinator,
            "specialist" => BotRole::Specialist,
            "monitor" => BotRole::Monitor,
            "participant" => BotRole::Participant,
            _ => BotRole::Other(s),
        }
    }
}

impl From<BotRole> for String {
    fn from(role: BotRole) -> Self {
        match role {
            BotRole::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for BotRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressionControl {
    #[default]
    Continue,
    Block,
    /// Continue only when `condition` evaluates to true.
    Conditional,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerProgression {
    #[serde(default)]
    pub control: ProgressionControl,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default)]
    pub exclusive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    pub topic: String,
    /// Guard expression evaluated against the decision context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progression: Option<TriggerProgression>,
}

/// Budget a routine may consume while it runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceLimits {
    pub max_credits: u64,
    pub max_duration_ms: u64,
    #[serde(rename = "maxMemoryMB")]
    pub max_memory_mb: u64,
    pub max_concurrent_steps: u32,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_credits: 1000,
            max_duration_ms: 300_000,
            max_memory_mb: 512,
            max_concurrent_steps: 4,
        }
    }
}

/// What a bot does once it decides to handle an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Start a long-lived, stoppable routine execution.
    #[serde(rename_all = "camelCase")]
    Routine {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        routine_id: Option<String>,
        #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
        inputs: serde_json::Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limits: Option<ResourceLimits>,
    },
    /// Run a single step with a free-text instruction.
    #[serde(rename_all = "camelCase")]
    Invoke {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        purpose: Option<String>,
    },
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Routine { .. } => "routine",
            Action::Invoke { .. } => "invoke",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Behavior {
    pub trigger: Trigger,
    pub action: Action,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub behaviors: Vec<Behavior>,
    #[serde(default)]
    pub subscriptions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_spec: Option<AgentSpec>,
}

/// A bot taking part in a swarm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotParticipant {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: BotRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<BotConfig>,
}

impl BotParticipant {
    pub fn new(id: &str, name: &str, role: BotRole) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            role,
            config: None,
        }
    }

    pub fn with_behavior(mut self, behavior: Behavior) -> Self {
        self.spec_mut().behaviors.push(behavior);
        self
    }

    pub fn with_subscription(mut self, pattern: &str) -> Self {
        self.spec_mut().subscriptions.push(pattern.to_string());
        self
    }

    fn spec_mut(&mut self) -> &mut AgentSpec {
        self.config
            .get_or_insert_with(BotConfig::default)
            .agent_spec
            .get_or_insert_with(AgentSpec::default)
    }

    pub fn agent_spec(&self) -> Option<&AgentSpec> {
        self.config.as_ref().and_then(|c| c.agent_spec.as_ref())
    }

    pub fn behaviors(&self) -> &[Behavior] {
        self.agent_spec()
            .map(|s| s.behaviors.as_slice())
            .unwrap_or(&[])
    }

    pub fn subscriptions(&self) -> &[String] {
        self.agent_spec()
            .map(|s| s.subscriptions.as_slice())
            .unwrap_or(&[])
    }
}

/// Shared state of the swarm an event belongs to. Opaque to the engine
/// apart from being exposed to guards and decision makers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwarmState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swarm_id: Option<String>,
    #[serde(flatten)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

/// Load bot definitions from a JSON or YAML file (chosen by extension).
pub fn load_bots(path: &Path) -> Result<Vec<BotParticipant>> {
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            Error::NotFound(format!("bot definitions at {}", path.display()))
        }
        _ => Error::Io(e),
    })?;
    let bots = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
        Some("json") | None => serde_json::from_str(&content)?,
        Some(other) => {
            return Err(Error::Validation(format!(
                "unsupported bot file extension '{}'",
                other
            )))
        }
    };
    Ok(bots)
}
