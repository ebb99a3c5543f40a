pub mod behavior;
pub mod bot;
pub mod config;
pub mod error;
pub mod event;
pub mod paths;
pub mod response;
pub mod topic;

pub use behavior::{BarrierConfig, BehaviorRegistry, EventBehavior, InterceptionMode};
pub use bot::{
    Action, AgentSpec, Behavior, BotConfig, BotParticipant, BotRole, ProgressionControl,
    ResourceLimits, SwarmState, Trigger, TriggerProgression,
};
pub use config::{GuardConfig, InterceptorConfig, PriorityConfig};
pub use error::{Error, Result};
pub use event::{extract_chat_id, EventProgression, Progression, ServiceEvent};
pub use paths::Paths;
pub use response::{BotEventResponse, BotResponse, InterceptionResult};
pub use topic::{topic_matches, MatchKind};
