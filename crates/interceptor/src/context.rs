use serde::Serialize;
use serde_json::{Map, Value};
use swarmgate_core::{
    topic_matches, Behavior, BotParticipant, Error, Result, ServiceEvent, SwarmState,
};

/// Everything a bot sees when asked to decide on one event.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BotDecisionContext {
    pub event: ServiceEvent,
    pub bot: BotParticipant,
    pub swarm_state: SwarmState,
    pub matched_pattern: String,
    pub priority_score: i64,
    /// The bot behavior whose trigger matched the event, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub behavior: Option<Behavior>,
}

impl BotDecisionContext {
    /// Read-only variables bound for `when`/`condition` expressions:
    /// `event`, `bot`, `swarm`, `topic`, `matched_pattern`, `priority`.
    pub fn guard_variables(&self) -> Map<String, Value> {
        let mut vars = Map::new();
        vars.insert("event".to_string(), to_value(&self.event));
        vars.insert("bot".to_string(), to_value(&self.bot));
        vars.insert("swarm".to_string(), to_value(&self.swarm_state));
        vars.insert("topic".to_string(), Value::String(self.event.event_type.clone()));
        vars.insert(
            "matched_pattern".to_string(),
            Value::String(self.matched_pattern.clone()),
        );
        vars.insert("priority".to_string(), Value::from(self.priority_score));
        vars
    }
}

fn to_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// The behavior of `bot` that reacts to `topic`: an exact trigger topic wins,
/// otherwise the first matching wildcard in declaration order.
pub fn select_behavior<'a>(bot: &'a BotParticipant, topic: &str) -> Option<&'a Behavior> {
    let behaviors = bot.behaviors();
    behaviors
        .iter()
        .find(|b| b.trigger.topic == topic)
        .or_else(|| {
            behaviors
                .iter()
                .find(|b| topic_matches(&b.trigger.topic, topic).is_some())
        })
}

/// Builds per-bot decision contexts from live swarm state.
pub trait SwarmStateAccessor: Send + Sync {
    fn build_trigger_context(
        &self,
        event: &ServiceEvent,
        bot: &BotParticipant,
        swarm_state: &SwarmState,
        matched_pattern: &str,
        priority_score: i64,
    ) -> Result<BotDecisionContext>;
}

#[derive(Debug, Clone, Default)]
pub struct DefaultSwarmStateAccessor;

impl SwarmStateAccessor for DefaultSwarmStateAccessor {
    fn build_trigger_context(
        &self,
        event: &ServiceEvent,
        bot: &BotParticipant,
        swarm_state: &SwarmState,
        matched_pattern: &str,
        priority_score: i64,
    ) -> Result<BotDecisionContext> {
        if event.id.is_empty() {
            return Err(Error::ContextBuild("event has no id".to_string()));
        }
        if bot.id.is_empty() {
            return Err(Error::ContextBuild("bot has no id".to_string()));
        }
        Ok(BotDecisionContext {
            event: event.clone(),
            bot: bot.clone(),
            swarm_state: swarm_state.clone(),
            matched_pattern: matched_pattern.to_string(),
            priority_score,
            behavior: select_behavior(bot, &event.event_type).cloned(),
        })
    }
}
