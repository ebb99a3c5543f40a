use async_trait::async_trait;
use swarmgate_core::{BotResponse, GuardConfig, Progression, ProgressionControl, Result};
use swarmgate_guard::GuardEvaluator;
use tracing::{debug, warn};

use crate::context::BotDecisionContext;

/// A bot's answer to "do you want this event?".
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub should_handle: bool,
    pub response: BotResponse,
}

impl Decision {
    pub fn handle(response: BotResponse) -> Self {
        Self {
            should_handle: true,
            response,
        }
    }

    pub fn decline(reason: impl Into<String>) -> Self {
        Self {
            should_handle: false,
            response: BotResponse::proceed(reason),
        }
    }
}

#[async_trait]
pub trait DecisionMaker: Send + Sync {
    async fn decide(&self, context: &BotDecisionContext) -> Result<Decision>;
}

/// Rule-based decision maker: handles an event when the bot has a matching
/// behavior and scores at least `min_priority`; the response follows the
/// behavior's progression settings.
pub struct DefaultDecisionMaker {
    guard: GuardEvaluator,
    min_priority: i64,
}

impl DefaultDecisionMaker {
    pub fn new(guard: GuardConfig, min_priority: i64) -> Self {
        Self {
            guard: GuardEvaluator::new(guard),
            min_priority,
        }
    }

    fn resolve_progression(
        &self,
        context: &BotDecisionContext,
        control: ProgressionControl,
        condition: Option<&str>,
    ) -> (Progression, String) {
        match control {
            ProgressionControl::Continue => (Progression::Continue, String::new()),
            ProgressionControl::Block => (Progression::Block, String::new()),
            ProgressionControl::Conditional => {
                let Some(condition) = condition else {
                    warn!(bot_id = %context.bot.id, "Conditional progression without a condition");
                    return (
                        Progression::Block,
                        "conditional progression without condition".to_string(),
                    );
                };
                match self.guard.evaluate(condition, &context.guard_variables()) {
                    Ok(true) => (Progression::Continue, format!("condition '{}' held", condition)),
                    Ok(false) => (Progression::Block, format!("condition '{}' failed", condition)),
                    Err(e) => {
                        warn!(bot_id = %context.bot.id, error = %e, "Progression condition failed to evaluate");
                        (Progression::Block, format!("condition error: {}", e))
                    }
                }
            }
        }
    }
}

impl Default for DefaultDecisionMaker {
    fn default() -> Self {
        Self::new(GuardConfig::default(), 0)
    }
}

#[async_trait]
impl DecisionMaker for DefaultDecisionMaker {
    async fn decide(&self, context: &BotDecisionContext) -> Result<Decision> {
        let Some(behavior) = context.behavior.as_ref() else {
            debug!(bot_id = %context.bot.id, topic = %context.event.event_type, "No behavior for topic");
            return Ok(Decision::decline("no behavior for topic"));
        };

        if context.priority_score < self.min_priority {
            debug!(
                bot_id = %context.bot.id,
                score = context.priority_score,
                min = self.min_priority,
                "Priority below threshold"
            );
            return Ok(Decision::decline("priority below threshold"));
        }

        let settings = behavior.trigger.progression.clone().unwrap_or_default();
        let (progression, detail) =
            self.resolve_progression(context, settings.control, settings.condition.as_deref());

        let mut reason = format!(
            "{} handles {} via {}",
            display_name(context),
            context.event.event_type,
            behavior.action.kind()
        );
        if !detail.is_empty() {
            reason = format!("{} ({})", reason, detail);
        }

        Ok(Decision::handle(
            BotResponse::new(progression, reason).exclusive(settings.exclusive),
        ))
    }
}

fn display_name(context: &BotDecisionContext) -> &str {
    if context.bot.name.is_empty() {
        &context.bot.id
    } else {
        &context.bot.name
    }
}
