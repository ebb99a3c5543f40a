//! The event interceptor: decides, per event, which registered bots get to
//! weigh in and what the combined verdict is.
//!
//! One call to [`EventInterceptor::check_interception`] walks the candidates
//! strictly in priority order under a per-event lock. Calls for different
//! events may run concurrently; calls for the same event id are serialized by
//! the lock. Failures never escape: each one is logged and downgraded to a
//! conservative result.

use futures::FutureExt;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use swarmgate_core::{
    BarrierConfig, BehaviorRegistry, BotEventResponse, BotParticipant, BotResponse, EventBehavior,
    InterceptionMode, InterceptionResult, InterceptorConfig, Progression, ServiceEvent,
    SwarmState,
};
use swarmgate_guard::GuardEvaluator;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::active::{ActiveExecution, ActiveExecutions, StopSummary};
use crate::context::{BotDecisionContext, DefaultSwarmStateAccessor, SwarmStateAccessor};
use crate::decision::{DecisionMaker, DefaultDecisionMaker};
use crate::executor::ActionExecutor;
use crate::lock::{LockOptions, LockService};
use crate::pattern_index::PatternIndex;
use crate::priority::{priority_score, rank_candidates, RankedCandidate};
use crate::publisher::{aggregate_progression, aggregate_reasons};
use crate::resources::SwarmContextManager;
use crate::roles::subscription_patterns;
use crate::routine::{RoutineFactory, StepExecutor};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterceptorStats {
    pub registered_bots: usize,
    pub total_patterns: usize,
    pub pattern_distribution: BTreeMap<String, usize>,
    pub active_executions: usize,
}

/// Outcome of the decision phase for one candidate.
enum BotStep {
    /// Not participating; nothing is recorded.
    Skip,
    /// Record this response without running an action.
    Record(BotResponse),
    /// Run the bot's action, then record the result.
    Act(Box<BotDecisionContext>, BotResponse),
}

pub struct EventInterceptor {
    config: InterceptorConfig,
    behaviors: BehaviorRegistry,
    lock_service: Arc<dyn LockService>,
    decision_maker: Arc<dyn DecisionMaker>,
    accessor: Arc<dyn SwarmStateAccessor>,
    guard: GuardEvaluator,
    executor: ActionExecutor,
    active: ActiveExecutions,
    bots: RwLock<HashMap<String, BotParticipant>>,
    index: RwLock<PatternIndex>,
}

impl EventInterceptor {
    pub fn new(
        config: InterceptorConfig,
        lock_service: Arc<dyn LockService>,
        context_manager: Arc<dyn SwarmContextManager>,
        routine_factory: Arc<dyn RoutineFactory>,
        step_executor: Arc<dyn StepExecutor>,
    ) -> Self {
        let active = ActiveExecutions::new();
        let executor = ActionExecutor::new(
            context_manager,
            routine_factory,
            step_executor,
            active.clone(),
            config.default_limits,
        );
        Self {
            behaviors: BehaviorRegistry::with_overrides(&config.behaviors),
            decision_maker: Arc::new(DefaultDecisionMaker::new(
                config.guard.clone(),
                config.min_priority,
            )),
            accessor: Arc::new(DefaultSwarmStateAccessor),
            guard: GuardEvaluator::new(config.guard.clone()),
            lock_service,
            executor,
            active,
            bots: RwLock::new(HashMap::new()),
            index: RwLock::new(PatternIndex::new()),
            config,
        }
    }

    pub fn with_decision_maker(mut self, decision_maker: Arc<dyn DecisionMaker>) -> Self {
        self.decision_maker = decision_maker;
        self
    }

    pub fn with_accessor(mut self, accessor: Arc<dyn SwarmStateAccessor>) -> Self {
        self.accessor = accessor;
        self
    }

    pub fn with_behavior_registry(mut self, behaviors: BehaviorRegistry) -> Self {
        self.behaviors = behaviors;
        self
    }

    pub fn config(&self) -> &InterceptorConfig {
        &self.config
    }

    // -- Registration -------------------------------------------------------

    /// Register (or re-register) a bot. Returns how many patterns it was
    /// indexed under.
    pub fn register_bot(&self, bot: BotParticipant) -> usize {
        let patterns = subscription_patterns(&bot, &self.config.role_defaults);
        let indexed = self
            .index
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .register(&bot.id, &patterns);

        info!(
            bot_id = %bot.id,
            role = %bot.role.as_str(),
            behaviors = bot.behaviors().len(),
            patterns = indexed,
            "Bot registered"
        );
        if indexed == 0 {
            warn!(bot_id = %bot.id, "Bot has no subscriptions and will never be matched");
        }

        self.bots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(bot.id.clone(), bot);
        indexed
    }

    /// Remove a bot from the registry and the pattern index. Unknown ids are
    /// a no-op. Returns whether the bot was registered.
    pub fn unregister_bot(&self, bot_id: &str) -> bool {
        self.index
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .unregister(bot_id);
        let removed = self
            .bots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(bot_id)
            .is_some();

        if removed {
            info!(bot_id = %bot_id, "Bot unregistered");
        } else {
            info!(bot_id = %bot_id, "Unregister requested for unknown bot");
        }
        removed
    }

    pub fn registered_bots(&self) -> Vec<BotParticipant> {
        let bots = self.bots.read().unwrap_or_else(PoisonError::into_inner);
        let mut list: Vec<BotParticipant> = bots.values().cloned().collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        list
    }

    /// Registered bots matching `topic`, highest priority first.
    pub fn candidates_for(&self, topic: &str) -> Vec<RankedCandidate> {
        let matches = self
            .index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .match_topic(topic);
        let bots = self.bots.read().unwrap_or_else(PoisonError::into_inner);

        let candidates = matches
            .into_iter()
            .filter_map(|m| {
                let bot = bots.get(&m.bot_id)?;
                Some(RankedCandidate {
                    score: priority_score(&bot.role, m.kind, &self.config.priority),
                    bot: bot.clone(),
                    matched_pattern: m.pattern,
                    exact: m.kind.is_exact(),
                })
            })
            .collect();
        rank_candidates(candidates)
    }

    // -- Interception -------------------------------------------------------

    pub async fn check_interception(
        &self,
        event: &ServiceEvent,
        swarm_state: &SwarmState,
    ) -> InterceptionResult {
        if let Some(decision) = event.final_decision() {
            debug!(event_id = %event.id, decision = %decision, "Event already decided");
            return InterceptionResult {
                intercepted: true,
                progression: decision.clone(),
                responses: event
                    .progression
                    .as_ref()
                    .map(|p| p.processed_by.clone())
                    .unwrap_or_default(),
                reason: None,
            };
        }

        let Some(behavior) = self
            .behaviors
            .lookup(&event.event_type)
            .filter(|b| b.interceptable)
            .cloned()
        else {
            debug!(event_id = %event.id, event_type = %event.event_type, "Event type is not interceptable");
            return InterceptionResult::not_intercepted();
        };

        let options = LockOptions {
            timeout: self.config.lock_timeout(),
        };
        let mut lock = match self.lock_service.acquire(&event.lock_key(), options).await {
            Ok(lock) => lock,
            Err(e) => {
                error!(event_id = %event.id, error = %e, "Failed to acquire event lock");
                return self.fallback_result();
            }
        };

        let outcome = AssertUnwindSafe(self.intercept_locked(event, swarm_state, &behavior))
            .catch_unwind()
            .await;

        if let Err(e) = lock.release().await {
            error!(key = %lock.key(), error = %e, "Failed to release event lock");
        }

        match outcome {
            Ok(result) => {
                info!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    intercepted = result.intercepted,
                    progression = %result.progression,
                    responses = result.responses.len(),
                    "Interception complete"
                );
                result
            }
            Err(_) => {
                error!(event_id = %event.id, "Interception panicked");
                self.fallback_result()
            }
        }
    }

    /// Result used when interception could not run at all.
    fn fallback_result(&self) -> InterceptionResult {
        if self.config.fail_closed_on_lock_error {
            InterceptionResult::not_intercepted_with(Progression::Block)
        } else {
            InterceptionResult::not_intercepted()
        }
    }

    async fn intercept_locked(
        &self,
        event: &ServiceEvent,
        swarm_state: &SwarmState,
        behavior: &EventBehavior,
    ) -> InterceptionResult {
        let candidates = self.candidates_for(&event.event_type);
        if candidates.is_empty() {
            debug!(event_id = %event.id, event_type = %event.event_type, "No bots match event");
            return InterceptionResult::not_intercepted();
        }

        let barrier = behavior.barrier_config.clone().unwrap_or_default();
        let deadline = barrier
            .timeout_ms
            .map(|ms| Instant::now() + Duration::from_millis(ms));

        let (responses, timed_out) = self
            .run_candidates(event, swarm_state, &candidates, &barrier, deadline)
            .await;

        let progression = if behavior.mode == InterceptionMode::Passive {
            Progression::Continue
        } else if timed_out {
            let progression = barrier.timeout_progression();
            warn!(
                event_id = %event.id,
                responses = responses.len(),
                progression = %progression,
                "Barrier deadline reached"
            );
            progression
        } else {
            aggregate_progression(&responses)
        };
        let reason = aggregate_reasons(&responses);

        InterceptionResult {
            intercepted: !responses.is_empty(),
            progression,
            responses,
            reason: (!reason.is_empty()).then_some(reason),
        }
    }

    /// The per-bot loop. Returns the recorded responses and whether the
    /// deadline cut the loop short.
    async fn run_candidates(
        &self,
        event: &ServiceEvent,
        swarm_state: &SwarmState,
        candidates: &[RankedCandidate],
        barrier: &BarrierConfig,
        deadline: Option<Instant>,
    ) -> (Vec<BotEventResponse>, bool) {
        let mut responses: Vec<BotEventResponse> = Vec::new();

        for candidate in candidates {
            let bot_id = candidate.bot.id.as_str();

            let step = match deadline {
                Some(deadline) if Instant::now() >= deadline => return (responses, true),
                Some(deadline) => {
                    let decide = self.decide_for(event, swarm_state, candidate);
                    match tokio::time::timeout_at(deadline, decide).await {
                        Ok(step) => step,
                        Err(_) => {
                            debug!(event_id = %event.id, bot_id = %bot_id, "Deadline hit while deciding");
                            return (responses, true);
                        }
                    }
                }
                None => self.decide_for(event, swarm_state, candidate).await,
            };

            let response = match step {
                BotStep::Skip => continue,
                BotStep::Record(response) => response,
                BotStep::Act(context, decided) => self.run_action(&context, decided).await,
            };

            let block_stop = barrier.block_on_first && response.progression.is_block();
            let exclusive_stop = response.exclusive;
            responses.push(BotEventResponse::new(bot_id, response));
            let quorum_stop = barrier
                .quorum
                .is_some_and(|quorum| quorum > 0 && responses.len() >= quorum);

            if block_stop || exclusive_stop || quorum_stop {
                debug!(
                    event_id = %event.id,
                    bot_id = %bot_id,
                    block_on_first = block_stop,
                    exclusive = exclusive_stop,
                    quorum = quorum_stop,
                    "Stopping bot evaluation early"
                );
                break;
            }
        }

        (responses, false)
    }

    /// Context, guard and decision for one candidate.
    async fn decide_for(
        &self,
        event: &ServiceEvent,
        swarm_state: &SwarmState,
        candidate: &RankedCandidate,
    ) -> BotStep {
        let bot = &candidate.bot;
        let context = match self.accessor.build_trigger_context(
            event,
            bot,
            swarm_state,
            &candidate.matched_pattern,
            candidate.score,
        ) {
            Ok(context) => context,
            Err(e) => {
                warn!(bot_id = %bot.id, event_id = %event.id, error = %e, "Failed to build trigger context, skipping bot");
                return BotStep::Skip;
            }
        };

        let when = context
            .behavior
            .as_ref()
            .and_then(|b| b.trigger.when.as_deref())
            .filter(|w| !w.trim().is_empty());
        if let Some(when) = when {
            match self.guard.evaluate(when, &context.guard_variables()) {
                Ok(true) => {}
                Ok(false) => {
                    debug!(bot_id = %bot.id, when = %when, "Trigger guard not satisfied");
                    return BotStep::Skip;
                }
                Err(e) => {
                    warn!(bot_id = %bot.id, when = %when, error = %e, "Trigger guard failed, skipping bot");
                    return BotStep::Skip;
                }
            }
        }

        match self.decision_maker.decide(&context).await {
            Ok(decision) if decision.should_handle => {
                BotStep::Act(Box::new(context), decision.response)
            }
            Ok(decision) => {
                debug!(bot_id = %bot.id, reason = %decision.response.reason, "Bot declined event");
                BotStep::Skip
            }
            Err(e) => {
                error!(bot_id = %bot.id, event_id = %event.id, error = %e, "Decision failed");
                BotStep::Record(BotResponse::block(format!("decision error: {}", e)))
            }
        }
    }

    async fn run_action(&self, context: &BotDecisionContext, decided: BotResponse) -> BotResponse {
        let Some(behavior) = context.behavior.as_ref() else {
            return decided;
        };
        match self.executor.execute(&behavior.action, context, decided).await {
            Ok(response) => response,
            Err(e) => {
                error!(
                    bot_id = %context.bot.id,
                    event_id = %context.event.id,
                    action = behavior.action.kind(),
                    error = %e,
                    "Action execution failed"
                );
                BotResponse::block(e.to_string())
            }
        }
    }

    // -- Introspection ------------------------------------------------------

    pub async fn get_stats(&self) -> InterceptorStats {
        let registered_bots = self
            .bots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        let patterns = self
            .index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .stats();
        InterceptorStats {
            registered_bots,
            total_patterns: patterns.total_patterns,
            pattern_distribution: patterns.distribution,
            active_executions: self.active.len().await,
        }
    }

    /// Snapshot of running routine executions keyed by execution id.
    pub async fn get_active_executions(&self) -> HashMap<String, ActiveExecution> {
        self.active.snapshot().await
    }

    pub async fn stop_all_active_executions(&self) -> StopSummary {
        self.active.stop_all().await
    }
}
