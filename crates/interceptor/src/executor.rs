//! Runs the action a bot chose for an event.
//!
//! `routine` actions reserve resources for the event's conversation, start a
//! routine through the injected factory and track it in the active-execution
//! registry until it finishes. `invoke` actions run a single step and report
//! its text output as the response reason.

use chrono::Utc;
use futures::FutureExt;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use swarmgate_core::{
    extract_chat_id, Action, BotResponse, Error, ResourceLimits, Result, ServiceEvent,
};
use tracing::{debug, error, warn};

use crate::active::{ActiveExecution, ActiveExecutions};
use crate::context::BotDecisionContext;
use crate::resources::{ConsumerType, ResourceAllocation, ResourceRequest, SwarmContextManager};
use crate::routine::{RoutineFactory, RoutineSpec, StepExecutor};

pub struct ActionExecutor {
    resources: Arc<dyn SwarmContextManager>,
    routines: Arc<dyn RoutineFactory>,
    steps: Arc<dyn StepExecutor>,
    active: ActiveExecutions,
    default_limits: ResourceLimits,
}

impl ActionExecutor {
    pub fn new(
        resources: Arc<dyn SwarmContextManager>,
        routines: Arc<dyn RoutineFactory>,
        steps: Arc<dyn StepExecutor>,
        active: ActiveExecutions,
        default_limits: ResourceLimits,
    ) -> Self {
        Self {
            resources,
            routines,
            steps,
            active,
            default_limits,
        }
    }

    /// Execute `action` on behalf of the context's bot. `decided` is the
    /// response from the decision phase; it is returned (possibly with a new
    /// reason) when the action succeeds.
    pub async fn execute(
        &self,
        action: &Action,
        context: &BotDecisionContext,
        decided: BotResponse,
    ) -> Result<BotResponse> {
        match action {
            Action::Routine {
                routine_id,
                inputs,
                limits,
            } => {
                self.run_routine(routine_id.as_deref(), inputs, limits.as_ref(), context, decided)
                    .await
            }
            Action::Invoke { purpose } => self.invoke(purpose.as_deref(), context, decided).await,
        }
    }

    async fn run_routine(
        &self,
        routine_id: Option<&str>,
        inputs: &Value,
        limits: Option<&ResourceLimits>,
        context: &BotDecisionContext,
        decided: BotResponse,
    ) -> Result<BotResponse> {
        let Some(routine_id) = routine_id.filter(|id| !id.is_empty()) else {
            error!(bot_id = %context.bot.id, event_id = %context.event.id, "Routine action without routineId");
            return Ok(BotResponse::block("missing routineId"));
        };

        let chat_id = chat_id_for(&context.event);
        let limits = limits.copied().unwrap_or(self.default_limits);
        let allocation = self
            .resources
            .allocate_resources(
                &chat_id,
                ResourceRequest {
                    consumer_type: ConsumerType::Run,
                    limits,
                },
            )
            .await?;

        let execution_id = uuid::Uuid::new_v4().to_string();
        let lease = RoutineLease {
            resources: self.resources.clone(),
            active: self.active.clone(),
            allocation_id: allocation.id.clone(),
            execution_id: execution_id.clone(),
            finished: false,
        };

        let started = self.start_routine(&execution_id, routine_id, inputs, &allocation, context);
        let outcome = match AssertUnwindSafe(started).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(_) => {
                error!(bot_id = %context.bot.id, routine_id = %routine_id, "Routine panicked");
                Err(Error::ActionExecution(format!(
                    "routine '{}' panicked",
                    routine_id
                )))
            }
        };
        lease.finish().await;

        outcome.map(|()| {
            debug!(bot_id = %context.bot.id, routine_id = %routine_id, "Routine finished");
            decided
        })
    }

    async fn start_routine(
        &self,
        execution_id: &str,
        routine_id: &str,
        inputs: &Value,
        allocation: &ResourceAllocation,
        context: &BotDecisionContext,
    ) -> Result<()> {
        let spec = RoutineSpec {
            execution_id: execution_id.to_string(),
            routine_id: routine_id.to_string(),
            bot_id: context.bot.id.clone(),
            event: context.event.clone(),
            inputs: inputs.clone(),
            allocation_id: allocation.id.clone(),
            limits: allocation.limits,
        };
        let handle = self.routines.create(spec).await?;

        self.active
            .insert(ActiveExecution {
                id: execution_id.to_string(),
                bot_id: context.bot.id.clone(),
                event_id: context.event.id.clone(),
                routine_id: routine_id.to_string(),
                action_kind: "routine",
                started_at: Utc::now(),
                handle: handle.clone(),
            })
            .await;

        handle.start().await
    }

    async fn invoke(
        &self,
        purpose: Option<&str>,
        context: &BotDecisionContext,
        decided: BotResponse,
    ) -> Result<BotResponse> {
        let Some(purpose) = purpose.filter(|p| !p.trim().is_empty()) else {
            error!(bot_id = %context.bot.id, event_id = %context.event.id, "Invoke action without purpose");
            return Ok(BotResponse::block("missing purpose"));
        };

        let output = self.steps.execute_llm_step(purpose, context).await?;
        Ok(BotResponse {
            reason: output.response,
            ..decided
        })
    }
}

/// Allocation and registry entry owned by one routine execution.
///
/// `finish` releases both. A lease dropped unfinished (the caller stopped
/// polling mid-routine) hands the same cleanup to the current runtime.
struct RoutineLease {
    resources: Arc<dyn SwarmContextManager>,
    active: ActiveExecutions,
    allocation_id: String,
    execution_id: String,
    finished: bool,
}

impl RoutineLease {
    async fn finish(mut self) {
        release_execution(
            self.resources.as_ref(),
            &self.active,
            &self.allocation_id,
            &self.execution_id,
        )
        .await;
        self.finished = true;
    }
}

impl Drop for RoutineLease {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let resources = self.resources.clone();
        let active = self.active.clone();
        let allocation_id = std::mem::take(&mut self.allocation_id);
        let execution_id = std::mem::take(&mut self.execution_id);

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                warn!(allocation_id = %allocation_id, execution_id = %execution_id, "Routine abandoned, releasing in background");
                runtime.spawn(async move {
                    release_execution(resources.as_ref(), &active, &allocation_id, &execution_id)
                        .await;
                });
            }
            Err(_) => {
                error!(allocation_id = %allocation_id, "Routine abandoned outside a runtime, allocation not released");
            }
        }
    }
}

async fn release_execution(
    resources: &dyn SwarmContextManager,
    active: &ActiveExecutions,
    allocation_id: &str,
    execution_id: &str,
) {
    if let Err(e) = resources.release_resources(allocation_id).await {
        error!(allocation_id = %allocation_id, error = %e, "Failed to release resources");
    }
    active.remove(execution_id).await;
}

/// The conversation an event belongs to. Events without one are scoped to
/// themselves.
fn chat_id_for(event: &ServiceEvent) -> String {
    extract_chat_id(event).unwrap_or_else(|| {
        warn!(event_id = %event.id, "Event carries no chat id, scoping resources to the event");
        event.id.clone()
    })
}
