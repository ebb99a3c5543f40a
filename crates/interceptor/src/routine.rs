//! Contracts for the long-running routines and single-shot steps that bots
//! trigger. Implementations live outside this crate; the interceptor only
//! starts, tracks and stops them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use swarmgate_core::{ResourceLimits, Result, ServiceEvent};

use crate::context::BotDecisionContext;

/// Everything a factory needs to build one routine execution.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineSpec {
    pub execution_id: String,
    pub routine_id: String,
    pub bot_id: String,
    pub event: ServiceEvent,
    pub inputs: Value,
    pub allocation_id: String,
    pub limits: ResourceLimits,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutineState {
    Pending,
    Running,
    Completed,
    Failed,
    Stopped,
}

impl std::fmt::Display for RoutineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoutineState::Pending => write!(f, "pending"),
            RoutineState::Running => write!(f, "running"),
            RoutineState::Completed => write!(f, "completed"),
            RoutineState::Failed => write!(f, "failed"),
            RoutineState::Stopped => write!(f, "stopped"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopResult {
    pub success: bool,
    pub message: String,
}

/// The control plane behind a routine handle.
#[async_trait]
pub trait RoutineStateMachine: Send + Sync {
    async fn stop(&self) -> Result<()>;
}

#[async_trait]
pub trait RoutineHandle: Send + Sync {
    /// Runs the routine; resolves when it finishes.
    async fn start(&self) -> Result<()>;
    async fn stop(&self) -> StopResult;
    fn state(&self) -> RoutineState;
    fn state_machine(&self) -> Option<Arc<dyn RoutineStateMachine>>;
}

#[async_trait]
pub trait RoutineFactory: Send + Sync {
    async fn create(&self, spec: RoutineSpec) -> Result<Arc<dyn RoutineHandle>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutput {
    pub response: String,
}

/// Runs one model-backed step for an `invoke` action.
#[async_trait]
pub trait StepExecutor: Send + Sync {
    async fn execute_llm_step(
        &self,
        purpose: &str,
        context: &BotDecisionContext,
    ) -> Result<StepOutput>;
}
