use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::routine::{RoutineHandle, RoutineState};

/// A routine started by a bot and not yet finished.
#[derive(Clone)]
pub struct ActiveExecution {
    pub id: String,
    pub bot_id: String,
    pub event_id: String,
    pub routine_id: String,
    pub action_kind: &'static str,
    pub started_at: DateTime<Utc>,
    pub handle: Arc<dyn RoutineHandle>,
}

impl std::fmt::Debug for ActiveExecution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveExecution")
            .field("id", &self.id)
            .field("bot_id", &self.bot_id)
            .field("event_id", &self.event_id)
            .field("routine_id", &self.routine_id)
            .field("action_kind", &self.action_kind)
            .field("started_at", &self.started_at)
            .field("state", &self.handle.state())
            .finish()
    }
}

/// Serializable view of an [`ActiveExecution`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSummary {
    pub id: String,
    pub bot_id: String,
    pub event_id: String,
    pub routine_id: String,
    pub action_kind: String,
    pub started_at: DateTime<Utc>,
    pub state: RoutineState,
}

impl From<&ActiveExecution> for ExecutionSummary {
    fn from(execution: &ActiveExecution) -> Self {
        Self {
            id: execution.id.clone(),
            bot_id: execution.bot_id.clone(),
            event_id: execution.event_id.clone(),
            routine_id: execution.routine_id.clone(),
            action_kind: execution.action_kind.to_string(),
            started_at: execution.started_at,
            state: execution.handle.state(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StopSummary {
    pub stopped: usize,
    pub failed: usize,
}

/// Registry of running routine executions, keyed by execution id.
#[derive(Clone, Default)]
pub struct ActiveExecutions {
    executions: Arc<Mutex<HashMap<String, ActiveExecution>>>,
}

impl ActiveExecutions {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, execution: ActiveExecution) {
        let mut executions = self.executions.lock().await;
        debug!(execution_id = %execution.id, bot_id = %execution.bot_id, "Tracking execution");
        executions.insert(execution.id.clone(), execution);
    }

    pub async fn remove(&self, execution_id: &str) -> Option<ActiveExecution> {
        let mut executions = self.executions.lock().await;
        executions.remove(execution_id)
    }

    pub async fn len(&self) -> usize {
        self.executions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.executions.lock().await.is_empty()
    }

    /// Point-in-time copy of the registry.
    pub async fn snapshot(&self) -> HashMap<String, ActiveExecution> {
        self.executions.lock().await.clone()
    }

    /// Stop every tracked execution, preferring the state machine's `stop`
    /// over the handle's. Failures are logged and counted. The registry is
    /// drained before any stop runs, so executions tracked while stopping
    /// stay registered.
    pub async fn stop_all(&self) -> StopSummary {
        let executions = std::mem::take(&mut *self.executions.lock().await);
        let mut summary = StopSummary::default();

        for (id, execution) in &executions {
            let outcome = match execution.handle.state_machine() {
                Some(machine) => machine.stop().await.map_err(|e| e.to_string()),
                None => {
                    let result = execution.handle.stop().await;
                    if result.success {
                        Ok(())
                    } else {
                        Err(result.message)
                    }
                }
            };
            match outcome {
                Ok(()) => summary.stopped += 1,
                Err(e) => {
                    error!(execution_id = %id, bot_id = %execution.bot_id, error = %e, "Failed to stop execution");
                    summary.failed += 1;
                }
            }
        }

        info!(stopped = summary.stopped, failed = summary.failed, "Stopped active executions");
        summary
    }
}
