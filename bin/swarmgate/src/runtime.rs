//! In-process collaborators for running the interceptor from the command
//! line: routines and steps are logged instead of executed.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use swarmgate_core::bot::load_bots;
use swarmgate_core::{Error, InterceptorConfig, Paths, Result};
use swarmgate_interceptor::{
    BotDecisionContext, EventInterceptor, InMemoryContextManager, InMemoryLockService,
    RoutineFactory, RoutineHandle, RoutineSpec, RoutineState, RoutineStateMachine, StepExecutor,
    StepOutput, StopResult,
};
use tracing::info;

pub struct LoggingRoutineFactory;

#[async_trait]
impl RoutineFactory for LoggingRoutineFactory {
    async fn create(&self, spec: RoutineSpec) -> Result<Arc<dyn RoutineHandle>> {
        Ok(Arc::new(LoggedRoutine {
            spec,
            state: Arc::new(Mutex::new(RoutineState::Pending)),
        }))
    }
}

struct LoggedRoutine {
    spec: RoutineSpec,
    state: Arc<Mutex<RoutineState>>,
}

impl LoggedRoutine {
    fn set_state(&self, state: RoutineState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }
}

#[async_trait]
impl RoutineHandle for LoggedRoutine {
    async fn start(&self) -> Result<()> {
        self.set_state(RoutineState::Running);
        info!(
            execution_id = %self.spec.execution_id,
            routine_id = %self.spec.routine_id,
            bot_id = %self.spec.bot_id,
            max_credits = self.spec.limits.max_credits,
            "Routine started (dry run)"
        );
        self.set_state(RoutineState::Completed);
        Ok(())
    }

    async fn stop(&self) -> StopResult {
        self.set_state(RoutineState::Stopped);
        StopResult {
            success: true,
            message: "stopped".to_string(),
        }
    }

    fn state(&self) -> RoutineState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state_machine(&self) -> Option<Arc<dyn RoutineStateMachine>> {
        None
    }
}

/// Reports the step it would have run.
pub struct DryRunStepExecutor;

#[async_trait]
impl StepExecutor for DryRunStepExecutor {
    async fn execute_llm_step(
        &self,
        purpose: &str,
        context: &BotDecisionContext,
    ) -> Result<StepOutput> {
        info!(bot_id = %context.bot.id, purpose = %purpose, "Step requested (dry run)");
        Ok(StepOutput {
            response: format!("dry run: {}", purpose),
        })
    }
}

/// Build an interceptor from the user's config with every bot in
/// `bots_file` (or the default bots file) registered.
pub fn build_interceptor(bots_file: Option<PathBuf>) -> anyhow::Result<EventInterceptor> {
    let paths = Paths::new();
    let config = InterceptorConfig::load_or_default(&paths)?;
    let bots_file = bots_file.unwrap_or_else(|| paths.bots_file());
    let bots = match load_bots(&bots_file) {
        Ok(bots) => bots,
        Err(Error::NotFound(_)) => anyhow::bail!(
            "no bot definitions at {} (pass --bots FILE)",
            bots_file.display()
        ),
        Err(e) => anyhow::bail!("failed to load bots from {}: {}", bots_file.display(), e),
    };

    let interceptor = EventInterceptor::new(
        config,
        Arc::new(InMemoryLockService::new()),
        Arc::new(InMemoryContextManager::default()),
        Arc::new(LoggingRoutineFactory),
        Arc::new(DryRunStepExecutor),
    );
    for bot in bots {
        interceptor.register_bot(bot);
    }
    Ok(interceptor)
}

/// Read a JSON or YAML document, chosen by extension.
pub fn read_document<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {}", path.display(), e))?;
    let value = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
        _ => serde_json::from_str(&content)?,
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use swarmgate_core::ServiceEvent;

    #[test]
    fn test_read_document_yaml_and_json() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = dir.path().join("event.yaml");
        std::fs::write(&yaml, "id: e1\ntype: chat/message\ndata:\n  chatId: c1\n").unwrap();
        let event: ServiceEvent = read_document(&yaml).unwrap();
        assert_eq!(event.event_type, "chat/message");

        let json = dir.path().join("event.json");
        std::fs::write(&json, r#"{"id": "e2", "type": "webhook/github"}"#).unwrap();
        let event: ServiceEvent = read_document(&json).unwrap();
        assert_eq!(event.id, "e2");
    }

    #[test]
    fn test_missing_bots_file_names_the_flag() {
        let dir = tempfile::tempdir().unwrap();
        let err = build_interceptor(Some(dir.path().join("absent.json"))).err().unwrap();
        assert!(err.to_string().contains("pass --bots FILE"));
    }

    #[tokio::test]
    async fn test_logged_routine_completes() {
        let spec = RoutineSpec {
            execution_id: "x1".to_string(),
            routine_id: "r1".to_string(),
            bot_id: "b1".to_string(),
            event: ServiceEvent::new("chat/message", serde_json::Value::Null),
            inputs: serde_json::Value::Null,
            allocation_id: "a1".to_string(),
            limits: Default::default(),
        };
        let handle = LoggingRoutineFactory.create(spec).await.unwrap();
        assert_eq!(handle.state(), RoutineState::Pending);
        handle.start().await.unwrap();
        assert_eq!(handle.state(), RoutineState::Completed);
    }
}
