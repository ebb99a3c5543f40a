//! Hand-written collaborators for unit tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use swarmgate_core::{BotResponse, Error, Result};
use tokio::sync::Notify;

use crate::context::BotDecisionContext;
use crate::decision::{Decision, DecisionMaker};
use crate::lock::{InMemoryLockService, Lock, LockOptions, LockService};
use crate::resources::{ResourceAllocation, ResourceRequest, SwarmContextManager};
use crate::routine::{
    RoutineFactory, RoutineHandle, RoutineSpec, RoutineState, RoutineStateMachine, StepExecutor,
    StepOutput, StopResult,
};

// ---------------------------------------------------------------------------
// Locks
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingLockService {
    inner: InMemoryLockService,
    fail: bool,
    acquired: AtomicUsize,
    released: Arc<AtomicUsize>,
    keys: Mutex<Vec<String>>,
}

impl RecordingLockService {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn keys(&self) -> Vec<String> {
        self.keys.lock().unwrap().clone()
    }
}

#[async_trait]
impl LockService for RecordingLockService {
    async fn acquire(&self, key: &str, options: LockOptions) -> Result<Box<dyn Lock>> {
        self.acquired.fetch_add(1, Ordering::SeqCst);
        self.keys.lock().unwrap().push(key.to_string());
        if self.fail {
            return Err(Error::Lock("lock backend unavailable".to_string()));
        }
        let inner = self.inner.acquire(key, options).await?;
        Ok(Box::new(CountingLock {
            inner,
            released: self.released.clone(),
        }))
    }
}

struct CountingLock {
    inner: Box<dyn Lock>,
    released: Arc<AtomicUsize>,
}

#[async_trait]
impl Lock for CountingLock {
    fn key(&self) -> &str {
        self.inner.key()
    }

    async fn release(&mut self) -> Result<()> {
        self.released.fetch_add(1, Ordering::SeqCst);
        self.inner.release().await
    }
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

pub enum Script {
    Handle(BotResponse),
    Decline,
    Fail(String),
    Slow(Duration, BotResponse),
    Panic,
}

/// Answers per bot id from a script; unscripted bots handle with `continue`.
#[derive(Default)]
pub struct ScriptedDecisionMaker {
    scripts: HashMap<String, Script>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedDecisionMaker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, bot_id: &str, script: Script) -> Self {
        self.scripts.insert(bot_id.to_string(), script);
        self
    }

    /// Bot ids in the order they were asked.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DecisionMaker for ScriptedDecisionMaker {
    async fn decide(&self, context: &BotDecisionContext) -> Result<Decision> {
        let bot_id = context.bot.id.clone();
        self.calls.lock().unwrap().push(bot_id.clone());
        match self.scripts.get(&bot_id) {
            None => Ok(Decision::handle(BotResponse::proceed(format!("{} ok", bot_id)))),
            Some(Script::Handle(response)) => Ok(Decision::handle(response.clone())),
            Some(Script::Decline) => Ok(Decision::decline("not interested")),
            Some(Script::Fail(message)) => Err(Error::Decision(message.clone())),
            Some(Script::Slow(delay, response)) => {
                tokio::time::sleep(*delay).await;
                Ok(Decision::handle(response.clone()))
            }
            Some(Script::Panic) => panic!("scripted panic for {}", bot_id),
        }
    }
}

// ---------------------------------------------------------------------------
// Routines
// ---------------------------------------------------------------------------

/// Counts created routines. A gated factory's routines block in `start`
/// until the gate is notified or the routine is stopped.
#[derive(Default)]
pub struct CountingRoutineFactory {
    created: AtomicUsize,
    panic_on_create: bool,
    fail_start: bool,
    gate: Option<Arc<Notify>>,
    specs: Mutex<Vec<RoutineSpec>>,
}

impl CountingRoutineFactory {
    pub fn failing() -> Self {
        Self {
            fail_start: true,
            ..Self::default()
        }
    }

    pub fn panicking() -> Self {
        Self {
            panic_on_create: true,
            ..Self::default()
        }
    }

    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn specs(&self) -> Vec<RoutineSpec> {
        self.specs.lock().unwrap().clone()
    }
}

#[async_trait]
impl RoutineFactory for CountingRoutineFactory {
    async fn create(&self, spec: RoutineSpec) -> Result<Arc<dyn RoutineHandle>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        self.specs.lock().unwrap().push(spec.clone());
        if self.panic_on_create {
            panic!("routine '{}' could not be built", spec.routine_id);
        }
        Ok(Arc::new(TestRoutine {
            routine_id: spec.routine_id,
            fail: self.fail_start,
            gate: self.gate.clone(),
            state: Arc::new(Mutex::new(RoutineState::Pending)),
        }))
    }
}

struct TestRoutine {
    routine_id: String,
    fail: bool,
    gate: Option<Arc<Notify>>,
    state: Arc<Mutex<RoutineState>>,
}

#[async_trait]
impl RoutineHandle for TestRoutine {
    async fn start(&self) -> Result<()> {
        *self.state.lock().unwrap() = RoutineState::Running;
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.fail {
            *self.state.lock().unwrap() = RoutineState::Failed;
            return Err(Error::ActionExecution(format!(
                "routine '{}' failed",
                self.routine_id
            )));
        }
        let mut state = self.state.lock().unwrap();
        if *state == RoutineState::Running {
            *state = RoutineState::Completed;
        }
        Ok(())
    }

    async fn stop(&self) -> StopResult {
        *self.state.lock().unwrap() = RoutineState::Stopped;
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
        StopResult {
            success: true,
            message: "stopped".to_string(),
        }
    }

    fn state(&self) -> RoutineState {
        *self.state.lock().unwrap()
    }

    fn state_machine(&self) -> Option<Arc<dyn RoutineStateMachine>> {
        Some(Arc::new(TestStateMachine {
            state: self.state.clone(),
            gate: self.gate.clone(),
        }))
    }
}

struct TestStateMachine {
    state: Arc<Mutex<RoutineState>>,
    gate: Option<Arc<Notify>>,
}

#[async_trait]
impl RoutineStateMachine for TestStateMachine {
    async fn stop(&self) -> Result<()> {
        *self.state.lock().unwrap() = RoutineState::Stopped;
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Resources and steps
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingContextManager {
    requests: Mutex<Vec<(String, ResourceRequest)>>,
    released: AtomicUsize,
}

impl RecordingContextManager {
    pub fn requests(&self) -> Vec<(String, ResourceRequest)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SwarmContextManager for RecordingContextManager {
    async fn allocate_resources(
        &self,
        chat_id: &str,
        request: ResourceRequest,
    ) -> Result<ResourceAllocation> {
        self.requests
            .lock()
            .unwrap()
            .push((chat_id.to_string(), request.clone()));
        Ok(ResourceAllocation {
            id: uuid::Uuid::new_v4().to_string(),
            chat_id: chat_id.to_string(),
            consumer_type: request.consumer_type,
            limits: request.limits,
            allocated_at: chrono::Utc::now(),
        })
    }

    async fn release_resources(&self, _allocation_id: &str) -> Result<()> {
        self.released.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Replies with `"{purpose}: {event type}"`.
pub struct EchoStepExecutor;

#[async_trait]
impl StepExecutor for EchoStepExecutor {
    async fn execute_llm_step(
        &self,
        purpose: &str,
        context: &BotDecisionContext,
    ) -> Result<StepOutput> {
        Ok(StepOutput {
            response: format!("{}: {}", purpose, context.event.event_type),
        })
    }
}
