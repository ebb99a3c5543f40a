pub mod active;
pub mod context;
pub mod decision;
pub mod executor;
pub mod interceptor;
pub mod lock;
pub mod pattern_index;
pub mod priority;
pub mod publisher;
pub mod resources;
pub mod roles;
pub mod routine;

#[cfg(test)]
mod testing;

pub use active::{ActiveExecution, ActiveExecutions, ExecutionSummary, StopSummary};
pub use context::{BotDecisionContext, DefaultSwarmStateAccessor, SwarmStateAccessor};
pub use decision::{Decision, DecisionMaker, DefaultDecisionMaker};
pub use executor::ActionExecutor;
pub use interceptor::{EventInterceptor, InterceptorStats};
pub use lock::{InMemoryLockService, Lock, LockOptions, LockService};
pub use pattern_index::{PatternIndex, PatternMatch, PatternStats};
pub use priority::RankedCandidate;
pub use publisher::{aggregate_progression, aggregate_reasons};
pub use resources::{
    ConsumerType, InMemoryContextManager, ResourceAllocation, ResourceRequest, SwarmContextManager,
};
pub use routine::{
    RoutineFactory, RoutineHandle, RoutineSpec, RoutineState, RoutineStateMachine, StepExecutor,
    StepOutput, StopResult,
};
