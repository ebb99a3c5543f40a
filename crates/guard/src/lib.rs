//! Sandboxed evaluation of `when` guards and `condition` expressions.
//!
//! Expressions are compiled as single rhai expressions (no statements, no
//! assignment, no function definitions) against a scope of read-only
//! constants, with operation and nesting limits from [`GuardConfig`].
//!
//! [`GuardConfig`]: swarmgate_core::GuardConfig

pub mod convert;
pub mod engine;

pub use convert::json_to_dynamic;
pub use engine::GuardEvaluator;
