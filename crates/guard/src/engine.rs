use rhai::{Dynamic, Engine, EvalAltResult, Scope};
use serde_json::{Map, Value};
use std::time::Instant;
use swarmgate_core::{Error, GuardConfig, Result};
use tracing::{debug, warn};

use crate::convert::json_to_dynamic;

/// Symbols that must never be reachable from a guard.
const DISABLED_SYMBOLS: &[&str] = &["eval", "import", "export", "print", "debug"];

/// Evaluates boolean guard expressions such as
/// `event.data.priority > 3 && bot.role == "coordinator"`.
#[derive(Debug, Clone)]
pub struct GuardEvaluator {
    config: GuardConfig,
}

impl GuardEvaluator {
    pub fn new(config: GuardConfig) -> Self {
        Self { config }
    }

    fn create_engine(&self) -> Engine {
        let mut engine = Engine::new();

        engine.set_max_string_size(self.config.max_string_size);
        engine.set_max_array_size(self.config.max_array_size);
        engine.set_max_map_size(self.config.max_map_size);
        engine.set_max_call_levels(8);
        engine.set_max_expr_depths(self.config.max_expr_depth, self.config.max_expr_depth);
        engine.set_strict_variables(true);
        for symbol in DISABLED_SYMBOLS {
            engine.disable_symbol(*symbol);
        }

        let max_ops = self.config.max_operations;
        engine.on_progress(move |ops| {
            if ops > max_ops {
                Some(Dynamic::from(format!(
                    "Operation limit exceeded: {} operations",
                    max_ops
                )))
            } else {
                None
            }
        });

        engine
    }

    /// Evaluate `expr` with every entry of `variables` bound as a constant.
    /// Anything other than a boolean result is an error.
    pub fn evaluate(&self, expr: &str, variables: &Map<String, Value>) -> Result<bool> {
        let start_time = Instant::now();
        let engine = self.create_engine();

        let mut scope = Scope::new();
        for (name, value) in variables {
            scope.push_constant_dynamic(name.as_str(), json_to_dynamic(value, &self.config)?);
        }

        let ast = engine
            .compile_expression_with_scope(&scope, expr)
            .map_err(|e| Error::Guard(format!("Expression compilation error in '{}': {}", expr, e)))?;

        let result = engine.eval_ast_with_scope::<Dynamic>(&mut scope, &ast);

        debug!(
            expr = %expr,
            elapsed_us = start_time.elapsed().as_micros() as u64,
            "Guard expression evaluated"
        );

        match result {
            Ok(value) => value.as_bool().map_err(|type_name| {
                Error::Guard(format!(
                    "Expression '{}' returned {} instead of bool",
                    expr, type_name
                ))
            }),
            Err(e) => {
                if let EvalAltResult::ErrorTerminated(ref reason, _) = *e {
                    warn!(expr = %expr, reason = %reason, "Guard expression terminated");
                    return Err(Error::Guard(format!("Expression terminated: {}", reason)));
                }
                Err(Error::Guard(format!("Runtime error in '{}': {}", expr, e)))
            }
        }
    }
}

impl Default for GuardEvaluator {
    fn default() -> Self {
        Self::new(GuardConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn context() -> Map<String, Value> {
        vars(json!({
            "event": {"id": "e1", "type": "chat/message", "data": {"priority": 5, "text": "deploy now"}},
            "bot": {"id": "b1", "role": "coordinator"},
            "swarm": {"phase": "planning"},
            "priority": 120
        }))
    }

    #[test]
    fn test_field_access_and_comparison() {
        let guard = GuardEvaluator::default();
        assert!(guard.evaluate("event.data.priority > 3", &context()).unwrap());
        assert!(!guard.evaluate("event.data.priority > 9", &context()).unwrap());
    }

    #[test]
    fn test_boolean_logic() {
        let guard = GuardEvaluator::default();
        let ctx = context();
        assert!(guard
            .evaluate(r#"bot.role == "coordinator" && swarm.phase == "planning""#, &ctx)
            .unwrap());
        assert!(guard
            .evaluate(r#"!(event.id == "e1") || priority >= 100"#, &ctx)
            .unwrap());
    }

    #[test]
    fn test_string_contains() {
        let guard = GuardEvaluator::default();
        assert!(guard
            .evaluate(r#"event.data.text.contains("deploy")"#, &context())
            .unwrap());
    }

    #[test]
    fn test_non_bool_result_is_error() {
        let guard = GuardEvaluator::default();
        let err = guard.evaluate("event.data.priority + 1", &context()).unwrap_err();
        assert!(err.to_string().contains("instead of bool"));
    }

    #[test]
    fn test_unknown_variable_rejected() {
        let guard = GuardEvaluator::default();
        assert!(guard.evaluate("secret > 1", &context()).is_err());
    }

    #[test]
    fn test_statements_rejected() {
        let guard = GuardEvaluator::default();
        assert!(guard.evaluate("let x = 1; x == 1", &context()).is_err());
        assert!(guard.evaluate(r#"eval("true")"#, &context()).is_err());
    }

    #[test]
    fn test_constants_are_read_only() {
        let guard = GuardEvaluator::default();
        assert!(guard.evaluate("priority = 1", &context()).is_err());
    }

    #[test]
    fn test_oversized_context_rejected_before_evaluation() {
        let guard = GuardEvaluator::new(GuardConfig {
            max_string_size: 8,
            ..GuardConfig::default()
        });
        let err = guard.evaluate("priority > 1", &context()).unwrap_err();
        assert!(matches!(err, Error::Guard(_)));
        assert!(err.to_string().contains("string at $."));
    }

    #[test]
    fn test_syntax_error() {
        let guard = GuardEvaluator::default();
        let err = guard.evaluate("event.data.priority >", &context()).unwrap_err();
        assert!(matches!(err, Error::Guard(_)));
    }
}
