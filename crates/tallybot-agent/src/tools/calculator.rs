//! Calculator tool — evaluates arithmetic expressions.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::debug;

use tallybot_core::types::{ParamType, ParameterSpec};

use super::arith;
use super::base::{require_string, Tool};

/// Largest magnitude at which every integer is exactly representable in f64.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Evaluates a restricted arithmetic expression and returns `{"result": n}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Performs basic mathematical calculations (addition, subtraction, multiplication, division). Must be used for all non-trivial math."
    }

    fn parameters(&self) -> BTreeMap<String, ParameterSpec> {
        BTreeMap::from([(
            "expression".to_string(),
            ParameterSpec::required(
                ParamType::String,
                "The mathematical expression to evaluate (e.g., \"2+2\", \"10*5\").",
            ),
        )])
    }

    async fn execute(&self, args: &Map<String, Value>) -> anyhow::Result<Value> {
        let expression = require_string(args, "expression")?;
        let value = arith::evaluate(expression)?;
        debug!(expression, value, "Calculator evaluated expression");
        Ok(json!({ "result": number_value(value) }))
    }
}

/// Integral values that fit exactly are emitted as JSON integers.
fn number_value(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < MAX_SAFE_INTEGER {
        json!(value as i64)
    } else {
        json!(value)
    }
}
