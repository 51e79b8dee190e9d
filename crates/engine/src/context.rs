//! The evaluation context: a flat symbol table keyed by component id.
//!
//! The definition's data dependencies are stringly-keyed (`variableId`,
//! `refer`, `subTotalRefer`, …), so evaluation runs over one mutable map.
//! Values are tagged rather than stringly-typed: numbers for quantities and
//! prices, text for replace/lookup chains, tier arrays for tiered pricing.

use serde_json::Value;
use std::collections::HashMap;

pub type EvalContext = HashMap<String, EvalValue>;

#[derive(Debug, Clone, PartialEq)]
pub enum EvalValue {
    Number(f64),
    Text(String),
    Tiers(Vec<PriceTier>),
}

/// One resolved pricing tier. `end < 0` means unbounded.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTier {
    pub start: f64,
    pub end: f64,
    pub price: f64,
}

impl EvalValue {
    pub fn as_number(&self) -> f64 {
        match self {
            EvalValue::Number(n) => *n,
            EvalValue::Text(t) => t.trim().parse::<f64>().unwrap_or(0.0),
            EvalValue::Tiers(_) => 0.0,
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            EvalValue::Number(n) => format_number(*n),
            EvalValue::Text(t) => t.clone(),
            EvalValue::Tiers(_) => String::new(),
        }
    }
}

/// Render a number the way the string-keyed conditions expect: integers
/// without a trailing `.0`.
pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// String form of a JSON literal for string-space comparison.
pub(crate) fn value_as_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n
            .as_f64()
            .map(format_number)
            .unwrap_or_else(|| n.to_string()),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Numeric form of a JSON literal; anything non-numeric is 0.
pub(crate) fn value_as_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

/// Resolve one math operand against the context.
///
/// Encodings: `{constant: N}`, `{variableId: id}`, `{refer: id}`,
/// `{value: v}`, or a bare literal. Anything else reads as 0.
pub(crate) fn resolve_operand(operand: &Value, ctx: &EvalContext) -> f64 {
    if let Some(object) = operand.as_object() {
        if let Some(constant) = object.get("constant") {
            return value_as_number(constant);
        }
        if let Some(id) = object
            .get("variableId")
            .or_else(|| object.get("refer"))
            .and_then(Value::as_str)
        {
            return ctx.get(id).map(EvalValue::as_number).unwrap_or(0.0);
        }
        if let Some(value) = object.get("value") {
            return value_as_number(value);
        }
        return 0.0;
    }
    value_as_number(operand)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_as_text_formats_integers_without_fraction() {
        assert_eq!(EvalValue::Number(30.0).as_text(), "30");
        assert_eq!(EvalValue::Number(0.5).as_text(), "0.5");
        assert_eq!(EvalValue::Text("s3Standard".into()).as_text(), "s3Standard");
    }

    #[test]
    fn test_resolve_operand_encodings() {
        let mut ctx = EvalContext::new();
        ctx.insert("qty".to_string(), EvalValue::Number(12.0));
        ctx.insert("name".to_string(), EvalValue::Text("7".to_string()));

        assert_eq!(resolve_operand(&json!({"constant": 4}), &ctx), 4.0);
        assert_eq!(resolve_operand(&json!({"constant": "2.5"}), &ctx), 2.5);
        assert_eq!(resolve_operand(&json!({"variableId": "qty"}), &ctx), 12.0);
        assert_eq!(resolve_operand(&json!({"refer": "qty"}), &ctx), 12.0);
        assert_eq!(resolve_operand(&json!({"refer": "name"}), &ctx), 7.0);
        assert_eq!(resolve_operand(&json!({"value": 9}), &ctx), 9.0);
        assert_eq!(resolve_operand(&json!(3.5), &ctx), 3.5);
        assert_eq!(resolve_operand(&json!({"variableId": "missing"}), &ctx), 0.0);
        assert_eq!(resolve_operand(&json!({"unknown": true}), &ctx), 0.0);
        assert_eq!(resolve_operand(&json!(null), &ctx), 0.0);
    }
}
