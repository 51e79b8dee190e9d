//! `displayIf` conditions on cards and math operators.
//!
//! The shapes compose recursively; anything unrecognized is permissive so
//! that a definition newer than this code still evaluates.

use crate::context::{value_as_string, EvalContext, EvalValue};
use calc_model::PriceTables;
use serde_json::Value;

/// Whether a guard allows its component to take part in evaluation.
pub fn allows(condition: Option<&Value>, ctx: &EvalContext, tables: &PriceTables) -> bool {
    let Some(condition) = condition else {
        return true;
    };
    let Some(object) = condition.as_object() else {
        return true;
    };

    if let Some(exists) = object.get("exists") {
        return exists_allows(exists, tables);
    }
    if let Some(Value::Array(operands)) = object.get("and") {
        return operands.iter().all(|c| allows(Some(c), ctx, tables));
    }
    if let Some(Value::Array(operands)) = object.get("or") {
        return operands.iter().any(|c| allows(Some(c), ctx, tables));
    }
    if let Some(inner) = object.get("not") {
        return !allows(Some(inner), ctx, tables);
    }
    if let Some(Value::Array(sides)) = object.get("==") {
        if let [left, right] = sides.as_slice() {
            return side_as_string(left, ctx) == side_as_string(right, ctx);
        }
    }
    true
}

fn exists_allows(exists: &Value, tables: &PriceTables) -> bool {
    let Some(object) = exists.as_object() else {
        return true;
    };
    if object.get("type").and_then(Value::as_str) != Some("meteredUnit") {
        return true;
    }
    let mapping = object
        .get("mappingDefinitionName")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let unit = object
        .get("meteredUnit")
        .and_then(Value::as_str)
        .unwrap_or_default();
    tables
        .get(mapping)
        .map(|table| table.contains_key(unit))
        .unwrap_or(false)
}

/// A side of `==`: a `{type: "component", id}` reference resolves through
/// the context; any other literal compares in string space.
fn side_as_string(side: &Value, ctx: &EvalContext) -> String {
    if let Some(object) = side.as_object() {
        if object.get("type").and_then(Value::as_str) == Some("component") {
            let id = object.get("id").and_then(Value::as_str).unwrap_or_default();
            return ctx.get(id).map(EvalValue::as_text).unwrap_or_default();
        }
    }
    value_as_string(side)
}
