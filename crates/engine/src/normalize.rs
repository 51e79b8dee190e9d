//! Value normalization: user-facing values in, canonical scalars and
//! component-value records out.
//!
//! Two directions share the conversion tables. For evaluation, raw
//! component values project to scalars keyed by field subtype (file sizes
//! in gigabytes, frequencies per month). For persistence, user inputs merge
//! over field defaults into the `calculationComponents` map.

use crate::context::{value_as_number, value_as_string, EvalValue};
use calc_model::{CalculationComponents, InputField};
use serde_json::{Map, Value};

/// File-size units, normalized to gigabytes.
fn file_size_factor(unit: &str) -> f64 {
    match unit {
        "KB" => 1.0 / (1u64 << 20) as f64,
        "MB" => 1.0 / 1024.0,
        "GB" => 1.0,
        "TB" => 1024.0,
        _ => 1.0,
    }
}

/// Frequency units, normalized to per-month occurrences.
fn frequency_factor(unit: &str) -> f64 {
    match unit {
        "per second" => 2_592_000.0,
        "per minute" => 43_200.0,
        "per hour" => 720.0,
        "per day" => 30.0,
        "per week" => 30.0 / 7.0,
        "per month" => 1.0,
        "per year" => 1.0 / 12.0,
        _ => 1.0,
    }
}

fn split_component_value(raw: &Value) -> (&Value, Option<&str>) {
    if let Some(object) = raw.as_object() {
        if let Some(inner) = object.get("value") {
            return (inner, object.get("unit").and_then(Value::as_str));
        }
    }
    (raw, None)
}

/// Project a raw component value to a canonical scalar for its subtype.
/// Missing or non-numeric values become 0.
pub fn normalize_value(sub_type: &str, raw: &Value) -> f64 {
    seed_value(sub_type, raw).as_number()
}

/// Like [`normalize_value`], but text that is not numeric is preserved so
/// `replace` chains, dynamic metered-unit lookups and string conditions
/// keep their inputs.
pub fn seed_value(sub_type: &str, raw: &Value) -> EvalValue {
    let (inner, unit) = split_component_value(raw);
    match sub_type {
        "fileSize" => {
            EvalValue::Number(value_as_number(inner) * file_size_factor(unit.unwrap_or("GB")))
        }
        "frequency" => EvalValue::Number(
            value_as_number(inner) * frequency_factor(unit.unwrap_or("per month")),
        ),
        _ => match inner {
            Value::String(s) if s.trim().parse::<f64>().is_err() => EvalValue::Text(s.clone()),
            Value::Null => EvalValue::Number(0.0),
            other => EvalValue::Number(value_as_number(other)),
        },
    }
}

/// Resolve a supplied value against the field's options: a string equal to
/// an option's label or value substitutes the canonical value; everything
/// else passes through.
pub fn resolve_value(field: &InputField, supplied: &Value) -> Value {
    let Some(options) = &field.options else {
        return supplied.clone();
    };
    let Some(text) = supplied.as_str() else {
        return supplied.clone();
    };
    for option in options {
        if option.label == text || value_as_string(&option.value) == text {
            return option.value.clone();
        }
    }
    supplied.clone()
}

/// Wrap a resolved value into its persisted record shape: `{value, unit}`
/// for sized fields, plain objects for `pricingStrategy`, `{value}`
/// otherwise.
pub fn build_component_value(field: &InputField, resolved: Value) -> Value {
    if field.field_type == "pricingStrategy" && resolved.is_object() {
        return resolved;
    }
    let mut record = Map::new();
    record.insert("value".to_string(), resolved);
    if matches!(field.field_type.as_str(), "fileSize" | "frequency") {
        if let Some(unit) = &field.default_unit {
            record.insert("unit".to_string(), Value::String(unit.clone()));
        }
    }
    Value::Object(record)
}

/// Merge user inputs over field defaults.
///
/// Fields with a meaningful default (non-null, non-empty string) always
/// seed an entry; user entries overlay them. Unknown keys are preserved as
/// pass-through user data.
pub fn build_calc_components(
    fields: &[InputField],
    user_inputs: &CalculationComponents,
) -> CalculationComponents {
    let mut components = CalculationComponents::new();
    for field in fields {
        if field.has_meaningful_default() {
            components.insert(
                field.id.clone(),
                build_component_value(field, field.default.clone()),
            );
        }
    }

    for (key, raw) in user_inputs {
        let Some(field) = fields.iter().find(|f| &f.id == key) else {
            log::warn!("unknown calculation component '{key}' kept as-is");
            components.insert(key.clone(), raw.clone());
            continue;
        };

        if field.field_type == "pricingStrategy" && raw.is_object() {
            components.insert(key.clone(), strip_value_wrapper(raw));
            continue;
        }

        if let Some(object) = raw.as_object().filter(|o| o.contains_key("value")) {
            // already a {value, [unit]} record; still resolve the inner value
            let mut record = Map::new();
            record.insert(
                "value".to_string(),
                resolve_value(field, object.get("value").unwrap_or(&Value::Null)),
            );
            if let Some(unit) = object.get("unit") {
                record.insert("unit".to_string(), unit.clone());
            }
            components.insert(key.clone(), Value::Object(record));
            continue;
        }

        let resolved = resolve_value(field, raw);
        components.insert(key.clone(), build_component_value(field, resolved));
    }

    components
}

fn strip_value_wrapper(raw: &Value) -> Value {
    raw.as_object()
        .and_then(|o| o.get("value"))
        .filter(|inner| inner.is_object())
        .cloned()
        .unwrap_or_else(|| raw.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use calc_model::FieldOption;
    use serde_json::json;

    fn field(id: &str, field_type: &str, default: Value) -> InputField {
        InputField {
            id: id.to_string(),
            label: None,
            field_type: field_type.to_string(),
            description: None,
            default,
            unit: None,
            options: None,
            default_unit: None,
            unit_options: None,
            format: None,
            radio_groups: None,
        }
    }

    fn dropdown(id: &str, default: Value, options: &[(&str, &str)]) -> InputField {
        let mut f = field(id, "dropdown", default);
        f.options = Some(
            options
                .iter()
                .map(|(label, value)| FieldOption {
                    label: label.to_string(),
                    value: json!(value),
                    description: None,
                })
                .collect(),
        );
        f
    }

    #[test]
    fn test_file_size_normalization_is_consistent_across_units() {
        let gb = normalize_value("fileSize", &json!({"value": 1, "unit": "GB"}));
        let mb = normalize_value("fileSize", &json!({"value": 1024, "unit": "MB"}));
        let tb = normalize_value("fileSize", &json!({"value": 1.0 / 1024.0, "unit": "TB"}));
        let kb = normalize_value("fileSize", &json!({"value": 1 << 20, "unit": "KB"}));
        assert!((gb - 1.0).abs() < 1e-12);
        assert!((mb - gb).abs() < 1e-12);
        assert!((tb - gb).abs() < 1e-12);
        assert!((kb - gb).abs() < 1e-12);
    }

    #[test]
    fn test_frequency_normalization_to_per_month() {
        assert_eq!(
            normalize_value("frequency", &json!({"value": 1, "unit": "per second"})),
            2_592_000.0
        );
        assert_eq!(
            normalize_value("frequency", &json!({"value": 2, "unit": "per day"})),
            60.0
        );
        assert_eq!(
            normalize_value("frequency", &json!({"value": 12, "unit": "per year"})),
            1.0
        );
        assert!(
            (normalize_value("frequency", &json!({"value": 7, "unit": "per week"})) - 30.0).abs()
                < 1e-9
        );
    }

    #[test]
    fn test_normalize_missing_or_non_numeric_is_zero() {
        assert_eq!(normalize_value("numericInput", &json!(null)), 0.0);
        assert_eq!(normalize_value("numericInput", &json!({"value": "abc"})), 0.0);
        assert_eq!(normalize_value("fileSize", &json!({})), 0.0);
        assert_eq!(normalize_value("numericInput", &json!({"value": "42"})), 42.0);
    }

    #[test]
    fn test_seed_value_preserves_non_numeric_text() {
        assert_eq!(
            seed_value("dropdown", &json!({"value": "s3Glacier"})),
            EvalValue::Text("s3Glacier".to_string())
        );
        assert_eq!(
            seed_value("dropdown", &json!({"value": "15"})),
            EvalValue::Number(15.0)
        );
    }

    #[test]
    fn test_resolve_value_label_and_value_are_equivalent() {
        let f = dropdown("storageClass", json!("s3Standard"), &[("S3 Glacier", "s3Glacier")]);
        assert_eq!(resolve_value(&f, &json!("S3 Glacier")), json!("s3Glacier"));
        assert_eq!(resolve_value(&f, &json!("s3Glacier")), json!("s3Glacier"));
        // strings outside the option set pass through unchanged
        assert_eq!(resolve_value(&f, &json!("other")), json!("other"));
        assert_eq!(resolve_value(&f, &json!(42)), json!(42));
    }

    #[test]
    fn test_defaults_only_meaningful_ones_emit_entries() {
        let fields = vec![
            field("requests", "numericInput", json!(1000)),
            field("blank", "numericInput", json!("")),
            field("absent", "numericInput", Value::Null),
            field("zero", "numericInput", json!(0)),
        ];
        let components = build_calc_components(&fields, &CalculationComponents::new());
        assert_eq!(components.len(), 2);
        assert_eq!(components["requests"], json!({"value": 1000}));
        assert_eq!(components["zero"], json!({"value": 0}));
    }

    #[test]
    fn test_user_overlay_is_superset_of_untouched_defaults() {
        let fields = vec![
            field("a", "numericInput", json!(1)),
            field("b", "numericInput", json!(2)),
        ];
        let mut user = CalculationComponents::new();
        user.insert("b".to_string(), json!(99));

        let defaults = build_calc_components(&fields, &CalculationComponents::new());
        let merged = build_calc_components(&fields, &user);

        assert_eq!(merged["a"], defaults["a"]);
        assert_eq!(merged["b"], json!({"value": 99}));
    }

    #[test]
    fn test_sized_field_gets_default_unit() {
        let mut f = field("storage", "fileSize", json!(100));
        f.default_unit = Some("GB".to_string());
        let mut user = CalculationComponents::new();
        user.insert("storage".to_string(), json!(250));
        let components = build_calc_components(&[f], &user);
        assert_eq!(components["storage"], json!({"value": 250, "unit": "GB"}));
    }

    #[test]
    fn test_explicit_record_keeps_unit_and_resolves_label() {
        let f = dropdown("storageClass", Value::Null, &[("S3 Glacier", "s3Glacier")]);
        let mut user = CalculationComponents::new();
        user.insert(
            "storageClass".to_string(),
            json!({"value": "S3 Glacier", "unit": "GB"}),
        );
        let components = build_calc_components(&[f], &user);
        assert_eq!(
            components["storageClass"],
            json!({"value": "s3Glacier", "unit": "GB"})
        );
    }

    #[test]
    fn test_pricing_strategy_objects_pass_through() {
        let f = field("strategy", "pricingStrategy", Value::Null);
        let mut user = CalculationComponents::new();
        user.insert(
            "strategy".to_string(),
            json!({"value": {"purchaseOption": "onDemand"}}),
        );
        let components = build_calc_components(&[f.clone()], &user);
        // the enclosing {value: …} wrapper is stripped
        assert_eq!(components["strategy"], json!({"purchaseOption": "onDemand"}));

        let mut bare = CalculationComponents::new();
        bare.insert("strategy".to_string(), json!({"purchaseOption": "spot"}));
        let components = build_calc_components(&[f], &bare);
        assert_eq!(components["strategy"], json!({"purchaseOption": "spot"}));
    }

    #[test]
    fn test_unknown_keys_are_preserved() {
        let fields = vec![field("known", "numericInput", json!(1))];
        let mut user = CalculationComponents::new();
        user.insert("mystery".to_string(), json!({"value": 5}));
        let components = build_calc_components(&fields, &user);
        assert_eq!(components["mystery"], json!({"value": 5}));
        assert!(components.contains_key("known"));
    }
}
