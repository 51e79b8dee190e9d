//! The ordered expression evaluator.
//!
//! Three phases over one mutable context: seed the user inputs, resolve
//! pricing components against the region's price tables, then run the math
//! sections of the first template in document order. `priceDisplay`
//! operators emit labeled subtotals which are grouped into the final
//! monthly/upfront cost.

use crate::condition;
use crate::context::{resolve_operand, EvalContext, EvalValue, PriceTier};
use crate::normalize::seed_value;
use calc_model::{
    CalculationComponents, Component, PriceTables, ServiceCost, ServiceDefinition,
};
use std::collections::HashMap;

/// Auxiliary context-key prefix for resolved tier arrays.
const TIERS_PREFIX: &str = "__tiers__";

struct PriceLine {
    cost_type: String,
    value: f64,
}

/// Evaluate one definition against its calculation components and pricing
/// tables. Never fails: unresolved references, missing tables and missing
/// units all read as zero. A definition with no math sections costs nothing.
pub fn evaluate(
    def: &ServiceDefinition,
    components: &CalculationComponents,
    tables: &PriceTables,
) -> ServiceCost {
    let mut ctx = EvalContext::new();
    seed_inputs(def, components, &mut ctx);
    resolve_pricing(def, tables, &mut ctx);
    let lines = run_maths(def, tables, &mut ctx);

    let mut cost = ServiceCost::ZERO;
    for line in lines {
        if line.cost_type == "Upfront" {
            cost.upfront += line.value;
        } else {
            cost.monthly += line.value;
        }
    }
    cost.clamp_non_negative()
}

/// Phase 1: store every calculation component under its id, normalized by
/// the subtype the input tree declares for it.
fn seed_inputs(def: &ServiceDefinition, components: &CalculationComponents, ctx: &mut EvalContext) {
    let mut kinds: HashMap<&str, &str> = HashMap::new();
    def.visit_input_components(&mut |component| {
        if let Some(id) = component.id.as_deref() {
            kinds.entry(id).or_insert_with(|| component.kind());
        }
    });

    for (key, raw) in components {
        let kind = kinds.get(key.as_str()).copied().unwrap_or_default();
        ctx.insert(key.clone(), seed_value(kind, raw));
    }
}

/// Phase 2: resolve pricing-typed components out of the input sections
/// (math sections never hold pricing bindings).
fn resolve_pricing(def: &ServiceDefinition, tables: &PriceTables, ctx: &mut EvalContext) {
    let mut pricing: Vec<&Component> = Vec::new();
    def.visit_input_components(&mut |component| {
        if matches!(
            component.kind(),
            "replace" | "singlePricePoint" | "pricingComboV2" | "tieredPricing"
        ) {
            pricing.push(component);
        }
    });

    for component in pricing {
        let Some(id) = component.id.clone() else {
            continue;
        };
        match component.kind() {
            "replace" => {
                let original = component
                    .original_id
                    .as_deref()
                    .and_then(|origin| ctx.get(origin))
                    .map(EvalValue::as_text)
                    .unwrap_or_default();
                let replaced = component
                    .replacements
                    .iter()
                    .find(|r| r.original_string == original)
                    .map(|r| r.replace_string.clone())
                    .unwrap_or_default();
                ctx.insert(id, EvalValue::Text(replaced));
            }
            "singlePricePoint" => {
                let unit = component
                    .metered_unit
                    .as_ref()
                    .and_then(|m| m.all_regions.as_deref())
                    .unwrap_or_default();
                let price = table_price(tables, component.mapping_definition_name.as_deref(), unit);
                ctx.insert(id, EvalValue::Number(price));
            }
            "pricingComboV2" => {
                // the metered-unit name is dynamic, resolved out of context
                let unit = component
                    .refers
                    .first()
                    .and_then(|r| r.variable_id.as_deref())
                    .and_then(|variable| ctx.get(variable))
                    .map(EvalValue::as_text)
                    .unwrap_or_default();
                let price =
                    table_price(tables, component.mapping_definition_name.as_deref(), &unit);
                ctx.insert(id, EvalValue::Number(price));
            }
            "tieredPricing" => {
                let tiers: Vec<PriceTier> = component
                    .tiers
                    .as_ref()
                    .map(|t| t.all_regions.as_slice())
                    .unwrap_or_default()
                    .iter()
                    .map(|tier| PriceTier {
                        start: tier.start_of_tier,
                        end: tier.end_of_tier,
                        price: table_price(
                            tables,
                            component.mapping_definition_name.as_deref(),
                            &tier.metered_unit,
                        ),
                    })
                    .collect();
                ctx.insert(format!("{TIERS_PREFIX}{id}"), EvalValue::Tiers(tiers));
            }
            _ => {}
        }
    }
}

fn table_price(tables: &PriceTables, mapping: Option<&str>, unit: &str) -> f64 {
    mapping
        .and_then(|name| tables.get(name))
        .and_then(|table| table.get(unit))
        .copied()
        .unwrap_or(0.0)
}

/// Phase 3: run the math sections of the first template (templates are
/// alternate forms of the same service). Cards and operators whose
/// `displayIf` fails are skipped.
fn run_maths(def: &ServiceDefinition, tables: &PriceTables, ctx: &mut EvalContext) -> Vec<PriceLine> {
    let mut lines = Vec::new();
    let Some(template) = def.templates.first() else {
        return lines;
    };

    for card in &template.cards {
        if !condition::allows(card.display_if.as_ref(), ctx, tables) {
            continue;
        }
        for operator in &card.maths_section.components {
            if !condition::allows(operator.display_if.as_ref(), ctx, tables) {
                continue;
            }
            apply_operator(operator, ctx, &mut lines);
        }
    }
    lines
}

fn apply_operator(operator: &Component, ctx: &mut EvalContext, lines: &mut Vec<PriceLine>) {
    match operator.kind() {
        "display" | "conversionDisplay" => {}
        "priceDisplay" => {
            let value = operator
                .sub_total_refer
                .as_deref()
                .and_then(|refer| ctx.get(refer))
                .map(EvalValue::as_number)
                .unwrap_or(0.0);
            lines.push(PriceLine {
                cost_type: operator
                    .cost_type
                    .clone()
                    .unwrap_or_else(|| "Monthly".to_string()),
                value,
            });
        }
        "basicMaths" => {
            let result = fold_basic(operator, ctx);
            store(operator, ctx, result);
        }
        "maxMin" => {
            let result = fold_max_min(operator, ctx);
            store(operator, ctx, result);
        }
        "rounding" => {
            let value = operator
                .variable_id
                .as_deref()
                .or(operator.refer.as_deref())
                .and_then(|refer| ctx.get(refer))
                .map(EvalValue::as_number)
                .unwrap_or(0.0);
            store(operator, ctx, apply_rounding(operator, value));
        }
        "tieredPricingMath" => {
            let quantity = operator
                .input_refer
                .as_deref()
                .and_then(|refer| ctx.get(refer))
                .map(EvalValue::as_number)
                .unwrap_or(0.0);
            let cost = match operator
                .tiered_pricing_refer
                .as_deref()
                .and_then(|refer| ctx.get(&format!("{TIERS_PREFIX}{refer}")))
            {
                Some(EvalValue::Tiers(tiers)) => charge_tiers(quantity, tiers),
                _ => 0.0,
            };
            store(operator, ctx, cost);
        }
        other => {
            log::debug!("skipping unknown math operator '{other}'");
        }
    }
}

fn store(operator: &Component, ctx: &mut EvalContext, value: f64) {
    if let Some(id) = operator.id.clone() {
        ctx.insert(id, EvalValue::Number(value));
    }
}

/// Left-to-right fold over the operand list. Division by zero yields 0.
fn fold_basic(operator: &Component, ctx: &EvalContext) -> f64 {
    let operation = operator.operation.as_deref().unwrap_or_default();
    let mut operands = operator.values.iter();
    let Some(first) = operands.next() else {
        return 0.0;
    };
    let mut acc = resolve_operand(first, ctx);
    for operand in operands {
        let value = resolve_operand(operand, ctx);
        acc = match operation {
            "multiplication" => acc * value,
            "addition" => acc + value,
            "subtraction" => acc - value,
            "division" => {
                if value == 0.0 {
                    0.0
                } else {
                    acc / value
                }
            }
            _ => acc,
        };
    }
    acc
}

fn fold_max_min(operator: &Component, ctx: &EvalContext) -> f64 {
    let operation = operator.operation.as_deref().unwrap_or_default();
    let mut operands = operator.values.iter();
    let Some(first) = operands.next() else {
        return 0.0;
    };
    let mut acc = resolve_operand(first, ctx);
    for operand in operands {
        let value = resolve_operand(operand, ctx);
        acc = match operation {
            "Maximum" => acc.max(value),
            "Minimum" => acc.min(value),
            _ => acc,
        };
    }
    acc
}

fn apply_rounding(operator: &Component, value: f64) -> f64 {
    let Some(factor) = operator.factor.filter(|f| *f != 0.0) else {
        return value;
    };
    match operator.method.as_deref() {
        Some("roundUp") => (value / factor).ceil() * factor,
        Some("roundDown") => (value / factor).floor() * factor,
        _ => value,
    }
}

/// Walk the tier list in order, charging `min(remaining, end - start)`
/// units at each tier's price until the quantity is exhausted. A tier with
/// `end < 0` is unbounded.
fn charge_tiers(quantity: f64, tiers: &[PriceTier]) -> f64 {
    let mut remaining = quantity.max(0.0);
    let mut cost = 0.0;
    for tier in tiers {
        if remaining <= 0.0 {
            break;
        }
        let span = if tier.end < 0.0 {
            remaining
        } else {
            (tier.end - tier.start).max(0.0)
        };
        let charged = remaining.min(span);
        cost += charged * tier.price;
        remaining -= charged;
    }
    cost
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn definition(raw: Value) -> ServiceDefinition {
        serde_json::from_value(raw).unwrap()
    }

    fn components(raw: Value) -> CalculationComponents {
        raw.as_object().cloned().unwrap()
    }

    fn approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 0.005,
            "expected ≈{expected}, got {actual}"
        );
    }

    #[test]
    fn test_definition_without_maths_costs_nothing() {
        let def = definition(json!({
            "templates": [{"cards": [{"inputSection": {"components": [
                {"type": "numericInput", "id": "n", "defaultValue": 10}
            ]}}]}]
        }));
        let cost = evaluate(&def, &components(json!({"n": {"value": 10}})), &PriceTables::new());
        assert_eq!(cost, ServiceCost::ZERO);
    }

    #[test]
    fn test_lambda_free_tier_math() {
        let def = definition(json!({
            "serviceName": "AWS Lambda",
            "templates": [{
                "id": "lambda",
                "cards": [{
                    "inputSection": {"components": [
                        {"type": "numericInput", "id": "numberOfRequests"},
                        {"type": "numericInput", "id": "durationOfEachRequest"},
                        {"type": "numericInput", "id": "sizeOfMemoryAllocated"},
                        {"type": "numericInput", "id": "requestPrice"},
                        {"type": "numericInput", "id": "durationPrice"}
                    ]},
                    "mathsSection": {"components": [
                        {"type": "basicMaths", "id": "durationSeconds", "operation": "division",
                         "values": [{"variableId": "durationOfEachRequest"}, {"constant": 1000}]},
                        {"type": "basicMaths", "id": "gbSeconds", "operation": "multiplication",
                         "values": [{"variableId": "numberOfRequests"},
                                    {"variableId": "durationSeconds"},
                                    {"variableId": "sizeOfMemoryAllocated"}]},
                        {"type": "basicMaths", "id": "gbSecondsLessFreeTier", "operation": "subtraction",
                         "values": [{"variableId": "gbSeconds"}, {"constant": 400000}]},
                        {"type": "maxMin", "id": "billableGbSeconds", "operation": "Maximum",
                         "values": [{"variableId": "gbSecondsLessFreeTier"}, {"constant": 0}]},
                        {"type": "basicMaths", "id": "durationCharge", "operation": "multiplication",
                         "values": [{"variableId": "billableGbSeconds"}, {"variableId": "durationPrice"}]},
                        {"type": "basicMaths", "id": "requestsLessFreeTier", "operation": "subtraction",
                         "values": [{"variableId": "numberOfRequests"}, {"constant": 1000000}]},
                        {"type": "maxMin", "id": "billableRequests", "operation": "Maximum",
                         "values": [{"variableId": "requestsLessFreeTier"}, {"constant": 0}]},
                        {"type": "basicMaths", "id": "requestCharge", "operation": "multiplication",
                         "values": [{"variableId": "billableRequests"}, {"variableId": "requestPrice"}]},
                        {"type": "basicMaths", "id": "totalCharge", "operation": "addition",
                         "values": [{"variableId": "durationCharge"}, {"variableId": "requestCharge"}]},
                        {"type": "priceDisplay", "costType": "Monthly", "subTotalRefer": "totalCharge"}
                    ]}
                }]
            }]
        }));
        let inputs = components(json!({
            "numberOfRequests": {"value": 10000000},
            "durationOfEachRequest": {"value": 200},
            "sizeOfMemoryAllocated": {"value": 0.5},
            "requestPrice": {"value": 0.0000002},
            "durationPrice": {"value": 0.0000166667}
        }));
        let cost = evaluate(&def, &inputs, &PriceTables::new());
        approx(cost.monthly, 11.80);
        assert_eq!(cost.upfront, 0.0);
    }

    #[test]
    fn test_s3_tiered_storage_math() {
        let def = definition(json!({
            "templates": [{
                "cards": [{
                    "inputSection": {"components": [
                        {"type": "numericInput", "id": "storageGB"},
                        {"type": "tieredPricing", "id": "storageTiers",
                         "mappingDefinitionName": "s3Storage",
                         "tiers": {"allRegions": [
                            {"startOfTier": 0, "endOfTier": 51200, "meteredUnit": "FirstTier-GB-Mo"},
                            {"startOfTier": 51200, "endOfTier": 512000, "meteredUnit": "SecondTier-GB-Mo"},
                            {"startOfTier": 512000, "endOfTier": -1, "meteredUnit": "ThirdTier-GB-Mo"}
                        ]}}
                    ]},
                    "mathsSection": {"components": [
                        {"type": "tieredPricingMath", "id": "storageCharge",
                         "inputRefer": "storageGB", "tieredPricingRefer": "storageTiers"},
                        {"type": "priceDisplay", "subTotalRefer": "storageCharge"}
                    ]}
                }]
            }]
        }));
        let mut table = calc_model::PriceTable::new();
        table.insert("FirstTier-GB-Mo".to_string(), 0.023);
        table.insert("SecondTier-GB-Mo".to_string(), 0.022);
        table.insert("ThirdTier-GB-Mo".to_string(), 0.021);
        let mut tables = PriceTables::new();
        tables.insert("s3Storage".to_string(), table);

        let cost = evaluate(&def, &components(json!({"storageGB": {"value": 60000}})), &tables);
        approx(cost.monthly, 1371.20);
    }

    #[test]
    fn test_tier_walk_past_unbounded_tier() {
        let tiers = vec![
            PriceTier { start: 0.0, end: 100.0, price: 1.0 },
            PriceTier { start: 100.0, end: -1.0, price: 0.5 },
        ];
        approx(charge_tiers(50.0, &tiers), 50.0);
        approx(charge_tiers(100.0, &tiers), 100.0);
        approx(charge_tiers(250.0, &tiers), 175.0);
        approx(charge_tiers(-5.0, &tiers), 0.0);
    }

    #[test]
    fn test_single_price_point_and_combo_resolution() {
        let def = definition(json!({
            "templates": [{
                "cards": [{
                    "inputSection": {"components": [
                        {"type": "dropdown", "id": "storageClass"},
                        {"type": "replace", "id": "classUnit", "originalId": "storageClass",
                         "replacements": [
                            {"originalString": "s3Standard", "replaceString": "TimedStorage-ByteHrs"},
                            {"originalString": "s3Glacier", "replaceString": "TimedStorage-GlacierByteHrs"}
                        ]},
                        {"type": "pricingComboV2", "id": "classPrice",
                         "mappingDefinitionName": "s3",
                         "refers": [{"variableId": "classUnit"}]},
                        {"type": "singlePricePoint", "id": "requestPrice",
                         "mappingDefinitionName": "s3",
                         "meteredUnit": {"allRegions": "Requests-Tier1"}}
                    ]},
                    "mathsSection": {"components": [
                        {"type": "basicMaths", "id": "sum", "operation": "addition",
                         "values": [{"variableId": "classPrice"}, {"variableId": "requestPrice"}]},
                        {"type": "priceDisplay", "subTotalRefer": "sum"}
                    ]}
                }]
            }]
        }));
        let mut table = calc_model::PriceTable::new();
        table.insert("TimedStorage-GlacierByteHrs".to_string(), 0.004);
        table.insert("Requests-Tier1".to_string(), 0.0000004);
        let mut tables = PriceTables::new();
        tables.insert("s3".to_string(), table);

        let cost = evaluate(
            &def,
            &components(json!({"storageClass": {"value": "s3Glacier"}})),
            &tables,
        );
        approx(cost.monthly, 0.0040004);

        // an unmatched replace resolves to the empty string, pricing to 0
        let cost = evaluate(
            &def,
            &components(json!({"storageClass": {"value": "unknownClass"}})),
            &tables,
        );
        approx(cost.monthly, 0.0000004);
    }

    #[test]
    fn test_display_if_skips_cards_and_operators() {
        let def = definition(json!({
            "templates": [{
                "cards": [
                    {
                        "displayIf": {"==": [{"type": "component", "id": "mode"}, "advanced"]},
                        "inputSection": {"components": [{"type": "numericInput", "id": "n"}]},
                        "mathsSection": {"components": [
                            {"type": "basicMaths", "id": "skipped", "operation": "addition",
                             "values": [{"constant": 100}, {"constant": 100}]},
                            {"type": "priceDisplay", "subTotalRefer": "skipped"}
                        ]}
                    },
                    {
                        "inputSection": {"components": [{"type": "dropdown", "id": "mode"}]},
                        "mathsSection": {"components": [
                            {"type": "basicMaths", "id": "kept", "operation": "addition",
                             "values": [{"constant": 2}, {"constant": 3}]},
                            {"type": "priceDisplay", "subTotalRefer": "kept"},
                            {"type": "priceDisplay", "subTotalRefer": "kept",
                             "displayIf": {"not": {"==": [{"type": "component", "id": "mode"}, "simple"]}}}
                        ]}
                    }
                ]
            }]
        }));
        let cost = evaluate(
            &def,
            &components(json!({"mode": {"value": "simple"}})),
            &PriceTables::new(),
        );
        // the guarded card and the guarded second priceDisplay are skipped
        approx(cost.monthly, 5.0);
    }

    #[test]
    fn test_rounding_methods() {
        let def = definition(json!({
            "templates": [{
                "cards": [{
                    "inputSection": {"components": [{"type": "numericInput", "id": "n"}]},
                    "mathsSection": {"components": [
                        {"type": "rounding", "id": "up", "method": "roundUp", "factor": 10,
                         "variableId": "n"},
                        {"type": "rounding", "id": "down", "method": "roundDown", "factor": 10,
                         "variableId": "n"},
                        {"type": "rounding", "id": "other", "method": "banker", "factor": 10,
                         "variableId": "n"},
                        {"type": "priceDisplay", "subTotalRefer": "up"},
                        {"type": "priceDisplay", "subTotalRefer": "down", "costType": "Upfront"},
                        {"type": "priceDisplay", "subTotalRefer": "other", "costType": "Upfront"}
                    ]}
                }]
            }]
        }));
        let cost = evaluate(&def, &components(json!({"n": {"value": 42}})), &PriceTables::new());
        approx(cost.monthly, 50.0);
        approx(cost.upfront, 82.0); // 40 rounded down + 42 passed through
    }

    #[test]
    fn test_division_by_zero_yields_zero() {
        let def = definition(json!({
            "templates": [{
                "cards": [{
                    "inputSection": {"components": [{"type": "numericInput", "id": "denominator"}]},
                    "mathsSection": {"components": [
                        {"type": "basicMaths", "id": "quotient", "operation": "division",
                         "values": [{"constant": 10}, {"variableId": "denominator"}]},
                        {"type": "priceDisplay", "subTotalRefer": "quotient"}
                    ]}
                }]
            }]
        }));
        let cost = evaluate(
            &def,
            &components(json!({"denominator": {"value": 0}})),
            &PriceTables::new(),
        );
        assert_eq!(cost.monthly, 0.0);
    }

    #[test]
    fn test_negative_totals_clamp_to_zero() {
        let def = definition(json!({
            "templates": [{
                "cards": [{
                    "inputSection": {"components": []},
                    "mathsSection": {"components": [
                        {"type": "basicMaths", "id": "negative", "operation": "subtraction",
                         "values": [{"constant": 1}, {"constant": 5}]},
                        {"type": "priceDisplay", "subTotalRefer": "negative"}
                    ]}
                }]
            }]
        }));
        let cost = evaluate(&def, &CalculationComponents::new(), &PriceTables::new());
        assert_eq!(cost.monthly, 0.0);
    }

    #[test]
    fn test_only_first_template_is_evaluated() {
        let def = definition(json!({
            "templates": [
                {"cards": [{
                    "inputSection": {"components": []},
                    "mathsSection": {"components": [
                        {"type": "basicMaths", "id": "v", "operation": "addition",
                         "values": [{"constant": 1}, {"constant": 1}]},
                        {"type": "priceDisplay", "subTotalRefer": "v"}
                    ]}
                }]},
                {"cards": [{
                    "inputSection": {"components": []},
                    "mathsSection": {"components": [
                        {"type": "basicMaths", "id": "w", "operation": "addition",
                         "values": [{"constant": 50}, {"constant": 50}]},
                        {"type": "priceDisplay", "subTotalRefer": "w"}
                    ]}
                }]}
            ]
        }));
        let cost = evaluate(&def, &CalculationComponents::new(), &PriceTables::new());
        approx(cost.monthly, 2.0);
    }

    #[test]
    fn test_frequency_input_feeds_monthly_math() {
        let def = definition(json!({
            "templates": [{
                "cards": [{
                    "inputSection": {"components": [
                        {"type": "input", "subType": "frequency", "id": "invocations"}
                    ]},
                    "mathsSection": {"components": [
                        {"type": "basicMaths", "id": "charge", "operation": "multiplication",
                         "values": [{"variableId": "invocations"}, {"constant": 0.01}]},
                        {"type": "priceDisplay", "subTotalRefer": "charge"}
                    ]}
                }]
            }]
        }));
        let cost = evaluate(
            &def,
            &components(json!({"invocations": {"value": 2, "unit": "per day"}})),
            &PriceTables::new(),
        );
        approx(cost.monthly, 0.6); // 60 invocations/month at 0.01
    }
}
