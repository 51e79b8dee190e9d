//! Schema extraction: from the recursive template tree to a flat list of
//! input fields an agent can fill in.

use calc_model::{
    ChoiceOption, Component, FieldOption, InputField, RadioGroupSchema, ServiceDefinition,
};
use serde_json::{Map, Value};

/// Depth-first traversal over every template's every card's input section.
/// Every node carrying an `id` becomes a field; recursion continues into a
/// node's children whether or not it was emitted.
pub fn extract_inputs(def: &ServiceDefinition) -> Vec<InputField> {
    let mut fields = Vec::new();
    def.visit_input_components(&mut |component| {
        if let Some(field) = field_from_component(component) {
            fields.push(field);
        }
    });
    fields
}

fn field_from_component(component: &Component) -> Option<InputField> {
    let id = component.id.clone()?;
    let field_type = component.kind().to_string();

    let mut field = InputField {
        id,
        label: component.label.clone(),
        field_type: field_type.clone(),
        description: component.description.clone(),
        default: component
            .default_or_value()
            .cloned()
            .unwrap_or(Value::Null),
        unit: component.unit.clone(),
        options: normalize_options(&component.options),
        default_unit: None,
        unit_options: None,
        format: None,
        radio_groups: None,
    };

    match field_type.as_str() {
        "frequency" | "fileSize" => attach_units(&mut field, component),
        "pricingStrategy" if !component.radio_groups.is_empty() => {
            attach_radio_groups(&mut field, component)
        }
        "radioTiles" => {
            field.default = component
                .default_selection
                .clone()
                .unwrap_or(Value::Null);
            field.options = normalize_options(&component.radio_options);
        }
        _ => {}
    }

    Some(field)
}

fn normalize_options(options: &[ChoiceOption]) -> Option<Vec<FieldOption>> {
    if options.is_empty() {
        return None;
    }
    Some(options.iter().map(normalize_option).collect())
}

fn normalize_option(option: &ChoiceOption) -> FieldOption {
    let label = option
        .label
        .clone()
        .unwrap_or_else(|| option_value_label(&option.value));
    FieldOption {
        label,
        value: option.value.clone(),
        description: option.description.clone(),
    }
}

fn option_value_label(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn attach_units(field: &mut InputField, component: &Component) {
    let unit_options = normalize_options(&component.unit_options);
    field.default_unit = unit_options
        .as_ref()
        .and_then(|options| options.first())
        .and_then(|option| option.value.as_str().map(str::to_string))
        .or_else(|| component.unit.clone());

    let unit_names: Vec<String> = unit_options
        .as_ref()
        .map(|options| options.iter().map(|o| o.label.clone()).collect())
        .unwrap_or_else(|| field.default_unit.iter().cloned().collect());
    field.format = Some(format!(
        "{{value: <number>, unit: <{}>}}",
        unit_names.join("|")
    ));
    field.unit_options = unit_options;
}

fn attach_radio_groups(field: &mut InputField, component: &Component) {
    let mut default = Map::new();
    let mut groups = Vec::new();
    for group in &component.radio_groups {
        let group_default = group.default_option.clone().unwrap_or(Value::Null);
        default.insert(group.key.clone(), group_default.clone());
        groups.push(RadioGroupSchema {
            key: group.key.clone(),
            default: group_default,
            options: normalize_options(&group.options).unwrap_or_default(),
        });
    }
    field.default = Value::Object(default);
    field.radio_groups = Some(groups);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn definition(raw: Value) -> ServiceDefinition {
        serde_json::from_value(raw).unwrap()
    }

    fn single_card(components: Value) -> ServiceDefinition {
        definition(json!({
            "templates": [{
                "id": "t1",
                "title": "Default",
                "cards": [{"inputSection": {"components": components}}]
            }]
        }))
    }

    #[test]
    fn test_empty_definition_has_no_inputs() {
        let def = definition(json!({"templates": [{"cards": []}]}));
        assert!(extract_inputs(&def).is_empty());
    }

    #[test]
    fn test_nested_components_are_emitted_depth_first() {
        let def = single_card(json!([
            {"type": "section", "components": [
                {"type": "numericInput", "id": "inner", "defaultValue": 5}
            ]},
            {"type": "numericInput", "id": "outer", "value": 7}
        ]));
        let fields = extract_inputs(&def);
        let ids: Vec<&str> = fields.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["inner", "outer"]);
        // defaultValue wins over value; value is the fallback
        assert_eq!(fields[0].default, json!(5));
        assert_eq!(fields[1].default, json!(7));
    }

    #[test]
    fn test_sub_type_overrides_type() {
        let def = single_card(json!([
            {"type": "input", "subType": "frequency", "id": "rate"}
        ]));
        assert_eq!(extract_inputs(&def)[0].field_type, "frequency");
    }

    #[test]
    fn test_option_labels_fall_back_to_values() {
        let def = single_card(json!([
            {"type": "dropdown", "id": "class", "options": [
                {"label": "S3 Standard", "value": "s3Standard"},
                {"value": "s3Glacier"}
            ]}
        ]));
        let options = extract_inputs(&def)[0].options.clone().unwrap();
        assert_eq!(options[0].label, "S3 Standard");
        assert_eq!(options[1].label, "s3Glacier");
        assert_eq!(options[1].value, json!("s3Glacier"));
    }

    #[test]
    fn test_file_size_field_carries_units_and_format() {
        let def = single_card(json!([
            {"type": "fileSize", "id": "storage", "defaultValue": 10, "unitOptions": [
                {"label": "GB", "value": "GB"},
                {"label": "TB", "value": "TB"}
            ]}
        ]));
        let field = &extract_inputs(&def)[0];
        assert_eq!(field.default_unit.as_deref(), Some("GB"));
        assert_eq!(field.unit_options.as_ref().unwrap().len(), 2);
        assert_eq!(field.format.as_deref(), Some("{value: <number>, unit: <GB|TB>}"));
    }

    #[test]
    fn test_frequency_without_unit_options_uses_fixed_unit() {
        let def = single_card(json!([
            {"type": "frequency", "id": "rate", "unit": "per month"}
        ]));
        let field = &extract_inputs(&def)[0];
        assert_eq!(field.default_unit.as_deref(), Some("per month"));
    }

    #[test]
    fn test_pricing_strategy_default_is_object_of_group_defaults() {
        let def = single_card(json!([
            {"type": "pricingStrategy", "id": "strategy", "radioGroups": [
                {"key": "purchaseOption", "defaultOption": "onDemand", "options": [
                    {"label": "On-Demand", "value": "onDemand"},
                    {"label": "Spot", "value": "spot"}
                ]},
                {"key": "term", "defaultOption": "1yr", "options": []}
            ]}
        ]));
        let field = &extract_inputs(&def)[0];
        assert_eq!(
            field.default,
            json!({"purchaseOption": "onDemand", "term": "1yr"})
        );
        let groups = field.radio_groups.as_ref().unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].options.len(), 2);
    }

    #[test]
    fn test_radio_tiles_project_selection_and_options() {
        let def = single_card(json!([
            {"type": "radioTiles", "id": "tier", "defaultSelection": "standard",
             "radioOptions": [
                {"label": "Standard", "value": "standard", "description": "Default tier"},
                {"label": "Plus", "value": "plus"}
            ]}
        ]));
        let field = &extract_inputs(&def)[0];
        assert_eq!(field.default, json!("standard"));
        let options = field.options.as_ref().unwrap();
        assert_eq!(options[0].description.as_deref(), Some("Default tier"));
        assert!(options[1].description.is_none());
    }
}
