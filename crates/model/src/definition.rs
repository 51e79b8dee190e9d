//! Service definition documents.
//!
//! A definition describes one AWS service's configurable inputs, its
//! pricing-table bindings and its math formulas as a recursive tree of
//! components. The documents are authored for the calculator web UI, so
//! parsing is deliberately lenient: every field is defaulted and unknown
//! fields are ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceDefinition {
    pub service_name: String,
    pub version: String,
    pub estimate_for: String,
    /// `"loader"` marks a dynamic layout whose inputs are resolved at
    /// runtime by the web UI; auto-population is skipped for those.
    pub layout: String,
    pub sub_services: Vec<SubServiceRef>,
    pub mapping_definitions: Vec<MappingDefinition>,
    pub templates: Vec<Template>,
}

impl ServiceDefinition {
    /// URL template for a mapping definition, if the definition lists one.
    pub fn mapping_url(&self, name: &str) -> Option<&str> {
        self.mapping_definitions
            .iter()
            .find(|m| m.name == name)
            .map(|m| m.url.as_str())
            .filter(|u| !u.is_empty())
    }

    /// Depth-first visit over every component of every template's cards,
    /// input sections and math sections alike.
    pub fn visit_components<'a, F: FnMut(&'a Component)>(&'a self, f: &mut F) {
        for template in &self.templates {
            for card in &template.cards {
                visit(&card.input_section.components, f);
                visit(&card.maths_section.components, f);
            }
        }
    }

    /// Depth-first visit restricted to input sections.
    pub fn visit_input_components<'a, F: FnMut(&'a Component)>(&'a self, f: &mut F) {
        for template in &self.templates {
            for card in &template.cards {
                visit(&card.input_section.components, f);
            }
        }
    }
}

/// Recursive walk in document order.
pub fn visit<'a, F: FnMut(&'a Component)>(components: &'a [Component], f: &mut F) {
    for component in components {
        f(component);
        visit(&component.components, f);
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SubServiceRef {
    pub service_code: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MappingDefinition {
    pub name: String,
    /// URL template with a `[currency]` placeholder.
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    pub title: String,
    pub cards: Vec<Card>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Card {
    pub input_section: Section,
    pub maths_section: Section,
    pub display_if: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Section {
    pub components: Vec<Component>,
}

/// One node of the definition tree.
///
/// The `type`/`subType` pair selects the role; the remaining attributes are
/// populated per role. Input components carry an `id`; pricing and math
/// components use `id` as an output slot and reference other slots through
/// `variableId`, `refer`, `originalId`, `inputRefer` or `tieredPricingRefer`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Component {
    #[serde(rename = "type")]
    pub component_type: String,
    pub sub_type: String,
    pub id: Option<String>,
    pub label: Option<String>,
    pub description: Option<String>,
    pub default_value: Option<Value>,
    pub value: Option<Value>,
    pub unit: Option<String>,
    pub unit_options: Vec<ChoiceOption>,
    pub options: Vec<ChoiceOption>,
    pub components: Vec<Component>,
    pub display_if: Option<Value>,

    // pricing bindings
    pub mapping_definition_name: Option<String>,
    pub metered_unit: Option<MeteredUnit>,
    pub refers: Vec<Refer>,
    pub original_id: Option<String>,
    pub replacements: Vec<Replacement>,
    pub tiers: Option<Tiers>,

    // math operators
    pub operation: Option<String>,
    pub method: Option<String>,
    pub factor: Option<f64>,
    pub variable_id: Option<String>,
    pub refer: Option<String>,
    pub input_refer: Option<String>,
    pub tiered_pricing_refer: Option<String>,
    pub sub_total_refer: Option<String>,
    pub cost_type: Option<String>,
    pub values: Vec<Value>,

    // radioTiles / pricingStrategy
    pub default_selection: Option<Value>,
    pub radio_options: Vec<ChoiceOption>,
    pub radio_groups: Vec<RadioGroup>,
}

impl Component {
    /// Effective kind: `subType` when present, `type` otherwise.
    pub fn kind(&self) -> &str {
        if self.sub_type.is_empty() {
            &self.component_type
        } else {
            &self.sub_type
        }
    }

    /// `defaultValue` if defined, else `value`.
    pub fn default_or_value(&self) -> Option<&Value> {
        self.default_value.as_ref().or(self.value.as_ref())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChoiceOption {
    pub label: Option<String>,
    pub value: Value,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RadioGroup {
    pub key: String,
    pub default_option: Option<Value>,
    pub options: Vec<ChoiceOption>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Replacement {
    pub original_string: String,
    pub replace_string: String,
}

/// Reference to another component's output slot.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Refer {
    pub variable_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MeteredUnit {
    pub all_regions: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Tiers {
    pub all_regions: Vec<TierDef>,
}

/// One pricing tier. `end_of_tier == -1` means unbounded.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TierDef {
    pub start_of_tier: f64,
    pub end_of_tier: f64,
    pub metered_unit: String,
}
