//! The portable schema extracted from a service definition: what an agent
//! needs to know to fill in a service's inputs without seeing the raw
//! component tree.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputField {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub default: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<FieldOption>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_options: Option<Vec<FieldOption>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radio_groups: Option<Vec<RadioGroupSchema>>,
}

impl InputField {
    /// A default counts as meaningful when it is non-null and, for strings,
    /// non-empty. Only meaningful defaults seed calculation components.
    pub fn has_meaningful_default(&self) -> bool {
        match &self.default {
            Value::Null => false,
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldOption {
    pub label: String,
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RadioGroupSchema {
    pub key: String,
    pub default: Value,
    pub options: Vec<FieldOption>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateInfo {
    pub id: String,
    pub title: String,
}

/// Full schema for one service, including best-effort schemas for its
/// sub-services. A sub-service whose definition could not be fetched is
/// kept as a placeholder with empty inputs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSchema {
    pub service_code: String,
    pub service_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub layout: String,
    pub templates: Vec<TemplateInfo>,
    pub inputs: Vec<InputField>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sub_services: Vec<ServiceSchema>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}
