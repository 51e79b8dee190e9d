//! The persisted estimate document and its service entries.
//!
//! After a successful save the remote store treats the document as opaque;
//! these shapes matter only for assembly and for projecting a loaded
//! estimate back into a summary.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::ops::AddAssign;

/// Concrete user inputs for one service entry, keyed by input id. Values
/// are `{value}` records, `{value, unit}` records, or plain objects for
/// `pricingStrategy` fields. Unknown keys are preserved as pass-through
/// user data.
pub type CalculationComponents = Map<String, Value>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceCost {
    pub monthly: f64,
    pub upfront: f64,
}

impl ServiceCost {
    pub const ZERO: ServiceCost = ServiceCost {
        monthly: 0.0,
        upfront: 0.0,
    };

    pub fn clamp_non_negative(self) -> Self {
        Self {
            monthly: self.monthly.max(0.0),
            upfront: self.upfront.max(0.0),
        }
    }
}

impl AddAssign for ServiceCost {
    fn add_assign(&mut self, rhs: Self) {
        self.monthly += rhs.monthly;
        self.upfront += rhs.upfront;
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceEntry {
    pub version: String,
    pub service_code: String,
    pub estimate_for: String,
    pub region: String,
    /// UI-facing region name; also the key into pricing tables.
    pub region_name: String,
    pub description: Option<String>,
    pub calculation_components: CalculationComponents,
    pub service_cost: ServiceCost,
    pub service_name: String,
    pub config_summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sub_services: Vec<ServiceEntry>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EstimateGroup {
    pub name: String,
    pub services: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MetaData {
    pub locale: String,
    pub currency: String,
    pub created_on: String,
    pub source: String,
}

impl Default for MetaData {
    fn default() -> Self {
        Self {
            locale: "en_US".to_string(),
            currency: "USD".to_string(),
            created_on: String::new(),
            source: "calculator-platform".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EstimateDocument {
    pub name: String,
    pub services: HashMap<String, ServiceEntry>,
    pub groups: HashMap<String, EstimateGroup>,
    pub group_subtotal: ServiceCost,
    pub total_cost: ServiceCost,
    pub support: Value,
    pub meta_data: MetaData,
}

impl EstimateDocument {
    /// Sum of the top-level service costs. The document invariant is
    /// `total_cost == group_subtotal == summed_service_cost()`.
    pub fn summed_service_cost(&self) -> ServiceCost {
        let mut total = ServiceCost::ZERO;
        for entry in self.services.values() {
            total += entry.service_cost;
        }
        total
    }
}
