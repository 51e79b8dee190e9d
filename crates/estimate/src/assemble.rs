//! Estimate assembly and the save/retry protocol.

use crate::cost::calculate_service_cost;
use crate::error::{EstimateError, Result};
use calc_client::{ClientError, Fetcher};
use calc_engine::{build_calc_components, extract_inputs};
use calc_model::{
    regions, CalculationComponents, EstimateDocument, EstimateGroup, MetaData, ServiceCost,
    ServiceEntry, ServiceDefinition,
};
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

const ERROR_BODY_PREVIEW: usize = 300;

/// One service as requested by the agent.
#[derive(Debug, Clone, Default)]
pub struct ServiceSpec {
    pub service_code: String,
    pub region: String,
    pub region_name: Option<String>,
    pub service_name: String,
    pub description: Option<String>,
    pub monthly_cost: f64,
    pub upfront_cost: f64,
    pub config_summary: Option<String>,
    pub calculation_components: Option<CalculationComponents>,
    pub template_id: Option<String>,
    pub group: Option<String>,
}

/// Outcome of a successful (possibly degraded) save.
#[derive(Debug, Clone)]
pub struct SavedEstimate {
    pub name: String,
    pub saved_key: String,
    pub url: String,
    pub total_cost: ServiceCost,
    pub service_count: usize,
    pub warnings: Vec<String>,
}

/// Assemble an estimate document from the given services, persist it and
/// return the shareable link.
///
/// Definition fetches are best-effort: a service whose definition is
/// unavailable is persisted with whatever the caller supplied. When the
/// initial POST is rejected, calculation components are stripped from every
/// service and the save is retried once, with warnings naming the affected
/// services.
pub async fn create_estimate(
    fetcher: &Fetcher,
    name: &str,
    specs: Vec<ServiceSpec>,
) -> Result<SavedEstimate> {
    let mut document = EstimateDocument {
        name: name.to_string(),
        meta_data: MetaData {
            created_on: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            ..MetaData::default()
        },
        support: Value::Object(serde_json::Map::new()),
        ..EstimateDocument::default()
    };
    let mut group_ids: HashMap<String, String> = HashMap::new();

    for spec in specs {
        let def = match fetcher.service_definition(&spec.service_code).await {
            Ok(def) => Some(def),
            Err(e) => {
                log::debug!("definition for {} unavailable: {e}", spec.service_code);
                None
            }
        };

        let region_name = spec
            .region_name
            .clone()
            .unwrap_or_else(|| regions::display_name_or_code(&spec.region));

        let fields = def.as_deref().map(extract_inputs).unwrap_or_default();
        let user_inputs = spec.calculation_components.clone().unwrap_or_default();
        let components = build_calc_components(&fields, &user_inputs);

        let sub_services = match &def {
            Some(def) => build_sub_entries(fetcher, def, &spec, &region_name).await,
            None => Vec::new(),
        };

        let mut cost = ServiceCost {
            monthly: spec.monthly_cost,
            upfront: spec.upfront_cost,
        };
        if spec.monthly_cost == 0.0 {
            if let Some(def) = &def {
                if let Some(auto) =
                    calculate_service_cost(fetcher, def, &components, &region_name).await
                {
                    cost = auto;
                }
            }
        }

        let key = format!("{}-{}", spec.service_code, Uuid::new_v4());
        let entry = ServiceEntry {
            version: def.as_ref().map(|d| d.version.clone()).unwrap_or_default(),
            service_code: spec.service_code.clone(),
            estimate_for: def
                .as_ref()
                .and_then(|d| non_empty(&d.estimate_for))
                .unwrap_or_else(|| spec.service_code.clone()),
            region: spec.region.clone(),
            region_name,
            description: spec.description.clone(),
            calculation_components: components,
            service_cost: cost,
            service_name: non_empty(&spec.service_name)
                .or_else(|| def.as_ref().and_then(|d| non_empty(&d.service_name)))
                .unwrap_or_else(|| spec.service_code.clone()),
            config_summary: spec.config_summary.clone().unwrap_or_default(),
            template_id: spec.template_id.clone().or_else(|| {
                def.as_ref()
                    .and_then(|d| d.templates.first())
                    .and_then(|t| non_empty(&t.id))
            }),
            sub_services,
        };

        document.total_cost += cost;
        document.services.insert(key.clone(), entry);

        if let Some(group) = &spec.group {
            let group_id = group_ids
                .entry(group.clone())
                .or_insert_with(|| format!("group-{}", Uuid::new_v4()))
                .clone();
            document
                .groups
                .entry(group_id)
                .or_insert_with(|| EstimateGroup {
                    name: group.clone(),
                    services: Vec::new(),
                })
                .services
                .push(key);
        }
    }
    document.group_subtotal = document.total_cost;

    save_document(fetcher, document).await
}

/// Sub-service entries carry the sub definition's defaults and zeroed
/// costs; user inputs are never pushed down. A failed fetch leaves a
/// minimal placeholder.
async fn build_sub_entries(
    fetcher: &Fetcher,
    def: &Arc<ServiceDefinition>,
    spec: &ServiceSpec,
    region_name: &str,
) -> Vec<ServiceEntry> {
    let mut entries = Vec::new();
    for sub in &def.sub_services {
        let mut entry = ServiceEntry {
            service_code: sub.service_code.clone(),
            estimate_for: sub.service_code.clone(),
            region: spec.region.clone(),
            region_name: region_name.to_string(),
            service_name: non_empty(&sub.name).unwrap_or_else(|| sub.service_code.clone()),
            service_cost: ServiceCost::ZERO,
            ..ServiceEntry::default()
        };
        match fetcher.service_definition(&sub.service_code).await {
            Ok(sub_def) => {
                let sub_fields = extract_inputs(&sub_def);
                entry.version = sub_def.version.clone();
                if let Some(estimate_for) = non_empty(&sub_def.estimate_for) {
                    entry.estimate_for = estimate_for;
                }
                if let Some(service_name) = non_empty(&sub_def.service_name) {
                    entry.service_name = service_name;
                }
                entry.calculation_components =
                    build_calc_components(&sub_fields, &CalculationComponents::new());
            }
            Err(e) => {
                log::debug!("sub-service {} unavailable: {e}", sub.service_code);
            }
        }
        entries.push(entry);
    }
    entries
}

async fn save_document(fetcher: &Fetcher, mut document: EstimateDocument) -> Result<SavedEstimate> {
    let save_url = fetcher.endpoints().save_url.clone();
    let name = document.name.clone();
    let total_cost = document.total_cost;
    let service_count = document.services.len();

    let payload = serde_json::to_value(&document)?;
    let first_error = match fetcher.post_json(&save_url, &payload).await {
        Ok(response) => {
            return finish_save(fetcher, response, name, total_cost, service_count, Vec::new())
        }
        Err(e) => e,
    };

    // The store sometimes rejects component maps it cannot round-trip.
    // Retry once without them; the estimate keeps its costs and shape.
    let stripped = strip_components(&mut document);
    let payload = serde_json::to_value(&document)?;
    match fetcher.post_json(&save_url, &payload).await {
        Ok(response) => {
            let warnings = vec![
                format!(
                    "Saved without calculationComponents for: {}",
                    stripped.join(", ")
                ),
                format!("Original save error: {}", describe_failure(&first_error)),
                "Re-fetch the service schema and create a new estimate to restore editable inputs."
                    .to_string(),
            ];
            finish_save(fetcher, response, name, total_cost, service_count, warnings)
        }
        Err(retry_error) => Err(EstimateError::SaveFailed {
            first: describe_failure(&first_error),
            retry: describe_failure(&retry_error),
        }),
    }
}

fn finish_save(
    fetcher: &Fetcher,
    response: Value,
    name: String,
    total_cost: ServiceCost,
    service_count: usize,
    warnings: Vec<String>,
) -> Result<SavedEstimate> {
    let saved_key = parse_save_response(&response)?;
    Ok(SavedEstimate {
        name,
        url: fetcher.endpoints().share_url(&saved_key),
        saved_key,
        total_cost,
        service_count,
        warnings,
    })
}

/// The save store answers `{statusCode, body}` where `body` is itself a
/// JSON string carrying `{savedKey}`.
fn parse_save_response(response: &Value) -> Result<String> {
    let status = response.get("statusCode").and_then(Value::as_i64);
    if status != Some(201) {
        return Err(EstimateError::ResponseShape(format!(
            "statusCode {status:?}, expected 201"
        )));
    }
    let body = response
        .get("body")
        .and_then(Value::as_str)
        .ok_or_else(|| EstimateError::ResponseShape("missing body".to_string()))?;
    let parsed: Value = serde_json::from_str(body)
        .map_err(|e| EstimateError::ResponseShape(format!("body is not JSON: {e}")))?;
    parsed
        .get("savedKey")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| EstimateError::ResponseShape("missing savedKey".to_string()))
}

/// Drop component maps from every service and sub-service, returning the
/// affected service names (sorted for stable reporting).
fn strip_components(document: &mut EstimateDocument) -> Vec<String> {
    let mut names = Vec::new();
    for entry in document.services.values_mut() {
        if !entry.calculation_components.is_empty() {
            names.push(entry.service_name.clone());
            entry.calculation_components = CalculationComponents::new();
        }
        for sub in &mut entry.sub_services {
            if !sub.calculation_components.is_empty() {
                names.push(sub.service_name.clone());
                sub.calculation_components = CalculationComponents::new();
            }
        }
    }
    names.sort();
    names.dedup();
    names
}

fn describe_failure(error: &ClientError) -> String {
    match (error.status(), error.body()) {
        (Some(status), Some(body)) => {
            format!("HTTP {status}: {}", truncate(body, ERROR_BODY_PREVIEW))
        }
        _ => error.to_string(),
    }
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        text.to_string()
    } else {
        let cut: String = text.chars().take(limit).collect();
        format!("{cut}…")
    }
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
