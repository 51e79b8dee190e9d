//! Loading stored estimates back.

use crate::error::{EstimateError, Result};
use calc_client::{ClientError, Fetcher};
use calc_model::{EstimateDocument, ServiceCost};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

static BARE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9-]+$").expect("valid id regex"));
static URL_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"id=([A-Za-z0-9-]+)").expect("valid link regex"));

/// Accept either a bare estimate id or a share link carrying `id=<token>`.
pub fn extract_estimate_id(input: &str) -> Result<String> {
    let trimmed = input.trim();
    if BARE_ID.is_match(trimmed) {
        return Ok(trimmed.to_string());
    }
    if let Some(captures) = URL_ID.captures(trimmed) {
        return Ok(captures[1].to_string());
    }
    Err(EstimateError::InvalidId(input.to_string()))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadedEstimate {
    pub estimate_id: String,
    pub summary: EstimateSummary,
    /// The stored document, unmodified.
    pub document: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateSummary {
    pub name: String,
    pub total_cost: ServiceCost,
    pub created_on: String,
    pub services: Vec<ServiceRow>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRow {
    pub name: String,
    pub region: String,
    pub monthly_cost: f64,
    pub upfront_cost: f64,
    pub has_components: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    /// `editable`, `missing templateId` or `no config data`.
    pub config_state: String,
}

/// Fetch a stored estimate. The store answers JSON for a live estimate and
/// an XML error page for anything else; 4xx and XML both mean not-found.
pub async fn load_estimate(fetcher: &Fetcher, id_or_link: &str) -> Result<LoadedEstimate> {
    let estimate_id = extract_estimate_id(id_or_link)?;
    let url = fetcher.endpoints().load_url(&estimate_id);
    let (status, body) = fetcher.get_text(&url).await?;

    if body.trim_start().starts_with('<') || (400..500).contains(&status) {
        return Err(EstimateError::NotFound(estimate_id));
    }
    if !(200..300).contains(&status) {
        return Err(ClientError::Status { url, status, body }.into());
    }

    let document: Value = serde_json::from_str(&body).map_err(|e| ClientError::Decode {
        url,
        message: e.to_string(),
    })?;
    let parsed: EstimateDocument =
        serde_json::from_value(document.clone()).unwrap_or_default();

    Ok(LoadedEstimate {
        estimate_id,
        summary: summarize(&parsed),
        document,
    })
}

fn summarize(document: &EstimateDocument) -> EstimateSummary {
    let mut services: Vec<ServiceRow> = document
        .services
        .values()
        .map(|entry| {
            let has_components = !entry.calculation_components.is_empty();
            let config_state = match (has_components, entry.template_id.is_some()) {
                (true, true) => "editable",
                (true, false) => "missing templateId",
                (false, _) => "no config data",
            };
            ServiceRow {
                name: entry.service_name.clone(),
                region: entry.region_name.clone(),
                monthly_cost: entry.service_cost.monthly,
                upfront_cost: entry.service_cost.upfront,
                has_components,
                template_id: entry.template_id.clone(),
                config_state: config_state.to_string(),
            }
        })
        .collect();
    services.sort_by(|a, b| a.name.cmp(&b.name));

    EstimateSummary {
        name: document.name.clone(),
        total_cost: document.total_cost,
        created_on: document.meta_data.created_on.clone(),
        services,
    }
}

impl LoadedEstimate {
    /// Human-readable rendering of the summary.
    pub fn summary_text(&self) -> String {
        let mut lines = vec![format!(
            "Estimate '{}': {:.2} USD monthly, {:.2} USD upfront (created {})",
            self.summary.name,
            self.summary.total_cost.monthly,
            self.summary.total_cost.upfront,
            if self.summary.created_on.is_empty() {
                "unknown"
            } else {
                &self.summary.created_on
            },
        )];
        for service in &self.summary.services {
            lines.push(format!(
                "- {} [{}]: {:.2}/mo, {:.2} upfront ({})",
                service.name,
                service.region,
                service.monthly_cost,
                service.upfront_cost,
                service.config_state,
            ));
        }
        lines.join("\n")
    }
}
