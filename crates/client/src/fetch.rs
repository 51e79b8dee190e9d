//! Typed HTTP access with per-process memoization.

use crate::endpoints::Endpoints;
use crate::error::{ClientError, Result};
use calc_model::{Manifest, PriceTable, ServiceDefinition};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Remote document fetcher.
///
/// All caches are write-once per key and shared for the process lifetime.
/// Two invocations racing on a cold key both fetch; whichever result lands
/// last stays, which is harmless because the stores are immutable within a
/// process run. Locks are never held across an await point.
pub struct Fetcher {
    http: reqwest::Client,
    endpoints: Endpoints,
    manifest: Mutex<Option<Arc<Manifest>>>,
    definitions: Mutex<HashMap<String, Arc<ServiceDefinition>>>,
    price_tables: Mutex<HashMap<(String, String), Arc<PriceTable>>>,
}

impl Fetcher {
    pub fn new() -> Self {
        Self::with_endpoints(Endpoints::default())
    }

    pub fn with_endpoints(endpoints: Endpoints) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("calc-mcp/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("failed to build HTTP client");
        Self {
            http,
            endpoints,
            manifest: Mutex::new(None),
            definitions: Mutex::new(HashMap::new()),
            price_tables: Mutex::new(HashMap::new()),
        }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// GET a URL and parse the body as JSON. Non-2xx fails with the status
    /// and the body text.
    pub async fn get_json(&self, url: &str) -> Result<Value> {
        let (status, body) = self.get_text(url).await?;
        if !(200..300).contains(&status) {
            return Err(ClientError::Status {
                url: url.to_string(),
                status,
                body,
            });
        }
        serde_json::from_str(&body).map_err(|e| ClientError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    /// GET a URL and return `(status, body)` without interpreting either.
    /// The estimate loader needs the raw body to tell JSON from XML.
    pub async fn get_text(&self, url: &str) -> Result<(u16, String)> {
        log::debug!("GET {url}");
        let response = self
            .http
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| ClientError::Request {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| ClientError::Request {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        Ok((status, body))
    }

    /// POST a JSON body and parse the JSON response. Non-2xx fails with the
    /// status and response body preserved for the caller's retry logic.
    pub async fn post_json(&self, url: &str, payload: &Value) -> Result<Value> {
        log::debug!("POST {url}");
        let response = self
            .http
            .post(url)
            .header("Content-Type", "application/json")
            .json(payload)
            .send()
            .await
            .map_err(|e| ClientError::Request {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| ClientError::Request {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        if !(200..300).contains(&status) {
            return Err(ClientError::Status {
                url: url.to_string(),
                status,
                body,
            });
        }
        serde_json::from_str(&body).map_err(|e| ClientError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    /// The service manifest, fetched once per process. A failed fetch
    /// leaves the slot empty so the next call retries.
    pub async fn manifest(&self) -> Result<Arc<Manifest>> {
        if let Some(manifest) = self.manifest.lock().unwrap().clone() {
            return Ok(manifest);
        }
        let url = self.endpoints.manifest_url.clone();
        let raw = self.get_json(&url).await?;
        let manifest: Manifest =
            serde_json::from_value(raw).map_err(|e| ClientError::Decode {
                url,
                message: e.to_string(),
            })?;
        let manifest = Arc::new(manifest);
        *self.manifest.lock().unwrap() = Some(manifest.clone());
        Ok(manifest)
    }

    /// A service definition, memoized by service code.
    pub async fn service_definition(&self, service_code: &str) -> Result<Arc<ServiceDefinition>> {
        if let Some(def) = self.definitions.lock().unwrap().get(service_code).cloned() {
            return Ok(def);
        }
        let url = self.endpoints.definition_url(service_code);
        let raw = self.get_json(&url).await?;
        let def: ServiceDefinition =
            serde_json::from_value(raw).map_err(|e| ClientError::Decode {
                url,
                message: e.to_string(),
            })?;
        let def = Arc::new(def);
        self.definitions
            .lock()
            .unwrap()
            .insert(service_code.to_string(), def.clone());
        Ok(def)
    }

    /// The price table for one mapping definition in one region, memoized
    /// by `(mapping name, region name)`. Fetch or shape failures produce an
    /// empty table without poisoning the cache; a region genuinely absent
    /// from the document caches as empty.
    pub async fn price_table(
        &self,
        mapping_name: &str,
        url: &str,
        region_name: &str,
    ) -> Arc<PriceTable> {
        let key = (mapping_name.to_string(), region_name.to_string());
        if let Some(table) = self.price_tables.lock().unwrap().get(&key).cloned() {
            return table;
        }
        let raw = match self.get_json(url).await {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("pricing fetch for {mapping_name} failed: {e}");
                return Arc::new(PriceTable::new());
            }
        };
        let table = Arc::new(project_region_prices(&raw, region_name));
        self.price_tables.lock().unwrap().insert(key, table.clone());
        table
    }
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Project `regions[region_name]` of a pricing document into a metered-unit
/// to price map. Prices arrive as strings (sometimes nested under a `price`
/// key); anything that does not parse becomes 0.
fn project_region_prices(document: &Value, region_name: &str) -> PriceTable {
    let mut table = PriceTable::new();
    let Some(region) = document
        .get("regions")
        .and_then(|r| r.get(region_name))
        .and_then(Value::as_object)
    else {
        return table;
    };
    for (metered_unit, entry) in region {
        let price = entry.get("price").unwrap_or(entry);
        table.insert(metered_unit.clone(), parse_price(price));
    }
    table
}

/// `parseFloat(price) || 0`: accept numbers, numeric strings and strings
/// with a numeric prefix.
pub(crate) fn parse_price(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_float_prefix(s),
        _ => None,
    };
    match parsed {
        Some(p) if p.is_finite() => p,
        _ => 0.0,
    }
}

fn parse_float_prefix(s: &str) -> Option<f64> {
    let s = s.trim();
    if let Ok(value) = s.parse::<f64>() {
        return Some(value);
    }
    let bytes = s.as_bytes();
    let mut end = 0;
    let mut seen_digit = false;
    while end < bytes.len() {
        let keep = match bytes[end] {
            b'0'..=b'9' => {
                seen_digit = true;
                true
            }
            b'+' | b'-' => end == 0 || matches!(bytes[end - 1], b'e' | b'E'),
            b'.' => true,
            b'e' | b'E' => seen_digit,
            _ => false,
        };
        if !keep {
            break;
        }
        end += 1;
    }
    if !seen_digit {
        return None;
    }
    // Trim an exponent marker that never got digits ("1.5e", "2e-").
    let candidate = s[..end].trim_end_matches(['e', 'E', '.', '+', '-']);
    candidate.parse::<f64>().ok()
}
