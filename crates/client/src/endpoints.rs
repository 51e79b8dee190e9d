//! Endpoint set for the calculator's document stores.
//!
//! The defaults point at the production CloudFront distributions; tests
//! swap in a local mock server. The URLs are the stable unofficial API
//! surface the web UI itself talks to.

/// Currency segment used when resolving pricing URLs.
pub const CURRENCY: &str = "USD";

#[derive(Debug, Clone)]
pub struct Endpoints {
    pub manifest_url: String,
    pub definition_base: String,
    pub pricing_base: String,
    pub save_url: String,
    pub load_base: String,
    pub share_base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            manifest_url: "https://d1qsjq9pzbk1k6.cloudfront.net/manifest/en_US.json".to_string(),
            definition_base: "https://d1qsjq9pzbk1k6.cloudfront.net/data".to_string(),
            pricing_base: "https://calculator.aws/pricing/2.0/meteredUnitMaps".to_string(),
            save_url: "https://dnd5zrqcec4or.cloudfront.net/Prod/v2/saveAs".to_string(),
            load_base: "https://d3knqfixx3sbls.cloudfront.net".to_string(),
            share_base: "https://calculator.aws/#/estimate?id=".to_string(),
        }
    }
}

impl Endpoints {
    pub fn definition_url(&self, service_code: &str) -> String {
        format!("{}/{}/en_US.json", self.definition_base, service_code)
    }

    /// Fallback pricing URL for definitions that do not list a mapping URL.
    pub fn default_pricing_url(&self, mapping_name: &str) -> String {
        format!(
            "{base}/{name}/{currency}/current/{name}.json",
            base = self.pricing_base,
            name = mapping_name,
            currency = CURRENCY,
        )
    }

    pub fn load_url(&self, estimate_id: &str) -> String {
        format!("{}/{}", self.load_base, estimate_id)
    }

    pub fn share_url(&self, saved_key: &str) -> String {
        format!("{}{}", self.share_base, saved_key)
    }
}
