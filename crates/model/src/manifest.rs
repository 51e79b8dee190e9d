//! The service manifest: the catalog of every service the calculator can
//! configure, with the keywords its search box matches against.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Manifest {
    pub aws_services: Vec<AwsService>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AwsService {
    pub name: String,
    pub service_code: String,
    pub slug: String,
    pub regions: Vec<String>,
    pub search_keywords: Vec<String>,
}

impl AwsService {
    /// Lowercased haystack the catalog search matches queries against.
    pub fn search_haystack(&self) -> String {
        let mut haystack = String::with_capacity(
            self.name.len()
                + self.service_code.len()
                + self.search_keywords.iter().map(String::len).sum::<usize>()
                + self.search_keywords.len()
                + 1,
        );
        haystack.push_str(&self.name);
        haystack.push(' ');
        haystack.push_str(&self.service_code);
        for keyword in &self.search_keywords {
            haystack.push(' ');
            haystack.push_str(keyword);
        }
        haystack.to_lowercase()
    }
}

/// Catalog search projection returned to the agent.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceHit {
    pub name: String,
    pub service_code: String,
    pub slug: String,
    pub region_count: usize,
}
