//! Keyword search over the service manifest.

use calc_model::{Manifest, ServiceHit};

const MAX_RESULTS: usize = 15;

/// Case-insensitive substring match against each service's name, service
/// code and search keywords. Manifest order is preserved; the first 15
/// matches are returned.
pub fn search(manifest: &Manifest, query: &str) -> Vec<ServiceHit> {
    let needle = query.trim().to_lowercase();
    manifest
        .aws_services
        .iter()
        .filter(|service| service.search_haystack().contains(&needle))
        .take(MAX_RESULTS)
        .map(|service| ServiceHit {
            name: service.name.trim().to_string(),
            service_code: service.service_code.clone(),
            slug: service.slug.clone(),
            region_count: service.regions.len(),
        })
        .collect()
}
