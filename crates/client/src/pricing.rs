//! Pricing-table resolution for one service definition in one region.

use crate::endpoints::CURRENCY;
use crate::fetch::Fetcher;
use calc_model::{PriceTables, ServiceDefinition};
use futures::future::join_all;

/// Every mapping-definition name referenced by pricing components, in
/// depth-first order of first appearance across the template tree.
pub fn collect_mapping_names(def: &ServiceDefinition) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    def.visit_components(&mut |component| {
        if let Some(name) = &component.mapping_definition_name {
            if !name.is_empty() && !names.iter().any(|n| n == name) {
                names.push(name.clone());
            }
        }
    });
    names
}

/// Resolve and fetch every pricing table the definition references, all
/// launched together. Unresolved names and fetch failures surface as empty
/// tables; the evaluator treats missing units as price 0.
pub async fn load_price_tables(
    fetcher: &Fetcher,
    def: &ServiceDefinition,
    region_name: &str,
) -> PriceTables {
    let names = collect_mapping_names(def);
    let fetches = names.iter().map(|name| {
        let url = resolve_mapping_url(fetcher, def, name);
        async move { (name.clone(), fetcher.price_table(name, &url, region_name).await) }
    });
    join_all(fetches)
        .await
        .into_iter()
        .map(|(name, table)| (name, (*table).clone()))
        .collect()
}

fn resolve_mapping_url(fetcher: &Fetcher, def: &ServiceDefinition, name: &str) -> String {
    match def.mapping_url(name) {
        Some(template) => template.replace("[currency]", CURRENCY),
        None => fetcher.endpoints().default_pricing_url(name),
    }
}
