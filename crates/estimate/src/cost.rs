//! Cost orchestration: one service, its pricing tables, its sub-services.

use calc_client::{pricing, Fetcher};
use calc_engine::{build_calc_components, evaluate, extract_inputs};
use calc_model::{CalculationComponents, ServiceCost, ServiceDefinition};

/// Evaluate a service in one region, including its sub-services.
///
/// Each sub-service is evaluated with its own definition defaults in the
/// same region (user inputs never flow into sub-services) and the costs
/// are summed. Returns `None` when a sub-service definition cannot be
/// fetched; the caller treats that as zero-cost.
pub async fn calculate_service_cost(
    fetcher: &Fetcher,
    def: &ServiceDefinition,
    components: &CalculationComponents,
    region_name: &str,
) -> Option<ServiceCost> {
    let tables = pricing::load_price_tables(fetcher, def, region_name).await;
    let mut total = evaluate(def, components, &tables);

    for sub in &def.sub_services {
        let sub_def = match fetcher.service_definition(&sub.service_code).await {
            Ok(sub_def) => sub_def,
            Err(e) => {
                log::debug!("sub-service {} unavailable: {e}", sub.service_code);
                return None;
            }
        };
        let sub_fields = extract_inputs(&sub_def);
        let sub_components = build_calc_components(&sub_fields, &CalculationComponents::new());
        let sub_tables = pricing::load_price_tables(fetcher, &sub_def, region_name).await;
        total += evaluate(&sub_def, &sub_components, &sub_tables);
    }

    Some(total)
}
