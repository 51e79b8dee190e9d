//! MCP tools for the AWS Pricing Calculator.
//!
//! Thin adapters over the catalog, engine and estimate crates: parse the
//! request, orchestrate the fetches, serialize the result as pretty JSON
//! text content.

use calc_client::Fetcher;
use calc_estimate as estimate;
use calc_model::{
    regions, CalculationComponents, ServiceCost, ServiceHit, ServiceSchema, TemplateInfo,
};
use rmcp::handler::server::tool::{Parameters, ToolRouter};
use rmcp::model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo};
use rmcp::schemars;
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

pub mod catalog;

const DEFAULT_REGION: &str = "us-east-1";

/// Calculator MCP Service
#[derive(Clone)]
pub struct CalculatorService {
    fetcher: Arc<Fetcher>,
    /// Tool router
    tool_router: ToolRouter<Self>,
}

impl CalculatorService {
    pub fn new() -> Self {
        Self::with_fetcher(Arc::new(Fetcher::new()))
    }

    pub fn with_fetcher(fetcher: Arc<Fetcher>) -> Self {
        Self {
            fetcher,
            tool_router: Self::tool_router(),
        }
    }
}

impl Default for CalculatorService {
    fn default() -> Self {
        Self::new()
    }
}

#[tool_handler]
impl ServerHandler for CalculatorService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(catalog::tool_instructions()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            ..Default::default()
        }
    }
}

fn success<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(value).unwrap_or_default(),
    )]))
}

fn failure(error: impl std::fmt::Display) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::error(vec![Content::text(format!(
        "Error: {error}"
    ))]))
}

// ============================================================================
// Tool Input/Output Schemas
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchServicesRequest {
    /// Search query
    #[schemars(description = "Name, keyword or service code fragment, e.g. 'lambda' or 'object storage'")]
    pub query: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchServicesResult {
    query: String,
    count: usize,
    services: Vec<ServiceHit>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetServiceSchemaRequest {
    /// Service code from search_services
    #[schemars(description = "Service code, e.g. 'awsLambda' or 'amazonS3'")]
    pub service_code: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfigureServiceRequest {
    /// Service code from search_services
    #[schemars(description = "Service code, e.g. 'awsLambda'")]
    pub service_code: String,

    /// AWS region code (default: us-east-1)
    #[schemars(description = "Region code, e.g. 'us-east-1' or 'eu-west-1'")]
    pub region: Option<String>,

    /// Input values keyed by field id from get_service_schema
    #[schemars(
        description = "Input values keyed by field id; option labels, plain values or {value, unit} records"
    )]
    pub inputs: Option<CalculationComponents>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfigureServiceResult {
    service_name: String,
    service_code: String,
    region: String,
    region_name: String,
    monthly_cost: f64,
    upfront_cost: f64,
    calculation_components: CalculationComponents,
    #[serde(skip_serializing_if = "Option::is_none")]
    template_id: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEstimateRequest {
    /// Estimate name
    #[schemars(description = "Name shown on the saved estimate")]
    pub name: String,

    /// Services to include
    #[schemars(description = "Services to include in the estimate")]
    pub services: Vec<ServiceSpecRequest>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSpecRequest {
    /// Service code from search_services
    #[schemars(description = "Service code, e.g. 'amazonS3'")]
    pub service_code: String,

    /// AWS region code (default: us-east-1)
    #[schemars(description = "Region code, e.g. 'us-east-1'")]
    pub region: Option<String>,

    /// Region display name override
    #[schemars(description = "Region display name, e.g. 'US East (N. Virginia)'")]
    pub region_name: Option<String>,

    /// Display name for the service row
    #[schemars(description = "Service display name")]
    pub service_name: String,

    /// Optional row description
    #[schemars(description = "Free-form description for the service row")]
    pub description: Option<String>,

    /// Monthly cost; omit or 0 to auto-calculate from the inputs
    #[schemars(description = "Monthly cost in USD; omitted or 0 triggers auto-calculation")]
    pub monthly_cost: Option<f64>,

    /// Upfront cost
    #[schemars(description = "Upfront cost in USD")]
    pub upfront_cost: Option<f64>,

    /// Configuration summary shown in the calculator UI
    #[schemars(description = "Configuration summary text")]
    pub config_summary: Option<String>,

    /// Input values keyed by field id
    #[schemars(description = "Input values keyed by field id from get_service_schema")]
    pub calculation_components: Option<CalculationComponents>,

    /// Template id (default: the definition's first template)
    #[schemars(description = "Template id from get_service_schema")]
    pub template_id: Option<String>,

    /// Group name for organizing services within the estimate
    #[schemars(description = "Group name; services sharing a name land in one group")]
    pub group: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateEstimateResult {
    message: String,
    name: String,
    url: String,
    saved_key: String,
    total_cost: ServiceCost,
    service_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoadEstimateRequest {
    /// Estimate id or share link
    #[schemars(description = "Estimate id or share link, e.g. 'https://calculator.aws/#/estimate?id=…'")]
    pub estimate_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoadEstimateResult {
    estimate_id: String,
    summary: String,
    details: estimate::EstimateSummary,
    document: Value,
}

// ============================================================================
// Tool Implementations
// ============================================================================

#[tool_router]
impl CalculatorService {
    /// Search the service catalog
    #[tool(
        description = "Search the AWS service catalog by name or keyword. Returns up to 15 services with the serviceCode the other tools expect. Use this first."
    )]
    pub async fn search_services(
        &self,
        Parameters(request): Parameters<SearchServicesRequest>,
    ) -> Result<CallToolResult, McpError> {
        let manifest = match self.fetcher.manifest().await {
            Ok(manifest) => manifest,
            Err(e) => return failure(e),
        };
        let services = calc_client::catalog::search(&manifest, &request.query);
        success(&SearchServicesResult {
            query: request.query,
            count: services.len(),
            services,
        })
    }

    /// Input schema for one service
    #[tool(
        description = "Get a service's configuration schema: input fields with types, defaults, options and units, plus templates and sub-services. Required before configure_service for non-trivial services."
    )]
    pub async fn get_service_schema(
        &self,
        Parameters(request): Parameters<GetServiceSchemaRequest>,
    ) -> Result<CallToolResult, McpError> {
        match self.service_schema(&request.service_code).await {
            Ok(schema) => success(&schema),
            Err(e) => failure(e),
        }
    }

    /// Configure a service and compute its cost
    #[tool(
        description = "Normalize input values against a service's schema and compute its monthly/upfront cost for a region. Returns the calculationComponents ready for create_estimate."
    )]
    pub async fn configure_service(
        &self,
        Parameters(request): Parameters<ConfigureServiceRequest>,
    ) -> Result<CallToolResult, McpError> {
        let region = request
            .region
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        let def = match self.fetcher.service_definition(&request.service_code).await {
            Ok(def) => def,
            Err(e) => return failure(e),
        };

        let region_name = regions::display_name_or_code(&region);
        let fields = calc_engine::extract_inputs(&def);
        let user_inputs = request.inputs.unwrap_or_default();
        let components = calc_engine::build_calc_components(&fields, &user_inputs);

        let cost = estimate::calculate_service_cost(&self.fetcher, &def, &components, &region_name)
            .await
            .unwrap_or(ServiceCost::ZERO);

        success(&ConfigureServiceResult {
            service_name: if def.service_name.is_empty() {
                request.service_code.clone()
            } else {
                def.service_name.clone()
            },
            service_code: request.service_code,
            region,
            region_name,
            monthly_cost: cost.monthly,
            upfront_cost: cost.upfront,
            calculation_components: components,
            template_id: def
                .templates
                .first()
                .map(|t| t.id.clone())
                .filter(|id| !id.is_empty()),
        })
    }

    /// Persist a multi-service estimate
    #[tool(
        description = "Assemble a multi-service estimate, save it to the calculator and return the shareable link. Services with monthlyCost 0 are auto-calculated from their calculationComponents."
    )]
    pub async fn create_estimate(
        &self,
        Parameters(request): Parameters<CreateEstimateRequest>,
    ) -> Result<CallToolResult, McpError> {
        if request.services.is_empty() {
            return failure("at least one service is required");
        }
        let specs = request.services.into_iter().map(into_spec).collect();
        match estimate::create_estimate(&self.fetcher, &request.name, specs).await {
            Ok(saved) => {
                let message = format!(
                    "Saved estimate '{}' ({} service(s), {:.2} USD monthly, {:.2} USD upfront): {}",
                    saved.name,
                    saved.service_count,
                    saved.total_cost.monthly,
                    saved.total_cost.upfront,
                    saved.url,
                );
                success(&CreateEstimateResult {
                    message,
                    name: saved.name,
                    url: saved.url,
                    saved_key: saved.saved_key,
                    total_cost: saved.total_cost,
                    service_count: saved.service_count,
                    warnings: saved.warnings,
                })
            }
            Err(e) => failure(e),
        }
    }

    /// Load a stored estimate
    #[tool(
        description = "Load a previously saved estimate by id or share link. Returns a summary plus the full stored document."
    )]
    pub async fn load_estimate(
        &self,
        Parameters(request): Parameters<LoadEstimateRequest>,
    ) -> Result<CallToolResult, McpError> {
        match estimate::load_estimate(&self.fetcher, &request.estimate_id).await {
            Ok(loaded) => success(&LoadEstimateResult {
                estimate_id: loaded.estimate_id.clone(),
                summary: loaded.summary_text(),
                details: loaded.summary,
                document: loaded.document,
            }),
            Err(e) => failure(e),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn into_spec(request: ServiceSpecRequest) -> estimate::ServiceSpec {
    estimate::ServiceSpec {
        service_code: request.service_code,
        region: request
            .region
            .unwrap_or_else(|| DEFAULT_REGION.to_string()),
        region_name: request.region_name,
        service_name: request.service_name,
        description: request.description,
        monthly_cost: request.monthly_cost.unwrap_or(0.0),
        upfront_cost: request.upfront_cost.unwrap_or(0.0),
        config_summary: request.config_summary,
        calculation_components: request.calculation_components,
        template_id: request.template_id,
        group: request.group,
    }
}

impl CalculatorService {
    /// Schema for a service plus best-effort schemas for its sub-services.
    async fn service_schema(
        &self,
        service_code: &str,
    ) -> Result<ServiceSchema, calc_client::ClientError> {
        let def = self.fetcher.service_definition(service_code).await?;
        let inputs = calc_engine::extract_inputs(&def);

        let mut sub_services = Vec::new();
        for sub in &def.sub_services {
            match self.fetcher.service_definition(&sub.service_code).await {
                Ok(sub_def) => sub_services.push(ServiceSchema {
                    service_code: sub.service_code.clone(),
                    service_name: pick_name(&sub_def.service_name, &sub.name, &sub.service_code),
                    version: sub_def.version.clone(),
                    layout: sub_def.layout.clone(),
                    templates: template_infos(&sub_def.templates),
                    inputs: calc_engine::extract_inputs(&sub_def),
                    sub_services: Vec::new(),
                    notes: Vec::new(),
                }),
                Err(e) => {
                    log::debug!("sub-service {} schema unavailable: {e}", sub.service_code);
                    sub_services.push(ServiceSchema {
                        service_code: sub.service_code.clone(),
                        service_name: pick_name("", &sub.name, &sub.service_code),
                        version: String::new(),
                        layout: String::new(),
                        templates: Vec::new(),
                        inputs: Vec::new(),
                        sub_services: Vec::new(),
                        notes: vec!["Definition could not be fetched; inputs unavailable.".to_string()],
                    });
                }
            }
        }

        let mut notes = Vec::new();
        if def.layout == "loader" && inputs.is_empty() {
            notes.push(
                "This service uses a dynamic loader layout; its inputs are assembled at runtime \
                 and cannot be listed here. Supply calculationComponents directly or set a fixed \
                 monthlyCost when adding it to an estimate."
                    .to_string(),
            );
        }

        Ok(ServiceSchema {
            service_code: service_code.to_string(),
            service_name: pick_name(&def.service_name, "", service_code),
            version: def.version.clone(),
            layout: def.layout.clone(),
            templates: template_infos(&def.templates),
            inputs,
            sub_services,
            notes,
        })
    }
}

fn template_infos(templates: &[calc_model::Template]) -> Vec<TemplateInfo> {
    templates
        .iter()
        .map(|t| TemplateInfo {
            id: t.id.clone(),
            title: t.title.clone(),
        })
        .collect()
}

fn pick_name(primary: &str, secondary: &str, fallback: &str) -> String {
    if !primary.trim().is_empty() {
        primary.trim().to_string()
    } else if !secondary.trim().is_empty() {
        secondary.trim().to_string()
    } else {
        fallback.to_string()
    }
}
