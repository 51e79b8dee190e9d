//! Shared data model for the AWS Pricing Calculator MCP server.
//!
//! Everything here mirrors the wire shapes of the calculator's public
//! documents: service definitions (the recursive component tree), the
//! service manifest, per-region pricing tables, extracted input schemas,
//! and the persisted estimate document.

mod definition;
mod estimate;
mod manifest;
pub mod regions;
mod schema;

pub use definition::{
    Card, ChoiceOption, Component, MappingDefinition, MeteredUnit, RadioGroup, Refer, Replacement,
    Section, ServiceDefinition, SubServiceRef, Template, TierDef, Tiers,
};
pub use estimate::{
    CalculationComponents, EstimateDocument, EstimateGroup, MetaData, ServiceCost, ServiceEntry,
};
pub use manifest::{AwsService, Manifest, ServiceHit};
pub use schema::{FieldOption, InputField, RadioGroupSchema, ServiceSchema, TemplateInfo};

use std::collections::HashMap;

/// Metered-unit name to USD price for one mapping definition in one region.
pub type PriceTable = HashMap<String, f64>;

/// Mapping-definition name to its regional price table.
pub type PriceTables = HashMap<String, PriceTable>;
