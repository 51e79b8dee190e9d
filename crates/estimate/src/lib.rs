//! Estimate assembly and retrieval.
//!
//! [`create_estimate`] merges user inputs with definition defaults,
//! auto-calculates costs through the engine, assembles the persisted
//! document and drives the save/retry protocol. [`load_estimate`] fetches a
//! stored estimate back and projects a readable summary.

mod assemble;
mod cost;
mod error;
mod load;

pub use assemble::{create_estimate, SavedEstimate, ServiceSpec};
pub use cost::calculate_service_cost;
pub use error::{EstimateError, Result};
pub use load::{extract_estimate_id, load_estimate, EstimateSummary, LoadedEstimate, ServiceRow};
