//! HTTP access to the calculator's public document stores.
//!
//! One [`Fetcher`] owns the HTTP client and every per-process cache: the
//! single-slot service manifest, service definitions keyed by service code,
//! and pricing tables keyed by `(mapping name, region name)`. Nothing is
//! evicted during a process run; a failed first fetch leaves the slot empty
//! so the next call retries.

pub mod catalog;
mod endpoints;
mod error;
mod fetch;
pub mod pricing;

pub use endpoints::Endpoints;
pub use error::{ClientError, Result};
pub use fetch::Fetcher;
