//! Techno-economic uncertainty analysis of urine-diverting sanitation
//!
//! This crate runs a Monte Carlo pipeline that prices nutrient recovery from
//! source-separated urine. It supports:
//! - Uniform and triangular parameter sampling (random or Latin hypercube)
//! - Per-capita N, P and K excretion from diet, with stage losses
//! - Bill-of-materials costing of toilets, tanks and treatment units
//! - Struvite precipitation and ion-exchange sizing and costing
//! - Break-even fertilizer prices from a discounted cash flow
//! - Rate-of-return curves over a grid of candidate prices
//!
//! Every stage reads and writes column tables through a [`store::TableStore`],
//! joined on the `iteration` column.
//!
//! ```ignore
//! use nutrec_core::{AnalysisConfig, MemoryStore, sample_and_run};
//!
//! let mut store = MemoryStore::new();
//! let output = sample_and_run(&mut store, &catalog, &AnalysisConfig::default(), &materials)?;
//! println!("{}", RunSummary::from_output(&output));
//! ```

#![warn(clippy::all)]

// ============================================================================
// Model stages
// ============================================================================

pub mod capital;
pub mod dcf;
pub mod market;
pub mod nutrients;
pub mod recovery;
pub mod ror;
pub mod sizing;
pub mod systems;

// ============================================================================
// Orchestration
// ============================================================================

pub mod inputs;
pub mod pipeline;
pub mod sampling;
pub mod store;
pub mod summary;

// ============================================================================
// Type definition modules
// ============================================================================

pub mod config;
pub mod error;
pub mod model;
pub mod schema;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use capital::MaterialCatalog;
pub use config::AnalysisConfig;
pub use error::{PipelineError, Result};
pub use pipeline::{PipelineOutput, run_pipeline, sample_and_run, sample_into};
pub use sampling::ParameterCatalog;
pub use store::{MemoryStore, TableStore};
pub use summary::RunSummary;
