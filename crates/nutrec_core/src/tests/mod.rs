//! Integration tests for the nutrient recovery pipeline
//!
//! Tests are organized by topic:
//! - `fixtures` - Reference parameter and material catalogs
//! - `pipeline` - Sampling through result sheets on an in-memory store
//! - `alignment` - Iteration-index join failures between stages
//! - `financing` - Subsidized versus unsubsidized break-even prices
//! - `rate_of_return` - Root-finder behaviour across whole runs
//! - `summary` - Cross-scenario statistics from records and from sheets

mod alignment;
mod financing;
mod pipeline;
mod rate_of_return;
