//! Command-line front end for the nutrient recovery analysis
//!
//! Loads a YAML analysis file, keeps every sample and result sheet as CSV
//! under an output directory and logs to `<output>/nutrec.log`.

pub mod config;
pub mod logging;
pub mod store;

pub use config::{AnalysisFile, ConfigFileError};
pub use logging::init_logging;
pub use store::CsvStore;
