//! YAML analysis files
//!
//! One file holds everything a run needs:
//!
//! ```yaml
//! analysis:
//!   samples: 10000
//!   seed: 42
//! parameters:
//!   groups:
//!     - name: DCA_parameters
//!       parameters:
//!         - { label: income_tax, kind: triangular, minimum: 0.0, width: 0.3, peak_fraction: 0.5 }
//! materials:
//!   items: [D402, D403, D406]
//!   materials:
//!     - { label: cement, unit: bag, quantities: { D402: 1, D406: 8 } }
//! ```

use std::fs;
use std::path::Path;

use nutrec_core::{AnalysisConfig, MaterialCatalog, ParameterCatalog};
use serde::{Deserialize, Serialize};

/// Error types for analysis file operations
#[derive(Debug)]
pub enum ConfigFileError {
    Io(String),
    Parse(String),
    Serialize(String),
}

impl std::fmt::Display for ConfigFileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigFileError::Io(msg) => write!(f, "IO error: {}", msg),
            ConfigFileError::Parse(msg) => write!(f, "Parse error: {}", msg),
            ConfigFileError::Serialize(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigFileError {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisFile {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    pub parameters: ParameterCatalog,
    pub materials: MaterialCatalog,
}

impl AnalysisFile {
    /// Load from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_saphyr::Error> {
        serde_saphyr::from_str(yaml)
    }

    /// Save to YAML string
    pub fn to_yaml(&self) -> Result<String, serde_saphyr::ser::Error> {
        serde_saphyr::to_string(self)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigFileError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigFileError::Io(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let file = Self::from_yaml(&content).map_err(|e| {
            ConfigFileError::Parse(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        tracing::info!(
            path = %path.display(),
            groups = file.parameters.groups.len(),
            materials = file.materials.materials.len(),
            "Analysis file loaded"
        );
        Ok(file)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigFileError> {
        let yaml = self
            .to_yaml()
            .map_err(|e| ConfigFileError::Serialize(format!("Failed to serialize analysis: {}", e)))?;
        fs::write(path, yaml)
            .map_err(|e| ConfigFileError::Io(format!("Failed to write {}: {}", path.display(), e)))
    }

    /// Apply command-line overrides
    pub fn with_overrides(mut self, samples: Option<usize>, seed: Option<u64>) -> Self {
        if let Some(samples) = samples {
            self.analysis.samples = samples;
        }
        if let Some(seed) = seed {
            self.analysis.seed = seed;
        }
        self
    }
}
