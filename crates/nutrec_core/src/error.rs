use std::fmt;

/// Errors raised while validating configuration or distribution specs.
///
/// These abort a run before any sampling happens.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    NegativeWidth {
        label: String,
        width: f64,
    },
    PeakFractionOutOfRange {
        label: String,
        peak_fraction: f64,
    },
    MissingPeakFraction {
        label: String,
    },
    NonFiniteParameter {
        label: String,
        field: &'static str,
    },
    /// The sampling back-end rejected the parameters
    InvalidDistribution {
        label: String,
        reason: String,
    },
    DuplicateLabel {
        group: String,
        label: String,
    },
    EmptyGroup(String),
    ZeroSampleCount,
    /// A model setting is outside its valid domain
    InvalidSetting {
        setting: &'static str,
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NegativeWidth { label, width } => {
                write!(f, "parameter '{label}' has negative width {width}")
            }
            ConfigError::PeakFractionOutOfRange {
                label,
                peak_fraction,
            } => write!(
                f,
                "parameter '{label}' has peak fraction {peak_fraction} outside [0, 1]"
            ),
            ConfigError::MissingPeakFraction { label } => {
                write!(f, "triangular parameter '{label}' has no peak fraction")
            }
            ConfigError::NonFiniteParameter { label, field } => {
                write!(f, "parameter '{label}' has a non-finite {field}")
            }
            ConfigError::InvalidDistribution { label, reason } => {
                write!(f, "parameter '{label}' cannot be sampled: {reason}")
            }
            ConfigError::DuplicateLabel { group, label } => {
                write!(f, "parameter '{label}' appears twice in group '{group}'")
            }
            ConfigError::EmptyGroup(group) => write!(f, "parameter group '{group}' is empty"),
            ConfigError::ZeroSampleCount => write!(f, "sample count must be at least 1"),
            ConfigError::InvalidSetting { setting, reason } => {
                write!(f, "invalid setting {setting}: {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Errors from a tabular data store back-end
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    MissingTable(String),
    MissingColumn { table: String, column: String },
    /// Rows passed to `write` do not match the declared column count
    RaggedRows {
        table: String,
        sheet: String,
        expected: usize,
        found: usize,
    },
    /// Columns handed to `Table::from_columns` differ in length
    UnequalColumns {
        column: String,
        expected: usize,
        found: usize,
    },
    Io(String),
    Parse(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::MissingTable(table) => write!(f, "table '{table}' not found"),
            StoreError::MissingColumn { table, column } => {
                write!(f, "column '{column}' not found in table '{table}'")
            }
            StoreError::RaggedRows {
                table,
                sheet,
                expected,
                found,
            } => write!(
                f,
                "row in {table}/{sheet} has {found} values, expected {expected}"
            ),
            StoreError::UnequalColumns {
                column,
                expected,
                found,
            } => write!(f, "column '{column}' has {found} values, expected {expected}"),
            StoreError::Io(msg) => write!(f, "IO error: {msg}"),
            StoreError::Parse(msg) => write!(f, "parse error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// A stage received rows that cannot be joined by iteration index.
///
/// The iteration index is the only join key between stages, so this is fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlignmentError {
    RowCount {
        table: String,
        column: String,
        expected: usize,
        found: usize,
    },
    Misordered {
        table: String,
        row: usize,
        iteration: usize,
    },
}

impl fmt::Display for AlignmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlignmentError::RowCount {
                table,
                column,
                expected,
                found,
            } => write!(
                f,
                "column '{column}' of table '{table}' has {found} rows, expected {expected}"
            ),
            AlignmentError::Misordered {
                table,
                row,
                iteration,
            } => write!(
                f,
                "table '{table}' row {row} carries iteration {iteration}; rows must be in iteration order"
            ),
        }
    }
}

impl std::error::Error for AlignmentError {}

/// Per-scenario numerical degeneracy.
///
/// Recorded on the scenario's row; never aborts the batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericalIssue {
    /// Discounted nutrient mass is zero, so no price can break even
    NoRecoveredNutrients,
    /// Root finder hit its iteration cap
    NonConvergence { iterations: usize, residual: f64 },
    /// An intermediate value became NaN or infinite
    NonFinite(&'static str),
    /// Discounted cash flow keeps one sign at every rate for this price
    NoRateOfReturn { price: f64, residual: f64 },
}

impl NumericalIssue {
    /// Short stable code used in output tables
    #[must_use]
    pub fn code(&self) -> f64 {
        match self {
            NumericalIssue::NoRecoveredNutrients => 1.0,
            NumericalIssue::NonConvergence { .. } => 2.0,
            NumericalIssue::NonFinite(_) => 3.0,
            NumericalIssue::NoRateOfReturn { .. } => 4.0,
        }
    }
}

impl fmt::Display for NumericalIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericalIssue::NoRecoveredNutrients => {
                write!(f, "no nutrients recovered; break-even price undefined")
            }
            NumericalIssue::NonConvergence {
                iterations,
                residual,
            } => write!(
                f,
                "root finder did not converge after {iterations} iterations (residual {residual:e})"
            ),
            NumericalIssue::NonFinite(what) => write!(f, "{what} is not finite"),
            NumericalIssue::NoRateOfReturn { price, residual } => write!(
                f,
                "no rate of return balances the cash flow at {price} USD/kg (residual {residual:e})"
            ),
        }
    }
}

impl std::error::Error for NumericalIssue {}

/// Errors that abort a whole pipeline run
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    Config(ConfigError),
    Store(StoreError),
    Alignment(AlignmentError),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Config(e) => write!(f, "configuration error: {e}"),
            PipelineError::Store(e) => write!(f, "data store error: {e}"),
            PipelineError::Alignment(e) => write!(f, "alignment error: {e}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Config(e) => Some(e),
            PipelineError::Store(e) => Some(e),
            PipelineError::Alignment(e) => Some(e),
        }
    }
}

impl From<ConfigError> for PipelineError {
    fn from(e: ConfigError) -> Self {
        PipelineError::Config(e)
    }
}

impl From<StoreError> for PipelineError {
    fn from(e: StoreError) -> Self {
        PipelineError::Store(e)
    }
}

impl From<AlignmentError> for PipelineError {
    fn from(e: AlignmentError) -> Self {
        PipelineError::Alignment(e)
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
