use crate::charts::ChartOptions;
use crate::engine::FilterRequest;
use crate::errors::{DashError, DashResult};
use crate::prepare::{PrepareOptions, DEFAULT_REFERENCE_YEAR};
use miette::SourceSpan;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A dashboard file: where the listings live, what the sidebar is set to,
/// which charts to build and where results go.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardConfig {
    pub input: InputConfig,
    #[serde(default = "default_reference_year")]
    pub reference_year: i64,
    #[serde(default)]
    pub filters: FilterRequest,
    #[serde(default)]
    pub charts: ChartOptions,
    #[serde(default)]
    pub outputs: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InputConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OutputConfig {
    /// JSON report with sidebar state, chart data, metrics and lineage.
    pub report: Option<PathBuf>,
    /// Filtered table, `.csv` or `.parquet`.
    pub table: Option<PathBuf>,
}

fn default_reference_year() -> i64 {
    DEFAULT_REFERENCE_YEAR
}

impl DashboardConfig {
    pub fn from_yaml(text: &str) -> DashResult<Self> {
        serde_yaml::from_str(text).map_err(|e| {
            let span = e
                .location()
                .map(|loc| SourceSpan::from((loc.index(), 1)));
            DashError::ConfigError(e, span)
        })
    }

    /// Load a dashboard file. Relative paths inside it are taken from the file's directory.
    pub fn from_path<P: AsRef<Path>>(path: P) -> DashResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&text)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(config.resolve_paths(base))
    }

    pub fn resolve_paths(mut self, base: &Path) -> Self {
        let resolve = |p: PathBuf| if p.is_relative() { base.join(p) } else { p };
        self.input.path = resolve(self.input.path);
        self.outputs.report = self.outputs.report.map(resolve);
        self.outputs.table = self.outputs.table.map(resolve);
        self
    }

    pub fn prepare_options(&self) -> PrepareOptions {
        PrepareOptions {
            reference_year: self.reference_year,
        }
    }
}
