use crate::charts::ChartSet;
use crate::config::DashboardConfig;
use crate::engine::{Dashboard, Sidebar};
use crate::errors::{DashError, DashResult};
use crate::filter::{PriceRange, TypeSelection, YearRange};
use crate::io;
use crate::observability::{InputFileStats, Lineage, Metrics};
use crate::prepare::PrepareOptions;
use crate::validate::{self, ValidationReport};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{info, warn};
use uuid::Uuid;

/// Command-line values that take precedence over the dashboard file.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub selected_type: Option<TypeSelection>,
    pub price_range: Option<PriceRange>,
    pub year_range: Option<YearRange>,
    pub reference_year: Option<i64>,
}

impl RunOverrides {
    pub fn apply(self, mut config: DashboardConfig) -> DashboardConfig {
        if let Some(selected_type) = self.selected_type {
            config.filters.selected_type = selected_type;
        }
        if self.price_range.is_some() {
            config.filters.price_range = self.price_range;
        }
        if self.year_range.is_some() {
            config.filters.year_range = self.year_range;
        }
        if let Some(year) = self.reference_year {
            config.reference_year = year;
        }
        config
    }
}

#[derive(Debug, Serialize)]
pub struct DashboardReport {
    pub run_id: String,
    pub lineage: Lineage,
    pub metrics: Metrics,
    pub validation: ValidationReport,
    pub sidebar: Sidebar,
    pub charts: ChartSet,
}

pub fn execution_pipeline(
    path: &Path,
    run_id: Uuid,
    overrides: RunOverrides,
) -> DashResult<DashboardReport> {
    info!("Loading dashboard from {:?}", path);
    let config = overrides.apply(DashboardConfig::from_path(path)?);
    run_dashboard(&config, run_id)
}

/// One full pass: load, clean, sidebar, filter, charts, outputs.
pub fn run_dashboard(config: &DashboardConfig, run_id: Uuid) -> DashResult<DashboardReport> {
    let mut metrics = Metrics::new();

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .map_err(|e| DashError::Unknown(e.into()))?,
    );

    pb.set_message("Loading listings...");
    let dashboard = metrics.time("load", || {
        Dashboard::from_path(&config.input.path, config.prepare_options())
    })?;
    metrics.rows_cleaned = dashboard.base().height();

    pb.set_message("Checking invariants...");
    let validation = metrics.time("validate", || {
        validate::check_prepared(dashboard.base(), config.reference_year)
    })?;
    for violation in &validation.violations {
        warn!("{}", violation.message);
    }

    pb.set_message("Applying filters...");
    let view = metrics.time("filter", || dashboard.render(&config.filters))?;
    metrics.rows_shown = view.table.height();
    info!(
        "Showing {} of {} listings (type={})",
        view.table.height(),
        dashboard.base().height(),
        view.sidebar.selected_type
    );

    pb.set_message("Building charts...");
    let charts = metrics.time("charts", || ChartSet::build(&view.table, &config.charts))?;

    let mut outputs = Vec::new();
    if let Some(table_path) = &config.outputs.table {
        info!("Writing filtered listings to: {:?}", table_path);
        metrics.time("write_table", || io::write_table(&view.table, table_path))?;
        outputs.push(table_path.display().to_string());
    }
    if let Some(report_path) = &config.outputs.report {
        outputs.push(report_path.display().to_string());
    }

    metrics.finish();
    let report = DashboardReport {
        run_id: run_id.to_string(),
        lineage: Lineage {
            run_id: run_id.to_string(),
            timestamp: Utc::now(),
            input: InputFileStats::collect(&config.input.path)?,
            outputs,
        },
        metrics,
        validation,
        sidebar: view.sidebar,
        charts,
    };

    if let Some(report_path) = &config.outputs.report {
        info!("Writing report to: {:?}", report_path);
        write_report(&report, report_path)?;
    }

    pb.finish_with_message("Dashboard ready.");
    info!("Dashboard completed successfully.");
    Ok(report)
}

pub fn write_report(report: &DashboardReport, path: &Path) -> DashResult<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), report).map_err(std::io::Error::from)?;
    Ok(())
}

/// Clean a listings file and show the untouched sidebar for it.
pub fn inspect(path: &Path, options: PrepareOptions) -> DashResult<(usize, Sidebar)> {
    let dashboard = Dashboard::from_path(path, options)?;
    let view = dashboard.render(&Default::default())?;
    Ok((dashboard.base().height(), view.sidebar))
}
