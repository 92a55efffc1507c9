use crate::errors::DashResult;
use crate::filter::{
    self, FilterParams, FilterPipeline, PriceRange, TypeSelection, YearRange,
};
use crate::prepare::{DatasetPreparer, PrepareOptions};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// What the user picked in the sidebar. Unset ranges fall back to the slider bounds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterRequest {
    #[serde(default, rename = "type")]
    pub selected_type: TypeSelection,
    #[serde(default)]
    pub price_range: Option<PriceRange>,
    #[serde(default)]
    pub year_range: Option<YearRange>,
}

/// Sidebar state after one pass: the choices offered and the ranges applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sidebar {
    pub type_options: Vec<String>,
    pub selected_type: TypeSelection,
    pub price_bounds: Option<PriceRange>,
    pub price_range: Option<PriceRange>,
    pub year_bounds: Option<YearRange>,
    pub year_range: Option<YearRange>,
}

impl Sidebar {
    /// The effective filter, if both sliders could be built.
    pub fn params(&self) -> Option<FilterParams> {
        Some(FilterParams {
            selected_type: self.selected_type.clone(),
            price_range: self.price_range?,
            year_range: self.year_range?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct DashboardView {
    pub sidebar: Sidebar,
    pub table: DataFrame,
}

/// Cleaned listings plus the narrowing passes run against them.
pub struct Dashboard {
    base: DataFrame,
}

impl Dashboard {
    pub fn new(base: DataFrame) -> Self {
        Self { base }
    }

    pub fn from_path<P: AsRef<Path>>(path: P, options: PrepareOptions) -> DashResult<Self> {
        let base = DatasetPreparer::new(options).load(path)?;
        Ok(Self::new(base))
    }

    pub fn base(&self) -> &DataFrame {
        &self.base
    }

    /// Run the sidebar top to bottom.
    ///
    /// Price bounds come from the type-filtered rows and year bounds from the
    /// type- and price-filtered rows, so each slider only offers values the
    /// previous selections left behind.
    pub fn render(&self, request: &FilterRequest) -> DashResult<DashboardView> {
        let type_options = filter::type_options(&self.base)?;

        let typed = FilterPipeline::by_type(&self.base, &request.selected_type)?;
        let price_bounds = filter::price_bounds(&typed)?;
        let price_range = request.price_range.or(price_bounds);
        let priced = match &price_range {
            Some(range) => FilterPipeline::by_price(&typed, range)?,
            None => typed,
        };

        let year_bounds = filter::year_bounds(&priced)?;
        let year_range = request.year_range.or(year_bounds);
        let table = match &year_range {
            Some(range) => FilterPipeline::by_year(&priced, range)?,
            None => priced,
        };

        debug!(
            "Sidebar pass: type={} price={:?} year={:?} -> {} rows",
            request.selected_type,
            price_range,
            year_range,
            table.height()
        );

        Ok(DashboardView {
            sidebar: Sidebar {
                type_options,
                selected_type: request.selected_type.clone(),
                price_bounds,
                price_range,
                year_bounds,
                year_range,
            },
            table,
        })
    }
}
