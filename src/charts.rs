//! Chart data for the dashboard's fixed chart set.
//!
//! Rendering belongs to whoever draws the page; this module only derives the
//! series each chart plots from the filtered view.

use crate::errors::{DashError, DashResult};
use crate::prepare::{AGE, CONDITION, FUEL, PRICE, TRANSMISSION, UNKNOWN};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_HISTOGRAM_BINS: usize = 50;
pub const DEFAULT_PREVIEW_ROWS: usize = 5;

/// Which charts to build. Defaults mirror the dashboard's initial checkboxes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChartOptions {
    /// Text preview of the first `preview_rows` filtered rows. The full
    /// filtered table is written through `outputs.table`.
    pub raw_preview: bool,
    pub preview_rows: usize,
    pub price_histogram: bool,
    pub histogram_bins: usize,
    pub age_vs_price: bool,
    pub automatic_only: bool,
    pub avg_price_by_fuel: bool,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            raw_preview: false,
            preview_rows: DEFAULT_PREVIEW_ROWS,
            price_histogram: true,
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
            age_vs_price: true,
            automatic_only: false,
            avg_price_by_fuel: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScatterPoint {
    pub age: i64,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScatterSeries {
    pub name: String,
    pub points: Vec<ScatterPoint>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FuelPrice {
    pub fuel: String,
    pub mean_price: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ChartSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_histogram: Option<Vec<HistogramBin>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_vs_price: Option<Vec<ScatterSeries>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub automatic_only: Option<Vec<ScatterPoint>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_price_by_fuel: Option<Vec<FuelPrice>>,
}

impl ChartSet {
    pub fn build(view: &DataFrame, options: &ChartOptions) -> DashResult<Self> {
        let mut charts = ChartSet::default();
        if options.raw_preview {
            charts.raw_preview = Some(format!("{}", view.head(Some(options.preview_rows))));
        }
        if options.price_histogram {
            charts.price_histogram = Some(price_histogram(view, options.histogram_bins)?);
        }
        if options.age_vs_price {
            charts.age_vs_price = Some(age_vs_price_by_condition(view)?);
        }
        if options.automatic_only {
            charts.automatic_only = Some(automatic_age_vs_price(view)?);
        }
        if options.avg_price_by_fuel {
            charts.avg_price_by_fuel = Some(mean_price_by_fuel(view)?);
        }
        Ok(charts)
    }
}

/// Equal-width bins over [min, max] of price; the last bin is closed on the right.
pub fn price_histogram(view: &DataFrame, bins: usize) -> DashResult<Vec<HistogramBin>> {
    if bins == 0 {
        return Err(DashError::InvalidFilter(
            "Histogram needs at least one bin".to_string(),
        ));
    }
    let prices: Vec<f64> = view.column(PRICE)?.f64()?.into_iter().flatten().collect();
    let (min, max) = match prices.iter().copied().fold(None, |acc, p| match acc {
        None => Some((p, p)),
        Some((lo, hi)) => Some((f64::min(lo, p), f64::max(hi, p))),
    }) {
        Some(extent) => extent,
        None => return Ok(Vec::new()),
    };

    if min == max {
        return Ok(vec![HistogramBin {
            start: min,
            end: max,
            count: prices.len(),
        }]);
    }

    let width = (max - min) / bins as f64;
    let mut counts = vec![0usize; bins];
    for price in prices {
        let idx = (((price - min) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }

    Ok(counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            start: min + width * i as f64,
            end: if i + 1 == bins {
                max
            } else {
                min + width * (i + 1) as f64
            },
            count,
        })
        .collect())
}

fn scatter_points(view: &DataFrame) -> DashResult<Vec<ScatterPoint>> {
    let ages = view.column(AGE)?.i64()?;
    let prices = view.column(PRICE)?.f64()?;
    Ok(ages
        .into_iter()
        .zip(prices)
        .filter_map(|(age, price)| Some(ScatterPoint { age: age?, price: price? }))
        .collect())
}

/// Age against price, one series per condition.
pub fn age_vs_price_by_condition(view: &DataFrame) -> DashResult<Vec<ScatterSeries>> {
    let conditions = view.column(CONDITION)?.str()?;
    let points = scatter_points(view)?;

    let mut series: BTreeMap<String, Vec<ScatterPoint>> = BTreeMap::new();
    for (condition, point) in conditions.into_iter().zip(points) {
        let name = condition.unwrap_or(UNKNOWN).to_string();
        series.entry(name).or_default().push(point);
    }

    Ok(series
        .into_iter()
        .map(|(name, points)| ScatterSeries { name, points })
        .collect())
}

pub fn automatic_age_vs_price(view: &DataFrame) -> DashResult<Vec<ScatterPoint>> {
    let automatic = view
        .clone()
        .lazy()
        .filter(col(TRANSMISSION).eq(lit("automatic")))
        .collect()?;
    scatter_points(&automatic)
}

/// Mean price per fuel type, sorted by fuel.
pub fn mean_price_by_fuel(view: &DataFrame) -> DashResult<Vec<FuelPrice>> {
    let grouped = view
        .clone()
        .lazy()
        .group_by([col(FUEL)])
        .agg([col(PRICE).mean()])
        .sort([FUEL], Default::default())
        .collect()?;

    let fuels = grouped.column(FUEL)?.str()?;
    let means = grouped.column(PRICE)?.f64()?;
    Ok(fuels
        .into_iter()
        .zip(means)
        .filter_map(|(fuel, mean)| {
            Some(FuelPrice {
                fuel: fuel?.to_string(),
                mean_price: mean?,
            })
        })
        .collect())
}
