//! Sidebar filters over the cleaned listings.
//!
//! Each filter is a pure predicate; applying them returns a new frame and
//! never touches the base table.

use crate::errors::{DashError, DashResult};
use crate::prepare::{MODEL_YEAR, PRICE, TYPE};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Sentinel shown first in the type selector; selecting it disables the filter.
pub const ALL_TYPES: &str = "All";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TypeSelection {
    #[default]
    All,
    Only(String),
}

impl TypeSelection {
    pub fn predicate(&self) -> Option<Expr> {
        match self {
            TypeSelection::All => None,
            TypeSelection::Only(value) => Some(col(TYPE).eq(lit(value.as_str()))),
        }
    }
}

impl From<&str> for TypeSelection {
    fn from(value: &str) -> Self {
        if value == ALL_TYPES {
            TypeSelection::All
        } else {
            TypeSelection::Only(value.to_string())
        }
    }
}

impl From<String> for TypeSelection {
    fn from(value: String) -> Self {
        TypeSelection::from(value.as_str())
    }
}

impl From<TypeSelection> for String {
    fn from(value: TypeSelection) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TypeSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSelection::All => f.write_str(ALL_TYPES),
            TypeSelection::Only(value) => f.write_str(value),
        }
    }
}

/// Inclusive range, written as `[min, max]` in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(from = "(T, T)", bound(deserialize = "T: Deserialize<'de>"))]
pub struct ValueRange<T: Copy> {
    pub min: T,
    pub max: T,
}

impl<T: Copy> From<(T, T)> for ValueRange<T> {
    fn from((min, max): (T, T)) -> Self {
        Self { min, max }
    }
}

impl<T: Copy + Serialize> Serialize for ValueRange<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.min, self.max).serialize(serializer)
    }
}

impl<T: Copy> ValueRange<T> {
    pub fn as_tuple(&self) -> (T, T) {
        (self.min, self.max)
    }
}

impl<T: Copy + PartialOrd + fmt::Display> ValueRange<T> {
    pub fn new(min: T, max: T) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: T) -> bool {
        self.min <= value && value <= self.max
    }

    fn check(&self, what: &str) -> DashResult<()> {
        if self.min > self.max {
            return Err(DashError::InvalidFilter(format!(
                "{} range [{}, {}] has min greater than max",
                what, self.min, self.max
            )));
        }
        Ok(())
    }
}

impl ValueRange<f64> {
    fn predicate(&self, column: &str) -> Expr {
        between(column, lit(self.min), lit(self.max))
    }
}

impl ValueRange<i64> {
    fn predicate(&self, column: &str) -> Expr {
        between(column, lit(self.min), lit(self.max))
    }
}

fn between(column: &str, min: Expr, max: Expr) -> Expr {
    col(column).gt_eq(min).and(col(column).lt_eq(max))
}

pub type PriceRange = ValueRange<f64>;
pub type YearRange = ValueRange<i64>;

#[derive(Debug, Clone, PartialEq)]
pub struct FilterParams {
    pub selected_type: TypeSelection,
    pub price_range: PriceRange,
    pub year_range: YearRange,
}

pub struct FilterPipeline;

impl FilterPipeline {
    /// Apply type, price and year filters, in that order.
    pub fn apply(base: &DataFrame, params: &FilterParams) -> DashResult<DataFrame> {
        params.price_range.check("Price")?;
        params.year_range.check("Model year")?;

        let mut lf = base.clone().lazy();
        if let Some(predicate) = params.selected_type.predicate() {
            lf = lf.filter(predicate);
        }
        lf = lf.filter(params.price_range.predicate(PRICE));
        lf = lf.filter(params.year_range.predicate(MODEL_YEAR));
        Ok(lf.collect()?)
    }

    pub fn by_type(base: &DataFrame, selected_type: &TypeSelection) -> DashResult<DataFrame> {
        match selected_type.predicate() {
            Some(predicate) => Ok(base.clone().lazy().filter(predicate).collect()?),
            None => Ok(base.clone()),
        }
    }

    pub fn by_price(view: &DataFrame, range: &PriceRange) -> DashResult<DataFrame> {
        range.check("Price")?;
        Ok(view.clone().lazy().filter(range.predicate(PRICE)).collect()?)
    }

    pub fn by_year(view: &DataFrame, range: &YearRange) -> DashResult<DataFrame> {
        range.check("Model year")?;
        Ok(view
            .clone()
            .lazy()
            .filter(range.predicate(MODEL_YEAR))
            .collect()?)
    }
}

/// Options for the type selector: the sentinel followed by sorted distinct types.
pub fn type_options(df: &DataFrame) -> DashResult<Vec<String>> {
    let types: BTreeSet<String> = df
        .column(TYPE)?
        .str()?
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect();
    Ok(std::iter::once(ALL_TYPES.to_string())
        .chain(types)
        .collect())
}

/// Slider bounds for price; whole numbers wide enough to cover every row.
pub fn price_bounds(view: &DataFrame) -> DashResult<Option<PriceRange>> {
    let prices = view.column(PRICE)?.f64()?;
    Ok(match (prices.min(), prices.max()) {
        (Some(min), Some(max)) => Some(PriceRange::new(min.floor(), max.ceil())),
        _ => None,
    })
}

pub fn year_bounds(view: &DataFrame) -> DashResult<Option<YearRange>> {
    let years = view.column(MODEL_YEAR)?.i64()?;
    Ok(match (years.min(), years.max()) {
        (Some(min), Some(max)) => Some(YearRange::new(min, max)),
        _ => None,
    })
}
