//! Listing preparation
//!
//! Turns a raw listings table into the cleaned dataset every later stage
//! works on: normalized column names, numeric coercion, dropped incomplete
//! rows, defaulted flags and categoricals, and a derived `age` column.

use crate::errors::{DashError, DashResult};
use crate::io;
use polars::prelude::*;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

pub const PRICE: &str = "price";
pub const MODEL_YEAR: &str = "model_year";
pub const CYLINDERS: &str = "cylinders";
pub const ODOMETER: &str = "odometer";
pub const IS_4WD: &str = "is_4wd";
pub const AGE: &str = "age";
pub const PAINT_COLOR: &str = "paint_color";
pub const CONDITION: &str = "condition";
pub const TRANSMISSION: &str = "transmission";
pub const FUEL: &str = "fuel";
pub const TYPE: &str = "type";

/// Placeholder written into categorical cells that were absent.
pub const UNKNOWN: &str = "unknown";

pub const DEFAULT_REFERENCE_YEAR: i64 = 2023;

/// Columns coerced to numbers; unparseable cells become null.
pub const NUMERIC_COLUMNS: [&str; 4] = [MODEL_YEAR, CYLINDERS, ODOMETER, IS_4WD];

/// Numeric columns that end up as Int64.
const INTEGER_COLUMNS: [&str; 3] = [MODEL_YEAR, ODOMETER, IS_4WD];

/// -2^63 and 2^63: Float64 values in `[I64_LOWER, I64_UPPER)` cast to Int64 exactly.
const I64_LOWER: f64 = -9_223_372_036_854_775_808.0;
const I64_UPPER: f64 = 9_223_372_036_854_775_808.0;

pub const CATEGORICAL_COLUMNS: [&str; 5] = [PAINT_COLOR, CONDITION, TRANSMISSION, FUEL, TYPE];

pub const REQUIRED_COLUMNS: [&str; 10] = [
    MODEL_YEAR,
    CYLINDERS,
    ODOMETER,
    IS_4WD,
    PRICE,
    PAINT_COLOR,
    CONDITION,
    TRANSMISSION,
    FUEL,
    TYPE,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrepareOptions {
    /// Year that `age` is measured from.
    pub reference_year: i64,
}

impl Default for PrepareOptions {
    fn default() -> Self {
        Self {
            reference_year: DEFAULT_REFERENCE_YEAR,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DatasetPreparer {
    options: PrepareOptions,
}

impl DatasetPreparer {
    pub fn new(options: PrepareOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &PrepareOptions {
        &self.options
    }

    /// Read a listings file and clean it. Any read or parse failure is fatal.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> DashResult<DataFrame> {
        let path = path.as_ref();
        info!("Reading listings: {:?}", path);
        let raw = io::load_csv(path)?;
        debug!("Read {} raw rows, {} columns", raw.height(), raw.width());
        self.prepare(raw)
    }

    /// Clean an already loaded table.
    pub fn prepare(&self, raw: DataFrame) -> DashResult<DataFrame> {
        let rows_in = raw.height();
        let lf = normalize_column_names(raw)?;

        let cleaned = lf
            .with_columns(
                NUMERIC_COLUMNS
                    .iter()
                    .chain(std::iter::once(&PRICE))
                    .map(|name| coerce_numeric(name, INTEGER_COLUMNS.contains(name)))
                    .collect::<Vec<_>>(),
            )
            .filter(col(MODEL_YEAR).is_not_null().and(col(PRICE).is_not_null()))
            .with_columns([
                col(MODEL_YEAR).cast(DataType::Int64),
                col(IS_4WD).fill_null(lit(0)).cast(DataType::Int64),
                col(ODOMETER).fill_null(lit(0)).cast(DataType::Int64),
            ])
            .with_columns([(lit(self.options.reference_year) - col(MODEL_YEAR)).alias(AGE)])
            .with_columns(
                CATEGORICAL_COLUMNS
                    .iter()
                    .map(|name| fill_unknown(name))
                    .collect::<Vec<_>>(),
            )
            .collect()?;

        info!(
            "Prepared {} listings ({} dropped for missing price or model year)",
            cleaned.height(),
            rows_in - cleaned.height()
        );
        Ok(cleaned)
    }
}

/// Trim and lower-case every column name, then check the required set.
pub fn normalize_column_names(raw: DataFrame) -> DashResult<LazyFrame> {
    let mut seen = HashSet::new();
    let mut exprs = Vec::with_capacity(raw.width());
    for name in raw.get_column_names() {
        let normalized = name.trim().to_lowercase();
        if !seen.insert(normalized.clone()) {
            return Err(DashError::ValidationError(format!(
                "Column '{}' appears more than once after normalizing names",
                normalized
            )));
        }
        exprs.push(col(name.as_str()).alias(normalized.as_str()));
    }

    for required in REQUIRED_COLUMNS {
        if !seen.contains(required) {
            return Err(DashError::MissingColumn(required.to_string()));
        }
    }

    Ok(raw.lazy().select(exprs))
}

/// Parse a column as Float64. Cells that do not parse, are not finite, or
/// (for `integer` columns) fall outside the i64 range become null.
fn coerce_numeric(name: &str, integer: bool) -> Expr {
    let value = col(name)
        .cast(DataType::String)
        .str()
        .strip_chars(lit(" \t\r\n"))
        .cast(DataType::Float64);
    // NaN fails both comparisons, infinities fail one of them.
    let in_range = if integer {
        value
            .clone()
            .gt_eq(lit(I64_LOWER))
            .and(value.clone().lt(lit(I64_UPPER)))
    } else {
        value
            .clone()
            .gt_eq(lit(f64::MIN))
            .and(value.clone().lt_eq(lit(f64::MAX)))
    };
    when(in_range)
        .then(value)
        .otherwise(lit(NULL).cast(DataType::Float64))
        .alias(name)
}

fn fill_unknown(name: &str) -> Expr {
    let text = col(name).cast(DataType::String);
    when(text.clone().str().strip_chars(lit(" \t\r\n")).eq(lit("")))
        .then(lit(UNKNOWN))
        .otherwise(text)
        .fill_null(lit(UNKNOWN))
        .alias(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_listings() -> DataFrame {
        df! {
            " Model_Year " => [Some("2015"), Some("2010"), None, Some("abc"), Some("2020")],
            "CYLINDERS" => [Some("4"), Some("six"), Some("8"), Some("4"), None],
            "odometer" => [None, Some("120000"), Some("5"), Some("10"), Some("30000.7")],
            "is_4wd" => [None, Some("1"), Some("1"), None, Some("1.0")],
            "Price" => [Some("9000"), Some("15000"), Some("100"), Some("200"), None],
            "paint_color" => [None, Some("red"), Some("blue"), None, Some("")],
            "condition" => [Some("good"), None, Some("fair"), Some("good"), Some("new")],
            "transmission" => [Some("automatic"), Some("manual"), None, None, None],
            "fuel" => [Some("gas"), Some("diesel"), Some("gas"), None, None],
            "type" => [Some("sedan"), Some("truck"), Some("SUV"), None, Some("  ")],
        }
        .unwrap()
    }

    #[test]
    fn test_prepare_drops_rows_missing_year_or_price() {
        let df = DatasetPreparer::default().prepare(raw_listings()).unwrap();

        // Row 3 has no year, row 4 an unparseable year, row 5 no price.
        assert_eq!(df.height(), 2);
        assert_eq!(df.column(MODEL_YEAR).unwrap().null_count(), 0);
        assert_eq!(df.column(PRICE).unwrap().null_count(), 0);
        assert_eq!(df.column(MODEL_YEAR).unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column(PRICE).unwrap().dtype(), &DataType::Float64);
    }

    #[test]
    fn test_prepare_normalizes_names() {
        let df = DatasetPreparer::default().prepare(raw_listings()).unwrap();
        for name in REQUIRED_COLUMNS.iter().chain(std::iter::once(&AGE)) {
            assert!(df.column(name).is_ok(), "missing column {}", name);
        }
    }

    #[test]
    fn test_prepare_defaults_and_age() {
        let df = DatasetPreparer::default().prepare(raw_listings()).unwrap();

        let odometer = df.column(ODOMETER).unwrap().i64().unwrap();
        let is_4wd = df.column(IS_4WD).unwrap().i64().unwrap();
        let age = df.column(AGE).unwrap().i64().unwrap();
        let paint = df.column(PAINT_COLOR).unwrap().str().unwrap();
        let cylinders = df.column(CYLINDERS).unwrap().f64().unwrap();

        assert_eq!(odometer.get(0), Some(0));
        assert_eq!(odometer.get(1), Some(120000));
        assert_eq!(is_4wd.get(0), Some(0));
        assert_eq!(is_4wd.get(1), Some(1));
        assert_eq!(age.get(0), Some(8));
        assert_eq!(age.get(1), Some(13));
        assert_eq!(paint.get(0), Some(UNKNOWN));
        assert_eq!(paint.get(1), Some("red"));
        // cylinders stays nullable
        assert_eq!(cylinders.get(0), Some(4.0));
        assert_eq!(cylinders.get(1), None);
    }

    #[test]
    fn test_prepare_reference_year_is_configurable() {
        let preparer = DatasetPreparer::new(PrepareOptions {
            reference_year: 2030,
        });
        let df = preparer.prepare(raw_listings()).unwrap();
        let age = df.column(AGE).unwrap().i64().unwrap();
        assert_eq!(age.get(0), Some(15));
    }

    #[test]
    fn test_blank_categoricals_become_unknown() {
        let raw = df! {
            "model_year" => ["2015"],
            "cylinders" => [""],
            "odometer" => [""],
            "is_4wd" => [""],
            "price" => ["9000"],
            "paint_color" => [""],
            "condition" => [" "],
            "transmission" => ["automatic"],
            "fuel" => ["gas"],
            "type" => ["sedan"],
        }
        .unwrap();
        let df = DatasetPreparer::default().prepare(raw).unwrap();

        assert_eq!(df.column(PAINT_COLOR).unwrap().str().unwrap().get(0), Some(UNKNOWN));
        assert_eq!(df.column(CONDITION).unwrap().str().unwrap().get(0), Some(UNKNOWN));
        assert_eq!(df.column(TYPE).unwrap().str().unwrap().get(0), Some("sedan"));
        assert_eq!(df.column(ODOMETER).unwrap().i64().unwrap().get(0), Some(0));
        assert_eq!(df.column(IS_4WD).unwrap().i64().unwrap().get(0), Some(0));
    }

    #[test]
    fn test_non_finite_and_oversized_numbers_count_as_missing() {
        let raw = df! {
            "model_year" => ["1e30", "2015", "inf", "NaN", "2012"],
            "cylinders" => ["4", "4", "6", "6", "inf"],
            "odometer" => ["inf", "1e25", "100", "100", "-1e19"],
            "is_4wd" => ["1e40", "", "1", "1", "-inf"],
            "price" => ["9000", "9000", "9000", "9000", "1e400"],
            "paint_color" => ["red", "red", "red", "red", "red"],
            "condition" => ["good", "good", "good", "good", "good"],
            "transmission" => ["manual", "manual", "manual", "manual", "manual"],
            "fuel" => ["gas", "gas", "gas", "gas", "gas"],
            "type" => ["sedan", "sedan", "sedan", "sedan", "sedan"],
        }
        .unwrap();
        let df = DatasetPreparer::default().prepare(raw).unwrap();

        // Overflowing/inf/NaN years and an infinite price drop their rows.
        assert_eq!(df.height(), 1);
        for name in [MODEL_YEAR, ODOMETER, IS_4WD, AGE, PRICE] {
            assert_eq!(df.column(name).unwrap().null_count(), 0, "nulls in {}", name);
        }
        assert_eq!(df.column(MODEL_YEAR).unwrap().i64().unwrap().get(0), Some(2015));
        assert_eq!(df.column(ODOMETER).unwrap().i64().unwrap().get(0), Some(0));
        assert_eq!(df.column(IS_4WD).unwrap().i64().unwrap().get(0), Some(0));
        assert_eq!(df.column(AGE).unwrap().i64().unwrap().get(0), Some(8));
        assert!(crate::validate::check_prepared(&df, DEFAULT_REFERENCE_YEAR)
            .unwrap()
            .passed);
    }

    #[test]
    fn test_missing_required_column() {
        let raw = df! {
            "model_year" => ["2015"],
            "price" => ["9000"],
        }
        .unwrap();
        let err = DatasetPreparer::default().prepare(raw).unwrap_err();
        assert!(matches!(err, DashError::MissingColumn(ref c) if c == CYLINDERS));
    }

    #[test]
    fn test_duplicate_names_after_normalizing() {
        let raw = df! {
            "price" => ["1"],
            " PRICE" => ["2"],
        }
        .unwrap();
        let err = normalize_column_names(raw).err().expect("expected an error");
        assert!(matches!(err, DashError::ValidationError(_)));
    }

    #[test]
    fn test_numeric_input_is_accepted() {
        let raw = df! {
            "model_year" => [2015i64, 2018],
            "cylinders" => [4.0, 6.0],
            "odometer" => [Some(1000i64), None],
            "is_4wd" => [Some(1i64), None],
            "price" => [9000.0, 12000.5],
            "paint_color" => ["red", "white"],
            "condition" => ["good", "excellent"],
            "transmission" => ["automatic", "manual"],
            "fuel" => ["gas", "gas"],
            "type" => ["sedan", "truck"],
        }
        .unwrap();
        let df = DatasetPreparer::default().prepare(raw).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.column(ODOMETER).unwrap().i64().unwrap().get(1), Some(0));
        assert_eq!(df.column(PRICE).unwrap().f64().unwrap().get(1), Some(12000.5));
    }
}
