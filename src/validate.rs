//! Invariant checks for the cleaned listings
//!
//! Every check is a boolean expression that is `true` for offending rows;
//! counts are aggregated lazily in a single pass.

use crate::errors::{DashError, DashResult};
use crate::prepare::{
    AGE, CATEGORICAL_COLUMNS, IS_4WD, MODEL_YEAR, ODOMETER, PRICE,
};
use polars::prelude::*;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    NotNull,
    NonNegative,
    NotEmpty,
    DerivedAge,
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CheckKind::NotNull => "not_null",
            CheckKind::NonNegative => "non_negative",
            CheckKind::NotEmpty => "not_empty",
            CheckKind::DerivedAge => "derived_age",
        };
        f.write_str(label)
    }
}

/// Represents a single invariant violation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub column: String,
    pub check: CheckKind,
    pub message: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub violations: Vec<Violation>,
    pub total_violations: usize,
    pub passed: bool,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            violations: Vec::new(),
            total_violations: 0,
            passed: true,
        }
    }

    pub fn add(&mut self, violation: Violation) {
        self.passed = false;
        self.total_violations += violation.count;
        self.violations.push(violation);
    }

    /// Turn a failed report into an error.
    pub fn into_result(self) -> DashResult<()> {
        if self.passed {
            return Ok(());
        }
        let summary: Vec<String> = self.violations.iter().map(|v| v.message.clone()).collect();
        Err(DashError::ValidationError(summary.join("; ")))
    }
}

struct Check {
    column: &'static str,
    kind: CheckKind,
    mask: Expr,
}

fn checks(reference_year: i64) -> Vec<Check> {
    let mut checks = Vec::new();

    for column in [PRICE, MODEL_YEAR, ODOMETER, IS_4WD, AGE]
        .into_iter()
        .chain(CATEGORICAL_COLUMNS)
    {
        checks.push(Check {
            column,
            kind: CheckKind::NotNull,
            mask: col(column).is_null(),
        });
    }

    for column in [ODOMETER, IS_4WD] {
        checks.push(Check {
            column,
            kind: CheckKind::NonNegative,
            mask: col(column).lt(lit(0)).fill_null(false),
        });
    }

    for column in CATEGORICAL_COLUMNS {
        checks.push(Check {
            column,
            kind: CheckKind::NotEmpty,
            mask: col(column)
                .str()
                .strip_chars(lit(" \t\r\n"))
                .eq(lit(""))
                .fill_null(false),
        });
    }

    checks.push(Check {
        column: AGE,
        kind: CheckKind::DerivedAge,
        mask: col(AGE)
            .neq(lit(reference_year) - col(MODEL_YEAR))
            .fill_null(false),
    });

    checks
}

fn message(check: &Check, count: usize, reference_year: i64) -> String {
    match check.kind {
        CheckKind::NotNull => format!("Column '{}' has {} null values", check.column, count),
        CheckKind::NonNegative => {
            format!("Column '{}' has {} negative values", check.column, count)
        }
        CheckKind::NotEmpty => format!("Column '{}' has {} empty values", check.column, count),
        CheckKind::DerivedAge => format!(
            "Column '{}' differs from {} - model_year in {} rows",
            check.column, reference_year, count
        ),
    }
}

/// Check the cleaned-dataset invariants on a prepared table.
pub fn check_prepared(df: &DataFrame, reference_year: i64) -> DashResult<ValidationReport> {
    let checks = checks(reference_year);
    let aggs: Vec<Expr> = checks
        .iter()
        .enumerate()
        .map(|(idx, check)| {
            check
                .mask
                .clone()
                .cast(DataType::UInt64)
                .sum()
                .alias(format!("check{}_{}_{}", idx, check.column, check.kind))
        })
        .collect();

    let counts = df.clone().lazy().select(aggs).collect()?;

    let mut report = ValidationReport::new();
    for (idx, check) in checks.iter().enumerate() {
        let name = format!("check{}_{}_{}", idx, check.column, check.kind);
        let count = counts
            .column(&name)
            .ok()
            .and_then(|c| c.u64().ok())
            .and_then(|ca| ca.get(0))
            .unwrap_or(0) as usize;
        if count > 0 {
            report.add(Violation {
                column: check.column.to_string(),
                check: check.kind,
                message: message(check, count, reference_year),
                count,
            });
        }
    }

    Ok(report)
}
