use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum DashError {
    #[error("Configuration error: {0}")]
    #[diagnostic(
        code("AUTODASH-001"),
        help("Please check your dashboard.yaml syntax and structure.")
    )]
    ConfigError(#[source] serde_yaml::Error, #[label("here")] Option<SourceSpan>),

    #[error("I/O error: {0}")]
    #[diagnostic(code("AUTODASH-002"), help("Check file paths and permissions."))]
    IoError(#[from] std::io::Error),

    #[error("Failed to load listings: {0}")]
    #[diagnostic(
        code("AUTODASH-003"),
        help("The listings file could not be read or parsed as comma-separated UTF-8 text.")
    )]
    PolarsError(#[from] polars::error::PolarsError),

    #[error("Missing required column '{0}'")]
    #[diagnostic(
        code("AUTODASH-004"),
        help("Column names are matched after trimming whitespace and lower-casing.")
    )]
    MissingColumn(String),

    #[error("Invalid filter: {0}")]
    #[diagnostic(
        code("AUTODASH-005"),
        help("Ranges are inclusive pairs written as [min, max] with min <= max.")
    )]
    InvalidFilter(String),

    #[error("Validation failed: {0}")]
    #[diagnostic(
        code("AUTODASH-006"),
        help("The cleaned listings violate a data invariant.")
    )]
    ValidationError(String),

    #[error(transparent)]
    #[diagnostic(code("AUTODASH-000"))]
    Unknown(#[from] anyhow::Error),
}

pub type DashResult<T> = Result<T, DashError>;
