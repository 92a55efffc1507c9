use crate::errors::{DashError, DashResult};
use polars::prelude::*;
use std::path::Path;

/// Read a comma-separated file with a header row.
///
/// Every column is read as text so that numeric coercion happens in one place
/// (`prepare`) and a stray non-numeric cell never fails the whole load.
pub fn read_csv<P: AsRef<Path>>(path: P) -> DashResult<LazyFrame> {
    LazyCsvReader::new(path.as_ref())
        .with_has_header(true)
        .with_separator(b',')
        .with_infer_schema_length(Some(0))
        .finish()
        .map_err(DashError::PolarsError)
}

/// Read and materialize a listings file, surfacing any parse failure here.
pub fn load_csv<P: AsRef<Path>>(path: P) -> DashResult<DataFrame> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(DashError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Listings file not found: {:?}", path),
        )));
    }
    read_csv(path)?.collect().map_err(DashError::PolarsError)
}

pub fn write_csv<P: AsRef<Path>>(df: &DataFrame, path: P) -> DashResult<()> {
    let mut file = std::fs::File::create(path).map_err(DashError::IoError)?;
    CsvWriter::new(&mut file)
        .finish(&mut df.clone())
        .map_err(DashError::PolarsError)?;
    Ok(())
}

pub fn write_parquet<P: AsRef<Path>>(df: &DataFrame, path: P) -> DashResult<()> {
    let file = std::fs::File::create(path).map_err(DashError::IoError)?;
    ParquetWriter::new(file)
        .finish(&mut df.clone())
        .map_err(DashError::PolarsError)?;
    Ok(())
}

/// Write a table, picking the format from the file extension.
pub fn write_table<P: AsRef<Path>>(df: &DataFrame, path: P) -> DashResult<()> {
    let path = path.as_ref();
    match path.extension().and_then(|e| e.to_str()) {
        Some("parquet") => write_parquet(df, path),
        Some("csv") => write_csv(df, path),
        _ => Err(DashError::ConfigError(
            serde::de::Error::custom(format!("Unsupported output format for file: {:?}", path)),
            None,
        )),
    }
}
