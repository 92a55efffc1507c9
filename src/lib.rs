pub mod charts;
pub mod config;
pub mod engine;
pub mod errors;
pub mod filter;
pub mod io;
pub mod observability;
pub mod prepare;
pub mod runner;
pub mod validate;

use engine::Dashboard;
use filter::{FilterParams, FilterPipeline, PriceRange, TypeSelection, YearRange};
use polars::prelude::*;
use prepare::{DatasetPreparer, PrepareOptions, DEFAULT_REFERENCE_YEAR};
use pyo3::exceptions::{PyIOError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3_polars::PyDataFrame;
use std::path::PathBuf;
use uuid::Uuid;

/// Wrapper for a listings DataFrame that exposes it to Python
#[pyclass(name = "Listings")]
#[derive(Clone)]
pub struct PyListings {
    inner: DataFrame,
}

#[pymethods]
impl PyListings {
    /// Convert to a Polars DataFrame (Python)
    fn to_polars(&self, py: Python<'_>) -> PyResult<PyObject> {
        let py_df = PyDataFrame(self.inner.clone());
        Ok(py_df.into_pyobject(py)?.into_any().unbind())
    }

    fn __len__(&self) -> usize {
        self.inner.height()
    }

    fn __repr__(&self) -> String {
        format!("{}", self.inner)
    }
}

fn filter_error(e: errors::DashError) -> PyErr {
    match e {
        errors::DashError::InvalidFilter(msg) => PyValueError::new_err(msg),
        other => PyRuntimeError::new_err(other.to_string()),
    }
}

/// Read and clean a listings CSV
#[pyfunction(signature = (path, reference_year=None))]
fn load_listings(path: &str, reference_year: Option<i64>) -> PyResult<PyListings> {
    let preparer = DatasetPreparer::new(PrepareOptions {
        reference_year: reference_year.unwrap_or(DEFAULT_REFERENCE_YEAR),
    });
    let df = preparer
        .load(path)
        .map_err(|e| PyIOError::new_err(format!("Failed to load CSV: {}", e)))?;
    Ok(PyListings { inner: df })
}

/// Narrow cleaned listings by type, price and model year
#[pyfunction]
fn filter_listings(
    listings: &PyListings,
    selected_type: &str,
    price_range: (f64, f64),
    year_range: (i64, i64),
) -> PyResult<PyListings> {
    let params = FilterParams {
        selected_type: TypeSelection::from(selected_type),
        price_range: PriceRange::from(price_range),
        year_range: YearRange::from(year_range),
    };
    let df = FilterPipeline::apply(&listings.inner, &params).map_err(filter_error)?;
    Ok(PyListings { inner: df })
}

/// Options for the type selector, "All" first
#[pyfunction]
fn type_options(listings: &PyListings) -> PyResult<Vec<String>> {
    filter::type_options(&listings.inner).map_err(filter_error)
}

/// Price and model-year slider bounds for the given selections
#[pyfunction(signature = (listings, selected_type, price_range=None))]
fn slider_bounds(
    listings: &PyListings,
    selected_type: &str,
    price_range: Option<(f64, f64)>,
) -> PyResult<(Option<(f64, f64)>, Option<(i64, i64)>)> {
    let request = engine::FilterRequest {
        selected_type: TypeSelection::from(selected_type),
        price_range: price_range.map(PriceRange::from),
        year_range: None,
    };
    let view = Dashboard::new(listings.inner.clone())
        .render(&request)
        .map_err(filter_error)?;
    Ok((
        view.sidebar.price_bounds.map(|r| r.as_tuple()),
        view.sidebar.year_bounds.map(|r| r.as_tuple()),
    ))
}

/// Run a dashboard pass from a YAML dashboard file
#[pyfunction]
fn run_dashboard(path: String) -> PyResult<()> {
    let path_buf = PathBuf::from(path);
    runner::execution_pipeline(&path_buf, Uuid::new_v4(), Default::default())
        .map_err(|e| PyRuntimeError::new_err(format!("Dashboard run failed: {}", e)))?;
    Ok(())
}

#[pymodule]
fn autodash(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add("__version__", "0.1.0")?;
    m.add_class::<PyListings>()?;
    m.add_function(wrap_pyfunction!(load_listings, m)?)?;
    m.add_function(wrap_pyfunction!(filter_listings, m)?)?;
    m.add_function(wrap_pyfunction!(type_options, m)?)?;
    m.add_function(wrap_pyfunction!(slider_bounds, m)?)?;
    m.add_function(wrap_pyfunction!(run_dashboard, m)?)?;
    Ok(())
}
