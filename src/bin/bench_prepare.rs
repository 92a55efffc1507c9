use autodash::engine::{Dashboard, FilterRequest};
use autodash::filter::TypeSelection;
use autodash::prepare::DatasetPreparer;
use std::time::Instant;

fn main() -> anyhow::Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "vehicles_us.csv".to_string());
    if !std::path::Path::new(&path).exists() {
        println!("Usage: bench_prepare <listings.csv> (file {} not found)", path);
        return Ok(());
    }

    println!("Benchmarking autodash prepare + filter on {}...", path);
    let start = Instant::now();
    let df = DatasetPreparer::default().load(&path)?;
    let prepared = start.elapsed();

    let dashboard = Dashboard::new(df);
    let start = Instant::now();
    let options = autodash::filter::type_options(dashboard.base())?;
    for option in &options {
        dashboard.render(&FilterRequest {
            selected_type: TypeSelection::from(option.as_str()),
            ..Default::default()
        })?;
    }
    let filtered = start.elapsed();

    println!(
        "prepared {} rows in {:?}; {} sidebar passes in {:?}",
        dashboard.base().height(),
        prepared,
        options.len(),
        filtered
    );
    Ok(())
}
