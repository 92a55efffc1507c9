use anyhow::Result;
use autodash::engine::{Dashboard, FilterRequest};
use autodash::filter::{FilterParams, FilterPipeline, PriceRange, TypeSelection, YearRange};
use autodash::prepare::{DatasetPreparer, PrepareOptions, UNKNOWN};
use autodash::validate;
use polars::prelude::*;
use std::fs;
use tempfile::tempdir;

const LISTINGS: &str = "\
 Price ,MODEL_YEAR,cylinders,odometer,is_4wd,paint_color,condition,transmission,fuel,Type
9000,2015,4,,,,good,automatic,gas,sedan
12000,2018.0,six,56000,1,white,excellent,automatic,gas,truck
,2010,8,120000,1,black,fair,manual,diesel,truck
4500,n/a,4,200000,,red,salvage,manual,gas,sedan
7000,1999,,300000,0,silver,,other,,
";

fn load(reference_year: i64) -> Result<DataFrame> {
    let dir = tempdir()?;
    let path = dir.path().join("vehicles.csv");
    fs::write(&path, LISTINGS)?;
    Ok(DatasetPreparer::new(PrepareOptions { reference_year }).load(&path)?)
}

/// Every cleaned record keeps the data invariants.
#[test]
fn test_cleaned_invariants() -> Result<()> {
    let df = load(2023)?;

    // missing price and unparseable year are dropped
    assert_eq!(df.height(), 3);
    assert_eq!(df.column("price")?.null_count(), 0);
    assert_eq!(df.column("model_year")?.null_count(), 0);

    for value in df.column("odometer")?.i64()?.into_iter() {
        assert!(value.unwrap() >= 0);
    }
    for value in df.column("is_4wd")?.i64()?.into_iter() {
        assert!(value.unwrap() >= 0);
    }
    for name in ["paint_color", "condition", "transmission", "fuel", "type"] {
        for value in df.column(name)?.str()?.into_iter() {
            assert!(!value.unwrap().is_empty());
        }
    }

    let years = df.column("model_year")?.i64()?;
    let ages = df.column("age")?.i64()?;
    for (year, age) in years.into_iter().zip(ages) {
        assert_eq!(age.unwrap(), 2023 - year.unwrap());
    }

    assert!(validate::check_prepared(&df, 2023)?.passed);
    Ok(())
}

/// model_year=2015, price=9000, blank odometer/is_4wd/paint_color, type=sedan
#[test]
fn test_documented_cleaning_example() -> Result<()> {
    let df = load(2023)?;
    let first = df.head(Some(1));

    assert_eq!(first.column("odometer")?.i64()?.get(0), Some(0));
    assert_eq!(first.column("is_4wd")?.i64()?.get(0), Some(0));
    assert_eq!(first.column("paint_color")?.str()?.get(0), Some(UNKNOWN));
    assert_eq!(first.column("age")?.i64()?.get(0), Some(8));
    assert_eq!(first.column("type")?.str()?.get(0), Some("sedan"));

    // 2018.0 parses as a year, "six" cylinders becomes null
    assert_eq!(df.column("model_year")?.i64()?.get(1), Some(2018));
    assert_eq!(df.column("cylinders")?.f64()?.get(1), None);

    // blank categoricals on the last row
    let last = df.tail(Some(1));
    assert_eq!(last.column("condition")?.str()?.get(0), Some(UNKNOWN));
    assert_eq!(last.column("fuel")?.str()?.get(0), Some(UNKNOWN));
    assert_eq!(last.column("type")?.str()?.get(0), Some(UNKNOWN));
    Ok(())
}

#[test]
fn test_single_row_passes_covering_filter() -> Result<()> {
    let df = load(2023)?.head(Some(1));
    let params = FilterParams {
        selected_type: TypeSelection::All,
        price_range: PriceRange::new(0.0, 100000.0),
        year_range: YearRange::new(1990, 2023),
    };
    let out = FilterPipeline::apply(&df, &params)?;
    assert!(out.equals(&df));
    Ok(())
}

#[test]
fn test_missing_type_on_sedans_is_empty() -> Result<()> {
    let df = load(2023)?;
    let sedans = FilterPipeline::by_type(&df, &TypeSelection::from("sedan"))?;
    let params = FilterParams {
        selected_type: TypeSelection::from("truck"),
        price_range: PriceRange::new(0.0, 100000.0),
        year_range: YearRange::new(1990, 2023),
    };
    let out = FilterPipeline::apply(&sedans, &params)?;
    assert_eq!(out.height(), 0);
    Ok(())
}

#[test]
fn test_filters_narrow_and_are_idempotent() -> Result<()> {
    let df = load(2023)?;
    let selections = [
        TypeSelection::All,
        TypeSelection::from("sedan"),
        TypeSelection::from("truck"),
        TypeSelection::from("van"),
    ];
    let prices = [
        PriceRange::new(0.0, 100000.0),
        PriceRange::new(5000.0, 10000.0),
        PriceRange::new(12000.0, 12000.0),
    ];
    let years = [YearRange::new(1990, 2023), YearRange::new(2016, 2020)];

    for selected_type in &selections {
        for price_range in &prices {
            for year_range in &years {
                let params = FilterParams {
                    selected_type: selected_type.clone(),
                    price_range: *price_range,
                    year_range: *year_range,
                };
                let once = FilterPipeline::apply(&df, &params)?;
                let twice = FilterPipeline::apply(&once, &params)?;
                assert!(once.height() <= df.height());
                assert!(once.equals(&twice), "not idempotent for {:?}", params);
            }
        }
    }
    Ok(())
}

#[test]
fn test_dashboard_progressive_bounds() -> Result<()> {
    let dashboard = Dashboard::new(load(2023)?);

    let view = dashboard.render(&FilterRequest {
        selected_type: TypeSelection::from("sedan"),
        ..Default::default()
    })?;
    assert_eq!(view.sidebar.price_bounds, Some(PriceRange::new(9000.0, 9000.0)));
    assert_eq!(view.sidebar.year_bounds, Some(YearRange::new(2015, 2015)));
    assert_eq!(view.table.height(), 1);

    let view = dashboard.render(&FilterRequest {
        selected_type: TypeSelection::All,
        price_range: Some(PriceRange::new(8000.0, 20000.0)),
        year_range: None,
    })?;
    assert_eq!(view.sidebar.price_bounds, Some(PriceRange::new(7000.0, 12000.0)));
    // year bounds exclude the 1999 listing priced out above
    assert_eq!(view.sidebar.year_bounds, Some(YearRange::new(2015, 2018)));
    assert_eq!(view.table.height(), 2);
    Ok(())
}
