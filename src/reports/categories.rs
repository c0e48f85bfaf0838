//! Listing counts over categorical columns.

use super::{count_bars, to_json, with_image, CountRecord, ReportError};
use crate::charts::StaticChartRenderer;
use crate::data::{DataProcessor, Dataset};
use serde_json::Value;
use std::collections::BTreeMap;

const TOP_BRANDS: usize = 5;
const TOP_LOCATIONS: usize = 10;

/// Fuel type that marks an electric vehicle.
pub const ELECTRIC: &str = "Electric";

/// Upper bounds (exclusive) of the price segments; the last is open-ended.
pub const PRICE_SEGMENTS: [(&str, f64); 4] = [
    ("Budget", 10_000.0),
    ("Mid-range", 30_000.0),
    ("Premium", 60_000.0),
    ("Luxury", f64::INFINITY),
];

fn counts(
    df: &polars::prelude::DataFrame,
    column: &str,
    limit: Option<usize>,
) -> Result<Vec<CountRecord<String>>, ReportError> {
    let counts = DataProcessor::value_counts(df, column)?;
    Ok(counts
        .into_iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(|(label, count)| CountRecord { label, count })
        .collect())
}

/// `/analysis1`: the five most common brands.
pub fn top_brands(dataset: &Dataset) -> Result<Value, ReportError> {
    to_json(&counts(dataset.car_details(), "Brand", Some(TOP_BRANDS))?)
}

/// `/analysis2`
pub fn fuel_type_counts(dataset: &Dataset) -> Result<Value, ReportError> {
    let records = counts(dataset.car_details(), "Fuel_Type", None)?;
    let png = StaticChartRenderer::bar_chart(
        "Listings by Fuel Type",
        "Fuel Type",
        "Listings",
        &count_bars(&records),
    )?;
    with_image(png, records)
}

/// `/analysis5`
pub fn transmission_counts(dataset: &Dataset) -> Result<Value, ReportError> {
    let records = counts(dataset.car_details(), "Transmission", None)?;
    let png = StaticChartRenderer::bar_chart(
        "Listings by Transmission",
        "Transmission",
        "Listings",
        &count_bars(&records),
    )?;
    with_image(png, records)
}

/// `/analysis11`: the ten locations with the most listings.
pub fn top_locations(dataset: &Dataset) -> Result<Value, ReportError> {
    let records = counts(dataset.car_details(), "Location", Some(TOP_LOCATIONS))?;
    let png = StaticChartRenderer::bar_chart(
        "Top Locations",
        "Location",
        "Listings",
        &count_bars(&records),
    )?;
    with_image(png, records)
}

/// `/analysis17`: listings per model year, oldest first.
pub fn listings_per_year(dataset: &Dataset) -> Result<Value, ReportError> {
    let mut per_year: BTreeMap<i64, usize> = BTreeMap::new();
    for year in DataProcessor::integer_values(dataset.car_details(), "Year")?
        .into_iter()
        .flatten()
    {
        *per_year.entry(year).or_default() += 1;
    }

    let points: Vec<(f64, f64)> = per_year
        .iter()
        .map(|(&year, &count)| (year as f64, count as f64))
        .collect();
    let records: Vec<CountRecord<i64>> = per_year
        .into_iter()
        .map(|(label, count)| CountRecord { label, count })
        .collect();

    let png = StaticChartRenderer::line_chart("Listings per Year", "Year", "Listings", &points)?;
    with_image(png, records)
}

/// `/analysis20`: brand x transmission counts, zero-filled.
pub fn brand_transmission_crosstab(dataset: &Dataset) -> Result<Value, ReportError> {
    let df = dataset.car_details();
    let brands = DataProcessor::string_values(df, "Brand")?;
    let transmissions = DataProcessor::string_values(df, "Transmission")?;

    let mut columns: Vec<&String> = transmissions.iter().flatten().collect();
    columns.sort();
    columns.dedup();

    let mut table: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
    for (brand, transmission) in brands.iter().zip(&transmissions) {
        let (Some(brand), Some(transmission)) = (brand, transmission) else {
            continue;
        };
        let row = table.entry(brand.clone()).or_insert_with(|| {
            columns
                .iter()
                .map(|c| ((*c).clone(), 0usize))
                .collect()
        });
        *row.entry(transmission.clone()).or_default() += 1;
    }

    to_json(&table)
}

/// `/analysis23`: brand mix among electric vehicles.
///
/// A market without electric cars yields an empty mapping and an empty chart.
pub fn electric_brand_distribution(dataset: &Dataset) -> Result<Value, ReportError> {
    let electric = DataProcessor::filter_eq(dataset.car_details(), "Fuel_Type", ELECTRIC)?;
    let records = counts(&electric, "Brand", None)?;

    let png = StaticChartRenderer::bar_chart(
        "Electric Vehicles by Brand",
        "Brand",
        "Listings",
        &count_bars(&records),
    )?;
    let distribution: BTreeMap<String, usize> = records
        .into_iter()
        .map(|r| (r.label, r.count))
        .collect();
    with_image(png, distribution)
}

/// Segment name for a price.
pub fn price_segment(price: f64) -> &'static str {
    PRICE_SEGMENTS
        .iter()
        .find(|(_, upper)| price < *upper)
        .map(|(name, _)| *name)
        .unwrap_or(PRICE_SEGMENTS[PRICE_SEGMENTS.len() - 1].0)
}

/// `/analysis24`: listings per price segment, cheapest first.
pub fn price_segments(dataset: &Dataset) -> Result<Value, ReportError> {
    let prices = DataProcessor::non_null_values(dataset.merged(), "Price_USD")?;

    let mut records: Vec<CountRecord<String>> = PRICE_SEGMENTS
        .iter()
        .map(|(name, _)| CountRecord {
            label: name.to_string(),
            count: 0,
        })
        .collect();
    for price in prices {
        let segment = price_segment(price);
        if let Some(record) = records.iter_mut().find(|r| r.label == segment) {
            record.count += 1;
        }
    }

    let png = StaticChartRenderer::bar_chart(
        "Listings by Price Segment",
        "Segment",
        "Listings",
        &count_bars(&records),
    )?;
    with_image(png, records)
}
