//! Grouped means and medians of price, mileage and engine size.

use super::{sort_descending, to_json, value_bars, with_image, Aggregation, ReportError, ValueRecord};
use crate::charts::StaticChartRenderer;
use crate::data::{DataProcessor, Dataset};
use chrono::Datelike;
use polars::prelude::DataFrame;
use serde_json::Value;
use std::collections::BTreeMap;

const TOP_MODELS: usize = 10;

/// Aggregate `value` per label of `key`, keyed order.
fn by_label(
    df: &DataFrame,
    key: &str,
    value: &str,
    aggregation: Aggregation,
) -> Result<Vec<ValueRecord<String>>, ReportError> {
    Ok(DataProcessor::group_by_label(df, key, value)?
        .into_iter()
        .map(|(label, values)| ValueRecord {
            label,
            value: aggregation.apply(&values),
        })
        .collect())
}

/// Aggregate `value` per integer `key`, ascending.
fn by_integer(
    df: &DataFrame,
    key: &str,
    value: &str,
    aggregation: Aggregation,
) -> Result<Vec<ValueRecord<i64>>, ReportError> {
    Ok(DataProcessor::group_by_integer(df, key, value)?
        .into_iter()
        .map(|(label, values)| ValueRecord {
            label,
            value: aggregation.apply(&values),
        })
        .collect())
}

fn bar_report(
    records: Vec<ValueRecord<String>>,
    title: &str,
    x_desc: &str,
    y_desc: &str,
) -> Result<Value, ReportError> {
    let png = StaticChartRenderer::bar_chart(title, x_desc, y_desc, &value_bars(&records))?;
    with_image(png, records)
}

fn line_report(
    records: Vec<ValueRecord<i64>>,
    title: &str,
    x_desc: &str,
    y_desc: &str,
) -> Result<Value, ReportError> {
    let points: Vec<(f64, f64)> = records
        .iter()
        .filter(|r| r.value.is_finite())
        .map(|r| (r.label as f64, r.value))
        .collect();
    let png = StaticChartRenderer::line_chart(title, x_desc, y_desc, &points)?;
    with_image(png, records)
}

/// `/analysis3`
pub fn mean_price_by_brand(dataset: &Dataset) -> Result<Value, ReportError> {
    let mut records = by_label(dataset.merged(), "Brand", "Price_USD", Aggregation::Mean)?;
    sort_descending(&mut records);
    bar_report(records, "Average Price by Brand", "Brand", "Price (USD)")
}

/// `/analysis4`
pub fn median_price_by_fuel_type(dataset: &Dataset) -> Result<Value, ReportError> {
    let records = by_label(dataset.merged(), "Fuel_Type", "Price_USD", Aggregation::Median)?;
    bar_report(records, "Median Price by Fuel Type", "Fuel Type", "Price (USD)")
}

/// `/analysis7`
pub fn mean_price_by_year(dataset: &Dataset) -> Result<Value, ReportError> {
    let records = by_integer(dataset.merged(), "Year", "Price_USD", Aggregation::Mean)?;
    line_report(records, "Average Price by Model Year", "Year", "Price (USD)")
}

/// `/analysis8`: average price against car age in the current year.
pub fn mean_price_by_age(dataset: &Dataset) -> Result<Value, ReportError> {
    mean_price_by_age_at(dataset, i64::from(chrono::Local::now().year()))
}

pub fn mean_price_by_age_at(dataset: &Dataset, reference_year: i64) -> Result<Value, ReportError> {
    // Car_Age lives only in this request's copy of the frame.
    let aged = DataProcessor::with_car_age(dataset.merged(), reference_year)?;
    let records = by_integer(&aged, "Car_Age", "Price_USD", Aggregation::Mean)?;
    line_report(records, "Average Price by Car Age", "Age (years)", "Price (USD)")
}

/// `/analysis10`
pub fn mean_mileage_by_brand(dataset: &Dataset) -> Result<Value, ReportError> {
    let mut records = by_label(dataset.car_details(), "Brand", "Mileage_km", Aggregation::Mean)?;
    sort_descending(&mut records);
    bar_report(records, "Average Mileage by Brand", "Brand", "Mileage (km)")
}

/// `/analysis13`
pub fn mean_price_by_transmission(dataset: &Dataset) -> Result<Value, ReportError> {
    let records = by_label(dataset.merged(), "Transmission", "Price_USD", Aggregation::Mean)?;
    bar_report(records, "Average Price by Transmission", "Transmission", "Price (USD)")
}

/// `/analysis15`
pub fn mean_engine_by_fuel_type(dataset: &Dataset) -> Result<Value, ReportError> {
    let records = by_label(dataset.car_details(), "Fuel_Type", "Engine_cc", Aggregation::Mean)?;
    bar_report(records, "Average Engine Size by Fuel Type", "Fuel Type", "Engine (cc)")
}

/// `/analysis16`: the ten models with the highest average price.
pub fn top_models_by_price(dataset: &Dataset) -> Result<Value, ReportError> {
    let mut records = by_label(dataset.merged(), "Model", "Price_USD", Aggregation::Mean)?;
    sort_descending(&mut records);
    records.truncate(TOP_MODELS);
    bar_report(records, "Most Expensive Models", "Model", "Price (USD)")
}

/// `/analysis18`
pub fn mean_price_by_location(dataset: &Dataset) -> Result<Value, ReportError> {
    let mut records = by_label(dataset.merged(), "Location", "Price_USD", Aggregation::Mean)?;
    sort_descending(&mut records);
    bar_report(records, "Average Price by Location", "Location", "Price (USD)")
}

/// `/analysis21`
pub fn median_mileage_by_year(dataset: &Dataset) -> Result<Value, ReportError> {
    let records = by_integer(dataset.car_details(), "Year", "Mileage_km", Aggregation::Median)?;
    line_report(records, "Median Mileage by Model Year", "Year", "Mileage (km)")
}

/// `/analysis25`: brand -> fuel type -> average price.
pub fn mean_price_by_brand_and_fuel(dataset: &Dataset) -> Result<Value, ReportError> {
    let df = dataset.merged();
    let brands = DataProcessor::string_values(df, "Brand")?;
    let fuels = DataProcessor::string_values(df, "Fuel_Type")?;
    let prices = DataProcessor::numeric_values(df, "Price_USD")?;

    let keys: Vec<Option<(String, String)>> = brands
        .into_iter()
        .zip(fuels)
        .map(|(brand, fuel)| Some((brand?, fuel?)))
        .collect();

    let mut nested: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
    for ((brand, fuel), values) in DataProcessor::group_values(keys, prices) {
        nested
            .entry(brand)
            .or_default()
            .insert(fuel, Aggregation::Mean.apply(&values));
    }
    to_json(&nested)
}
