//! Whole-column summaries, distributions and correlations.

use super::{to_json, with_image, ReportError};
use crate::charts::StaticChartRenderer;
use crate::data::{DataProcessor, Dataset};
use crate::stats::{BoxStats, StatsCalculator};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

const HISTOGRAM_BINS: usize = 20;

/// Columns summarised by `/analysis6`.
pub const SUMMARY_COLUMNS: [&str; 4] = ["Price_USD", "Mileage_km", "Engine_cc", "Year"];

/// Columns correlated by `/analysis22`.
pub const CORRELATION_COLUMNS: [&str; 4] = ["Year", "Mileage_km", "Engine_cc", "Price_USD"];

#[derive(Debug, Serialize)]
struct NumericSummary {
    count: usize,
    mean: f64,
    std: f64,
    min: f64,
    max: f64,
}

#[derive(Debug, Serialize)]
struct ScatterSummary {
    count: usize,
    correlation: f64,
}

/// `/analysis`: summaries of both source tables, computed at load time.
pub fn dataset_summary(dataset: &Dataset) -> Result<Value, ReportError> {
    to_json(dataset.summary())
}

/// `/analysis6`
pub fn numeric_summary(dataset: &Dataset) -> Result<Value, ReportError> {
    let mut summary = BTreeMap::new();
    for column in SUMMARY_COLUMNS {
        let values = DataProcessor::non_null_values(dataset.merged(), column)?;
        let stats = StatsCalculator::compute_descriptive_stats(&values);
        summary.insert(
            column,
            NumericSummary {
                count: stats.count,
                mean: stats.mean,
                std: stats.std,
                min: stats.min,
                max: stats.max,
            },
        );
    }
    to_json(&summary)
}

/// `/analysis9`
pub fn price_histogram(dataset: &Dataset) -> Result<Value, ReportError> {
    let prices = DataProcessor::non_null_values(dataset.merged(), "Price_USD")?;
    let bins = StatsCalculator::histogram(&prices, HISTOGRAM_BINS);
    let png = StaticChartRenderer::histogram_chart("Price Distribution", "Price (USD)", &bins)?;
    with_image(png, bins)
}

/// Correlation matrix as `{row: {column: r}}` plus a heatmap.
fn correlation_report(dataset: &Dataset, columns: &[&str], title: &str) -> Result<Value, ReportError> {
    let series = columns
        .iter()
        .map(|c| DataProcessor::numeric_values(dataset.merged(), c))
        .collect::<Result<Vec<_>, _>>()?;
    let matrix = StatsCalculator::correlation_matrix(&series);

    let labels: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
    let png = StaticChartRenderer::heatmap_chart(title, &labels, &matrix)?;

    let nested: BTreeMap<&str, BTreeMap<&str, f64>> = columns
        .iter()
        .zip(&matrix)
        .map(|(row, values)| (*row, columns.iter().copied().zip(values.iter().copied()).collect()))
        .collect();
    with_image(png, nested)
}

/// `/analysis12`: 2x2 correlation of mileage and price.
pub fn mileage_price_correlation(dataset: &Dataset) -> Result<Value, ReportError> {
    correlation_report(
        dataset,
        &["Mileage_km", "Price_USD"],
        "Mileage vs Price Correlation",
    )
}

/// `/analysis22`
pub fn numeric_correlation_matrix(dataset: &Dataset) -> Result<Value, ReportError> {
    correlation_report(dataset, &CORRELATION_COLUMNS, "Correlation Matrix")
}

/// `/analysis14`
pub fn mileage_price_scatter(dataset: &Dataset) -> Result<Value, ReportError> {
    let mileage = DataProcessor::numeric_values(dataset.merged(), "Mileage_km")?;
    let price = DataProcessor::numeric_values(dataset.merged(), "Price_USD")?;

    let points: Vec<(f64, f64)> = mileage
        .iter()
        .zip(&price)
        .filter_map(|(m, p)| Some(((*m)?, (*p)?)))
        .collect();
    let png = StaticChartRenderer::scatter_chart(
        "Mileage vs Price",
        "Mileage (km)",
        "Price (USD)",
        &points,
    )?;

    with_image(
        png,
        ScatterSummary {
            count: points.len(),
            correlation: StatsCalculator::pearson(&mileage, &price),
        },
    )
}

/// `/analysis19`: price quartiles per fuel type.
pub fn price_spread_by_fuel_type(dataset: &Dataset) -> Result<Value, ReportError> {
    let groups = DataProcessor::group_by_label(dataset.merged(), "Fuel_Type", "Price_USD")?;
    let spreads: BTreeMap<String, BoxStats> = groups
        .into_iter()
        .filter_map(|(fuel, prices)| Some((fuel, StatsCalculator::box_stats(&prices)?)))
        .collect();

    let boxes: Vec<(String, BoxStats)> = spreads
        .iter()
        .map(|(fuel, stats)| (fuel.clone(), stats.clone()))
        .collect();
    let png = StaticChartRenderer::box_chart("Price Spread by Fuel Type", "Price (USD)", &boxes)?;
    with_image(png, spreads)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sample_dataset;

    fn approx(value: &Value, expected: f64) -> bool {
        (value.as_f64().unwrap() - expected).abs() < 1e-6
    }

    #[test]
    fn dataset_summary_has_both_tables() {
        let json = dataset_summary(&sample_dataset()).unwrap();
        assert_eq!(json["price_details_summary"]["Price_USD"]["count"], 9);
        assert_eq!(json["car_details_summary"]["Year"]["max"], 2023.0);
        assert!(json["car_details_summary"]["Mileage_km"].get("25%").is_some());
    }

    #[test]
    fn numeric_summary_matches_formulas() {
        let json = numeric_summary(&sample_dataset()).unwrap();
        let price = &json["Price_USD"];
        assert_eq!(price["count"], 9);
        assert!(approx(&price["mean"], 237000.0 / 9.0));
        assert_eq!(price["min"], 5000.0);
        assert_eq!(price["max"], 75000.0);

        let prices = [8000.0, 22000.0, 11000.0, 38000.0, 45000.0, 5000.0, 26000.0, 75000.0, 7000.0];
        let mean = prices.iter().sum::<f64>() / 9.0;
        let std = (prices.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / 8.0).sqrt();
        assert!(approx(&price["std"], std));
        for column in SUMMARY_COLUMNS {
            assert!(json.get(column).is_some());
        }
    }

    #[test]
    fn two_by_two_correlation_has_unit_diagonal() {
        let json = mileage_price_correlation(&sample_dataset()).unwrap();
        let data = json["data"].as_object().unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(json["data"]["Mileage_km"]["Mileage_km"], 1.0);
        assert_eq!(json["data"]["Price_USD"]["Price_USD"], 1.0);
        assert_eq!(
            json["data"]["Mileage_km"]["Price_USD"],
            json["data"]["Price_USD"]["Mileage_km"]
        );
        assert!(json["data"]["Mileage_km"]["Price_USD"].as_f64().unwrap() < 0.0);
    }

    #[test]
    fn histogram_covers_all_prices() {
        let json = price_histogram(&sample_dataset()).unwrap();
        let bins = json["data"].as_array().unwrap();
        assert_eq!(bins.len(), HISTOGRAM_BINS);
        let total: u64 = bins.iter().map(|b| b["count"].as_u64().unwrap()).sum();
        assert_eq!(total, 9);
    }

    #[test]
    fn scatter_reports_pair_count() {
        let json = mileage_price_scatter(&sample_dataset()).unwrap();
        assert_eq!(json["data"]["count"], 9);
    }

    #[test]
    fn price_spread_has_quartiles_per_fuel() {
        let json = price_spread_by_fuel_type(&sample_dataset()).unwrap();
        assert!(approx(&json["data"]["Electric"]["median"], 56500.0));
        assert_eq!(json["data"].as_object().unwrap().len(), 4);
    }
}
