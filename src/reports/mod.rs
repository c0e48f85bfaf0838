//! Reports module - One fixed aggregation recipe per endpoint
//!
//! Every report is a pure function of the loaded [`Dataset`]. Ordered results
//! are returned as arrays of records so the order survives JSON; category
//! mappings are objects sorted by key. Chart-bearing reports wrap their data
//! in [`ImageReport`].

mod categories;
mod pricing;
mod summary;

use crate::charts::{ChartError, StaticChartRenderer};
use crate::data::{DataError, Dataset};
use crate::stats::StatsCalculator;
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Chart(#[from] ChartError),
    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<polars::prelude::PolarsError> for ReportError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        ReportError::Data(DataError::from(err))
    }
}

pub type ReportFn = fn(&Dataset) -> Result<Value, ReportError>;

/// A routable report.
pub struct Report {
    pub path: &'static str,
    pub name: &'static str,
    pub run: ReportFn,
}

/// Every report the service exposes, in route order.
pub static REPORTS: [Report; 26] = [
    Report { path: "/analysis", name: "dataset_summary", run: summary::dataset_summary },
    Report { path: "/analysis1", name: "top_brands", run: categories::top_brands },
    Report { path: "/analysis2", name: "fuel_type_counts", run: categories::fuel_type_counts },
    Report { path: "/analysis3", name: "mean_price_by_brand", run: pricing::mean_price_by_brand },
    Report { path: "/analysis4", name: "median_price_by_fuel_type", run: pricing::median_price_by_fuel_type },
    Report { path: "/analysis5", name: "transmission_counts", run: categories::transmission_counts },
    Report { path: "/analysis6", name: "numeric_summary", run: summary::numeric_summary },
    Report { path: "/analysis7", name: "mean_price_by_year", run: pricing::mean_price_by_year },
    Report { path: "/analysis8", name: "mean_price_by_age", run: pricing::mean_price_by_age },
    Report { path: "/analysis9", name: "price_histogram", run: summary::price_histogram },
    Report { path: "/analysis10", name: "mean_mileage_by_brand", run: pricing::mean_mileage_by_brand },
    Report { path: "/analysis11", name: "top_locations", run: categories::top_locations },
    Report { path: "/analysis12", name: "mileage_price_correlation", run: summary::mileage_price_correlation },
    Report { path: "/analysis13", name: "mean_price_by_transmission", run: pricing::mean_price_by_transmission },
    Report { path: "/analysis14", name: "mileage_price_scatter", run: summary::mileage_price_scatter },
    Report { path: "/analysis15", name: "mean_engine_by_fuel_type", run: pricing::mean_engine_by_fuel_type },
    Report { path: "/analysis16", name: "top_models_by_price", run: pricing::top_models_by_price },
    Report { path: "/analysis17", name: "listings_per_year", run: categories::listings_per_year },
    Report { path: "/analysis18", name: "mean_price_by_location", run: pricing::mean_price_by_location },
    Report { path: "/analysis19", name: "price_spread_by_fuel_type", run: summary::price_spread_by_fuel_type },
    Report { path: "/analysis20", name: "brand_transmission_crosstab", run: categories::brand_transmission_crosstab },
    Report { path: "/analysis21", name: "median_mileage_by_year", run: pricing::median_mileage_by_year },
    Report { path: "/analysis22", name: "numeric_correlation_matrix", run: summary::numeric_correlation_matrix },
    Report { path: "/analysis23", name: "electric_brand_distribution", run: categories::electric_brand_distribution },
    Report { path: "/analysis24", name: "price_segments", run: categories::price_segments },
    Report { path: "/analysis25", name: "mean_price_by_brand_and_fuel", run: pricing::mean_price_by_brand_and_fuel },
];

/// Chart plus the data it was drawn from.
#[derive(Debug, Serialize)]
pub struct ImageReport<T> {
    /// Base64-encoded PNG
    pub image: String,
    pub data: T,
}

/// A category and how many rows fall into it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountRecord<K> {
    pub label: K,
    pub count: usize,
}

/// A category and an aggregated value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueRecord<K> {
    pub label: K,
    pub value: f64,
}

/// How a group of values collapses to one number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Mean,
    Median,
}

impl Aggregation {
    pub fn apply(self, values: &[f64]) -> f64 {
        match self {
            Aggregation::Mean => StatsCalculator::mean(values),
            Aggregation::Median => StatsCalculator::median(values),
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, ReportError> {
    Ok(serde_json::to_value(value)?)
}

fn with_image<T: Serialize>(png: Vec<u8>, data: T) -> Result<Value, ReportError> {
    to_json(&ImageReport {
        image: StaticChartRenderer::to_base64(&png),
        data,
    })
}

/// Sort records by value, largest first; NaN values go last.
fn sort_descending<K>(records: &mut [ValueRecord<K>]) {
    records.sort_by(|a, b| match (a.value.is_nan(), b.value.is_nan()) {
        (false, false) => b.value.partial_cmp(&a.value).unwrap_or(Ordering::Equal),
        (a_nan, b_nan) => a_nan.cmp(&b_nan),
    });
}

fn count_bars(records: &[CountRecord<String>]) -> Vec<(String, f64)> {
    records
        .iter()
        .map(|r| (r.label.clone(), r.count as f64))
        .collect()
}

fn value_bars(records: &[ValueRecord<String>]) -> Vec<(String, f64)> {
    records
        .iter()
        .map(|r| (r.label.clone(), r.value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sample_dataset;
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use std::collections::HashSet;

    #[test]
    fn routes_are_unique_and_complete() {
        let paths: HashSet<&str> = REPORTS.iter().map(|r| r.path).collect();
        assert_eq!(paths.len(), REPORTS.len());
        assert!(paths.contains("/analysis"));
        for i in 1..=25 {
            assert!(paths.contains(format!("/analysis{}", i).as_str()));
        }
    }

    #[test]
    fn every_report_runs_and_is_deterministic() {
        let dataset = sample_dataset();
        for report in REPORTS.iter() {
            let first = (report.run)(&dataset)
                .unwrap_or_else(|e| panic!("{} failed: {}", report.name, e));
            let second = (report.run)(&dataset).unwrap();
            assert_eq!(first, second, "{} is not deterministic", report.name);

            if let Some(image) = first.get("image") {
                let png = STANDARD.decode(image.as_str().unwrap()).unwrap();
                assert!(png.starts_with(b"\x89PNG"), "{} image is not a PNG", report.name);
                assert!(first.get("data").is_some());
            }
        }
    }

    #[test]
    fn sort_descending_puts_nan_last() {
        let mut records = vec![
            ValueRecord { label: "a", value: f64::NAN },
            ValueRecord { label: "b", value: 1.0 },
            ValueRecord { label: "c", value: 3.0 },
        ];
        sort_descending(&mut records);
        let labels: Vec<&str> = records.iter().map(|r| r.label).collect();
        assert_eq!(labels, vec!["c", "b", "a"]);
    }

    #[test]
    fn aggregation_applies_mean_and_median() {
        assert_eq!(Aggregation::Mean.apply(&[1.0, 2.0, 6.0]), 3.0);
        assert_eq!(Aggregation::Median.apply(&[1.0, 2.0, 6.0]), 2.0);
    }
}
