//! Data Processor Module
//! Column extraction, filtering and grouping over loaded frames.

use crate::data::DataError;
use polars::prelude::*;
use std::collections::BTreeMap;

/// Handles column extraction and grouping operations.
pub struct DataProcessor;

impl DataProcessor {
    /// Read a column as `f64`, keeping nulls as `None`.
    pub fn numeric_values(df: &DataFrame, column: &str) -> Result<Vec<Option<f64>>, DataError> {
        let casted = df.column(column)?.cast(&DataType::Float64)?;
        let values = casted
            .as_materialized_series()
            .f64()?
            .into_iter()
            .map(|v| v.filter(|x| !x.is_nan()))
            .collect();
        Ok(values)
    }

    /// Read a column as `f64`, dropping nulls.
    pub fn non_null_values(df: &DataFrame, column: &str) -> Result<Vec<f64>, DataError> {
        Ok(Self::numeric_values(df, column)?
            .into_iter()
            .flatten()
            .collect())
    }

    /// Read a column as integers, keeping nulls as `None`.
    pub fn integer_values(df: &DataFrame, column: &str) -> Result<Vec<Option<i64>>, DataError> {
        let casted = df.column(column)?.cast(&DataType::Int64)?;
        let values = casted.as_materialized_series().i64()?.into_iter().collect();
        Ok(values)
    }

    /// Read a column as strings, keeping nulls as `None`.
    ///
    /// Values are taken verbatim: "Toyota " and "Toyota" are distinct labels.
    pub fn string_values(df: &DataFrame, column: &str) -> Result<Vec<Option<String>>, DataError> {
        let casted = df.column(column)?.cast(&DataType::String)?;
        let values = casted
            .as_materialized_series()
            .str()?
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect();
        Ok(values)
    }

    /// Count occurrences of each non-null value, most frequent first.
    ///
    /// Ties are broken by label so the order is stable across calls.
    pub fn value_counts(df: &DataFrame, column: &str) -> Result<Vec<(String, usize)>, DataError> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for value in Self::string_values(df, column)?.into_iter().flatten() {
            *counts.entry(value).or_default() += 1;
        }

        let mut ordered: Vec<(String, usize)> = counts.into_iter().collect();
        ordered.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(ordered)
    }

    /// Collect the non-null values of `value` for each non-null key.
    pub fn group_values<K: Ord>(
        keys: Vec<Option<K>>,
        values: Vec<Option<f64>>,
    ) -> BTreeMap<K, Vec<f64>> {
        let mut groups: BTreeMap<K, Vec<f64>> = BTreeMap::new();
        for (key, value) in keys.into_iter().zip(values) {
            if let Some(key) = key {
                let entry = groups.entry(key).or_default();
                if let Some(v) = value {
                    entry.push(v);
                }
            }
        }
        groups
    }

    /// Group a numeric column by a categorical one.
    pub fn group_by_label(
        df: &DataFrame,
        key: &str,
        value: &str,
    ) -> Result<BTreeMap<String, Vec<f64>>, DataError> {
        Ok(Self::group_values(
            Self::string_values(df, key)?,
            Self::numeric_values(df, value)?,
        ))
    }

    /// Group a numeric column by an integer one (e.g. `Year`).
    pub fn group_by_integer(
        df: &DataFrame,
        key: &str,
        value: &str,
    ) -> Result<BTreeMap<i64, Vec<f64>>, DataError> {
        Ok(Self::group_values(
            Self::integer_values(df, key)?,
            Self::numeric_values(df, value)?,
        ))
    }

    /// Filter rows where a string column equals `value`.
    pub fn filter_eq(df: &DataFrame, column: &str, value: &str) -> Result<DataFrame, DataError> {
        let filtered = df
            .clone()
            .lazy()
            .filter(col(column).cast(DataType::String).eq(lit(value)))
            .collect()?;
        Ok(filtered)
    }

    /// Return a copy of `df` with a `Car_Age` column derived from `Year`.
    pub fn with_car_age(df: &DataFrame, reference_year: i64) -> Result<DataFrame, DataError> {
        let aged = df
            .clone()
            .lazy()
            .with_column(
                (lit(reference_year) - col("Year").cast(DataType::Int64)).alias("Car_Age"),
            )
            .collect()?;
        Ok(aged)
    }
}
