//! The in-memory car market dataset: listings, prices and their join.

use crate::data::{DataError, DataLoader, DataProcessor};
use crate::stats::{ColumnSummary, StatsCalculator};
use polars::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Join key shared by both tables.
pub const CAR_ID: &str = "Car_ID";

/// Columns the listing table must carry.
pub const CAR_DETAILS_COLUMNS: [&str; 9] = [
    CAR_ID,
    "Brand",
    "Model",
    "Year",
    "Fuel_Type",
    "Transmission",
    "Mileage_km",
    "Engine_cc",
    "Location",
];

/// Columns the price table must carry.
pub const PRICE_DETAILS_COLUMNS: [&str; 2] = [CAR_ID, "Price_USD"];

/// Listing columns that must parse as numbers.
pub const CAR_DETAILS_NUMERIC: [&str; 3] = ["Year", "Mileage_km", "Engine_cc"];

/// Price columns that must parse as numbers.
pub const PRICE_DETAILS_NUMERIC: [&str; 1] = ["Price_USD"];

/// Per-table descriptive summaries, computed once at load time.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub car_details_summary: BTreeMap<String, ColumnSummary>,
    pub price_details_summary: BTreeMap<String, ColumnSummary>,
}

/// Immutable tables shared by every report.
#[derive(Debug)]
pub struct Dataset {
    car_details: DataFrame,
    price_details: DataFrame,
    merged: DataFrame,
    summary: DatasetSummary,
}

impl Dataset {
    /// Load both CSV files, validate them and build the joined view.
    pub fn load(car_details_path: &Path, price_details_path: &Path) -> Result<Self, DataError> {
        let car_details = DataLoader::load_csv(car_details_path)?;
        let price_details = DataLoader::load_csv(price_details_path)?;
        let dataset = Self::from_frames(car_details, price_details)?;

        info!(
            cars = dataset.car_details.height(),
            prices = dataset.price_details.height(),
            merged = dataset.merged.height(),
            "Dataset loaded"
        );
        Ok(dataset)
    }

    /// Build a dataset from frames already in memory.
    pub fn from_frames(car_details: DataFrame, price_details: DataFrame) -> Result<Self, DataError> {
        DataLoader::require_columns(&car_details, "car details", &CAR_DETAILS_COLUMNS)?;
        DataLoader::require_columns(&price_details, "price details", &PRICE_DETAILS_COLUMNS)?;
        Self::require_numeric(&car_details, "car details", &CAR_DETAILS_NUMERIC)?;
        Self::require_numeric(&price_details, "price details", &PRICE_DETAILS_NUMERIC)?;

        let key_type = Self::join_key_type(&car_details, &price_details)?;
        let merged = car_details
            .clone()
            .lazy()
            .with_column(col(CAR_ID).cast(key_type.clone()))
            .join(
                price_details
                    .clone()
                    .lazy()
                    .with_column(col(CAR_ID).cast(key_type)),
                [col(CAR_ID)],
                [col(CAR_ID)],
                JoinArgs::new(JoinType::Inner),
            )
            .collect()?;

        let summary = DatasetSummary {
            car_details_summary: Self::describe(&car_details)?,
            price_details_summary: Self::describe(&price_details)?,
        };

        Ok(Self {
            car_details,
            price_details,
            merged,
            summary,
        })
    }

    /// Common type for `Car_ID` on both sides of the join.
    ///
    /// Integer ids join as integers, mixed numeric ids as floats (so 7 and
    /// 7.0 match), and anything textual as strings.
    fn join_key_type(car_details: &DataFrame, price_details: &DataFrame) -> Result<DataType, DataError> {
        let left = car_details.column(CAR_ID)?.dtype();
        let right = price_details.column(CAR_ID)?.dtype();
        let key_type = if left.is_integer() && right.is_integer() {
            DataType::Int64
        } else if left.is_primitive_numeric() && right.is_primitive_numeric() {
            DataType::Float64
        } else {
            DataType::String
        };
        debug!(left = %left, right = %right, key = %key_type, "Join key type");
        Ok(key_type)
    }

    /// Fail unless each of `columns` holds numbers.
    fn require_numeric(df: &DataFrame, table: &str, columns: &[&str]) -> Result<(), DataError> {
        for column in columns {
            let values = df.column(column)?;
            let dtype = values.dtype();
            // A column with no values at all is read as null strings.
            let all_null = values.null_count() == df.height();
            if !dtype.is_primitive_numeric() && !all_null {
                return Err(DataError::NonNumericColumn {
                    table: table.to_string(),
                    column: column.to_string(),
                    dtype: dtype.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Summary of every numeric column of `df`.
    fn describe(df: &DataFrame) -> Result<BTreeMap<String, ColumnSummary>, DataError> {
        let columns = DataLoader::get_numeric_columns(df)
            .into_iter()
            .map(|name| {
                let values = DataProcessor::non_null_values(df, &name)?;
                Ok((name, values))
            })
            .collect::<Result<Vec<_>, DataError>>()?;
        Ok(StatsCalculator::describe_columns(columns))
    }

    pub fn car_details(&self) -> &DataFrame {
        &self.car_details
    }

    pub fn price_details(&self) -> &DataFrame {
        &self.price_details
    }

    /// Inner join of listings and prices on `Car_ID`.
    pub fn merged(&self) -> &DataFrame {
        &self.merged
    }

    pub fn summary(&self) -> &DatasetSummary {
        &self.summary
    }
}

/// A small market used by unit tests across the crate.
#[cfg(test)]
pub(crate) fn sample_dataset() -> Dataset {
    let cars = df!(
        "Car_ID" => [1i64, 2, 3, 4, 5, 6, 7, 8, 9, 10],
        "Brand" => ["Toyota", "Toyota", "Honda", "Tesla", "BMW", "Toyota", "Honda", "Tesla", "Ford", "BMW"],
        "Model" => ["Corolla", "Camry", "Civic", "Model 3", "X5", "Corolla", "Accord", "Model S", "Focus", "M3"],
        "Year" => [2015i64, 2018, 2016, 2021, 2019, 2012, 2020, 2022, 2014, 2023],
        "Fuel_Type" => ["Petrol", "Hybrid", "Petrol", "Electric", "Diesel", "Petrol", "Hybrid", "Electric", "Diesel", "Petrol"],
        "Transmission" => ["Manual", "Automatic", "Manual", "Automatic", "Automatic", "Manual", "Automatic", "Automatic", "Manual", "Automatic"],
        "Mileage_km" => [90000i64, 45000, 70000, 15000, 40000, 150000, 30000, 8000, 120000, 5000],
        "Engine_cc" => [1600i64, 2500, 1800, 0, 3000, 1600, 2000, 0, 1500, 3000],
        "Location" => ["Berlin", "Paris", "Berlin", "Oslo", "Munich", "Paris", "Berlin", "Oslo", "London", "Munich"]
    )
    .unwrap();
    // Car 10 has no price and must drop out of the join.
    let prices = df!(
        "Car_ID" => [1i64, 2, 3, 4, 5, 6, 7, 8, 9],
        "Price_USD" => [8000.0, 22000.0, 11000.0, 38000.0, 45000.0, 5000.0, 26000.0, 75000.0, 7000.0]
    )
    .unwrap();
    Dataset::from_frames(cars, prices).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn join_drops_unmatched_rows() {
        let dataset = sample_dataset();
        assert_eq!(dataset.car_details().height(), 10);
        assert_eq!(dataset.price_details().height(), 9);
        assert_eq!(dataset.merged().height(), 9);
        assert!(dataset.merged().column("Price_USD").is_ok());
        assert!(dataset.merged().column("Brand").is_ok());
    }

    #[test]
    fn summary_covers_numeric_columns_only() {
        let summary = sample_dataset().summary().clone();
        let car_columns: Vec<&String> = summary.car_details_summary.keys().collect();
        assert_eq!(car_columns, vec!["Car_ID", "Engine_cc", "Mileage_km", "Year"]);
        assert_eq!(summary.price_details_summary["Price_USD"].count, 9);
    }

    #[test]
    fn missing_required_column_fails() {
        let cars = df!("Car_ID" => [1i64], "Brand" => ["Kia"]).unwrap();
        let prices = df!("Car_ID" => [1i64], "Price_USD" => [1.0]).unwrap();
        let err = Dataset::from_frames(cars, prices).unwrap_err();
        assert!(matches!(err, DataError::MissingColumn { .. }));
    }

    fn listing(ids: Series) -> DataFrame {
        let mut cars = df!(
            "Brand" => ["Kia", "Ford"],
            "Model" => ["Rio", "Focus"],
            "Year" => [2019i64, 2015],
            "Fuel_Type" => ["Petrol", "Diesel"],
            "Transmission" => ["Manual", "Manual"],
            "Mileage_km" => [30000i64, 80000],
            "Engine_cc" => [1400i64, 1500],
            "Location" => ["Seoul", "Leeds"]
        )
        .unwrap();
        cars.insert_column(0, ids.with_name(CAR_ID.into())).unwrap();
        cars
    }

    #[test]
    fn integer_and_float_ids_join() {
        let cars = listing(Series::new("".into(), [1i64, 2]));
        let prices = df!("Car_ID" => [1.0f64, 2.0], "Price_USD" => [9000.0, 6000.0]).unwrap();
        let dataset = Dataset::from_frames(cars, prices).unwrap();
        assert_eq!(dataset.merged().height(), 2);
        assert_eq!(dataset.merged().column(CAR_ID).unwrap().dtype(), &DataType::Float64);
    }

    #[test]
    fn textual_and_integer_ids_join() {
        let cars = listing(Series::new("".into(), ["1", "2"]));
        let prices = df!("Car_ID" => [2i64], "Price_USD" => [6000.0]).unwrap();
        let dataset = Dataset::from_frames(cars, prices).unwrap();
        assert_eq!(dataset.merged().height(), 1);
    }

    #[test]
    fn integer_ids_stay_integers() {
        assert_eq!(
            sample_dataset().merged().column(CAR_ID).unwrap().dtype(),
            &DataType::Int64
        );
    }

    #[test]
    fn text_in_price_column_fails() {
        let cars = listing(Series::new("".into(), [1i64, 2]));
        let prices = df!("Car_ID" => [1i64, 2], "Price_USD" => ["10000", "N/A"]).unwrap();
        match Dataset::from_frames(cars, prices) {
            Err(DataError::NonNumericColumn { table, column, .. }) => {
                assert_eq!(table, "price details");
                assert_eq!(column, "Price_USD");
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn text_in_listing_number_column_fails() {
        let mut cars = listing(Series::new("".into(), [1i64, 2]));
        cars.replace("Mileage_km", Series::new("Mileage_km".into(), ["30000", "unknown"]))
            .unwrap();
        let prices = df!("Car_ID" => [1i64, 2], "Price_USD" => [9000.0, 6000.0]).unwrap();
        let err = Dataset::from_frames(cars, prices).unwrap_err();
        assert!(matches!(err, DataError::NonNumericColumn { ref column, .. } if column == "Mileage_km"));
    }

    #[test]
    fn load_rejects_non_numeric_price_cell() {
        let mut cars = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            cars,
            "Car_ID,Brand,Model,Year,Fuel_Type,Transmission,Mileage_km,Engine_cc,Location"
        )
        .unwrap();
        writeln!(cars, "1,Kia,Rio,2019,Petrol,Manual,30000,1400,Seoul").unwrap();
        writeln!(cars, "2,Kia,EV6,2022,Electric,Automatic,10000,0,Busan").unwrap();

        let mut prices = tempfile::NamedTempFile::new().unwrap();
        writeln!(prices, "Car_ID,Price_USD").unwrap();
        writeln!(prices, "1,10000").unwrap();
        writeln!(prices, "2,N/A").unwrap();

        let err = Dataset::load(cars.path(), prices.path()).unwrap_err();
        assert!(matches!(err, DataError::NonNumericColumn { .. }));
    }

    #[test]
    fn load_reads_both_files() {
        let mut cars = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            cars,
            "Car_ID,Brand,Model,Year,Fuel_Type,Transmission,Mileage_km,Engine_cc,Location"
        )
        .unwrap();
        writeln!(cars, "1,Kia,Rio,2019,Petrol,Manual,30000,1400,Seoul").unwrap();
        writeln!(cars, "2,Kia,EV6,2022,Electric,Automatic,10000,0,Busan").unwrap();

        let mut prices = tempfile::NamedTempFile::new().unwrap();
        writeln!(prices, "Car_ID,Price_USD").unwrap();
        writeln!(prices, "2,41000").unwrap();

        let dataset = Dataset::load(cars.path(), prices.path()).unwrap();
        assert_eq!(dataset.merged().height(), 1);
    }
}
