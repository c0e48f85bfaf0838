//! Data module - CSV loading, joining and column processing

mod dataset;
mod loader;
mod processor;

pub use dataset::{
    Dataset, DatasetSummary, CAR_DETAILS_COLUMNS, CAR_DETAILS_NUMERIC, CAR_ID,
    PRICE_DETAILS_COLUMNS, PRICE_DETAILS_NUMERIC,
};
pub use loader::{DataError, DataLoader};
pub use processor::DataProcessor;

#[cfg(test)]
pub(crate) use dataset::sample_dataset;
