//! Statistics module - Descriptive stats, quartiles and correlation

mod calculator;

pub use calculator::{
    BoxStats, ColumnSummary, DescriptiveStats, HistogramBin, StatsCalculator, WHISKER_IQR,
};
