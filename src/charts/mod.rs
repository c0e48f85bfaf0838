//! Charts module - Static PNG chart rendering

mod renderer;

pub use renderer::{ChartError, StaticChartRenderer, CHART_HEIGHT, CHART_WIDTH};
