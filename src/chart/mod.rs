/// Chart layer: spec + filtered data → renderer-agnostic [`ChartDescription`].
///
/// `dispatch` is the single decision point over [`ChartType`]; `aggregate`
/// holds the table reshaping it needs and `stats` the summaries renderers
/// compute from raw data (bins, box whiskers, colour splits).
pub mod aggregate;
pub mod dispatch;
pub mod stats;

use serde::Serialize;
use thiserror::Error;

use crate::data::model::Dataset;
use crate::spec::ChartType;

pub use dispatch::make_chart;

/// Why no chart was produced. The message is meant for the user.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChartError {
    /// The spec itself carries a parse diagnostic.
    #[error("{0}")]
    InvalidSpec(String),

    #[error("Unsupported chart type: {0}")]
    Unsupported(String),

    #[error("{chart} requires {needs}")]
    MissingField {
        chart: &'static str,
        needs: &'static str,
    },

    #[error("Column '{0}' not found in dataset")]
    UnknownColumn(String),

    #[error("Heatmap requires at least one numeric column")]
    NoNumericColumns,
}

/// How the columns of `ChartDescription::data` map onto the chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mark", rename_all = "snake_case")]
pub enum Encoding {
    Bar {
        x: String,
        y: String,
        color: Option<Vec<String>>,
        /// Side-by-side bars per colour group.
        grouped: bool,
    },
    Pie {
        names: Vec<String>,
        values: String,
    },
    Line {
        /// `None` plots against the row index.
        x: Option<String>,
        y: String,
        color: Option<Vec<String>>,
    },
    Histogram {
        x: String,
    },
    Scatter {
        x: Option<String>,
        y: String,
        color: Option<Vec<String>>,
    },
    Box {
        x: Option<Vec<String>>,
        y: String,
    },
    /// `data` is a square correlation matrix; its first column holds the row
    /// labels, the remaining columns are named after `labels`.
    Heatmap {
        labels: Vec<String>,
    },
    Treemap {
        path: Vec<String>,
        values: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Margin {
    pub left: u16,
    pub right: u16,
    pub top: u16,
    pub bottom: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HoverMode {
    /// Hover reports the single data point nearest to the cursor.
    Closest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Layout {
    pub margin: Margin,
    pub hover: HoverMode,
}

impl Default for Layout {
    fn default() -> Self {
        Layout {
            margin: Margin {
                left: 40,
                right: 40,
                top: 50,
                bottom: 40,
            },
            hover: HoverMode::Closest,
        }
    }
}

/// A chart ready to render: built fresh per request, never cached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartDescription {
    pub chart_type: ChartType,
    pub title: String,
    /// Raw rows or the aggregated table, depending on the chart.
    pub data: Dataset,
    pub encoding: Encoding,
    pub layout: Layout,
}
