/// Chart request layer: free text in, validated [`ChartSpec`] out.
///
/// ```text
///  user request + column names
///        │
///        ▼
///   ┌──────────┐
///   │  prompt   │  fixed instruction + schema + example
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │   llm     │  CompletionModel (Gemini over HTTP, or a stub)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  parser   │  strip fences → JSON → ChartSpec
///   └──────────┘
/// ```
pub mod llm;
pub mod parser;
pub mod prompt;

use std::fmt;

use serde::{Serialize, Serializer};

use crate::data::model::CellValue;

// ---------------------------------------------------------------------------
// ChartType – the closed set of supported charts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartType {
    Bar,
    Pie,
    Line,
    Histogram,
    Scatter,
    Box,
    Heatmap,
    Treemap,
}

impl ChartType {
    pub const ALL: [ChartType; 8] = [
        ChartType::Bar,
        ChartType::Pie,
        ChartType::Line,
        ChartType::Histogram,
        ChartType::Scatter,
        ChartType::Box,
        ChartType::Heatmap,
        ChartType::Treemap,
    ];

    /// Name used in the prompt and in model output.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Bar => "bar",
            ChartType::Pie => "pie",
            ChartType::Line => "line",
            ChartType::Histogram => "histogram",
            ChartType::Scatter => "scatter",
            ChartType::Box => "box",
            ChartType::Heatmap => "heatmap",
            ChartType::Treemap => "treemap",
        }
    }

    /// Human-readable name used in titles and validation messages.
    pub fn label(&self) -> &'static str {
        match self {
            ChartType::Bar => "Bar chart",
            ChartType::Pie => "Pie chart",
            ChartType::Line => "Line chart",
            ChartType::Histogram => "Histogram",
            ChartType::Scatter => "Scatter plot",
            ChartType::Box => "Box plot",
            ChartType::Heatmap => "Heatmap",
            ChartType::Treemap => "Treemap",
        }
    }

    /// Case-insensitive lookup of a model-provided name.
    pub fn parse(name: &str) -> Option<ChartType> {
        let name = name.trim();
        ChartType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ChartType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// What the model asked for: a chart we know, or a name we do not.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestedChart {
    Supported(ChartType),
    Unsupported(String),
}

impl RequestedChart {
    pub fn from_name(name: &str) -> Self {
        match ChartType::parse(name) {
            Some(t) => RequestedChart::Supported(t),
            None => RequestedChart::Unsupported(name.to_string()),
        }
    }
}

impl fmt::Display for RequestedChart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestedChart::Supported(t) => write!(f, "{t}"),
            RequestedChart::Unsupported(name) => write!(f, "{name}"),
        }
    }
}

impl Serialize for RequestedChart {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// GroupBy – one column or several
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GroupBy {
    Single(String),
    Many(Vec<String>),
}

impl GroupBy {
    /// Normalized grouping sequence; `None` when it names no column.
    pub fn columns(&self) -> Option<Vec<String>> {
        let cols = match self {
            GroupBy::Single(col) => vec![col.clone()],
            GroupBy::Many(cols) => cols.clone(),
        };
        (!cols.is_empty()).then_some(cols)
    }
}

// ---------------------------------------------------------------------------
// FilterClause
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum FilterOp {
    Eq,
    Ge,
    Le,
    Between,
    /// Anything else the model produced; applied as a no-op.
    Unsupported(String),
}

impl FilterOp {
    pub fn parse(op: &str) -> Self {
        match op.trim() {
            "==" => FilterOp::Eq,
            ">=" => FilterOp::Ge,
            "<=" => FilterOp::Le,
            other if other.eq_ignore_ascii_case("between") => FilterOp::Between,
            other => FilterOp::Unsupported(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FilterOp::Eq => "==",
            FilterOp::Ge => ">=",
            FilterOp::Le => "<=",
            FilterOp::Between => "between",
            FilterOp::Unsupported(op) => op,
        }
    }
}

impl Serialize for FilterOp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// The `values` of a clause: a bare scalar or a list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Operands {
    One(CellValue),
    Many(Vec<CellValue>),
}

impl Operands {
    pub fn first(&self) -> Option<&CellValue> {
        match self {
            Operands::One(v) => Some(v),
            Operands::Many(vs) => vs.first(),
        }
    }

    pub fn second(&self) -> Option<&CellValue> {
        match self {
            Operands::One(_) => None,
            Operands::Many(vs) => vs.get(1),
        }
    }
}

/// One column-level predicate. Every field may be missing in model output;
/// a clause without column, op or values is inert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterClause {
    pub column: Option<String>,
    pub op: Option<FilterOp>,
    pub values: Option<Operands>,
}

impl FilterClause {
    pub fn new(column: &str, op: FilterOp, values: Operands) -> Self {
        FilterClause {
            column: Some(column.to_string()),
            op: Some(op),
            values: Some(values),
        }
    }
}

// ---------------------------------------------------------------------------
// ChartSpec
// ---------------------------------------------------------------------------

/// Structured description of the requested chart, validated once at the
/// parser boundary. `filters` is always present, possibly empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSpec {
    pub chart_type: Option<RequestedChart>,
    pub x_column: Option<String>,
    pub y_column: Option<String>,
    pub group_by: Option<GroupBy>,
    pub filters: Vec<FilterClause>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChartSpec {
    /// Spec for a model reply that could not be interpreted.
    pub fn unparsed(error: String) -> Self {
        ChartSpec {
            error: Some(error),
            ..ChartSpec::default()
        }
    }

    /// Grouping columns, normalized to a non-empty sequence.
    pub fn group_columns(&self) -> Option<Vec<String>> {
        self.group_by.as_ref().and_then(GroupBy::columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chart_type_parse_is_case_insensitive() {
        assert_eq!(ChartType::parse(" Treemap "), Some(ChartType::Treemap));
        assert_eq!(ChartType::parse("donut"), None);
        assert_eq!(
            RequestedChart::from_name("unsupported_type"),
            RequestedChart::Unsupported("unsupported_type".to_string())
        );
    }

    #[test]
    fn test_group_by_normalizes_to_sequence() {
        assert_eq!(
            GroupBy::Single("city".into()).columns(),
            Some(vec!["city".to_string()])
        );
        assert_eq!(GroupBy::Many(vec![]).columns(), None);
    }

    #[test]
    fn test_spec_serializes_back_to_schema_keys() {
        let spec = ChartSpec {
            chart_type: Some(RequestedChart::Supported(ChartType::Bar)),
            x_column: Some("city".into()),
            group_by: Some(GroupBy::Single("season".into())),
            filters: vec![FilterClause::new(
                "season",
                FilterOp::Between,
                Operands::Many(vec![CellValue::Integer(2020), CellValue::Integer(2024)]),
            )],
            ..ChartSpec::default()
        };
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "chart_type": "bar",
                "x_column": "city",
                "y_column": null,
                "group_by": "season",
                "filters": [{"column": "season", "op": "between", "values": [2020, 2024]}]
            })
        );
    }
}
