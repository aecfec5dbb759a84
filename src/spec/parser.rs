use std::sync::LazyLock;

use log::{debug, warn};
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};

use super::llm::{CompletionModel, TransportError};
use super::prompt::build_prompt;
use super::{ChartSpec, FilterClause, FilterOp, GroupBy, Operands, RequestedChart};
use crate::data::model::CellValue;

static LEADING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```[A-Za-z0-9_+-]*\s*").expect("valid fence pattern"));
static TRAILING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*```$").expect("valid fence pattern"));

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Turn a free-text request into a [`ChartSpec`] with one model call.
///
/// Unreadable model output is recovered into `ChartSpec::error`; only a
/// failure to reach the model is returned as an error.
pub fn parse_request(
    model: &dyn CompletionModel,
    request: &str,
    columns: &[String],
) -> Result<ChartSpec, TransportError> {
    let prompt = build_prompt(request, columns);
    debug!("Prompt:\n{prompt}");
    let raw = model.complete(&prompt)?;
    Ok(parse_response(&raw))
}

/// Interpret raw model output as a chart spec.
pub fn parse_response(raw: &str) -> ChartSpec {
    let content = strip_fences(raw);
    let parsed = serde_json::from_str::<JsonValue>(content).and_then(|value| match value {
        JsonValue::Object(_) => serde_json::from_value::<RawSpec>(value),
        other => Err(serde::de::Error::custom(format!(
            "expected a JSON object, found {other}"
        ))),
    });
    match parsed {
        Ok(spec) => spec.into_spec(),
        Err(e) => {
            warn!("Model output is not a chart spec: {e}");
            ChartSpec::unparsed(format!("Could not parse JSON from model:\n{content}"))
        }
    }
}

/// Drop one optional leading fence (with language tag) and one optional
/// trailing fence.
pub fn strip_fences(raw: &str) -> &str {
    let mut content = raw.trim();
    if let Some(m) = LEADING_FENCE.find(content) {
        content = &content[m.end()..];
    }
    if let Some(m) = TRAILING_FENCE.find(content) {
        content = &content[..m.start()];
    }
    content.trim()
}

// ---------------------------------------------------------------------------
// Boundary validation
// ---------------------------------------------------------------------------

/// Model output as received: every key optional, any JSON type.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSpec {
    chart_type: Option<JsonValue>,
    x_column: Option<JsonValue>,
    y_column: Option<JsonValue>,
    group_by: Option<JsonValue>,
    filters: Option<JsonValue>,
}

impl RawSpec {
    fn into_spec(self) -> ChartSpec {
        ChartSpec {
            chart_type: self.chart_type.as_ref().and_then(requested_chart),
            x_column: self.x_column.as_ref().and_then(column_name),
            y_column: self.y_column.as_ref().and_then(column_name),
            group_by: self.group_by.as_ref().and_then(group_by),
            filters: match self.filters {
                Some(JsonValue::Array(items)) => items
                    .iter()
                    .filter_map(JsonValue::as_object)
                    .map(filter_clause)
                    .collect(),
                _ => Vec::new(),
            },
            error: None,
        }
    }
}

fn requested_chart(val: &JsonValue) -> Option<RequestedChart> {
    match val {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(RequestedChart::from_name(s)),
        other => Some(RequestedChart::Unsupported(other.to_string())),
    }
}

fn column_name(val: &JsonValue) -> Option<String> {
    match val {
        JsonValue::String(s) if !s.trim().is_empty() => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn group_by(val: &JsonValue) -> Option<GroupBy> {
    match val {
        JsonValue::Array(items) => Some(GroupBy::Many(
            items.iter().filter_map(column_name).collect(),
        )),
        other => column_name(other).map(GroupBy::Single),
    }
}

fn filter_clause(obj: &Map<String, JsonValue>) -> FilterClause {
    FilterClause {
        column: obj.get("column").and_then(column_name),
        op: obj
            .get("op")
            .and_then(JsonValue::as_str)
            .map(FilterOp::parse),
        values: obj.get("values").and_then(|v| match v {
            JsonValue::Null => None,
            JsonValue::Array(items) => Some(Operands::Many(
                items.iter().map(CellValue::from).collect(),
            )),
            scalar => Some(Operands::One(CellValue::from(scalar))),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::ChartType;
    use crate::spec::llm::stub::StubModel;
    use proptest::prelude::*;

    struct DownModel;

    impl CompletionModel for DownModel {
        fn complete(&self, _prompt: &str) -> Result<String, TransportError> {
            Err(TransportError::EmptyCompletion)
        }
    }

    fn columns() -> Vec<String> {
        vec!["city".into(), "season".into(), "runs".into()]
    }

    #[test]
    fn test_parse_request_sends_prompt_and_parses_fenced_reply() {
        let model = StubModel::new(
            "```json\n{\"chart_type\":\"bar\",\"x_column\":\"city\",\"y_column\":null,\"group_by\":null,\"filters\":[]}\n```",
        );
        let spec = parse_request(&model, "matches per city", &columns()).unwrap();

        assert_eq!(spec.chart_type, Some(RequestedChart::Supported(ChartType::Bar)));
        assert_eq!(spec.x_column.as_deref(), Some("city"));
        assert_eq!(spec.y_column, None);
        assert!(spec.filters.is_empty());
        assert!(spec.error.is_none());

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains("city, season, runs"));
        assert!(seen[0].ends_with("User request: matches per city"));
    }

    #[test]
    fn test_transport_failure_propagates() {
        let result = parse_request(&DownModel, "anything", &columns());
        assert!(matches!(result, Err(TransportError::EmptyCompletion)));
    }

    #[test]
    fn test_prose_reply_is_recovered_into_error() {
        let reply = "Sure! Here is a bar chart of matches by city.";
        let spec = parse_response(reply);

        assert_eq!(spec.chart_type, None);
        assert_eq!(spec.x_column, None);
        assert_eq!(spec.group_by, None);
        assert!(spec.filters.is_empty());
        let error = spec.error.unwrap();
        assert!(error.contains(reply), "error was {error:?}");
    }

    #[test]
    fn test_missing_filters_default_to_empty() {
        let spec = parse_response(r#"{"chart_type":"pie","x_column":"city"}"#);
        assert!(spec.filters.is_empty());
        assert!(spec.error.is_none());
        assert_eq!(spec.y_column, None);
    }

    #[test]
    fn test_malformed_filters_become_well_formed() {
        let spec = parse_response(r#"{"chart_type":"bar","filters":"season > 2020"}"#);
        assert!(spec.filters.is_empty());

        let spec = parse_response(
            r#"{"chart_type":"bar","filters":[42, {"column":"season","op":"~","values":2020}, {"op":"=="}]}"#,
        );
        assert_eq!(spec.filters.len(), 2);
        assert_eq!(
            spec.filters[0],
            FilterClause {
                column: Some("season".into()),
                op: Some(FilterOp::Unsupported("~".into())),
                values: Some(Operands::One(CellValue::Integer(2020))),
            }
        );
        assert_eq!(spec.filters[1].column, None);
        assert_eq!(spec.filters[1].values, None);
    }

    #[test]
    fn test_group_by_and_unknown_chart_type() {
        let spec = parse_response(
            r#"{"chart_type":"unsupported_type","group_by":["city","season"],"y_column":""}"#,
        );
        assert_eq!(
            spec.chart_type,
            Some(RequestedChart::Unsupported("unsupported_type".into()))
        );
        assert_eq!(
            spec.group_by,
            Some(GroupBy::Many(vec!["city".into(), "season".into()]))
        );
        assert_eq!(spec.y_column, None);
    }

    #[test]
    fn test_top_level_array_is_a_parse_failure() {
        let spec = parse_response("[1, 2, 3]");
        assert!(spec.error.unwrap().contains("[1, 2, 3]"));
    }

    #[test]
    fn test_strip_fences_variants() {
        assert_eq!(strip_fences("{}"), "{}");
        assert_eq!(strip_fences("```{}```"), "{}");
        assert_eq!(strip_fences("  ```json\n{}\n```  "), "{}");
        assert_eq!(strip_fences("```JSON5 {}"), "{}");
        assert_eq!(strip_fences("{}\n```"), "{}");
    }

    fn arb_spec_json() -> impl Strategy<Value = JsonValue> {
        let name = prop_oneof![Just(JsonValue::Null), "[a-z_]{1,10}".prop_map(JsonValue::String)];
        let clause = ("[a-z]{1,8}", prop_oneof![Just("=="), Just(">="), Just("<="), Just("between")], -1000i64..1000, -1000i64..1000)
            .prop_map(|(c, op, lo, hi)| serde_json::json!({"column": c, "op": op, "values": [lo, hi]}));
        (
            prop_oneof![Just("bar"), Just("pie"), Just("line"), Just("treemap"), Just("radar")],
            name.clone(),
            name,
            prop::collection::vec("[a-z]{1,6}", 0..3),
            prop::collection::vec(clause, 0..3),
        )
            .prop_map(|(ct, x, y, grp, filters)| {
                serde_json::json!({
                    "chart_type": ct,
                    "x_column": x,
                    "y_column": y,
                    "group_by": grp,
                    "filters": filters,
                })
            })
    }

    proptest! {
        #[test]
        fn prop_fence_stripping_round_trips(
            value in arb_spec_json(),
            tag in prop_oneof![Just(""), Just("json"), Just("JSON")],
            fenced in any::<bool>(),
            pretty in any::<bool>(),
        ) {
            let body = if pretty {
                serde_json::to_string_pretty(&value).unwrap()
            } else {
                serde_json::to_string(&value).unwrap()
            };
            let raw = if fenced { format!("```{tag}\n{body}\n```") } else { body.clone() };

            prop_assert_eq!(parse_response(&raw), parse_response(&body));
            let reparsed: JsonValue = serde_json::from_str(strip_fences(&raw)).unwrap();
            prop_assert_eq!(reparsed, value);
        }
    }
}
