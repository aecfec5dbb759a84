use super::ChartType;

/// The one worked example shown to the model.
const EXAMPLE_SPEC: &str = r#"{"chart_type":"bar","x_column":"city","y_column":null,"group_by":"season","filters":[{"column":"season","op":"between","values":[2020,2024]}]}"#;

/// Build the instruction sent to the language model.
///
/// Lists the available columns, the permitted chart types and the expected
/// JSON keys, shows one example, then appends the request verbatim.
pub fn build_prompt(request: &str, columns: &[String]) -> String {
    let cols = columns.join(", ");
    let chart_types = ChartType::ALL
        .iter()
        .map(|t| format!("\"{}\"", t.as_str()))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "You are a data-visualization assistant. I have a CSV with these columns: {cols}.\n\
         When given a user request, respond in strict JSON with keys:\n\
         \x20 - chart_type: one of {chart_types}\n\
         \x20 - x_column: column name or null\n\
         \x20 - y_column: column name or null\n\
         \x20 - group_by: column name or list of columns or null\n\
         \x20 - filters: list of objects with keys 'column', 'op' (one of \"==\", \">=\", \"<=\", \"between\"), 'values' or empty list\n\
         For example:\n\
         {EXAMPLE_SPEC}\n\
         User request: {request}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_lists_columns_types_example_and_request() {
        let columns = vec!["city".to_string(), "season".to_string(), "runs".to_string()];
        let prompt = build_prompt("runs by city since 2021", &columns);

        assert!(prompt.contains("these columns: city, season, runs."));
        for t in ChartType::ALL {
            assert!(prompt.contains(&format!("\"{}\"", t.as_str())));
        }
        for key in ["chart_type", "x_column", "y_column", "group_by", "filters"] {
            assert!(prompt.contains(key), "missing key {key}");
        }
        assert!(prompt.contains(EXAMPLE_SPEC));
        assert!(prompt.ends_with("User request: runs by city since 2021"));
    }

    #[test]
    fn test_example_is_valid_json() {
        let value: serde_json::Value = serde_json::from_str(EXAMPLE_SPEC).unwrap();
        assert_eq!(value["chart_type"], "bar");
    }
}
