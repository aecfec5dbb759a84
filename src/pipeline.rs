use log::{info, warn};

use crate::chart::{make_chart, ChartDescription, ChartError};
use crate::data::filter::apply_filters;
use crate::data::model::Dataset;
use crate::spec::llm::{CompletionModel, TransportError};
use crate::spec::parser::parse_request;
use crate::spec::ChartSpec;

/// Everything one request produced: the parsed spec (shown to the user) and
/// either a chart or the reason there is none.
#[derive(Debug)]
pub struct Outcome {
    pub spec: ChartSpec,
    pub chart: Result<ChartDescription, ChartError>,
}

/// Parse → filter → dispatch for a single request.
///
/// Only a failure to reach the language model is returned as `Err`; parse
/// and validation problems are part of the [`Outcome`].
pub fn run(
    model: &dyn CompletionModel,
    dataset: &Dataset,
    request: &str,
) -> Result<Outcome, TransportError> {
    let spec = parse_request(model, request, &dataset.columns)?;

    let chart = match &spec.error {
        Some(error) => Err(ChartError::InvalidSpec(error.clone())),
        None => {
            let filtered = apply_filters(dataset, &spec.filters);
            info!("{} of {} rows pass the filters", filtered.len(), dataset.len());
            make_chart(&filtered, &spec)
        }
    };

    match &chart {
        Ok(c) => info!("Request {request:?} produced '{}'", c.title),
        Err(e) => warn!("Request {request:?} produced no chart: {e}"),
    }
    Ok(Outcome { spec, chart })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::Encoding;
    use crate::data::model::CellValue;
    use crate::spec::llm::stub::StubModel;

    fn s(v: &str) -> CellValue {
        CellValue::String(v.to_string())
    }

    fn matches() -> Dataset {
        Dataset::new(
            vec!["city".into(), "season".into()],
            vec![
                vec![s("Mumbai"), CellValue::Integer(2019)],
                vec![s("Mumbai"), CellValue::Integer(2020)],
                vec![s("Delhi"), CellValue::Integer(2021)],
                vec![s("Mumbai"), CellValue::Integer(2024)],
                vec![s("Pune"), CellValue::Integer(2025)],
            ],
        )
    }

    #[test]
    fn test_run_filters_before_charting() {
        let model = StubModel::new(
            "```json\n{\"chart_type\":\"bar\",\"x_column\":\"city\",\"y_column\":null,\"group_by\":null,\
             \"filters\":[{\"column\":\"season\",\"op\":\"between\",\"values\":[2020,2024]}]}\n```",
        );
        let dataset = matches();
        let outcome = run(&model, &dataset, "matches by city for 2020-2024").unwrap();

        let chart = outcome.chart.unwrap();
        assert_eq!(chart.title, "Count of city");
        assert_eq!(
            chart.data.rows,
            vec![
                vec![s("Mumbai"), CellValue::Integer(2)],
                vec![s("Delhi"), CellValue::Integer(1)],
            ]
        );
        assert!(matches!(chart.encoding, Encoding::Bar { .. }));
        assert_eq!(outcome.spec.filters.len(), 1);
        // the loaded dataset is still whole
        assert_eq!(dataset.len(), 5);
        assert!(model.seen.lock().unwrap()[0].contains("city, season"));
    }

    #[test]
    fn test_run_surfaces_parse_failure_without_chart() {
        let model = StubModel::new("I cannot help with that.");
        let outcome = run(&model, &matches(), "???").unwrap();

        assert!(outcome.spec.filters.is_empty());
        let err = outcome.chart.unwrap_err();
        assert!(matches!(err, ChartError::InvalidSpec(_)));
        assert!(err.to_string().contains("I cannot help with that."));
    }

    #[test]
    fn test_run_reports_validation_errors() {
        let model = StubModel::new(r#"{"chart_type":"line","x_column":"season"}"#);
        let outcome = run(&model, &matches(), "line of seasons").unwrap();
        assert_eq!(
            outcome.chart.unwrap_err().to_string(),
            "Line chart requires a y_column"
        );
    }
}
