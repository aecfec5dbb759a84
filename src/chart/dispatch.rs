use log::debug;

use super::aggregate::{self, COUNT_COLUMN};
use super::{ChartDescription, ChartError, Encoding, Layout};
use crate::data::model::Dataset;
use crate::spec::{ChartSpec, ChartType, RequestedChart};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Build the chart described by `spec` from (already filtered) `data`.
///
/// Recognized-but-incomplete specs and unknown chart types come back as a
/// [`ChartError`] carrying a user-facing message; nothing here panics on
/// model output. Every chart leaves with the same [`Layout`].
pub fn make_chart(data: &Dataset, spec: &ChartSpec) -> Result<ChartDescription, ChartError> {
    if let Some(error) = &spec.error {
        return Err(ChartError::InvalidSpec(error.clone()));
    }
    let chart_type = match &spec.chart_type {
        Some(RequestedChart::Supported(t)) => *t,
        Some(RequestedChart::Unsupported(name)) => {
            return Err(ChartError::Unsupported(name.clone()))
        }
        None => return Err(ChartError::Unsupported("none".to_string())),
    };

    let fields = Fields {
        x: spec.x_column.as_deref(),
        y: spec.y_column.as_deref(),
        groups: spec.group_columns(),
    };

    let draft = match chart_type {
        ChartType::Bar => bar(data, &fields),
        ChartType::Pie => pie(data, &fields),
        ChartType::Line => line(data, &fields),
        ChartType::Histogram => histogram(data, &fields),
        ChartType::Scatter => scatter(data, &fields),
        ChartType::Box => box_plot(data, &fields),
        ChartType::Heatmap => heatmap(data),
        ChartType::Treemap => treemap(data, &fields),
    }?;
    debug!("Built {chart_type} chart '{}' over {} rows", draft.title, draft.data.len());

    Ok(ChartDescription {
        chart_type,
        title: draft.title,
        data: draft.data,
        encoding: draft.encoding,
        layout: Layout::default(),
    })
}

// ---------------------------------------------------------------------------
// Per-type builders
// ---------------------------------------------------------------------------

/// Column bindings taken from the spec, `group_by` already normalized.
struct Fields<'a> {
    x: Option<&'a str>,
    y: Option<&'a str>,
    groups: Option<Vec<String>>,
}

struct Draft {
    title: String,
    data: Dataset,
    encoding: Encoding,
}

fn missing(chart: ChartType, needs: &'static str) -> ChartError {
    ChartError::MissingField {
        chart: chart.label(),
        needs,
    }
}

/// Every named column must exist in `data`.
fn check<'c>(data: &Dataset, columns: impl IntoIterator<Item = &'c str>) -> Result<(), ChartError> {
    for col in columns {
        if !data.has_column(col) {
            return Err(ChartError::UnknownColumn(col.to_string()));
        }
    }
    Ok(())
}

fn group_refs(groups: &Option<Vec<String>>) -> impl Iterator<Item = &str> {
    groups.iter().flatten().map(String::as_str)
}

fn aggregated(table: Option<Dataset>, column: &str) -> Result<Dataset, ChartError> {
    table.ok_or_else(|| ChartError::UnknownColumn(column.to_string()))
}

fn bar(data: &Dataset, f: &Fields) -> Result<Draft, ChartError> {
    let x = f.x.ok_or_else(|| missing(ChartType::Bar, "an x_column"))?;
    check(data, [x])?;

    match f.y {
        Some(y) => {
            check(data, std::iter::once(y).chain(group_refs(&f.groups)))?;
            Ok(Draft {
                title: format!("Bar chart of {y} vs {x}"),
                data: data.clone(),
                encoding: Encoding::Bar {
                    x: x.to_string(),
                    y: y.to_string(),
                    grouped: f.groups.is_some(),
                    color: f.groups.clone(),
                },
            })
        }
        None => Ok(Draft {
            title: format!("Count of {x}"),
            data: aggregated(aggregate::value_counts(data, &[x.to_string()]), x)?,
            encoding: Encoding::Bar {
                x: x.to_string(),
                y: COUNT_COLUMN.to_string(),
                color: None,
                grouped: false,
            },
        }),
    }
}

fn pie(data: &Dataset, f: &Fields) -> Result<Draft, ChartError> {
    // Sums slice by group_by first; counts slice by x_column first.
    let names = match (f.y, &f.groups, f.x) {
        (Some(_), Some(groups), _) | (None, Some(groups), None) => groups.clone(),
        (_, _, Some(x)) => vec![x.to_string()],
        (_, None, None) => return Err(missing(ChartType::Pie, "an x_column or group_by")),
    };
    check(data, names.iter().map(String::as_str))?;
    let title = format!("Pie chart of {}", names.join(", "));

    let (table, values) = match f.y {
        Some(y) => {
            check(data, [y])?;
            (aggregate::group_sum(data, &names, y), y.to_string())
        }
        None => (aggregate::value_counts(data, &names), COUNT_COLUMN.to_string()),
    };
    Ok(Draft {
        title,
        data: aggregated(table, &values)?,
        encoding: Encoding::Pie { names, values },
    })
}

fn line(data: &Dataset, f: &Fields) -> Result<Draft, ChartError> {
    let y = f.y.ok_or_else(|| missing(ChartType::Line, "a y_column"))?;
    check(data, f.x.into_iter().chain([y]).chain(group_refs(&f.groups)))?;
    Ok(Draft {
        title: format!("Line chart of {y} vs {}", f.x.unwrap_or("index")),
        data: data.clone(),
        encoding: Encoding::Line {
            x: f.x.map(str::to_string),
            y: y.to_string(),
            color: f.groups.clone(),
        },
    })
}

fn histogram(data: &Dataset, f: &Fields) -> Result<Draft, ChartError> {
    let col = f
        .y
        .or(f.x)
        .ok_or_else(|| missing(ChartType::Histogram, "an x_column or y_column"))?;
    check(data, [col])?;
    Ok(Draft {
        title: format!("Histogram of {col}"),
        data: data.clone(),
        encoding: Encoding::Histogram { x: col.to_string() },
    })
}

fn scatter(data: &Dataset, f: &Fields) -> Result<Draft, ChartError> {
    let y = f.y.ok_or_else(|| missing(ChartType::Scatter, "a y_column"))?;
    check(data, f.x.into_iter().chain([y]).chain(group_refs(&f.groups)))?;
    Ok(Draft {
        title: format!("Scatter plot of {y} vs {}", f.x.unwrap_or("index")),
        data: data.clone(),
        encoding: Encoding::Scatter {
            x: f.x.map(str::to_string),
            y: y.to_string(),
            color: f.groups.clone(),
        },
    })
}

fn box_plot(data: &Dataset, f: &Fields) -> Result<Draft, ChartError> {
    let y = f.y.ok_or_else(|| missing(ChartType::Box, "a y_column"))?;
    check(data, std::iter::once(y).chain(group_refs(&f.groups)))?;
    let by = f
        .groups
        .as_ref()
        .map(|g| format!(" by {}", g.join(", ")))
        .unwrap_or_default();
    Ok(Draft {
        title: format!("Box plot of {y}{by}"),
        data: data.clone(),
        encoding: Encoding::Box {
            x: f.groups.clone(),
            y: y.to_string(),
        },
    })
}

fn heatmap(data: &Dataset) -> Result<Draft, ChartError> {
    let labels = data.numeric_columns();
    if labels.is_empty() {
        return Err(ChartError::NoNumericColumns);
    }
    Ok(Draft {
        title: "Heatmap of numeric feature correlations".to_string(),
        data: aggregated(aggregate::correlation_matrix(data, &labels), &labels[0])?,
        encoding: Encoding::Heatmap { labels },
    })
}

fn treemap(data: &Dataset, f: &Fields) -> Result<Draft, ChartError> {
    let path = f
        .groups
        .clone()
        .ok_or_else(|| missing(ChartType::Treemap, "at least one grouping column"))?;
    check(data, path.iter().map(String::as_str))?;

    let (table, size_col) = match f.y {
        Some(y) => {
            check(data, [y])?;
            (aggregate::group_sum(data, &path, y), y.to_string())
        }
        None => (aggregate::group_size(data, &path), COUNT_COLUMN.to_string()),
    };
    Ok(Draft {
        title: format!("Treemap of {size_col} grouped by {}", path.join(" → ")),
        data: aggregated(table, &size_col)?,
        encoding: Encoding::Treemap {
            path,
            values: size_col,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::HoverMode;
    use crate::data::model::CellValue;
    use crate::spec::GroupBy;

    fn s(v: &str) -> CellValue {
        CellValue::String(v.to_string())
    }

    fn matches() -> Dataset {
        Dataset::new(
            vec!["city".into(), "season".into(), "runs".into(), "wickets".into()],
            vec![
                vec![s("Mumbai"), CellValue::Integer(2020), CellValue::Integer(180), CellValue::Integer(6)],
                vec![s("Delhi"), CellValue::Integer(2020), CellValue::Integer(150), CellValue::Integer(8)],
                vec![s("Mumbai"), CellValue::Integer(2021), CellValue::Integer(200), CellValue::Integer(4)],
                vec![s("Mumbai"), CellValue::Integer(2020), CellValue::Integer(170), CellValue::Integer(7)],
                vec![s("Chennai"), CellValue::Integer(2021), CellValue::Integer(160), CellValue::Integer(5)],
                vec![s("Delhi"), CellValue::Integer(2021), CellValue::Integer(190), CellValue::Integer(3)],
            ],
        )
    }

    fn spec(chart: &str) -> ChartSpec {
        ChartSpec {
            chart_type: Some(RequestedChart::from_name(chart)),
            ..ChartSpec::default()
        }
    }

    fn col(name: &str) -> Option<String> {
        Some(name.to_string())
    }

    #[test]
    fn test_bar_without_y_counts_rows_per_city() {
        let chart = make_chart(&matches(), &ChartSpec { x_column: col("city"), ..spec("bar") }).unwrap();
        assert_eq!(chart.title, "Count of city");
        assert_eq!(chart.data.columns, vec!["city", "count"]);
        assert_eq!(
            chart.data.rows,
            vec![
                vec![s("Mumbai"), CellValue::Integer(3)],
                vec![s("Delhi"), CellValue::Integer(2)],
                vec![s("Chennai"), CellValue::Integer(1)],
            ]
        );
    }

    #[test]
    fn test_bar_with_y_and_group_is_grouped_raw_data() {
        let chart = make_chart(
            &matches(),
            &ChartSpec {
                x_column: col("city"),
                y_column: col("runs"),
                group_by: Some(GroupBy::Single("season".into())),
                ..spec("bar")
            },
        )
        .unwrap();
        assert_eq!(chart.title, "Bar chart of runs vs city");
        assert_eq!(chart.data, matches());
        assert_eq!(
            chart.encoding,
            Encoding::Bar {
                x: "city".into(),
                y: "runs".into(),
                color: Some(vec!["season".into()]),
                grouped: true,
            }
        );
    }

    #[test]
    fn test_bar_without_x_is_rejected() {
        let err = make_chart(&matches(), &ChartSpec { y_column: col("runs"), ..spec("bar") }).unwrap_err();
        assert_eq!(err.to_string(), "Bar chart requires an x_column");
    }

    #[test]
    fn test_pie_sums_y_per_category() {
        let chart = make_chart(
            &matches(),
            &ChartSpec { x_column: col("city"), y_column: col("runs"), ..spec("pie") },
        )
        .unwrap();
        assert_eq!(chart.title, "Pie chart of city");
        assert_eq!(
            chart.data.rows,
            vec![
                vec![s("Chennai"), CellValue::Float(160.0)],
                vec![s("Delhi"), CellValue::Float(340.0)],
                vec![s("Mumbai"), CellValue::Float(550.0)],
            ]
        );
        assert_eq!(
            chart.encoding,
            Encoding::Pie { names: vec!["city".into()], values: "runs".into() }
        );
    }

    #[test]
    fn test_pie_count_slices_by_x_even_with_group_by() {
        let chart = make_chart(
            &matches(),
            &ChartSpec {
                x_column: col("city"),
                group_by: Some(GroupBy::Single("season".into())),
                ..spec("pie")
            },
        )
        .unwrap();
        assert_eq!(chart.title, "Pie chart of city");
        assert_eq!(chart.data.columns, vec!["city", "count"]);
        assert_eq!(
            chart.data.rows,
            vec![
                vec![s("Mumbai"), CellValue::Integer(3)],
                vec![s("Delhi"), CellValue::Integer(2)],
                vec![s("Chennai"), CellValue::Integer(1)],
            ]
        );
    }

    #[test]
    fn test_pie_count_falls_back_to_group_by_without_x() {
        let chart = make_chart(
            &matches(),
            &ChartSpec { group_by: Some(GroupBy::Single("season".into())), ..spec("pie") },
        )
        .unwrap();
        assert_eq!(chart.title, "Pie chart of season");
        assert_eq!(chart.data.columns, vec!["season", "count"]);
        assert_eq!(chart.data.len(), 2);
    }

    #[test]
    fn test_pie_sum_slices_by_group_by() {
        let chart = make_chart(
            &matches(),
            &ChartSpec {
                x_column: col("city"),
                y_column: col("runs"),
                group_by: Some(GroupBy::Single("season".into())),
                ..spec("pie")
            },
        )
        .unwrap();
        assert_eq!(chart.title, "Pie chart of season");
        assert_eq!(chart.data.columns, vec!["season", "runs"]);
    }

    #[test]
    fn test_line_scatter_box_require_y() {
        for (chart, message) in [
            ("line", "Line chart requires a y_column"),
            ("scatter", "Scatter plot requires a y_column"),
            ("box", "Box plot requires a y_column"),
        ] {
            let err = make_chart(&matches(), &ChartSpec { x_column: col("season"), ..spec(chart) }).unwrap_err();
            assert_eq!(err.to_string(), message);
            assert!(err.to_string().contains("y_column"));
        }
    }

    #[test]
    fn test_line_colours_by_group_and_defaults_x_to_index() {
        let chart = make_chart(
            &matches(),
            &ChartSpec {
                y_column: col("runs"),
                group_by: Some(GroupBy::Single("city".into())),
                ..spec("line")
            },
        )
        .unwrap();
        assert_eq!(chart.title, "Line chart of runs vs index");
        assert_eq!(
            chart.encoding,
            Encoding::Line { x: None, y: "runs".into(), color: Some(vec!["city".into()]) }
        );
    }

    #[test]
    fn test_histogram_prefers_y() {
        let chart = make_chart(
            &matches(),
            &ChartSpec { x_column: col("season"), y_column: col("runs"), ..spec("histogram") },
        )
        .unwrap();
        assert_eq!(chart.title, "Histogram of runs");
        let chart = make_chart(&matches(), &ChartSpec { x_column: col("season"), ..spec("histogram") }).unwrap();
        assert_eq!(chart.encoding, Encoding::Histogram { x: "season".into() });
        let err = make_chart(&matches(), &spec("histogram")).unwrap_err();
        assert_eq!(err.to_string(), "Histogram requires an x_column or y_column");
    }

    #[test]
    fn test_box_title_lists_groups() {
        let chart = make_chart(
            &matches(),
            &ChartSpec {
                y_column: col("runs"),
                group_by: Some(GroupBy::Many(vec!["city".into(), "season".into()])),
                ..spec("box")
            },
        )
        .unwrap();
        assert_eq!(chart.title, "Box plot of runs by city, season");
    }

    #[test]
    fn test_heatmap_ignores_bindings_and_uses_numeric_columns() {
        let chart = make_chart(
            &matches(),
            &ChartSpec { x_column: col("does_not_exist"), ..spec("heatmap") },
        )
        .unwrap();
        assert_eq!(chart.title, "Heatmap of numeric feature correlations");
        assert_eq!(
            chart.encoding,
            Encoding::Heatmap { labels: vec!["season".into(), "runs".into(), "wickets".into()] }
        );
        assert_eq!(chart.data.len(), 3);
        assert_eq!(chart.data.rows[1][2], CellValue::Float(1.0));

        let text_only = Dataset::new(vec!["city".into()], vec![vec![s("Mumbai")]]);
        assert_eq!(make_chart(&text_only, &spec("heatmap")), Err(ChartError::NoNumericColumns));
    }

    #[test]
    fn test_treemap_counts_rows_per_path() {
        let chart = make_chart(
            &matches(),
            &ChartSpec {
                group_by: Some(GroupBy::Many(vec!["city".into(), "season".into()])),
                ..spec("treemap")
            },
        )
        .unwrap();
        assert_eq!(chart.title, "Treemap of count grouped by city → season");
        assert_eq!(chart.data.columns, vec!["city", "season", "count"]);
        assert_eq!(
            chart.data.rows,
            vec![
                vec![s("Chennai"), CellValue::Integer(2021), CellValue::Integer(1)],
                vec![s("Delhi"), CellValue::Integer(2020), CellValue::Integer(1)],
                vec![s("Delhi"), CellValue::Integer(2021), CellValue::Integer(1)],
                vec![s("Mumbai"), CellValue::Integer(2020), CellValue::Integer(2)],
                vec![s("Mumbai"), CellValue::Integer(2021), CellValue::Integer(1)],
            ]
        );
    }

    #[test]
    fn test_treemap_sums_y_and_requires_groups() {
        let chart = make_chart(
            &matches(),
            &ChartSpec {
                y_column: col("runs"),
                group_by: Some(GroupBy::Single("city".into())),
                ..spec("treemap")
            },
        )
        .unwrap();
        assert_eq!(chart.title, "Treemap of runs grouped by city");
        assert_eq!(chart.data.rows[2], vec![s("Mumbai"), CellValue::Float(550.0)]);

        let err = make_chart(
            &matches(),
            &ChartSpec { group_by: Some(GroupBy::Many(vec![])), ..spec("treemap") },
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Treemap requires at least one grouping column");
    }

    #[test]
    fn test_unsupported_and_absent_chart_types() {
        let err = make_chart(&matches(), &spec("unsupported_type")).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported chart type: unsupported_type");
        let err = make_chart(&matches(), &ChartSpec::default()).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported chart type: none");
    }

    #[test]
    fn test_unknown_column_is_reported() {
        let err = make_chart(
            &matches(),
            &ChartSpec { x_column: col("town"), ..spec("bar") },
        )
        .unwrap_err();
        assert_eq!(err, ChartError::UnknownColumn("town".into()));
        assert_eq!(err.to_string(), "Column 'town' not found in dataset");
    }

    #[test]
    fn test_parse_error_short_circuits() {
        let spec = ChartSpec::unparsed("Could not parse JSON from model:\nnope".into());
        let err = make_chart(&matches(), &spec).unwrap_err();
        assert_eq!(err.to_string(), "Could not parse JSON from model:\nnope");
    }

    #[test]
    fn test_every_chart_gets_the_same_layout() {
        let chart = make_chart(&matches(), &ChartSpec { y_column: col("runs"), ..spec("scatter") }).unwrap();
        assert_eq!(chart.layout.margin.left, 40);
        assert_eq!(chart.layout.margin.top, 50);
        assert_eq!(chart.layout.hover, HoverMode::Closest);
        assert_eq!(chart.title, "Scatter plot of runs vs index");
    }
}
