use std::collections::BTreeMap;

use crate::data::model::{CellValue, Dataset};

/// Name of the column holding row counts in aggregated tables.
pub const COUNT_COLUMN: &str = "count";

/// Running totals for one group key.
#[derive(Debug, Default)]
struct Group {
    first_seen: usize,
    rows: i64,
    sum: f64,
}

/// Group rows by the given key columns. Rows with a null key cell are
/// dropped; `value` cells that are not numbers do not contribute to sums.
fn group_rows(
    data: &Dataset,
    keys: &[usize],
    value: Option<usize>,
) -> BTreeMap<Vec<CellValue>, Group> {
    let mut groups: BTreeMap<Vec<CellValue>, Group> = BTreeMap::new();
    for (i, row) in data.rows.iter().enumerate() {
        let key: Vec<CellValue> = keys.iter().map(|&k| row[k].clone()).collect();
        if key.iter().any(CellValue::is_null) {
            continue;
        }
        let group = groups.entry(key).or_insert_with(|| Group {
            first_seen: i,
            ..Group::default()
        });
        group.rows += 1;
        if let Some(v) = value.and_then(|idx| row[idx].to_number()) {
            group.sum += v;
        }
    }
    groups
}

fn indices(data: &Dataset, columns: &[String]) -> Option<Vec<usize>> {
    columns.iter().map(|c| data.column_index(c)).collect()
}

/// Occurrences of each distinct key, most frequent first
/// (ties keep first-appearance order). Columns: keys…, `count`.
pub fn value_counts(data: &Dataset, columns: &[String]) -> Option<Dataset> {
    let keys = indices(data, columns)?;
    let mut groups: Vec<_> = group_rows(data, &keys, None).into_iter().collect();
    groups.sort_by(|(_, a), (_, b)| b.rows.cmp(&a.rows).then(a.first_seen.cmp(&b.first_seen)));

    Some(build(columns, COUNT_COLUMN, groups, |g| CellValue::Integer(g.rows)))
}

/// Row count per key, ordered by key. Columns: keys…, `count`.
pub fn group_size(data: &Dataset, columns: &[String]) -> Option<Dataset> {
    let keys = indices(data, columns)?;
    let groups = group_rows(data, &keys, None);
    Some(build(columns, COUNT_COLUMN, groups, |g| CellValue::Integer(g.rows)))
}

/// Sum of `value` per key, ordered by key. Columns: keys…, `value`.
pub fn group_sum(data: &Dataset, columns: &[String], value: &str) -> Option<Dataset> {
    let keys = indices(data, columns)?;
    let value_idx = data.column_index(value)?;
    let groups = group_rows(data, &keys, Some(value_idx));
    Some(build(columns, value, groups, |g| CellValue::Float(g.sum)))
}

fn build(
    columns: &[String],
    value_column: &str,
    groups: impl IntoIterator<Item = (Vec<CellValue>, Group)>,
    value: impl Fn(&Group) -> CellValue,
) -> Dataset {
    let mut header = columns.to_vec();
    header.push(value_column.to_string());
    let rows = groups
        .into_iter()
        .map(|(mut key, group)| {
            key.push(value(&group));
            key
        })
        .collect();
    Dataset::new(header, rows)
}

/// Pearson correlation of two columns over rows where both are numbers.
/// `None` with fewer than two pairs or zero variance.
pub fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    let n = pairs.len();
    if n < 2 {
        return None;
    }
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n as f64;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n as f64;
    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for &(x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}

/// Pairwise-complete correlation matrix of `columns`.
///
/// First column `column` holds the row labels; undefined coefficients are null.
pub fn correlation_matrix(data: &Dataset, columns: &[String]) -> Option<Dataset> {
    let idx = indices(data, columns)?;
    let rows = idx
        .iter()
        .zip(columns)
        .map(|(&a, name)| {
            let mut row = vec![CellValue::String(name.clone())];
            row.extend(idx.iter().map(|&b| {
                let pairs: Vec<(f64, f64)> = data
                    .rows
                    .iter()
                    .filter_map(|r| Some((r[a].as_f64()?, r[b].as_f64()?)))
                    .filter(|(x, y)| !x.is_nan() && !y.is_nan())
                    .collect();
                pearson(&pairs).map_or(CellValue::Null, CellValue::Float)
            }));
            row
        })
        .collect();

    let mut header = vec!["column".to_string()];
    header.extend(columns.iter().cloned());
    Some(Dataset::new(header, rows))
}
