use crate::data::model::Dataset;

/// One histogram bucket, `[start, end)` except the last which is closed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// Equal-width bins, bucket count from Sturges' rule.
pub fn histogram_bins(values: &[f64]) -> Vec<Bin> {
    let values: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if values.is_empty() {
        return Vec::new();
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if (max - min).abs() < f64::EPSILON {
        return vec![Bin {
            start: min - 0.5,
            end: min + 0.5,
            count: values.len(),
        }];
    }

    let n_bins = (values.len() as f64).log2().ceil() as usize + 1;
    let width = (max - min) / n_bins as f64;
    let mut bins: Vec<Bin> = (0..n_bins)
        .map(|i| Bin {
            start: min + i as f64 * width,
            end: min + (i + 1) as f64 * width,
            count: 0,
        })
        .collect();
    for v in values {
        let idx = (((v - min) / width) as usize).min(n_bins - 1);
        bins[idx].count += 1;
    }
    bins
}

/// Five-number summary with Tukey whiskers (1.5 × IQR).
#[derive(Debug, Clone, PartialEq)]
pub struct BoxSummary {
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

pub fn box_summary(values: &[f64]) -> Option<BoxSummary> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let q1 = quantile(&sorted, 0.25);
    let median = quantile(&sorted, 0.5);
    let q3 = quantile(&sorted, 0.75);
    let fence = 1.5 * (q3 - q1);
    let (low_fence, high_fence) = (q1 - fence, q3 + fence);

    let (inside, outliers): (Vec<f64>, Vec<f64>) = sorted
        .iter()
        .partition(|v| **v >= low_fence && **v <= high_fence);
    Some(BoxSummary {
        lower_whisker: inside.first().copied().unwrap_or(q1),
        q1,
        median,
        q3,
        upper_whisker: inside.last().copied().unwrap_or(q3),
        outliers,
    })
}

/// Split row indices by the joined values of `columns`, groups in order of
/// first appearance. With no columns everything lands in one unnamed group.
pub fn partition(data: &Dataset, columns: Option<&[String]>) -> Vec<(String, Vec<usize>)> {
    let idx: Vec<usize> = columns
        .unwrap_or_default()
        .iter()
        .filter_map(|c| data.column_index(c))
        .collect();

    let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
    for (i, row) in data.rows.iter().enumerate() {
        let label = idx
            .iter()
            .map(|&k| row[k].to_string())
            .collect::<Vec<_>>()
            .join(", ");
        match groups.iter_mut().find(|(name, _)| *name == label) {
            Some((_, rows)) => rows.push(i),
            None => groups.push((label, vec![i])),
        }
    }
    groups
}

/// Numeric view of one column; cells that are not numbers become NaN.
pub fn numbers(data: &Dataset, column: &str) -> Vec<f64> {
    data.column_values(column)
        .map(|vals| vals.map(|v| v.to_number().unwrap_or(f64::NAN)).collect())
        .unwrap_or_default()
}
