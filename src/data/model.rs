use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// CellValue – a single cell of the table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring common Pandas dtypes.
/// Used as a `BTreeMap` key by the aggregations, so `CellValue` must be `Ord`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// ISO-8601 date string kept as text for simplicity.
    Date(String),
    Null,
}

// -- Manual Eq/Ord so we can put CellValue in BTreeMap keys --

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
                Date(_) => 5,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) | (Date(a), Date(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::String(s) | CellValue::Date(s) => s.hash(state),
            CellValue::Integer(i) => i.hash(state),
            CellValue::Float(f) => f.to_bits().hash(state),
            CellValue::Bool(b) => b.hash(state),
            CellValue::Null => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Date(d) => write!(f, "{d}"),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    /// Lenient numeric coercion, the equivalent of `pd.to_numeric(errors="coerce")`.
    ///
    /// Numbers and booleans coerce directly, text is parsed after trimming.
    /// Anything else (and NaN itself) yields `None`.
    pub fn to_number(&self) -> Option<f64> {
        let v = match self {
            CellValue::Integer(i) => *i as f64,
            CellValue::Float(v) => *v,
            CellValue::Bool(b) => f64::from(u8::from(*b)),
            CellValue::String(s) => s.trim().parse::<f64>().ok()?,
            CellValue::Date(_) | CellValue::Null => return None,
        };
        (!v.is_nan()).then_some(v)
    }

    /// Native-typed number, without parsing text. Used to pick numeric columns.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Compare two cells on their native representation.
    ///
    /// Integers and floats compare numerically, text and dates lexically.
    /// Mixed kinds and nulls are incomparable.
    pub fn compare_native(&self, other: &CellValue) -> Option<Ordering> {
        use CellValue::*;
        match (self, other) {
            (Integer(a), Integer(b)) => Some(a.cmp(b)),
            (Integer(_) | Float(_), Integer(_) | Float(_)) => {
                self.as_f64()?.partial_cmp(&other.as_f64()?)
            }
            (String(a) | Date(a), String(b) | Date(b)) => Some(a.cmp(b)),
            (Bool(a), Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl From<&serde_json::Value> for CellValue {
    fn from(val: &serde_json::Value) -> Self {
        use serde_json::Value as JsonValue;
        match val {
            JsonValue::String(s) => CellValue::String(s.clone()),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    CellValue::Integer(i)
                } else if let Some(f) = n.as_f64() {
                    CellValue::Float(f)
                } else {
                    CellValue::String(n.to_string())
                }
            }
            JsonValue::Bool(b) => CellValue::Bool(*b),
            JsonValue::Null => CellValue::Null,
            other => CellValue::String(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// An in-memory table: ordered column names and rows of cells aligned to them.
///
/// Filtering and aggregation always build a new `Dataset`; the loaded one is
/// kept untouched for the preview and the column list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dataset {
    /// Ordered column names (the ColumnSet handed to the parser).
    pub columns: Vec<String>,
    /// Rows; every row has exactly `columns.len()` cells.
    pub rows: Vec<Vec<CellValue>>,
}

impl Dataset {
    /// Build a dataset, padding or truncating rows to the column count.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Null);
                row
            })
            .collect();
        Dataset { columns, rows }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Iterate the cells of one column, top to bottom.
    pub fn column_values(&self, name: &str) -> Option<impl Iterator<Item = &CellValue> + '_> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| &row[idx]))
    }

    /// New dataset holding the given rows (by index, in the given order).
    pub fn select_rows(&self, indices: &[usize]) -> Dataset {
        Dataset {
            columns: self.columns.clone(),
            rows: indices
                .iter()
                .filter_map(|&i| self.rows.get(i).cloned())
                .collect(),
        }
    }

    /// First `n` rows, for the preview table.
    pub fn head(&self, n: usize) -> Dataset {
        Dataset {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Columns whose non-null cells are all native integers or floats,
    /// like `select_dtypes(include="number")`. All-null columns are skipped.
    pub fn numeric_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(idx, _)| {
                let mut seen = false;
                for row in &self.rows {
                    match &row[*idx] {
                        CellValue::Null => {}
                        CellValue::Integer(_) | CellValue::Float(_) => seen = true,
                        _ => return false,
                    }
                }
                seen
            })
            .map(|(_, name)| name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> CellValue {
        CellValue::String(v.to_string())
    }

    #[test]
    fn test_to_number_coerces_text_and_rejects_garbage() {
        assert_eq!(s(" 2020 ").to_number(), Some(2020.0));
        assert_eq!(s("1.5e2").to_number(), Some(150.0));
        assert_eq!(s("Mumbai").to_number(), None);
        assert_eq!(CellValue::Bool(true).to_number(), Some(1.0));
        assert_eq!(CellValue::Float(f64::NAN).to_number(), None);
        assert_eq!(CellValue::Null.to_number(), None);
    }

    #[test]
    fn test_compare_native_mixed_kinds() {
        assert_eq!(
            CellValue::Integer(3).compare_native(&CellValue::Float(2.5)),
            Some(Ordering::Greater)
        );
        assert_eq!(s("b").compare_native(&s("a")), Some(Ordering::Greater));
        assert_eq!(s("10").compare_native(&CellValue::Integer(10)), None);
        assert_eq!(CellValue::Null.compare_native(&CellValue::Null), None);
    }

    #[test]
    fn test_new_pads_short_rows() {
        let ds = Dataset::new(
            vec!["a".into(), "b".into()],
            vec![vec![CellValue::Integer(1)]],
        );
        assert_eq!(ds.rows[0], vec![CellValue::Integer(1), CellValue::Null]);
    }

    #[test]
    fn test_numeric_columns_skip_text_and_bool() {
        let ds = Dataset::new(
            vec!["n".into(), "t".into(), "b".into(), "empty".into()],
            vec![
                vec![CellValue::Integer(1), s("x"), CellValue::Bool(true), CellValue::Null],
                vec![CellValue::Float(2.5), s("y"), CellValue::Bool(false), CellValue::Null],
                vec![CellValue::Null, CellValue::Integer(3), CellValue::Bool(true), CellValue::Null],
            ],
        );
        assert_eq!(ds.numeric_columns(), vec!["n".to_string()]);
    }

    #[test]
    fn test_select_rows_leaves_source_untouched() {
        let ds = Dataset::new(
            vec!["a".into()],
            (0..4).map(|i| vec![CellValue::Integer(i)]).collect(),
        );
        let picked = ds.select_rows(&[3, 1, 99]);
        assert_eq!(picked.len(), 2);
        assert_eq!(picked.rows[0][0], CellValue::Integer(3));
        assert_eq!(ds.len(), 4);
        assert_eq!(ds.head(2).len(), 2);
    }
}
