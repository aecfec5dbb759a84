use std::cmp::Ordering;

use log::debug;

use super::model::{CellValue, Dataset};
use crate::spec::{FilterClause, FilterOp};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Return a new dataset holding only the rows that satisfy every clause.
///
/// Clauses are applied in order, each one narrowing the rows kept by the
/// previous ones. A clause that cannot be applied (missing column or values,
/// unknown operator, `between` with a single value, column not in the
/// dataset) is skipped. The input dataset is never modified.
pub fn apply_filters(dataset: &Dataset, filters: &[FilterClause]) -> Dataset {
    let mut kept: Vec<usize> = (0..dataset.len()).collect();

    for clause in filters {
        match Predicate::compile(dataset, &kept, clause) {
            Some(predicate) => {
                kept.retain(|&i| predicate.matches(&dataset.rows[i]));
                debug!("Filter {clause:?} kept {} rows", kept.len());
            }
            None => debug!("Skipping inert filter clause {clause:?}"),
        }
    }

    dataset.select_rows(&kept)
}

// ---------------------------------------------------------------------------
// Predicate compilation
// ---------------------------------------------------------------------------

/// Operator with its operand(s), generic over the comparison domain.
#[derive(Debug, Clone, PartialEq)]
enum Bound<T> {
    Eq(T),
    Ge(T),
    Le(T),
    Between(T, T),
}

impl<T> Bound<T> {
    fn try_map<U>(&self, f: impl Fn(&T) -> Option<U>) -> Option<Bound<U>> {
        Some(match self {
            Bound::Eq(v) => Bound::Eq(f(v)?),
            Bound::Ge(v) => Bound::Ge(f(v)?),
            Bound::Le(v) => Bound::Le(f(v)?),
            Bound::Between(lo, hi) => Bound::Between(f(lo)?, f(hi)?),
        })
    }

    /// Test `value` against the bound. Incomparable values never match.
    fn holds(&self, value: &T, cmp: impl Fn(&T, &T) -> Option<Ordering>) -> bool {
        match self {
            Bound::Eq(v) => cmp(value, v) == Some(Ordering::Equal),
            Bound::Ge(v) => matches!(cmp(value, v), Some(Ordering::Greater | Ordering::Equal)),
            Bound::Le(v) => matches!(cmp(value, v), Some(Ordering::Less | Ordering::Equal)),
            Bound::Between(lo, hi) => {
                matches!(cmp(value, lo), Some(Ordering::Greater | Ordering::Equal))
                    && matches!(cmp(value, hi), Some(Ordering::Less | Ordering::Equal))
            }
        }
    }
}

/// How a clause compares cells, chosen once per clause.
#[derive(Debug, Clone, PartialEq)]
enum Comparison {
    /// Column and operands coerced to numbers; uncoercible cells are NaN.
    Numeric(Bound<f64>),
    /// Native values compared as they are.
    Raw(Bound<CellValue>),
}

#[derive(Debug)]
struct Predicate {
    column: usize,
    comparison: Comparison,
}

impl Predicate {
    fn compile(dataset: &Dataset, kept: &[usize], clause: &FilterClause) -> Option<Predicate> {
        let name = clause.column.as_deref().filter(|c| !c.is_empty())?;
        let column = dataset.column_index(name)?;
        let values = clause.values.as_ref()?;
        let first = values.first()?.clone();

        let bound = match clause.op.as_ref()? {
            FilterOp::Eq => Bound::Eq(first),
            FilterOp::Ge => Bound::Ge(first),
            FilterOp::Le => Bound::Le(first),
            FilterOp::Between => Bound::Between(first, values.second()?.clone()),
            FilterOp::Unsupported(_) => return None,
        };

        let column_is_numeric = kept
            .iter()
            .any(|&i| dataset.rows[i][column].to_number().is_some());
        let comparison = match bound.try_map(CellValue::to_number) {
            Some(numeric) if column_is_numeric => Comparison::Numeric(numeric),
            _ => Comparison::Raw(bound),
        };

        Some(Predicate { column, comparison })
    }

    fn matches(&self, row: &[CellValue]) -> bool {
        let cell = &row[self.column];
        match &self.comparison {
            Comparison::Numeric(bound) => match cell.to_number() {
                Some(v) => bound.holds(&v, |a, b| a.partial_cmp(b)),
                None => false,
            },
            Comparison::Raw(bound) => bound.holds(cell, CellValue::compare_native),
        }
    }
}
