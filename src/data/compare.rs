use serde::Serialize;

use super::error::QueryError;
use super::model::Dataset;
use super::pivot::{ColumnKey, PivotTable, SchoolKey, pivot_by_grade_subject_student_group};

// ---------------------------------------------------------------------------
// Query and result
// ---------------------------------------------------------------------------

/// What to compare: usually two student groups on one value column.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonQuery {
    pub grade: u32,
    pub subject: String,
    pub groups: Vec<String>,
    pub values: Vec<String>,
}

/// One school present in both compared columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub key: SchoolKey,
    pub x: f64,
    pub y: f64,
}

/// Two-column table ready for a scatter chart.
///
/// `x` holds the second flattened pivot column and `y` the first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub x_label: String,
    pub y_label: String,
    pub rows: Vec<ComparisonRow>,
}

impl Comparison {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Something that can draw a [`Comparison`].
pub trait ChartSink {
    fn render(&mut self, comparison: &Comparison) -> anyhow::Result<()>;
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Flatten a pivot to its first two populated columns and drop incomplete
/// rows.
///
/// Column labels are the group names when a single value column was pivoted,
/// otherwise `"{value} {group}"`.
pub fn comparison_from_pivot(pivot: &PivotTable) -> Result<Comparison, QueryError> {
    let populated: Vec<_> = pivot
        .columns
        .iter()
        .filter(|c| pivot.populated(c) > 0)
        .collect();

    let (first, second) = match populated.as_slice() {
        [first, second, rest @ ..] => {
            if !rest.is_empty() {
                log::warn!(
                    "comparison uses `{first}` and `{second}`; ignoring {} more column(s)",
                    rest.len()
                );
            }
            (*first, *second)
        }
        _ => {
            return Err(QueryError::MissingColumn {
                found: populated.len(),
            });
        }
    };

    let single_value = pivot.columns.iter().all(|c| c.value == first.value);
    let label = |c: &ColumnKey| {
        if single_value {
            c.group.clone()
        } else {
            c.to_string()
        }
    };

    let rows = pivot
        .rows
        .iter()
        .filter_map(|(key, cells)| {
            let y = *cells.get(first)?;
            let x = *cells.get(second)?;
            Some(ComparisonRow {
                key: key.clone(),
                x,
                y,
            })
        })
        .collect();

    Ok(Comparison {
        x_label: label(second),
        y_label: label(first),
        rows,
    })
}

/// Pivot, flatten and chart two columns of the report against each other.
///
/// The cleaned table is returned even when `chart` fails to render.
pub fn compare_groups(
    dataset: &Dataset,
    query: &ComparisonQuery,
    chart: &mut dyn ChartSink,
) -> Result<Comparison, QueryError> {
    let pivot = pivot_by_grade_subject_student_group(
        dataset,
        query.grade,
        &query.subject,
        &query.groups,
        &query.values,
    )?;
    let comparison = comparison_from_pivot(&pivot)?;
    log::info!(
        "comparing {} vs {}: {} of {} schools complete",
        comparison.x_label,
        comparison.y_label,
        comparison.len(),
        pivot.len()
    );

    if let Err(e) = chart.render(&comparison) {
        log::warn!("chart render failed: {e:#}");
    }
    Ok(comparison)
}
