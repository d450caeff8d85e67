use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use super::error::QueryError;
use super::filter::{
    SBA, filter_by_administration, filter_by_grade, filter_by_groups, filter_by_subject,
};
use super::model::Dataset;

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// A school identified by its district, since school names repeat across
/// districts.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SchoolKey {
    pub district: String,
    pub school: String,
}

impl SchoolKey {
    pub fn new(district: impl Into<String>, school: impl Into<String>) -> Self {
        Self {
            district: district.into(),
            school: school.into(),
        }
    }
}

impl fmt::Display for SchoolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.district, self.school)
    }
}

/// A pivoted column: one value column for one student group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ColumnKey {
    pub value: String,
    pub group: String,
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.group)
    }
}

// ---------------------------------------------------------------------------
// PivotTable
// ---------------------------------------------------------------------------

/// School × (value, group) table.
///
/// Columns are ordered by requested value, then group name. A missing cell
/// is simply absent from its row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PivotTable {
    pub columns: Vec<ColumnKey>,
    pub rows: BTreeMap<SchoolKey, BTreeMap<ColumnKey, f64>>,
}

impl PivotTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn get(&self, key: &SchoolKey, column: &ColumnKey) -> Option<f64> {
        self.rows.get(key).and_then(|row| row.get(column)).copied()
    }

    /// Number of schools with a value in `column`.
    pub fn populated(&self, column: &ColumnKey) -> usize {
        self.rows.values().filter(|row| row.contains_key(column)).count()
    }
}

/// Pivot SBA results for one grade and subject into a school × group table.
///
/// Rows from other test administrations are discarded, as are groups not in
/// `groups`. Two rows for the same school and group are rejected rather than
/// merged.
pub fn pivot_by_grade_subject_student_group<G, V>(
    dataset: &Dataset,
    grade: u32,
    subject: &str,
    groups: &[G],
    values: &[V],
) -> Result<PivotTable, QueryError>
where
    G: AsRef<str>,
    V: AsRef<str>,
{
    if let Some(missing) = values.iter().find(|v| !dataset.has_column(v.as_ref())) {
        return Err(QueryError::UnknownColumn(missing.as_ref().to_string()));
    }

    let rows = filter_by_grade(dataset.select_all(), grade);
    let rows = filter_by_subject(rows, subject);
    let rows = filter_by_administration(rows, SBA);
    let rows = filter_by_groups(rows, groups);
    log::debug!("pivoting {} rows for grade {grade} {subject}", rows.len());

    let mut seen: BTreeSet<(SchoolKey, &str)> = BTreeSet::new();
    let mut present_groups: BTreeSet<&str> = BTreeSet::new();
    let mut table: BTreeMap<SchoolKey, BTreeMap<ColumnKey, f64>> = BTreeMap::new();

    for rec in rows.iter() {
        let key = SchoolKey::new(rec.district.as_str(), rec.school.as_str());
        let group = rec.student_group.as_str();

        if !seen.insert((key.clone(), group)) {
            return Err(QueryError::DuplicateEntry {
                key: key.to_string(),
                group: group.to_string(),
            });
        }
        present_groups.insert(group);

        let cells = table.entry(key).or_default();
        for value in values {
            if let Some(v) = rec.value(value.as_ref()) {
                cells.insert(
                    ColumnKey {
                        value: value.as_ref().to_string(),
                        group: group.to_string(),
                    },
                    v,
                );
            }
        }
    }

    let columns = values
        .iter()
        .flat_map(|value| {
            present_groups.iter().map(move |group| ColumnKey {
                value: value.as_ref().to_string(),
                group: group.to_string(),
            })
        })
        .collect();

    Ok(PivotTable {
        columns,
        rows: table,
    })
}
