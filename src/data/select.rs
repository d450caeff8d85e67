use serde::Serialize;

use super::error::QueryError;
use super::filter::{filter_by_grade, filter_by_subject};
use super::model::Dataset;

/// One school's value for a single student group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupValue {
    pub district: String,
    pub school: String,
    pub value: Option<f64>,
}

/// Per-school `value` for one student group in one grade and subject.
///
/// All test administrations are included. A group that matches no rows
/// yields an empty vec.
pub fn values_for_group(
    dataset: &Dataset,
    grade: u32,
    subject: &str,
    group: &str,
    value: &str,
) -> Result<Vec<GroupValue>, QueryError> {
    if !dataset.has_column(value) {
        return Err(QueryError::UnknownColumn(value.to_string()));
    }

    let rows = filter_by_grade(dataset.select_all(), grade);
    let rows = filter_by_subject(rows, subject).retain(|r| r.student_group == group);

    Ok(rows
        .iter()
        .map(|r| GroupValue {
            district: r.district.clone(),
            school: r.school.clone(),
            value: r.value(value),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::parse_delimited;

    const SAMPLE: &str = "\
District\tSchool\tGradeLevel\tSubject\tStudentGroup\ttestAdministration\tPercentMetStandard
Seattle\tLincoln\t5th\tELA\tAll Students\tSBA\t61.0
Seattle\tLincoln\t5th\tELA\tLow Income\tSBA\tN<10
Seattle\tAdams\t5th\tELA\tAll Students\tSBA\t70.5
Seattle\tAdams\t6th\tELA\tAll Students\tSBA\t72.0
";

    #[test]
    fn projects_district_school_value() {
        let ds = parse_delimited(SAMPLE.as_bytes(), b'\t').unwrap();
        let rows = values_for_group(&ds, 5, "english", "All Students", "PercentMetStandard")
            .unwrap();
        assert_eq!(
            rows,
            vec![
                GroupValue {
                    district: "Seattle".into(),
                    school: "Lincoln".into(),
                    value: Some(61.0),
                },
                GroupValue {
                    district: "Seattle".into(),
                    school: "Adams".into(),
                    value: Some(70.5),
                },
            ]
        );

        let low = values_for_group(&ds, 5, "english", "Low Income", "PercentMetStandard")
            .unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].value, None);
    }

    #[test]
    fn unmatched_group_is_empty() {
        let ds = parse_delimited(SAMPLE.as_bytes(), b'\t').unwrap();
        let rows =
            values_for_group(&ds, 5, "english", "all students", "PercentMetStandard").unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn unknown_value_column() {
        let ds = parse_delimited(SAMPLE.as_bytes(), b'\t').unwrap();
        assert_eq!(
            values_for_group(&ds, 5, "english", "All Students", "Nope"),
            Err(QueryError::UnknownColumn("Nope".into()))
        );
    }
}
