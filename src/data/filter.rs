use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::model::Selection;

// ---------------------------------------------------------------------------
// Closed lookup tables: grade and subject labels used by the report
// ---------------------------------------------------------------------------

/// Test administration code for the Smarter Balanced Assessment.
pub const SBA: &str = "SBA";

/// Grades that have a label in the report. Grade 9 is not tested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Grade {
    Third,
    Fourth,
    Fifth,
    Sixth,
    Seventh,
    Eighth,
    Tenth,
    Eleventh,
}

impl Grade {
    pub const ALL: [Grade; 8] = [
        Grade::Third,
        Grade::Fourth,
        Grade::Fifth,
        Grade::Sixth,
        Grade::Seventh,
        Grade::Eighth,
        Grade::Tenth,
        Grade::Eleventh,
    ];

    pub fn from_number(n: u32) -> Option<Grade> {
        Grade::ALL.into_iter().find(|g| g.number() == n)
    }

    pub fn number(self) -> u32 {
        match self {
            Grade::Third => 3,
            Grade::Fourth => 4,
            Grade::Fifth => 5,
            Grade::Sixth => 6,
            Grade::Seventh => 7,
            Grade::Eighth => 8,
            Grade::Tenth => 10,
            Grade::Eleventh => 11,
        }
    }

    /// The `GradeLevel` cell value for this grade.
    pub fn label(self) -> &'static str {
        match self {
            Grade::Third => "3rd",
            Grade::Fourth => "4th",
            Grade::Fifth => "5th",
            Grade::Sixth => "6th",
            Grade::Seventh => "7th",
            Grade::Eighth => "8th",
            Grade::Tenth => "10th",
            Grade::Eleventh => "11th",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Subject keywords accepted by the queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Subject {
    /// Smarter Balanced math (`MATH`).
    Math,
    /// The second math test (`Math`).
    Math1,
    /// English language arts (`ELA`).
    English,
}

impl Subject {
    pub const ALL: [Subject; 3] = [Subject::Math, Subject::Math1, Subject::English];

    pub fn from_keyword(keyword: &str) -> Option<Subject> {
        Subject::ALL.into_iter().find(|s| s.keyword() == keyword)
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Subject::Math => "math",
            Subject::Math1 => "math1",
            Subject::English => "english",
        }
    }

    /// The `Subject` cell value for this keyword.
    pub fn label(self) -> &'static str {
        match self {
            Subject::Math => "MATH",
            Subject::Math1 => "Math",
            Subject::English => "ELA",
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown subject `{0}` (expected math, math1 or english)")]
pub struct ParseSubjectError(pub String);

impl FromStr for Subject {
    type Err = ParseSubjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Subject::from_keyword(s).ok_or_else(|| ParseSubjectError(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Row filters
// ---------------------------------------------------------------------------

/// Keep rows whose `GradeLevel` is the label for `grade`.
///
/// A grade without a label (9, or anything outside 3..=11) yields an empty
/// selection.
pub fn filter_by_grade(rows: Selection<'_>, grade: u32) -> Selection<'_> {
    match Grade::from_number(grade) {
        Some(g) => rows.retain(|r| r.grade_level == g.label()),
        None => {
            log::debug!("grade {grade} has no report label; selecting nothing");
            Selection::empty()
        }
    }
}

/// Keep rows whose `Subject` is the label for `keyword`.
///
/// Unknown keywords yield an empty selection.
pub fn filter_by_subject<'a>(rows: Selection<'a>, keyword: &str) -> Selection<'a> {
    match Subject::from_keyword(keyword) {
        Some(s) => rows.retain(|r| r.subject == s.label()),
        None => {
            log::debug!("subject `{keyword}` has no report label; selecting nothing");
            Selection::empty()
        }
    }
}

/// Keep rows from the given test administration.
pub fn filter_by_administration<'a>(rows: Selection<'a>, code: &str) -> Selection<'a> {
    rows.retain(|r| r.test_administration == code)
}

/// Keep rows whose `StudentGroup` is one of `groups`.
pub fn filter_by_groups<'a, S: AsRef<str>>(rows: Selection<'a>, groups: &[S]) -> Selection<'a> {
    rows.retain(|r| groups.iter().any(|g| g.as_ref() == r.student_group))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::parse_delimited;
    use crate::data::model::Dataset;

    const SAMPLE: &str = "\
District\tSchool\tGradeLevel\tSubject\tStudentGroup\ttestAdministration\tPercentMetStandard
Seattle\tLincoln\t5th\tMATH\tAll Students\tSBA\t55.0
Seattle\tLincoln\t5th\tMath\tAll Students\tSBA\t51.0
Seattle\tLincoln\t5th\tELA\tAll Students\tSBA\t61.0
Seattle\tLincoln\t4th\tMATH\tAll Students\tSBA\t48.0
Tacoma\tLincoln\t10th\tELA\tLow Income\tSBA\t40.0
Tacoma\tLincoln\t5th\tMATH\tLow Income\tWCAS\t33.0
";

    fn sample() -> Dataset {
        parse_delimited(SAMPLE.as_bytes(), b'\t').unwrap()
    }

    #[test]
    fn grade_table() {
        let known: Vec<u32> = Grade::ALL.iter().map(|g| g.number()).collect();
        assert_eq!(known, vec![3, 4, 5, 6, 7, 8, 10, 11]);
        assert_eq!(Grade::from_number(9), None);
        assert_eq!(Grade::from_number(10).map(Grade::label), Some("10th"));
    }

    #[test]
    fn grade_five_selects_fifth_only() {
        let ds = sample();
        let rows = filter_by_grade(ds.select_all(), 5);
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|r| r.grade_level == "5th"));
    }

    #[test]
    fn unmapped_grades_select_nothing() {
        let ds = sample();
        for g in [0, 1, 2, 9, 12, 99] {
            assert!(filter_by_grade(ds.select_all(), g).is_empty(), "grade {g}");
        }
    }

    #[test]
    fn math1_is_distinct_from_math() {
        let ds = sample();
        let math1 = filter_by_subject(ds.select_all(), "math1");
        assert_eq!(math1.len(), 1);
        assert!(math1.iter().all(|r| r.subject == "Math"));

        let math = filter_by_subject(ds.select_all(), "math");
        assert_eq!(math.len(), 3);
        assert!(math.iter().all(|r| r.subject == "MATH"));
    }

    #[test]
    fn unknown_subject_selects_nothing() {
        let ds = sample();
        assert!(filter_by_subject(ds.select_all(), "science").is_empty());
        assert!(filter_by_subject(ds.select_all(), "MATH").is_empty());
    }

    #[test]
    fn subject_from_str() {
        assert_eq!("english".parse::<Subject>(), Ok(Subject::English));
        assert!("ela".parse::<Subject>().is_err());
    }

    #[test]
    fn administration_and_groups() {
        let ds = sample();
        let sba = filter_by_administration(ds.select_all(), SBA);
        assert_eq!(sba.len(), 5);

        let low = filter_by_groups(sba, &["Low Income"]);
        assert_eq!(low.len(), 1);
        assert_eq!(low.iter().next().map(|r| r.district.as_str()), Some("Tacoma"));
    }
}
