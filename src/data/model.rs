use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// ---------------------------------------------------------------------------
// CellValue – a single non-key cell of an assessment row
// ---------------------------------------------------------------------------

/// A cell from one of the report's value columns.
///
/// The OSPI files mix numbers (`45.2`, `45.2%`) with suppression markers
/// (`N<10`, `<5%`, `>95%`) in the same column, so each cell is classified
/// on load rather than per column.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Missing,
}

impl CellValue {
    /// Classify a raw cell as read from the delimited file.
    pub fn parse(raw: &str) -> Self {
        let s = raw.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("null") {
            return CellValue::Missing;
        }
        let numeric = s.strip_suffix('%').unwrap_or(s).trim_end();
        match numeric.parse::<f64>() {
            Ok(v) if v.is_finite() => CellValue::Number(v),
            _ => CellValue::Text(s.to_string()),
        }
    }

    /// The numeric value, if this cell holds one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(v) => write!(f, "{v}"),
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Missing => write!(f, "<missing>"),
        }
    }
}

// ---------------------------------------------------------------------------
// Record – one row of the assessment report
// ---------------------------------------------------------------------------

/// Header names of the attributes every report row must carry.
pub mod columns {
    pub const DISTRICT: &str = "District";
    pub const SCHOOL: &str = "School";
    pub const GRADE_LEVEL: &str = "GradeLevel";
    pub const SUBJECT: &str = "Subject";
    pub const STUDENT_GROUP: &str = "StudentGroup";
    pub const TEST_ADMINISTRATION: &str = "testAdministration";

    pub const REQUIRED: [&str; 6] = [
        DISTRICT,
        SCHOOL,
        GRADE_LEVEL,
        SUBJECT,
        STUDENT_GROUP,
        TEST_ADMINISTRATION,
    ];
}

/// One school / grade / subject / group / administration row.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub district: String,
    pub school: String,
    pub grade_level: String,
    pub subject: String,
    pub student_group: String,
    pub test_administration: String,
    /// Every other column: header name → cell.
    pub fields: BTreeMap<String, CellValue>,
}

impl Record {
    /// Numeric value of `column`, `None` when absent, missing or suppressed.
    pub fn value(&self, column: &str) -> Option<f64> {
        self.fields.get(column).and_then(CellValue::as_f64)
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded report
// ---------------------------------------------------------------------------

/// The parsed report with pre-computed column indices.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    /// All rows, in file order.
    pub records: Vec<Record>,
    /// Non-key columns in header order.
    pub column_names: Vec<String>,
    /// Columns with at least one numeric cell, in header order.
    pub numeric_columns: Vec<String>,
    /// Distinct `StudentGroup` labels.
    pub student_groups: BTreeSet<String>,
}

impl Dataset {
    /// Build column indices from the loaded rows.
    pub fn from_records(column_names: Vec<String>, records: Vec<Record>) -> Self {
        let mut numeric: BTreeSet<&str> = BTreeSet::new();
        let mut student_groups = BTreeSet::new();

        for rec in &records {
            student_groups.insert(rec.student_group.clone());
            for (col, cell) in &rec.fields {
                if matches!(cell, CellValue::Number(_)) {
                    numeric.insert(col.as_str());
                }
            }
        }

        let numeric_columns = column_names
            .iter()
            .filter(|c| numeric.contains(c.as_str()))
            .cloned()
            .collect();

        Dataset {
            records,
            column_names,
            numeric_columns,
            student_groups,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_names.iter().any(|c| c == column)
    }

    /// A selection over every row.
    pub fn select_all(&self) -> Selection<'_> {
        Selection {
            rows: self.records.iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Selection – a narrowed, borrowed view of a dataset
// ---------------------------------------------------------------------------

/// A subset of a dataset's rows. Filters only ever narrow it.
#[derive(Debug, Clone, Default)]
pub struct Selection<'a> {
    rows: Vec<&'a Record>,
}

impl<'a> Selection<'a> {
    pub fn empty() -> Self {
        Selection { rows: Vec::new() }
    }

    /// Keep only the rows matching `pred`.
    pub fn retain<F>(mut self, mut pred: F) -> Self
    where
        F: FnMut(&Record) -> bool,
    {
        self.rows.retain(|r| pred(*r));
        self
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Record> + '_ {
        self.rows.iter().copied()
    }
}
