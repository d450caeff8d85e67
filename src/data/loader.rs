use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{
    Array, AsArray, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use super::model::{CellValue, Dataset, Record, columns};

// ---------------------------------------------------------------------------
// Supported report years
// ---------------------------------------------------------------------------

/// Report years with a known download location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Year {
    Y2016,
    Y2017,
    Y2018,
}

impl Year {
    pub const ALL: [Year; 3] = [Year::Y2016, Year::Y2017, Year::Y2018];

    pub fn from_number(year: i32) -> Option<Year> {
        Year::ALL.into_iter().find(|y| y.number() == year)
    }

    pub fn number(self) -> i32 {
        match self {
            Year::Y2016 => 2016,
            Year::Y2017 => 2017,
            Year::Y2018 => 2018,
        }
    }

    /// School-level assessment report (with suppression, new format).
    pub fn source_url(self) -> &'static str {
        match self {
            Year::Y2016 => "http://reportcard.ospi.k12.wa.us/Reports/2016/2_03_AIM-EOC-MSP-SBA%20Assessments%20School%20(with%20suppression%20-%20new%20format).txt",
            Year::Y2017 => "http://reportcard.ospi.k12.wa.us/Reports/2017/2_03_AIM-EOC-MSP-SBA%20Assessments%20School%20(with%20suppression%20-%20new%20format).txt",
            Year::Y2018 => "http://reportcard.ospi.k12.wa.us/Reports/2018/2_03_AIM-WCAS-SBA%20Assessments%20School%20(with%20suppression%20-%20new%20format).txt",
        }
    }
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Download location for `year`, if it is one of the supported years.
pub fn source_url(year: i32) -> Option<&'static str> {
    Year::from_number(year).map(Year::source_url)
}

// ---------------------------------------------------------------------------
// Remote loading
// ---------------------------------------------------------------------------

/// Transport for the yearly report files.
pub trait Fetch {
    fn fetch(&self, url: &str) -> Result<Box<dyn Read>>;
}

/// Plain blocking HTTP GET.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Box<dyn Read>> {
        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("GET {url}"))?;
        Ok(Box::new(response))
    }
}

/// Download and parse the report for `year`.
///
/// Returns `Ok(None)` without touching the network when `year` is not one
/// of [`Year::ALL`].
pub fn load_dataset(year: i32) -> Result<Option<Dataset>> {
    if Year::from_number(year).is_none() {
        log::debug!("no report source for year {year}");
        return Ok(None);
    }
    load_dataset_with(&HttpFetcher::new(), year)
}

pub fn load_dataset_with(fetcher: &dyn Fetch, year: i32) -> Result<Option<Dataset>> {
    let Some(year) = Year::from_number(year) else {
        log::debug!("no report source for year {year}");
        return Ok(None);
    };

    let url = year.source_url();
    log::info!("Fetching {year} report from {url}");
    let body = fetcher.fetch(url)?;
    let dataset = parse_delimited(body, b'\t')
        .with_context(|| format!("parsing {year} report"))?;
    Ok(Some(dataset))
}

// ---------------------------------------------------------------------------
// Local files
// ---------------------------------------------------------------------------

/// Load a report from a local file.  Dispatch by extension.
///
/// Supported formats:
/// * `.txt` / `.tsv` – tab-separated, as published by OSPI
/// * `.csv`          – comma-separated, same columns
/// * `.parquet`      – one column per report column
pub fn load_file(path: &Path) -> Result<Dataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "txt" | "tsv" => load_delimited(path, b'\t'),
        "csv" => load_delimited(path, b','),
        "parquet" | "pq" => load_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

fn load_delimited(path: &Path, delimiter: u8) -> Result<Dataset> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    parse_delimited(file, delimiter).with_context(|| format!("parsing {}", path.display()))
}

// ---------------------------------------------------------------------------
// Delimited text parser
// ---------------------------------------------------------------------------

/// Positions of the required attributes within a header row.
struct KeyColumns {
    district: usize,
    school: usize,
    grade_level: usize,
    subject: usize,
    student_group: usize,
    test_administration: usize,
}

impl KeyColumns {
    fn locate(headers: &[String]) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(name))
                .with_context(|| format!("missing '{name}' column"))
        };
        Ok(KeyColumns {
            district: find(columns::DISTRICT)?,
            school: find(columns::SCHOOL)?,
            grade_level: find(columns::GRADE_LEVEL)?,
            subject: find(columns::SUBJECT)?,
            student_group: find(columns::STUDENT_GROUP)?,
            test_administration: find(columns::TEST_ADMINISTRATION)?,
        })
    }

    fn contains(&self, idx: usize) -> bool {
        [
            self.district,
            self.school,
            self.grade_level,
            self.subject,
            self.student_group,
            self.test_administration,
        ]
        .contains(&idx)
    }
}

/// Parse a delimited report with a header row.
///
/// The six key columns are required; every other column becomes a
/// [`CellValue`] field. Short rows read as missing cells.
pub fn parse_delimited<R: Read>(reader: R, delimiter: u8) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .context("reading header row")?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let h = if i == 0 { h.trim_start_matches('\u{feff}') } else { h };
            h.trim().to_string()
        })
        .collect();

    let keys = KeyColumns::locate(&headers)?;
    let value_cols: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| !keys.contains(*i))
        .map(|(i, h)| (i, h.clone()))
        .collect();

    let mut records = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let row = result.with_context(|| format!("row {row_no}"))?;
        let text = |idx: usize| row.get(idx).unwrap_or("").trim().to_string();

        let fields: BTreeMap<String, CellValue> = value_cols
            .iter()
            .map(|(idx, name)| (name.clone(), CellValue::parse(row.get(*idx).unwrap_or(""))))
            .collect();

        records.push(Record {
            district: text(keys.district),
            school: text(keys.school),
            grade_level: text(keys.grade_level),
            subject: text(keys.subject),
            student_group: text(keys.student_group),
            test_administration: text(keys.test_administration),
            fields,
        });
    }

    let column_names = value_cols.into_iter().map(|(_, name)| name).collect();
    let dataset = Dataset::from_records(column_names, records);
    log::debug!(
        "parsed {} rows, numeric columns {:?}",
        dataset.len(),
        dataset.numeric_columns
    );
    Ok(dataset)
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet copy of the report.
///
/// Expected schema: one column per report column. Key columns must be
/// strings; value columns may be strings (classified like text cells) or
/// numeric.
fn load_parquet(path: &Path) -> Result<Dataset> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut records = Vec::new();
    let mut column_names: Vec<String> = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();
        let headers: Vec<String> = schema.fields().iter().map(|f| f.name().clone()).collect();
        let keys = KeyColumns::locate(&headers)?;

        let value_cols: Vec<(usize, String)> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| !keys.contains(*i))
            .map(|(i, h)| (i, h.clone()))
            .collect();
        if column_names.is_empty() {
            column_names = value_cols.iter().map(|(_, h)| h.clone()).collect();
        }

        for row in 0..batch.num_rows() {
            let text = |idx: usize| extract_text(batch.column(idx), row);

            let fields = value_cols
                .iter()
                .map(|(idx, name)| (name.clone(), extract_cell(batch.column(*idx), row)))
                .collect();

            records.push(Record {
                district: text(keys.district),
                school: text(keys.school),
                grade_level: text(keys.grade_level),
                subject: text(keys.subject),
                student_group: text(keys.student_group),
                test_administration: text(keys.test_administration),
                fields,
            });
        }
    }

    Ok(Dataset::from_records(column_names, records))
}

/// Key attribute at `row`, kept verbatim apart from surrounding whitespace.
fn extract_text(col: &Arc<dyn Array>, row: usize) -> String {
    if col.is_null(row) {
        return String::new();
    }
    match col.data_type() {
        DataType::Utf8 => col.as_string::<i32>().value(row).trim().to_string(),
        DataType::LargeUtf8 => col.as_string::<i64>().value(row).trim().to_string(),
        _ => match extract_cell(col, row) {
            CellValue::Missing => String::new(),
            other => other.to_string(),
        },
    }
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell(col: &Arc<dyn Array>, row: usize) -> CellValue {
    if col.is_null(row) {
        return CellValue::Missing;
    }
    match col.data_type() {
        DataType::Utf8 => CellValue::parse(col.as_string::<i32>().value(row)),
        DataType::LargeUtf8 => CellValue::parse(col.as_string::<i64>().value(row)),
        DataType::Int32 => col
            .as_any()
            .downcast_ref::<Int32Array>()
            .map_or(CellValue::Missing, |a| CellValue::Number(a.value(row) as f64)),
        DataType::Int64 => col
            .as_any()
            .downcast_ref::<Int64Array>()
            .map_or(CellValue::Missing, |a| CellValue::Number(a.value(row) as f64)),
        DataType::Float32 => col
            .as_any()
            .downcast_ref::<Float32Array>()
            .map_or(CellValue::Missing, |a| CellValue::Number(a.value(row) as f64)),
        DataType::Float64 => col
            .as_any()
            .downcast_ref::<Float64Array>()
            .map_or(CellValue::Missing, |a| CellValue::Number(a.value(row))),
        DataType::Boolean => col
            .as_any()
            .downcast_ref::<BooleanArray>()
            .map_or(CellValue::Missing, |a| CellValue::Text(a.value(row).to_string())),
        other => CellValue::Text(format!("{other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io::Cursor;

    use arrow::array::{ArrayRef, StringArray};
    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    const REPORT: &str = "\u{feff}SchoolYear\tDistrict\tSchool\tTestAdministration\tGradeLevel\tSubject\tStudentGroup\tPercentMetStandard\tSuppression
2017-18\tSeattle\tLincoln\tSBA\t5th\tELA\tAll Students\t61.5%\t
2017-18\tSeattle\tLincoln\tSBA\t5th\tELA\tLow Income\tN<10\tsuppressed
2017-18\tTacoma\tLincoln\tSBA\t5th\tELA
";

    /// Serves `REPORT` for any URL and records what was requested.
    struct FakeFetcher {
        requested: RefCell<Vec<String>>,
    }

    impl FakeFetcher {
        fn new() -> Self {
            Self {
                requested: RefCell::new(Vec::new()),
            }
        }
    }

    impl Fetch for FakeFetcher {
        fn fetch(&self, url: &str) -> Result<Box<dyn Read>> {
            self.requested.borrow_mut().push(url.to_string());
            Ok(Box::new(Cursor::new(REPORT.as_bytes().to_vec())))
        }
    }

    #[test]
    fn supported_years_load() {
        let fetcher = FakeFetcher::new();
        for year in [2016, 2017, 2018] {
            let ds = load_dataset_with(&fetcher, year).unwrap();
            assert!(ds.is_some(), "year {year}");
        }
        let requested = fetcher.requested.borrow();
        assert_eq!(requested.len(), 3);
        assert!(requested[2].contains("/2018/"));
    }

    #[test]
    fn unsupported_year_is_absent_without_fetch() {
        let fetcher = FakeFetcher::new();
        assert!(load_dataset_with(&fetcher, 2099).unwrap().is_none());
        assert!(load_dataset_with(&fetcher, 2015).unwrap().is_none());
        assert!(fetcher.requested.borrow().is_empty());
        assert_eq!(source_url(2099), None);
    }

    #[test]
    fn parses_report_columns() {
        let ds = parse_delimited(REPORT.as_bytes(), b'\t').unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(
            ds.column_names,
            vec!["SchoolYear", "PercentMetStandard", "Suppression"]
        );
        assert_eq!(ds.numeric_columns, vec!["PercentMetStandard"]);

        let first = &ds.records[0];
        assert_eq!(first.district, "Seattle");
        assert_eq!(first.test_administration, "SBA");
        assert_eq!(first.value("PercentMetStandard"), Some(61.5));

        assert_eq!(ds.records[1].value("PercentMetStandard"), None);
        // short row
        assert_eq!(ds.records[2].student_group, "");
        assert_eq!(
            ds.records[2].fields.get("PercentMetStandard"),
            Some(&CellValue::Missing)
        );
    }

    #[test]
    fn missing_key_column_is_an_error() {
        let err = parse_delimited("District\tSchool\n".as_bytes(), b'\t').unwrap_err();
        assert!(format!("{err:#}").contains("GradeLevel"));
    }

    #[test]
    fn unsupported_extension() {
        assert!(load_file(Path::new("report.xlsx")).is_err());
    }

    #[test]
    fn csv_file_loads_through_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        std::fs::write(
            &path,
            "District,School,GradeLevel,Subject,StudentGroup,testAdministration,PercentMetStandard\n\
             Seattle,Lincoln,5th,MATH,All Students,SBA,55.5%\n",
        )
        .unwrap();

        let ds = load_file(&path).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.records[0].school, "Lincoln");
        assert_eq!(ds.records[0].value("PercentMetStandard"), Some(55.5));
    }

    fn text(name: &str, values: [Option<&str>; 2]) -> (Field, ArrayRef) {
        (
            Field::new(name, DataType::Utf8, true),
            Arc::new(StringArray::from(values.to_vec())),
        )
    }

    fn write_parquet(path: &Path) {
        let (fields, arrays): (Vec<Field>, Vec<ArrayRef>) = [
            text("District", [Some("012"), Some("Tacoma")]),
            text("School", [Some("007"), Some(" Lincoln ")]),
            text("GradeLevel", [Some("5th"), Some("5th")]),
            text("Subject", [Some("MATH"), Some("MATH")]),
            text("StudentGroup", [Some("NULL"), None]),
            text("testAdministration", [Some("SBA"), Some("SBA")]),
            (
                Field::new("Count", DataType::Int64, false),
                Arc::new(Int64Array::from(vec![42, 17])) as ArrayRef,
            ),
            (
                Field::new("PercentMetStandard", DataType::Float64, true),
                Arc::new(Float64Array::from(vec![Some(61.5), None])) as ArrayRef,
            ),
            text("PercentLevel4", [Some("30%"), Some("N<10")]),
        ]
        .into_iter()
        .unzip();

        let schema = Arc::new(Schema::new(fields));
        let batch = RecordBatch::try_new(schema.clone(), arrays).unwrap();
        let file = std::fs::File::create(path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
    }

    #[test]
    fn parquet_file_loads_keys_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.parquet");
        write_parquet(&path);

        let ds = load_file(&path).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(
            ds.column_names,
            vec!["Count", "PercentMetStandard", "PercentLevel4"]
        );

        let first = &ds.records[0];
        assert_eq!(first.district, "012");
        assert_eq!(first.school, "007");
        assert_eq!(first.student_group, "NULL");
        assert_eq!(first.value("Count"), Some(42.0));
        assert_eq!(first.value("PercentMetStandard"), Some(61.5));
        assert_eq!(first.value("PercentLevel4"), Some(30.0));

        let second = &ds.records[1];
        assert_eq!(second.school, "Lincoln");
        assert_eq!(second.student_group, "");
        assert_eq!(
            second.fields.get("PercentMetStandard"),
            Some(&CellValue::Missing)
        );
        assert_eq!(
            second.fields.get("PercentLevel4"),
            Some(&CellValue::Text("N<10".into()))
        );
    }

    #[test]
    fn parquet_and_tsv_agree_on_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pq");
        write_parquet(&path);
        let from_parquet = load_file(&path).unwrap();

        let tsv = "District\tSchool\tGradeLevel\tSubject\tStudentGroup\ttestAdministration\n\
                   012\t007\t5th\tMATH\tNULL\tSBA\n";
        let from_tsv = parse_delimited(tsv.as_bytes(), b'\t').unwrap();

        let (p, t) = (&from_parquet.records[0], &from_tsv.records[0]);
        assert_eq!(p.district, t.district);
        assert_eq!(p.school, t.school);
        assert_eq!(p.student_group, t.student_group);
    }
}
