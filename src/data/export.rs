use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use super::compare::Comparison;
use super::pivot::PivotTable;

// ---------------------------------------------------------------------------
// Column-oriented view shared by every output format
// ---------------------------------------------------------------------------

/// Named key columns followed by nullable numeric columns.
struct OutputTable {
    key_names: Vec<&'static str>,
    keys: Vec<Vec<String>>,
    value_names: Vec<String>,
    values: Vec<Vec<Option<f64>>>,
}

impl OutputTable {
    fn from_comparison(cmp: &Comparison) -> Self {
        OutputTable {
            key_names: vec!["District", "School"],
            keys: vec![
                cmp.rows.iter().map(|r| r.key.district.clone()).collect(),
                cmp.rows.iter().map(|r| r.key.school.clone()).collect(),
            ],
            value_names: vec![cmp.x_label.clone(), cmp.y_label.clone()],
            values: vec![
                cmp.rows.iter().map(|r| Some(r.x)).collect(),
                cmp.rows.iter().map(|r| Some(r.y)).collect(),
            ],
        }
    }

    fn from_pivot(pivot: &PivotTable) -> Self {
        OutputTable {
            key_names: vec!["District", "School"],
            keys: vec![
                pivot.rows.keys().map(|k| k.district.clone()).collect(),
                pivot.rows.keys().map(|k| k.school.clone()).collect(),
            ],
            value_names: pivot.columns.iter().map(|c| c.to_string()).collect(),
            values: pivot
                .columns
                .iter()
                .map(|c| pivot.rows.values().map(|row| row.get(c).copied()).collect())
                .collect(),
        }
    }

    fn num_rows(&self) -> usize {
        self.keys.first().map_or(0, Vec::len)
    }

    fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("creating {}", path.display()))?;

        let header = self
            .key_names
            .iter()
            .map(|s| s.to_string())
            .chain(self.value_names.iter().cloned());
        writer.write_record(header).context("writing CSV header")?;

        for row in 0..self.num_rows() {
            let record = self
                .keys
                .iter()
                .map(|col| col[row].clone())
                .chain(
                    self.values
                        .iter()
                        .map(|col| col[row].map(|v| v.to_string()).unwrap_or_default()),
                );
            writer.write_record(record).with_context(|| format!("writing CSV row {row}"))?;
        }
        writer.flush().context("flushing CSV")?;
        Ok(())
    }

    fn write_parquet(&self, path: &Path) -> Result<()> {
        let mut fields = Vec::new();
        let mut arrays: Vec<ArrayRef> = Vec::new();

        for (name, col) in self.key_names.iter().zip(&self.keys) {
            fields.push(Field::new(*name, DataType::Utf8, false));
            arrays.push(Arc::new(StringArray::from(col.clone())));
        }
        for (name, col) in self.value_names.iter().zip(&self.values) {
            fields.push(Field::new(name.as_str(), DataType::Float64, true));
            arrays.push(Arc::new(Float64Array::from(col.clone())));
        }

        let schema = Arc::new(Schema::new(fields));
        let batch = RecordBatch::try_new(schema.clone(), arrays)
            .context("building record batch")?;

        let file = std::fs::File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        let mut writer =
            ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
        writer.write(&batch).context("writing parquet batch")?;
        writer.close().context("closing parquet writer")?;
        Ok(())
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Write a comparison table.  Dispatch by extension: `.csv`, `.json`,
/// `.parquet`.
pub fn export_comparison(path: &Path, comparison: &Comparison) -> Result<()> {
    match extension(path).as_str() {
        "csv" => OutputTable::from_comparison(comparison).write_csv(path),
        "parquet" | "pq" => OutputTable::from_comparison(comparison).write_parquet(path),
        "json" => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("creating {}", path.display()))?;
            serde_json::to_writer_pretty(file, comparison).context("writing JSON")?;
            Ok(())
        }
        other => bail!("Unsupported export extension: .{other}"),
    }?;
    log::info!("Exported {} rows to {}", comparison.len(), path.display());
    Ok(())
}

/// Write a pivot table.  Dispatch by extension: `.csv`, `.parquet`.
pub fn export_pivot(path: &Path, pivot: &PivotTable) -> Result<()> {
    match extension(path).as_str() {
        "csv" => OutputTable::from_pivot(pivot).write_csv(path),
        "parquet" | "pq" => OutputTable::from_pivot(pivot).write_parquet(path),
        other => bail!("Unsupported export extension: .{other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::compare::ComparisonRow;
    use crate::data::pivot::{ColumnKey, SchoolKey};
    use arrow::array::Array;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn comparison() -> Comparison {
        Comparison {
            x_label: "Low Income".into(),
            y_label: "All Students".into(),
            rows: vec![
                ComparisonRow {
                    key: SchoolKey::new("Seattle", "Lincoln"),
                    x: 35.0,
                    y: 55.5,
                },
                ComparisonRow {
                    key: SchoolKey::new("Tacoma", "Adams"),
                    x: 50.0,
                    y: 65.0,
                },
            ],
        }
    }

    #[test]
    fn comparison_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cmp.csv");
        export_comparison(&path, &comparison()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "District,School,Low Income,All Students");
        assert_eq!(lines[1], "Seattle,Lincoln,35,55.5");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn comparison_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cmp.json");
        export_comparison(&path, &comparison()).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["x_label"], "Low Income");
        assert_eq!(value["rows"][1]["key"]["district"], "Tacoma");
        assert_eq!(value["rows"][1]["y"], 65.0);
    }

    #[test]
    fn pivot_parquet_keeps_gaps_as_nulls() {
        let met = ColumnKey {
            value: "PercentMetStandard".into(),
            group: "All Students".into(),
        };
        let low = ColumnKey {
            value: "PercentMetStandard".into(),
            group: "Low Income".into(),
        };
        let mut rows = BTreeMap::new();
        rows.insert(
            SchoolKey::new("Seattle", "Adams"),
            BTreeMap::from([(met.clone(), 70.0)]),
        );
        rows.insert(
            SchoolKey::new("Seattle", "Lincoln"),
            BTreeMap::from([(met.clone(), 60.0), (low.clone(), 40.0)]),
        );
        let pivot = PivotTable {
            columns: vec![met, low],
            rows,
        };

        let dir = tempdir().unwrap();
        let path = dir.path().join("pivot.parquet");
        export_pivot(&path, &pivot).unwrap();

        let file = std::fs::File::open(&path).unwrap();
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .unwrap()
            .build()
            .unwrap();
        let batches: Vec<RecordBatch> = reader.map(|b| b.unwrap()).collect();
        assert_eq!(batches.len(), 1);
        let batch = &batches[0];
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 4);
        assert_eq!(batch.schema().field(3).name(), "PercentMetStandard Low Income");
        assert_eq!(batch.column(3).null_count(), 1);
    }

    #[test]
    fn unsupported_extension() {
        let dir = tempdir().unwrap();
        assert!(export_comparison(&dir.path().join("cmp.xlsx"), &comparison()).is_err());
        assert!(export_pivot(&dir.path().join("p.json"), &PivotTable::default()).is_err());
    }
}
