use std::collections::BTreeSet;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use ospi_scores::data::compare::{Comparison, ComparisonQuery, compare_groups};
use ospi_scores::data::export::export_comparison;
use ospi_scores::data::filter::{Grade, Subject};
use ospi_scores::data::loader::{self, Fetch, HttpFetcher, Year};
use ospi_scores::data::model::Dataset;

use crate::ui::plot::ScatterChart;

/// Result of a report download running on a worker thread.
type Download = (Year, anyhow::Result<Option<Dataset>>);

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Loaded report (None until the user loads one).
    pub dataset: Option<Dataset>,

    /// Where the current report came from, for the top bar.
    pub source: Option<String>,

    pub grade: Grade,
    pub subject: Subject,

    /// Student groups to compare (two for a chart).
    pub groups: BTreeSet<String>,

    /// Value column compared across groups.
    pub value_column: Option<String>,

    /// Last successful comparison.
    pub comparison: Option<Comparison>,

    /// Chart fed by the last comparison.
    pub chart: ScatterChart,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,

    /// In-flight download, polled once per frame.
    download: Option<Receiver<Download>>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            dataset: None,
            source: None,
            grade: Grade::Fifth,
            subject: Subject::Math,
            groups: BTreeSet::new(),
            value_column: None,
            comparison: None,
            chart: ScatterChart::default(),
            status_message: None,
            download: None,
        }
    }
}

impl AppState {
    /// Ingest a newly loaded report and pick sensible defaults.
    pub fn set_dataset(&mut self, dataset: Dataset, source: String) {
        self.groups = ["All Students", "Low Income"]
            .into_iter()
            .filter(|g| dataset.student_groups.contains(*g))
            .map(str::to_string)
            .collect();

        let keep_value = self
            .value_column
            .as_ref()
            .is_some_and(|v| dataset.numeric_columns.contains(v));
        if !keep_value {
            self.value_column = dataset.numeric_columns.first().cloned();
        }

        self.dataset = Some(dataset);
        self.source = Some(source);
        self.comparison = None;
        self.chart.clear();
        self.status_message = None;
    }

    fn load_failed(&mut self, err: anyhow::Error) {
        log::error!("Failed to load report: {err:#}");
        self.status_message = Some(format!("Error: {err:#}"));
    }

    /// Start downloading the report for `year` in the background.
    pub fn load_year(&mut self, year: Year) {
        self.start_download(year, HttpFetcher::new());
    }

    fn start_download<F: Fetch + Send + 'static>(&mut self, year: Year, fetcher: F) {
        if self.download.is_some() {
            return;
        }
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let result = loader::load_dataset_with(&fetcher, year.number());
            // The receiver is gone only if the app closed mid-download.
            let _ = tx.send((year, result));
        });
        self.download = Some(rx);
        self.status_message = Some(format!("Downloading {year} report…"));
    }

    pub fn is_downloading(&self) -> bool {
        self.download.is_some()
    }

    /// Pick up a finished download, if any.
    pub fn poll_download(&mut self) {
        let Some(rx) = &self.download else {
            return;
        };
        let (year, result) = match rx.try_recv() {
            Ok(done) => done,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => {
                self.download = None;
                self.load_failed(anyhow::anyhow!("download worker stopped"));
                return;
            }
        };
        self.download = None;
        match result {
            Ok(Some(dataset)) => {
                log::info!("Loaded {} rows for {year}", dataset.len());
                self.set_dataset(dataset, format!("OSPI {year}"));
            }
            Ok(None) => self.load_failed(anyhow::anyhow!("no report for {year}")),
            Err(e) => self.load_failed(e),
        }
    }

    /// Load a report from a local file.
    pub fn load_path(&mut self, path: &Path) {
        match loader::load_file(path) {
            Ok(dataset) => {
                log::info!(
                    "Loaded {} rows with columns {:?}",
                    dataset.len(),
                    dataset.column_names
                );
                self.set_dataset(dataset, path.display().to_string());
            }
            Err(e) => self.load_failed(e),
        }
    }

    /// Toggle a student group in the comparison.
    pub fn toggle_group(&mut self, group: &str) {
        if !self.groups.remove(group) {
            self.groups.insert(group.to_string());
        }
    }

    pub fn query(&self) -> Option<ComparisonQuery> {
        Some(ComparisonQuery {
            grade: self.grade.number(),
            subject: self.subject.keyword().to_string(),
            groups: self.groups.iter().cloned().collect(),
            values: vec![self.value_column.clone()?],
        })
    }

    /// Run the comparison for the current selections and feed the chart.
    pub fn run_comparison(&mut self) {
        let Some(dataset) = &self.dataset else {
            self.status_message = Some("No report loaded.".into());
            return;
        };
        let Some(query) = self.query() else {
            self.status_message = Some("Pick a value column.".into());
            return;
        };

        self.chart.clear();
        match compare_groups(dataset, &query, &mut self.chart) {
            Ok(cmp) => {
                self.status_message = cmp
                    .is_empty()
                    .then(|| "No school has values for both groups.".to_string());
                self.comparison = Some(cmp);
            }
            Err(e) => {
                log::warn!("Comparison failed: {e}");
                self.status_message = Some(format!("Error: {e}"));
                self.comparison = None;
            }
        }
    }

    /// Write the current comparison to `path`.
    pub fn export(&mut self, path: &Path) {
        let Some(cmp) = &self.comparison else {
            self.status_message = Some("Nothing to export.".into());
            return;
        };
        if let Err(e) = export_comparison(path, cmp) {
            log::error!("Export failed: {e:#}");
            self.status_message = Some(format!("Error: {e:#}"));
        }
    }
}
