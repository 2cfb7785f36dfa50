//! Review session: one collection under review plus its view state.
//!
//! The session owns the record store, the filter and page cursor, and the
//! parallel predicted collection. Remote fetches are tagged with a
//! generation token; a response that arrives after a newer fetch or import
//! has started is discarded.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tokio::task::JoinHandle;

use crate::config::ReviewConfig;
use crate::csv_io::{self, ExportMode, ExportTable, ImportedCollection, LABELS_FILE_NAME};
use crate::error::{DecodeError, RemoteError, Result};
use crate::filter::{self, FilterState};
use crate::notify::{Notification, Notifier};
use crate::ordering::{sort_records, ByPredictedRank, RecordOrdering};
use crate::paging::{paginate, PageCursor, PageItem};
use crate::reconciler::{LabelChange, LabelOutcome, LabelReconciler};
use crate::record::JobRecord;
use crate::remote::{
    CategoryCounts, HttpJobService, JobQuery, JobService, PredictRequest, TrainReport,
    TrainRequest,
};
use crate::store::{RecordStore, SharedStore};

/// Where the current collection came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionSource {
    #[default]
    Empty,
    /// One server-side page; paging is done by the job service.
    Remote,
    /// A whole CSV collection; paging is done locally.
    Imported,
}

/// Result of a list fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The store now holds the fetched page.
    Applied { records: usize },
    /// A newer fetch or import started first; the response was dropped.
    Stale,
}

/// Summary of a finished import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub records: usize,
    pub skipped_rows: usize,
    pub dropped_labels: usize,
}

/// The records to display and the paging controls around them.
#[derive(Debug, Clone)]
pub struct PageView {
    pub records: Vec<Arc<JobRecord>>,
    pub cursor: PageCursor,
    pub window: Vec<PageItem>,
}

struct ViewState {
    filter: FilterState,
    cursor: PageCursor,
    ordering: Arc<dyn RecordOrdering>,
    source: CollectionSource,
    counts: Option<CategoryCounts>,
    report: Option<String>,
}

pub struct ReviewSession {
    config: ReviewConfig,
    service: Arc<dyn JobService>,
    notifier: Notifier,
    reconciler: LabelReconciler,
    predicted: LabelReconciler,
    state: Mutex<ViewState>,
    fetch_generation: AtomicU64,
}

impl ReviewSession {
    pub fn new(config: ReviewConfig, service: Arc<dyn JobService>) -> Self {
        let notifier = Notifier::new(config.notification_capacity);
        let reconciler = LabelReconciler::new(
            SharedStore::default(),
            service.clone(),
            notifier.clone(),
            config.failure_policy,
        );
        let predicted = LabelReconciler::new(
            SharedStore::default(),
            service.clone(),
            notifier.clone(),
            config.failure_policy,
        );
        let state = ViewState {
            filter: FilterState::default(),
            cursor: PageCursor::new(config.page_size),
            ordering: config.ordering.comparator(),
            source: CollectionSource::Empty,
            counts: None,
            report: None,
        };

        Self {
            config,
            service,
            notifier,
            reconciler,
            predicted,
            state: Mutex::new(state),
            fetch_generation: AtomicU64::new(0),
        }
    }

    /// Builds a session talking HTTP to the endpoint selected in `config`.
    pub fn connect(config: ReviewConfig) -> Result<Self> {
        let service = HttpJobService::new(&config)?;
        log::info!("Review session using {}", service.base_url());
        Ok(Self::new(config, Arc::new(service)))
    }

    fn lock_state(&self) -> MutexGuard<'_, ViewState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Session state lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    pub fn config(&self) -> &ReviewConfig {
        &self.config
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn store(&self) -> &SharedStore {
        self.reconciler.store()
    }

    pub fn predicted_store(&self) -> &SharedStore {
        self.predicted.store()
    }

    pub fn filter(&self) -> FilterState {
        self.lock_state().filter
    }

    pub fn cursor(&self) -> PageCursor {
        self.lock_state().cursor
    }

    pub fn source(&self) -> CollectionSource {
        self.lock_state().source
    }

    pub fn counts(&self) -> Option<CategoryCounts> {
        self.lock_state().counts.clone()
    }

    /// Text report of the last prediction run.
    pub fn report(&self) -> Option<String> {
        self.lock_state().report.clone()
    }

    pub fn set_ordering(&self, ordering: Arc<dyn RecordOrdering>) {
        self.lock_state().ordering = ordering;
    }

    /// Moves to `page`, clamped into range. Returns the page actually set.
    pub fn set_page(&self, page: u32) -> u32 {
        self.lock_state().cursor.set_page(page)
    }

    /// Flips one filter key and returns to page 1. Unknown keys change
    /// nothing and yield `None`.
    pub fn toggle_filter(&self, key: &str) -> Option<bool> {
        let mut state = self.lock_state();
        let value = state.filter.toggle(key)?;
        state.cursor.set_page(1);
        Some(value)
    }

    pub fn set_filter(&self, filter: FilterState) {
        let mut state = self.lock_state();
        state.filter = filter;
        state.cursor.set_page(1);
    }

    fn next_generation(&self) -> u64 {
        self.fetch_generation.fetch_add(1, AtomicOrdering::SeqCst) + 1
    }

    fn is_current(&self, generation: u64) -> bool {
        self.fetch_generation.load(AtomicOrdering::SeqCst) == generation
    }

    fn report_remote(&self, error: RemoteError) -> crate::error::ReviewError {
        self.notifier.send(Notification::remote_failed(&error));
        error.into()
    }

    /// Fetches the current page from the job service and replaces the store
    /// with it.
    pub async fn load_page(&self) -> Result<FetchOutcome> {
        let query = {
            let state = self.lock_state();
            JobQuery {
                limit: state.cursor.page_size(),
                offset: state.cursor.offset(),
                filter: state.filter,
            }
        };
        let generation = self.next_generation();

        let page = self
            .service
            .list_jobs(&query)
            .await
            .map_err(|e| self.report_remote(e))?;

        if !self.is_current(generation) {
            log::debug!(
                "Discarding stale page at offset {} (fetch {})",
                query.offset,
                generation
            );
            return Ok(FetchOutcome::Stale);
        }

        let records = page.records.len();
        self.store()
            .replace(RecordStore::from_records(page.records).with_columns(page.fields));
        self.lock_state().source = CollectionSource::Remote;
        Ok(FetchOutcome::Applied { records })
    }

    /// Asks the job service how many jobs match the filter and updates the
    /// page cursor. Returns the new total.
    pub async fn refresh_count(&self) -> Result<u64> {
        let filter = self.filter();
        let counts = self
            .service
            .count_jobs(&filter)
            .await
            .map_err(|e| self.report_remote(e))?;

        let total = counts.visible_total(&filter);
        let mut state = self.lock_state();
        state.cursor.set_total_count(total);
        state.counts = Some(counts);
        Ok(total)
    }

    /// Visible records in display order: filtered, then sorted.
    pub fn visible_records(&self) -> Vec<Arc<JobRecord>> {
        let snapshot = self.store().snapshot();
        let (filter, ordering) = {
            let state = self.lock_state();
            (state.filter, state.ordering.clone())
        };
        let mut records = filter::visible_records(&snapshot, &filter);
        sort_records(&mut records, ordering.as_ref());
        records
    }

    /// The records for the current page and the page-index window.
    ///
    /// Imported collections are paged here; a remote page is shown whole.
    pub fn visible_page(&self) -> PageView {
        let records = self.visible_records();
        let mut state = self.lock_state();

        let records = match state.source {
            CollectionSource::Remote => records,
            CollectionSource::Empty | CollectionSource::Imported => {
                state.cursor.set_total_count(records.len() as u64);
                paginate(&records, &state.cursor).to_vec()
            }
        };

        PageView {
            records,
            cursor: state.cursor,
            window: state.cursor.window(self.config.page_radius),
        }
    }

    /// Applies a label change locally and sends it to the label store.
    pub fn set_label(&self, change: LabelChange) -> JoinHandle<LabelOutcome> {
        self.reconciler.set_label(change)
    }

    /// Labels a job of the predicted collection.
    pub fn set_predicted_label(&self, change: LabelChange) -> JoinHandle<LabelOutcome> {
        self.predicted.set_label(change)
    }

    fn apply_import(
        &self,
        imported: std::result::Result<ImportedCollection, DecodeError>,
    ) -> Result<ImportSummary> {
        let collection = match imported {
            Ok(collection) => collection,
            Err(error) => {
                self.notifier.send(Notification::decode_failed(&error));
                return Err(error.into());
            }
        };

        // Supersedes any fetch still in flight.
        self.next_generation();

        let summary = ImportSummary {
            records: collection.records.len(),
            skipped_rows: collection.skipped_rows,
            dropped_labels: collection.dropped_labels,
        };
        self.store().replace(
            RecordStore::from_records(collection.records).with_columns(collection.columns),
        );
        {
            let mut state = self.lock_state();
            state.source = CollectionSource::Imported;
            state.counts = None;
            state.cursor.set_total_count(summary.records as u64);
            state.cursor.set_page(1);
        }

        self.notifier
            .send(Notification::status(format!("Imported {} jobs", summary.records)));
        Ok(summary)
    }

    /// Replaces the collection with a features CSV, merged with a labels CSV
    /// when one is given. On a decode error the store is left unchanged and
    /// the error is published.
    pub fn import_csv(&self, features: &Path, labels: Option<&Path>) -> Result<ImportSummary> {
        self.apply_import(csv_io::import_files(features, labels))
    }

    /// Like [`import_csv`](Self::import_csv), picking up a `labels.csv` that
    /// sits next to `features`.
    pub fn import_csv_with_sibling_labels(&self, features: &Path) -> Result<ImportSummary> {
        self.apply_import(csv_io::import_with_sibling_labels(features))
    }

    pub fn export(&self, columns: Option<&[String]>, mode: ExportMode) -> ExportTable {
        csv_io::export_rows(&self.store().snapshot(), columns, mode)
    }

    /// Writes an export to `path`. Returns the number of rows written.
    pub fn export_to_path(
        &self,
        path: &Path,
        columns: Option<&[String]>,
        mode: ExportMode,
    ) -> Result<usize> {
        let table = self.export(columns, mode);
        csv_io::write_table_to_path(path, &table)?;
        Ok(table.rows.len())
    }

    /// Writes `id,label` for every labelled job to `<dir>/labels.csv`.
    pub fn save_labels(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(LABELS_FILE_NAME);
        self.export_to_path(&path, None, ExportMode::LabelsOnly)?;
        Ok(path)
    }

    /// Runs a prediction and replaces the predicted collection with its
    /// result. Returns the number of predicted jobs.
    pub async fn predict(&self, request: &PredictRequest) -> Result<usize> {
        let batch = self
            .service
            .predict(request)
            .await
            .map_err(|e| self.report_remote(e))?;

        let count = batch.records.len();
        self.predicted_store()
            .replace(RecordStore::from_records(batch.records).with_columns(batch.fields));
        self.lock_state().report = Some(batch.report);
        Ok(count)
    }

    /// Predicted jobs, best predictions first.
    pub fn predicted_records(&self) -> Vec<Arc<JobRecord>> {
        let mut records: Vec<Arc<JobRecord>> =
            self.predicted_store().snapshot().iter().cloned().collect();
        sort_records(&mut records, &ByPredictedRank);
        records
    }

    pub async fn train(&self, request: &TrainRequest) -> Result<TrainReport> {
        self.service
            .train(request)
            .await
            .map_err(|e| self.report_remote(e))
    }

    /// Asks the backend to download new jobs, then reloads the current page
    /// and the count.
    pub async fn refill(&self) -> Result<FetchOutcome> {
        let message = self
            .service
            .refill()
            .await
            .map_err(|e| self.report_remote(e))?;
        log::info!("Refill finished: {}", message);

        let outcome = self.load_page().await?;
        self.refresh_count().await?;
        Ok(outcome)
    }
}

impl std::fmt::Debug for ReviewSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReviewSession")
            .field("environment", &self.config.environment)
            .field("source", &self.source())
            .finish_non_exhaustive()
    }
}
