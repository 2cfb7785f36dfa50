//! Remote job service: the label store, prediction and training backend.

mod http;
mod types;

use async_trait::async_trait;

use crate::category::Category;
use crate::error::RemoteError;
use crate::filter::FilterState;
use crate::record::JobId;

pub use http::HttpJobService;
pub use types::{
    json_to_row, CategoryCounts, Classifier, JobPage, JobQuery, PredictRequest, PredictionBatch,
    TrainReport, TrainRequest,
};

/// Operations the review engine needs from the backend.
///
/// Every call is independent; nothing is retried.
#[async_trait]
pub trait JobService: Send + Sync {
    /// One page of jobs whose label is enabled in the query's filter.
    async fn list_jobs(&self, query: &JobQuery) -> Result<JobPage, RemoteError>;

    async fn count_jobs(&self, filter: &FilterState) -> Result<CategoryCounts, RemoteError>;

    /// Persists one label. Succeeds only when the service acknowledges it.
    async fn update_label(&self, id: &JobId, label: Category) -> Result<(), RemoteError>;

    async fn predict(&self, request: &PredictRequest) -> Result<PredictionBatch, RemoteError>;

    async fn train(&self, request: &TrainRequest) -> Result<TrainReport, RemoteError>;

    /// Asks the backend to download fresh jobs. Returns its status message.
    async fn refill(&self) -> Result<String, RemoteError>;
}
