//! reqwest-backed [`JobService`] speaking the job service's JSON API.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tracing::{info_span, Instrument};

use super::types::{
    json_to_row, CategoryCounts, JobPage, JobQuery, PredictRequest, PredictionBatch, TrainReport,
    TrainRequest,
};
use super::JobService;
use crate::category::Category;
use crate::config::ReviewConfig;
use crate::error::RemoteError;
use crate::filter::FilterState;
use crate::record::{JobId, JobRecord};

/// Status text the service returns for a successful call.
const SUCCESS: &str = "Success";

/// Longest response body kept in an error message.
const MAX_ERROR_BODY_LENGTH: usize = 200;

fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY_LENGTH) {
        Some((cut, _)) => format!("{}... (truncated)", &body[..cut]),
        None => body.to_string(),
    }
}

/// HTTP client for the job service.
///
/// The base URL is fixed at construction; nothing is looked up per request.
#[derive(Debug, Clone)]
pub struct HttpJobService {
    client: Client,
    base_url: String,
}

impl HttpJobService {
    /// Builds a client for the endpoint selected by `config.environment`.
    pub fn new(config: &ReviewConfig) -> Result<Self, RemoteError> {
        Self::with_base_url(
            config.base_url(),
            Duration::from_secs(config.request_timeout_secs),
            Duration::from_secs(config.connect_timeout_secs),
        )
    }

    pub fn with_base_url(
        base_url: &str,
        request_timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(|e| RemoteError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Sends a request and decodes the JSON body of a 2xx response.
    async fn send_json(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<Value, RemoteError> {
        let response = request
            .send()
            .await
            .map_err(|source| RemoteError::Transport { operation, source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Status {
                operation,
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|source| RemoteError::Transport { operation, source })?;
        serde_json::from_str(&text).map_err(|e| RemoteError::Decode {
            operation,
            message: e.to_string(),
        })
    }
}

/// A `msg` that is a string other than `Success` is a server-side failure.
fn check_message(operation: &'static str, body: &Value) -> Result<(), RemoteError> {
    match body.get("msg") {
        Some(Value::String(msg)) if msg != SUCCESS => Err(RemoteError::Rejected {
            operation,
            message: msg.clone(),
        }),
        _ => Ok(()),
    }
}

/// Decodes an array of job rows.
fn decode_rows(
    operation: &'static str,
    rows: Option<&Value>,
) -> Result<(Vec<JobRecord>, Vec<String>, usize), RemoteError> {
    let rows = match rows {
        None | Some(Value::Null) => return Ok((Vec::new(), Vec::new(), 0)),
        Some(Value::Array(rows)) => rows,
        Some(other) => {
            return Err(RemoteError::Decode {
                operation,
                message: format!("expected a list of jobs, got {}", type_name(other)),
            })
        }
    };

    let mut records = Vec::with_capacity(rows.len());
    let mut fields: Vec<String> = Vec::new();
    let mut skipped = 0;

    for value in rows {
        let Some(object) = value.as_object() else {
            skipped += 1;
            continue;
        };
        for key in object.keys() {
            if !fields.contains(key) {
                fields.push(key.clone());
            }
        }
        match JobRecord::from_row(json_to_row(object)) {
            Some(record) => records.push(record),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!("{}: skipped {} rows without an id", operation, skipped);
    }
    Ok((records, fields, skipped))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

impl HttpJobService {
    async fn fetch_page(&self, query: &JobQuery) -> Result<JobPage, RemoteError> {
        const OP: &str = "list_jobs";
        let request = self.client.get(self.url("get_jobs")).query(&[
            ("limit", query.limit.to_string()),
            ("offset", query.offset.to_string()),
            ("filter", query.filter.query_param()),
        ]);
        let body = self.send_json(OP, request).await?;
        check_message(OP, &body)?;

        let (records, collected, skipped_rows) = decode_rows(OP, body.get("data"))?;
        let fields = match body.get("fields").and_then(Value::as_array) {
            Some(names) => names
                .iter()
                .filter_map(|n| n.as_str().map(str::to_string))
                .collect(),
            None => collected,
        };

        debug!("Fetched {} jobs at offset {}", records.len(), query.offset);
        Ok(JobPage {
            records,
            fields,
            skipped_rows,
        })
    }

    async fn fetch_count(&self, filter: &FilterState) -> Result<CategoryCounts, RemoteError> {
        const OP: &str = "count_jobs";
        let request = self
            .client
            .get(self.url("count_jobs"))
            .query(&[("filter", filter.query_param())]);
        let body = self.send_json(OP, request).await?;
        check_message(OP, &body)?;

        let msg = body.get("msg").cloned().unwrap_or(Value::Null);
        serde_json::from_value::<CategoryCounts>(msg).map_err(|e| RemoteError::Decode {
            operation: OP,
            message: e.to_string(),
        })
    }

    async fn store_label(&self, id: &JobId, label: Category) -> Result<(), RemoteError> {
        const OP: &str = "update_label";
        let request = self
            .client
            .get(self.url("update_job"))
            .query(&[("id", id.as_str()), ("label", label.as_str())]);
        let body = self.send_json(OP, request).await?;

        match body.get("msg").and_then(Value::as_str) {
            Some(SUCCESS) => {
                debug!("Label {} stored for job {}", label, id);
                Ok(())
            }
            Some(other) => Err(RemoteError::Rejected {
                operation: OP,
                message: other.to_string(),
            }),
            None => Err(RemoteError::Decode {
                operation: OP,
                message: "response has no status message".to_string(),
            }),
        }
    }

    async fn run_prediction(&self, request: &PredictRequest) -> Result<PredictionBatch, RemoteError> {
        const OP: &str = "predict";
        let http = self.client.post(self.url("predict")).json(request);
        let body = self.send_json(OP, http).await?;
        check_message(OP, &body)?;

        let (records, fields, _) = decode_rows(OP, body.get("msg"))?;
        let report = match body.get("report") {
            Some(Value::String(report)) => report.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };

        debug!("Received {} predicted jobs", records.len());
        Ok(PredictionBatch {
            records,
            fields,
            report,
        })
    }

    async fn run_training(&self, request: &TrainRequest) -> Result<TrainReport, RemoteError> {
        const OP: &str = "train";
        let classifier = request.classifier.as_str();
        let http = self.client.post(self.url("train")).json(request);
        let body = self.send_json(OP, http).await?;
        check_message(OP, &body)?;

        let result = body
            .get("results")
            .and_then(|results| results.get(classifier))
            .cloned()
            .ok_or_else(|| RemoteError::Decode {
                operation: OP,
                message: format!("no results for classifier {}", classifier),
            })?;
        serde_json::from_value::<TrainReport>(result).map_err(|e| RemoteError::Decode {
            operation: OP,
            message: e.to_string(),
        })
    }

    async fn trigger_download(&self) -> Result<String, RemoteError> {
        const OP: &str = "refill";
        let body = self.send_json(OP, self.client.post(self.url("download"))).await?;
        Ok(match body.get("msg") {
            Some(Value::String(msg)) => msg.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        })
    }
}

#[async_trait]
impl JobService for HttpJobService {
    async fn list_jobs(&self, query: &JobQuery) -> Result<JobPage, RemoteError> {
        let span = info_span!(
            "remote",
            operation = "list_jobs",
            limit = query.limit,
            offset = query.offset
        );
        self.fetch_page(query).instrument(span).await
    }

    async fn count_jobs(&self, filter: &FilterState) -> Result<CategoryCounts, RemoteError> {
        self.fetch_count(filter)
            .instrument(info_span!("remote", operation = "count_jobs"))
            .await
    }

    async fn update_label(&self, id: &JobId, label: Category) -> Result<(), RemoteError> {
        self.store_label(id, label)
            .instrument(info_span!("remote", operation = "update_label", job_id = %id))
            .await
    }

    async fn predict(&self, request: &PredictRequest) -> Result<PredictionBatch, RemoteError> {
        self.run_prediction(request)
            .instrument(info_span!("remote", operation = "predict", retrain = request.retrain))
            .await
    }

    async fn train(&self, request: &TrainRequest) -> Result<TrainReport, RemoteError> {
        let classifier = request.classifier.as_str();
        self.run_training(request)
            .instrument(info_span!("remote", operation = "train", classifier))
            .await
    }

    async fn refill(&self) -> Result<String, RemoteError> {
        self.trigger_download()
            .instrument(info_span!("remote", operation = "refill"))
            .await
    }
}
