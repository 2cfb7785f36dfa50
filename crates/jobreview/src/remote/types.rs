//! Request and response types of the job service.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::category::Category;
use crate::filter::FilterState;
use crate::record::{JobRecord, Row};

/// One page of jobs to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobQuery {
    pub limit: u32,
    pub offset: u64,
    pub filter: FilterState,
}

/// A fetched page of jobs.
#[derive(Debug, Clone, Default)]
pub struct JobPage {
    pub records: Vec<JobRecord>,
    /// Field names reported by the service, or collected from the rows.
    pub fields: Vec<String>,
    /// Rows dropped because they had no id.
    pub skipped_rows: usize,
}

/// Count of jobs matching a filter.
///
/// The service reports either one number or a per-key breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CategoryCounts {
    Total(u64),
    PerCategory(BTreeMap<String, u64>),
}

impl CategoryCounts {
    pub fn total(&self) -> u64 {
        match self {
            CategoryCounts::Total(n) => *n,
            CategoryCounts::PerCategory(counts) => counts.values().sum(),
        }
    }

    /// Sum over the keys `filter` enables. A plain total is returned as-is.
    pub fn visible_total(&self, filter: &FilterState) -> u64 {
        match self {
            CategoryCounts::Total(n) => *n,
            CategoryCounts::PerCategory(counts) => counts
                .iter()
                .filter(|(key, _)| filter.get(&key.to_lowercase()).unwrap_or(false))
                .map(|(_, n)| *n)
                .sum(),
        }
    }

    pub fn get(&self, category: Category) -> Option<u64> {
        match self {
            CategoryCounts::Total(_) => None,
            CategoryCounts::PerCategory(counts) => counts
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(category.key()))
                .map(|(_, n)| *n),
        }
    }
}

/// Parameters of a prediction run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PredictRequest {
    /// Retrain the model before predicting. Sent as `"true"`/`"false"`.
    #[serde(serialize_with = "bool_as_string")]
    pub retrain: bool,
    /// How many days back to look for unlabelled jobs.
    pub window: u32,
    /// Maximum number of jobs to predict.
    pub to_predict: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl Default for PredictRequest {
    fn default() -> Self {
        Self {
            retrain: false,
            window: 2,
            to_predict: 20,
            search: None,
        }
    }
}

fn bool_as_string<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(if *value { "true" } else { "false" })
}

/// Predicted jobs plus the classifier's text report.
#[derive(Debug, Clone, Default)]
pub struct PredictionBatch {
    pub records: Vec<JobRecord>,
    pub fields: Vec<String>,
    pub report: String,
}

/// Classifier families the training endpoint accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classifier {
    #[default]
    #[serde(rename = "SVC")]
    Svc,
    LogisticRegression,
    GradientBoostingClassifier,
    VotingClassifier,
}

impl Classifier {
    pub const ALL: [Classifier; 4] = [
        Classifier::Svc,
        Classifier::LogisticRegression,
        Classifier::GradientBoostingClassifier,
        Classifier::VotingClassifier,
    ];

    /// Name used on the wire and as the key of the training results.
    pub fn as_str(&self) -> &'static str {
        match self {
            Classifier::Svc => "SVC",
            Classifier::LogisticRegression => "LogisticRegression",
            Classifier::GradientBoostingClassifier => "GradientBoostingClassifier",
            Classifier::VotingClassifier => "VotingClassifier",
        }
    }
}

impl std::fmt::Display for Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrainRequest {
    pub search: bool,
    pub classifier: Classifier,
}

/// Training results for one classifier. Image payloads are base64 and passed
/// through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainReport {
    #[serde(default)]
    pub pr_rec_im: Option<String>,
    #[serde(default)]
    pub conf_matrix_im: Option<String>,
    /// Any other result fields.
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

/// Flattens a JSON object into a row. Strings are taken as-is, other scalars
/// are stringified, `null` means absent. Nested values keep their JSON text.
pub fn json_to_row(object: &serde_json::Map<String, Value>) -> Row {
    object
        .iter()
        .filter_map(|(key, value)| {
            let text = match value {
                Value::Null => return None,
                Value::String(s) => s.clone(),
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                other => other.to_string(),
            };
            Some((key.clone(), text))
        })
        .collect()
}
