//! Job records and their column mapping.

use std::borrow::Borrow;
use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::category::Category;

pub const ID_COLUMN: &str = "id";
pub const TITLE_COLUMN: &str = "title";
pub const SNIPPET_COLUMN: &str = "snippet";
pub const JOB_TYPE_COLUMN: &str = "job_type";
pub const BUDGET_COLUMN: &str = "budget";
pub const DATE_CREATED_COLUMN: &str = "date_created";
pub const LABEL_COLUMN: &str = "label";
pub const PREDICTED_COLUMN: &str = "predicted";

/// A flat row: column header to string value.
pub type Row = BTreeMap<String, String>;

/// Stable, externally assigned job identifier. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Returns `None` for blank identifiers.
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.len() == id.len() {
            Some(Self(id))
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for JobId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A mutable field of a record. `id` and the prediction columns are not
/// representable here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobField {
    Title,
    Snippet,
    JobType,
    Budget,
    DateCreated,
    Label,
    Other(String),
}

impl JobField {
    /// Maps a column header to a field. Returns `None` for read-only columns.
    pub fn from_column(column: &str) -> Option<JobField> {
        match column {
            ID_COLUMN | PREDICTED_COLUMN => None,
            TITLE_COLUMN => Some(JobField::Title),
            SNIPPET_COLUMN => Some(JobField::Snippet),
            JOB_TYPE_COLUMN => Some(JobField::JobType),
            BUDGET_COLUMN => Some(JobField::Budget),
            DATE_CREATED_COLUMN => Some(JobField::DateCreated),
            LABEL_COLUMN => Some(JobField::Label),
            other if is_score_column(other) => None,
            other => Some(JobField::Other(other.to_string())),
        }
    }
}

fn is_score_column(column: &str) -> bool {
    Category::ALL.iter().any(|c| c.as_str() == column)
}

/// Output of the prediction collaborator. Read-only to this crate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub category: Option<Category>,
    /// Per-category confidence, as percentages.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub scores: BTreeMap<Category, f64>,
}

impl Prediction {
    /// Highest-scoring category. Ties go to the better-ranked category; with
    /// no scores, falls back to the predicted category.
    pub fn best(&self) -> Option<Category> {
        let mut best: Option<(Category, f64)> = None;
        for (category, score) in &self.scores {
            match best {
                Some((_, top)) if *score <= top => {}
                _ => best = Some((*category, *score)),
            }
        }
        best.map(|(c, _)| c).or(self.category)
    }

    fn from_row(row: &Row) -> Option<Prediction> {
        let category = row
            .get(PREDICTED_COLUMN)
            .and_then(|value| Category::parse(value));
        let scores: BTreeMap<Category, f64> = Category::ALL
            .into_iter()
            .filter_map(|c| {
                row.get(c.as_str())
                    .and_then(|v| v.trim().parse::<f64>().ok())
                    .map(|score| (c, score))
            })
            .collect();

        if category.is_none() && scores.is_empty() {
            None
        } else {
            Some(Prediction { category, scores })
        }
    }
}

/// One reviewable job posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub id: JobId,
    pub title: String,
    pub snippet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<String>,
    /// Raw timestamp as delivered; parsed on demand by [`JobRecord::created_at`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_created: Option<String>,
    /// The only field under reviewer control. `None` means uncategorized.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicted: Option<Prediction>,
    /// Columns without a dedicated field, kept for export.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl JobRecord {
    pub fn new(id: JobId) -> Self {
        Self {
            id,
            title: String::new(),
            snippet: String::new(),
            job_type: None,
            budget: None,
            date_created: None,
            label: None,
            predicted: None,
            extra: BTreeMap::new(),
        }
    }

    /// Builds a record from a flat row. Returns `None` when the row has no
    /// usable `id`.
    pub fn from_row(mut row: Row) -> Option<Self> {
        let id = JobId::new(row.remove(ID_COLUMN)?)?;
        let mut record = JobRecord::new(id);
        record.predicted = Prediction::from_row(&row);
        for (column, value) in row {
            if let Some(field) = JobField::from_column(&column) {
                record.set_field(&field, Some(value));
            }
        }
        Some(record)
    }

    /// Sets a field. Empty values clear optional fields.
    pub fn set_field(&mut self, field: &JobField, value: Option<String>) {
        let value = value.filter(|v| !v.is_empty());
        match field {
            JobField::Title => self.title = value.unwrap_or_default(),
            JobField::Snippet => self.snippet = value.unwrap_or_default(),
            JobField::JobType => self.job_type = value,
            JobField::Budget => self.budget = value,
            JobField::DateCreated => self.date_created = value,
            JobField::Label => self.label = value,
            JobField::Other(name) => match value {
                Some(v) => {
                    self.extra.insert(name.clone(), v);
                }
                None => {
                    self.extra.remove(name);
                }
            },
        }
    }

    /// Value of a column for export. Absent values yield `None`.
    pub fn field(&self, column: &str) -> Option<String> {
        match column {
            ID_COLUMN => Some(self.id.to_string()),
            TITLE_COLUMN => Some(self.title.clone()),
            SNIPPET_COLUMN => Some(self.snippet.clone()),
            JOB_TYPE_COLUMN => self.job_type.clone(),
            BUDGET_COLUMN => self.budget.clone(),
            DATE_CREATED_COLUMN => self.date_created.clone(),
            LABEL_COLUMN => self.label.clone(),
            PREDICTED_COLUMN => self
                .predicted
                .as_ref()
                .and_then(|p| p.category)
                .map(|c| c.as_str().to_string()),
            other => {
                let score = Category::parse(other)
                    .filter(|c| c.as_str() == other)
                    .and_then(|c| self.predicted.as_ref()?.scores.get(&c).copied());
                match score {
                    Some(score) => Some(score.to_string()),
                    None => self.extra.get(other).cloned(),
                }
            }
        }
    }

    /// Returns true when the reviewer has assigned a non-blank label.
    pub fn is_labelled(&self) -> bool {
        self.label.as_deref().is_some_and(|l| !l.trim().is_empty())
    }

    /// The label as a known category, if it is one.
    pub fn category(&self) -> Option<Category> {
        self.label.as_deref().and_then(Category::parse)
    }

    /// Parsed creation timestamp. Unparseable values yield `None`.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.date_created.as_deref().and_then(parse_timestamp)
    }
}

/// Parses the timestamp shapes the job service has been seen to emit.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(value, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
