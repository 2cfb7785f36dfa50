//! Record ordering.
//!
//! Orderings are pluggable through [`RecordOrdering`]; closures work too.
//! [`sort_records`] always uses a stable sort so records that compare equal
//! keep their relative order across repeated sorts.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::record::JobRecord;

/// A total order over job records.
pub trait RecordOrdering: Send + Sync {
    fn compare(&self, a: &JobRecord, b: &JobRecord) -> Ordering;
}

impl<F> RecordOrdering for F
where
    F: Fn(&JobRecord, &JobRecord) -> Ordering + Send + Sync,
{
    fn compare(&self, a: &JobRecord, b: &JobRecord) -> Ordering {
        self(a, b)
    }
}

/// Most recent `date_created` first.
///
/// Parsed timestamps compare chronologically; when either side does not
/// parse, the raw strings are compared. Records without a date sort last.
#[derive(Debug, Clone, Copy, Default)]
pub struct ByDateDesc;

impl RecordOrdering for ByDateDesc {
    fn compare(&self, a: &JobRecord, b: &JobRecord) -> Ordering {
        match (a.date_created.as_deref(), b.date_created.as_deref()) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(raw_a), Some(raw_b)) => match (a.created_at(), b.created_at()) {
                (Some(ta), Some(tb)) => tb.cmp(&ta),
                _ => raw_b.cmp(raw_a),
            },
        }
    }
}

/// Predicted category rank first (`Good` > `Maybe` > `Bad` > `Irrelevant`),
/// then [`ByDateDesc`] within a rank. Records without a prediction sort
/// after every ranked record.
#[derive(Debug, Clone, Copy, Default)]
pub struct ByPredictedRank;

impl ByPredictedRank {
    fn rank(record: &JobRecord) -> u8 {
        record
            .predicted
            .as_ref()
            .and_then(|p| p.category)
            .map(|c| c.rank())
            .unwrap_or(u8::MAX)
    }
}

impl RecordOrdering for ByPredictedRank {
    fn compare(&self, a: &JobRecord, b: &JobRecord) -> Ordering {
        Self::rank(a)
            .cmp(&Self::rank(b))
            .then_with(|| ByDateDesc.compare(a, b))
    }
}

/// Configurable choice of built-in ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingKind {
    #[default]
    DateDesc,
    PredictedRank,
}

impl OrderingKind {
    pub fn comparator(&self) -> Arc<dyn RecordOrdering> {
        match self {
            OrderingKind::DateDesc => Arc::new(ByDateDesc),
            OrderingKind::PredictedRank => Arc::new(ByPredictedRank),
        }
    }
}

/// Stable sort by `ordering`.
pub fn sort_records(records: &mut [Arc<JobRecord>], ordering: &dyn RecordOrdering) {
    records.sort_by(|a, b| ordering.compare(a, b));
}
