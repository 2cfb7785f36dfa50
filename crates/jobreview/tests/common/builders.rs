//! Builder patterns for creating test data programmatically.

#![allow(dead_code)]

use jobreview::config::{EndpointsConfig, Environment, FailurePolicy, ReviewConfig};
use jobreview::{Category, JobId, JobRecord, OrderingKind, Prediction};

/// Builder for creating `ReviewConfig` instances.
pub struct ConfigBuilder {
    config: ReviewConfig,
}

impl ConfigBuilder {
    /// Create a new builder with sensible defaults for testing.
    pub fn new() -> Self {
        Self {
            config: ReviewConfig {
                request_timeout_secs: 5,
                connect_timeout_secs: 5,
                ..ReviewConfig::default()
            },
        }
    }

    /// Point both environments at `url`.
    pub fn endpoint(mut self, url: &str) -> Self {
        self.config.endpoints = EndpointsConfig {
            development: url.to_string(),
            production: url.to_string(),
        };
        self
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.config.environment = environment;
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.config.page_size = page_size;
        self
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.config.failure_policy = policy;
        self
    }

    pub fn ordering(mut self, ordering: OrderingKind) -> Self {
        self.config.ordering = ordering;
        self
    }

    pub fn build(self) -> ReviewConfig {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for creating `JobRecord` instances.
pub struct JobRecordBuilder {
    record: JobRecord,
}

impl JobRecordBuilder {
    pub fn new(id: &str) -> Self {
        let mut record = JobRecord::new(JobId::new(id).expect("test ids are not blank"));
        record.title = format!("Job {}", id);
        Self { record }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.record.title = title.to_string();
        self
    }

    pub fn label(mut self, label: &str) -> Self {
        self.record.label = Some(label.to_string());
        self
    }

    pub fn date_created(mut self, date: &str) -> Self {
        self.record.date_created = Some(date.to_string());
        self
    }

    pub fn predicted(mut self, category: Category) -> Self {
        self.record.predicted = Some(Prediction {
            category: Some(category),
            ..Default::default()
        });
        self
    }

    pub fn extra(mut self, column: &str, value: &str) -> Self {
        self.record
            .extra
            .insert(column.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> JobRecord {
        self.record
    }
}
