//! Optimistic label updates against the remote label store.
//!
//! A label change is applied to the local store synchronously, before any
//! network traffic, and then acknowledged remotely in a spawned task. Changes
//! to the same job are applied locally in call order and numbered per job.
//! A rollback only touches the record its own change wrote, so it never
//! undoes a newer change or a freshly loaded collection. Server responses
//! never write to the label.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::category::Category;
use crate::config::FailurePolicy;
use crate::error::RemoteError;
use crate::notify::{Notification, Notifier};
use crate::record::{JobField, JobId, JobRecord};
use crate::remote::JobService;
use crate::store::SharedStore;

/// A reviewer's decision for one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelChange {
    pub id: JobId,
    pub label: Category,
}

impl LabelChange {
    pub fn new(id: JobId, label: Category) -> Self {
        Self { id, label }
    }

    /// Builds a change from raw input. Blank ids and unknown labels yield
    /// `None`.
    pub fn parse(id: &str, label: &str) -> Option<Self> {
        Some(Self {
            id: JobId::new(id)?,
            label: Category::parse(label)?,
        })
    }
}

/// How a label change ended.
#[derive(Debug)]
pub enum LabelOutcome {
    /// The label store accepted the change.
    Acknowledged,
    /// No job with that id is loaded. Nothing was changed or sent.
    UnknownRecord,
    /// The label store did not accept the change. The failure has been
    /// published on the notifier.
    Failed {
        error: RemoteError,
        /// True when the local label was reverted.
        rolled_back: bool,
    },
}

impl LabelOutcome {
    pub fn is_acknowledged(&self) -> bool {
        matches!(self, LabelOutcome::Acknowledged)
    }
}

/// What a failed change restores.
#[derive(Debug, Clone)]
struct Undo {
    previous_label: Option<String>,
    /// Generation that wrote `previous_label`; 0 for loaded data.
    previous_writer: u64,
}

/// Per-job bookkeeping for label writes made by the reconciler.
#[derive(Debug, Default)]
struct LabelHistory {
    generation: u64,
    /// Generation whose label the store currently holds.
    writer: u64,
    /// Record produced by that write.
    written: Option<Arc<JobRecord>>,
    /// Changes that failed while a newer change held the record. A later
    /// rollback to one of them continues to what it replaced.
    failed: HashMap<u64, Undo>,
}

/// A locally applied change waiting for remote acknowledgement.
struct Pending {
    change: LabelChange,
    generation: u64,
    undo: Undo,
}

#[derive(Clone)]
pub struct LabelReconciler {
    store: SharedStore,
    service: Arc<dyn JobService>,
    notifier: Notifier,
    policy: FailurePolicy,
    histories: Arc<Mutex<HashMap<JobId, LabelHistory>>>,
}

impl LabelReconciler {
    pub fn new(
        store: SharedStore,
        service: Arc<dyn JobService>,
        notifier: Notifier,
        policy: FailurePolicy,
    ) -> Self {
        Self {
            store,
            service,
            notifier,
            policy,
            histories: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    fn lock_histories(&self) -> MutexGuard<'_, HashMap<JobId, LabelHistory>> {
        match self.histories.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Label history lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Applies `change` locally and starts the remote update.
    ///
    /// The store already reflects the change when this returns. The handle
    /// resolves once the label store has answered. Must be called from
    /// within a Tokio runtime.
    pub fn set_label(&self, change: LabelChange) -> JoinHandle<LabelOutcome> {
        let pending = self.apply_local(change);
        let reconciler = self.clone();
        tokio::spawn(async move {
            match pending {
                Some(pending) => reconciler.acknowledge(pending).await,
                None => LabelOutcome::UnknownRecord,
            }
        })
    }

    /// Like [`set_label`](Self::set_label) but waits for the remote answer in
    /// the current task.
    pub async fn set_label_and_wait(&self, change: LabelChange) -> LabelOutcome {
        match self.apply_local(change) {
            Some(pending) => self.acknowledge(pending).await,
            None => LabelOutcome::UnknownRecord,
        }
    }

    fn apply_local(&self, change: LabelChange) -> Option<Pending> {
        // Held across the store update so call order and generation order agree.
        let mut histories = self.lock_histories();

        let Some(update) = self.store.update_field(
            change.id.as_str(),
            &JobField::Label,
            Some(change.label.as_str().to_string()),
        ) else {
            log::debug!("set_label: job {} is not loaded, ignoring", change.id);
            return None;
        };

        let history = histories.entry(change.id.clone()).or_default();
        let ours = history
            .written
            .as_ref()
            .is_some_and(|written| Arc::ptr_eq(written, &update.previous));
        if !ours {
            // The record came from a load, not from an earlier change.
            history.writer = 0;
            history.failed.clear();
        }

        history.generation += 1;
        let undo = Undo {
            previous_label: update.previous.label.clone(),
            previous_writer: history.writer,
        };
        history.writer = history.generation;
        history.written = Some(update.current);
        log::debug!(
            "Job {} labelled {} locally (generation {})",
            change.id,
            change.label,
            history.generation
        );

        Some(Pending {
            generation: history.generation,
            undo,
            change,
        })
    }

    async fn acknowledge(&self, pending: Pending) -> LabelOutcome {
        let Pending {
            change,
            generation,
            undo,
        } = pending;

        let error = match self.service.update_label(&change.id, change.label).await {
            Ok(()) => {
                if let Some(history) = self.lock_histories().get_mut(&change.id) {
                    history.failed.retain(|older, _| *older > generation);
                }
                return LabelOutcome::Acknowledged;
            }
            Err(error) => error,
        };

        self.notifier.send(Notification::label_update_failed(
            change.id.as_str(),
            change.label.as_str(),
            &error,
        ));

        let rolled_back = match self.policy {
            FailurePolicy::KeepOptimistic => false,
            FailurePolicy::Rollback => self.roll_back(&change.id, generation, undo),
        };

        LabelOutcome::Failed { error, rolled_back }
    }

    /// Restores the label `generation` replaced, provided the store still
    /// holds the record that change wrote.
    fn roll_back(&self, id: &JobId, generation: u64, undo: Undo) -> bool {
        let mut histories = self.lock_histories();
        let Some(history) = histories.get_mut(id) else {
            return false;
        };

        if history.writer != generation {
            log::debug!(
                "Not reverting job {}: superseded by a newer label change",
                id
            );
            history.failed.insert(generation, undo);
            return false;
        }
        let Some(written) = history.written.clone() else {
            return false;
        };

        let mut target = undo;
        while let Some(older) = history.failed.remove(&target.previous_writer) {
            target = older;
        }

        let Some(update) = self.store.update_field_if_current(
            id.as_str(),
            &JobField::Label,
            target.previous_label,
            &written,
        ) else {
            log::debug!("Not reverting job {}: record was reloaded", id);
            history.writer = 0;
            history.written = None;
            history.failed.clear();
            return false;
        };
        history.writer = target.previous_writer;
        history.written = Some(update.current);
        drop(histories);

        self.notifier.send(Notification::rolled_back(id.as_str()));
        true
    }
}

impl std::fmt::Debug for LabelReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LabelReconciler")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
