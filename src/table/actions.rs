use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::Arc,
};

use tokio::{sync::mpsc::UnboundedSender, task::JoinHandle};

use super::{TableEvent, event::CompletionGuard};
use crate::{
    api::{Record, RecordsBackend},
    dataset::Dataset,
};

/// `dataset:record_id`; at most one action per key runs at a time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BusyKey(String);

impl BusyKey {
    pub fn new(dataset: Dataset, record_id: &str) -> Self {
        Self(format!("{}:{}", dataset.id(), record_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BusyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sent to whoever owns record editing; this crate does no network work for it.
#[derive(Debug, Clone, PartialEq)]
pub struct EditRequest {
    pub dataset: Dataset,
    pub record: Record,
}

/// A delete the user still has to confirm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteConfirmation {
    pub dataset: Dataset,
    pub record_id: String,
    pub summary: String,
}

impl DeleteConfirmation {
    pub fn busy_key(&self) -> BusyKey {
        BusyKey::new(self.dataset, &self.record_id)
    }
}

pub struct RowActionController {
    busy: HashSet<BusyKey>,
    tasks: HashMap<BusyKey, JoinHandle<()>>,
    edit_tx: UnboundedSender<EditRequest>,
}

impl RowActionController {
    pub fn new(edit_tx: UnboundedSender<EditRequest>) -> Self {
        Self {
            busy: HashSet::new(),
            tasks: HashMap::new(),
            edit_tx,
        }
    }

    pub fn is_busy(&self, key: &BusyKey) -> bool {
        self.busy.contains(key)
    }

    pub fn busy_count(&self) -> usize {
        self.busy.len()
    }

    pub fn edit(&self, dataset: Dataset, record: &Record) -> bool {
        let sent = self
            .edit_tx
            .send(EditRequest {
                dataset,
                record: record.clone(),
            })
            .is_ok();
        tracing::debug!(dataset = %dataset, record_id = ?record.id(), sent, "edit_requested");
        sent
    }

    /// First step of a delete. `None` when the record has no id or already
    /// has an action running.
    pub fn request_delete(&self, dataset: Dataset, record: &Record) -> Option<DeleteConfirmation> {
        let record_id = record.id()?;
        if self.is_busy(&BusyKey::new(dataset, &record_id)) {
            return None;
        }
        let mut lines = vec![format!("id={record_id}")];
        for key in ["matricula", "nome"] {
            if let Some(value) = record.text(key) {
                lines.push(format!("{key}={value}"));
            }
        }
        Some(DeleteConfirmation {
            dataset,
            record_id,
            summary: lines.join("\n"),
        })
    }

    /// Issue a confirmed delete. A second call for a busy key does nothing.
    pub fn delete(
        &mut self,
        backend: Arc<dyn RecordsBackend>,
        confirmation: DeleteConfirmation,
        tx: &UnboundedSender<TableEvent>,
    ) -> bool {
        let key = confirmation.busy_key();
        if !self.busy.insert(key.clone()) {
            tracing::debug!(key = %key, "delete_ignored_busy");
            return false;
        }
        tracing::debug!(key = %key, "delete_start");
        let DeleteConfirmation {
            dataset, record_id, ..
        } = confirmation;
        let guard_key = key.clone();
        let guard_id = record_id.clone();
        let guard = CompletionGuard::new(tx.clone(), move |result| TableEvent::DeleteFinished {
            key: guard_key,
            dataset,
            record_id: guard_id,
            result,
        });
        let task = tokio::spawn(async move {
            let result = backend.delete(dataset, &record_id).await;
            guard.complete(result);
        });
        self.tasks.insert(key, task);
        true
    }

    /// Clear the busy flag for `key`. Returns whether it was set.
    pub fn release(&mut self, key: &BusyKey) -> bool {
        self.tasks.remove(key);
        self.busy.remove(key)
    }

    pub fn cancel_all(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
        self.busy.clear();
    }
}

impl Drop for RowActionController {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio::sync::mpsc::unbounded_channel;

    use super::*;

    fn record(value: serde_json::Value) -> Record {
        Record::try_from(value).expect("object")
    }

    #[test]
    fn busy_key_is_scoped_by_dataset() {
        assert_eq!(BusyKey::new(Dataset::Integration, "42").as_str(), "integration:42");
        assert_ne!(
            BusyKey::new(Dataset::Integration, "42"),
            BusyKey::new(Dataset::Occurrence, "42")
        );
    }

    #[test]
    fn delete_needs_a_record_id() {
        let (edit_tx, _edit_rx) = unbounded_channel();
        let actions = RowActionController::new(edit_tx);
        assert!(
            actions
                .request_delete(Dataset::Integration, &record(json!({"nome": "Ana"})))
                .is_none()
        );
        let confirmation = actions
            .request_delete(
                Dataset::Occurrence,
                &record(json!({"id": 42, "matricula": "M0042", "nome": "Ana"})),
            )
            .expect("confirmation");
        assert_eq!(confirmation.record_id, "42");
        assert_eq!(confirmation.summary, "id=42\nmatricula=M0042\nnome=Ana");
        assert_eq!(confirmation.busy_key().as_str(), "occurrence:42");
    }

    #[test]
    fn release_reports_whether_key_was_busy() {
        let (edit_tx, _edit_rx) = unbounded_channel();
        let mut actions = RowActionController::new(edit_tx);
        let key = BusyKey::new(Dataset::Integration, "7");
        actions.busy.insert(key.clone());
        assert!(actions.is_busy(&key));
        assert!(actions.release(&key));
        assert!(!actions.release(&key));
        assert_eq!(actions.busy_count(), 0);
    }
}
