use tokio::sync::broadcast::{self, error::RecvError};

use crate::dataset::Dataset;

const CHANNEL_CAPACITY: usize = 32;

/// One-way "reload dataset X" signal shared by every table and any other
/// collaborator that mutates records.
#[derive(Clone)]
pub struct RefreshBus {
    tx: broadcast::Sender<Dataset>,
}

impl Default for RefreshBus {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Returns how many subscribers were listening.
    pub fn publish(&self, dataset: Dataset) -> usize {
        let listeners = self.tx.send(dataset).unwrap_or(0);
        tracing::debug!(dataset = %dataset, listeners, "refresh_published");
        listeners
    }

    pub fn subscribe(&self, dataset: Dataset) -> RefreshSubscription {
        RefreshSubscription {
            dataset,
            rx: self.tx.subscribe(),
        }
    }
}

pub struct RefreshSubscription {
    dataset: Dataset,
    rx: broadcast::Receiver<Dataset>,
}

impl RefreshSubscription {
    pub fn dataset(&self) -> Dataset {
        self.dataset
    }

    /// Follow a different dataset. Signals queued for the old key are dropped.
    pub fn rekey(&mut self, dataset: Dataset) {
        self.dataset = dataset;
        self.rx = self.rx.resubscribe();
    }

    /// Wait for the next signal for this subscription's dataset. Pends forever
    /// once the bus is gone.
    pub async fn recv(&mut self) -> Dataset {
        loop {
            match self.rx.recv().await {
                Ok(dataset) if dataset == self.dataset => return dataset,
                Ok(_) => continue,
                // Missed signals collapse into one refresh.
                Err(RecvError::Lagged(_)) => return self.dataset,
                Err(RecvError::Closed) => std::future::pending::<()>().await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn only_matching_dataset_is_delivered() {
        let bus = RefreshBus::new();
        let mut sub = bus.subscribe(Dataset::Occurrence);
        bus.publish(Dataset::Integration);
        bus.publish(Dataset::Occurrence);
        assert_eq!(sub.recv().await, Dataset::Occurrence);
        let next = tokio::time::timeout(Duration::from_millis(20), sub.recv()).await;
        assert!(next.is_err());
    }

    #[tokio::test]
    async fn rekey_drops_pending_signals() {
        let bus = RefreshBus::new();
        let mut sub = bus.subscribe(Dataset::Integration);
        bus.publish(Dataset::Integration);
        sub.rekey(Dataset::Occurrence);
        bus.publish(Dataset::Occurrence);
        assert_eq!(sub.recv().await, Dataset::Occurrence);
        assert_eq!(sub.dataset(), Dataset::Occurrence);
    }

    #[test]
    fn publish_without_listeners_is_harmless() {
        assert_eq!(RefreshBus::new().publish(Dataset::Integration), 0);
    }
}
