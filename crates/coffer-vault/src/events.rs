// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Change notifications published to subscribers of the vault.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::cache::CacheDiff;
use crate::model::{
    BoxInfo, DataStorageConfigInfo, DataStorageInfo, EntryInfo, SessionSummary, TemplateInfo,
    VisibilityGroupInfo,
};

/// Default capacity of the broadcast channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// A committed state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum VaultEvent {
    AccountStorageChanged { present: bool },
    SessionChanged(Option<SessionSummary>),
    OpenVisibilityGroupsChanged(CacheDiff<VisibilityGroupInfo>),
    AvailableDataStorageConfigsChanged(CacheDiff<DataStorageConfigInfo>),
    InitialisedDataStoragesChanged(CacheDiff<DataStorageInfo>),
    DataStorageOpenChanged { id: Uuid, open: bool },
    AvailableBoxesChanged(CacheDiff<BoxInfo>),
    AvailableTemplatesChanged(CacheDiff<TemplateInfo>),
    AvailableEntriesChanged(CacheDiff<EntryInfo>),
}

/// Events queued during one transition, published when it completes.
pub struct EventQueue {
    tx: broadcast::Sender<VaultEvent>,
    pending: Vec<VaultEvent>,
}

impl EventQueue {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            pending: Vec::new(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<VaultEvent> {
        self.tx.subscribe()
    }

    pub fn queue(&mut self, event: VaultEvent) {
        self.pending.push(event);
    }

    /// Publish every queued event in order.
    pub fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        debug!(count = self.pending.len(), "publishing vault events");
        for event in self.pending.drain(..) {
            // No receivers is not an error.
            let _ = self.tx.send(event);
        }
    }

    #[cfg(test)]
    pub(crate) fn take_pending(&mut self) -> Vec<VaultEvent> {
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn flush_publishes_in_queue_order() {
        let mut queue = EventQueue::new(8);
        let mut rx = queue.subscribe();

        queue.queue(VaultEvent::AccountStorageChanged { present: true });
        queue.queue(VaultEvent::SessionChanged(None));
        assert!(rx.try_recv().is_err());

        queue.flush();
        assert_eq!(
            rx.recv().await.unwrap(),
            VaultEvent::AccountStorageChanged { present: true }
        );
        assert_eq!(rx.recv().await.unwrap(), VaultEvent::SessionChanged(None));
    }

    #[test]
    fn flush_without_subscribers_drops_events() {
        let mut queue = EventQueue::new(8);
        queue.queue(VaultEvent::SessionChanged(None));
        queue.flush();
        assert!(queue.take_pending().is_empty());
    }

    #[test]
    fn events_serialize_with_tag() {
        let json = serde_json::to_value(VaultEvent::DataStorageOpenChanged {
            id: Uuid::nil(),
            open: true,
        })
        .unwrap();
        assert_eq!(json["event"], "data_storage_open_changed");
        assert_eq!(json["data"]["open"], true);
    }
}
