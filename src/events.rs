//! Content lifecycle events / 内容变更事件
//!
//! Every event maps onto the same push trigger; the ledger collapses them per cycle.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use crate::sync::{IndexSynchronizer, SyncOutcome, SyncTrigger};

/// Default queue depth / 默认队列长度
pub const EVENT_QUEUE_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SearchEvent {
    ArticleCreated,
    ArticleUpdated,
    ArticleDeleted,
    NoteCreated,
    NoteUpdated,
    NoteDeleted,
    /// Explicit push signal / 手动推送信号
    PushSearchIndex,
}

impl SearchEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SearchEvent::ArticleCreated => "article.created",
            SearchEvent::ArticleUpdated => "article.updated",
            SearchEvent::ArticleDeleted => "article.deleted",
            SearchEvent::NoteCreated => "note.created",
            SearchEvent::NoteUpdated => "note.updated",
            SearchEvent::NoteDeleted => "note.deleted",
            SearchEvent::PushSearchIndex => "search.push",
        }
    }
}

/// Producer handle given to the content layer / 事件发送端
#[derive(Clone)]
pub struct EventBus {
    tx: mpsc::Sender<SearchEvent>,
}

impl EventBus {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<SearchEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Non-blocking; returns `false` when the event was dropped / 非阻塞发送
    ///
    /// A full queue already holds a pending trigger, so dropping loses nothing.
    pub fn emit(&self, event: SearchEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                tracing::debug!("Search event queue full, dropping {}", event.name());
                false
            }
            Err(TrySendError::Closed(event)) => {
                tracing::warn!("Search event listener stopped, dropping {}", event.name());
                false
            }
        }
    }
}

/// Drain events into guarded pushes until every sender is gone / 事件监听
pub fn spawn_listener(
    mut rx: mpsc::Receiver<SearchEvent>,
    synchronizer: Arc<IndexSynchronizer>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match synchronizer.run_guarded(SyncTrigger::Event(event)).await {
                Ok(SyncOutcome::Completed(report)) => {
                    tracing::debug!(
                        "Push after {} indexed {} units",
                        event.name(),
                        report.unit_count
                    );
                }
                Ok(_) => {}
                Err(e) => tracing::error!("Search push after {} failed: {}", event.name(), e),
            }
        }
        tracing::info!("Search event listener stopped");
    })
}
