use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::mpsc;

use folio_search::config::AppConfig;
use folio_search::content::{ContentStore, SqliteContentStore};
use folio_search::events::{EventBus, SearchEvent, EVENT_QUEUE_CAPACITY};
use folio_search::search::{ContentSelector, ProviderState, QueryEngine};
use folio_search::sync::{IndexSynchronizer, JobLedger};

/// Shared application state / 共享应用状态
pub struct AppState {
    pub engine: QueryEngine,
    pub synchronizer: Arc<IndexSynchronizer>,
    pub events: EventBus,
}

impl AppState {
    /// Wire the services from a resolved config snapshot / 根据配置装配服务
    ///
    /// Returns the receiving end of the event bus for the listener task.
    pub fn build(db: SqlitePool, config: &AppConfig) -> (Arc<Self>, mpsc::Receiver<SearchEvent>) {
        let store: Arc<dyn ContentStore> = Arc::new(SqliteContentStore::new(db.clone()));
        let provider = ProviderState::from_config(&config.search);
        tracing::info!("External search provider: {:?}", provider);

        let synchronizer = Arc::new(IndexSynchronizer::new(
            ContentSelector::new(store.clone()),
            provider.clone(),
            JobLedger::new(db),
            &config.search,
            &config.sync,
        ));
        let engine = QueryEngine::new(store, provider);
        let (events, rx) = EventBus::channel(EVENT_QUEUE_CAPACITY);

        let state = Arc::new(Self {
            engine,
            synchronizer,
            events,
        });
        (state, rx)
    }
}
