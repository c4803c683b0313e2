//! Index synchronizer / 索引同步
//!
//! Builds the full unit set (select → normalize → chunk) and replaces the external index
//! with it. `run_guarded` wraps a push in the once-only ledger so that any number of
//! triggers within one cycle produce a single rebuild.

pub mod ledger;
pub mod status;

use chrono::Utc;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::{SearchProviderConfig, SyncConfig};
use crate::error::{Result, SearchError};
use crate::events::SearchEvent;
use crate::search::provider::{IndexSettings, ProviderState};
use crate::search::schema::IndexedUnit;
use crate::search::{Chunker, ContentSelector};

pub use ledger::JobLedger;
pub use status::{SyncProgress, SyncStatus};

/// Ledger job name of the full index push / 全量推送任务名
pub const PUSH_JOB: &str = "search:push-index";

/// What asked for a push / 推送触发来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    /// Daily cron job / 定时任务
    Scheduled,
    /// Content lifecycle event / 内容变更事件
    Event(SearchEvent),
    /// Explicit administrative push / 管理员手动推送
    Admin,
}

impl SyncTrigger {
    /// Only explicit pushes report a missing provider configuration
    fn surfaces_configuration(&self) -> bool {
        matches!(self, SyncTrigger::Admin)
    }
}

impl fmt::Display for SyncTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncTrigger::Scheduled => f.write_str("scheduled"),
            SyncTrigger::Event(event) => write!(f, "event:{}", event.name()),
            SyncTrigger::Admin => f.write_str("admin"),
        }
    }
}

/// Result of one full push / 单次推送结果
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub document_count: usize,
    pub unit_count: usize,
    /// Store ids of documents skipped because they could not be chunked
    pub degraded: Vec<String>,
}

impl SyncReport {
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SyncOutcome {
    Completed(SyncReport),
    /// Cycle already claimed by another trigger / 本周期已执行或正在执行
    Skipped { cycle: String },
    /// Provider off or incomplete; nothing to do / 外部搜索未启用
    Disabled,
}

/// Units ready to push plus the run report / 待推送单元
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub units: Vec<IndexedUnit>,
    pub report: SyncReport,
}

pub struct IndexSynchronizer {
    selector: ContentSelector,
    chunker: Chunker,
    provider: ProviderState,
    ledger: JobLedger,
    settings: IndexSettings,
    cycle_secs: i64,
    status: Arc<SyncStatus>,
}

impl IndexSynchronizer {
    pub fn new(
        selector: ContentSelector,
        provider: ProviderState,
        ledger: JobLedger,
        search: &SearchProviderConfig,
        sync: &SyncConfig,
    ) -> Self {
        Self {
            selector,
            chunker: Chunker::new(search.max_document_bytes),
            provider,
            ledger,
            settings: IndexSettings {
                attributes_to_highlight: search.highlight_fields.clone(),
            },
            cycle_secs: sync.cycle_secs,
            status: Arc::new(SyncStatus::new()),
        }
    }

    pub fn status(&self) -> Arc<SyncStatus> {
        self.status.clone()
    }

    pub fn ledger(&self) -> &JobLedger {
        &self.ledger
    }

    pub fn provider(&self) -> &ProviderState {
        &self.provider
    }

    /// Select, normalize and chunk every document / 构建全部索引单元
    ///
    /// A document whose overhead alone exceeds the byte ceiling is skipped and reported
    /// as degraded; store failures abort the build.
    pub async fn build_units(&self) -> Result<BuildOutput> {
        let docs = self.selector.select_all().await?;

        let mut units = Vec::with_capacity(docs.len());
        let mut degraded = Vec::new();
        for doc in &docs {
            match self.chunker.split(doc) {
                Ok(split) => units.extend(split),
                Err(e @ SearchError::ChunkingInvariant { .. }) => {
                    warn!("⚠️ Skipping {} {}: {}", doc.kind, doc.id, e);
                    degraded.push(doc.id.clone());
                }
                Err(e) => return Err(e),
            }
        }

        Ok(BuildOutput {
            report: SyncReport {
                document_count: docs.len(),
                unit_count: units.len(),
                degraded,
            },
            units,
        })
    }

    /// One full push without the once-only gate / 执行一次全量推送
    pub async fn sync(&self) -> Result<SyncReport> {
        let provider = self.provider.require()?;
        let output = self.build_units().await?;
        info!(
            "Pushing {} units from {} documents",
            output.report.unit_count, output.report.document_count
        );

        let (replaced, configured) = tokio::join!(
            provider.replace_all_objects(&output.units),
            provider.set_settings(&self.settings)
        );
        replaced?;
        configured?;

        Ok(output.report)
    }

    /// Push at most once per cycle / 每个周期最多执行一次
    pub async fn run_guarded(&self, trigger: SyncTrigger) -> Result<SyncOutcome> {
        if let Err(e) = self.provider.require() {
            if trigger.surfaces_configuration() {
                return Err(e);
            }
            debug!("Search push ({}) skipped: {}", trigger, e);
            return Ok(SyncOutcome::Disabled);
        }

        let cycle = JobLedger::cycle_key(Utc::now(), self.cycle_secs);
        if !self.ledger.try_acquire(PUSH_JOB, &cycle).await? {
            debug!("Search push ({}) already claimed for cycle {}", trigger, cycle);
            return Ok(SyncOutcome::Skipped { cycle });
        }

        info!("🔄 Search push started ({}, cycle {})", trigger, cycle);
        self.status.start(&trigger.to_string(), &cycle);

        match self.sync().await {
            Ok(report) => {
                // a marker left running would block every later cycle
                if let Err(e) = self.ledger.complete(PUSH_JOB, &cycle).await {
                    error!("Failed to mark push done for cycle {}: {}", cycle, e);
                    if let Err(release) = self.ledger.release(PUSH_JOB, &cycle).await {
                        error!("Failed to release push marker for cycle {}: {}", cycle, release);
                    }
                }
                self.status.finish(&report);
                if report.is_degraded() {
                    warn!(
                        "⚠️ Search push finished degraded: {} units, {} documents skipped",
                        report.unit_count,
                        report.degraded.len()
                    );
                } else {
                    info!("✅ Search push finished: {} units", report.unit_count);
                }
                Ok(SyncOutcome::Completed(report))
            }
            Err(e) => {
                if let Err(release) = self.ledger.release(PUSH_JOB, &cycle).await {
                    error!("Failed to release push marker for cycle {}: {}", cycle, release);
                }
                self.status.fail(e.to_string());
                error!("❌ Search push failed ({}): {}", trigger, e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::SqliteContentStore;
    use crate::search::provider::SearchProvider;
    use crate::testing::{self, MemoryProvider, NoteSeed};
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    async fn seeded_store() -> SqliteContentStore {
        let store = testing::store().await;
        let tech = Some(("c1", "Tech", "tech"));
        testing::insert_article(&store, "a1", "First", "hello world", tech).await;
        testing::insert_page(&store, "g1", "About", "about me", None).await;
        testing::insert_note(&store, NoteSeed::new("n1", 1, "Note", "public note")).await;
        testing::insert_note(&store, NoteSeed::new("n2", 2, "Hidden", "secret").hidden()).await;
        store
    }

    fn synchronizer(
        store: &SqliteContentStore,
        provider: ProviderState,
        max_bytes: usize,
    ) -> IndexSynchronizer {
        let search = SearchProviderConfig {
            max_document_bytes: max_bytes,
            ..Default::default()
        };
        IndexSynchronizer::new(
            ContentSelector::new(Arc::new(store.clone())),
            provider,
            JobLedger::new(store.pool().clone()),
            &search,
            &SyncConfig::default(),
        )
    }

    fn ready(provider: &Arc<MemoryProvider>) -> ProviderState {
        let provider: Arc<dyn SearchProvider> = provider.clone();
        ProviderState::ready(provider)
    }

    #[tokio::test]
    async fn test_sync_pushes_public_units_and_settings() {
        let store = seeded_store().await;
        let provider = Arc::new(MemoryProvider::default());
        let sync = synchronizer(&store, ready(&provider), 10_000);

        let report = sync.sync().await.unwrap();
        assert_eq!(report.document_count, 3);
        assert_eq!(report.unit_count, 3);

        let replaced = provider.replaced.lock();
        let ids: Vec<&str> = replaced[0].iter().map(|u| u.object_id.as_str()).collect();
        assert_eq!(ids, vec!["a1_0", "g1_0", "n1_0"]);
        assert_eq!(
            provider.settings.lock()[0].attributes_to_highlight,
            vec!["text", "title"]
        );
    }

    #[tokio::test]
    async fn test_concurrent_triggers_replace_once() {
        let store = seeded_store().await;
        let provider = Arc::new(MemoryProvider::slow(Duration::from_millis(50)));
        let sync = Arc::new(synchronizer(&store, ready(&provider), 10_000));

        let triggers = [
            SyncTrigger::Scheduled,
            SyncTrigger::Event(SearchEvent::ArticleCreated),
            SyncTrigger::Event(SearchEvent::NoteUpdated),
            SyncTrigger::Event(SearchEvent::PushSearchIndex),
            SyncTrigger::Admin,
        ];
        let handles: Vec<_> = triggers
            .into_iter()
            .map(|trigger| {
                let sync = sync.clone();
                tokio::spawn(async move { sync.run_guarded(trigger).await })
            })
            .collect();

        let mut completed = 0;
        let mut skipped = 0;
        for handle in handles {
            match handle.await.unwrap().unwrap() {
                SyncOutcome::Completed(_) => completed += 1,
                SyncOutcome::Skipped { .. } => skipped += 1,
                SyncOutcome::Disabled => panic!("provider is configured"),
            }
        }
        assert_eq!(completed, 1);
        assert_eq!(skipped, 4);
        assert_eq!(provider.replace_count(), 1);
        assert!(!sync.status().is_running());
    }

    #[tokio::test]
    async fn test_partial_failure_releases_cycle() {
        let store = seeded_store().await;
        let provider = Arc::new(MemoryProvider::default());
        provider.fail_settings.store(true, Ordering::SeqCst);
        let sync = synchronizer(&store, ready(&provider), 10_000);

        let err = sync.run_guarded(SyncTrigger::Scheduled).await.unwrap_err();
        assert!(matches!(err, SearchError::ProviderWrite(_)));
        assert!(sync.status().get_progress().error.is_some());

        let cycle = JobLedger::cycle_key(Utc::now(), SyncConfig::default().cycle_secs);
        assert!(sync.ledger().status(PUSH_JOB, &cycle).await.unwrap().is_none());

        provider.fail_settings.store(false, Ordering::SeqCst);
        let outcome = sync.run_guarded(SyncTrigger::Scheduled).await.unwrap();
        assert!(matches!(outcome, SyncOutcome::Completed(_)));
        assert_eq!(
            sync.ledger().status(PUSH_JOB, &cycle).await.unwrap().as_deref(),
            Some("done")
        );
    }

    #[tokio::test]
    async fn test_store_failure_releases_cycle() {
        let store = seeded_store().await;
        sqlx::query("DROP TABLE pages").execute(store.pool()).await.unwrap();
        let provider = Arc::new(MemoryProvider::default());
        let sync = synchronizer(&store, ready(&provider), 10_000);

        let err = sync.run_guarded(SyncTrigger::Scheduled).await.unwrap_err();
        assert!(matches!(err, SearchError::StoreRead(_)));
        assert_eq!(provider.replace_count(), 0);
        let progress = sync.status().get_progress();
        assert!(!progress.is_running);
        assert!(progress.error.is_some());

        let cycle = JobLedger::cycle_key(Utc::now(), SyncConfig::default().cycle_secs);
        assert!(sync.ledger().status(PUSH_JOB, &cycle).await.unwrap().is_none());

        // store comes back, the next trigger in the same cycle retries
        crate::db::run_migrations(store.pool()).await.unwrap();
        let outcome = sync.run_guarded(SyncTrigger::Scheduled).await.unwrap();
        assert!(matches!(outcome, SyncOutcome::Completed(_)));
        assert_eq!(provider.replace_count(), 1);
    }

    #[tokio::test]
    async fn test_ledger_failure_after_push_still_finishes() {
        let store = seeded_store().await;
        let provider = Arc::new(MemoryProvider::slow(Duration::from_millis(300)));
        let sync = Arc::new(synchronizer(&store, ready(&provider), 10_000));

        let run = {
            let sync = sync.clone();
            tokio::spawn(async move { sync.run_guarded(SyncTrigger::Admin).await })
        };
        // the push is parked in the provider by now; take the ledger away under it
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(sync.status().is_running());
        sqlx::query("DROP TABLE job_runs").execute(store.pool()).await.unwrap();

        let outcome = run.await.unwrap().unwrap();
        assert!(matches!(outcome, SyncOutcome::Completed(_)));
        assert_eq!(provider.replace_count(), 1);
        let progress = sync.status().get_progress();
        assert!(!sync.status().is_running());
        assert!(!progress.is_running);
        assert!(progress.error.is_none());
        assert!(progress.last_done_time.is_some());
    }

    #[tokio::test]
    async fn test_replace_failure_is_reported() {
        let store = seeded_store().await;
        let provider = Arc::new(MemoryProvider::default());
        provider.fail_replace.store(true, Ordering::SeqCst);
        let sync = synchronizer(&store, ready(&provider), 10_000);

        assert!(sync.run_guarded(SyncTrigger::Admin).await.is_err());
        // settings went through, the run still counts as failed
        assert_eq!(provider.settings.lock().len(), 1);
        assert_eq!(provider.replace_count(), 0);
    }

    #[tokio::test]
    async fn test_unchunkable_document_is_skipped() {
        let store = seeded_store().await;
        let long_title = "t".repeat(600);
        testing::insert_article(&store, "big", &long_title, "body", None).await;
        let provider = Arc::new(MemoryProvider::default());
        let sync = synchronizer(&store, ready(&provider), 400);

        let outcome = sync.run_guarded(SyncTrigger::Scheduled).await.unwrap();
        let SyncOutcome::Completed(report) = outcome else {
            panic!("expected completed run");
        };
        assert_eq!(report.degraded, vec!["big".to_string()]);
        assert_eq!(report.document_count, 4);
        assert!(provider.replaced.lock()[0]
            .iter()
            .all(|u| !u.object_id.starts_with("big_")));
        assert_eq!(sync.status().get_progress().degraded, vec!["big".to_string()]);
    }

    #[tokio::test]
    async fn test_oversized_document_is_split() {
        let store = testing::store().await;
        testing::insert_article(&store, "long", "Long", &"字".repeat(400), None).await;
        let provider = Arc::new(MemoryProvider::default());
        let sync = synchronizer(&store, ready(&provider), 500);

        let report = sync.sync().await.unwrap();
        assert!(report.unit_count > 1);
        let replaced = provider.replaced.lock();
        let joined: String = replaced[0].iter().map(|u| u.text.as_str()).collect();
        assert_eq!(joined, "字".repeat(400));
    }

    #[tokio::test]
    async fn test_disabled_provider_is_noop_unless_admin() {
        let store = seeded_store().await;
        let sync = synchronizer(&store, ProviderState::Disabled, 10_000);

        let outcome = sync.run_guarded(SyncTrigger::Scheduled).await.unwrap();
        assert_eq!(outcome, SyncOutcome::Disabled);
        let outcome = sync
            .run_guarded(SyncTrigger::Event(SearchEvent::ArticleDeleted))
            .await
            .unwrap();
        assert_eq!(outcome, SyncOutcome::Disabled);

        let err = sync.run_guarded(SyncTrigger::Admin).await.unwrap_err();
        assert!(err.is_configuration());

        let cycle = JobLedger::cycle_key(Utc::now(), SyncConfig::default().cycle_secs);
        assert!(sync.ledger().status(PUSH_JOB, &cycle).await.unwrap().is_none());
    }

    #[test]
    fn test_trigger_labels() {
        assert_eq!(SyncTrigger::Scheduled.to_string(), "scheduled");
        assert_eq!(
            SyncTrigger::Event(SearchEvent::NoteDeleted).to_string(),
            "event:note.deleted"
        );
    }
}
