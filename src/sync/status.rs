use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};

use super::SyncReport;

/// Index push progress / 索引推送进度
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncProgress {
    pub is_running: bool,
    pub last_trigger: Option<String>,
    pub last_cycle: Option<String>,
    pub document_count: usize,
    pub unit_count: usize,
    /// Documents skipped by the last run / 上次推送跳过的文档
    pub degraded: Vec<String>,
    pub error: Option<String>,
    pub last_done_time: Option<i64>,
}

/// Sync state management / 推送状态管理
pub struct SyncStatus {
    running: AtomicBool,
    progress: RwLock<SyncProgress>,
}

impl SyncStatus {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            progress: RwLock::new(SyncProgress::default()),
        }
    }

    pub fn start(&self, trigger: &str, cycle: &str) {
        self.running.store(true, Ordering::SeqCst);
        let mut progress = self.progress.write();
        progress.is_running = true;
        progress.last_trigger = Some(trigger.to_string());
        progress.last_cycle = Some(cycle.to_string());
        progress.error = None;
    }

    pub fn finish(&self, report: &SyncReport) {
        self.running.store(false, Ordering::SeqCst);
        let mut progress = self.progress.write();
        progress.is_running = false;
        progress.document_count = report.document_count;
        progress.unit_count = report.unit_count;
        progress.degraded = report.degraded.clone();
        progress.error = None;
        progress.last_done_time = Some(chrono::Utc::now().timestamp());
    }

    pub fn fail(&self, error: String) {
        self.running.store(false, Ordering::SeqCst);
        let mut progress = self.progress.write();
        progress.is_running = false;
        progress.error = Some(error);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn get_progress(&self) -> SyncProgress {
        self.progress.read().clone()
    }
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self::new()
    }
}
