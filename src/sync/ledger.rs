//! Once-only job ledger / 定时任务执行标记
//!
//! One row per `(job, cycle)`. The primary key makes acquisition atomic across tasks and
//! across processes sharing the database.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::error::Result;

const STATUS_RUNNING: &str = "running";
const STATUS_DONE: &str = "done";

#[derive(Clone)]
pub struct JobLedger {
    db: SqlitePool,
}

impl JobLedger {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Cycle number containing `now` / 当前所属周期
    pub fn cycle_key(now: DateTime<Utc>, cycle_secs: i64) -> String {
        now.timestamp().div_euclid(cycle_secs.max(1)).to_string()
    }

    /// Claim the cycle; `false` if it is running or already done / 抢占本周期执行权
    ///
    /// A run of the same job still in flight from an earlier cycle also blocks the claim,
    /// so two pushes never overlap across a cycle boundary.
    pub async fn try_acquire(&self, job: &str, cycle: &str) -> Result<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO job_runs (job, cycle, status, started_at) \
             SELECT ?, ?, ?, ? \
             WHERE NOT EXISTS (SELECT 1 FROM job_runs WHERE job = ? AND status = ?)",
        )
        .bind(job)
        .bind(cycle)
        .bind(STATUS_RUNNING)
        .bind(Utc::now().to_rfc3339())
        .bind(job)
        .bind(STATUS_RUNNING)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn complete(&self, job: &str, cycle: &str) -> Result<()> {
        sqlx::query("UPDATE job_runs SET status = ?, finished_at = ? WHERE job = ? AND cycle = ?")
            .bind(STATUS_DONE)
            .bind(Utc::now().to_rfc3339())
            .bind(job)
            .bind(cycle)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    /// Drop the marker so a later trigger in the same cycle can retry / 失败后释放
    pub async fn release(&self, job: &str, cycle: &str) -> Result<()> {
        sqlx::query("DELETE FROM job_runs WHERE job = ? AND cycle = ?")
            .bind(job)
            .bind(cycle)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    /// Clear markers left `running` by a previous process / 清理上次进程中断的标记
    pub async fn reset_interrupted(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM job_runs WHERE status = ?")
            .bind(STATUS_RUNNING)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn status(&self, job: &str, cycle: &str) -> Result<Option<String>> {
        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM job_runs WHERE job = ? AND cycle = ?")
                .bind(job)
                .bind(cycle)
                .fetch_optional(&self.db)
                .await?;
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::memory_pool;
    use chrono::TimeZone;

    #[test]
    fn test_cycle_key() {
        let a = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 1).unwrap();
        let b = Utc.with_ymd_and_hms(2024, 3, 1, 23, 59, 59).unwrap();
        let c = Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap();
        assert_eq!(JobLedger::cycle_key(a, 86_400), JobLedger::cycle_key(b, 86_400));
        assert_ne!(JobLedger::cycle_key(b, 86_400), JobLedger::cycle_key(c, 86_400));
        assert_ne!(JobLedger::cycle_key(a, 3_600), JobLedger::cycle_key(b, 3_600));
    }

    #[tokio::test]
    async fn test_acquire_once_per_cycle() {
        let ledger = JobLedger::new(memory_pool().await);
        assert!(ledger.try_acquire("push", "1").await.unwrap());
        assert!(!ledger.try_acquire("push", "1").await.unwrap());
        assert!(ledger.try_acquire("other", "1").await.unwrap());

        ledger.complete("push", "1").await.unwrap();
        assert_eq!(ledger.status("push", "1").await.unwrap().as_deref(), Some("done"));
        assert!(!ledger.try_acquire("push", "1").await.unwrap());
        assert!(ledger.try_acquire("push", "2").await.unwrap());
    }

    #[tokio::test]
    async fn test_running_job_blocks_next_cycle() {
        let ledger = JobLedger::new(memory_pool().await);
        assert!(ledger.try_acquire("push", "1").await.unwrap());

        // boundary crossed while cycle 1 is still pushing
        assert!(!ledger.try_acquire("push", "2").await.unwrap());
        assert!(ledger.status("push", "2").await.unwrap().is_none());

        ledger.release("push", "1").await.unwrap();
        assert!(ledger.try_acquire("push", "2").await.unwrap());
        assert!(!ledger.try_acquire("push", "3").await.unwrap());
        assert!(ledger.try_acquire("other", "3").await.unwrap());
    }

    #[tokio::test]
    async fn test_release_allows_retry() {
        let ledger = JobLedger::new(memory_pool().await);
        assert!(ledger.try_acquire("push", "7").await.unwrap());
        ledger.release("push", "7").await.unwrap();
        assert!(ledger.status("push", "7").await.unwrap().is_none());
        assert!(ledger.try_acquire("push", "7").await.unwrap());
    }

    #[tokio::test]
    async fn test_reset_interrupted_keeps_done() {
        let ledger = JobLedger::new(memory_pool().await);
        ledger.try_acquire("push", "1").await.unwrap();
        ledger.complete("push", "1").await.unwrap();
        ledger.try_acquire("push", "2").await.unwrap();

        assert_eq!(ledger.reset_interrupted().await.unwrap(), 1);
        assert!(!ledger.try_acquire("push", "1").await.unwrap());
        assert!(ledger.try_acquire("push", "2").await.unwrap());
    }
}
