use anyhow::{anyhow, Result};
use std::str::FromStr;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};
use uuid::Uuid;

use crate::sync::{IndexSynchronizer, SyncOutcome, SyncTrigger};

/// Validate a six-field cron expression (seconds first) / 校验cron表达式
pub fn parse_cron(expression: &str) -> Result<cron::Schedule> {
    cron::Schedule::from_str(expression)
        .map_err(|e| anyhow!("cron表达式无效 {}: {}", expression, e))
}

pub struct SearchScheduler {
    scheduler: JobScheduler,
}

impl SearchScheduler {
    pub async fn new() -> Result<Self> {
        let scheduler = JobScheduler::new().await?;
        Ok(Self { scheduler })
    }

    pub async fn start(&self) -> Result<()> {
        self.scheduler.start().await?;
        info!("📅 定时任务调度器已启动");
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        self.scheduler.shutdown().await?;
        info!("📅 定时任务调度器已停止");
        Ok(())
    }

    /// Register the recurring index push / 注册定时索引推送
    pub async fn schedule_push(
        &self,
        expression: &str,
        synchronizer: Arc<IndexSynchronizer>,
    ) -> Result<Uuid> {
        parse_cron(expression)?;

        let job = Job::new_async(expression, move |_uuid, _scheduler| {
            let synchronizer = synchronizer.clone();

            Box::pin(async move {
                // 错误只记录，不向外传播
                match synchronizer.run_guarded(SyncTrigger::Scheduled).await {
                    Ok(SyncOutcome::Completed(report)) => {
                        info!("✅ 定时索引推送完成，共 {} 条", report.unit_count);
                    }
                    Ok(_) => {}
                    Err(e) => error!("❌ 定时索引推送失败: {}", e),
                }
            })
        })?;

        let id = self.scheduler.add(job).await?;
        info!("📅 已注册索引推送任务: {}", expression);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SearchProviderConfig, SyncConfig};
    use crate::search::provider::ProviderState;
    use crate::search::ContentSelector;
    use crate::sync::JobLedger;
    use crate::testing;

    #[test]
    fn test_parse_cron() {
        assert!(parse_cron(&SyncConfig::default().cron).is_ok());
        assert!(parse_cron("0 30 3 * * *").is_ok());
        assert!(parse_cron("every day").is_err());
    }

    #[tokio::test]
    async fn test_schedule_push_rejects_invalid_expression() {
        let store = testing::store().await;
        let synchronizer = Arc::new(IndexSynchronizer::new(
            ContentSelector::new(Arc::new(store.clone())),
            ProviderState::Disabled,
            JobLedger::new(store.pool().clone()),
            &SearchProviderConfig::default(),
            &SyncConfig::default(),
        ));

        let scheduler = SearchScheduler::new().await.unwrap();
        assert!(scheduler.schedule_push("not a cron", synchronizer.clone()).await.is_err());
        assert!(scheduler.schedule_push("0 0 0 * * *", synchronizer).await.is_ok());
    }
}
