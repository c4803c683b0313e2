//! External search provider / 外部搜索服务
//!
//! `SearchProvider` is the narrow seam the synchronizer and query engine use.
//! `AlgoliaProvider` talks to the Algolia REST API.

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::schema::IndexedUnit;
use crate::config::{ProviderCredentials, SearchProviderConfig};
use crate::error::{Result, SearchError};

/// Objects per batch request / 每批写入数量
const BATCH_SIZE: usize = 1000;
/// Task status polls before giving up / 任务状态最大轮询次数
const MAX_TASK_POLLS: u32 = 100;

/// Index settings pushed with every sync / 索引设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSettings {
    pub attributes_to_highlight: Vec<String>,
}

/// Provider-side query, `page` is zero-based / 外部查询（页码从0开始）
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderQuery {
    pub query: String,
    pub page: u32,
    pub hits_per_page: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderHit {
    #[serde(rename = "objectID")]
    pub object_id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Native provider response / 外部搜索原始响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSearchResponse {
    pub hits: Vec<ProviderHit>,
    pub nb_hits: u64,
    pub nb_pages: u32,
    pub page: u32,
    pub hits_per_page: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Atomically replace every object in the index / 原子替换索引全部对象
    async fn replace_all_objects(&self, units: &[IndexedUnit]) -> Result<()>;

    async fn set_settings(&self, settings: &IndexSettings) -> Result<()>;

    async fn search(&self, query: &ProviderQuery) -> Result<ProviderSearchResponse>;
}

/// Provider resolved from configuration at startup / 启动时解析出的服务状态
#[derive(Clone)]
pub enum ProviderState {
    Ready(Arc<dyn SearchProvider>),
    Disabled,
    Misconfigured(String),
}

impl fmt::Debug for ProviderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderState::Ready(_) => f.write_str("Ready"),
            ProviderState::Disabled => f.write_str("Disabled"),
            ProviderState::Misconfigured(reason) => write!(f, "Misconfigured({})", reason),
        }
    }
}

impl ProviderState {
    pub fn from_config(cfg: &SearchProviderConfig) -> Self {
        if !cfg.enabled {
            return ProviderState::Disabled;
        }
        match cfg.validate().and_then(AlgoliaProvider::new) {
            Ok(provider) => ProviderState::Ready(Arc::new(provider)),
            Err(e) => {
                tracing::warn!("External search enabled but unusable: {}", e);
                let reason = match e {
                    SearchError::Configuration(reason) => reason,
                    other => other.to_string(),
                };
                ProviderState::Misconfigured(reason)
            }
        }
    }

    pub fn ready(provider: Arc<dyn SearchProvider>) -> Self {
        ProviderState::Ready(provider)
    }

    /// `false` only when the feature is switched off / 功能未开启
    pub fn is_enabled(&self) -> bool {
        !matches!(self, ProviderState::Disabled)
    }

    /// The provider, or a configuration error / 获取服务，否则返回配置错误
    pub fn require(&self) -> Result<Arc<dyn SearchProvider>> {
        match self {
            ProviderState::Ready(provider) => Ok(provider.clone()),
            ProviderState::Disabled => Err(SearchError::Configuration(
                "external search is not enabled".to_string(),
            )),
            ProviderState::Misconfigured(reason) => Err(SearchError::Configuration(reason.clone())),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TaskResponse {
    #[serde(rename = "taskID")]
    task_id: i64,
}

#[derive(Debug, Deserialize)]
struct TaskStatus {
    status: String,
}

/// Algolia REST client / Algolia 客户端
pub struct AlgoliaProvider {
    client: reqwest::Client,
    credentials: ProviderCredentials,
    write_host: String,
    read_host: String,
}

impl AlgoliaProvider {
    pub fn new(credentials: ProviderCredentials) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SearchError::Configuration(format!("http client: {}", e)))?;

        Ok(Self {
            write_host: format!("https://{}.algolia.net", credentials.app_id),
            read_host: format!("https://{}-dsn.algolia.net", credentials.app_id),
            client,
            credentials,
        })
    }

    /// Point at other hosts (proxies, regional clusters) / 自定义主机
    pub fn with_hosts(
        mut self,
        write_host: impl Into<String>,
        read_host: impl Into<String>,
    ) -> Self {
        self.write_host = write_host.into();
        self.read_host = read_host.into();
        self
    }

    fn index_path(index: &str, suffix: &str) -> String {
        format!("/1/indexes/{}{}", urlencoding::encode(index), suffix)
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        host: &str,
        path: &str,
        body: Option<&Value>,
    ) -> std::result::Result<T, String> {
        let url = format!("{}{}", host, path);
        let mut req = self
            .client
            .request(method.clone(), &url)
            .header("X-Algolia-Application-Id", &self.credentials.app_id)
            .header("X-Algolia-API-Key", &self.credentials.api_key);
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| format!("{} {}: {}", method, path, e))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(format!("{} {} returned {}: {}", method, path, status, text));
        }
        resp.json::<T>()
            .await
            .map_err(|e| format!("{} {}: invalid response: {}", method, path, e))
    }

    /// Poll until the task is published / 等待任务发布完成
    async fn wait_task(&self, index: &str, task_id: i64) -> std::result::Result<(), String> {
        let path = Self::index_path(index, &format!("/task/{}", task_id));
        for attempt in 0..MAX_TASK_POLLS {
            let status: TaskStatus = self.request(Method::GET, &self.read_host, &path, None).await?;
            if status.status == "published" {
                return Ok(());
            }
            let delay = (100 * (attempt as u64 + 1)).min(2_000);
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        Err(format!("task {} on {} not published after {} polls", task_id, index, MAX_TASK_POLLS))
    }

    async fn write(
        &self,
        method: Method,
        index: &str,
        suffix: &str,
        body: &Value,
    ) -> std::result::Result<(), String> {
        let path = Self::index_path(index, suffix);
        let task: TaskResponse = self.request(method, &self.write_host, &path, Some(body)).await?;
        self.wait_task(index, task.task_id).await
    }

    async fn fill_and_swap(
        &self,
        tmp: &str,
        units: &[IndexedUnit],
    ) -> std::result::Result<(), String> {
        let index = self.credentials.index_name.as_str();

        // 复制线上索引的设置到临时索引
        self.write(
            Method::POST,
            index,
            "/operation",
            &json!({
                "operation": "copy",
                "destination": tmp,
                "scope": ["settings", "synonyms", "rules"],
            }),
        )
        .await?;

        for batch in units.chunks(BATCH_SIZE) {
            let requests = batch
                .iter()
                .map(|unit| {
                    serde_json::to_value(unit)
                        .map(|body| json!({ "action": "updateObject", "body": body }))
                        .map_err(|e| e.to_string())
                })
                .collect::<std::result::Result<Vec<Value>, String>>()?;
            self.write(Method::POST, tmp, "/batch", &json!({ "requests": requests }))
                .await?;
        }

        // 临时索引整体覆盖线上索引
        self.write(
            Method::POST,
            tmp,
            "/operation",
            &json!({ "operation": "move", "destination": index }),
        )
        .await
    }
}

#[async_trait]
impl SearchProvider for AlgoliaProvider {
    async fn replace_all_objects(&self, units: &[IndexedUnit]) -> Result<()> {
        let tmp = format!(
            "{}_tmp_{}",
            self.credentials.index_name,
            uuid::Uuid::new_v4().simple()
        );

        if let Err(e) = self.fill_and_swap(&tmp, units).await {
            let path = Self::index_path(&tmp, "");
            if let Err(cleanup) = self
                .request::<Value>(Method::DELETE, &self.write_host, &path, None)
                .await
            {
                tracing::warn!("Failed to drop temporary index {}: {}", tmp, cleanup);
            }
            return Err(SearchError::ProviderWrite(e));
        }
        Ok(())
    }

    async fn set_settings(&self, settings: &IndexSettings) -> Result<()> {
        let body = serde_json::to_value(settings)?;
        self.write(Method::PUT, &self.credentials.index_name, "/settings", &body)
            .await
            .map_err(SearchError::ProviderWrite)
    }

    async fn search(&self, query: &ProviderQuery) -> Result<ProviderSearchResponse> {
        let body = json!({
            "query": query.query,
            "page": query.page,
            "hitsPerPage": query.hits_per_page,
            "attributesToRetrieve": ["*"],
            "snippetEllipsisText": "...",
            "responseFields": ["*"],
            "facets": ["*"],
        });
        let path = Self::index_path(&self.credentials.index_name, "/query");
        self.request(Method::POST, &self.read_host, &path, Some(&body))
            .await
            .map_err(SearchError::ProviderQuery)
    }
}
