//! Application configuration module / 应用配置模块
//!
//! Loaded once from config.json at startup and passed explicitly to the services.
//! Creates default config file on first run / 首次运行时创建默认配置文件

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::SearchError;

/// Application configuration / 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration / 服务器配置
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration / 数据库配置
    #[serde(default)]
    pub database: DatabaseConfig,
    /// External search provider / 外部搜索服务配置
    #[serde(default)]
    pub search: SearchProviderConfig,
    /// Index push schedule / 索引推送计划
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Server configuration / 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Database configuration / 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Data directory path / 数据目录路径
    pub data_dir: String,
    /// Main database file path (relative to data_dir) / 主数据库文件路径
    pub db_file: String,
}

/// External search provider options / 外部搜索服务选项
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchProviderConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub index_name: Option<String>,
    /// Hard per-record byte ceiling of the index / 单条记录最大字节数
    #[serde(default = "default_max_document_bytes")]
    pub max_document_bytes: usize,
    /// Attributes the provider should highlight / 高亮字段
    #[serde(default = "default_highlight_fields")]
    pub highlight_fields: Vec<String>,
}

/// Validated provider credentials / 校验后的凭据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCredentials {
    pub app_id: String,
    pub api_key: String,
    pub index_name: String,
}

/// Schedule configuration / 调度配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Six-field cron expression, seconds first (UTC) / 六段式 cron 表达式
    #[serde(default = "default_cron")]
    pub cron: String,
    /// Length of one once-only cycle / 单次执行周期长度（秒）
    #[serde(default = "default_cycle_secs")]
    pub cycle_secs: i64,
}

fn default_max_document_bytes() -> usize {
    100_000
}

fn default_highlight_fields() -> Vec<String> {
    vec!["text".to_string(), "title".to_string()]
}

fn default_cron() -> String {
    "0 0 0 * * *".to_string()
}

fn default_cycle_secs() -> i64 {
    86_400
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8180,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            db_file: "content.db".to_string(),
        }
    }
}

impl Default for SearchProviderConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            app_id: None,
            api_key: None,
            index_name: None,
            max_document_bytes: default_max_document_bytes(),
            highlight_fields: default_highlight_fields(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            cron: default_cron(),
            cycle_secs: default_cycle_secs(),
        }
    }
}

impl SearchProviderConfig {
    /// Check that the provider is enabled and fully configured / 检查是否启用且配置完整
    pub fn validate(&self) -> Result<ProviderCredentials, SearchError> {
        if !self.enabled {
            return Err(SearchError::Configuration(
                "external search is not enabled".to_string(),
            ));
        }

        let field = |value: &Option<String>, name: &str| -> Result<String, SearchError> {
            match value.as_deref().map(str::trim) {
                Some(v) if !v.is_empty() => Ok(v.to_string()),
                _ => Err(SearchError::Configuration(format!("{} is not configured", name))),
            }
        };

        Ok(ProviderCredentials {
            app_id: field(&self.app_id, "app_id")?,
            api_key: field(&self.api_key, "api_key")?,
            index_name: field(&self.index_name, "index_name")?,
        })
    }
}

impl AppConfig {
    /// Get the full database URL / 获取完整的数据库URL
    pub fn get_database_url(&self) -> String {
        let db_path = Path::new(&self.database.data_dir).join(&self.database.db_file);
        format!("sqlite:{}?mode=rwc", db_path.to_string_lossy())
    }

    /// Get the full data directory path / 获取完整的数据目录路径
    pub fn get_data_dir(&self) -> PathBuf {
        PathBuf::from(&self.database.data_dir)
    }

    /// Get the server bind address / 获取服务器绑定地址
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Get the config file path / 获取配置文件路径
fn get_config_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("config.json")
}

/// Load configuration from file, or create default if not exists / 加载配置文件，不存在则创建默认配置
pub fn load_config() -> Result<AppConfig, String> {
    load_config_from(&get_config_path())
}

pub fn load_config_from(config_path: &Path) -> Result<AppConfig, String> {
    if config_path.exists() {
        let content = std::fs::read_to_string(config_path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let config: AppConfig = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config file: {}", e))?;

        tracing::info!("Loaded configuration from {:?}", config_path);
        Ok(config)
    } else {
        let config = AppConfig::default();
        save_config_to(&config, config_path)?;
        tracing::info!("Created default configuration at {:?}", config_path);
        Ok(config)
    }
}

/// Save configuration to file / 保存配置到文件
pub fn save_config_to(config: &AppConfig, config_path: &Path) -> Result<(), String> {
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;

    std::fs::write(config_path, content)
        .map_err(|e| format!("Failed to write config file: {}", e))?;

    Ok(())
}
