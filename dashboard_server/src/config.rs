//! 应用配置的加载与保存。
//!
//! 配置以 JSON 文件保存，默认文件名为当前目录下的 `app_settings.json`，
//! 可通过环境变量 `DASHBOARD_SETTINGS` 指定其他路径。文件缺失时使用默认配置并写回文件；
//! 文件损坏时记录警告并使用默认配置。加载得到的 `AppConfig` 由 `main` 显式传递给各组件。

use crate::error::AppError;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// WebSocket 服务的默认主机地址
pub const DEFAULT_WS_HOST: &str = "0.0.0.0";
/// WebSocket 服务的默认端口号
pub const DEFAULT_WS_PORT: u16 = 9000;
/// 工作池的默认大小
pub const DEFAULT_MAX_WORKERS: usize = 4;
/// 数据集文件的默认路径
pub const DEFAULT_DATASET_PATH: &str = "data/wine_dataset.json";
/// 关闭时等待未完成响应写出的默认时长（秒）
pub const DEFAULT_GRACE_PERIOD_SECONDS: u64 = 5;
/// 默认配置文件名
pub const SETTINGS_FILE_NAME: &str = "app_settings.json";
/// 用于覆盖配置文件路径的环境变量
pub const SETTINGS_PATH_ENV: &str = "DASHBOARD_SETTINGS";

/// WebSocket 服务端配置
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct WebSocketConfig {
    /// WebSocket 服务绑定的主机地址
    pub host: String,
    /// WebSocket 服务监听的端口号
    pub port: u16,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_WS_HOST.to_string(), // 默认监听所有网络接口
            port: DEFAULT_WS_PORT,
        }
    }
}

impl WebSocketConfig {
    /// `host:port` 形式的监听地址
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 工作池配置
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct WorkerPoolConfig {
    /// 同时执行统计计算的最大任务数
    pub max_workers: usize,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self { max_workers: DEFAULT_MAX_WORKERS }
    }
}

/// 数据集来源配置
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DatasetConfig {
    /// 数据集 JSON 文档的路径
    pub path: PathBuf,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self { path: PathBuf::from(DEFAULT_DATASET_PATH) }
    }
}

/// 关闭流程配置
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ShutdownConfig {
    /// 停止接受连接后，等待已派发请求写出响应的最长时间（秒）
    pub grace_period_seconds: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self { grace_period_seconds: DEFAULT_GRACE_PERIOD_SECONDS }
    }
}

impl ShutdownConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_seconds)
    }
}

/// 应用的主配置结构体
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub websocket: WebSocketConfig,
    pub worker_pool: WorkerPoolConfig,
    pub dataset: DatasetConfig,
    pub shutdown: ShutdownConfig,
}

impl AppConfig {
    /// 从 JSON 文本解析配置，缺失的字段取默认值。
    pub fn from_json_str(content: &str) -> Result<Self, AppError> {
        let config: AppConfig = serde_json::from_str(content)
            .map_err(|e| AppError::ConfigError(format!("配置反序列化失败: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// 检查配置取值是否可用于启动服务。
    pub fn validate(&self) -> Result<(), AppError> {
        if self.worker_pool.max_workers == 0 {
            return Err(AppError::ConfigError("worker_pool.max_workers 必须大于 0".to_string()));
        }
        if self.websocket.host.trim().is_empty() {
            return Err(AppError::ConfigError("websocket.host 不能为空".to_string()));
        }
        Ok(())
    }
}

/// 获取配置文件路径：环境变量优先，否则为当前目录下的 `app_settings.json`。
pub fn config_file_path() -> PathBuf {
    if let Ok(path) = env::var(SETTINGS_PATH_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    let current_dir = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    current_dir.join(SETTINGS_FILE_NAME)
}

/// 加载配置文件；文件缺失时写出默认配置，文件无法解析时回退到默认配置。
///
/// 文件内容能解析但取值非法（例如 `max_workers` 为 0）时返回错误，由调用方中止启动。
pub fn load_or_create_config(path: &Path) -> Result<AppConfig, AppError> {
    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<AppConfig>(&content) {
            Ok(config) => {
                config.validate()?;
                info!("[配置模块] 已成功从配置文件 {:?} 加载应用配置。", path);
                Ok(config)
            }
            Err(e) => {
                warn!(
                    "[配置模块] 警告：从 {:?} 反序列化配置失败: {}. 文件可能已损坏，本次使用默认配置。",
                    path, e
                );
                Ok(AppConfig::default())
            }
        },
        Err(e) => {
            info!(
                "[配置模块] 未在 {:?} 找到配置文件或读取时发生错误 (错误: {}). 将使用默认配置并尝试创建新文件。",
                path, e
            );
            let default_config = AppConfig::default();
            save_config(&default_config, path);
            Ok(default_config)
        }
    }
}

/// 保存配置到文件；失败只记录警告，不影响启动。
pub fn save_config(config: &AppConfig, path: &Path) {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!("[配置模块] 错误：创建配置目录 {:?} 失败: {}", parent, e);
                return;
            }
        }
    }

    match serde_json::to_string_pretty(config) {
        Ok(content) => {
            if let Err(e) = fs::write(path, content) {
                warn!("[配置模块] 错误：将配置写入文件 {:?} 时失败: {}", path, e);
            } else {
                info!("[配置模块] 已成功将当前配置保存到 {:?}.", path);
            }
        }
        Err(e) => {
            warn!("[配置模块] 错误：序列化配置信息以便保存时失败: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn temp_settings_path() -> PathBuf {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        env::temp_dir()
            .join(format!("dashboard_server_config_{}_{}", std::process::id(), id))
            .join(SETTINGS_FILE_NAME)
    }

    #[test]
    fn test_defaults_match_protocol() {
        let config = AppConfig::default();
        assert_eq!(config.websocket.listen_addr(), "0.0.0.0:9000");
        assert_eq!(config.worker_pool.max_workers, 4);
        assert_eq!(config.shutdown.grace_period(), Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    /// 只给出部分字段时，其余字段取默认值。
    fn test_partial_json_fills_defaults() {
        let config = AppConfig::from_json_str(r#"{"websocket": {"port": 9100}, "worker_pool": {"max_workers": 8}}"#)
            .expect("解析部分配置失败");
        assert_eq!(config.websocket.host, DEFAULT_WS_HOST);
        assert_eq!(config.websocket.port, 9100);
        assert_eq!(config.worker_pool.max_workers, 8);
        assert_eq!(config.dataset.path, PathBuf::from(DEFAULT_DATASET_PATH));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let result = AppConfig::from_json_str(r#"{"worker_pool": {"max_workers": 0}}"#);
        assert!(matches!(result, Err(AppError::ConfigError(_))));
    }

    #[test]
    /// 文件不存在时写出默认配置，再次加载读回同样的内容。
    fn test_missing_file_creates_default() {
        let path = temp_settings_path();
        let created = load_or_create_config(&path).expect("加载缺失的配置文件失败");
        assert_eq!(created, AppConfig::default());
        assert!(path.exists(), "默认配置应被写回磁盘");

        let reloaded = load_or_create_config(&path).expect("重新加载配置失败");
        assert_eq!(reloaded, created);
        let _ = fs::remove_dir_all(path.parent().expect("临时路径应有父目录"));
    }

    #[test]
    fn test_corrupt_file_falls_back_to_default() {
        let path = temp_settings_path();
        fs::create_dir_all(path.parent().expect("临时路径应有父目录")).expect("创建临时目录失败");
        fs::write(&path, "{ not json").expect("写入损坏的配置失败");

        let config = load_or_create_config(&path).expect("损坏的配置应回退到默认值");
        assert_eq!(config, AppConfig::default());
        let _ = fs::remove_dir_all(path.parent().expect("临时路径应有父目录"));
    }
}
