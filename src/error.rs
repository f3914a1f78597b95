use thiserror::Error;

/// 应用程序错误类型
///
/// 只覆盖"致命"错误：配置缺失、缓存/结果文件无法创建、数据集拉取失败。
/// 单条 prompt 的超时、空响应、服务端错误不走这里，见 `clients::Outcome`。
#[derive(Debug, Error)]
pub enum AppError {
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 文件存储错误（缓存 / 结果账本）
    #[error("存储错误: {0}")]
    Storage(#[from] StorageError),
    /// 上游数据集错误
    #[error("数据集错误: {0}")]
    Dataset(#[from] DatasetError),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量不存在
    #[error("环境变量 {var_name} 不存在")]
    EnvVarNotFound { var_name: String },
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
}

/// 文件存储错误
#[derive(Debug, Error)]
pub enum StorageError {
    /// 创建文件失败
    #[error("创建文件失败 ({path}): {source}")]
    CreateFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 记录序列化失败
    #[error("记录序列化失败: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// 上游数据集错误
#[derive(Debug, Error)]
pub enum DatasetError {
    /// 网络请求失败
    #[error("数据集请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// 返回的行缺少 prompt 字段
    #[error("数据集第 {row_idx} 行缺少字符串字段 '{column}'")]
    MissingColumn { row_idx: usize, column: String },
}

// ========== 便捷构造函数 ==========

impl StorageError {
    pub fn create(path: &std::path::Path, source: std::io::Error) -> Self {
        StorageError::CreateFailed {
            path: path.display().to_string(),
            source,
        }
    }

    pub fn read(path: &std::path::Path, source: std::io::Error) -> Self {
        StorageError::ReadFailed {
            path: path.display().to_string(),
            source,
        }
    }

    pub fn write(path: &std::path::Path, source: std::io::Error) -> Self {
        StorageError::WriteFailed {
            path: path.display().to_string(),
            source,
        }
    }
}

impl AppError {
    /// 创建"环境变量不存在"错误
    pub fn env_var_not_found(var_name: impl Into<String>) -> Self {
        AppError::Config(ConfigError::EnvVarNotFound {
            var_name: var_name.into(),
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
