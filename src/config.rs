use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AppError, AppResult, ConfigError};

/// 程序配置
///
/// Azure 相关的四项必须由环境变量提供，缺失即启动失败；
/// 其余项都有默认值。
#[derive(Clone, Debug)]
pub struct Config {
    // --- Azure OpenAI 配置（必填） ---
    pub azure_endpoint: String,
    pub azure_api_key: String,
    pub azure_api_version: String,
    /// 部署名，同时作为请求里的 model 字段
    pub azure_deployment: String,
    // --- 批处理配置 ---
    /// prompt 缓存文件
    pub prompt_cache_file: PathBuf,
    /// 结果账本文件（后缀用来区分不同的运行）
    pub results_file: PathBuf,
    /// 是否启用跨运行的输出上限
    pub stop_after_limit: bool,
    /// 输出上限
    pub output_limit: usize,
    /// 单次请求超时（秒）
    pub request_timeout_seconds: u64,
    // --- 上游数据集配置 ---
    pub dataset_id: String,
    pub dataset_split: String,
    pub dataset_api_base: String,
}

/// 批处理运行参数，由 `Config` 派生后传入 `BatchRunner`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunnerOptions {
    pub deployment: String,
    /// `None` 表示不限制输出数量
    pub output_limit: Option<usize>,
    pub request_timeout: Duration,
}

pub const ENV_ENDPOINT: &str = "AZURE_OPENAI_API_ENDPOINT";
pub const ENV_API_KEY: &str = "AZURE_OPENAI_API_KEY";
pub const ENV_API_VERSION: &str = "AZURE_OPENAI_API_VERSION";
pub const ENV_DEPLOYMENT: &str = "AZURE_OPENAI_API_MODEL";

const DEFAULT_PROMPT_CACHE_FILE: &str = "prompts_cache.jsonl";
const DEFAULT_RESULTS_FILE: &str = "results_Balanced.jsonl";
const DEFAULT_OUTPUT_LIMIT: usize = 1000;
const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 60;
const DEFAULT_DATASET_ID: &str = "data-is-better-together/10k_prompts_ranked";
const DEFAULT_DATASET_SPLIT: &str = "train";
const DEFAULT_DATASET_API_BASE: &str = "https://datasets-server.huggingface.co";

impl Config {
    /// 从进程环境加载配置（会先尝试读取 `.env`）
    pub fn from_env() -> AppResult<Self> {
        // .env 不存在不是错误
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 通过任意键值查找函数构建配置，便于测试
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> AppResult<String> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| AppError::env_var_not_found(key))
        };

        Ok(Self {
            azure_endpoint: required(ENV_ENDPOINT)?,
            azure_api_key: required(ENV_API_KEY)?,
            azure_api_version: required(ENV_API_VERSION)?,
            azure_deployment: required(ENV_DEPLOYMENT)?,
            prompt_cache_file: lookup("PROMPT_CACHE_FILE")
                .unwrap_or_else(|| DEFAULT_PROMPT_CACHE_FILE.to_string())
                .into(),
            results_file: lookup("RESULTS_FILE")
                .unwrap_or_else(|| DEFAULT_RESULTS_FILE.to_string())
                .into(),
            stop_after_limit: parse_or(&lookup, "STOP_AFTER_LIMIT", "bool", true)?,
            output_limit: parse_or(&lookup, "OUTPUT_LIMIT", "usize", DEFAULT_OUTPUT_LIMIT)?,
            request_timeout_seconds: parse_or(
                &lookup,
                "REQUEST_TIMEOUT_SECONDS",
                "u64",
                DEFAULT_REQUEST_TIMEOUT_SECONDS,
            )?,
            dataset_id: lookup("DATASET_ID").unwrap_or_else(|| DEFAULT_DATASET_ID.to_string()),
            dataset_split: lookup("DATASET_SPLIT")
                .unwrap_or_else(|| DEFAULT_DATASET_SPLIT.to_string()),
            dataset_api_base: lookup("DATASET_API_BASE")
                .unwrap_or_else(|| DEFAULT_DATASET_API_BASE.to_string()),
        })
    }

    pub fn runner_options(&self) -> RunnerOptions {
        RunnerOptions {
            deployment: self.azure_deployment.clone(),
            output_limit: self.stop_after_limit.then_some(self.output_limit),
            request_timeout: Duration::from_secs(self.request_timeout_seconds),
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, expected_type: &str, default: T) -> AppResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| {
            ConfigError::EnvVarParseFailed {
                var_name: key.to_string(),
                value,
                expected_type: expected_type.to_string(),
            }
            .into()
        }),
    }
}
