//! # Prompt Batch
//!
//! 把一个有序的 prompt 列表逐条提交给补全服务，并把结果持久化到 JSON Lines 账本，
//! 支持中断后从断点继续
//!
//! ## 架构设计
//!
//! ### ① 客户端层（Clients）
//! - `clients/` - 对外部服务的薄封装
//! - `CompletionClient` - 补全调用，结果收敛为 `Outcome`
//! - `DatasetLoader` - 上游数据集拉取
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `PromptSource` - 带本地缓存的 prompt 序列
//! - `ResultLedger` - 只追加的结果账本，记录数即续跑游标
//! - `LedgerSummary` - 按模型统计账本
//!
//! ### ③ 编排层（Orchestration）
//! - `orchestrator/run_plan` - 计算工作区间
//! - `orchestrator/batch_runner` - 顺序处理、失败隔离、输出上限、取消
//!
//! ## 模块结构

pub mod app;
pub mod clients;
pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;

// 重新导出常用类型
pub use app::App;
pub use clients::{AzureCompletionClient, CompletionClient, DatasetLoader, Outcome};
pub use config::{Config, RunnerOptions};
pub use error::{AppError, AppResult};
pub use models::ResultRecord;
pub use orchestrator::{BatchRunner, CancelHandle, Cancellation, RunReport, RunStatus};
pub use services::{LedgerSummary, PromptSource, ResultLedger};
