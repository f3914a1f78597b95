//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `run_plan` - 运行计划
//! - 由账本记录数、prompt 总数、输出上限算出工作区间
//!
//! ### `batch_runner` - 批量处理器
//! - 顺序遍历工作区间，逐条调用补全客户端
//! - 成功即追加到账本，失败只记日志并跳过
//! - 输出上限、取消、客户端释放
//!
//! ### `cancel` - 协作式取消
//!
//! ## 层次关系
//!
//! ```text
//! batch_runner (处理 &[String])
//!     ↓
//! clients::CompletionClient (处理单条 prompt)
//!     ↓
//! services::ResultLedger (落盘)
//! ```

pub mod batch_runner;
pub mod cancel;
pub mod run_plan;

pub use batch_runner::{BatchRunner, ProgressEvent, RunReport, RunStatus};
pub use cancel::{CancelHandle, Cancellation};
pub use run_plan::{NothingToDo, RunPlan};
