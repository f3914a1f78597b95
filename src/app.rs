use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::clients::{AzureCompletionClient, HfDatasetClient};
use crate::config::Config;
use crate::orchestrator::{BatchRunner, Cancellation, RunReport};
use crate::services::{LedgerSummary, PromptSource, ResultLedger};
use crate::utils::logging::{log_model_summary, log_startup, print_final_stats};

/// 应用主结构
pub struct App {
    config: Config,
}

impl App {
    /// 初始化应用
    pub fn initialize(config: Config) -> Self {
        log_startup(&config);
        Self { config }
    }

    /// 运行应用主逻辑：加载 prompt → 批量处理 → 输出统计
    pub async fn run(&self) -> Result<RunReport> {
        let prompts = PromptSource::new(
            &self.config.prompt_cache_file,
            HfDatasetClient::new(&self.config),
        )
        .load()
        .await
        .context("加载 prompt 失败")?;

        let (cancel_handle, cancellation) = Cancellation::channel();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("\n⚠️ 收到中断信号，正在停止...");
                cancel_handle.cancel();
            }
        });

        let runner = BatchRunner::new(
            AzureCompletionClient::new(&self.config),
            ResultLedger::new(&self.config.results_file),
            self.config.runner_options(),
        )
        .with_cancellation(cancellation);

        let report = runner
            .run(&prompts)
            .await
            .with_context(|| format!("处理失败: {}", self.config.results_file.display()))?;

        print_final_stats(&report);
        self.log_summary();

        Ok(report)
    }

    fn log_summary(&self) {
        match LedgerSummary::from_ledger(&self.config.results_file) {
            Ok(summary) => log_model_summary(&summary),
            Err(e) => warn!("统计结果文件失败: {}", e),
        }
        info!("\n结果已保存至: {}", self.config.results_file.display());
    }
}
