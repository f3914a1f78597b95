//! 批量处理器 - 编排层
//!
//! ## 职责
//!
//! 驱动一次完整的运行：从账本记录数算出工作区间，顺序提交每条 prompt，
//! 成功的结果立即落盘。
//!
//! ## 核心功能
//!
//! 1. **断点续跑**：账本记录数是唯一的进度来源，每次运行都重新统计
//! 2. **失败隔离**：超时、空响应、服务错误只记日志并跳过，不中断运行
//! 3. **输出上限**：启用时账本记录总数不超过上限
//! 4. **取消**：在条目之间检查，并与进行中的请求竞争；被放弃的请求不留记录
//! 5. **资源释放**：无论以何种方式结束，补全客户端都恰好释放一次

use tracing::{info, warn};

use crate::clients::{CompletionClient, Outcome};
use crate::config::RunnerOptions;
use crate::error::AppResult;
use crate::models::{ItemCtx, ResultRecord};
use crate::orchestrator::cancel::Cancellation;
use crate::orchestrator::run_plan::{NothingToDo, RunPlan};
use crate::services::ResultLedger;
use crate::utils::logging::{log_batch_start, truncate_text};

/// 运行结束状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// 没有提交任何请求
    NothingToDo(NothingToDo),
    /// 工作区间已处理完
    Exhausted,
    /// 达到输出上限后停止
    LimitReached { limit: usize },
    /// 被操作者取消
    Interrupted,
}

/// 运行报告
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub status: RunStatus,
    /// 运行前账本中的记录数
    pub pre_run_count: usize,
    /// 本次写入的记录数
    pub appended: usize,
    /// 本次跳过的条目数（超时 / 空响应 / 失败）
    pub skipped: usize,
    /// 本次提交过的条目数（含被取消时正在进行的那一条）
    pub attempted: usize,
}

impl RunReport {
    fn new(pre_run_count: usize, status: RunStatus) -> Self {
        Self {
            status,
            pre_run_count,
            appended: 0,
            skipped: 0,
            attempted: 0,
        }
    }

    /// 运行结束后账本中的记录总数
    pub fn total_recorded(&self) -> usize {
        self.pre_run_count + self.appended
    }
}

/// 进度事件，每成功写入一条触发一次
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    /// 刚写入的 prompt 的绝对位置（从 1 开始）
    pub absolute_index: usize,
    /// 账本当前记录数
    pub recorded: usize,
    /// 本次运行结束时账本最多能达到的记录数
    pub target: usize,
}

type ProgressHook = Box<dyn FnMut(&ProgressEvent) + Send>;

/// 批量处理器
pub struct BatchRunner<C> {
    client: C,
    ledger: ResultLedger,
    options: RunnerOptions,
    cancellation: Cancellation,
    on_progress: Option<ProgressHook>,
}

impl<C: CompletionClient> BatchRunner<C> {
    pub fn new(client: C, ledger: ResultLedger, options: RunnerOptions) -> Self {
        Self {
            client,
            ledger,
            options,
            cancellation: Cancellation::never(),
            on_progress: None,
        }
    }

    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn with_progress(mut self, hook: impl FnMut(&ProgressEvent) + Send + 'static) -> Self {
        self.on_progress = Some(Box::new(hook));
        self
    }

    /// 执行一次运行
    ///
    /// 只有致命错误（账本读写失败）才返回 `Err`；
    /// 返回前补全客户端总会被释放。
    pub async fn run(mut self, prompts: &[String]) -> AppResult<RunReport> {
        let result = self.process(prompts).await;
        self.client.close().await;

        if let Ok(report) = &result {
            match report.status {
                RunStatus::LimitReached { limit } => {
                    info!("🛑 输出上限 {} 已达到，提前停止", limit)
                }
                RunStatus::Interrupted => info!(
                    "⚠️ 运行被用户中断，进度已保存（本次写入 {} 条，共 {} 条）",
                    report.appended,
                    report.total_recorded()
                ),
                RunStatus::NothingToDo(_) | RunStatus::Exhausted => {}
            }
        }
        result
    }

    async fn process(&mut self, prompts: &[String]) -> AppResult<RunReport> {
        let processed = self.ledger.count()?;
        let limit = self.options.output_limit;

        let (start, end) = match RunPlan::compute(processed, prompts.len(), limit) {
            RunPlan::Done(reason) => {
                info!("💤 {}，无需处理", reason);
                return Ok(RunReport::new(processed, RunStatus::NothingToDo(reason)));
            }
            RunPlan::Work { start, end } => (start, end),
        };

        log_batch_start(end - start, processed);

        let mut report = RunReport::new(processed, RunStatus::Exhausted);
        for (offset, prompt) in prompts[start..end].iter().enumerate() {
            if self.cancellation.is_cancelled() {
                report.status = RunStatus::Interrupted;
                break;
            }
            if let Some(limit) = limit {
                if report.total_recorded() >= limit {
                    report.status = RunStatus::LimitReached { limit };
                    break;
                }
            }

            let ctx = ItemCtx::new(start + offset, prompt);
            info!("[{}] 处理中: {}", ctx, ctx.preview);
            report.attempted += 1;

            let outcome = tokio::select! {
                biased;
                _ = self.cancellation.cancelled() => None,
                outcome = self.client.submit(prompt, &self.options.deployment) => Some(outcome),
            };
            let Some(outcome) = outcome else {
                warn!("[{}] 运行被取消，放弃进行中的请求", ctx);
                report.status = RunStatus::Interrupted;
                break;
            };

            match outcome {
                Outcome::Completed {
                    model_name,
                    output_text,
                } => {
                    let record = ResultRecord {
                        prompt: prompt.clone(),
                        model: model_name,
                        output: output_text,
                    };
                    self.ledger.append(&record)?;
                    report.appended += 1;

                    let event = ProgressEvent {
                        absolute_index: ctx.absolute_index,
                        recorded: report.total_recorded(),
                        target: end,
                    };
                    info!(
                        "[{}] ✓ 已记录 (模型 '{}')，进度 {}/{}",
                        ctx, record.model, event.recorded, event.target
                    );
                    if let Some(hook) = self.on_progress.as_mut() {
                        hook(&event);
                    }
                }
                Outcome::TimedOut => {
                    warn!(
                        "[{}] ⏱️ {} 秒内未响应，跳过。预览: {}",
                        ctx,
                        self.options.request_timeout.as_secs(),
                        ctx.preview
                    );
                    report.skipped += 1;
                }
                Outcome::EmptyResponse => {
                    warn!("[{}] ⚠️ 返回的候选为空，跳过。预览: {}", ctx, ctx.preview);
                    report.skipped += 1;
                }
                Outcome::Failed { error_description } => {
                    warn!(
                        "[{}] ❌ 调用失败: {}，跳过。预览: {}",
                        ctx,
                        truncate_text(&error_description, 300),
                        ctx.preview
                    );
                    report.skipped += 1;
                }
            }
        }

        if report.status == RunStatus::Exhausted {
            if let Some(limit) = limit {
                if report.total_recorded() >= limit {
                    report.status = RunStatus::LimitReached { limit };
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tempfile::TempDir;

    /// 按脚本返回结果的假客户端
    struct ScriptedClient {
        script: VecDeque<Outcome>,
        submitted: Arc<Mutex<Vec<String>>>,
        closes: Arc<Mutex<usize>>,
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        async fn submit(&mut self, prompt: &str, _deployment: &str) -> Outcome {
            self.submitted.lock().unwrap().push(prompt.to_string());
            self.script.pop_front().unwrap_or(Outcome::Completed {
                model_name: "m".to_string(),
                output_text: format!("out:{}", prompt),
            })
        }

        async fn close(&mut self) {
            *self.closes.lock().unwrap() += 1;
        }
    }

    fn options(limit: Option<usize>) -> RunnerOptions {
        RunnerOptions {
            deployment: "router".to_string(),
            output_limit: limit,
            request_timeout: Duration::from_secs(60),
        }
    }

    fn prompts(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("p{}", i)).collect()
    }

    #[tokio::test]
    async fn test_ledger_error_still_closes_client() {
        let dir = TempDir::new().unwrap();
        // 目录当作文件打开会失败
        let ledger = ResultLedger::new(dir.path());
        let closes = Arc::new(Mutex::new(0));
        let client = ScriptedClient {
            script: VecDeque::new(),
            submitted: Arc::default(),
            closes: closes.clone(),
        };

        let result = BatchRunner::new(client, ledger, options(None))
            .run(&prompts(2))
            .await;

        assert!(result.is_err());
        assert_eq!(*closes.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failures_are_skipped_not_recorded() {
        let dir = TempDir::new().unwrap();
        let ledger_path = dir.path().join("results.jsonl");
        let submitted = Arc::new(Mutex::new(Vec::new()));
        let client = ScriptedClient {
            script: VecDeque::from([
                Outcome::EmptyResponse,
                Outcome::Failed {
                    error_description: "boom".to_string(),
                },
            ]),
            submitted: submitted.clone(),
            closes: Arc::default(),
        };

        let report = BatchRunner::new(client, ResultLedger::new(&ledger_path), options(None))
            .run(&prompts(3))
            .await
            .unwrap();

        assert_eq!(report.status, RunStatus::Exhausted);
        assert_eq!(report.appended, 1);
        assert_eq!(report.skipped, 2);
        assert_eq!(submitted.lock().unwrap().len(), 3);

        let records = ResultLedger::new(&ledger_path).records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].prompt, "p2");
    }

    #[tokio::test]
    async fn test_empty_output_still_recorded() {
        let dir = TempDir::new().unwrap();
        let ledger_path = dir.path().join("results.jsonl");
        let client = ScriptedClient {
            script: VecDeque::from([Outcome::Completed {
                model_name: "m".to_string(),
                output_text: String::new(),
            }]),
            submitted: Arc::default(),
            closes: Arc::default(),
        };

        let report = BatchRunner::new(client, ResultLedger::new(&ledger_path), options(None))
            .run(&prompts(1))
            .await
            .unwrap();

        assert_eq!(report.appended, 1);
        assert_eq!(ResultLedger::new(&ledger_path).records().unwrap()[0].output, "");
    }

    #[tokio::test]
    async fn test_progress_events_are_monotonic() {
        let dir = TempDir::new().unwrap();
        let ledger_path = dir.path().join("results.jsonl");
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let client = ScriptedClient {
            script: VecDeque::from([
                Outcome::Completed {
                    model_name: "m".to_string(),
                    output_text: "a".to_string(),
                },
                Outcome::TimedOut,
            ]),
            submitted: Arc::default(),
            closes: Arc::default(),
        };

        BatchRunner::new(client, ResultLedger::new(&ledger_path), options(None))
            .with_progress(move |event| sink.lock().unwrap().push(*event))
            .run(&prompts(4))
            .await
            .unwrap();

        let events = events.lock().unwrap();
        let indices: Vec<_> = events.iter().map(|e| e.absolute_index).collect();
        let recorded: Vec<_> = events.iter().map(|e| e.recorded).collect();
        assert_eq!(indices, vec![1, 3, 4]);
        assert_eq!(recorded, vec![1, 2, 3]);
        assert!(events.iter().all(|e| e.target == 4));
    }
}
