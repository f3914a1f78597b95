/// 日志工具模块
///
/// 提供日志格式化和输出的辅助函数
use tracing::info;

use crate::config::Config;
use crate::orchestrator::{RunReport, RunStatus};
use crate::services::LedgerSummary;

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 批量 prompt 处理模式");
    info!("🤖 部署: {}", config.azure_deployment);
    info!("📁 结果文件: {}", config.results_file.display());
    if config.stop_after_limit {
        info!("📊 输出上限: {}", config.output_limit);
    } else {
        info!("📊 输出上限: 未启用");
    }
    info!("⏱️ 请求超时: {} 秒", config.request_timeout_seconds);
    info!("{}", "=".repeat(60));
}

/// 记录批次开始信息
///
/// # 参数
/// - `to_process`: 本次工作区间的 prompt 数量
/// - `existing`: 账本中已有的记录数
pub fn log_batch_start(to_process: usize, existing: usize) {
    info!("\n{}", "=".repeat(60));
    info!(
        "📦 开始处理: {} 个 prompt，已有 {} 条结果",
        to_process, existing
    );
    info!("{}", "=".repeat(60));
}

/// 打印本次运行的统计信息
pub fn print_final_stats(report: &RunReport) {
    info!("\n{}", "=".repeat(60));
    info!("📊 本次运行统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    match &report.status {
        RunStatus::NothingToDo(reason) => info!("💤 无需处理: {}", reason),
        RunStatus::Exhausted => info!("✅ 工作区间已全部处理"),
        RunStatus::LimitReached { limit } => info!("🛑 已达到输出上限 {}，提前停止", limit),
        RunStatus::Interrupted => info!("⚠️ 运行被中断，进度已保存"),
    }
    info!("✅ 本次写入: {}/{}", report.appended, report.attempted);
    info!("❌ 跳过: {}", report.skipped);
    info!("📁 账本记录总数: {}", report.total_recorded());
    info!("{}", "=".repeat(60));
}

/// 以文本横向柱状图输出按模型的统计
pub fn log_model_summary(summary: &LedgerSummary) {
    if summary.is_empty() {
        info!("📉 结果文件为空，暂无可统计的数据");
        return;
    }

    info!("\n{}", "─".repeat(60));
    info!("📈 Model Router - {}", summary.title);
    let max_count = summary.max_count();
    let name_width = summary
        .model_counts
        .iter()
        .map(|(model, _)| model.chars().count())
        .max()
        .unwrap_or(0);
    for (model, count) in &summary.model_counts {
        let bar_len = (count * 40).div_ceil(max_count);
        info!(
            "{:<width$} | {} {}",
            model,
            "█".repeat(bar_len),
            count,
            width = name_width
        );
    }
    info!("{}", "─".repeat(60));
}

/// 生成单行、截断后的 prompt 预览
///
/// 换行（`\n`、`\r\n`、`\r`）替换为空格，只保留前 `max_len` 个字符
pub fn prompt_preview(text: &str, max_len: usize) -> String {
    text.replace("\r\n", " ")
        .replace(['\r', '\n'], " ")
        .chars()
        .take(max_len)
        .collect()
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_preview_single_line() {
        assert_eq!(prompt_preview("a\nb\nc", 80), "a b c");
    }

    #[test]
    fn test_prompt_preview_handles_carriage_returns() {
        let preview = prompt_preview("line one\r\nline two\rthree", 80);
        assert_eq!(preview, "line one line two three");
        assert!(!preview.contains('\r'));
    }

    #[test]
    fn test_prompt_preview_truncates_by_chars() {
        let text = "你好".repeat(100);
        let preview = prompt_preview(&text, 80);
        assert_eq!(preview.chars().count(), 80);
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("abcdef", 3), "abc...");
        assert_eq!(truncate_text("abc", 3), "abc");
    }
}
