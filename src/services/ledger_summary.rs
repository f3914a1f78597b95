//! 账本统计服务 - 业务能力层
//!
//! 只读地消费结果文件：按 `model` 计数，并从文件名推导标题后缀

use std::collections::HashMap;
use std::path::Path;

use crate::error::AppResult;
use crate::services::ResultLedger;

/// 单个结果文件的按模型统计
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerSummary {
    /// 从文件名推导的标题后缀
    pub title: String,
    /// (模型名, 记录数)，按数量降序，数量相同按模型名升序
    pub model_counts: Vec<(String, usize)>,
}

impl LedgerSummary {
    pub fn from_ledger(path: &Path) -> AppResult<Self> {
        let records = ResultLedger::new(path).records()?;

        let mut counts: HashMap<String, usize> = HashMap::new();
        for record in records {
            *counts.entry(record.model).or_default() += 1;
        }

        let mut model_counts: Vec<_> = counts.into_iter().collect();
        model_counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        Ok(Self {
            title: title_suffix(path),
            model_counts,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.model_counts.is_empty()
    }

    pub fn total(&self) -> usize {
        self.model_counts.iter().map(|(_, c)| c).sum()
    }

    pub fn max_count(&self) -> usize {
        self.model_counts.first().map_or(0, |(_, c)| *c)
    }
}

/// 从文件名推导标题后缀
///
/// `results_Balanced.jsonl` → `Balanced`，`results_low_cost.jsonl` → `Low Cost`；
/// 没有下划线时使用整个文件名主干。
pub fn title_suffix(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let suffix = match stem.split_once('_') {
        Some((_, rest)) => rest,
        None => stem.as_str(),
    };

    suffix
        .split('_')
        .filter(|word| !word.is_empty())
        .map(title_case)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(|c| c.to_lowercase()))
            .collect(),
        None => String::new(),
    }
}
