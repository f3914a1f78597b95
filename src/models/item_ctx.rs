//! 单条 prompt 的处理上下文
//!
//! 封装"我正在处理第几条 prompt"这一信息，只用于日志

use std::fmt::Display;

use crate::utils::logging::prompt_preview;

/// 预览长度（字符数）
pub const PREVIEW_CHARS: usize = 80;

/// 单条 prompt 处理上下文
#[derive(Debug, Clone)]
pub struct ItemCtx {
    /// 在整个 prompt 序列中的绝对位置（从 1 开始）
    pub absolute_index: usize,
    /// 单行、截断后的 prompt 预览
    pub preview: String,
}

impl ItemCtx {
    /// `position` 为从 0 开始的序列下标
    pub fn new(position: usize, prompt: &str) -> Self {
        Self {
            absolute_index: position + 1,
            preview: prompt_preview(prompt, PREVIEW_CHARS),
        }
    }
}

impl Display for ItemCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.absolute_index)
    }
}
