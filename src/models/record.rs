use serde::{Deserialize, Serialize};

/// 结果账本中的一条记录
///
/// 字段顺序即写入 JSON 的顺序：`prompt`、`model`、`output`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub prompt: String,
    pub model: String,
    pub output: String,
}

/// prompt 缓存文件中的一行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedPrompt {
    pub prompt: String,
}
