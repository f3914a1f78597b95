/// 上游数据集客户端
///
/// 通过 Hugging Face datasets-server 的 `/rows` 接口分页拉取 prompt 列
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{AppResult, DatasetError};

/// `/rows` 接口单页最多返回的行数
const PAGE_SIZE: usize = 100;

/// 上游数据集加载器
///
/// 对给定的数据集必须返回确定、稳定顺序的 prompt 列表
#[async_trait]
pub trait DatasetLoader: Send + Sync {
    async fn fetch(&self) -> AppResult<Vec<String>>;
}

/// Hugging Face datasets-server 客户端
pub struct HfDatasetClient {
    http: reqwest::Client,
    api_base: String,
    dataset: String,
    split: String,
    column: String,
}

#[derive(Debug, Deserialize)]
struct RowsPage {
    rows: Vec<RowEntry>,
    num_rows_total: usize,
}

#[derive(Debug, Deserialize)]
struct RowEntry {
    row_idx: usize,
    row: serde_json::Map<String, serde_json::Value>,
}

impl HfDatasetClient {
    pub fn new(config: &Config) -> Self {
        Self::with_endpoint(
            &config.dataset_api_base,
            &config.dataset_id,
            &config.dataset_split,
        )
    }

    pub fn with_endpoint(api_base: &str, dataset: &str, split: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            dataset: dataset.to_string(),
            split: split.to_string(),
            column: "prompt".to_string(),
        }
    }

    async fn fetch_page(&self, offset: usize) -> AppResult<RowsPage> {
        let endpoint = format!("{}/rows", self.api_base);
        let request_failed = |source| DatasetError::RequestFailed {
            endpoint: endpoint.clone(),
            source,
        };

        let offset = offset.to_string();
        let length = PAGE_SIZE.to_string();
        let page = self
            .http
            .get(&endpoint)
            .query(&[
                ("dataset", self.dataset.as_str()),
                ("config", "default"),
                ("split", self.split.as_str()),
                ("offset", offset.as_str()),
                ("length", length.as_str()),
            ])
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(request_failed)?
            .json::<RowsPage>()
            .await
            .map_err(request_failed)?;
        Ok(page)
    }
}

#[async_trait]
impl DatasetLoader for HfDatasetClient {
    async fn fetch(&self) -> AppResult<Vec<String>> {
        info!("🌐 正在下载数据集 {} ({})", self.dataset, self.split);

        let mut prompts = Vec::new();
        loop {
            let page = self.fetch_page(prompts.len()).await?;
            if page.rows.is_empty() {
                break;
            }
            for entry in page.rows {
                let prompt = entry
                    .row
                    .get(&self.column)
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| DatasetError::MissingColumn {
                        row_idx: entry.row_idx,
                        column: self.column.clone(),
                    })?;
                prompts.push(prompt.to_string());
            }
            debug!("已下载 {}/{} 行", prompts.len(), page.num_rows_total);
            if prompts.len() >= page.num_rows_total {
                break;
            }
        }

        info!("✓ 数据集下载完成，共 {} 条 prompt", prompts.len());
        Ok(prompts)
    }
}
