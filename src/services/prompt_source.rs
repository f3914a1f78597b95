//! prompt 来源服务 - 业务能力层
//!
//! 只负责"给出本次运行的 prompt 序列"能力：优先读本地缓存，
//! 缓存缺失或损坏时从上游数据集重新拉取并写回缓存。

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::clients::DatasetLoader;
use crate::error::{AppResult, StorageError};
use crate::models::CachedPrompt;

/// 缓存读取结果
enum CacheState {
    Missing,
    Corrupt(String),
    Valid(Vec<String>),
}

/// prompt 来源
pub struct PromptSource<L> {
    cache_path: PathBuf,
    loader: L,
}

impl<L: DatasetLoader> PromptSource<L> {
    pub fn new(cache_path: impl Into<PathBuf>, loader: L) -> Self {
        Self {
            cache_path: cache_path.into(),
            loader,
        }
    }

    /// 加载 prompt 序列
    ///
    /// 损坏的缓存不会被部分信任：整个文件丢弃后重新拉取。
    pub async fn load(&self) -> AppResult<Vec<String>> {
        match read_cache(&self.cache_path)? {
            CacheState::Valid(prompts) => {
                info!(
                    "✓ 从缓存加载 {} 条 prompt: {}",
                    prompts.len(),
                    self.cache_path.display()
                );
                return Ok(prompts);
            }
            CacheState::Corrupt(reason) => {
                warn!("⚠️ prompt 缓存无效 ({})，重新构建缓存", reason);
                if let Err(e) = fs::remove_file(&self.cache_path) {
                    warn!("删除无效缓存失败: {}", e);
                }
            }
            CacheState::Missing => {
                info!("📁 未找到 prompt 缓存，将从数据集拉取");
            }
        }

        let prompts = self.loader.fetch().await?;
        write_cache(&self.cache_path, &prompts)?;
        info!(
            "✓ 已写入 prompt 缓存 ({} 条): {}",
            prompts.len(),
            self.cache_path.display()
        );
        Ok(prompts)
    }
}

fn read_cache(path: &Path) -> AppResult<CacheState> {
    let file = match fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(CacheState::Missing),
        Err(e) => return Err(StorageError::read(path, e).into()),
    };

    let mut prompts = Vec::new();
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            // 非 UTF-8 同样视为损坏
            Err(e) => return Ok(CacheState::Corrupt(format!("第 {} 行: {}", line_no + 1, e))),
        };
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<CachedPrompt>(&line) {
            Ok(cached) => prompts.push(cached.prompt),
            Err(e) => return Ok(CacheState::Corrupt(format!("第 {} 行: {}", line_no + 1, e))),
        }
    }
    Ok(CacheState::Valid(prompts))
}

/// 先写临时文件再改名，中途崩溃不会留下被截断却"合法"的缓存
fn write_cache(path: &Path, prompts: &[String]) -> AppResult<()> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let file = fs::File::create(&tmp_path).map_err(|e| StorageError::create(&tmp_path, e))?;
    let mut writer = std::io::BufWriter::new(file);
    for prompt in prompts {
        let line = serde_json::to_string(&CachedPrompt {
            prompt: prompt.clone(),
        })
        .map_err(StorageError::from)?;
        writeln!(writer, "{}", line).map_err(|e| StorageError::write(&tmp_path, e))?;
    }
    writer
        .into_inner()
        .map_err(|e| StorageError::write(&tmp_path, e.into_error()))?
        .sync_all()
        .map_err(|e| StorageError::write(&tmp_path, e))?;

    fs::rename(&tmp_path, path).map_err(|e| StorageError::write(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    /// 记录调用次数的假数据集
    struct FakeDataset {
        prompts: Vec<String>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl DatasetLoader for FakeDataset {
        async fn fetch(&self) -> AppResult<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.prompts.clone())
        }
    }

    fn fake(prompts: &[&str]) -> (FakeDataset, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            FakeDataset {
                prompts: prompts.iter().map(|p| p.to_string()).collect(),
                calls: calls.clone(),
            },
            calls,
        )
    }

    #[tokio::test]
    async fn test_missing_cache_fetches_once() {
        let dir = TempDir::new().unwrap();
        let cache = dir.path().join("prompts_cache.jsonl");
        let (loader, calls) = fake(&["one", "two\nlines", "three"]);
        let source = PromptSource::new(&cache, loader);

        let first = source.load().await.unwrap();
        let second = source.load().await.unwrap();

        assert_eq!(first, vec!["one", "two\nlines", "three"]);
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let content = fs::read_to_string(&cache).unwrap();
        assert_eq!(content.lines().count(), 3);
        assert_eq!(content.lines().next(), Some(r#"{"prompt":"one"}"#));
    }

    #[tokio::test]
    async fn test_valid_cache_returned_verbatim() {
        let dir = TempDir::new().unwrap();
        let cache = dir.path().join("prompts_cache.jsonl");
        fs::write(&cache, "{\"prompt\":\"b\"}\n\n{\"prompt\":\"a\"}\n").unwrap();
        let (loader, calls) = fake(&["x"]);

        let prompts = PromptSource::new(&cache, loader).load().await.unwrap();

        assert_eq!(prompts, vec!["b", "a"]);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_corrupt_cache_refetched() {
        let dir = TempDir::new().unwrap();
        let cache = dir.path().join("prompts_cache.jsonl");
        fs::write(&cache, "{\"prompt\":\"stale\"}\n{not json\n").unwrap();
        let (loader, calls) = fake(&["fresh1", "fresh2"]);

        let prompts = PromptSource::new(&cache, loader).load().await.unwrap();

        assert_eq!(prompts, vec!["fresh1", "fresh2"]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!fs::read_to_string(&cache).unwrap().contains("stale"));
    }

    #[tokio::test]
    async fn test_missing_field_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let cache = dir.path().join("prompts_cache.jsonl");
        fs::write(&cache, "{\"prompt\":\"a\"}\n{\"text\":\"b\"}\n").unwrap();
        let (loader, calls) = fake(&["fresh"]);

        let prompts = PromptSource::new(&cache, loader).load().await.unwrap();

        assert_eq!(prompts, vec!["fresh"]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
