//! 结果账本服务 - 业务能力层
//!
//! 只负责"追加一条结果 / 统计已有结果"能力，不关心流程。
//! 账本的记录数就是断点续跑的唯一游标。

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use tracing::debug;

use crate::error::{AppResult, StorageError};
use crate::models::ResultRecord;

/// 结果账本
///
/// 职责：
/// - 以 JSON Lines 追加写入成功的结果
/// - 每次追加都 flush + fsync 之后才返回
/// - 只增不改，不提供更新与删除
pub struct ResultLedger {
    path: PathBuf,
}

impl ResultLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 统计已完成的记录数
    ///
    /// 文件不存在时创建空文件并返回 0。空行不计数；
    /// 末尾没有换行且无法解析的半行（进程在写入中途被杀）不计数。
    pub fn count(&self) -> AppResult<usize> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                File::create(&self.path).map_err(|e| StorageError::create(&self.path, e))?;
                debug!("结果文件不存在，已创建: {}", self.path.display());
                return Ok(0);
            }
            Err(e) => return Err(StorageError::read(&self.path, e).into()),
        };

        let mut reader = BufReader::new(file);
        let mut line = String::new();
        let mut count = 0;
        loop {
            line.clear();
            let read = reader
                .read_line(&mut line)
                .map_err(|e| StorageError::read(&self.path, e))?;
            if read == 0 {
                break;
            }
            if line.trim().is_empty() {
                continue;
            }
            if line.ends_with('\n') || serde_json::from_str::<ResultRecord>(&line).is_ok() {
                count += 1;
            }
        }
        Ok(count)
    }

    /// 追加一条记录，落盘后才返回
    pub fn append(&self, record: &ResultRecord) -> AppResult<()> {
        let mut line = serde_json::to_string(record).map_err(StorageError::from)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&self.path)
            .map_err(|e| StorageError::create(&self.path, e))?;

        // 上一次写入被打断时会留下没有换行的尾行：能解析就补换行，否则截掉
        match unterminated_tail(&mut file).map_err(|e| StorageError::read(&self.path, e))? {
            None => {}
            Some((_, tail)) if serde_json::from_str::<ResultRecord>(tail.trim()).is_ok() => {
                line.insert(0, '\n');
            }
            Some((keep, _)) => {
                debug!("截掉不完整的尾行，保留 {} 字节", keep);
                file.set_len(keep)
                    .map_err(|e| StorageError::write(&self.path, e))?;
            }
        }

        file.write_all(line.as_bytes())
            .and_then(|_| file.flush())
            .and_then(|_| file.sync_data())
            .map_err(|e| StorageError::write(&self.path, e))?;
        Ok(())
    }

    /// 读取全部记录（只读，供统计使用），无法解析的行被忽略
    pub fn records(&self) -> AppResult<Vec<ResultRecord>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::read(&self.path, e).into()),
        };

        let mut records = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| StorageError::read(&self.path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ResultRecord>(&line) {
                Ok(record) => records.push(record),
                Err(e) => debug!("跳过无法解析的结果行: {}", e),
            }
        }
        Ok(records)
    }
}

/// 返回没有换行结尾的尾行：(尾行之前的字节数, 尾行内容)
fn unterminated_tail(file: &mut File) -> std::io::Result<Option<(u64, String)>> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(None);
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    if last[0] == b'\n' {
        return Ok(None);
    }

    file.seek(SeekFrom::Start(0))?;
    let mut content = Vec::with_capacity(len as usize);
    file.read_to_end(&mut content)?;
    let keep = content
        .iter()
        .rposition(|b| *b == b'\n')
        .map_or(0, |pos| pos + 1);
    let tail = String::from_utf8_lossy(&content[keep..]).into_owned();
    Ok(Some((keep as u64, tail)))
}
