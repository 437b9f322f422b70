//! 上传暂存与原子落盘。

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::warn;
use uuid::Uuid;

use crate::storage::StorageError;

/// 正在写入暂存目录的上传文件。
///
/// 只有 [`StagedFile::persist`] 把它 rename 到目标位置后内容才可见，在此之前
/// 目标保持原内容。
pub struct StagedFile {
    temp_path: PathBuf,
    file: File,
    written: u64,
}

impl StagedFile {
    pub async fn new(staging_dir: &Path) -> io::Result<Self> {
        fs::create_dir_all(staging_dir).await?;
        let temp_path = staging_dir.join(format!("{}.part", Uuid::new_v4()));
        let file = File::create(&temp_path).await?;
        Ok(Self {
            temp_path,
            file,
            written: 0,
        })
    }

    pub async fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.file.write_all(chunk).await?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    /// 丢弃暂存数据。
    pub async fn cleanup(self) {
        drop(self.file);
        if let Err(err) = fs::remove_file(&self.temp_path).await {
            warn!(path = ?self.temp_path, error = %err, "failed to remove staged upload");
        }
    }

    /// 刷盘并 rename 覆盖 `target`；失败时删除暂存文件。
    pub async fn persist(mut self, target: &Path) -> Result<(), StorageError> {
        let flushed = async {
            self.file.flush().await?;
            self.file.sync_all().await
        }
        .await;
        if let Err(err) = flushed {
            self.cleanup().await;
            return Err(err.into());
        }
        drop(self.file);

        if let Err(err) = fs::rename(&self.temp_path, target).await {
            if let Err(cleanup_err) = fs::remove_file(&self.temp_path).await {
                warn!(path = ?self.temp_path, error = %cleanup_err, "failed to remove staged upload");
            }
            return Err(StorageError::Unavailable(err));
        }
        Ok(())
    }
}
