//! 定期清理遗留的解码产物与上传暂存文件。
//!
//! 两者正常情况下由创建它们的请求删除，遗留的只可能来自崩溃或请求中途被杀。

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::fs;
use tracing::{info, warn};

use crate::config::{ARTIFACT_PREFIX, ARTIFACT_SWEEP_INTERVAL_SECS};
use crate::storage::Storage;
use crate::thumbnail::ThumbnailConfig;

/// 启动清理任务，`ttl` 为 0 时不启动。
pub fn spawn_background_tasks(
    storage: Arc<Storage>,
    thumbnails: Arc<ThumbnailConfig>,
    ttl: Duration,
) {
    if ttl.is_zero() {
        return;
    }

    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_secs(ARTIFACT_SWEEP_INTERVAL_SECS));
        loop {
            interval.tick().await;
            if let Err(err) = sweep_stale(&thumbnails.temp_dir, ttl, is_decode_artifact).await {
                warn!(error = %err, "decode artifact sweep failed");
            }
            if let Err(err) = sweep_stale(&storage.staging_dir(), ttl, is_staged_upload).await {
                warn!(error = %err, "staging sweep failed");
            }
        }
    });
}

fn is_decode_artifact(name: &str) -> bool {
    name.starts_with(ARTIFACT_PREFIX) && name.ends_with(".jpg")
}

fn is_staged_upload(name: &str) -> bool {
    name.ends_with(".part")
}

/// 删除 `dir` 中匹配 `select` 且修改时间早于 `ttl` 的文件，返回删除数量。
pub async fn sweep_stale(
    dir: &Path,
    ttl: Duration,
    select: fn(&str) -> bool,
) -> Result<usize, std::io::Error> {
    if fs::metadata(dir).await.is_err() {
        return Ok(0);
    }

    let now = SystemTime::now();
    let mut removed = 0;
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        if !select(&name.to_string_lossy()) {
            continue;
        }
        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }
        let Ok(modified) = metadata.modified() else {
            continue;
        };
        let Ok(age) = now.duration_since(modified) else {
            continue;
        };
        if age < ttl {
            continue;
        }
        let path = entry.path();
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!(path = ?path, age_secs = age.as_secs(), "removed orphaned temp file");
                removed += 1;
            }
            Err(err) => warn!(path = ?path, error = %err, "failed to remove orphaned temp file"),
        }
    }

    Ok(removed)
}
