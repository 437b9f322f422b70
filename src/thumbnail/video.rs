//! 通过外部 ffmpeg 进程提取视频帧。

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::fs;
use tokio::process::Command;
use tokio::time;
use tracing::{debug, warn};

use super::ThumbnailError;
use crate::config::{ARTIFACT_PREFIX, THUMBNAIL_MAX_DIMENSION, VIDEO_FRAME_TIMESTAMP};

const STDERR_TAIL: usize = 512;

/// 从 `source` 截取一帧，输出宽 300px 的 JPEG。
///
/// 解码器写入 `temp_dir` 下唯一命名的临时产物。任何返回路径上产物都会被删除：
/// 成功时读回后显式删除，出错、超时或 panic 时由 drop 守卫删除。
/// 超过 `timeout` 的解码进程会被杀掉。
pub async fn extract_frame(
    ffmpeg: &Path,
    source: &Path,
    temp_dir: &Path,
    timeout: Duration,
) -> Result<Vec<u8>, ThumbnailError> {
    let artifact = tempfile::Builder::new()
        .prefix(ARTIFACT_PREFIX)
        .suffix(".jpg")
        .tempfile_in(temp_dir)
        .map_err(|err| ThumbnailError::Decode(format!("cannot create decode artifact: {err}")))?
        .into_temp_path();

    let mut command = Command::new(ffmpeg);
    command
        .args(["-nostdin", "-loglevel", "error", "-y", "-i"])
        .arg(source)
        .args(["-ss", VIDEO_FRAME_TIMESTAMP, "-frames:v", "1"])
        .arg("-vf")
        .arg(format!("scale={THUMBNAIL_MAX_DIMENSION}:-1"))
        .args(["-q:v", "2"])
        .arg(artifact.as_os_str())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    debug!(source = ?source, artifact = ?artifact, "spawning video decoder");

    let child = command
        .spawn()
        .map_err(|err| ThumbnailError::Decode(format!("failed to start video decoder: {err}")))?;
    let output = match time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => result
            .map_err(|err| ThumbnailError::Decode(format!("video decoder failed: {err}")))?,
        Err(_) => {
            warn!(source = ?source, timeout_secs = timeout.as_secs_f64(), "video decoder timed out, killed");
            return Err(ThumbnailError::Decode(format!(
                "video decoder timed out after {:.1}s",
                timeout.as_secs_f64()
            )));
        }
    };
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ThumbnailError::Decode(format!(
            "video decoder exited with {}: {}",
            output.status,
            stderr_tail(&stderr)
        )));
    }

    let frame = fs::read(&artifact).await;
    if let Err(err) = artifact.close() {
        warn!(error = %err, "failed to remove decode artifact");
    }
    let frame = frame.map_err(|err| ThumbnailError::Decode(format!("cannot read frame: {err}")))?;
    if frame.is_empty() {
        return Err(ThumbnailError::Decode(
            "no frame at the requested timestamp".into(),
        ));
    }
    Ok(frame)
}

fn stderr_tail(stderr: &str) -> &str {
    let trimmed = stderr.trim();
    if trimmed.len() <= STDERR_TAIL {
        return trimmed;
    }
    let mut start = trimmed.len() - STDERR_TAIL;
    while !trimmed.is_char_boundary(start) {
        start += 1;
    }
    &trimmed[start..]
}
