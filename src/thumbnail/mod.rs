//! 图片与视频缩略图。
//!
//! 按扩展名分类：图片在进程内解码缩小（[`raster`]），视频交给 ffmpeg 取一帧
//! （[`video`]）。不做缓存，每次请求重新生成。

pub mod raster;
pub mod video;

use axum::extract::{Extension, Query};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tracing::info;

use crate::error::ApiError;
use crate::storage::{Storage, StorageError, Tenant};

#[derive(Debug, thiserror::Error)]
pub enum ThumbnailError {
    #[error("unsupported file type: {0}")]
    UnsupportedMediaType(String),
    #[error("decode failed: {0}")]
    Decode(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "bmp", "tiff", "tif", "ico", "heic", "heif",
];
const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "avi", "mkv", "mov", "wmv", "flv", "webm", "m4v", "mpg", "mpeg", "3gp", "ts", "mts",
];

/// 图片扩展名对应的解码方式。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageCodec {
    Jpeg,
    Png,
    /// 只取第一帧。
    Gif,
    /// 按内容识别格式。
    Detect,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Image(ImageCodec),
    Video,
    Unsupported,
}

impl MediaKind {
    pub fn classify(path: &Path) -> Self {
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let extension = extension.as_str();
        if IMAGE_EXTENSIONS.contains(&extension) {
            let codec = match extension {
                "jpg" | "jpeg" => ImageCodec::Jpeg,
                "png" => ImageCodec::Png,
                "gif" => ImageCodec::Gif,
                _ => ImageCodec::Detect,
            };
            MediaKind::Image(codec)
        } else if VIDEO_EXTENSIONS.contains(&extension) {
            MediaKind::Video
        } else {
            MediaKind::Unsupported
        }
    }
}

#[derive(Debug)]
pub struct ThumbnailConfig {
    pub ffmpeg_path: PathBuf,
    /// 临时解码产物目录。
    pub temp_dir: PathBuf,
    pub decode_timeout: Duration,
}

impl ThumbnailConfig {
    /// 为租户内相对路径生成 JPEG 缩略图。
    pub async fn generate(&self, tenant: &Tenant, relative: &str) -> Result<Vec<u8>, ThumbnailError> {
        let source = tenant.resolve(relative)?;
        match MediaKind::classify(&source) {
            MediaKind::Unsupported => Err(ThumbnailError::UnsupportedMediaType(
                crate::catalog::extension_of(relative),
            )),
            MediaKind::Image(codec) => {
                check_source(tenant, &source).await?;
                let file = fs::File::open(&source)
                    .await
                    .map_err(StorageError::from)?
                    .into_std()
                    .await;
                tokio::task::spawn_blocking(move || raster::render(BufReader::new(file), codec))
                    .await
                    .map_err(|err| ThumbnailError::Decode(err.to_string()))?
            }
            MediaKind::Video => {
                check_source(tenant, &source).await?;
                video::extract_frame(
                    &self.ffmpeg_path,
                    &source,
                    &self.temp_dir,
                    self.decode_timeout,
                )
                .await
            }
        }
    }
}

async fn check_source(tenant: &Tenant, source: &Path) -> Result<(), StorageError> {
    tenant.check_resolved(source, false).await?;
    if fs::metadata(source).await?.is_dir() {
        return Err(StorageError::InvalidPath);
    }
    Ok(())
}

#[derive(Deserialize)]
pub(crate) struct ThumbnailQuery {
    user: Option<String>,
    path: Option<String>,
}

/// 返回图片或视频的 JPEG 预览。
pub async fn get_thumbnail(
    Query(query): Query<ThumbnailQuery>,
    Extension(storage): Extension<Arc<Storage>>,
    Extension(thumbnails): Extension<Arc<ThumbnailConfig>>,
) -> Result<Response, ApiError> {
    let user = query
        .user
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::missing("user"))?;
    let path = query
        .path
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::missing("path"))?;

    let tenant = storage.tenant(&user).await?;
    let jpeg = thumbnails.generate(&tenant, &path).await?;
    info!(user, path, bytes = jpeg.len(), "thumbnail generated");

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("image/jpeg"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    Ok((StatusCode::OK, headers, jpeg).into_response())
}
