//! 文件列表、上传下载与目录操作处理器。

use axum::body::Body as AxumBody;
use axum::extract::{Extension, Multipart, Query};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Json as JsonResponse, Response};
use httpdate::{fmt_http_date, parse_http_date};
use serde::{Deserialize, Serialize};
use std::io::SeekFrom;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use crate::catalog::{self, FileEntry, SkippedEntry};
use crate::error::ApiError;
use crate::etag::{is_not_modified, weak_etag};
use crate::http::FormParams;
use crate::mutation;
use crate::sandbox::validate_name;
use crate::staging::StagedFile;
use crate::storage::{Storage, StorageError};

/// 接收上传时的限制。
#[derive(Debug)]
pub struct UploadLimits {
    /// 为 0 时不限制。
    pub max_size: u64,
}

#[derive(Deserialize)]
pub(crate) struct PathQuery {
    user: Option<String>,
    path: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct TransferForm {
    user: Option<String>,
    src: Option<String>,
    dst: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RenameForm {
    user: Option<String>,
    old_path: Option<String>,
    new_name: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct MkdirForm {
    user: Option<String>,
    path: Option<String>,
    name: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    files: Vec<FileEntry>,
    current_path: String,
    skipped: Vec<SkippedEntry>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ack {
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    files: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    skipped: Option<Vec<SkippedEntry>>,
}

impl Ack {
    fn message(message: &'static str) -> JsonResponse<Self> {
        JsonResponse(Self {
            message,
            filename: None,
            files: None,
            skipped: None,
        })
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    value
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::missing(field))
}

fn or_root(value: Option<String>) -> String {
    value
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "/".to_string())
}

/// 列出目录内容。
pub async fn list_files(
    Query(query): Query<PathQuery>,
    Extension(storage): Extension<Arc<Storage>>,
) -> Result<JsonResponse<ListResponse>, ApiError> {
    let user = required(query.user, "user")?;
    let path = or_root(query.path);
    let tenant = storage.tenant(&user).await?;
    let listing = catalog::list_dir(&tenant, &path).await?;
    info!(
        user,
        path,
        count = listing.entries.len(),
        skipped = listing.skipped.len(),
        "list files"
    );
    Ok(JsonResponse(ListResponse {
        files: listing.entries,
        current_path: path,
        skipped: listing.skipped,
    }))
}

/// 下载文件，支持单段 Range 与条件请求。
pub async fn download_file(
    Query(query): Query<PathQuery>,
    request_headers: HeaderMap,
    Extension(storage): Extension<Arc<Storage>>,
) -> Result<Response, ApiError> {
    let user = required(query.user, "user")?;
    let path = required(query.path, "path")?;
    let tenant = storage.tenant(&user).await?;
    let target = tenant.resolve_checked(&path, false).await?;
    let metadata = fs::metadata(&target).await.map_err(StorageError::from)?;
    if metadata.is_dir() {
        return Err(ApiError::BadRequest("path is not a file".into()));
    }
    let file_size = metadata.len();
    let modified = metadata.modified().ok();
    let last_modified = modified.map(fmt_http_date);
    let mime = mime_guess::from_path(&target).first_or_octet_stream();
    let etag = weak_etag(&metadata);

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        header::ETAG,
        HeaderValue::from_str(&etag).map_err(|_| ApiError::Internal("invalid header".into()))?,
    );
    if let Some(value) = last_modified.as_deref() {
        response_headers.insert(
            header::LAST_MODIFIED,
            HeaderValue::from_str(value).map_err(|_| ApiError::Internal("invalid header".into()))?,
        );
    }
    if is_not_modified(&request_headers, &etag) {
        return Ok((StatusCode::NOT_MODIFIED, response_headers).into_response());
    }
    response_headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(mime.essence_str())
            .map_err(|_| ApiError::Internal("invalid mime type".into()))?,
    );
    response_headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));

    let if_range_matches = match request_headers
        .get(header::IF_RANGE)
        .and_then(|value| value.to_str().ok())
    {
        Some(value) if value.trim() == etag => true,
        Some(value) => match parse_http_date(value) {
            Ok(date) => modified.map(|ts| ts <= date).unwrap_or(false),
            Err(_) => false,
        },
        None => true,
    };

    let range = if if_range_matches {
        ByteRange::parse(request_headers.get(header::RANGE), file_size)?
    } else {
        None
    };

    let file = File::open(&target).await.map_err(StorageError::from)?;

    if let Some(ByteRange { start, end }) = range {
        let length = end - start + 1;
        debug!(user, path, start, end, length, "download range request accepted");
        let mut file = file;
        file.seek(SeekFrom::Start(start))
            .await
            .map_err(StorageError::from)?;
        let stream = ReaderStream::new(file.take(length));
        response_headers.insert(
            header::CONTENT_RANGE,
            HeaderValue::from_str(&format!("bytes {}-{}/{}", start, end, file_size))
                .map_err(|_| ApiError::Internal("invalid header".into()))?,
        );
        response_headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
        return Ok((
            StatusCode::PARTIAL_CONTENT,
            response_headers,
            AxumBody::from_stream(stream),
        )
            .into_response());
    }

    response_headers.insert(header::CONTENT_LENGTH, HeaderValue::from(file_size));
    info!(user, path, size = file_size, "download file");
    let stream = ReaderStream::new(file);
    Ok((
        StatusCode::OK,
        response_headers,
        AxumBody::from_stream(stream),
    )
        .into_response())
}

/// 接收 multipart 上传（`user`、`path`、`file` 顺序不限）。
///
/// 文件先写入暂存区，再 rename 到 `<path>/<filename>`，同名文件被替换。
pub async fn upload_file(
    Extension(storage): Extension<Arc<Storage>>,
    Extension(limits): Extension<Arc<UploadLimits>>,
    mut multipart: Multipart,
) -> Result<JsonResponse<Ack>, ApiError> {
    let mut user = None;
    let mut path = None;
    let mut staged: Option<(String, StagedFile)> = None;

    let received: Result<(), ApiError> = async {
        while let Some(mut field) = multipart
            .next_field()
            .await
            .map_err(|err| ApiError::BadRequest(err.body_text()))?
        {
            let name = field.name().map(str::to_string);
            match name.as_deref() {
                Some("user") => user = Some(read_text(field).await?),
                Some("path") => path = Some(read_text(field).await?),
                Some("file") if staged.is_none() => {
                    let filename = field
                        .file_name()
                        .map(str::to_string)
                        .ok_or_else(|| ApiError::BadRequest("file name is required".into()))?;
                    let file = StagedFile::new(&storage.staging_dir())
                        .await
                        .map_err(StorageError::Unavailable)?;
                    let (_, file) = staged.insert((filename, file));
                    while let Some(chunk) = field
                        .chunk()
                        .await
                        .map_err(|err| ApiError::BadRequest(err.body_text()))?
                    {
                        if limits.max_size > 0 && file.written() + chunk.len() as u64 > limits.max_size
                        {
                            return Err(ApiError::BadRequest("upload size exceeds limit".into()));
                        }
                        file.write_chunk(&chunk)
                            .await
                            .map_err(StorageError::Unavailable)?;
                    }
                }
                _ => continue,
            }
        }
        Ok(())
    }
    .await;

    let Some((filename, file)) = staged else {
        received?;
        return Err(ApiError::BadRequest("no file uploaded".into()));
    };
    let placed: Result<(String, String, String, PathBuf), ApiError> = async {
        received?;
        let user = required(user, "user")?;
        let path = or_root(path);
        let filename = validate_name(&filename)?.to_string();
        let tenant = storage.tenant(&user).await?;
        let dir = tenant.resolve_checked(&path, true).await?;
        fs::create_dir_all(&dir).await.map_err(StorageError::from)?;
        let target = dir.join(&filename);
        tenant.check_resolved(&target, true).await?;
        if fs::metadata(&target).await.is_ok_and(|meta| meta.is_dir()) {
            return Err(ApiError::BadRequest("a directory with that name exists".into()));
        }
        Ok((user, path, filename, target))
    }
    .await;

    let (user, path, filename, target) = match placed {
        Ok(value) => value,
        Err(err) => {
            file.cleanup().await;
            return Err(err);
        }
    };
    let size = file.written();
    file.persist(&target).await?;
    info!(user, path, filename, size, "upload file");

    Ok(JsonResponse(Ack {
        message: "File uploaded successfully",
        filename: Some(filename),
        files: None,
        skipped: None,
    }))
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|err| ApiError::BadRequest(err.body_text()))
}

/// 删除文件或目录，目标不存在也视为成功。
pub async fn delete_entry(
    Query(query): Query<PathQuery>,
    Extension(storage): Extension<Arc<Storage>>,
) -> Result<JsonResponse<Ack>, ApiError> {
    let user = required(query.user, "user")?;
    let path = required(query.path, "path")?;
    let tenant = storage.tenant(&user).await?;
    mutation::delete(&tenant, &path).await?;
    info!(user, path, "delete entry");
    Ok(Ack::message("Deleted successfully"))
}

/// 通过原子 rename 移动条目。
pub async fn move_entry(
    Extension(storage): Extension<Arc<Storage>>,
    FormParams(form): FormParams<TransferForm>,
) -> Result<JsonResponse<Ack>, ApiError> {
    let user = required(form.user, "user")?;
    let src = required(form.src, "src")?;
    let dst = required(form.dst, "dst")?;
    let tenant = storage.tenant(&user).await?;
    mutation::move_entry(&tenant, &src, &dst).await?;
    info!(user, src, dst, "move entry");
    Ok(Ack::message("Moved successfully"))
}

/// 复制文件或目录树，非事务性。
pub async fn copy_entry(
    Extension(storage): Extension<Arc<Storage>>,
    FormParams(form): FormParams<TransferForm>,
) -> Result<JsonResponse<Ack>, ApiError> {
    let user = required(form.user, "user")?;
    let src = required(form.src, "src")?;
    let dst = required(form.dst, "dst")?;
    let tenant = storage.tenant(&user).await?;
    let report = mutation::copy_entry(&tenant, &src, &dst).await?;
    info!(
        user,
        src,
        dst,
        files = report.files,
        dirs = report.dirs,
        skipped = report.skipped.len(),
        "copy entry"
    );
    Ok(JsonResponse(Ack {
        message: "Copied successfully",
        filename: None,
        files: Some(report.files),
        skipped: Some(report.skipped).filter(|skipped| !skipped.is_empty()),
    }))
}

/// 在当前目录内重命名。
pub async fn rename_entry(
    Extension(storage): Extension<Arc<Storage>>,
    FormParams(form): FormParams<RenameForm>,
) -> Result<JsonResponse<Ack>, ApiError> {
    let user = required(form.user, "user")?;
    let old_path = required(form.old_path, "oldPath")?;
    let new_name = required(form.new_name, "newName")?;
    let tenant = storage.tenant(&user).await?;
    mutation::rename(&tenant, &old_path, &new_name).await?;
    info!(user, old_path, new_name, "rename entry");
    Ok(Ack::message("Renamed successfully"))
}

/// 创建目录（含父级）。
pub async fn create_directory(
    Extension(storage): Extension<Arc<Storage>>,
    FormParams(form): FormParams<MkdirForm>,
) -> Result<JsonResponse<Ack>, ApiError> {
    let user = required(form.user, "user")?;
    let name = required(form.name, "name")?;
    let path = or_root(form.path);
    let tenant = storage.tenant(&user).await?;
    mutation::make_directory(&tenant, &path, &name).await?;
    info!(user, path, name, "create directory");
    Ok(Ack::message("Directory created successfully"))
}

/// 闭区间字节范围。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ByteRange {
    start: u64,
    end: u64,
}

impl ByteRange {
    /// 解析单段 `Range` 头。没有该头、或后缀长度为 0 时返回 `None`。
    fn parse(header: Option<&HeaderValue>, size: u64) -> Result<Option<Self>, ApiError> {
        let Some(header) = header else {
            return Ok(None);
        };
        let invalid = || ApiError::BadRequest("invalid Range header".into());
        let spec = header
            .to_str()
            .ok()
            .and_then(|value| value.strip_prefix("bytes="))
            .ok_or_else(invalid)?;
        if spec.contains(',') {
            return Err(ApiError::BadRequest("multiple ranges not supported".into()));
        }
        let (first, last) = spec.split_once('-').ok_or_else(invalid)?;
        let (first, last) = (first.trim(), last.trim());
        let number = |text: &str| text.parse::<u64>().map_err(|_| invalid());
        let Some(last_byte) = size.checked_sub(1) else {
            return Err(ApiError::RangeNotSatisfiable(size));
        };

        let range = match (first.is_empty(), last.is_empty()) {
            (true, true) => return Err(invalid()),
            (true, false) => match number(last)? {
                0 => return Ok(None),
                suffix => Self {
                    start: size.saturating_sub(suffix),
                    end: last_byte,
                },
            },
            (false, true) => Self {
                start: number(first)?,
                end: last_byte,
            },
            (false, false) => Self {
                start: number(first)?,
                end: number(last)?.min(last_byte),
            },
        };
        if range.start > range.end {
            return Err(ApiError::RangeNotSatisfiable(size));
        }
        Ok(Some(range))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::FromRequest;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tempfile::tempdir;

    fn make_storage() -> (tempfile::TempDir, Arc<Storage>) {
        let temp = tempdir().expect("tempdir");
        let base = temp.path().join("storage");
        std::fs::create_dir_all(&base).expect("create storage base");
        (temp, Arc::new(Storage::new(base)))
    }

    fn query(user: &str, path: &str) -> Query<PathQuery> {
        Query(PathQuery {
            user: Some(user.to_string()),
            path: Some(path.to_string()),
        })
    }

    async fn multipart(parts: &[(&str, Option<&str>, &[u8])]) -> Multipart {
        let mut body = Vec::new();
        for (name, filename, contents) in parts {
            body.extend_from_slice(b"--XBOUNDARY\r\n");
            match filename {
                Some(filename) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                ),
            }
            body.extend_from_slice(contents);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(b"--XBOUNDARY--\r\n");
        let request = Request::builder()
            .method("POST")
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XBOUNDARY")
            .body(AxumBody::from(body))
            .unwrap();
        Multipart::from_request(request, &())
            .await
            .unwrap_or_else(|_| panic!("multipart"))
    }

    fn limits(max_size: u64) -> Extension<Arc<UploadLimits>> {
        Extension(Arc::new(UploadLimits { max_size }))
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes()
            .to_vec()
    }

    fn staging_is_empty(storage: &Storage) -> bool {
        std::fs::read_dir(storage.staging_dir())
            .map(|dir| dir.count() == 0)
            .unwrap_or(true)
    }

    #[tokio::test]
    async fn upload_then_download_round_trips() {
        let (_temp, storage) = make_storage();
        // 浏览器的字段顺序：file 在前，user 在后。
        let form = multipart(&[
            ("file", Some("report.txt"), b"quarterly numbers\n\x00\xff"),
            ("path", None, b"/docs"),
            ("user", None, b"alice"),
        ])
        .await;
        let JsonResponse(ack) = upload_file(Extension(storage.clone()), limits(0), form)
            .await
            .expect("upload");
        assert_eq!(ack.filename.as_deref(), Some("report.txt"));

        let response = download_file(
            query("alice", "/docs/report.txt"),
            HeaderMap::new(),
            Extension(storage.clone()),
        )
        .await
        .expect("download");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "20");
        assert!(response.headers().contains_key(header::LAST_MODIFIED));
        assert_eq!(body_bytes(response).await, b"quarterly numbers\n\x00\xff");
        assert!(staging_is_empty(&storage));
    }

    #[tokio::test]
    async fn upload_overwrites_existing_file() {
        let (_temp, storage) = make_storage();
        for contents in [&b"first"[..], &b"second"[..]] {
            let form = multipart(&[
                ("user", None, b"alice"),
                ("file", Some("same.txt"), contents),
            ])
            .await;
            upload_file(Extension(storage.clone()), limits(0), form)
                .await
                .expect("upload");
        }
        let stored = std::fs::read(storage.base_path().join("alice/same.txt")).unwrap();
        assert_eq!(stored, b"second");
    }

    #[tokio::test]
    async fn upload_rejects_traversal_and_cleans_staging() {
        let (temp, storage) = make_storage();
        let form = multipart(&[
            ("user", None, b"alice"),
            ("path", None, b"/../../"),
            ("file", Some("evil.txt"), b"x"),
        ])
        .await;
        let result = upload_file(Extension(storage.clone()), limits(0), form).await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
        assert!(!temp.path().join("evil.txt").exists());
        assert!(staging_is_empty(&storage));
    }

    #[tokio::test]
    async fn upload_enforces_size_limit() {
        let (_temp, storage) = make_storage();
        let form = multipart(&[
            ("user", None, b"alice"),
            ("file", Some("big.bin"), &[7u8; 64]),
        ])
        .await;
        let result = upload_file(Extension(storage.clone()), limits(16), form).await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
        assert!(!storage.base_path().join("alice/big.bin").exists());
        assert!(staging_is_empty(&storage));
    }

    #[tokio::test]
    async fn upload_requires_user_and_file() {
        let (_temp, storage) = make_storage();
        let form = multipart(&[("file", Some("a.txt"), b"a")]).await;
        let result = upload_file(Extension(storage.clone()), limits(0), form).await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
        assert!(staging_is_empty(&storage));

        let form = multipart(&[("user", None, b"alice")]).await;
        let result = upload_file(Extension(storage.clone()), limits(0), form).await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn download_missing_is_not_found() {
        let (_temp, storage) = make_storage();
        let result = download_file(
            query("alice", "/nope.txt"),
            HeaderMap::new(),
            Extension(storage),
        )
        .await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn download_rejects_traversal() {
        let (temp, storage) = make_storage();
        std::fs::write(temp.path().join("secret.txt"), b"secret").expect("write");
        let result = download_file(
            query("alice", "../../secret.txt"),
            HeaderMap::new(),
            Extension(storage),
        )
        .await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn download_serves_ranges_and_not_modified() {
        let (_temp, storage) = make_storage();
        let tenant = storage.tenant("alice").await.expect("tenant");
        std::fs::write(tenant.root_path().join("abc.txt"), b"abcdefghij").expect("write");

        let mut headers = HeaderMap::new();
        headers.insert(header::RANGE, HeaderValue::from_static("bytes=2-4"));
        let response = download_file(query("alice", "abc.txt"), headers, Extension(storage.clone()))
            .await
            .expect("range");
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        let etag = response.headers()[header::ETAG].clone();
        assert_eq!(body_bytes(response).await, b"cde");

        let mut headers = HeaderMap::new();
        headers.insert(header::IF_NONE_MATCH, etag);
        let response = download_file(query("alice", "abc.txt"), headers, Extension(storage))
            .await
            .expect("conditional");
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    }

    #[tokio::test]
    async fn list_requires_user_and_defaults_to_root() {
        let (_temp, storage) = make_storage();
        let result = list_files(
            Query(PathQuery {
                user: None,
                path: None,
            }),
            Extension(storage.clone()),
        )
        .await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));

        let JsonResponse(listing) = list_files(
            Query(PathQuery {
                user: Some("fresh".into()),
                path: None,
            }),
            Extension(storage.clone()),
        )
        .await
        .expect("list");
        assert!(listing.files.is_empty());
        assert_eq!(listing.current_path, "/");
        assert!(storage.base_path().join("fresh").is_dir());
    }

    #[tokio::test]
    async fn delete_twice_succeeds() {
        let (_temp, storage) = make_storage();
        let tenant = storage.tenant("alice").await.expect("tenant");
        std::fs::write(tenant.root_path().join("gone.txt"), b"x").expect("write");

        for _ in 0..2 {
            delete_entry(query("alice", "/gone.txt"), Extension(storage.clone()))
                .await
                .expect("delete");
        }
    }

    #[tokio::test]
    async fn rename_handler_rejects_escape() {
        let (temp, storage) = make_storage();
        let tenant = storage.tenant("alice").await.expect("tenant");
        std::fs::write(tenant.root_path().join("a.txt"), b"x").expect("write");

        let result = rename_entry(
            Extension(storage.clone()),
            FormParams(RenameForm {
                user: Some("alice".into()),
                old_path: Some("/a.txt".into()),
                new_name: Some("../../escape.txt".into()),
            }),
        )
        .await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
        assert!(tenant.root_path().join("a.txt").exists());
        assert!(!temp.path().join("escape.txt").exists());
    }

    #[tokio::test]
    async fn move_handler_requires_both_endpoints() {
        let (_temp, storage) = make_storage();
        let result = move_entry(
            Extension(storage),
            FormParams(TransferForm {
                user: Some("alice".into()),
                src: Some("/a".into()),
                dst: None,
            }),
        )
        .await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn copy_and_mkdir_handlers() {
        let (_temp, storage) = make_storage();
        create_directory(
            Extension(storage.clone()),
            FormParams(MkdirForm {
                user: Some("alice".into()),
                path: None,
                name: Some("src".into()),
            }),
        )
        .await
        .expect("mkdir");
        let tenant = storage.tenant("alice").await.expect("tenant");
        std::fs::write(tenant.root_path().join("src/f.txt"), b"f").expect("write");

        let JsonResponse(ack) = copy_entry(
            Extension(storage.clone()),
            FormParams(TransferForm {
                user: Some("alice".into()),
                src: Some("/src".into()),
                dst: Some("/dst".into()),
            }),
        )
        .await
        .expect("copy");
        assert_eq!(ack.files, Some(1));
        assert_eq!(std::fs::read(tenant.root_path().join("dst/f.txt")).unwrap(), b"f");
    }

    #[test]
    fn byte_range_forms() {
        let parse = |raw: &'static str| ByteRange::parse(Some(&HeaderValue::from_static(raw)), 10);
        let range = |start, end| Some(ByteRange { start, end });

        assert_eq!(ByteRange::parse(None, 10).ok().flatten(), None);
        assert_eq!(parse("bytes=0-").ok().flatten(), range(0, 9));
        assert_eq!(parse("bytes=-3").ok().flatten(), range(7, 9));
        assert_eq!(parse("bytes=-30").ok().flatten(), range(0, 9));
        assert_eq!(parse("bytes=5-100").ok().flatten(), range(5, 9));
        assert_eq!(parse("bytes=-0").ok().flatten(), None);
        assert!(matches!(
            parse("bytes=10-12"),
            Err(ApiError::RangeNotSatisfiable(10))
        ));
        assert!(matches!(parse("bytes=4-2"), Err(ApiError::RangeNotSatisfiable(10))));
        for raw in ["bytes=0-1,3-4", "bytes=-", "items=0-1", "bytes=a-b"] {
            assert!(matches!(parse(raw), Err(ApiError::BadRequest(_))), "{raw}");
        }
        assert!(matches!(
            ByteRange::parse(Some(&HeaderValue::from_static("bytes=0-")), 0),
            Err(ApiError::RangeNotSatisfiable(0))
        ));
    }
}
