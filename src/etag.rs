//! 下载用的 ETag 生成与条件请求判断。

use axum::http::{HeaderMap, header};
use std::fs::Metadata;
use std::time::UNIX_EPOCH;

/// 由文件大小与修改时间派生的弱 ETag（十六进制）。
pub fn weak_etag(metadata: &Metadata) -> String {
    let stamp = metadata
        .modified()
        .ok()
        .and_then(|modified| modified.duration_since(UNIX_EPOCH).ok())
        .map(|elapsed| format!("-{:x}.{:x}", elapsed.as_secs(), elapsed.subsec_nanos()))
        .unwrap_or_default();
    format!("W/\"{:x}{stamp}\"", metadata.len())
}

/// `If-None-Match` 包含当前 ETag（或 `*`）时返回 true。
pub fn is_not_modified(headers: &HeaderMap, current_etag: &str) -> bool {
    let Some(value) = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };
    value
        .split(',')
        .map(|item| item.trim())
        .any(|item| item == "*" || item == current_etag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn weak_etag_tracks_size() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("a.txt");
        std::fs::write(&path, b"0123456789abcdef").expect("write");
        let first = weak_etag(&std::fs::metadata(&path).expect("metadata"));
        assert!(first.starts_with("W/\"10-"), "{first}");
        assert!(first.ends_with('"'));

        std::fs::write(&path, b"short").expect("rewrite");
        let second = weak_etag(&std::fs::metadata(&path).expect("metadata"));
        assert_ne!(first, second);
    }

    #[test]
    fn if_none_match_matches_listed_etag() {
        let mut headers = HeaderMap::new();
        assert!(!is_not_modified(&headers, "W/\"1\""));

        headers.insert(
            header::IF_NONE_MATCH,
            HeaderValue::from_static("W/\"0\", W/\"1\""),
        );
        assert!(is_not_modified(&headers, "W/\"1\""));
        assert!(!is_not_modified(&headers, "W/\"2\""));

        headers.insert(header::IF_NONE_MATCH, HeaderValue::from_static("*"));
        assert!(is_not_modified(&headers, "W/\"2\""));
    }
}
