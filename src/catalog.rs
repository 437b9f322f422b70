//! 租户根目录内的目录列表与目录树遍历。

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tracing::warn;

use crate::storage::{StorageError, Tenant};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub name: String,
    pub path: String,
    pub size: u64,
    pub is_dir: bool,
    pub mod_time: String,
    pub extension: String,
}

/// 列表或复制中被跳过的条目及原因。
#[derive(Debug, Serialize)]
pub struct SkippedEntry {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Default, Serialize)]
pub struct Listing {
    pub entries: Vec<FileEntry>,
    pub skipped: Vec<SkippedEntry>,
}

/// 列出 `relative` 的直接子项。
///
/// 读不到元数据的条目和符号链接记入 [`Listing::skipped`]；遍历中途出错时
/// 停止遍历，返回已收集的条目。
pub async fn list_dir(tenant: &Tenant, relative: &str) -> Result<Listing, StorageError> {
    let target = tenant.resolve_checked(relative, false).await?;
    let mut dir = fs::read_dir(&target).await?;
    let mut listing = Listing::default();

    loop {
        let entry = match dir.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(err) => {
                stop_enumeration(&mut listing, relative, err);
                break;
            }
        };
        let name = entry.file_name().to_string_lossy().to_string();
        let metadata = match fs::symlink_metadata(entry.path()).await {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!(name, error = %err, "skipping unreadable entry");
                listing.skipped.push(SkippedEntry {
                    name,
                    reason: err.to_string(),
                });
                continue;
            }
        };
        if metadata.file_type().is_symlink() {
            listing.skipped.push(SkippedEntry {
                name,
                reason: "symbolic link".into(),
            });
            continue;
        }

        let is_dir = metadata.is_dir();
        let extension = if is_dir {
            String::new()
        } else {
            extension_of(&name)
        };
        listing.entries.push(FileEntry {
            path: tenant.display_path(&entry.path())?,
            size: metadata.len(),
            is_dir,
            mod_time: metadata.modified().map(format_timestamp).unwrap_or_default(),
            extension,
            name,
        });
    }

    sort_entries(&mut listing.entries);
    Ok(listing)
}

fn stop_enumeration(listing: &mut Listing, relative: &str, err: std::io::Error) {
    warn!(
        path = relative,
        listed = listing.entries.len(),
        error = %err,
        "directory enumeration failed, returning partial listing"
    );
    listing.skipped.push(SkippedEntry {
        name: relative.to_string(),
        reason: format!("enumeration stopped: {err}"),
    });
}

/// 目录在前，同类按名称不区分大小写排序。
fn sort_entries(entries: &mut [FileEntry]) {
    entries.sort_by(|a, b| match (a.is_dir, b.is_dir) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
    });
}

/// 小写扩展名（含点号），没有则为空。
pub fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

fn format_timestamp(time: SystemTime) -> String {
    let datetime: DateTime<Utc> = time.into();
    datetime.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// 目录树遍历结果。
#[derive(Debug, Default)]
pub struct Tree {
    /// 相对遍历根的目录，父目录在子目录之前。
    pub dirs: Vec<PathBuf>,
    /// 相对遍历根的普通文件。
    pub files: Vec<PathBuf>,
    pub skipped: Vec<SkippedEntry>,
}

/// 深度优先遍历 `root`，不跟随符号链接。
pub async fn walk_tree(root: &Path) -> Result<Tree, StorageError> {
    let mut tree = Tree::default();
    let mut pending = vec![PathBuf::new()];

    while let Some(relative) = pending.pop() {
        let mut dir = fs::read_dir(root.join(&relative)).await?;
        while let Some(entry) = dir.next_entry().await? {
            let child = relative.join(entry.file_name());
            let file_type = entry.file_type().await?;
            if file_type.is_symlink() {
                tree.skipped.push(SkippedEntry {
                    name: child.to_string_lossy().to_string(),
                    reason: "symbolic link".into(),
                });
            } else if file_type.is_dir() {
                tree.dirs.push(child.clone());
                pending.push(child);
            } else if file_type.is_file() {
                tree.files.push(child);
            } else {
                tree.skipped.push(SkippedEntry {
                    name: child.to_string_lossy().to_string(),
                    reason: "not a regular file".into(),
                });
            }
        }
    }

    Ok(tree)
}
