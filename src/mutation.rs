//! 租户根目录内的删除、移动、复制、重命名与建目录。
//!
//! 每个操作在第一次文件系统调用之前解析并校验全部端点。均非事务性：
//! 递归复制中途失败时，已写入的目标内容保留。

use std::path::Path;
use tokio::fs;
use tokio::io::ErrorKind;
use tracing::{info, warn};

use crate::catalog::{SkippedEntry, walk_tree};
use crate::sandbox::validate_name;
use crate::storage::{StorageError, Tenant};

/// 删除文件，或递归删除目录。目标不存在时直接成功。
pub async fn delete(tenant: &Tenant, relative: &str) -> Result<(), StorageError> {
    let target = tenant.resolve_checked(relative, true).await?;
    if tenant.is_root(&target) {
        return Err(StorageError::InvalidPath);
    }
    let metadata = match fs::symlink_metadata(&target).await {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err.into()),
    };
    let result = if metadata.is_dir() {
        fs::remove_dir_all(&target).await
    } else {
        fs::remove_file(&target).await
    };
    match result {
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        other => Ok(other?),
    }
}

/// 原子地把 `src` 重命名为 `dst`。跨卷时返回 [`StorageError::CrossDevice`]，
/// 不做复制回退。
pub async fn move_entry(tenant: &Tenant, src: &str, dst: &str) -> Result<(), StorageError> {
    let src_path = tenant.resolve(src)?;
    let dst_path = tenant.resolve(dst)?;
    if tenant.is_root(&src_path) || tenant.is_root(&dst_path) {
        return Err(StorageError::InvalidPath);
    }
    if dst_path != src_path && dst_path.starts_with(&src_path) {
        return Err(StorageError::InvalidPath);
    }
    tenant.check_resolved(&src_path, false).await?;
    tenant.check_resolved(&dst_path, true).await?;

    fs::rename(&src_path, &dst_path).await?;
    Ok(())
}

/// 一次成功复制的结果。
#[derive(Debug, Default)]
pub struct CopyReport {
    pub files: usize,
    pub dirs: usize,
    pub skipped: Vec<SkippedEntry>,
}

/// 逐字节复制文件，或递归复制目录树。
///
/// 源树中的符号链接不跟随；合并到已有目标时，目标树中的符号链接同样不跟随。
/// 两者都记入 [`CopyReport::skipped`]。
pub async fn copy_entry(tenant: &Tenant, src: &str, dst: &str) -> Result<CopyReport, StorageError> {
    let src_path = tenant.resolve(src)?;
    let dst_path = tenant.resolve(dst)?;
    if dst_path.starts_with(&src_path) || tenant.is_root(&dst_path) {
        return Err(StorageError::InvalidPath);
    }
    tenant.check_resolved(&src_path, false).await?;
    tenant.check_resolved(&dst_path, true).await?;

    let metadata = fs::metadata(&src_path).await?;
    if !metadata.is_dir() {
        fs::copy(&src_path, &dst_path).await?;
        return Ok(CopyReport {
            files: 1,
            ..CopyReport::default()
        });
    }

    let tree = walk_tree(&src_path).await?;
    let mut report = CopyReport {
        skipped: tree.skipped,
        ..CopyReport::default()
    };
    fs::create_dir_all(&dst_path).await?;
    report.dirs += 1;
    for dir in &tree.dirs {
        let target = dst_path.join(dir);
        if !destination_is_plain(tenant, &target, dir, &mut report.skipped).await? {
            continue;
        }
        fs::create_dir_all(&target).await?;
        report.dirs += 1;
    }
    for file in &tree.files {
        let target = dst_path.join(file);
        if !destination_is_plain(tenant, &target, file, &mut report.skipped).await? {
            continue;
        }
        copy_file(&src_path.join(file), &target).await?;
        report.files += 1;
    }
    for entry in &report.skipped {
        warn!(entry = %entry.name, reason = %entry.reason, "copy skipped entry");
    }

    Ok(report)
}

/// 目标路径上任何一级是符号链接（或非目录的父级）时返回 false 并记入 `skipped`。
async fn destination_is_plain(
    tenant: &Tenant,
    target: &Path,
    relative: &Path,
    skipped: &mut Vec<SkippedEntry>,
) -> Result<bool, StorageError> {
    match tenant.check_resolved(target, true).await {
        Ok(()) => Ok(true),
        Err(StorageError::InvalidPath) => {
            skipped.push(SkippedEntry {
                name: relative.to_string_lossy().to_string(),
                reason: "destination is a symbolic link or not a directory".into(),
            });
            Ok(false)
        }
        Err(err) => Err(err),
    }
}

async fn copy_file(src: &Path, dst: &Path) -> Result<(), StorageError> {
    fs::copy(src, dst).await.map_err(|err| {
        warn!(src = ?src, dst = ?dst, error = %err, "copy aborted, destination left partial");
        StorageError::from(err)
    })?;
    Ok(())
}

/// 在原父目录内重命名。`new_name` 必须是单个名字，带分隔符即拒绝。
pub async fn rename(tenant: &Tenant, old: &str, new_name: &str) -> Result<(), StorageError> {
    let new_name = validate_name(new_name)?;
    let old_path = tenant.resolve(old)?;
    if tenant.is_root(&old_path) {
        return Err(StorageError::InvalidPath);
    }
    let parent = old_path.parent().ok_or(StorageError::InvalidPath)?;
    let new_path = parent.join(new_name);
    tenant.check_resolved(&old_path, false).await?;
    tenant.check_resolved(&new_path, true).await?;

    fs::rename(&old_path, &new_path).await?;
    info!(from = ?old_path, to = ?new_path, "renamed entry");
    Ok(())
}

/// 创建 `<relative>/<name>` 及其父级，可重复调用。
pub async fn make_directory(tenant: &Tenant, relative: &str, name: &str) -> Result<(), StorageError> {
    if name.trim().is_empty() {
        return Err(StorageError::InvalidPath);
    }
    let joined = format!("{}/{}", relative.trim_end_matches(['/', '\\']), name);
    let target = tenant.resolve_checked(&joined, true).await?;
    fs::create_dir_all(&target).await?;
    Ok(())
}
