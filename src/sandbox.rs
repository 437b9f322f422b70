//! 租户根目录的路径约束检查。
//!
//! 客户端路径不可信：先做词法规范化，再拼接到租户根目录并用 [`is_within`]
//! 校验；磁盘上的符号链接检查见 [`crate::storage::Tenant::check_resolved`]。

use std::path::{Component, Path, PathBuf};

use crate::storage::StorageError;

/// `candidate` 等于 `root` 或位于其下时返回 true。
///
/// 两侧都先做词法规范化（去掉 `.`，`..` 回退一级），再按路径分量比较，
/// 所以 `/data/alice-2` 不在 `/data/alice` 之内，`./data/alice/x` 在
/// `./data/alice` 之内。
pub fn is_within(candidate: &Path, root: &Path) -> bool {
    match (lexical_normalize(candidate), lexical_normalize(root)) {
        (Some(candidate), Some(root)) => candidate.starts_with(root),
        _ => false,
    }
}

/// 把存储根目录固定为规范化的绝对路径，之后的前缀比较不再受 `./`、`..`
/// 或进程工作目录的影响。
pub fn anchor_base(base: PathBuf) -> PathBuf {
    let absolute = std::path::absolute(&base).unwrap_or(base);
    lexical_normalize(&absolute).unwrap_or(absolute)
}

fn lexical_normalize(path: &Path) -> Option<PathBuf> {
    if path.as_os_str().as_encoded_bytes().contains(&0) {
        return None;
    }
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => normalized.push(prefix.as_os_str()),
            Component::RootDir => normalized.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return None;
                }
            }
            Component::Normal(segment) => normalized.push(segment),
        }
    }
    Some(normalized)
}

/// 客户端路径转为相对根目录、不含 `.` 与 `..` 的路径。
///
/// 开头的分隔符表示租户根目录，`/docs` 与 `docs` 等价；`..` 可以抵消前一段，
/// 但不能越过根目录。
pub fn normalize_relative(relative: &str) -> Result<PathBuf, StorageError> {
    if relative.contains('\0') {
        return Err(StorageError::InvalidPath);
    }
    let trimmed = relative.trim_start_matches(['/', '\\']);
    let mut normalized = PathBuf::new();
    for component in Path::new(trimmed).components() {
        match component {
            Component::Normal(segment) => normalized.push(segment),
            Component::CurDir => continue,
            Component::ParentDir => {
                if !normalized.pop() {
                    return Err(StorageError::InvalidPath);
                }
            }
            Component::RootDir | Component::Prefix(_) => return Err(StorageError::InvalidPath),
        }
    }
    Ok(normalized)
}

/// 校验单个文件名或目录名，按原样返回。
pub fn validate_name(name: &str) -> Result<&str, StorageError> {
    if name.trim().is_empty() || name == "." || name == ".." || name.contains(['/', '\\', '\0'])
    {
        return Err(StorageError::InvalidPath);
    }
    Ok(name)
}
