use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::ErrorKind;
use tracing::{debug, info};

use crate::config::STAGING_DIR;
use crate::sandbox::{anchor_base, is_within, normalize_relative};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("invalid path")]
    InvalidPath,
    #[error("not found")]
    NotFound,
    #[error("cross-device move is not supported, copy then delete instead")]
    CrossDevice,
    #[error("storage unavailable: {0}")]
    Unavailable(io::Error),
}

impl From<io::Error> for StorageError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            ErrorKind::NotFound => StorageError::NotFound,
            ErrorKind::CrossesDevices => StorageError::CrossDevice,
            _ => StorageError::Unavailable(err),
        }
    }
}

/// 共享存储根目录，每个租户在其下拥有一个子目录。
#[derive(Clone, Debug)]
pub struct Storage {
    base: PathBuf,
}

impl Storage {
    /// 根目录在此处固定为规范化的绝对路径。
    pub fn new(base: PathBuf) -> Self {
        Self {
            base: anchor_base(base),
        }
    }

    pub async fn ensure_base(&self) -> io::Result<()> {
        create_dir_all(&self.base).await?;
        create_dir_all(&self.staging_dir()).await
    }

    pub fn base_path(&self) -> &Path {
        &self.base
    }

    /// 上传暂存区。与租户目录同卷，最终 rename 不跨设备；点号前缀使其
    /// 不会与任何租户重名。
    pub fn staging_dir(&self) -> PathBuf {
        self.base.join(STAGING_DIR)
    }

    /// 解析 `identity` 的根目录，不存在时创建。
    pub async fn tenant(&self, identity: &str) -> Result<Tenant, StorageError> {
        let identity = validate_identity(identity)?;
        let root = self.base.join(identity);
        match fs::symlink_metadata(&root).await {
            Ok(metadata) if metadata.is_dir() => {}
            Ok(_) => return Err(StorageError::InvalidPath),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                create_dir_all(&root)
                    .await
                    .map_err(StorageError::Unavailable)?;
                info!(user = identity, root = ?root, "created tenant root");
            }
            Err(err) => return Err(StorageError::Unavailable(err)),
        }
        Ok(Tenant { root })
    }
}

fn validate_identity(identity: &str) -> Result<&str, StorageError> {
    let identity = identity.trim();
    if identity.is_empty()
        || identity.starts_with('.')
        || identity.contains(['/', '\\', '\0'])
    {
        return Err(StorageError::InvalidPath);
    }
    Ok(identity)
}

async fn create_dir_all(path: &Path) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(0o755);
    builder.create(path).await
}

/// 单个租户在存储根目录下的受限视图。
#[derive(Clone, Debug)]
pub struct Tenant {
    root: PathBuf,
}

impl Tenant {
    pub fn root_path(&self) -> &Path {
        &self.root
    }

    /// 校验客户端路径并拼接到根目录，不访问文件系统。
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, StorageError> {
        let target = self.root.join(normalize_relative(relative)?);
        if !is_within(&target, &self.root) {
            return Err(StorageError::InvalidPath);
        }
        Ok(target)
    }

    /// [`Tenant::resolve`] 之后再做磁盘检查。
    pub async fn resolve_checked(
        &self,
        relative: &str,
        allow_missing_leaf: bool,
    ) -> Result<PathBuf, StorageError> {
        let target = self.resolve(relative)?;
        self.check_resolved(&target, allow_missing_leaf).await?;
        Ok(target)
    }

    /// 从根目录逐级检查 `target`：任何一级是符号链接、或中间一级不是目录，
    /// 都拒绝。`allow_missing_leaf` 为 true 时，遇到第一个不存在的分量即视为通过。
    pub async fn check_resolved(
        &self,
        target: &Path,
        allow_missing_leaf: bool,
    ) -> Result<(), StorageError> {
        if !is_within(target, &self.root) {
            return Err(StorageError::InvalidPath);
        }
        let relative = target
            .strip_prefix(&self.root)
            .map_err(|_| StorageError::InvalidPath)?;
        let depth = relative.components().count();

        let mut current = self.root.clone();
        for (index, component) in relative.components().enumerate() {
            current.push(component);
            let file_type = match fs::symlink_metadata(&current).await {
                Ok(metadata) => metadata.file_type(),
                Err(err) if err.kind() == ErrorKind::NotFound && allow_missing_leaf => {
                    return Ok(());
                }
                Err(err) => return Err(err.into()),
            };
            let is_leaf = index + 1 == depth;
            if file_type.is_symlink() || (!is_leaf && !file_type.is_dir()) {
                debug!(
                    component = ?current,
                    symlink = file_type.is_symlink(),
                    "path component is not a plain directory"
                );
                return Err(StorageError::InvalidPath);
            }
        }
        Ok(())
    }

    pub fn is_root(&self, path: &Path) -> bool {
        path == self.root
    }

    /// 返回给客户端的路径形式：`/` 开头，正斜杠分隔。
    pub fn display_path(&self, path: &Path) -> Result<String, StorageError> {
        let relative = path
            .strip_prefix(&self.root)
            .map_err(|_| StorageError::InvalidPath)?
            .to_string_lossy()
            .replace(std::path::MAIN_SEPARATOR, "/");
        Ok(format!("/{relative}"))
    }
}
