//! 命令行参数与服务默认配置。

use clap::Parser;
use shadow_rs::formatcp;
use std::path::PathBuf;

use crate::build;

const VERSION_INFO: &str = formatcp!(
    r#"{}\ncommit_hash: {}\nbuild_time: {}\nbuild_env: {},{}"#,
    build::PKG_VERSION,
    build::SHORT_COMMIT,
    build::BUILD_TIME,
    build::RUST_VERSION,
    build::RUST_CHANNEL
);

pub const STAGING_DIR: &str = ".staging";
pub const ARTIFACT_PREFIX: &str = "thumb_";
pub const THUMBNAIL_MAX_DIMENSION: u32 = 300;
pub const THUMBNAIL_JPEG_QUALITY: u8 = 85;
/// 视频取帧时间点，跳过片头黑帧。
pub const VIDEO_FRAME_TIMESTAMP: &str = "00:00:03.000";
pub const DEFAULT_FFMPEG_PATH: &str = "ffmpeg";
pub const DEFAULT_THUMBNAIL_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_UPLOAD_MAX_SIZE: u64 = 10 * 1024 * 1024 * 1024;
pub const DEFAULT_ARTIFACT_TTL_SECS: u64 = 60 * 60;
pub const ARTIFACT_SWEEP_INTERVAL_SECS: u64 = 600;

/// 服务的命令行参数与环境变量配置。
#[derive(Parser, Debug)]
#[command(name = "nas-drive", version = VERSION_INFO, about = "Multi-tenant file storage server")]
pub struct Args {
    #[arg(
        short = 's',
        long,
        env = "NAS_ROOT",
        default_value = "./data",
        help = "Storage base directory; every user gets a subdirectory"
    )]
    pub storage_dir: String,
    #[arg(
        long,
        env = "NAS_TEMP_DIR",
        help = "Directory for transient thumbnail artifacts (defaults to the system temp dir)"
    )]
    pub temp_dir: Option<PathBuf>,
    #[arg(
        short = 'b',
        long,
        env = "NAS_BIND",
        default_value = "0.0.0.0",
        help = "Bind address"
    )]
    pub host: String,
    #[arg(
        short = 'p',
        long,
        env = "PORT",
        default_value_t = 8080,
        help = "HTTP port"
    )]
    pub port: u16,
    #[arg(
        long,
        env = "NAS_CORS_ORIGINS",
        default_value = "*",
        help = "Comma separated CORS origins, `*` allows any"
    )]
    pub cors_origins: String,
    #[arg(
        long,
        env = "NAS_FFMPEG_PATH",
        default_value = DEFAULT_FFMPEG_PATH,
        help = "ffmpeg binary used for video thumbnails"
    )]
    pub ffmpeg_path: PathBuf,
    #[arg(
        long,
        env = "NAS_THUMBNAIL_TIMEOUT_SECS",
        default_value_t = DEFAULT_THUMBNAIL_TIMEOUT_SECS,
        help = "Max seconds to wait for the video decoder"
    )]
    pub thumbnail_timeout_secs: u64,
    #[arg(
        long,
        env = "NAS_UPLOAD_MAX_SIZE",
        default_value_t = DEFAULT_UPLOAD_MAX_SIZE,
        help = "Max upload size in bytes (0 to disable)"
    )]
    pub upload_max_size: u64,
    #[arg(
        long,
        env = "NAS_ARTIFACT_TTL_SECS",
        default_value_t = DEFAULT_ARTIFACT_TTL_SECS,
        help = "Age after which orphaned temp artifacts are swept (0 to disable)"
    )]
    pub artifact_ttl_secs: u64,
}

impl Args {
    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}
