//! nas-drive 服务入口。
//!
//! 基于 HTTP 的多租户文件存储：每个用户名对应存储根目录下的一个子目录，
//! 所有文件操作都限制在该目录内；图片与视频可生成 JPEG 缩略图预览。

mod background;
mod catalog;
mod config;
mod error;
mod etag;
mod files;
mod health;
mod http;
mod logging;
mod mutation;
mod sandbox;
mod staging;
mod storage;
mod thumbnail;

use axum::extract::{DefaultBodyLimit, Extension, connect_info::ConnectInfo};
use axum::http::Request;
use axum::routing::{get, post};
use axum::{Router, middleware};
use axum_server::Handle;
use clap::Parser;
use shadow_rs::shadow;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, info, info_span};

use crate::background::spawn_background_tasks;
use crate::config::Args;
use crate::files::UploadLimits;
use crate::http::build_cors_layer;
use crate::storage::Storage;
use crate::thumbnail::ThumbnailConfig;

shadow!(build);

/// 启动服务并阻塞直到关闭。
#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    logging::init_logging();

    let args = Args::parse();
    let storage = Arc::new(Storage::new(PathBuf::from(&args.storage_dir)));
    storage.ensure_base().await?;
    let temp_dir = args.temp_dir();
    tokio::fs::create_dir_all(&temp_dir).await?;
    let thumbnails = Arc::new(ThumbnailConfig {
        ffmpeg_path: args.ffmpeg_path.clone(),
        temp_dir,
        decode_timeout: Duration::from_secs(args.thumbnail_timeout_secs),
    });
    let upload_limits = Arc::new(UploadLimits {
        max_size: args.upload_max_size,
    });
    info!(
        storage = ?storage.base_path(),
        temp = ?thumbnails.temp_dir,
        ffmpeg = ?thumbnails.ffmpeg_path,
        "storage ready"
    );

    let api = Router::new()
        .route(
            "/files",
            get(files::list_files).delete(files::delete_entry),
        )
        .route("/files/download", get(files::download_file))
        .route(
            "/files/upload",
            post(files::upload_file).layer(DefaultBodyLimit::disable()),
        )
        .route("/files/move", post(files::move_entry))
        .route("/files/copy", post(files::copy_entry))
        .route("/files/rename", post(files::rename_entry))
        .route("/files/mkdir", post(files::create_directory))
        .route("/files/thumbnail", get(thumbnail::get_thumbnail));

    let mut app = Router::new()
        .route("/health", get(health::health))
        .nest("/api", api)
        .layer(middleware::from_fn(http::add_security_headers))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    let forwarded_ip = request
                        .headers()
                        .get("x-forwarded-for")
                        .and_then(|v| v.to_str().ok())
                        .map(|s| s.split(',').next().unwrap_or("").trim().to_string());
                    let connect_ip = request
                        .extensions()
                        .get::<ConnectInfo<SocketAddr>>()
                        .map(|ConnectInfo(addr)| addr.to_string());
                    let client_ip = forwarded_ip
                        .or(connect_ip)
                        .unwrap_or_else(|| "unknown".to_string());

                    info_span!(
                        env!("CARGO_CRATE_NAME"),
                        client_ip,
                        method = ?request.method(),
                        path = ?request.uri().path(),
                    )
                })
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
        )
        .layer(Extension(storage.clone()))
        .layer(Extension(thumbnails.clone()))
        .layer(Extension(upload_limits));

    if let Some(cors_layer) = build_cors_layer(&args.cors_origins) {
        app = app.layer(cors_layer);
    }

    let host = args
        .host
        .parse::<IpAddr>()
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string()))?;
    let addr = SocketAddr::new(host, args.port);
    let handle = Handle::new();

    info!("Starting HTTP server at {}", addr);

    let server = axum_server::bind(addr)
        .handle(handle.clone())
        .serve(app.into_make_service_with_connect_info::<SocketAddr>());

    spawn_background_tasks(
        storage,
        thumbnails,
        Duration::from_secs(args.artifact_ttl_secs),
    );
    tokio::select! {
        result = server => result?,
        _ = shutdown_signal(handle) => {}
    }

    Ok(())
}

async fn shutdown_signal(handle: Handle) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Received termination signal shutting down");
    handle.graceful_shutdown(Some(Duration::from_secs(10)));
}
