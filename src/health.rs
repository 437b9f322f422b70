//! 健康检查接口，附带构建信息。

use axum::response::Json as JsonResponse;
use serde::Serialize;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthInfo {
    status: &'static str,
    version: &'static str,
    build_time: &'static str,
}

/// 返回服务状态与当前构建版本。
pub async fn health() -> JsonResponse<HealthInfo> {
    JsonResponse(HealthInfo {
        status: "ok",
        version: crate::build::PKG_VERSION,
        build_time: crate::build::BUILD_TIME,
    })
}
