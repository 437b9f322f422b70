//! HTTP 辅助：CORS、安全响应头与表单提取。

use axum::body::Body as AxumBody;
use axum::extract::{Form, FromRequest, Multipart, Request};
use axum::http::{HeaderValue, StatusCode, header};
use axum::{middleware, response::Response};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;

use crate::error::ApiError;

/// 根据逗号分隔的来源列表构建 CORS 层，`*` 表示允许任意来源（不带凭据）。
pub fn build_cors_layer(cors_origins: &str) -> Option<CorsLayer> {
    if cors_origins.trim() == "*" {
        return Some(CorsLayer::permissive());
    }

    let origins = cors_origins
        .split(',')
        .map(|origin| origin.trim())
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin, "invalid cors origin");
                None
            }
        })
        .collect::<Vec<_>>();

    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers([header::CONTENT_LENGTH]),
    )
}

/// 添加基础安全响应头。
pub async fn add_security_headers(
    request: Request<AxumBody>,
    next: middleware::Next,
) -> Result<Response, StatusCode> {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    Ok(response)
}

/// 从 urlencoded 或 multipart 请求体中提取表单字段。
///
/// 浏览器发送 `FormData`，脚本多用 urlencoded，两者反序列化为同一结构。
/// multipart 的文件字段也按文本读取，只适用于小型纯文本表单。
pub struct FormParams<T>(pub T);

impl<T, S> FromRequest<S> for FormParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("multipart/form-data"));

        if !is_multipart {
            let Form(value) = Form::<T>::from_request(req, state)
                .await
                .map_err(|err| ApiError::BadRequest(err.body_text()))?;
            return Ok(FormParams(value));
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|err| ApiError::BadRequest(err.body_text()))?;
        let mut fields = Map::new();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|err| ApiError::BadRequest(err.body_text()))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let text = field
                .text()
                .await
                .map_err(|err| ApiError::BadRequest(err.body_text()))?;
            fields.insert(name, Value::String(text));
        }
        let value = serde_json::from_value(Value::Object(fields))
            .map_err(|err| ApiError::BadRequest(err.to_string()))?;
        Ok(FormParams(value))
    }
}
