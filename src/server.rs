//! HTTP surface
//!
//! Thin axum layer over [`BackgroundProcessor`]: parses multipart uploads and
//! query strings, applies compositing defaults, and is the only place where
//! [`BgError`] becomes an HTTP status.

use crate::{
    config::{ApiInfo, CorsConfig, ServerConfig},
    error::{BgError, Result},
    processor::{BackgroundProcessor, CompositeOptions, RenderedImage},
    tracing_config::{events, spans},
    types::{Position, ScaleMode},
};
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::QueryRejection,
        DefaultBodyLimit, Multipart, Query, Request, State,
    },
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing::{info, Instrument};
use uuid::Uuid;

/// Response header carrying the per-request id
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    processor: Arc<BackgroundProcessor>,
    defaults: CompositeOptions,
    api: Arc<ApiInfo>,
}

impl AppState {
    pub fn new(processor: Arc<BackgroundProcessor>, config: &ServerConfig) -> Result<Self> {
        Ok(Self {
            processor,
            defaults: CompositeOptions {
                scale: config.compositing.scale,
                position: config.compositing.position,
                pad_color: config.compositing.pad_rgb()?,
            },
            api: Arc::new(config.api.clone()),
        })
    }
}

/// Error returned from handlers, rendered as `{"error": "..."}`
#[derive(Debug)]
pub struct ApiError(BgError);

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        status_for(&self.0)
    }
}

impl From<BgError> for ApiError {
    fn from(error: BgError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        events::error_with_context(&self.0, status.as_str());
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// HTTP status for each error kind
#[must_use]
pub fn status_for(error: &BgError) -> StatusCode {
    match error {
        BgError::Decode(_)
        | BgError::InvalidRequest(_)
        | BgError::InvalidSize(_)
        | BgError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
        BgError::DimensionMismatch(_) => StatusCode::UNPROCESSABLE_ENTITY,
        BgError::SegmentationUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        BgError::Segmentation(_) => StatusCode::BAD_GATEWAY,
        BgError::Io(_)
        | BgError::Image(_)
        | BgError::InvalidConfig(_)
        | BgError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Debug, Default, Deserialize)]
struct RemoveQuery {
    return_mask: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CompositeQuery {
    position: Option<String>,
    scale: Option<String>,
}

/// Build the application router
///
/// # Errors
/// - `InvalidConfig` for an unparseable pad colour or CORS entry
pub fn router(config: &ServerConfig, processor: Arc<BackgroundProcessor>) -> Result<Router> {
    let state = AppState::new(processor, config)?;

    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/remove-bg/", post(remove_bg))
        .route("/remove-bg", post(remove_bg))
        .route("/add-background/", post(add_background))
        .route("/add-background", post(add_background))
        .route("/extract-background/", post(extract_background))
        .route("/extract-background", post(extract_background))
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.max_upload_bytes))
        .layer(middleware::from_fn(request_context))
        .layer(cors_layer(&config.cors)?)
        .layer(TraceLayer::new_for_http());

    Ok(app)
}

/// Bind and serve until Ctrl-C
pub async fn serve(config: ServerConfig, processor: Arc<BackgroundProcessor>) -> Result<()> {
    let app = router(&config, processor)?;
    let addr = config.bind_address();

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        address = %addr,
        title = %config.api.title,
        version = %config.api.version,
        segmenter = %config.segmenter.kind,
        "Listening on http://{}",
        addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

/// Build the CORS layer
///
/// A `"*"` entry means any value. With credentials enabled, wildcards mirror
/// the request instead, since browsers reject `*` on credentialed requests.
fn cors_layer(cors: &CorsConfig) -> Result<CorsLayer> {
    let is_wildcard = |values: &[String]| values.iter().any(|v| v.trim() == "*");
    let credentials = cors.allow_credentials;

    let origins = if is_wildcard(&cors.allow_origins) {
        if credentials {
            AllowOrigin::mirror_request()
        } else {
            AllowOrigin::from(Any)
        }
    } else {
        let parsed = cors
            .allow_origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin.trim()).map_err(|_| {
                    BgError::invalid_config(format!("invalid CORS origin '{}'", origin))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        AllowOrigin::list(parsed)
    };

    let methods = if is_wildcard(&cors.allow_methods) {
        if credentials {
            AllowMethods::mirror_request()
        } else {
            AllowMethods::from(Any)
        }
    } else {
        let parsed = cors
            .allow_methods
            .iter()
            .map(|method| {
                Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes()).map_err(|_| {
                    BgError::invalid_config(format!("invalid CORS method '{}'", method))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        AllowMethods::list(parsed)
    };

    let headers = if is_wildcard(&cors.allow_headers) {
        if credentials {
            AllowHeaders::mirror_request()
        } else {
            AllowHeaders::from(Any)
        }
    } else {
        let parsed = cors
            .allow_headers
            .iter()
            .map(|name| {
                HeaderName::from_bytes(name.trim().as_bytes()).map_err(|_| {
                    BgError::invalid_config(format!("invalid CORS header '{}'", name))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        AllowHeaders::list(parsed)
    };

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(headers)
        .allow_credentials(credentials))
}

/// Attach a request id to the span and the response
async fn request_context(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let span = spans::request(request.uri().path(), &request_id);

    let mut response = next.run(request).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

async fn root() -> impl IntoResponse {
    Json(json!({ "message": "Background Removal API is running" }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "title": state.api.title,
        "description": state.api.description,
        "version": state.api.version,
        "segmenter": state.processor.segmenter_name(),
    }))
}

async fn remove_bg(
    State(state): State<AppState>,
    query: std::result::Result<Query<RemoveQuery>, QueryRejection>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> std::result::Result<Response, ApiError> {
    let Query(query) = query.map_err(query_error)?;
    let return_mask = parse_flag("return_mask", query.return_mask.as_deref())?;

    let mut uploads = read_uploads(multipart, &["file"]).await?;
    let image = take_upload(&mut uploads, "file")?;

    let rendered = state.processor.remove_background(image, return_mask).await?;
    Ok(png_response(rendered))
}

async fn add_background(
    State(state): State<AppState>,
    query: std::result::Result<Query<CompositeQuery>, QueryRejection>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> std::result::Result<Response, ApiError> {
    let Query(query) = query.map_err(query_error)?;
    let options = CompositeOptions {
        scale: query
            .scale
            .as_deref()
            .map_or(state.defaults.scale, ScaleMode::parse_or_default),
        position: query
            .position
            .as_deref()
            .map_or(state.defaults.position, Position::parse_or_default),
        pad_color: state.defaults.pad_color,
    };

    let mut uploads = read_uploads(multipart, &["file", "background"]).await?;
    let image = take_upload(&mut uploads, "file")?;
    let background = take_upload(&mut uploads, "background")?;

    let rendered = state.processor.add_background(image, background, options).await?;
    Ok(png_response(rendered))
}

async fn extract_background(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> std::result::Result<Response, ApiError> {
    let mut uploads = read_uploads(multipart, &["file"]).await?;
    let image = take_upload(&mut uploads, "file")?;

    let rendered = state.processor.extract_background(image).await?;
    Ok(png_response(rendered))
}

fn png_response(rendered: RenderedImage) -> Response {
    (
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", rendered.file_name),
            ),
        ],
        rendered.png,
    )
        .into_response()
}

/// Parse a boolean query flag; absent means `false`
fn parse_flag(name: &str, value: Option<&str>) -> Result<bool> {
    let Some(raw) = value else {
        return Ok(false);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        _ => Err(BgError::invalid_request(format!(
            "query parameter '{}' must be a boolean, got '{}'",
            name, raw
        ))),
    }
}

fn query_error(rejection: QueryRejection) -> BgError {
    BgError::invalid_request(format!("malformed query string: {}", rejection))
}

fn multipart_error(error: MultipartError) -> BgError {
    BgError::invalid_request(format!("malformed multipart body: {}", error))
}

/// Collect the named file fields; the first occurrence of each name wins
async fn read_uploads(
    multipart: std::result::Result<Multipart, MultipartRejection>,
    wanted: &[&str],
) -> Result<HashMap<String, Bytes>> {
    let mut multipart = multipart.map_err(|rejection| {
        BgError::invalid_request(format!("expected a multipart/form-data body: {}", rejection))
    })?;

    let mut uploads = HashMap::new();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        if !wanted.contains(&name.as_str()) || uploads.contains_key(&name) {
            continue;
        }
        let data = field.bytes().await.map_err(multipart_error)?;
        uploads.insert(name, data);
    }

    Ok(uploads)
}

fn take_upload(uploads: &mut HashMap<String, Bytes>, name: &str) -> Result<Vec<u8>> {
    uploads
        .remove(name)
        .map(|data| data.to_vec())
        .ok_or_else(|| BgError::invalid_request(format!("missing multipart field '{}'", name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&BgError::Decode("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&BgError::invalid_request("x")), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&BgError::zero_area("t", 0, 1)), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_for(&BgError::dimension_mismatch("m", (1, 1), (2, 2))),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&BgError::segmentation_unavailable("down")),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(status_for(&BgError::segmentation("junk")), StatusCode::BAD_GATEWAY);
        assert_eq!(status_for(&BgError::internal("join")), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_parse_flag() {
        assert!(!parse_flag("f", None).unwrap());
        for truthy in ["true", "TRUE", "1", "yes", "on", " True "] {
            assert!(parse_flag("f", Some(truthy)).unwrap(), "{truthy}");
        }
        for falsy in ["false", "0", "no", "off", ""] {
            assert!(!parse_flag("f", Some(falsy)).unwrap(), "{falsy}");
        }
        let err = parse_flag("return_mask", Some("maybe")).unwrap_err();
        assert!(err.to_string().contains("return_mask"));
    }

    #[test]
    fn test_cors_layer_accepts_defaults_and_lists() {
        assert!(cors_layer(&CorsConfig::default()).is_ok());

        let explicit = CorsConfig {
            allow_origins: vec!["https://example.com".into()],
            allow_credentials: false,
            allow_methods: vec!["get".into(), "POST".into()],
            allow_headers: vec!["content-type".into()],
        };
        assert!(cors_layer(&explicit).is_ok());

        let bad = CorsConfig {
            allow_headers: vec!["bad header".into()],
            ..explicit
        };
        assert!(matches!(cors_layer(&bad), Err(BgError::InvalidConfig(_))));
    }
}
