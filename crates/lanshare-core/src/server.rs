//! HTTP 服务
//!
//! # 路由
//!
//! - `GET /index`: 首页
//! - `GET /upload`: 上传表单；`POST /upload`: 处理上传
//! - `GET /file/...`: 浏览/下载共享目录
//! - `GET /qrcode`: 首页地址二维码（可关闭）

use log::{error, info, warn};

use crate::config::{FILE_PATH, INDEX_PATH, QRCODE_PATH, ServerConfig, UPLOAD_PATH};
use crate::files;
use crate::pages;
use crate::qr;
use crate::upload::{UploadCoordinator, UploadForm};
use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartRejection},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Redirect},
    routing::get,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// 二维码图片边长（像素）
const QRCODE_SIZE: u32 = 256;

/// 服务器状态，启动后只读
pub struct AppState {
    pub config: ServerConfig,
    pub uploads: UploadCoordinator,
    qrcode_png: Option<Vec<u8>>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Result<Self, qr::QrError> {
        let qrcode_png = if config.qrcode_enabled {
            Some(qr::encode_png(&config.endpoints.index(), QRCODE_SIZE)?)
        } else {
            None
        };

        Ok(Self {
            uploads: UploadCoordinator::new(config.upload_root.clone()),
            config,
            qrcode_png,
        })
    }
}

/// 构建路由
pub fn router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route(INDEX_PATH, get(index_handler))
        .route(
            UPLOAD_PATH,
            get(upload_form_handler)
                .post(upload_handler)
                .layer(DefaultBodyLimit::disable()),
        )
        .route("/file", get(|| async { Redirect::permanent(FILE_PATH) }))
        .route(FILE_PATH, get(files::serve_files))
        .route("/file/*path", get(files::serve_files));

    if state.qrcode_png.is_some() {
        app = app.route(QRCODE_PATH, get(qrcode_handler));
    }

    app.layer(TraceLayer::new_for_http()).with_state(state)
}

/// 在已绑定的端口上运行服务，直到进程被终止
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = router(state);
    info!("HTTP server listening on {}", listener.local_addr()?);
    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        return Err(e.into());
    }
    Ok(())
}

async fn index_handler(State(state): State<Arc<AppState>>) -> Html<String> {
    let config = &state.config;
    Html(pages::index(&config.endpoints, config.qrcode_enabled).into_string())
}

async fn upload_form_handler(State(state): State<Arc<AppState>>) -> Html<String> {
    let config = &state.config;
    Html(pages::upload_form(&config.endpoints, config.qrcode_enabled).into_string())
}

async fn upload_handler(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Html<String> {
    // 不是合法的 multipart 请求时按空表单处理，仍返回结果页
    let form = match multipart {
        Ok(multipart) => UploadForm::from_multipart(multipart, state.uploads.memory_limit()).await,
        Err(rejection) => {
            warn!("Upload request is not a multipart form: {}", rejection.body_text());
            UploadForm::new()
        }
    };
    info!("Upload request with {} file slot(s)", form.len());

    let report = state.uploads.process(form).await;
    let config = &state.config;
    Html(pages::upload_result(&config.endpoints, config.qrcode_enabled, &report).into_string())
}

async fn qrcode_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match &state.qrcode_png {
        Some(png) => ([(header::CONTENT_TYPE, "image/png")], png.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
