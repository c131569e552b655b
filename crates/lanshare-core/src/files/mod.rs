//! 文件浏览与下载
//!
//! 对 `/file/` 之后的路径:
//! - 目录（以 `/` 结尾）: 先输出导航头，再输出经过滤的目录列表
//! - 文件: 交给 `tower-http` 的 `ServeFile`，保留 Content-Type / Range 语义
//!
//! 每次请求都重新扫描目录，不做缓存。

pub mod filter;

pub use filter::ListingFilter;

use log::{debug, warn};

use crate::config::{FILE_PATH, ServerConfig};
use crate::pages;
use crate::server::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::ServeFile;

/// 目录列表条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub name: String,
    pub is_dir: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("not found")]
    NotFound,
    #[error("forbidden")]
    Forbidden,
    #[error("io error: {0}")]
    Io(io::Error),
}

impl From<io::Error> for FileError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::NotADirectory => FileError::NotFound,
            io::ErrorKind::PermissionDenied => FileError::Forbidden,
            _ => FileError::Io(e),
        }
    }
}

impl IntoResponse for FileError {
    fn into_response(self) -> Response {
        match self {
            FileError::NotFound => (StatusCode::NOT_FOUND, "404 page not found").into_response(),
            FileError::Forbidden => (StatusCode::FORBIDDEN, "403 Forbidden").into_response(),
            FileError::Io(e) => {
                warn!("File serving error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "500 Internal Server Error").into_response()
            }
        }
    }
}

/// 将请求路径限定在根目录之内
///
/// 路径已经过百分号解码。含 `..` 或反斜杠的段一律拒绝。
pub fn resolve_path(root: &Path, relative: &str) -> Option<PathBuf> {
    let mut resolved = root.to_path_buf();
    for segment in relative.split('/') {
        match segment {
            "" | "." => {}
            ".." => return None,
            s if s.contains('\\') || s.contains('\0') => return None,
            s => resolved.push(s),
        }
    }
    Some(resolved)
}

/// 读取目录并按过滤规则筛选，结果按名称排序
pub async fn read_listing(dir: &Path, filter: &ListingFilter) -> io::Result<Vec<ListingEntry>> {
    let mut reader = tokio::fs::read_dir(dir).await?;
    let mut entries = Vec::new();

    while let Some(entry) = reader.next_entry().await? {
        // 非 UTF-8 名称无法生成可用链接，直接跳过
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                debug!("Skipping non UTF-8 entry {:?}", raw);
                continue;
            }
        };
        // 跟随符号链接判断类型，失败时退回条目自身类型
        let is_dir = match tokio::fs::metadata(entry.path()).await {
            Ok(metadata) => metadata.is_dir(),
            Err(_) => entry.file_type().await.is_ok_and(|t| t.is_dir()),
        };

        if filter.matches(&name, is_dir) {
            entries.push(ListingEntry { name, is_dir });
        }
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

/// `/file/...` 处理器
pub async fn serve_files(State(state): State<Arc<AppState>>, request: Request) -> Response {
    match serve_path(&state.config, request).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

async fn serve_path(config: &ServerConfig, request: Request) -> Result<Response, FileError> {
    let uri_path = request.uri().path().to_string();
    let decoded = urlencoding::decode(&uri_path).map_err(|_| FileError::NotFound)?;
    let relative = decoded.strip_prefix(FILE_PATH).unwrap_or_default();

    let path = resolve_path(&config.serve_root, relative).ok_or(FileError::NotFound)?;
    let metadata = tokio::fs::metadata(&path).await?;
    let wants_dir = uri_path.ends_with('/');

    if metadata.is_dir() {
        if !wants_dir {
            return Ok(Redirect::permanent(&format!("{uri_path}/")).into_response());
        }
        if !config.listing_enabled {
            debug!("Directory listing disabled, rejecting {}", uri_path);
            return Err(FileError::Forbidden);
        }

        let entries = read_listing(&path, &config.filter).await?;
        debug!("Listing {:?}: {} visible entries", path, entries.len());
        let page = pages::listing(
            &config.endpoints,
            config.qrcode_enabled,
            &format!("/{relative}"),
            &entries,
        );
        return Ok(Html(page.into_string()).into_response());
    }

    if wants_dir {
        return Ok(Redirect::permanent(uri_path.trim_end_matches('/')).into_response());
    }

    let response = match ServeFile::new(&path).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };
    Ok(response.map(Body::new))
}
