//! Lanshare Core Library
//!
//! 局域网文件共享：把本地目录通过 HTTP 暴露给同一网络中的设备（如手机），
//! 支持浏览下载、批量上传，并用二维码广播访问地址。
//!
//! # 模块
//!
//! - **net**: 本机接口枚举与多网卡选择
//! - **files**: 带过滤规则的目录列表与文件下载
//! - **upload**: 多文件并发上传
//! - **pages** / **qr**: 页面与二维码渲染
//! - **server**: axum 路由
//!
//! # 使用示例
//!
//! ```ignore
//! use lanshare_core::{AdvertisedEndpoints, AppState, InterfaceSelector, ServerConfig, Settings};
//!
//! let settings = Settings::load();
//! let candidates = lanshare_core::enumerate_interfaces()?;
//! let chosen = InterfaceSelector::new(settings.select_timeout())
//!     .select(&candidates, lanshare_core::StdinSource)
//!     .await?;
//!
//! let listener = tokio::net::TcpListener::bind((chosen.address, settings.port)).await?;
//! let endpoints = AdvertisedEndpoints::new(chosen.address, listener.local_addr()?.port());
//! let state = AppState::new(ServerConfig::new(&settings, endpoints))?;
//! lanshare_core::server::serve(listener, std::sync::Arc::new(state)).await?;
//! ```

pub mod browser;
pub mod config;
pub mod files;
pub mod net;
pub mod pages;
pub mod qr;
pub mod server;
pub mod upload;

pub use config::{AdvertisedEndpoints, ServerConfig, Settings};
pub use files::{ListingEntry, ListingFilter};
pub use net::{
    IndexSource, InterfaceCandidate, InterfaceSelector, SelectError, StdinSource,
    enumerate_interfaces,
};
pub use server::{AppState, router};
pub use upload::{
    DEFAULT_MEMORY_LIMIT, UploadCoordinator, UploadForm, UploadOutcome, UploadReport, UploadSlot,
};
