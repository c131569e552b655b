//! Lanshare CLI
//!
//! 在局域网内共享当前目录：选择网卡、启动 HTTP 服务并打开二维码页面。

use anyhow::Result;
use clap::Parser;
use lanshare_core::{
    AdvertisedEndpoints, AppState, InterfaceSelector, ServerConfig, Settings, StdinSource,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lanshare", version, about = "局域网文件共享 - 浏览、下载与上传")]
struct Cli {
    /// 监听端口 (默认 8000)
    #[arg(short, long)]
    port: Option<u16>,
    /// 文件服务根目录 (默认 .)
    #[arg(short, long)]
    dir: Option<PathBuf>,
    /// 上传文件保存目录 (默认 .)
    #[arg(short, long)]
    upload_dir: Option<PathBuf>,
    /// 只显示以此结尾的文件
    #[arg(short, long)]
    suffix: Option<String>,
    /// 只显示名称包含此子串的文件/目录
    #[arg(short = 'f', long)]
    contains: Option<String>,
    /// 多网卡选择超时 (秒，默认 5)
    #[arg(short, long)]
    timeout: Option<u64>,
    /// 不生成二维码，也不打开浏览器
    #[arg(short, long)]
    no_qrcode: bool,
    /// 列表中不显示子目录
    #[arg(long)]
    no_dir: bool,
    /// 完全禁止目录列表
    #[arg(long)]
    no_listing: bool,
    /// 配置文件路径 (默认 ~/.config/lanshare/settings.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Cli {
    /// 配置文件 + 命令行参数覆盖
    fn settings(&self) -> Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::load_from(path)?,
            None => Settings::load(),
        };

        if let Some(port) = self.port {
            settings.port = port;
        }
        if let Some(dir) = &self.dir {
            settings.serve_dir = dir.clone();
        }
        if let Some(dir) = &self.upload_dir {
            settings.upload_dir = dir.clone();
        }
        if let Some(suffix) = &self.suffix {
            settings.suffix = Some(suffix.clone());
        }
        if let Some(contains) = &self.contains {
            settings.contains = Some(contains.clone());
        }
        if let Some(timeout) = self.timeout {
            settings.select_timeout_secs = timeout;
        }
        settings.no_qrcode |= self.no_qrcode;
        settings.no_dir |= self.no_dir;
        settings.no_listing |= self.no_listing;

        Ok(settings)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // 桥接 log crate（lanshare-core 使用）到 tracing
    let _ = tracing_log::LogTracer::init();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,lanshare_core=debug")),
        )
        .try_init();

    let cli = Cli::parse();
    let settings = cli.settings()?;

    let candidates = lanshare_core::enumerate_interfaces()?;
    let chosen = InterfaceSelector::new(settings.select_timeout())
        .select(&candidates, StdinSource)
        .await?;

    let listener = TcpListener::bind((chosen.address, settings.port)).await?;
    let port = listener.local_addr()?.port();
    let endpoints = AdvertisedEndpoints::new(chosen.address, port);

    tracing::info!("Listen at {}", endpoints.base());
    tracing::info!("Access files by {}", endpoints.files());

    let config = ServerConfig::new(&settings, endpoints.clone());
    let state = Arc::new(AppState::new(config)?);

    if !settings.no_qrcode {
        lanshare_core::browser::open_url(&endpoints.qrcode());
    }

    lanshare_core::server::serve(listener, state).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_parsing() {
        let cli = Cli::parse_from(["lanshare", "-c", "/nonexistent/settings.toml"]);
        assert!(cli.settings().is_err());

        let cli = Cli::parse_from([
            "lanshare", "-p", "9000", "-s", ".jpg", "-f", "trip", "-t", "1", "-n", "--no-dir",
        ]);
        assert_eq!(cli.port, Some(9000));
        assert_eq!(cli.suffix.as_deref(), Some(".jpg"));
        assert_eq!(cli.contains.as_deref(), Some("trip"));
        assert_eq!(cli.timeout, Some(1));
        assert!(cli.no_qrcode);
        assert!(cli.no_dir);
        assert!(!cli.no_listing);
    }
}
