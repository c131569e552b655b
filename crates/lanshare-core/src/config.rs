//! 应用配置
//!
//! 启动时确定的全部设置：监听端口、共享目录、上传目录、列表过滤规则等。
//! 进程启动后只读，不支持运行时修改。

use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::files::ListingFilter;

pub const FILE_PATH: &str = "/file/";
pub const INDEX_PATH: &str = "/index";
pub const UPLOAD_PATH: &str = "/upload";
pub const QRCODE_PATH: &str = "/qrcode";

/// 用户设置（可从 TOML 文件加载，命令行参数覆盖）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// 监听端口
    pub port: u16,
    /// 文件服务根目录
    pub serve_dir: PathBuf,
    /// 上传文件保存目录
    pub upload_dir: PathBuf,
    /// 文件名后缀过滤
    pub suffix: Option<String>,
    /// 文件名子串过滤
    pub contains: Option<String>,
    /// 多网卡选择超时（秒）
    pub select_timeout_secs: u64,
    /// 不生成二维码，也不打开浏览器
    pub no_qrcode: bool,
    /// 列表中不显示子目录
    pub no_dir: bool,
    /// 完全禁止目录列表
    pub no_listing: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: 8000,
            serve_dir: PathBuf::from("."),
            upload_dir: PathBuf::from("."),
            suffix: None,
            contains: None,
            select_timeout_secs: 5,
            no_qrcode: false,
            no_dir: false,
            no_listing: false,
        }
    }
}

impl Settings {
    /// 默认配置文件路径
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lanshare")
            .join("settings.toml")
    }

    /// 加载默认位置的设置（文件不存在或无法解析时使用默认值）
    pub fn load() -> Self {
        let path = Self::config_path();
        if path.exists() {
            match Self::load_from(&path) {
                Ok(settings) => return settings,
                Err(e) => {
                    log::warn!("Failed to load settings: {:#}, using defaults", e);
                }
            }
        }
        Self::default()
    }

    /// 从指定文件加载设置
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let settings = toml::from_str(&content)?;
        debug!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    pub fn select_timeout(&self) -> Duration {
        Duration::from_secs(self.select_timeout_secs)
    }

    pub fn listing_filter(&self) -> ListingFilter {
        ListingFilter::new(self.suffix.clone(), self.contains.clone(), !self.no_dir)
    }
}

/// 对外广播的访问地址
///
/// 网卡选定后计算一次，所有页面中的链接都由它生成。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisedEndpoints {
    base: String,
}

impl AdvertisedEndpoints {
    pub fn new(ip: IpAddr, port: u16) -> Self {
        Self {
            base: format!("http://{}", SocketAddr::new(ip, port)),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn files(&self) -> String {
        format!("{}{}", self.base, FILE_PATH)
    }

    pub fn index(&self) -> String {
        format!("{}{}", self.base, INDEX_PATH)
    }

    pub fn upload(&self) -> String {
        format!("{}{}", self.base, UPLOAD_PATH)
    }

    pub fn qrcode(&self) -> String {
        format!("{}{}", self.base, QRCODE_PATH)
    }
}

/// 服务端只读配置
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub serve_root: PathBuf,
    pub upload_root: PathBuf,
    pub filter: ListingFilter,
    pub listing_enabled: bool,
    pub qrcode_enabled: bool,
    pub endpoints: AdvertisedEndpoints,
}

impl ServerConfig {
    pub fn new(settings: &Settings, endpoints: AdvertisedEndpoints) -> Self {
        Self {
            serve_root: settings.serve_dir.clone(),
            upload_root: settings.upload_dir.clone(),
            filter: settings.listing_filter(),
            listing_enabled: !settings.no_listing,
            qrcode_enabled: !settings.no_qrcode,
            endpoints,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.port, 8000);
        assert_eq!(settings.select_timeout(), Duration::from_secs(5));
        assert!(!settings.no_qrcode);
        assert!(settings.listing_filter().show_directories());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            port = 9000
            suffix = ".jpg"
            no_dir = true
            "#,
        )
        .unwrap();

        assert_eq!(settings.port, 9000);
        assert_eq!(settings.suffix.as_deref(), Some(".jpg"));
        assert!(settings.no_dir);
        assert_eq!(settings.upload_dir, PathBuf::from("."));
        assert_eq!(settings.select_timeout_secs, 5);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "upload_dir = \"/srv/inbox\"\nno_qrcode = true\n").unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.upload_dir, PathBuf::from("/srv/inbox"));
        assert!(settings.no_qrcode);

        fs::write(&path, "port = \"not a number\"").unwrap();
        assert!(Settings::load_from(&path).is_err());
    }

    #[test]
    fn test_endpoints() {
        let endpoints = AdvertisedEndpoints::new(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 5)), 8000);
        assert_eq!(endpoints.base(), "http://192.168.1.5:8000");
        assert_eq!(endpoints.files(), "http://192.168.1.5:8000/file/");
        assert_eq!(endpoints.index(), "http://192.168.1.5:8000/index");
        assert_eq!(endpoints.upload(), "http://192.168.1.5:8000/upload");
        assert_eq!(endpoints.qrcode(), "http://192.168.1.5:8000/qrcode");
    }

    #[test]
    fn test_server_config_from_settings() {
        let settings = Settings {
            no_listing: true,
            no_qrcode: true,
            ..Default::default()
        };
        let endpoints = AdvertisedEndpoints::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8000);
        let config = ServerConfig::new(&settings, endpoints);

        assert!(!config.listing_enabled);
        assert!(!config.qrcode_enabled);
    }
}
