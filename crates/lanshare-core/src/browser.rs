//! 在本机浏览器中打开页面

use log::{info, warn};

/// 打开 URL，失败只记录警告
pub fn open_url(url: &str) {
    match open::that(url) {
        Ok(()) => info!("Opened {} in browser", url),
        Err(e) => warn!("Failed to open browser for {}: {}", url, e),
    }
}
