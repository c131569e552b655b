//! HTML 页面渲染
//!
//! 所有页面共用同一个页头：标题、导航链接以及（启用时）二维码图片。
//! 链接全部使用广播地址的绝对 URL，方便手机扫码后直接访问。

use maud::{DOCTYPE, Markup, html};

use crate::config::AdvertisedEndpoints;
use crate::files::ListingEntry;
use crate::upload::{MAX_UPLOAD_SLOTS, UploadReport, slot_field_name};

const STYLE: &str = "body { font-family: sans-serif; font-size: 150%; margin: 1em; } \
                     nav a { margin-right: 1em; } \
                     img.qrcode { width: 12em; height: 12em; } \
                     pre a { line-height: 1.8; }";

/// 页头导航链接
struct Nav<'a> {
    title: &'a str,
    links: Vec<(&'a str, String)>,
    qrcode: Option<String>,
}

impl<'a> Nav<'a> {
    fn new(title: &'a str, endpoints: &AdvertisedEndpoints, qrcode_enabled: bool) -> Self {
        Self {
            title,
            links: Vec::new(),
            qrcode: qrcode_enabled.then(|| endpoints.qrcode()),
        }
    }

    fn link(mut self, label: &'a str, href: String) -> Self {
        self.links.push((label, href));
        self
    }
}

fn layout(nav: &Nav<'_>, body: &Markup) -> Markup {
    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (nav.title) }
                style { (STYLE) }
            }
            body {
                h1 { (nav.title) }
                nav {
                    @for (label, href) in &nav.links {
                        a href=(href) { (label) }
                    }
                }
                @if let Some(qrcode) = &nav.qrcode {
                    div { img.qrcode src=(qrcode) alt="QR code"; }
                }
                hr;
                (body)
            }
        }
    }
}

/// 首页
pub fn index(endpoints: &AdvertisedEndpoints, qrcode_enabled: bool) -> Markup {
    let nav = Nav::new("Index Page", endpoints, qrcode_enabled)
        .link("Get Files", endpoints.files())
        .link("Upload Files", endpoints.upload());
    layout(&nav, &html! {
        p { "Browse and download shared files, or send files to this computer." }
    })
}

/// 上传表单
pub fn upload_form(endpoints: &AdvertisedEndpoints, qrcode_enabled: bool) -> Markup {
    let nav = Nav::new("Upload Files", endpoints, qrcode_enabled)
        .link("Get Files", endpoints.files())
        .link("Index", endpoints.index());
    layout(&nav, &html! {
        form method="post" action=(endpoints.upload()) enctype="multipart/form-data" {
            @for index in 1..=MAX_UPLOAD_SLOTS {
                p { input type="file" name=(slot_field_name(index)); }
            }
            p { input type="submit" value="Upload"; }
        }
    })
}

/// 上传结果
pub fn upload_result(
    endpoints: &AdvertisedEndpoints,
    qrcode_enabled: bool,
    report: &UploadReport,
) -> Markup {
    let nav = Nav::new("Upload Result", endpoints, qrcode_enabled)
        .link("Upload More", endpoints.upload())
        .link("Index", endpoints.index());
    layout(&nav, &html! {
        p { "Succeeded: " span id="succeeded" { (report.succeeded.join(",")) } }
        p { "Failed: " span id="failed" { (report.failed.join(",")) } }
        p { "Saved to: " code { (report.upload_root.display().to_string()) } }
    })
}

/// 目录列表（导航头 + 过滤后的条目）
pub fn listing(
    endpoints: &AdvertisedEndpoints,
    qrcode_enabled: bool,
    dir: &str,
    entries: &[ListingEntry],
) -> Markup {
    let nav = Nav::new("Get Files", endpoints, qrcode_enabled)
        .link("Upload Files", endpoints.upload())
        .link("Index", endpoints.index());
    layout(&nav, &html! {
        h2 { (dir) }
        pre {
            @for entry in entries {
                @let suffix = if entry.is_dir { "/" } else { "" };
                a href={ (urlencoding::encode(&entry.name).into_owned()) (suffix) } { (entry.name) (suffix) }
                "\n"
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use std::path::PathBuf;

    fn endpoints() -> AdvertisedEndpoints {
        AdvertisedEndpoints::new(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 5)), 8000)
    }

    #[test]
    fn test_upload_form_has_all_slots() {
        let page = upload_form(&endpoints(), true).into_string();
        for index in 1..=MAX_UPLOAD_SLOTS {
            assert!(page.contains(&format!("name=\"upfile{index}\"")));
        }
        assert!(page.contains("enctype=\"multipart/form-data\""));
        assert!(page.contains("http://192.168.1.5:8000/qrcode"));
    }

    #[test]
    fn test_qrcode_hidden_when_disabled() {
        let page = index(&endpoints(), false).into_string();
        assert!(!page.contains("/qrcode"));
        assert!(page.contains("http://192.168.1.5:8000/file/"));
    }

    #[test]
    fn test_listing_escapes_names() {
        let entries = vec![
            ListingEntry {
                name: "a b&c.txt".to_string(),
                is_dir: false,
            },
            ListingEntry {
                name: "photos".to_string(),
                is_dir: true,
            },
        ];
        let page = listing(&endpoints(), true, "/", &entries).into_string();

        assert!(page.contains("href=\"a%20b%26c.txt\""));
        assert!(page.contains("a b&amp;c.txt"));
        assert!(page.contains("href=\"photos/\""));
        assert!(page.contains(">photos/<"));
        assert!(page.contains("http://192.168.1.5:8000/upload"));
    }

    #[test]
    fn test_upload_result_lists_partition() {
        let report = UploadReport {
            succeeded: vec!["a.txt".to_string(), "b.txt".to_string()],
            failed: vec!["c.txt".to_string()],
            upload_root: PathBuf::from("/srv/inbox"),
        };
        let page = upload_result(&endpoints(), false, &report).into_string();

        assert!(page.contains("<span id=\"succeeded\">a.txt,b.txt</span>"));
        assert!(page.contains("<span id=\"failed\">c.txt</span>"));
        assert!(page.contains("/srv/inbox"));
    }
}
