//! 本机网络接口枚举
//!
//! 通过 `if-addrs` 列出本机接口，只保留可以对外广播的 IPv4 地址。

use log::{debug, info};

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr};

/// 候选接口（网卡名 + 地址）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceCandidate {
    pub name: String,
    pub address: IpAddr,
}

impl InterfaceCandidate {
    pub fn new(name: impl Into<String>, address: IpAddr) -> Self {
        Self {
            name: name.into(),
            address,
        }
    }
}

/// 枚举本机可用地址
///
/// 返回 网卡名 → 地址 的有序映射。同一网卡有多个地址时保留第一个。
pub fn enumerate_interfaces() -> anyhow::Result<BTreeMap<String, IpAddr>> {
    let interfaces = if_addrs::get_if_addrs()?;
    let mut candidates = BTreeMap::new();

    for iface in interfaces {
        let if_addrs::IfAddr::V4(v4) = &iface.addr else {
            continue;
        };

        if !is_advertisable(v4.ip) {
            debug!("Skipping interface {} ({})", iface.name, v4.ip);
            continue;
        }

        candidates
            .entry(iface.name.clone())
            .or_insert(IpAddr::V4(v4.ip));
    }

    info!("Found {} usable network interface(s)", candidates.len());
    Ok(candidates)
}

fn is_advertisable(ip: Ipv4Addr) -> bool {
    !(ip.is_loopback() || ip.is_link_local() || ip.is_unspecified() || ip.is_broadcast())
}
