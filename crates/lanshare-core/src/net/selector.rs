//! 网卡选择
//!
//! 多网卡时需要确定对外广播哪一个地址：
//! - 只有一个候选: 直接使用
//! - 多个候选: 按名称排序后列出，等待用户输入序号，超时则使用第一个
//!
//! 控制台读取无法可靠地中断，所以读取放在独立线程里，
//! 输掉竞争的一方直接丢弃。

use log::{debug, info, warn};

use crate::net::InterfaceCandidate;
use std::collections::BTreeMap;
use std::io::{self, BufRead};
use std::net::IpAddr;
use std::time::Duration;
use tokio::sync::oneshot;

/// 输入提示中的默认序号
pub const DEFAULT_INDEX: usize = 0;

#[derive(Debug, thiserror::Error)]
pub enum SelectError {
    #[error("can not get local ip address")]
    NoAddress,
    #[error("invalid interface index {input:?}, expected 0..{count}")]
    InvalidIndex { input: String, count: usize },
    #[error("failed to read interface index: {0}")]
    Input(#[from] io::Error),
}

/// 序号输入来源
///
/// `read_line` 会阻塞，返回 `Ok(None)` 表示输入已结束。
pub trait IndexSource: Send + 'static {
    fn read_line(self) -> io::Result<Option<String>>;
}

/// 从标准输入读取一行
pub struct StdinSource;

impl IndexSource for StdinSource {
    fn read_line(self) -> io::Result<Option<String>> {
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line)? {
            0 => Ok(None),
            _ => Ok(Some(line)),
        }
    }
}

/// 网卡选择器
pub struct InterfaceSelector {
    timeout: Duration,
}

impl InterfaceSelector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// 从候选集合中选出唯一的地址
    pub async fn select<S: IndexSource>(
        &self,
        candidates: &BTreeMap<String, IpAddr>,
        source: S,
    ) -> Result<InterfaceCandidate, SelectError> {
        // BTreeMap 迭代顺序即按名称排序
        let ordered: Vec<InterfaceCandidate> = candidates
            .iter()
            .map(|(name, address)| InterfaceCandidate::new(name.clone(), *address))
            .collect();

        match ordered.as_slice() {
            [] => Err(SelectError::NoAddress),
            [only] => {
                info!("Using {}\t{}", only.name, only.address);
                Ok(only.clone())
            }
            _ => self.race(ordered, source).await,
        }
    }

    async fn race<S: IndexSource>(
        &self,
        ordered: Vec<InterfaceCandidate>,
        source: S,
    ) -> Result<InterfaceCandidate, SelectError> {
        print_candidates(&ordered);

        let (tx, rx) = oneshot::channel();
        std::thread::Builder::new()
            .name("interface-select".to_string())
            .spawn(move || {
                // 超时后接收端已被丢弃，发送失败可以忽略
                let _ = tx.send(source.read_line());
            })?;

        tokio::select! {
            () = tokio::time::sleep(self.timeout) => {
                println!();
                let chosen = ordered[DEFAULT_INDEX].clone();
                info!("Input timeout, using {}\t{}", chosen.name, chosen.address);
                Ok(chosen)
            }
            input = rx => {
                let line = match input {
                    Ok(result) => result?,
                    Err(_) => {
                        warn!("Interface input thread exited without a result");
                        None
                    }
                };
                let index = parse_index(line.as_deref(), ordered.len())?;
                let chosen = ordered[index].clone();
                println!("Using {}\t{}", chosen.name, chosen.address);
                Ok(chosen)
            }
        }
    }
}

fn print_candidates(ordered: &[InterfaceCandidate]) {
    println!("You have more than 1 NIC, please select one.\n");
    for (i, candidate) in ordered.iter().enumerate() {
        println!("{:2}\t{:<16}\t{}", i, candidate.name, candidate.address);
    }
    print!("Please input the interface index[{DEFAULT_INDEX}]: ");
    if let Err(e) = io::Write::flush(&mut io::stdout()) {
        debug!("Failed to flush prompt: {}", e);
    }
}

/// 解析用户输入的序号
///
/// 空行或输入结束视为默认序号。
fn parse_index(line: Option<&str>, count: usize) -> Result<usize, SelectError> {
    let input = line.map(str::trim).unwrap_or_default();
    if input.is_empty() {
        return Ok(DEFAULT_INDEX);
    }

    match input.parse::<usize>() {
        Ok(index) if index < count => Ok(index),
        _ => Err(SelectError::InvalidIndex {
            input: input.to_string(),
            count,
        }),
    }
}
