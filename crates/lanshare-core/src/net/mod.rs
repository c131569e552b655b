//! 网络地址模块
//!
//! 包含:
//! - 本机接口枚举
//! - 多网卡时的交互式地址选择

pub mod interfaces;
pub mod selector;

pub use interfaces::{InterfaceCandidate, enumerate_interfaces};
pub use selector::{IndexSource, InterfaceSelector, SelectError, StdinSource};
