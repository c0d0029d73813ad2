//! # SwitchRegistry：受控交换机登记表
//!
//! ## 核心意图（Why）
//! - 提供基于 `DashMap` 的并发安全存储，让监听循环、连接驱动与业务发送方同时访问；
//! - 按 [`DatapathId`] 而非连接地址索引：OpenFlow 以数据通路标识定位交换机。
//!
//! ## 行为契约（What）
//! - `register`：登记新连接；同一标识已存在时替换旧条目并把旧句柄交还调用方关闭；
//! - `deregister`：仅当登记表中的条目仍属于给定连接序号时才移除，
//!   防止旧连接的迟到拆除误删其替代者；
//! - `get`：返回句柄克隆，不向外泄露 `DashMap` guard。
//!
//! ## 风险提示（Trade-offs）
//! - 未提供自动清理策略，条目的移除完全依赖连接驱动的拆除流程。

use dashmap::{DashMap, mapref::entry::Entry};

use crate::{core::SwitchHandle, datapath::DatapathId};

/// `SwitchRegistry` 负责集中管理 [`SwitchHandle`]。
#[derive(Debug, Default)]
pub struct SwitchRegistry {
    switches: DashMap<DatapathId, SwitchHandle>,
}

impl SwitchRegistry {
    /// 创建空的登记表。
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记交换机连接。
    ///
    /// # 教案式注释
    /// - **意图 (Why)**：交换机断线重连时，旧连接往往尚未被探测为失效；以新连接替换旧连接，
    ///   避免交换机在旧连接超时前无法被控制；
    /// - **契约 (What)**：返回被替换的旧句柄（若存在），调用方负责关闭它；
    /// - **后置条件**：`get(handle.dpid())` 返回新句柄。
    pub fn register(&self, handle: SwitchHandle) -> Option<SwitchHandle> {
        match self.switches.entry(handle.dpid()) {
            Entry::Occupied(mut occupied) => Some(occupied.insert(handle)),
            Entry::Vacant(vacant) => {
                vacant.insert(handle);
                None
            }
        }
    }

    /// 按标识获取句柄。
    pub fn get(&self, dpid: DatapathId) -> Option<SwitchHandle> {
        self.switches.get(&dpid).map(|entry| entry.value().clone())
    }

    /// 移除属于 `connection_id` 的条目，返回是否确实移除。
    pub fn deregister(&self, dpid: DatapathId, connection_id: u64) -> bool {
        self.switches
            .remove_if(&dpid, |_, handle| handle.connection_id() == connection_id)
            .is_some()
    }

    /// 指定交换机是否已登记。
    pub fn contains(&self, dpid: DatapathId) -> bool {
        self.switches.contains_key(&dpid)
    }

    /// 当前登记的全部标识（无序）。
    pub fn datapath_ids(&self) -> Vec<DatapathId> {
        self.switches.iter().map(|entry| *entry.key()).collect()
    }

    /// 当前登记的交换机数量。
    pub fn len(&self) -> usize {
        self.switches.len()
    }

    /// 登记表是否为空。
    pub fn is_empty(&self) -> bool {
        self.switches.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::loopback_writer;

    #[tokio::test(flavor = "multi_thread")]
    async fn replacement_returns_previous_handle() {
        let registry = SwitchRegistry::new();
        let dpid = DatapathId::new(0x42);
        let (writer, _peer_a) = loopback_writer().await;
        let (writer_b, _peer_b) = loopback_writer().await;

        assert!(registry.register(SwitchHandle::new(dpid, 1, writer)).is_none());
        let previous = registry
            .register(SwitchHandle::new(dpid, 2, writer_b))
            .expect("first connection replaced");
        assert_eq!(previous.connection_id(), 1);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(dpid).map(|h| h.connection_id()), Some(2));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stale_deregister_keeps_replacement() {
        let registry = SwitchRegistry::new();
        let dpid = DatapathId::new(0x42);
        let (writer, _peer_a) = loopback_writer().await;
        let (writer_b, _peer_b) = loopback_writer().await;

        registry.register(SwitchHandle::new(dpid, 1, writer));
        registry.register(SwitchHandle::new(dpid, 2, writer_b));

        assert!(!registry.deregister(dpid, 1));
        assert!(registry.contains(dpid));
        assert!(registry.deregister(dpid, 2));
        assert!(registry.is_empty());
    }
}
