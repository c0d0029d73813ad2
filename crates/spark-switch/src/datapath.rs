use std::fmt;

/// OpenFlow 交换机的 64 位数据通路标识。
///
/// # 教案式说明
/// - **意图 (Why)**：FEATURES_REPLY 中的 `datapath_id` 是控制器定位交换机的唯一键；
///   用新类型包裹可以防止与事务号、连接序号等其它整数混用；
/// - **契约 (What)**：`Copy + Eq + Hash`，可直接作为 `DashMap` Key 与日志字段；
///   `Display` 输出固定 16 位十六进制（带 `0x` 前缀），与常见交换机 CLI 的展示一致；
/// - **风险 (Trade-offs)**：标识由交换机自报，控制器不做唯一性担保，重复上报由登记表处理。
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct DatapathId(u64);

impl DatapathId {
    /// 包装原始数值。
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// 返回原始数值。
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for DatapathId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for DatapathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// 一条受控连接的标识：数据通路标识加连接序号。
///
/// # 教案式说明
/// - **意图 (Why)**：[`DatapathId`] 在交换机重连后保持不变，单凭它无法区分新旧连接；
///   就绪回调拿到的是连接级标识，只在该连接存活期间有效；
/// - **契约 (What)**：经 [`SwitchSender::send_to`](crate::SwitchSender::send_to) 发送时，
///   若登记表中同一交换机已换成另一条连接，发送以
///   [`SwitchError::ConnectionReplaced`](crate::SwitchError::ConnectionReplaced) 失败，
///   消息不会落到新连接上；
/// - `Display` 形如 `0x0000000000000007#3`。
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct SwitchRef {
    dpid: DatapathId,
    connection_id: u64,
}

impl SwitchRef {
    /// 以数据通路标识与连接序号构造。
    pub const fn new(dpid: DatapathId, connection_id: u64) -> Self {
        Self {
            dpid,
            connection_id,
        }
    }

    /// 数据通路标识。
    pub const fn dpid(self) -> DatapathId {
        self.dpid
    }

    /// 连接序号。
    pub const fn connection_id(self) -> u64 {
        self.connection_id
    }
}

impl fmt::Display for SwitchRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.dpid, self.connection_id)
    }
}
