use std::sync::Arc;

use spark_openflow::OfpMessage;
use tracing::trace;

use crate::{
    core::SwitchRegistry,
    datapath::{DatapathId, SwitchRef},
    error::SwitchError,
};

/// 按数据通路标识发送消息的入口。
///
/// # 教案式说明
/// - **意图 (Why)**：业务侧只持有交换机标识，不持有连接；每次发送都经登记表解析到当前连接；
/// - **契约 (What)**：
///   - 未登记的标识返回 [`SwitchError::NotConnected`]；
///   - 同一标识可被连续、快速地重复调用，每次调用等待整帧写出后才返回；
///   - 克隆开销为一次 `Arc` 引用计数递增。
/// - **风险 (Trade-offs)**：交换机重连后，[`send`](Self::send) 会解析到新连接；
///   需要绑定到某一条连接时使用 [`send_to`](Self::send_to)。
#[derive(Clone, Debug)]
pub struct SwitchSender {
    registry: Arc<SwitchRegistry>,
}

impl SwitchSender {
    /// 以共享登记表构造发送入口。
    pub fn new(registry: Arc<SwitchRegistry>) -> Self {
        Self { registry }
    }

    /// 向指定交换机发送一条消息。
    pub async fn send(&self, dpid: DatapathId, message: OfpMessage) -> Result<(), SwitchError> {
        let handle = self
            .registry
            .get(dpid)
            .ok_or(SwitchError::NotConnected { dpid })?;
        let name = message.name();
        let xid = handle.send(message).await?;
        trace!(%dpid, xid, message = name, "message sent");
        Ok(())
    }

    /// 只向 `switch` 所指的那条连接发送。
    ///
    /// - **契约 (What)**：交换机未登记返回 [`SwitchError::NotConnected`]；登记的是另一条连接
    ///   （重连取代，或拆除后重新接入）返回 [`SwitchError::ConnectionReplaced`]，消息不会写出；
    ///   目标连接已关闭但尚未注销时，由写出失败报告断开。
    pub async fn send_to(&self, switch: SwitchRef, message: OfpMessage) -> Result<(), SwitchError> {
        let dpid = switch.dpid();
        let handle = self
            .registry
            .get(dpid)
            .ok_or(SwitchError::NotConnected { dpid })?;
        if handle.connection_id() != switch.connection_id() {
            return Err(SwitchError::ConnectionReplaced { switch });
        }
        let name = message.name();
        let xid = handle.send(message).await?;
        trace!(%switch, xid, message = name, "message sent");
        Ok(())
    }

    /// 指定交换机当前是否已登记。
    pub fn is_connected(&self, dpid: DatapathId) -> bool {
        self.registry.contains(dpid)
    }

    /// 当前登记的全部交换机。
    pub fn connected(&self) -> Vec<DatapathId> {
        self.registry.datapath_ids()
    }
}
