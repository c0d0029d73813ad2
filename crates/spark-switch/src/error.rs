//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 为控制器对外暴露的错误语义提供集中定义，区分“连接已失效”与“单次操作失败”；
//! - 归档传输、编解码、握手与配置等不同类别，方便运维检索。
//!
//! ## 设计要求（What）
//! - 所有错误类型实现 `thiserror::Error`，底层错误通过 `#[source]` 保留错误链；
//! - [`SwitchError::is_disconnect`] 为上层提供“连接是否仍可用”的统一判定。

use std::time::Duration;

use spark_openflow::CodecError;
use spark_transport_tcp::TcpError;
use thiserror::Error;

use crate::{
    core::ConnectionState,
    datapath::{DatapathId, SwitchRef},
};

/// 控制器核心错误域。
///
/// # 教案式说明
/// - **意图 (Why)**：聚合连接生命周期上各关键路径的异常，借助细粒度枚举帮助运维快速定位故障来源；
/// - **契约 (What)**：所有变体均为 `Send + Sync + 'static`，可安全跨任务传播；
/// - **设计权衡 (Trade-offs)**：`TcpError` 携带不可克隆的 `io::Error`，因此本类型不实现 `Clone`。
#[derive(Debug, Error)]
pub enum SwitchError {
    /// 底层 TCP 操作失败。
    #[error(transparent)]
    Transport(#[from] TcpError),

    /// 帧编解码失败；解码失败后缓冲区不再可信，连接随之关闭。
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// 握手未在限定时间内完成。
    #[error("openflow handshake with {peer} did not complete within {timeout:?}")]
    HandshakeTimeout {
        /// 对端地址文本。
        peer: String,
        /// 生效的握手超时。
        timeout: Duration,
    },

    /// 对端宣告的协议版本低于 OpenFlow 1.3。
    #[error("peer {peer} speaks openflow version {version:#04x}, 0x04 is required")]
    IncompatibleVersion {
        /// 对端地址文本。
        peer: String,
        /// 对端 HELLO 帧头中的版本号。
        version: u8,
    },

    /// 握手阶段收到无法继续的消息，例如交换机回送 OFPT_ERROR。
    #[error("expected {expected} from {peer}, received {actual}")]
    UnexpectedMessage {
        /// 对端地址文本。
        peer: String,
        /// 期望的消息名称。
        expected: &'static str,
        /// 实际收到的消息名称。
        actual: &'static str,
    },

    /// 对端已关闭连接。
    #[error("switch connection closed by peer")]
    PeerClosed,

    /// 目标交换机当前未登记。
    #[error("switch {dpid} is not connected")]
    NotConnected {
        /// 请求访问的交换机。
        dpid: DatapathId,
    },

    /// 目标连接已被同一交换机的新连接取代，或已拆除后又有新连接登记。
    #[error("connection {switch} is no longer the active connection of its switch")]
    ConnectionReplaced {
        /// 发送方持有的连接标识。
        switch: SwitchRef,
    },

    /// 状态机拒绝非法的状态跃迁。
    #[error("invalid connection state transition: {from:?} -> {to:?} is not permitted")]
    InvalidStateTransition {
        /// 当前状态。
        from: ConnectionState,
        /// 请求的目标状态。
        to: ConnectionState,
    },

    /// 配置解析或校验失败。
    #[error("invalid controller configuration: {detail}")]
    Config {
        /// 失败说明。
        detail: String,
    },
}

impl SwitchError {
    /// 连接是否已经不可用。
    ///
    /// - **契约 (What)**：对端关闭、目标未登记、连接已被取代、传输层报告连接重置或上下文被取消时返回 `true`；
    ///   超时与编码失败返回 `false`，此时连接可能仍然存活。
    pub fn is_disconnect(&self) -> bool {
        match self {
            SwitchError::PeerClosed
            | SwitchError::NotConnected { .. }
            | SwitchError::ConnectionReplaced { .. } => true,
            SwitchError::Transport(err) => err.is_closed() || err.is_cancelled(),
            _ => false,
        }
    }

    /// 是否由截止时间触发。
    pub fn is_timeout(&self) -> bool {
        match self {
            SwitchError::HandshakeTimeout { .. } => true,
            SwitchError::Transport(err) => err.is_timeout(),
            _ => false,
        }
    }

    pub(crate) fn config(detail: impl Into<String>) -> Self {
        SwitchError::Config {
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_connected_counts_as_disconnect() {
        let err = SwitchError::NotConnected {
            dpid: DatapathId::new(7),
        };
        assert!(err.is_disconnect());
        assert_eq!(err.to_string(), "switch 0x0000000000000007 is not connected");
    }

    #[test]
    fn replaced_connection_counts_as_disconnect() {
        let err = SwitchError::ConnectionReplaced {
            switch: SwitchRef::new(DatapathId::new(7), 1),
        };
        assert!(err.is_disconnect());
        assert!(err.to_string().contains("0x0000000000000007#1"));
    }

    #[test]
    fn codec_failure_is_not_a_disconnect() {
        let err = SwitchError::from(CodecError::LengthTooShort { length: 4 });
        assert!(!err.is_disconnect());
        assert!(!err.is_timeout());
    }
}
