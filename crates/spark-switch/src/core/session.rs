//! # 连接状态管理（SwitchSession）
//!
//! ## 核心意图（Why）
//! - 建模单条控制通道从“已接入”到“受控”再到“已拆除”的生命周期；
//! - 保证就绪事件只会在握手完成后触发一次，拆除后不会再次进入就绪态。
//!
//! ## 状态机约束（What）
//! - 合法跃迁：`Discovered → Ready → Closed`，握手失败时 `Discovered` 可直接跳转至 `Closed`；
//! - 同态跃迁视为幂等；其余跃迁返回
//!   [`SwitchError::InvalidStateTransition`](crate::error::SwitchError::InvalidStateTransition)。

use std::net::SocketAddr;

use crate::{datapath::DatapathId, error::SwitchError};

/// 控制通道状态。
///
/// # 教案式说明
/// - **意图 (Why)**：区分握手阶段与受控阶段，决定哪些消息可以被视为合法；
/// - **契约 (What)**：状态间跃迁受 [`ConnectionState::can_transition_to`] 限制。
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum ConnectionState {
    /// TCP 已接入，握手进行中。
    Discovered,
    /// 握手完成，交换机已登记并可接收消息。
    Ready,
    /// 连接已拆除。
    Closed,
}

impl ConnectionState {
    /// 判断状态是否允许跃迁至 `target`。
    ///
    /// - **执行 (How)**：通过匹配元组 `(self, target)` 实现有限状态机判定。
    pub fn can_transition_to(self, target: ConnectionState) -> bool {
        matches!(
            (self, target),
            (ConnectionState::Discovered, ConnectionState::Discovered)
                | (ConnectionState::Discovered, ConnectionState::Ready)
                | (ConnectionState::Discovered, ConnectionState::Closed)
                | (ConnectionState::Ready, ConnectionState::Ready)
                | (ConnectionState::Ready, ConnectionState::Closed)
                | (ConnectionState::Closed, ConnectionState::Closed)
        )
    }

    /// 状态是否已终止。
    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Closed)
    }
}

/// 单条控制通道的会话记录。
///
/// # 教案式说明
/// - **意图 (Why)**：由连接驱动任务独占持有，集中维护连接序号、对端地址、数据通路标识与状态；
/// - **契约 (What)**：
///   - `connection_id` 在控制器进程内单调递增，用于区分同一交换机的新旧连接；
///   - `dpid` 仅在进入 `Ready` 后可用；
/// - **风险 (Trade-offs)**：不做并发保护，调用方必须持有 `&mut self`。
#[derive(Debug)]
pub(crate) struct SwitchSession {
    connection_id: u64,
    peer: SocketAddr,
    dpid: Option<DatapathId>,
    state: ConnectionState,
}

impl SwitchSession {
    pub(crate) fn new(connection_id: u64, peer: SocketAddr) -> Self {
        Self {
            connection_id,
            peer,
            dpid: None,
            state: ConnectionState::Discovered,
        }
    }

    pub(crate) fn connection_id(&self) -> u64 {
        self.connection_id
    }

    pub(crate) fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub(crate) fn dpid(&self) -> Option<DatapathId> {
        self.dpid
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.state
    }

    /// 握手完成：记录数据通路标识并进入 `Ready`。
    pub(crate) fn mark_ready(&mut self, dpid: DatapathId) -> Result<(), SwitchError> {
        self.transition(ConnectionState::Ready)?;
        self.dpid = Some(dpid);
        Ok(())
    }

    /// 状态机跃迁。
    ///
    /// - **契约 (What)**：先使用 [`ConnectionState::can_transition_to`] 校验，成功后更新状态；
    ///   同态跃迁直接返回 `Ok(())`。
    pub(crate) fn transition(&mut self, next: ConnectionState) -> Result<(), SwitchError> {
        if self.state == next {
            return Ok(());
        }
        if !self.state.can_transition_to(next) {
            return Err(SwitchError::InvalidStateTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> SwitchSession {
        SwitchSession::new(1, "127.0.0.1:40000".parse().expect("addr"))
    }

    #[test]
    fn handshake_then_close_is_accepted() {
        let mut session = session();
        session.mark_ready(DatapathId::new(0x1)).expect("ready");
        assert_eq!(session.dpid(), Some(DatapathId::new(0x1)));
        session.transition(ConnectionState::Closed).expect("close");
        assert!(session.state().is_terminal());
    }

    #[test]
    fn failed_handshake_may_close_directly() {
        let mut session = session();
        session.transition(ConnectionState::Closed).expect("close");
        assert_eq!(session.dpid(), None);
    }

    #[test]
    fn closed_connection_cannot_become_ready() {
        let mut session = session();
        session.transition(ConnectionState::Closed).expect("close");
        let err = session
            .mark_ready(DatapathId::new(0x2))
            .expect_err("closed is terminal");
        assert!(matches!(
            err,
            SwitchError::InvalidStateTransition {
                from: ConnectionState::Closed,
                to: ConnectionState::Ready,
            }
        ));
        assert_eq!(session.dpid(), None);
    }
}
