use std::{error::Error, fmt, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;

use crate::message::ControlMessage;

/// 类型擦除后的底层错误。
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// 发送失败的粗粒度分类。
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TransportErrorKind {
    /// 交换机连接已断开或从未建立。
    Disconnected,
    /// 超过发送时限。
    Timeout,
    /// 消息无法编码。
    Encode,
    /// 写出失败。
    Write,
    /// 其它失败。
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TransportErrorKind::Disconnected => "disconnected",
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Encode => "encode",
            TransportErrorKind::Write => "write",
            TransportErrorKind::Other => "other",
        };
        f.write_str(text)
    }
}

/// [`MessageSender::send`] 的失败结果。
///
/// # 教案式说明
/// - **意图 (Why)**：突发核心不关心失败来自哪一层，只需要知道“这次没发出去”以及粗略原因；
/// - **契约 (What)**：`kind` 给出分类，底层错误经 `source()` 保留；
/// - **风险 (Trade-offs)**：底层错误被类型擦除，需要精确匹配时应在适配层处理。
#[derive(Debug, Error)]
#[error("{kind} failure: {source}")]
pub struct TransportError {
    kind: TransportErrorKind,
    #[source]
    source: BoxError,
}

impl TransportError {
    /// 构造发送错误。
    pub fn new(kind: TransportErrorKind, source: impl Into<BoxError>) -> Self {
        Self {
            kind,
            source: source.into(),
        }
    }

    /// 失败分类。
    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    /// 是否因连接断开导致。
    pub fn is_disconnect(&self) -> bool {
        self.kind == TransportErrorKind::Disconnected
    }
}

/// 框架提供的发送能力。
///
/// # 教案式说明
/// - **意图 (Why)**：突发核心只通过这一接口触达交换机，从不直接持有连接；
/// - **契约 (What)**：
///   - `send` 在消息交给传输层（或失败）之后才返回；
///   - 必须允许对同一交换机连续、立即地重复调用；
/// - **风险 (Trade-offs)**：接口本身不设超时，若实现永不返回则突发会停滞，
///   超时应由实现方按需配置。
#[async_trait]
pub trait MessageSender<Id>: Send + Sync
where
    Id: Send + 'static,
{
    /// 向 `switch` 发送一条消息。
    async fn send(&self, switch: Id, message: ControlMessage) -> Result<(), TransportError>;
}

#[async_trait]
impl<Id, S> MessageSender<Id> for Arc<S>
where
    Id: Send + 'static,
    S: MessageSender<Id> + ?Sized,
{
    async fn send(&self, switch: Id, message: ControlMessage) -> Result<(), TransportError> {
        (**self).send(switch, message).await
    }
}
