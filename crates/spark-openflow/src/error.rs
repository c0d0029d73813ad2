use thiserror::Error;

/// 编解码阶段的错误域。
///
/// # 教案式说明
/// - **意图 (Why)**：把“帧头不合法”“超出预算”“定长消息体被截断”三类失败区分开，
///   让上层据此决定是关闭连接还是仅丢弃单帧；
/// - **契约 (What)**：所有变体均为 `Clone + Eq`，可直接用于测试断言；[`CodecError::code`]
///   返回稳定错误码，便于日志检索；
/// - **风险 (Trade-offs)**：解码失败后缓冲区内容不再可信，调用方应直接关闭连接而不是尝试重新同步。
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum CodecError {
    /// 帧头声明的长度小于 8 字节头部本身。
    #[error("openflow frame declares length {length}, shorter than the 8-byte header")]
    LengthTooShort {
        /// 帧头中的 `length` 字段。
        length: u16,
    },

    /// 帧长度超过允许的上限。
    #[error("openflow frame length {length} exceeds limit {limit}")]
    FrameTooLarge {
        /// 帧的实际或声明长度。
        length: usize,
        /// 当前生效的上限。
        limit: usize,
    },

    /// 定长消息体长度不足。
    #[error("openflow message type {msg_type} needs a {expected}-byte body, got {actual}")]
    BodyTooShort {
        /// 消息类型编号。
        msg_type: u8,
        /// 期望的最小消息体长度。
        expected: usize,
        /// 实际收到的消息体长度。
        actual: usize,
    },
}

impl CodecError {
    /// 返回稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            CodecError::LengthTooShort { .. } => "spark.openflow.length_too_short",
            CodecError::FrameTooLarge { .. } => "spark.openflow.frame_too_large",
            CodecError::BodyTooShort { .. } => "spark.openflow.body_too_short",
        }
    }
}
