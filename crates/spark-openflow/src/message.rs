//! OpenFlow 1.3 消息体定义与编解码。
//!
//! 头部处理见 [`crate::OfpFrame`]；本模块只关心 8 字节头部之后的消息体。

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::CodecError;

/// `ofp_type` 取值（OpenFlow 1.3 §A.1）。
pub mod msg_type {
    /// `OFPT_HELLO`
    pub const HELLO: u8 = 0;
    /// `OFPT_ERROR`
    pub const ERROR: u8 = 1;
    /// `OFPT_ECHO_REQUEST`
    pub const ECHO_REQUEST: u8 = 2;
    /// `OFPT_ECHO_REPLY`
    pub const ECHO_REPLY: u8 = 3;
    /// `OFPT_FEATURES_REQUEST`
    pub const FEATURES_REQUEST: u8 = 5;
    /// `OFPT_FEATURES_REPLY`
    pub const FEATURES_REPLY: u8 = 6;
    /// `OFPT_GET_CONFIG_REQUEST`
    pub const GET_CONFIG_REQUEST: u8 = 7;
    /// `OFPT_GET_CONFIG_REPLY`
    pub const GET_CONFIG_REPLY: u8 = 8;
    /// `OFPT_SET_CONFIG`
    pub const SET_CONFIG: u8 = 9;
    /// `OFPT_BARRIER_REQUEST`
    pub const BARRIER_REQUEST: u8 = 20;
    /// `OFPT_BARRIER_REPLY`
    pub const BARRIER_REPLY: u8 = 21;
}

/// `ofp_error_type` 中握手相关的取值。
pub mod error_type {
    /// `OFPET_HELLO_FAILED`
    pub const HELLO_FAILED: u16 = 0;
    /// `OFPET_BAD_REQUEST`
    pub const BAD_REQUEST: u16 = 1;

    /// `ofp_hello_failed_code` 取值。
    pub mod hello_failed {
        /// `OFPHFC_INCOMPATIBLE`：没有共同支持的协议版本。
        pub const INCOMPATIBLE: u16 = 0;
    }
}

/// `OFPC_FRAG_NORMAL`：不对 IP 分片做特殊处理。
pub const OFPC_FRAG_NORMAL: u16 = 0;

/// 控制器未显式配置时 `miss_send_len` 的取值。
pub const DEFAULT_MISS_SEND_LEN: u16 = 128;

/// `ofp_switch_config` 消息体，SET_CONFIG 与 GET_CONFIG_REPLY 共用。
///
/// # 教案式说明
/// - **意图 (Why)**：压测场景反复下发同一份配置，因此默认值固定为
///   `flags = OFPC_FRAG_NORMAL`、`miss_send_len = 128`，保证每次构造的消息字节完全一致；
/// - **契约 (What)**：消息体固定 4 字节，`flags` 在前，`miss_send_len` 在后。
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SwitchConfig {
    /// `OFPC_*` 标志位。
    pub flags: u16,
    /// 未命中流表时送往控制器的最大字节数。
    pub miss_send_len: u16,
}

impl SwitchConfig {
    /// 消息体长度。
    pub const BODY_LEN: usize = 4;

    fn encode(&self, dst: &mut BytesMut) {
        dst.put_u16(self.flags);
        dst.put_u16(self.miss_send_len);
    }

    fn decode(msg_type: u8, mut body: Bytes) -> Result<Self, CodecError> {
        ensure_len(msg_type, &body, Self::BODY_LEN)?;
        Ok(Self {
            flags: body.get_u16(),
            miss_send_len: body.get_u16(),
        })
    }
}

impl Default for SwitchConfig {
    fn default() -> Self {
        Self {
            flags: OFPC_FRAG_NORMAL,
            miss_send_len: DEFAULT_MISS_SEND_LEN,
        }
    }
}

/// `ofp_switch_features` 消息体。
///
/// 编码时 2 字节填充与 4 字节保留字段写零，解码时忽略。
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FeaturesReply {
    /// 交换机的 datapath 标识。
    pub datapath_id: u64,
    /// 可缓存的最大报文数。
    pub n_buffers: u32,
    /// 流表数量。
    pub n_tables: u8,
    /// 辅助连接编号，主连接为 0。
    pub auxiliary_id: u8,
    /// `OFPC_*` 能力位图。
    pub capabilities: u32,
}

impl FeaturesReply {
    /// 消息体长度。
    pub const BODY_LEN: usize = 24;

    fn encode(&self, dst: &mut BytesMut) {
        dst.put_u64(self.datapath_id);
        dst.put_u32(self.n_buffers);
        dst.put_u8(self.n_tables);
        dst.put_u8(self.auxiliary_id);
        dst.put_bytes(0, 2);
        dst.put_u32(self.capabilities);
        dst.put_u32(0);
    }

    fn decode(mut body: Bytes) -> Result<Self, CodecError> {
        ensure_len(msg_type::FEATURES_REPLY, &body, Self::BODY_LEN)?;
        let datapath_id = body.get_u64();
        let n_buffers = body.get_u32();
        let n_tables = body.get_u8();
        let auxiliary_id = body.get_u8();
        body.advance(2);
        let capabilities = body.get_u32();
        Ok(Self {
            datapath_id,
            n_buffers,
            n_tables,
            auxiliary_id,
            capabilities,
        })
    }
}

/// `ofp_error_msg` 消息体。
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ErrorMsg {
    /// `OFPET_*` 错误类型。
    pub err_type: u16,
    /// 与类型相关的错误码。
    pub code: u16,
    /// 触发错误的原始请求片段。
    pub data: Bytes,
}

impl ErrorMsg {
    /// 固定部分长度。
    pub const MIN_BODY_LEN: usize = 4;

    /// 构造握手版本不兼容错误，`data` 携带可读说明。
    pub fn hello_incompatible(detail: &str) -> Self {
        Self {
            err_type: error_type::HELLO_FAILED,
            code: error_type::hello_failed::INCOMPATIBLE,
            data: Bytes::copy_from_slice(detail.as_bytes()),
        }
    }

    fn encode(&self, dst: &mut BytesMut) {
        dst.put_u16(self.err_type);
        dst.put_u16(self.code);
        dst.put_slice(&self.data);
    }

    fn decode(mut body: Bytes) -> Result<Self, CodecError> {
        ensure_len(msg_type::ERROR, &body, Self::MIN_BODY_LEN)?;
        let err_type = body.get_u16();
        let code = body.get_u16();
        Ok(Self {
            err_type,
            code,
            data: body,
        })
    }
}

/// 控制通道消息。
///
/// # 教案式说明
/// - **意图 (Why)**：以强类型枚举表达控制器关心的消息集合，其余类型不报错而是归入
///   [`OfpMessage::Unsupported`]，避免一台交换机发送未知消息就导致连接被拆除；
/// - **契约 (What)**：变体与 `ofp_type` 一一对应；`Hello`/`EchoRequest`/`EchoReply` 的负载原样保留，
///   以便 ECHO_REPLY 回显请求中的数据；
/// - **风险 (Trade-offs)**：`Hello` 中的版本位图元素不做解析，版本协商仅依据帧头版本号。
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum OfpMessage {
    /// `OFPT_HELLO`，负载为可选的 hello 元素。
    Hello(Bytes),
    /// `OFPT_ERROR`
    Error(ErrorMsg),
    /// `OFPT_ECHO_REQUEST`，负载为任意数据。
    EchoRequest(Bytes),
    /// `OFPT_ECHO_REPLY`，负载需回显请求数据。
    EchoReply(Bytes),
    /// `OFPT_FEATURES_REQUEST`
    FeaturesRequest,
    /// `OFPT_FEATURES_REPLY`
    FeaturesReply(FeaturesReply),
    /// `OFPT_GET_CONFIG_REQUEST`
    GetConfigRequest,
    /// `OFPT_GET_CONFIG_REPLY`
    GetConfigReply(SwitchConfig),
    /// `OFPT_SET_CONFIG`
    SetConfig(SwitchConfig),
    /// `OFPT_BARRIER_REQUEST`
    BarrierRequest,
    /// `OFPT_BARRIER_REPLY`
    BarrierReply,
    /// 本 crate 不解析的消息类型。
    Unsupported {
        /// 原始 `ofp_type`。
        msg_type: u8,
        /// 原始消息体。
        body: Bytes,
    },
}

impl OfpMessage {
    /// 对应的 `ofp_type` 编号。
    pub fn msg_type(&self) -> u8 {
        match self {
            OfpMessage::Hello(_) => msg_type::HELLO,
            OfpMessage::Error(_) => msg_type::ERROR,
            OfpMessage::EchoRequest(_) => msg_type::ECHO_REQUEST,
            OfpMessage::EchoReply(_) => msg_type::ECHO_REPLY,
            OfpMessage::FeaturesRequest => msg_type::FEATURES_REQUEST,
            OfpMessage::FeaturesReply(_) => msg_type::FEATURES_REPLY,
            OfpMessage::GetConfigRequest => msg_type::GET_CONFIG_REQUEST,
            OfpMessage::GetConfigReply(_) => msg_type::GET_CONFIG_REPLY,
            OfpMessage::SetConfig(_) => msg_type::SET_CONFIG,
            OfpMessage::BarrierRequest => msg_type::BARRIER_REQUEST,
            OfpMessage::BarrierReply => msg_type::BARRIER_REPLY,
            OfpMessage::Unsupported { msg_type, .. } => *msg_type,
        }
    }

    /// 用于日志的消息名称。
    pub fn name(&self) -> &'static str {
        match self {
            OfpMessage::Hello(_) => "hello",
            OfpMessage::Error(_) => "error",
            OfpMessage::EchoRequest(_) => "echo_request",
            OfpMessage::EchoReply(_) => "echo_reply",
            OfpMessage::FeaturesRequest => "features_request",
            OfpMessage::FeaturesReply(_) => "features_reply",
            OfpMessage::GetConfigRequest => "get_config_request",
            OfpMessage::GetConfigReply(_) => "get_config_reply",
            OfpMessage::SetConfig(_) => "set_config",
            OfpMessage::BarrierRequest => "barrier_request",
            OfpMessage::BarrierReply => "barrier_reply",
            OfpMessage::Unsupported { .. } => "unsupported",
        }
    }

    pub(crate) fn body_len(&self) -> usize {
        match self {
            OfpMessage::Hello(data)
            | OfpMessage::EchoRequest(data)
            | OfpMessage::EchoReply(data) => data.len(),
            OfpMessage::Error(err) => ErrorMsg::MIN_BODY_LEN + err.data.len(),
            OfpMessage::FeaturesReply(_) => FeaturesReply::BODY_LEN,
            OfpMessage::GetConfigReply(_) | OfpMessage::SetConfig(_) => SwitchConfig::BODY_LEN,
            OfpMessage::FeaturesRequest
            | OfpMessage::GetConfigRequest
            | OfpMessage::BarrierRequest
            | OfpMessage::BarrierReply => 0,
            OfpMessage::Unsupported { body, .. } => body.len(),
        }
    }

    pub(crate) fn encode_body(&self, dst: &mut BytesMut) {
        match self {
            OfpMessage::Hello(data)
            | OfpMessage::EchoRequest(data)
            | OfpMessage::EchoReply(data) => dst.put_slice(data),
            OfpMessage::Error(err) => err.encode(dst),
            OfpMessage::FeaturesReply(features) => features.encode(dst),
            OfpMessage::GetConfigReply(config) | OfpMessage::SetConfig(config) => {
                config.encode(dst)
            }
            OfpMessage::FeaturesRequest
            | OfpMessage::GetConfigRequest
            | OfpMessage::BarrierRequest
            | OfpMessage::BarrierReply => {}
            OfpMessage::Unsupported { body, .. } => dst.put_slice(body),
        }
    }

    pub(crate) fn decode_body(msg_type: u8, body: Bytes) -> Result<Self, CodecError> {
        let message = match msg_type {
            msg_type::HELLO => OfpMessage::Hello(body),
            msg_type::ERROR => OfpMessage::Error(ErrorMsg::decode(body)?),
            msg_type::ECHO_REQUEST => OfpMessage::EchoRequest(body),
            msg_type::ECHO_REPLY => OfpMessage::EchoReply(body),
            msg_type::FEATURES_REQUEST => OfpMessage::FeaturesRequest,
            msg_type::FEATURES_REPLY => OfpMessage::FeaturesReply(FeaturesReply::decode(body)?),
            msg_type::GET_CONFIG_REQUEST => OfpMessage::GetConfigRequest,
            msg_type::GET_CONFIG_REPLY => {
                OfpMessage::GetConfigReply(SwitchConfig::decode(msg_type, body)?)
            }
            msg_type::SET_CONFIG => OfpMessage::SetConfig(SwitchConfig::decode(msg_type, body)?),
            msg_type::BARRIER_REQUEST => OfpMessage::BarrierRequest,
            msg_type::BARRIER_REPLY => OfpMessage::BarrierReply,
            other => OfpMessage::Unsupported {
                msg_type: other,
                body,
            },
        };
        Ok(message)
    }
}

fn ensure_len(msg_type: u8, body: &Bytes, expected: usize) -> Result<(), CodecError> {
    if body.len() < expected {
        return Err(CodecError::BodyTooShort {
            msg_type,
            expected,
            actual: body.len(),
        });
    }
    Ok(())
}
