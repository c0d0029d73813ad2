use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{error::CodecError, message::OfpMessage};

/// OpenFlow 1.3 的协议版本号。
pub const OFP_VERSION: u8 = 0x04;

/// 固定头部长度。
pub const OFP_HEADER_LEN: usize = 8;

/// 解码预算的默认值，即 `length` 字段能表达的最大帧长。
pub const DEFAULT_MAX_FRAME_LEN: usize = u16::MAX as usize;

/// `ofp_header` 的结构化表示。
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct OfpHeader {
    /// 协议版本。
    pub version: u8,
    /// `ofp_type`。
    pub msg_type: u8,
    /// 含头部在内的帧长度。
    pub length: u16,
    /// 事务标识。
    pub xid: u32,
}

impl OfpHeader {
    /// 从缓冲前 8 字节读取头部，不足 8 字节时返回 `None`，不消费任何字节。
    pub fn peek(src: &[u8]) -> Option<Self> {
        if src.len() < OFP_HEADER_LEN {
            return None;
        }
        Some(Self {
            version: src[0],
            msg_type: src[1],
            length: u16::from_be_bytes([src[2], src[3]]),
            xid: u32::from_be_bytes([src[4], src[5], src[6], src[7]]),
        })
    }

    fn write(&self, dst: &mut BytesMut) {
        dst.put_u8(self.version);
        dst.put_u8(self.msg_type);
        dst.put_u16(self.length);
        dst.put_u32(self.xid);
    }
}

/// 一条完整的控制通道帧：头部元数据 + 结构化消息。
///
/// # 教案式说明
/// - **意图 (Why)**：`length` 与 `msg_type` 都可以由消息本身推导，因此帧只保存版本号与 xid，
///   杜绝“头部长度与消息体不一致”的构造错误；
/// - **契约 (What)**：
///   - [`encode`](Self::encode) 追加写入 `dst`，不会清空已有内容；
///   - [`decode`](Self::decode) 每次最多消费一帧，缓冲不足时原样保留字节并返回 `Ok(None)`；
/// - **风险 (Trade-offs)**：解码时整帧 `split_to` 后再 `freeze`，对大帧会产生一次引用计数切分，
///   但不会复制负载。
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OfpFrame {
    /// 协议版本，由本端构造时固定为 [`OFP_VERSION`]。
    pub version: u8,
    /// 事务标识。
    pub xid: u32,
    /// 消息内容。
    pub message: OfpMessage,
}

impl OfpFrame {
    /// 以 OpenFlow 1.3 版本号构造帧。
    pub fn new(xid: u32, message: OfpMessage) -> Self {
        Self {
            version: OFP_VERSION,
            xid,
            message,
        }
    }

    /// 编码后的总长度。
    pub fn encoded_len(&self) -> usize {
        OFP_HEADER_LEN + self.message.body_len()
    }

    /// 将帧追加写入 `dst`。
    pub fn encode(&self, dst: &mut BytesMut) -> Result<(), CodecError> {
        let total = self.encoded_len();
        let length = u16::try_from(total).map_err(|_| CodecError::FrameTooLarge {
            length: total,
            limit: DEFAULT_MAX_FRAME_LEN,
        })?;

        dst.reserve(total);
        OfpHeader {
            version: self.version,
            msg_type: self.message.msg_type(),
            length,
            xid: self.xid,
        }
        .write(dst);
        self.message.encode_body(dst);
        Ok(())
    }

    /// 编码为独立的只读缓冲。
    pub fn to_bytes(&self) -> Result<Bytes, CodecError> {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode(&mut buf)?;
        Ok(buf.freeze())
    }

    /// 从流式缓冲中解出一帧。
    pub fn decode(src: &mut BytesMut, max_frame_len: usize) -> Result<Option<Self>, CodecError> {
        let Some(header) = OfpHeader::peek(src) else {
            return Ok(None);
        };

        let length = usize::from(header.length);
        if length < OFP_HEADER_LEN {
            return Err(CodecError::LengthTooShort {
                length: header.length,
            });
        }
        if length > max_frame_len {
            return Err(CodecError::FrameTooLarge {
                length,
                limit: max_frame_len,
            });
        }
        if src.len() < length {
            src.reserve(length - src.len());
            return Ok(None);
        }

        let mut frame = src.split_to(length).freeze();
        frame.advance(OFP_HEADER_LEN);
        let message = OfpMessage::decode_body(header.msg_type, frame)?;
        Ok(Some(Self {
            version: header.version,
            xid: header.xid,
            message,
        }))
    }
}
