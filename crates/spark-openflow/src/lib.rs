#![deny(unsafe_code)]
#![warn(missing_docs)]

//! # spark-openflow
//!
//! ## 教案目的（Why）
//! - **定位**：OpenFlow 1.3 控制通道的最小编解码层，负责控制器与交换机之间的帧封包/拆包。
//! - **架构角色**：位于 `spark-transport-tcp` 之上、`spark-switch` 之下；传输层只搬运字节，
//!   控制器框架只理解 [`OfpMessage`]，两者之间的翻译全部收敛在本 crate。
//! - **设计策略**：仅覆盖握手、保活与配置类消息（HELLO/ECHO/FEATURES/CONFIG/BARRIER/ERROR），
//!   其余类型以 [`OfpMessage::Unsupported`] 原样保留负载，不做流表语义解析。
//!
//! ## 交互契约（What）
//! - [`OfpFrame::encode`] 根据消息体自动计算头部 `length` 字段；
//! - [`OfpFrame::decode`] 是流式解码器：缓冲不足一帧时返回 `Ok(None)` 且不消费任何字节；
//! - 所有多字节字段均为网络字节序（大端），与 OpenFlow 1.3.x 规范 §7.1 一致。
//!
//! ## 风险提示（Trade-offs）
//! - 解码阶段对 `length` 施加 `max_frame_len` 预算，防止对端声明超长帧占满缓冲；
//! - 对端版本号不在此处校验，交由握手逻辑决定是否拒绝连接。

mod error;
mod frame;
pub mod message;

pub use error::CodecError;
pub use frame::{DEFAULT_MAX_FRAME_LEN, OFP_HEADER_LEN, OFP_VERSION, OfpFrame, OfpHeader};
pub use message::{ErrorMsg, FeaturesReply, OfpMessage, SwitchConfig};
