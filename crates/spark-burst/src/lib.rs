#![deny(unsafe_code)]

//! # spark-burst
//!
//! ## 定位（Why）
//! - 控制消息突发压测：交换机完成握手、进入受控状态后，向其连续发送 `count` 条相同的控制消息，
//!   用于观察交换机（或控制器栈）在短时间内吸收重复配置请求时的表现；
//! - 只度量“重复同一消息”这一维度，不是吞吐基准，也不做流表或拓扑管理。
//!
//! ## 结构（What）
//! - 核心：[`BurstRequest`]、[`BurstController`]、[`BurstResult`] 与 [`MessageSender`] 契约，
//!   不依赖任何异步运行时，可直接以脚本化发送方做单元测试；
//! - 适配：`SwitchSender` 对 [`MessageSender`] 的实现与 [`BurstHarness`] 就绪回调，
//!   把核心挂接到 `spark-switch` 控制器上；
//! - 入口：[`cli`] 与 [`config`] 提供命令行与配置文件的解析和合并。
//!
//! ## 失败语义（Trade-offs）
//! - 一次突发中任意一次发送失败即立即中止，剩余消息不再发送；失败以 [`BurstResult`] 值的形式返回，
//!   不会穿透回调边界影响控制器的事件循环。

mod adapter;
pub mod cli;
pub mod config;
mod controller;
mod harness;
mod message;
mod request;
mod result;
mod transport;

pub use controller::BurstController;
pub use harness::BurstHarness;
pub use message::{ControlMessage, MessageKind};
pub use request::{BurstRequest, ConfigureError};
pub use result::{BurstPhase, BurstResult};
pub use transport::{BoxError, MessageSender, TransportError, TransportErrorKind};
