#![deny(unsafe_code)]

//! # spark-switch
//!
//! ## 定位与职责（Why）
//! - 作为 OpenFlow 1.3 控制器的最小框架层：接受交换机主动发起的 TCP 连接，完成
//!   HELLO / FEATURES 握手，并在交换机进入受控状态后派发“就绪”事件；
//! - 上层业务（例如突发压测）只需实现 [`SwitchReadyHandler`] 并通过 [`SwitchSender`]
//!   按 [`DatapathId`] 或绑定单条连接的 [`SwitchRef`] 发送消息，不接触套接字、帧切分或事务号分配。
//!
//! ## 架构嵌入（Where）
//! - `core` 模块负责连接状态机、交换机登记表与单连接的握手/读循环；
//! - `controller` 模块承载监听循环与停机控制；
//! - `error` 模块集中定义错误类型，统一以 `thiserror` 风格向外暴露诊断信息。
//!
//! ## 并发模型（Trade-offs）
//! - 每条连接独占一个 Tokio 任务负责读取，写方向由 [`SwitchHandle`] 在任意任务中调用；
//! - 就绪回调在独立任务中执行，因此回调长时间占用时读循环仍能应答 ECHO_REQUEST。

mod config;
mod controller;
/// 连接状态机、登记表与单连接驱动。
///
/// - **意图说明 (Why)**：集中处理交换机连接的装配、状态同步与拆除；
/// - **契约定位 (What)**：对外只暴露 [`ConnectionState`]、[`SwitchHandle`] 与 [`SwitchRegistry`]，
///   连接驱动细节保持私有。
pub mod core;
mod datapath;
mod error;
mod handler;
mod sender;

pub use config::ControllerConfig;
pub use controller::{BoundController, Controller, ShutdownToken};
pub use crate::core::{ConnectionState, SwitchHandle, SwitchRegistry};
pub use datapath::{DatapathId, SwitchRef};
pub use error::SwitchError;
pub use handler::SwitchReadyHandler;
pub use sender::SwitchSender;
