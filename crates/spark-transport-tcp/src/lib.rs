#![doc = r#"
# spark-transport-tcp

## 设计动机（Why）
- **定位**：该 crate 提供控制器在 Tokio 运行时上的最小 TCP 通道实现，
  封装监听、建连、读写与半关闭等底层细节。
- **架构角色**：作为 `spark-switch` 控制通道的字节搬运层，不理解任何 OpenFlow 语义；
  帧的切分与组装由 `spark-openflow` 完成。
- **设计理念**：强调“上下文传递”与“错误分类”，所有网络操作均感知
  [`CallContext`] 的取消与截止约束，并在失败时映射为带稳定错误码的 [`TcpError`]。

## 核心契约（What）
- **输入条件**：调用方必须在 Tokio 运行时中使用本实现，并显式传递 `CallContext`；
- **输出保障**：监听、通道读写与半关闭均返回语义化结果，出错时附带稳定错误码及
  [`ErrorCategory`]；
- **并发约束**：读半部与写半部分别加锁，一个任务阻塞在 `read` 时另一个任务仍可 `write`。

## 实现策略（How）
- **执行框架**：完全依赖 Tokio 的 `TcpListener` 与 `TcpStream`，并通过
  `tokio::select!` 将取消/超时与 IO Future 组合；
- **取消通知**：[`Cancellation`] 基于 `tokio::sync::Notify` 唤醒等待者，无需周期轮询。

## 风险与考量（Trade-offs）
- **写入粒度**：`write` 使用 `write_all`，超时或取消发生在写入中途时，对端可能收到半帧；
  上层应把此类错误视为连接已损坏。
"#]

mod channel;
mod context;
mod error;
mod listener;
mod util;

pub use channel::{ShutdownDirection, TcpChannel, TcpSocketConfig};
pub use context::{CallContext, CallContextBuilder, Cancellation};
pub use error::{ErrorCategory, TcpError};
pub use listener::TcpListener;
