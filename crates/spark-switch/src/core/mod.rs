//! 交换机连接的核心构件。
//!
//! - `session`：单连接状态机；
//! - `handle`：连接写方向的共享句柄与事务号分配；
//! - `registry`：按数据通路标识索引的并发登记表；
//! - `connection`：握手与读循环驱动，仅供控制器内部使用。

pub(crate) mod connection;
mod handle;
mod registry;
mod session;

pub use handle::SwitchHandle;
pub(crate) use handle::FrameWriter;
pub use registry::SwitchRegistry;
pub use session::ConnectionState;
pub(crate) use session::SwitchSession;

/// 测试用：在回环连接上构造写入口，同时返回对端通道以保持连接存活。
#[cfg(test)]
pub(crate) async fn loopback_writer() -> (
    std::sync::Arc<FrameWriter>,
    spark_transport_tcp::TcpChannel,
) {
    use spark_transport_tcp::{CallContext, Cancellation, TcpChannel, TcpListener};

    let listener = TcpListener::bind("127.0.0.1:0".parse().expect("addr"))
        .await
        .expect("bind");
    let ctx = CallContext::default();
    let (client, accepted) = tokio::join!(
        TcpChannel::connect(&ctx, listener.local_addr()),
        listener.accept(&ctx)
    );
    let writer = FrameWriter::new(accepted.expect("accept").0, None, Cancellation::new());
    (std::sync::Arc::new(writer), client.expect("connect"))
}
