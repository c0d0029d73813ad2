use crate::{
    TcpChannel, TcpSocketConfig,
    context::CallContext,
    error::{self, TcpError, map_io_error},
    util::{deadline_expired, run_with_context},
};
use std::net::SocketAddr;
use tokio::net::TcpListener as TokioTcpListener;
use tracing::debug;

/// 对 Tokio `TcpListener` 的语义封装。
///
/// # 教案式注释
///
/// ## 意图 (Why)
/// - 控制器以被动方式等待交换机主动建连（OpenFlow 约定交换机连向控制器），
///   因此需要“监听 → 接受连接”的最小能力；
/// - `accept` 会继承 [`CallContext`] 的取消与截止语义，停机时监听循环能够立即退出。
///
/// ## 逻辑 (How)
/// - `bind`：调用 Tokio 绑定并缓存实际地址（端口为 0 时由内核分配）；
/// - `accept`：通过内部工具函数 `run_with_context` 注入取消/超时，
///   成功后将底层 `TcpStream` 包装为 [`TcpChannel`]。
///
/// ## 契约 (What)
/// - **前置条件**：调用方必须在 Tokio 运行时中使用该监听器；
/// - **后置条件**：`accept` 成功返回的 [`TcpChannel`] 已应用套接字配置并准备好读写；
/// - **错误语义**：绑定/接受失败时返回 [`TcpError`]，携带稳定错误码。
///
/// ## 注意事项 (Trade-offs)
/// - 未支持 `SO_REUSEPORT` 等高级套接字选项。
#[derive(Debug)]
pub struct TcpListener {
    inner: TokioTcpListener,
    local_addr: SocketAddr,
    default_config: TcpSocketConfig,
}

impl TcpListener {
    /// 绑定到指定地址并返回监听器。
    pub async fn bind(addr: SocketAddr) -> Result<Self, TcpError> {
        Self::bind_with_config(addr, TcpSocketConfig::default()).await
    }

    /// 绑定到指定地址并设置新连接的默认套接字配置。
    ///
    /// # 教案级注释
    ///
    /// ## 契约（What）
    /// - `addr`：监听地址；
    /// - `default_config`：后续 `accept` 默认应用的 [`TcpSocketConfig`]；
    /// - **后置条件**：`default_socket_config` 返回的配置即为传入值。
    pub async fn bind_with_config(
        addr: SocketAddr,
        default_config: TcpSocketConfig,
    ) -> Result<Self, TcpError> {
        let listener = TokioTcpListener::bind(addr)
            .await
            .map_err(|err| map_io_error(error::BIND, err))?;
        let local_addr = listener
            .local_addr()
            .map_err(|err| map_io_error(error::BIND, err))?;
        debug!(%local_addr, "tcp listener bound");
        Ok(Self {
            inner: listener,
            local_addr,
            default_config,
        })
    }

    /// 返回监听器实际绑定的地址。
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// 读取监听器为后续 `accept` 预设的默认套接字配置。
    pub fn default_socket_config(&self) -> &TcpSocketConfig {
        &self.default_config
    }

    /// 接受一个入站连接，并根据上下文处理取消/超时。
    pub async fn accept(&self, ctx: &CallContext) -> Result<(TcpChannel, SocketAddr), TcpError> {
        self.accept_with_config(ctx, self.default_config.clone())
            .await
    }

    /// 接受一个入站连接，可指定套接字配置。
    ///
    /// # 教案级注释
    ///
    /// ## 契约（What）
    /// - `ctx`：控制取消/超时的 [`CallContext`]；
    /// - `config`：应用到新建通道的 [`TcpSocketConfig`]；
    /// - 返回 `(TcpChannel, SocketAddr)`：通道及对端地址；
    /// - **后置条件**：失败时监听器保持可用，调用方可继续下一次 `accept`。
    ///
    /// ## 注意事项（Trade-offs）
    /// - 逐个接受连接，连接的后续处理应由调用方派发到独立任务。
    pub async fn accept_with_config(
        &self,
        ctx: &CallContext,
        config: TcpSocketConfig,
    ) -> Result<(TcpChannel, SocketAddr), TcpError> {
        if deadline_expired(ctx.deadline()) {
            return Err(error::timeout_error(error::ACCEPT));
        }
        if ctx.cancellation().is_cancelled() {
            return Err(error::cancelled_error(error::ACCEPT));
        }

        let (stream, peer_addr) =
            run_with_context(ctx, error::ACCEPT, self.inner.accept()).await?;
        let local_addr = stream
            .local_addr()
            .map_err(|err| map_io_error(error::ACCEPT, err))?;
        debug!(%peer_addr, %local_addr, "tcp connection accepted");
        let channel = TcpChannel::from_stream(stream, local_addr, peer_addr, config)?;
        Ok((channel, peer_addr))
    }
}
