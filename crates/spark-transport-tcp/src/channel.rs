use crate::{
    context::CallContext,
    error::{self, CONFIGURE, TcpError, map_io_error},
    util::run_with_context,
};
use socket2::SockRef;
use std::{
    io,
    net::{Shutdown as StdShutdown, SocketAddr},
    sync::Arc,
    time::Duration,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{
        TcpStream as TokioTcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::Mutex as AsyncMutex,
};

/// 半关闭方向。
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ShutdownDirection {
    /// 关闭读方向，挂起的读操作将返回 EOF。
    Read,
    /// 关闭写方向，向对端发送 FIN。
    Write,
    /// 同时关闭两个方向。
    Both,
}

/// TCP 套接字级配置项，实现对内核行为的显式控制。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - 控制通道上的消息通常只有十几个字节，压测时连续写出大量小帧，
///   默认开启 `TCP_NODELAY` 避免 Nagle 算法把多帧攒成一个报文段从而掩盖时序；
/// - `SO_LINGER` 决定关闭阶段未发送数据的处理策略，交由部署方按需配置。
///
/// ## 契约说明（What）
/// - `with_linger`：`Some(dur)` 时在关闭阶段最多等待 `dur` 后发送 RST；`None` 沿用内核默认；
/// - `with_nodelay`：是否禁用 Nagle 算法；
/// - **后置条件**：`apply` 返回 `Ok(())` 时所有选项均已落地。
///
/// ## 设计取舍与注意事项（Trade-offs）
/// - `SO_LINGER` 在 Linux 上精度为秒，测试与生产环境需选择合适超时。
#[derive(Clone, Debug)]
pub struct TcpSocketConfig {
    linger: Option<Duration>,
    nodelay: bool,
}

impl TcpSocketConfig {
    /// 创建默认配置：`linger = None`、`nodelay = true`。
    pub const fn new() -> Self {
        Self {
            linger: None,
            nodelay: true,
        }
    }

    /// 设置 `SO_LINGER` 超时时长。
    pub fn with_linger(mut self, linger: Option<Duration>) -> Self {
        self.linger = linger;
        self
    }

    /// 设置 `TCP_NODELAY`。
    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }

    /// 读取当前配置的超时时长。
    pub fn linger(&self) -> Option<Duration> {
        self.linger
    }

    /// 是否禁用 Nagle 算法。
    pub fn nodelay(&self) -> bool {
        self.nodelay
    }

    fn apply(&self, stream: &TokioTcpStream) -> io::Result<()> {
        stream.set_nodelay(self.nodelay)?;
        let sock = SockRef::from(stream);
        sock.set_linger(self.linger)
    }
}

impl Default for TcpSocketConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
struct TcpChannelInner {
    reader: AsyncMutex<OwnedReadHalf>,
    writer: AsyncMutex<OwnedWriteHalf>,
    peer_addr: SocketAddr,
    local_addr: SocketAddr,
    config: TcpSocketConfig,
}

/// TCP 通道的最小实现，封装读写与半关闭。
///
/// # 教案式注释
///
/// ## 意图 (Why)
/// - 为控制器提供对单个 TCP 连接的直接控制，同时贯彻 `CallContext` 的取消/超时语义；
/// - 控制器需要一边持续读取交换机的 ECHO_REQUEST，一边向同一连接写出突发消息，
///   因此读写必须互不阻塞。
///
/// ## 逻辑 (How)
/// - 构造时调用 `TcpStream::into_split` 拆成读/写两个半部，各自以 `tokio::sync::Mutex`
///   包裹：同方向的调用者互斥，异方向并行；
/// - 读写操作通过内部工具函数 `run_with_context` 注入取消与截止时间。
///
/// ## 契约 (What)
/// - `connect`：根据 `CallContext` 建立到目标地址的连接；
/// - `read`：执行一次读取，返回 `0` 表示对端已关闭写方向；
/// - `write`：写出整个缓冲区，返回写入字节数；
/// - `shutdown`：执行半关闭；
/// - `peer_addr`/`local_addr`：提供地址元数据。
///
/// ## 注意事项 (Trade-offs)
/// - 写锁在一次 `write` 内持续持有，保证多个任务并发写出的帧不会交错；
/// - 克隆出的通道共享同一底层连接。
#[derive(Clone, Debug)]
pub struct TcpChannel {
    inner: Arc<TcpChannelInner>,
}

impl TcpChannel {
    pub(crate) fn from_stream(
        stream: TokioTcpStream,
        local_addr: SocketAddr,
        peer_addr: SocketAddr,
        config: TcpSocketConfig,
    ) -> Result<Self, TcpError> {
        config
            .apply(&stream)
            .map_err(|err| map_io_error(CONFIGURE, err))?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            inner: Arc::new(TcpChannelInner {
                reader: AsyncMutex::new(reader),
                writer: AsyncMutex::new(writer),
                peer_addr,
                local_addr,
                config,
            }),
        })
    }

    /// 根据上下文建立到目标地址的连接。
    pub async fn connect(ctx: &CallContext, addr: SocketAddr) -> Result<Self, TcpError> {
        Self::connect_with_config(ctx, addr, TcpSocketConfig::default()).await
    }

    /// 使用指定套接字配置建立连接。
    pub async fn connect_with_config(
        ctx: &CallContext,
        addr: SocketAddr,
        config: TcpSocketConfig,
    ) -> Result<Self, TcpError> {
        let stream = run_with_context(ctx, error::CONNECT, TokioTcpStream::connect(addr)).await?;
        let local = stream
            .local_addr()
            .map_err(|err| map_io_error(error::CONNECT, err))?;
        let peer = stream
            .peer_addr()
            .map_err(|err| map_io_error(error::CONNECT, err))?;
        Self::from_stream(stream, local, peer, config)
    }

    /// 读取数据到缓冲区。
    pub async fn read(&self, ctx: &CallContext, buf: &mut [u8]) -> Result<usize, TcpError> {
        run_with_context(ctx, error::READ, async {
            let mut guard = self.inner.reader.lock().await;
            guard.read(buf).await
        })
        .await
    }

    /// 将整个缓冲区写入套接字。
    pub async fn write(&self, ctx: &CallContext, buf: &[u8]) -> Result<usize, TcpError> {
        if buf.is_empty() {
            return Ok(0);
        }
        let len = buf.len();
        run_with_context(ctx, error::WRITE, async {
            let mut guard = self.inner.writer.lock().await;
            guard.write_all(buf).await.map(|_| len)
        })
        .await
    }

    /// 根据方向执行半关闭。
    ///
    /// 读方向通过 `shutdown(2)` 直接作用于套接字，不需要获取读锁，
    /// 因此可以用来唤醒正阻塞在 `read` 上的任务。
    pub async fn shutdown(
        &self,
        ctx: &CallContext,
        direction: ShutdownDirection,
    ) -> Result<(), TcpError> {
        run_with_context(ctx, error::SHUTDOWN, async {
            let mut writer = self.inner.writer.lock().await;
            match direction {
                ShutdownDirection::Write => writer.shutdown().await,
                ShutdownDirection::Read => sync_shutdown(&writer, StdShutdown::Read),
                ShutdownDirection::Both => {
                    writer.shutdown().await?;
                    sync_shutdown(&writer, StdShutdown::Read)
                }
            }
        })
        .await
    }

    /// 返回构造时使用的套接字配置。
    pub fn config(&self) -> &TcpSocketConfig {
        &self.inner.config
    }

    /// 获取对端地址。
    pub fn peer_addr(&self) -> SocketAddr {
        self.inner.peer_addr
    }

    /// 获取本地地址。
    pub fn local_addr(&self) -> SocketAddr {
        self.inner.local_addr
    }
}

fn sync_shutdown(half: &OwnedWriteHalf, direction: StdShutdown) -> io::Result<()> {
    let sock = SockRef::from(half.as_ref());
    match sock.shutdown(direction) {
        Err(err) if err.kind() == io::ErrorKind::NotConnected => Ok(()),
        other => other,
    }
}
