use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use spark_openflow::{OfpFrame, OfpMessage};
use spark_transport_tcp::{CallContext, Cancellation, ShutdownDirection, TcpChannel};
use tracing::{debug, trace};

use crate::{
    datapath::{DatapathId, SwitchRef},
    error::SwitchError,
};

/// 单条连接的写方向：帧编码、事务号分配与发送时限。
///
/// # 教案式说明
/// - **意图 (Why)**：连接驱动任务（回显 ECHO_REPLY）与业务任务（突发发送）共用同一写方向，
///   需要一个可共享的写入口；
/// - **契约 (What)**：
///   - `next_xid` 从 1 开始单调递增，溢出后回绕；
///   - 每次写出整帧，底层写锁保证多任务并发写出的帧不会交错；
/// - **风险 (Trade-offs)**：写出中途超时可能留下半帧，调用方应把超时视为连接已损坏。
#[derive(Debug)]
pub(crate) struct FrameWriter {
    channel: TcpChannel,
    next_xid: AtomicU32,
    send_timeout: Option<Duration>,
    cancellation: Cancellation,
}

impl FrameWriter {
    pub(crate) fn new(
        channel: TcpChannel,
        send_timeout: Option<Duration>,
        cancellation: Cancellation,
    ) -> Self {
        Self {
            channel,
            next_xid: AtomicU32::new(1),
            send_timeout,
            cancellation,
        }
    }

    pub(crate) fn next_xid(&self) -> u32 {
        self.next_xid.fetch_add(1, Ordering::Relaxed)
    }

    /// 以发送时限与控制器取消标志构造上下文。
    pub(crate) fn send_context(&self) -> CallContext {
        let builder = CallContext::builder().with_cancellation(self.cancellation.clone());
        match self.send_timeout {
            Some(timeout) => builder.with_timeout(timeout).build(),
            None => builder.build(),
        }
    }

    /// 在给定上下文中写出一帧。
    pub(crate) async fn write_frame(
        &self,
        ctx: &CallContext,
        frame: &OfpFrame,
    ) -> Result<(), SwitchError> {
        let bytes = frame.to_bytes()?;
        self.channel.write(ctx, &bytes).await?;
        trace!(
            message = frame.message.name(),
            xid = frame.xid,
            len = bytes.len(),
            "frame written"
        );
        Ok(())
    }

    /// 分配新事务号并发送消息，返回使用的事务号。
    pub(crate) async fn send(&self, message: OfpMessage) -> Result<u32, SwitchError> {
        let xid = self.next_xid();
        let ctx = self.send_context();
        self.write_frame(&ctx, &OfpFrame::new(xid, message)).await?;
        Ok(xid)
    }

    /// 关闭连接的两个方向，唤醒阻塞在读取上的驱动任务。
    pub(crate) async fn close(&self) {
        let ctx = CallContext::builder()
            .with_timeout(Duration::from_secs(1))
            .build();
        if let Err(err) = self.channel.shutdown(&ctx, ShutdownDirection::Both).await {
            debug!(peer = %self.channel.peer_addr(), error = %err, "shutdown after close ignored");
        }
    }

    pub(crate) fn peer_addr(&self) -> SocketAddr {
        self.channel.peer_addr()
    }
}

/// 指向一台受控交换机的可克隆句柄。
///
/// # 教案式说明
/// - **意图 (Why)**：登记表中存放的条目，业务侧通过它向交换机发送消息；
/// - **契约 (What)**：
///   - [`send`](Self::send) 为每条消息分配新的事务号，并遵循配置的发送时限；
///   - `connection_id` 区分同一 [`DatapathId`] 的新旧连接；
///   - 克隆出的句柄共享同一连接。
#[derive(Clone, Debug)]
pub struct SwitchHandle {
    dpid: DatapathId,
    connection_id: u64,
    writer: Arc<FrameWriter>,
}

impl SwitchHandle {
    pub(crate) fn new(dpid: DatapathId, connection_id: u64, writer: Arc<FrameWriter>) -> Self {
        Self {
            dpid,
            connection_id,
            writer,
        }
    }

    /// 交换机的数据通路标识。
    pub fn dpid(&self) -> DatapathId {
        self.dpid
    }

    /// 连接序号。
    pub fn connection_id(&self) -> u64 {
        self.connection_id
    }

    /// 连接级标识。
    pub fn switch(&self) -> SwitchRef {
        SwitchRef::new(self.dpid, self.connection_id)
    }

    /// 交换机地址。
    pub fn peer_addr(&self) -> SocketAddr {
        self.writer.peer_addr()
    }

    /// 发送一条消息，返回分配的事务号。
    pub async fn send(&self, message: OfpMessage) -> Result<u32, SwitchError> {
        self.writer.send(message).await
    }

    /// 主动关闭连接；连接驱动任务随后完成拆除。
    pub async fn close(&self) {
        self.writer.close().await;
    }
}
