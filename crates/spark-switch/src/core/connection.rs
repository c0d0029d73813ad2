//! 单条控制通道的驱动：握手、登记、就绪派发、读循环与拆除。
//!
//! # 教案式说明
//! - **意图 (Why)**：把一条连接从接入到拆除的全部步骤收敛在一个任务里，
//!   状态只在此处变更，登记表只在此处增删；
//! - **逻辑 (How)**：
//!   1. 发送 HELLO，等待对端 HELLO；版本低于 0x04 时回送 HELLO_FAILED/INCOMPATIBLE 并断开；
//!   2. 发送 FEATURES_REQUEST，等待 FEATURES_REPLY 取得数据通路标识；
//!   3. 登记并进入 `Ready`，在独立任务中调用 `switch_ready`，并保留其句柄；
//!   4. 读循环应答 ECHO_REQUEST，记录 OFPT_ERROR，其余消息仅作调试日志；
//!   5. 读到 EOF、出错或控制器停机时关闭套接字并注销，等待 `switch_ready` 任务结束
//!      （此后经该连接的发送全部失败），最后通知 `switch_disconnected`；
//! - **风险 (Trade-offs)**：握手期间的整体时限由单个截止时间约束，读写共享同一预算。

use std::{net::SocketAddr, sync::Arc, time::Duration};

use bytes::{Bytes, BytesMut};
use spark_openflow::{ErrorMsg, FeaturesReply, OFP_VERSION, OfpFrame, OfpMessage};
use spark_transport_tcp::{CallContext, Cancellation, TcpChannel};
use tracing::{debug, info, trace, warn};

use crate::{
    config::ControllerConfig,
    core::{ConnectionState, FrameWriter, SwitchHandle, SwitchRegistry, SwitchSession},
    datapath::DatapathId,
    error::SwitchError,
    handler::SwitchReadyHandler,
};

const READ_CHUNK: usize = 4096;

pub(crate) struct Connection {
    session: SwitchSession,
    channel: TcpChannel,
    writer: Arc<FrameWriter>,
    inbound: BytesMut,
    max_frame_len: usize,
    handshake_timeout: Duration,
    cancellation: Cancellation,
}

impl Connection {
    pub(crate) fn new(
        channel: TcpChannel,
        peer: SocketAddr,
        connection_id: u64,
        config: &ControllerConfig,
        cancellation: Cancellation,
    ) -> Self {
        let writer = FrameWriter::new(channel.clone(), config.send_timeout(), cancellation.clone());
        Self {
            session: SwitchSession::new(connection_id, peer),
            channel,
            writer: Arc::new(writer),
            inbound: BytesMut::with_capacity(READ_CHUNK),
            max_frame_len: config.max_frame_len,
            handshake_timeout: config.handshake_timeout(),
            cancellation,
        }
    }

    /// 驱动连接直至拆除。
    pub(crate) async fn run(
        mut self,
        registry: Arc<SwitchRegistry>,
        handler: Arc<dyn SwitchReadyHandler>,
    ) {
        let peer = self.session.peer();
        let features = match self.handshake().await {
            Ok(features) => features,
            Err(err) => {
                if err.is_disconnect() {
                    debug!(%peer, error = %err, "connection dropped during handshake");
                } else {
                    warn!(%peer, error = %err, "openflow handshake failed");
                }
                self.close().await;
                return;
            }
        };

        let dpid = DatapathId::new(features.datapath_id);
        let connection_id = self.session.connection_id();
        if let Err(err) = self.session.mark_ready(dpid) {
            warn!(%dpid, %peer, error = %err, "connection could not enter ready state");
            self.close().await;
            return;
        }

        let handle = SwitchHandle::new(dpid, connection_id, self.writer.clone());
        let switch = handle.switch();
        if let Some(previous) = registry.register(handle) {
            warn!(
                %dpid,
                %peer,
                previous_peer = %previous.peer_addr(),
                "datapath reconnected, closing previous connection"
            );
            previous.close().await;
        }
        info!(
            %dpid,
            %peer,
            connection_id,
            n_tables = features.n_tables,
            n_buffers = features.n_buffers,
            "switch ready"
        );

        let ready = {
            let handler = handler.clone();
            tokio::spawn(async move { handler.switch_ready(switch).await })
        };

        let reason = self.serve_until_closed(dpid).await;
        match &reason {
            SwitchError::PeerClosed => info!(%dpid, %peer, "switch disconnected"),
            err if err.is_disconnect() => debug!(%dpid, %peer, error = %err, "connection closed"),
            err => warn!(%dpid, %peer, error = %err, "connection failed"),
        }

        self.close().await;
        let removed = registry.deregister(dpid, connection_id);
        if let Err(err) = ready.await {
            warn!(%switch, error = %err, "switch_ready handler did not complete");
        }
        if removed {
            handler.switch_disconnected(switch).await;
        }
    }

    async fn close(&mut self) {
        self.writer.close().await;
        if let Err(err) = self.session.transition(ConnectionState::Closed) {
            debug!(peer = %self.session.peer(), error = %err, "close transition rejected");
        }
        trace!(
            peer = %self.session.peer(),
            dpid = ?self.session.dpid(),
            state = ?self.session.state(),
            "connection torn down"
        );
    }

    /// HELLO + FEATURES 握手，成功返回 FEATURES_REPLY。
    async fn handshake(&mut self) -> Result<FeaturesReply, SwitchError> {
        let ctx = CallContext::builder()
            .with_cancellation(self.cancellation.clone())
            .with_timeout(self.handshake_timeout)
            .build();
        self.exchange(&ctx).await.map_err(|err| match err {
            SwitchError::Transport(inner) if inner.is_timeout() => SwitchError::HandshakeTimeout {
                peer: self.session.peer().to_string(),
                timeout: self.handshake_timeout,
            },
            other => other,
        })
    }

    async fn exchange(&mut self, ctx: &CallContext) -> Result<FeaturesReply, SwitchError> {
        let hello = OfpFrame::new(self.writer.next_xid(), OfpMessage::Hello(Bytes::new()));
        self.writer.write_frame(ctx, &hello).await?;

        loop {
            let frame = self.next_frame(ctx).await?;
            match frame.message {
                OfpMessage::Hello(_) if frame.version < OFP_VERSION => {
                    let reject = OfpFrame::new(
                        frame.xid,
                        OfpMessage::Error(ErrorMsg::hello_incompatible("openflow 1.3 required")),
                    );
                    if let Err(err) = self.writer.write_frame(ctx, &reject).await {
                        debug!(peer = %self.session.peer(), error = %err, "hello rejection not delivered");
                    }
                    return Err(SwitchError::IncompatibleVersion {
                        peer: self.session.peer().to_string(),
                        version: frame.version,
                    });
                }
                OfpMessage::Hello(_) => break,
                message => self.handshake_side_message(ctx, frame.xid, message, "hello").await?,
            }
        }

        let request = OfpFrame::new(self.writer.next_xid(), OfpMessage::FeaturesRequest);
        self.writer.write_frame(ctx, &request).await?;

        loop {
            let frame = self.next_frame(ctx).await?;
            match frame.message {
                OfpMessage::FeaturesReply(features) => return Ok(features),
                message => {
                    self.handshake_side_message(ctx, frame.xid, message, "features_reply")
                        .await?
                }
            }
        }
    }

    /// 处理握手阶段收到的非预期消息：ECHO 照常应答，ERROR 终止握手，其余丢弃。
    async fn handshake_side_message(
        &self,
        ctx: &CallContext,
        xid: u32,
        message: OfpMessage,
        expected: &'static str,
    ) -> Result<(), SwitchError> {
        match message {
            OfpMessage::EchoRequest(payload) => {
                let reply = OfpFrame::new(xid, OfpMessage::EchoReply(payload));
                self.writer.write_frame(ctx, &reply).await
            }
            OfpMessage::Error(err) => {
                warn!(
                    peer = %self.session.peer(),
                    err_type = err.err_type,
                    code = err.code,
                    "switch reported error during handshake"
                );
                Err(SwitchError::UnexpectedMessage {
                    peer: self.session.peer().to_string(),
                    expected,
                    actual: "error",
                })
            }
            other => {
                debug!(
                    peer = %self.session.peer(),
                    message = other.name(),
                    xid,
                    "dropping message received during handshake"
                );
                Ok(())
            }
        }
    }

    /// 受控阶段的读循环，返回终止原因。
    async fn serve_until_closed(&mut self, dpid: DatapathId) -> SwitchError {
        let ctx = CallContext::builder()
            .with_cancellation(self.cancellation.clone())
            .build();
        loop {
            let frame = match self.next_frame(&ctx).await {
                Ok(frame) => frame,
                Err(err) => return err,
            };
            match frame.message {
                OfpMessage::EchoRequest(payload) => {
                    let reply = OfpFrame::new(frame.xid, OfpMessage::EchoReply(payload));
                    let write_ctx = self.writer.send_context();
                    if let Err(err) = self.writer.write_frame(&write_ctx, &reply).await {
                        return err;
                    }
                }
                OfpMessage::Error(err) => warn!(
                    %dpid,
                    xid = frame.xid,
                    err_type = err.err_type,
                    code = err.code,
                    "switch reported error"
                ),
                other => debug!(
                    %dpid,
                    xid = frame.xid,
                    message = other.name(),
                    msg_type = other.msg_type(),
                    "message received"
                ),
            }
        }
    }

    async fn next_frame(&mut self, ctx: &CallContext) -> Result<OfpFrame, SwitchError> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if let Some(frame) = OfpFrame::decode(&mut self.inbound, self.max_frame_len)? {
                return Ok(frame);
            }
            let read = self.channel.read(ctx, &mut chunk).await?;
            if read == 0 {
                return Err(SwitchError::PeerClosed);
            }
            self.inbound.extend_from_slice(&chunk[..read]);
        }
    }
}
