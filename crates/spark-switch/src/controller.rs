//! # 控制器：监听循环与停机控制
//!
//! ## 核心意图（Why）
//! - 把“绑定 → 接受连接 → 派发连接任务 → 停机回收”这一固定流程封装起来，
//!   调用方只需提供 [`SwitchReadyHandler`]；
//! - 绑定与运行拆成两步：先 [`Controller::bind`] 取得实际监听地址（端口可为 0），
//!   再 [`BoundController::run`] 进入接受循环。
//!
//! ## 行为契约（What）
//! - 所有连接共享同一个取消标志，[`ShutdownToken::shutdown`] 会同时打断监听循环、
//!   挂起的读取与进行中的发送；
//! - `run` 在停机后等待全部连接任务完成拆除再返回。

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use std::{net::SocketAddr, time::Duration};

use spark_transport_tcp::{CallContext, Cancellation, ErrorCategory, TcpListener};
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::{
    config::ControllerConfig,
    core::{SwitchRegistry, connection::Connection},
    error::SwitchError,
    handler::SwitchReadyHandler,
    sender::SwitchSender,
};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Debug)]
struct ControllerShared {
    config: ControllerConfig,
    registry: Arc<SwitchRegistry>,
    cancellation: Cancellation,
    next_connection: AtomicU64,
}

/// 停机令牌，可在任意任务中触发控制器停机。
#[derive(Clone, Debug)]
pub struct ShutdownToken {
    cancellation: Cancellation,
}

impl ShutdownToken {
    /// 请求停机；幂等。
    pub fn shutdown(&self) {
        self.cancellation.cancel();
    }

    /// 是否已请求停机。
    pub fn is_shutdown(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// 等待停机请求。
    pub async fn wait(&self) {
        self.cancellation.cancelled().await;
    }
}

/// 尚未绑定监听地址的控制器。
///
/// # 教案式说明
/// - **意图 (Why)**：在监听开始前就能取得 [`SwitchSender`] 与 [`ShutdownToken`]，
///   以便把它们交给就绪回调的实现者；
/// - **契约 (What)**：`new` 校验配置；`bind` 消费自身并返回 [`BoundController`]。
#[derive(Debug)]
pub struct Controller {
    shared: Arc<ControllerShared>,
}

impl Controller {
    /// 以校验过的配置创建控制器。
    pub fn new(config: ControllerConfig) -> Result<Self, SwitchError> {
        config.validate()?;
        Ok(Self {
            shared: Arc::new(ControllerShared {
                config,
                registry: Arc::new(SwitchRegistry::new()),
                cancellation: Cancellation::new(),
                next_connection: AtomicU64::new(1),
            }),
        })
    }

    /// 生效配置。
    pub fn config(&self) -> &ControllerConfig {
        &self.shared.config
    }

    /// 共享登记表。
    pub fn registry(&self) -> Arc<SwitchRegistry> {
        self.shared.registry.clone()
    }

    /// 绑定到登记表的发送入口。
    pub fn sender(&self) -> SwitchSender {
        SwitchSender::new(self.shared.registry.clone())
    }

    /// 停机令牌。
    pub fn shutdown_token(&self) -> ShutdownToken {
        ShutdownToken {
            cancellation: self.shared.cancellation.clone(),
        }
    }

    /// 绑定监听地址。
    pub async fn bind(self) -> Result<BoundController, SwitchError> {
        let listener =
            TcpListener::bind_with_config(self.shared.config.listen, self.shared.config.socket_config())
                .await?;
        Ok(BoundController {
            shared: self.shared,
            listener,
        })
    }
}

/// 已绑定监听地址、等待运行的控制器。
#[derive(Debug)]
pub struct BoundController {
    shared: Arc<ControllerShared>,
    listener: TcpListener,
}

impl BoundController {
    /// 实际监听地址。
    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    /// 绑定到登记表的发送入口。
    pub fn sender(&self) -> SwitchSender {
        SwitchSender::new(self.shared.registry.clone())
    }

    /// 停机令牌。
    pub fn shutdown_token(&self) -> ShutdownToken {
        ShutdownToken {
            cancellation: self.shared.cancellation.clone(),
        }
    }

    /// 请求停机。
    pub fn shutdown(&self) {
        self.shared.cancellation.cancel();
    }

    /// 运行接受循环直至停机。
    ///
    /// # 教案式注释
    /// - **逻辑 (How)**：每个入站连接分配递增的连接序号并在 `JoinSet` 中驱动；
    ///   接受失败仅记录告警并退避，不终止监听；
    /// - **后置条件**：返回时所有连接任务及其 `switch_ready` 回调都已结束，登记表为空。
    pub async fn run<H>(self, handler: Arc<H>) -> Result<(), SwitchError>
    where
        H: SwitchReadyHandler,
    {
        let handler: Arc<dyn SwitchReadyHandler> = handler;
        let accept_ctx = CallContext::builder()
            .with_cancellation(self.shared.cancellation.clone())
            .build();
        let mut connections = JoinSet::new();
        info!(listen = %self.local_addr(), "openflow controller listening");

        loop {
            while connections.try_join_next().is_some() {}

            match self.listener.accept(&accept_ctx).await {
                Ok((channel, peer)) => {
                    let connection_id = self.shared.next_connection.fetch_add(1, Ordering::Relaxed);
                    info!(%peer, connection_id, "switch connected");
                    let connection = Connection::new(
                        channel,
                        peer,
                        connection_id,
                        &self.shared.config,
                        self.shared.cancellation.clone(),
                    );
                    connections.spawn(connection.run(self.shared.registry.clone(), handler.clone()));
                }
                Err(err) if err.is_cancelled() => break,
                Err(err) => {
                    warn!(code = err.code(), error = %err, "accept failed");
                    let backoff = match err.category() {
                        ErrorCategory::Retryable(backoff) => backoff,
                        _ => ACCEPT_BACKOFF,
                    };
                    tokio::select! {
                        _ = tokio::time::sleep(backoff) => {}
                        _ = self.shared.cancellation.cancelled() => break,
                    }
                }
            }
        }

        while connections.join_next().await.is_some() {}
        info!("openflow controller stopped");
        Ok(())
    }
}
