use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use spark_switch::{ShutdownToken, SwitchReadyHandler, SwitchRef, SwitchSender};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{controller::BurstController, result::BurstResult, transport::MessageSender};

/// 把突发控制器挂接到控制器生命周期回调上的宿主。
///
/// # 教案式注释
///
/// ## 意图 (Why)
/// - [`BurstController`] 只负责“一次突发”；何时触发、结果交给谁、何时停止进程，
///   属于宿主策略，集中在这里；
/// - 每台交换机就绪时由控制器在独立任务上调用 [`SwitchReadyHandler::switch_ready`]，
///   多台交换机的突发天然并发，彼此只共享只读的突发请求与原子计数。
///
/// ## 契约 (What)
/// - 每次突发结束都会记录日志：完成为 `info`，中止为 `warn`；
/// - 若设置了报告通道，结果按完成顺序推送；接收端关闭后静默丢弃；
/// - `exit_on_failure` 打开且突发中止时请求停机，并置位 [`stopped_on_failure`](Self::stopped_on_failure)；
/// - 已结束的突发数达到 `max_bursts` 时请求停机；
/// - 停机只在设置了 [`ShutdownToken`] 时生效。
///
/// ## 风险 (Trade-offs)
/// - 突发绑定在触发它的连接上：交换机在突发中途断开或重连时，旧突发以断开失败中止，
///   新连接另行触发一次完整突发，不会收到旧突发剩余的消息。
pub struct BurstHarness<S = SwitchSender> {
    controller: BurstController,
    sender: S,
    reports: Option<mpsc::UnboundedSender<BurstResult<SwitchRef>>>,
    shutdown: Option<ShutdownToken>,
    exit_on_failure: bool,
    max_bursts: Option<u64>,
    finished: AtomicU64,
    stopped_on_failure: AtomicBool,
}

impl<S> BurstHarness<S>
where
    S: MessageSender<SwitchRef> + 'static,
{
    /// 以控制器与发送方构造宿主，默认不报告、不停机。
    pub fn new(controller: BurstController, sender: S) -> Self {
        Self {
            controller,
            sender,
            reports: None,
            shutdown: None,
            exit_on_failure: false,
            max_bursts: None,
            finished: AtomicU64::new(0),
            stopped_on_failure: AtomicBool::new(false),
        }
    }

    /// 把每次突发的结果推送到 `reports`。
    pub fn with_reports(mut self, reports: mpsc::UnboundedSender<BurstResult<SwitchRef>>) -> Self {
        self.reports = Some(reports);
        self
    }

    /// 允许宿主在满足停止条件时请求控制器停机。
    pub fn with_shutdown(mut self, shutdown: ShutdownToken) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// 任一突发中止时停机。
    pub fn exit_on_failure(mut self, enabled: bool) -> Self {
        self.exit_on_failure = enabled;
        self
    }

    /// 结束 `limit` 次突发后停机；`None` 表示不限。
    pub fn max_bursts(mut self, limit: Option<u64>) -> Self {
        self.max_bursts = limit;
        self
    }

    /// 使用中的突发控制器。
    pub fn controller(&self) -> &BurstController {
        &self.controller
    }

    /// 已结束的突发次数。
    pub fn finished_bursts(&self) -> u64 {
        self.finished.load(Ordering::Acquire)
    }

    /// 是否因突发中止而请求过停机。
    pub fn stopped_on_failure(&self) -> bool {
        self.stopped_on_failure.load(Ordering::Acquire)
    }

    fn record(&self, result: &BurstResult<SwitchRef>) {
        let finished = self.finished.fetch_add(1, Ordering::AcqRel) + 1;
        let Some(shutdown) = &self.shutdown else {
            return;
        };
        if self.exit_on_failure && result.is_aborted() {
            self.stopped_on_failure.store(true, Ordering::Release);
            info!(switch = %result.switch, "stopping after failed burst");
            shutdown.shutdown();
        } else if self.max_bursts.is_some_and(|limit| finished >= limit) {
            info!(finished, "burst limit reached, stopping");
            shutdown.shutdown();
        }
    }
}

#[async_trait]
impl<S> SwitchReadyHandler for BurstHarness<S>
where
    S: MessageSender<SwitchRef> + 'static,
{
    async fn switch_ready(&self, switch: SwitchRef) {
        let dpid = switch.dpid();
        let result = self.controller.on_switch_ready(switch, &self.sender).await;
        match (&result.failed_at, &result.cause) {
            (Some(attempt), Some(cause)) => warn!(
                dpid = %dpid,
                connection_id = switch.connection_id(),
                sent = result.sent,
                count = result.requested,
                attempt,
                error = %cause,
                "burst aborted"
            ),
            _ => info!(dpid = %dpid, sent = result.sent, count = result.requested, "burst completed"),
        }

        self.record(&result);
        if let Some(reports) = &self.reports
            && reports.send(result).is_err()
        {
            debug!(dpid = %dpid, "burst report receiver dropped");
        }
    }

    async fn switch_disconnected(&self, switch: SwitchRef) {
        debug!(%switch, "switch disconnected");
    }
}
