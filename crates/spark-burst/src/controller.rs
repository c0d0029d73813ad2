use std::fmt;

use tracing::{debug, trace};

use crate::{
    message::ControlMessage,
    request::BurstRequest,
    result::{BurstPhase, BurstResult},
    transport::MessageSender,
};

/// 突发控制器：交换机就绪时按配置连续发送消息。
///
/// # 教案式注释
///
/// ## 意图 (Why)
/// - 压测的核心逻辑：对一台刚进入受控状态的交换机，顺序发送 `count` 条相同消息；
/// - 中途一旦失败立即中止。此时交换机多半已被扰动，继续发送只会用噪声掩盖首个失败。
///
/// ## 契约 (What)
/// - 第 `i + 1` 次发送只在第 `i` 次返回（无论成败）之后发出，不批量、不重排；
/// - 每次发送前构造新的 [`ControlMessage`]；
/// - 失败不会以 panic 或错误穿透回调边界，统一折叠为 [`BurstResult`]；
/// - 控制器本身不持有可变状态，可被多台交换机的突发并发共享。
///
/// ## 逻辑 (How)
/// - 阶段依次推进 `Discovered → Ready → Bursting`，循环结束后进入 `Completed` 或 `Aborted`。
#[derive(Clone, Copy, Debug)]
pub struct BurstController {
    request: BurstRequest,
}

impl BurstController {
    /// 以启动时确定的请求构造控制器。
    pub const fn new(request: BurstRequest) -> Self {
        Self { request }
    }

    /// 生效的突发请求。
    pub const fn request(&self) -> &BurstRequest {
        &self.request
    }

    /// 交换机就绪回调：执行一次完整突发并返回结果。
    pub async fn on_switch_ready<Id, S>(&self, switch: Id, sender: &S) -> BurstResult<Id>
    where
        Id: Clone + fmt::Display + Send + 'static,
        S: MessageSender<Id> + ?Sized,
    {
        let requested = self.request.count();
        let kind = self.request.kind();
        let mut phase = advance(BurstPhase::Discovered, BurstPhase::Ready);
        phase = advance(phase, BurstPhase::Bursting);
        debug!(%switch, count = requested, %kind, "burst started");

        for attempt in 1..=requested {
            let message = ControlMessage::new(kind);
            if let Err(cause) = sender.send(switch.clone(), message).await {
                debug!(%switch, attempt, error = %cause, "send failed, aborting burst");
                return BurstResult {
                    switch,
                    requested,
                    sent: attempt - 1,
                    failed_at: Some(attempt),
                    cause: Some(cause),
                    phase: advance(phase, BurstPhase::Aborted),
                };
            }
            trace!(%switch, attempt, "message sent");
        }

        BurstResult {
            switch,
            requested,
            sent: requested,
            failed_at: None,
            cause: None,
            phase: advance(phase, BurstPhase::Completed),
        }
    }
}

fn advance(from: BurstPhase, to: BurstPhase) -> BurstPhase {
    debug_assert!(from.can_transition_to(to), "{from:?} -> {to:?}");
    to
}
