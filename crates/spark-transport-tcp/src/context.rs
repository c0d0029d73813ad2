use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use tokio::sync::Notify;

/// 可跨任务共享的取消标志。
///
/// # 教案式注释
///
/// ## 意图 (Why)
/// - 控制器停机时需要同时打断监听循环与所有连接上的挂起读写；
///   共享同一个 `Cancellation` 即可一次性广播取消信号。
///
/// ## 契约 (What)
/// - `cancel` 幂等，调用后 `is_cancelled` 永远返回 `true`；
/// - `cancelled().await` 在取消发生后立即返回，若调用时已取消则不等待；
/// - 克隆出的实例共享同一状态。
///
/// ## 注意事项 (Trade-offs)
/// - 不支持父子层级取消；需要独立生命周期的连接应各自持有新的实例。
#[derive(Clone, Debug, Default)]
pub struct Cancellation {
    inner: Arc<CancellationInner>,
}

#[derive(Debug, Default)]
struct CancellationInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl Cancellation {
    /// 创建未取消的标志。
    pub fn new() -> Self {
        Self::default()
    }

    /// 触发取消并唤醒全部等待者。
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
        self.inner.notify.notify_waiters();
    }

    /// 是否已取消。
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// 等待取消发生。
    pub async fn cancelled(&self) {
        loop {
            // 先创建 Notified 再检查标志，保证 cancel 与检查之间的通知不会丢失。
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// 单次 IO 调用的执行上下文：截止时间 + 取消标志。
#[derive(Clone, Debug, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
    cancellation: Cancellation,
}

impl CallContext {
    /// 返回构建器。
    pub fn builder() -> CallContextBuilder {
        CallContextBuilder::default()
    }

    /// 截止时间，`None` 表示不限时。
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// 取消标志。
    pub fn cancellation(&self) -> &Cancellation {
        &self.cancellation
    }

    /// 派生一个共享取消标志、但截止时间收紧到 `timeout` 之后的子上下文。
    ///
    /// 若原上下文的截止时间更早，则保留原值。
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(existing) if existing < candidate => existing,
            _ => candidate,
        };
        Self {
            deadline: Some(deadline),
            cancellation: self.cancellation.clone(),
        }
    }
}

/// [`CallContext`] 构建器。
#[derive(Debug, Default)]
pub struct CallContextBuilder {
    deadline: Option<Instant>,
    cancellation: Option<Cancellation>,
}

impl CallContextBuilder {
    /// 设置绝对截止时间。
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// 以当前时刻为基准设置超时。
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// 复用外部取消标志。
    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = Some(cancellation);
        self
    }

    /// 生成上下文。
    pub fn build(self) -> CallContext {
        CallContext {
            deadline: self.deadline,
            cancellation: self.cancellation.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancelled_returns_after_cancel() {
        let cancellation = Cancellation::new();
        let waiter = {
            let cancellation = cancellation.clone();
            tokio::spawn(async move { cancellation.cancelled().await })
        };
        tokio::task::yield_now().await;
        cancellation.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter woke up")
            .expect("waiter finished");
        assert!(cancellation.is_cancelled());
    }

    #[test]
    fn child_keeps_earlier_deadline() {
        let parent = CallContext::builder()
            .with_timeout(Duration::from_millis(10))
            .build();
        let child = parent.child_with_timeout(Duration::from_secs(60));
        assert_eq!(child.deadline(), parent.deadline());
    }
}
