use crate::context::CallContext;
use crate::error::{OperationKind, TcpError, cancelled_error, map_io_error, timeout_error};
use std::future::Future;
use std::io;
use std::time::Instant;
use tokio::time::Instant as TokioInstant;

/// 判断截止时间是否已经过期。
pub(crate) fn deadline_expired(deadline: Option<Instant>) -> bool {
    match deadline {
        Some(target) => target <= Instant::now(),
        None => false,
    }
}

/// 在保留取消/超时语义的前提下执行 IO Future。
pub(crate) async fn run_with_context<F, T>(
    ctx: &CallContext,
    kind: OperationKind,
    future: F,
) -> Result<T, TcpError>
where
    F: Future<Output = io::Result<T>>,
{
    if deadline_expired(ctx.deadline()) {
        return Err(timeout_error(kind));
    }
    if ctx.cancellation().is_cancelled() {
        return Err(cancelled_error(kind));
    }

    let cancel = ctx.cancellation().cancelled();
    tokio::pin!(cancel);
    tokio::pin!(future);

    if let Some(deadline) = ctx.deadline() {
        let sleep = tokio::time::sleep_until(TokioInstant::from_std(deadline));
        tokio::pin!(sleep);
        tokio::select! {
            biased;
            _ = &mut cancel => Err(cancelled_error(kind)),
            _ = &mut sleep => Err(timeout_error(kind)),
            result = &mut future => result.map_err(|err| map_io_error(kind, err)),
        }
    } else {
        tokio::select! {
            biased;
            _ = &mut cancel => Err(cancelled_error(kind)),
            result = &mut future => result.map_err(|err| map_io_error(kind, err)),
        }
    }
}
