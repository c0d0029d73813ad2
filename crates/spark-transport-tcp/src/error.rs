use std::io;
use std::time::Duration;

use thiserror::Error;

/// 错误分类，指导上层决定重试、关闭还是直接放弃。
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorCategory {
    /// 短暂失败，建议在给定时长后重试。
    Retryable(Duration),
    /// 不可重试。
    NonRetryable,
    /// 对端已关闭或连接已重置。
    Closed,
    /// 上下文被取消。
    Cancelled,
    /// 超过截止时间。
    Timeout,
}

/// TCP 传输层错误。
///
/// # 教案式说明
/// - **意图 (Why)**：携带稳定错误码与 [`ErrorCategory`]，使控制器无需解析 `io::ErrorKind`
///   就能判断“连接已断开”与“本次操作超时”的区别；
/// - **契约 (What)**：`code` 取自 `spark.transport.tcp.*` 命名空间；底层 `io::Error`
///   通过 `source()` 暴露；
/// - **风险 (Trade-offs)**：`io::Error` 不可克隆，因此本类型也不实现 `Clone`。
#[derive(Debug, Error)]
#[error("{message} ({code})")]
pub struct TcpError {
    code: &'static str,
    message: String,
    category: ErrorCategory,
    #[source]
    source: Option<io::Error>,
}

impl TcpError {
    /// 稳定错误码。
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// 错误分类。
    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    /// 连接是否已不可用。
    pub fn is_closed(&self) -> bool {
        matches!(self.category, ErrorCategory::Closed)
    }

    /// 是否由截止时间触发。
    pub fn is_timeout(&self) -> bool {
        matches!(self.category, ErrorCategory::Timeout)
    }

    /// 是否由取消触发。
    pub fn is_cancelled(&self) -> bool {
        matches!(self.category, ErrorCategory::Cancelled)
    }
}

/// 描述一次底层操作对应的稳定错误码与默认文案。
#[derive(Clone, Copy)]
pub(crate) struct OperationKind {
    pub code: &'static str,
    pub message: &'static str,
}

pub(crate) const BIND: OperationKind = OperationKind {
    code: "spark.transport.tcp.bind_failed",
    message: "tcp bind",
};
pub(crate) const ACCEPT: OperationKind = OperationKind {
    code: "spark.transport.tcp.accept_failed",
    message: "tcp accept",
};
pub(crate) const CONNECT: OperationKind = OperationKind {
    code: "spark.transport.tcp.connect_failed",
    message: "tcp connect",
};
pub(crate) const READ: OperationKind = OperationKind {
    code: "spark.transport.tcp.read_failed",
    message: "tcp read",
};
pub(crate) const WRITE: OperationKind = OperationKind {
    code: "spark.transport.tcp.write_failed",
    message: "tcp write",
};
pub(crate) const SHUTDOWN: OperationKind = OperationKind {
    code: "spark.transport.tcp.shutdown_failed",
    message: "tcp shutdown",
};
pub(crate) const CONFIGURE: OperationKind = OperationKind {
    code: "spark.transport.tcp.configure_failed",
    message: "tcp configure",
};

const CANCEL_CODE: &str = "spark.transport.tcp.cancelled";
const TIMEOUT_CODE: &str = "spark.transport.tcp.timeout";

/// 将 IO 错误映射为传输错误，并附带错误分类。
pub(crate) fn map_io_error(kind: OperationKind, error: io::Error) -> TcpError {
    TcpError {
        code: kind.code,
        message: format!("{}: {}", kind.message, error),
        category: categorize_io_error(&error),
        source: Some(error),
    }
}

/// 构造取消错误。
pub(crate) fn cancelled_error(kind: OperationKind) -> TcpError {
    TcpError {
        code: CANCEL_CODE,
        message: format!("{} cancelled", kind.message),
        category: ErrorCategory::Cancelled,
        source: None,
    }
}

/// 构造超时错误。
pub(crate) fn timeout_error(kind: OperationKind) -> TcpError {
    TcpError {
        code: TIMEOUT_CODE,
        message: format!("{} timed out", kind.message),
        category: ErrorCategory::Timeout,
        source: None,
    }
}

fn categorize_io_error(error: &io::Error) -> ErrorCategory {
    use io::ErrorKind;
    match error.kind() {
        ErrorKind::TimedOut => ErrorCategory::Timeout,
        ErrorKind::WouldBlock | ErrorKind::Interrupted => {
            ErrorCategory::Retryable(Duration::from_millis(5))
        }
        ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::NotConnected
        | ErrorKind::BrokenPipe
        | ErrorKind::UnexpectedEof => ErrorCategory::Closed,
        ErrorKind::ConnectionRefused | ErrorKind::AddrInUse | ErrorKind::AddrNotAvailable => {
            ErrorCategory::Retryable(Duration::from_millis(50))
        }
        ErrorKind::WriteZero => ErrorCategory::Retryable(Duration::from_millis(10)),
        _ => ErrorCategory::NonRetryable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_and_broken_pipe_are_closed() {
        for kind in [io::ErrorKind::ConnectionReset, io::ErrorKind::BrokenPipe] {
            let err = map_io_error(WRITE, io::Error::from(kind));
            assert!(err.is_closed(), "{kind:?} should map to Closed");
            assert_eq!(err.code(), "spark.transport.tcp.write_failed");
        }
    }

    #[test]
    fn timeout_and_cancel_use_dedicated_codes() {
        assert_eq!(timeout_error(READ).code(), "spark.transport.tcp.timeout");
        assert!(timeout_error(READ).is_timeout());
        assert_eq!(cancelled_error(ACCEPT).code(), "spark.transport.tcp.cancelled");
        assert!(cancelled_error(ACCEPT).is_cancelled());
    }
}
