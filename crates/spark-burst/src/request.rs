use std::str::FromStr;

use thiserror::Error;

use crate::message::MessageKind;

/// 启动阶段的配置错误。
///
/// # 教案式说明
/// - **意图 (Why)**：突发次数来自命令行等外部输入，非法值必须在注册就绪回调之前被拒绝；
/// - **契约 (What)**：`input` 保留调用方给出的原始文本，便于直接回显给用户。
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ConfigureError {
    /// 突发次数不是非负整数。
    #[error("invalid burst count `{input}`: {reason}")]
    InvalidConfiguration {
        /// 原始输入。
        input: String,
        /// 拒绝原因。
        reason: &'static str,
    },

    /// 不支持的消息种类名称。
    #[error(
        "unknown message kind `{name}` (expected one of: set-config, hello, echo-request, \
         features-request, get-config-request, barrier-request)"
    )]
    UnknownMessageKind {
        /// 原始名称。
        name: String,
    },
}

/// 一次突发的配置：消息种类与次数。
///
/// # 教案式说明
/// - **意图 (Why)**：以显式、不可变的值取代进程级共享的可变计数，
///   并发连接的多台交换机只读共享同一份配置；
/// - **契约 (What)**：
///   - `count` 为非负整数，`0` 表示空突发（不发送任何消息，结果视为成功）；
///   - 构造后不可修改，[`with_kind`](Self::with_kind) 返回新值；
/// - **风险 (Trade-offs)**：不设上限，超大次数带来的耗时由使用者自行承担。
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BurstRequest {
    kind: MessageKind,
    count: u64,
}

impl BurstRequest {
    /// 校验整数次数并生成默认种类（`SetConfig`）的请求。
    pub fn configure(count: i64) -> Result<Self, ConfigureError> {
        let count = u64::try_from(count).map_err(|_| ConfigureError::InvalidConfiguration {
            input: count.to_string(),
            reason: "count must not be negative",
        })?;
        Ok(Self {
            kind: MessageKind::default(),
            count,
        })
    }

    /// 解析十进制文本形式的次数，忽略首尾空白。
    ///
    /// 带符号的零（`-0`、`+0`）按零接受；其余负数以“不得为负”拒绝。
    pub fn parse(raw: &str) -> Result<Self, ConfigureError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ConfigureError::InvalidConfiguration {
                input: raw.to_owned(),
                reason: "count is empty",
            });
        }
        if let Ok(count) = trimmed.parse::<u64>() {
            return Ok(Self {
                kind: MessageKind::default(),
                count,
            });
        }
        let reason = match trimmed.parse::<i64>() {
            Ok(0) => {
                return Ok(Self {
                    kind: MessageKind::default(),
                    count: 0,
                });
            }
            Ok(_) => "count must not be negative",
            Err(_) => "count must be a non-negative decimal integer",
        };
        Err(ConfigureError::InvalidConfiguration {
            input: raw.to_owned(),
            reason,
        })
    }

    /// 替换消息种类。
    pub const fn with_kind(self, kind: MessageKind) -> Self {
        Self { kind, ..self }
    }

    /// 消息种类。
    pub const fn kind(&self) -> MessageKind {
        self.kind
    }

    /// 每次突发的发送次数。
    pub const fn count(&self) -> u64 {
        self.count
    }
}

impl FromStr for BurstRequest {
    type Err = ConfigureError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::parse(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configure_accepts_zero_and_positive_counts() {
        assert_eq!(BurstRequest::configure(0).map(|r| r.count()), Ok(0));
        let request = BurstRequest::configure(5).expect("valid count");
        assert_eq!(request.count(), 5);
        assert_eq!(request.kind(), MessageKind::SetConfig);
    }

    #[test]
    fn configure_rejects_negative_count() {
        let err = BurstRequest::configure(-1).expect_err("negative");
        assert_eq!(
            err,
            ConfigureError::InvalidConfiguration {
                input: "-1".to_owned(),
                reason: "count must not be negative",
            }
        );
    }

    #[test]
    fn parse_rejects_non_numeric_input() {
        for raw in ["abc", "", "  ", "1.5", "5x", "0x10"] {
            let err = BurstRequest::parse(raw).expect_err(raw);
            assert!(
                matches!(err, ConfigureError::InvalidConfiguration { .. }),
                "{raw:?} gave {err:?}"
            );
        }
        assert!(BurstRequest::parse("-3")
            .expect_err("negative")
            .to_string()
            .contains("must not be negative"));
    }

    #[test]
    fn signed_zero_parses_as_zero() {
        for raw in ["-0", "+0", " -00 "] {
            assert_eq!(BurstRequest::parse(raw).map(|r| r.count()), Ok(0), "{raw:?}");
        }
        assert!(BurstRequest::parse("-1").is_err());
    }

    #[test]
    fn parse_trims_whitespace() {
        assert_eq!(BurstRequest::parse(" 12\n").map(|r| r.count()), Ok(12));
    }

    #[test]
    fn with_kind_keeps_count() {
        let request = BurstRequest::configure(3)
            .expect("valid")
            .with_kind(MessageKind::BarrierRequest);
        assert_eq!(request.count(), 3);
        assert_eq!(request.kind(), MessageKind::BarrierRequest);
    }
}
