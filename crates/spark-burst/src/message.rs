use std::{fmt, str::FromStr};

use serde::Deserialize;

use crate::request::ConfigureError;

/// 突发中可以重复发送的控制消息种类。
///
/// # 教案式说明
/// - **意图 (Why)**：压测工具每次只发送一种消息；默认的 `SetConfig` 是最初的压测对象，
///   其余种类复用同一套突发逻辑观察交换机对不同请求的吸收能力；
/// - **契约 (What)**：文本形式为 kebab-case（`set-config`、`echo-request` ……），
///   命令行与配置文件共用同一套名称；
/// - **风险 (Trade-offs)**：只收录无需负载即可构造的消息，保证每次构造的实例结构完全一致。
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum MessageKind {
    /// `OFPT_SET_CONFIG`，携带默认交换机配置。
    #[default]
    SetConfig,
    /// `OFPT_HELLO`
    Hello,
    /// `OFPT_ECHO_REQUEST`，负载为空。
    EchoRequest,
    /// `OFPT_FEATURES_REQUEST`
    FeaturesRequest,
    /// `OFPT_GET_CONFIG_REQUEST`
    GetConfigRequest,
    /// `OFPT_BARRIER_REQUEST`
    BarrierRequest,
}

impl MessageKind {
    /// 全部种类，顺序与文档一致。
    pub const ALL: [MessageKind; 6] = [
        MessageKind::SetConfig,
        MessageKind::Hello,
        MessageKind::EchoRequest,
        MessageKind::FeaturesRequest,
        MessageKind::GetConfigRequest,
        MessageKind::BarrierRequest,
    ];

    /// kebab-case 名称。
    pub const fn as_str(self) -> &'static str {
        match self {
            MessageKind::SetConfig => "set-config",
            MessageKind::Hello => "hello",
            MessageKind::EchoRequest => "echo-request",
            MessageKind::FeaturesRequest => "features-request",
            MessageKind::GetConfigRequest => "get-config-request",
            MessageKind::BarrierRequest => "barrier-request",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = ConfigureError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let name = raw.trim();
        MessageKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| ConfigureError::UnknownMessageKind {
                name: name.to_owned(),
            })
    }
}

/// 一条待发送的控制消息。
///
/// 每次发送尝试都构造一个新实例；实例之间除种类外没有任何差异，发送后不保留状态。
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ControlMessage {
    kind: MessageKind,
}

impl ControlMessage {
    /// 构造指定种类的消息。
    pub const fn new(kind: MessageKind) -> Self {
        Self { kind }
    }

    /// 消息种类。
    pub const fn kind(self) -> MessageKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
        for kind in MessageKind::ALL {
            assert_eq!(kind.as_str().parse::<MessageKind>(), Ok(kind));
        }
        assert_eq!(" Barrier-Request ".parse(), Ok(MessageKind::BarrierRequest));
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = "flow-mod".parse::<MessageKind>().expect_err("not supported");
        assert_eq!(
            err,
            ConfigureError::UnknownMessageKind {
                name: "flow-mod".to_owned()
            }
        );
    }

    #[test]
    fn default_kind_is_set_config() {
        assert_eq!(MessageKind::default(), MessageKind::SetConfig);
        assert_eq!(
            ControlMessage::new(MessageKind::default()).kind(),
            MessageKind::SetConfig
        );
    }
}
