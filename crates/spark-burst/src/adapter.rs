//! 突发核心与 OpenFlow 控制器之间的适配层。
//!
//! 核心只认识 [`ControlMessage`] 与 [`TransportError`]；这里把它们分别映射到线上的
//! [`OfpMessage`] 与控制器的 [`SwitchError`]，使 [`SwitchSender`] 可以直接作为
//! [`MessageSender`] 使用。
//!
//! 发送以 [`SwitchRef`] 为键：突发绑定在触发它的那条连接上，连接被关闭或被同一交换机的
//! 新连接取代后，剩余的发送以断开失败，而不会写到新连接上。

use async_trait::async_trait;
use bytes::Bytes;
use spark_openflow::{OfpMessage, SwitchConfig};
use spark_switch::{SwitchError, SwitchRef, SwitchSender};

use crate::{
    message::{ControlMessage, MessageKind},
    transport::{MessageSender, TransportError, TransportErrorKind},
};

impl From<MessageKind> for OfpMessage {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::SetConfig => OfpMessage::SetConfig(SwitchConfig::default()),
            MessageKind::Hello => OfpMessage::Hello(Bytes::new()),
            MessageKind::EchoRequest => OfpMessage::EchoRequest(Bytes::new()),
            MessageKind::FeaturesRequest => OfpMessage::FeaturesRequest,
            MessageKind::GetConfigRequest => OfpMessage::GetConfigRequest,
            MessageKind::BarrierRequest => OfpMessage::BarrierRequest,
        }
    }
}

impl From<ControlMessage> for OfpMessage {
    fn from(message: ControlMessage) -> Self {
        message.kind().into()
    }
}

impl From<SwitchError> for TransportError {
    fn from(err: SwitchError) -> Self {
        let kind = if err.is_disconnect() {
            TransportErrorKind::Disconnected
        } else if err.is_timeout() {
            TransportErrorKind::Timeout
        } else {
            match &err {
                SwitchError::Codec(_) => TransportErrorKind::Encode,
                SwitchError::Transport(_) => TransportErrorKind::Write,
                _ => TransportErrorKind::Other,
            }
        };
        TransportError::new(kind, err)
    }
}

#[async_trait]
impl MessageSender<SwitchRef> for SwitchSender {
    async fn send(&self, switch: SwitchRef, message: ControlMessage) -> Result<(), TransportError> {
        self.send_to(switch, message.into())
            .await
            .map_err(TransportError::from)
    }
}

#[cfg(test)]
mod tests {
    use std::{error::Error, sync::Arc};

    use spark_openflow::{CodecError, message::msg_type};
    use spark_switch::{DatapathId, SwitchRegistry};

    use super::*;

    #[test]
    fn every_kind_maps_to_its_wire_type() {
        let expected = [
            (MessageKind::SetConfig, msg_type::SET_CONFIG),
            (MessageKind::Hello, msg_type::HELLO),
            (MessageKind::EchoRequest, msg_type::ECHO_REQUEST),
            (MessageKind::FeaturesRequest, msg_type::FEATURES_REQUEST),
            (MessageKind::GetConfigRequest, msg_type::GET_CONFIG_REQUEST),
            (MessageKind::BarrierRequest, msg_type::BARRIER_REQUEST),
        ];
        for (kind, wire) in expected {
            assert_eq!(OfpMessage::from(kind).msg_type(), wire, "{kind}");
        }
    }

    #[test]
    fn set_config_carries_default_switch_config() {
        let message = OfpMessage::from(ControlMessage::new(MessageKind::SetConfig));
        assert_eq!(message, OfpMessage::SetConfig(SwitchConfig::default()));
    }

    #[test]
    fn switch_errors_are_classified() {
        let dpid = DatapathId::new(1);
        let disconnected = TransportError::from(SwitchError::NotConnected { dpid });
        assert_eq!(disconnected.kind(), TransportErrorKind::Disconnected);
        assert!(disconnected.source().is_some());

        assert_eq!(
            TransportError::from(SwitchError::PeerClosed).kind(),
            TransportErrorKind::Disconnected
        );
        let replaced = SwitchError::ConnectionReplaced {
            switch: SwitchRef::new(dpid, 4),
        };
        assert_eq!(
            TransportError::from(replaced).kind(),
            TransportErrorKind::Disconnected
        );

        let codec = CodecError::FrameTooLarge {
            length: 70_000,
            limit: 65_535,
        };
        assert_eq!(
            TransportError::from(SwitchError::Codec(codec)).kind(),
            TransportErrorKind::Encode
        );
    }

    #[tokio::test]
    async fn sending_to_unknown_switch_reports_disconnect() {
        let sender = SwitchSender::new(Arc::new(SwitchRegistry::new()));
        let err = MessageSender::send(
            &sender,
            SwitchRef::new(DatapathId::new(3), 1),
            ControlMessage::new(MessageKind::SetConfig),
        )
        .await
        .expect_err("nothing is registered");
        assert!(err.is_disconnect());
    }
}
