use std::{net::SocketAddr, time::Duration};

use serde::Deserialize;
use spark_openflow::{DEFAULT_MAX_FRAME_LEN, OFP_HEADER_LEN};
use spark_transport_tcp::TcpSocketConfig;

use crate::error::SwitchError;

const DEFAULT_LISTEN: &str = "0.0.0.0:6653";
const DEFAULT_HANDSHAKE_TIMEOUT_MS: u64 = 5_000;

/// 控制器运行参数。
///
/// # 教案式说明
/// - **意图 (Why)**：把监听地址、握手超时、发送超时与套接字选项集中在一个可反序列化的结构中，
///   既能从 TOML 文件加载，也能由命令行逐项覆盖；
/// - **契约 (What)**：
///   - 所有字段都有默认值，空文件即得到默认配置；未知字段会被拒绝，避免拼写错误静默生效；
///   - `send_timeout_ms` 缺省为 `None`：发送不设超时，挂起本身即是诊断信号；
///   - [`ControllerConfig::validate`] 在控制器启动前调用，拒绝无法工作的组合；
/// - **风险 (Trade-offs)**：`max_frame_len` 上限为 65535，这是 OpenFlow 帧头 `length` 字段的表达极限。
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ControllerConfig {
    /// 监听地址，OpenFlow 约定端口为 6653。
    pub listen: SocketAddr,
    /// 握手（HELLO + FEATURES）总时限，毫秒。
    pub handshake_timeout_ms: u64,
    /// 单次发送的时限，毫秒；`None` 表示不限时。
    pub send_timeout_ms: Option<u64>,
    /// 接收方向允许的最大帧长。
    pub max_frame_len: usize,
    /// 是否禁用 Nagle 算法。
    pub tcp_nodelay: bool,
    /// `SO_LINGER` 时长，毫秒；`None` 沿用内核默认。
    pub linger_ms: Option<u64>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 6653)),
            handshake_timeout_ms: DEFAULT_HANDSHAKE_TIMEOUT_MS,
            send_timeout_ms: None,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            tcp_nodelay: true,
            linger_ms: None,
        }
    }
}

impl ControllerConfig {
    /// 从 TOML 文本解析并校验配置。
    pub fn from_toml_str(raw: &str) -> Result<Self, SwitchError> {
        let config: Self = toml::from_str(raw).map_err(|err| SwitchError::config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 校验字段组合。
    ///
    /// - **契约 (What)**：握手超时必须大于零；`max_frame_len` 必须落在 `[8, 65535]`；
    ///   若设置了发送超时，也必须大于零。
    pub fn validate(&self) -> Result<(), SwitchError> {
        if self.handshake_timeout_ms == 0 {
            return Err(SwitchError::config("handshake_timeout_ms must be greater than zero"));
        }
        if self.send_timeout_ms == Some(0) {
            return Err(SwitchError::config("send_timeout_ms must be greater than zero"));
        }
        if !(OFP_HEADER_LEN..=DEFAULT_MAX_FRAME_LEN).contains(&self.max_frame_len) {
            return Err(SwitchError::config(format!(
                "max_frame_len must be within {OFP_HEADER_LEN}..={DEFAULT_MAX_FRAME_LEN}, got {}",
                self.max_frame_len
            )));
        }
        Ok(())
    }

    /// 握手时限。
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    /// 单次发送时限。
    pub fn send_timeout(&self) -> Option<Duration> {
        self.send_timeout_ms.map(Duration::from_millis)
    }

    /// 由配置派生的套接字选项。
    pub fn socket_config(&self) -> TcpSocketConfig {
        TcpSocketConfig::new()
            .with_nodelay(self.tcp_nodelay)
            .with_linger(self.linger_ms.map(Duration::from_millis))
    }

    /// 默认监听地址文本，供命令行帮助展示。
    pub const fn default_listen() -> &'static str {
        DEFAULT_LISTEN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = ControllerConfig::from_toml_str("").expect("empty config");
        assert_eq!(config, ControllerConfig::default());
        assert_eq!(config.listen.to_string(), ControllerConfig::default_listen());
        assert_eq!(config.send_timeout(), None);
        assert!(config.socket_config().nodelay());
    }

    #[test]
    fn fields_override_defaults() {
        let config = ControllerConfig::from_toml_str(
            r#"
            listen = "127.0.0.1:16653"
            handshake_timeout_ms = 250
            send_timeout_ms = 40
            linger_ms = 1000
            "#,
        )
        .expect("valid config");
        assert_eq!(config.listen.port(), 16653);
        assert_eq!(config.handshake_timeout(), Duration::from_millis(250));
        assert_eq!(config.send_timeout(), Some(Duration::from_millis(40)));
        assert_eq!(
            config.socket_config().linger(),
            Some(Duration::from_secs(1))
        );
    }

    #[test]
    fn unknown_field_is_rejected() {
        let err = ControllerConfig::from_toml_str("listen_port = 6653").expect_err("typo");
        assert!(matches!(err, SwitchError::Config { .. }));
    }

    #[test]
    fn frame_budget_below_header_is_rejected() {
        let err = ControllerConfig::from_toml_str("max_frame_len = 4").expect_err("too small");
        assert!(err.to_string().contains("max_frame_len"));
    }
}
