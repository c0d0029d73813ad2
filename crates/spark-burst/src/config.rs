//! 配置文件：控制器参数与突发策略。
//!
//! 文件为 TOML，包含两张可选的表：
//!
//! ```toml
//! [controller]
//! listen = "0.0.0.0:6653"
//! send_timeout_ms = 500
//!
//! [burst]
//! kind = "set-config"
//! exit_on_failure = true
//! max_bursts = 4
//! ```
//!
//! 所有键均可省略；未知键会被拒绝。突发次数只能由命令行给出。

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use spark_switch::{ControllerConfig, SwitchError};
use thiserror::Error;

use crate::message::MessageKind;

/// 配置文件加载错误。
#[derive(Debug, Error)]
pub enum HarnessConfigError {
    /// 文件无法读取。
    #[error("failed to read config file {}: {source}", path.display())]
    Io {
        /// 文件路径。
        path: PathBuf,
        /// 底层 IO 错误。
        #[source]
        source: std::io::Error,
    },

    /// TOML 语法或字段类型错误。
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// 字段组合无效。
    #[error("invalid controller configuration: {0}")]
    Invalid(#[source] SwitchError),
}

/// `[burst]` 表。
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BurstSection {
    /// 突发消息种类；缺省时使用命令行或内置默认值。
    pub kind: Option<MessageKind>,
    /// 任一突发中止时停止进程并以非零状态退出。
    pub exit_on_failure: bool,
    /// 结束指定次数的突发后停止进程。
    pub max_bursts: Option<u64>,
}

/// 完整的配置文件内容。
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// `[controller]` 表。
    pub controller: ControllerConfig,
    /// `[burst]` 表。
    pub burst: BurstSection,
}

impl HarnessConfig {
    /// 解析 TOML 文本并校验控制器参数。
    pub fn from_toml_str(raw: &str) -> Result<Self, HarnessConfigError> {
        let config: Self = toml::from_str(raw)?;
        config
            .controller
            .validate()
            .map_err(HarnessConfigError::Invalid)?;
        Ok(config)
    }

    /// 读取并解析配置文件。
    pub fn load(path: &Path) -> Result<Self, HarnessConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| HarnessConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = HarnessConfig::from_toml_str("").expect("empty file");
        assert_eq!(config, HarnessConfig::default());
        assert_eq!(config.burst.kind, None);
        assert!(!config.burst.exit_on_failure);
    }

    #[test]
    fn both_tables_are_read() {
        let config = HarnessConfig::from_toml_str(
            r#"
            [controller]
            listen = "127.0.0.1:7000"
            send_timeout_ms = 250

            [burst]
            kind = "barrier-request"
            exit_on_failure = true
            max_bursts = 3
            "#,
        )
        .expect("valid file");
        assert_eq!(config.controller.listen.port(), 7000);
        assert_eq!(config.controller.send_timeout_ms, Some(250));
        assert_eq!(config.burst.kind, Some(MessageKind::BarrierRequest));
        assert!(config.burst.exit_on_failure);
        assert_eq!(config.burst.max_bursts, Some(3));
    }

    #[test]
    fn count_is_not_a_file_key() {
        let err = HarnessConfig::from_toml_str("[burst]\ncount = 5").expect_err("unknown key");
        assert!(matches!(err, HarnessConfigError::Parse(_)));
    }

    #[test]
    fn invalid_controller_values_are_rejected() {
        let err = HarnessConfig::from_toml_str("[controller]\nhandshake_timeout_ms = 0")
            .expect_err("zero timeout");
        assert!(matches!(err, HarnessConfigError::Invalid(SwitchError::Config { .. })));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = HarnessConfig::load(Path::new("/nonexistent/spark-burst.toml"))
            .expect_err("missing file");
        assert!(err.to_string().contains("/nonexistent/spark-burst.toml"));
    }
}
