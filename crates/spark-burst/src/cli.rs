//! 命令行定义与参数合并。
//!
//! 优先级：命令行 > 配置文件 > 内置默认值。`COUNT` 只能来自命令行，
//! 非法值由 clap 打印用法后以状态码 2 退出，进程不会进入监听阶段。

use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;
use spark_switch::ControllerConfig;

use crate::{
    config::{HarnessConfig, HarnessConfigError},
    message::MessageKind,
    request::{BurstRequest, ConfigureError},
};

/// Send a burst of identical OpenFlow control messages to every switch that connects.
#[derive(Parser, Debug)]
#[command(name = "spark-burst")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Number of messages to send to each switch once it is ready
    #[arg(value_name = "COUNT", value_parser = BurstRequest::parse)]
    pub count: BurstRequest,

    /// Message kind to repeat [default: set-config]
    #[arg(short, long, value_name = "KIND", value_parser = parse_kind)]
    pub kind: Option<MessageKind>,

    /// Address to listen on for switch connections [default: 0.0.0.0:6653]
    #[arg(short, long, value_name = "ADDR")]
    pub listen: Option<SocketAddr>,

    /// TOML file with [controller] and [burst] tables
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Per-send timeout in milliseconds (no timeout when omitted)
    #[arg(long, value_name = "MS")]
    pub send_timeout_ms: Option<u64>,

    /// Stop and exit with status 1 as soon as one burst aborts
    #[arg(long)]
    pub exit_on_failure: bool,

    /// Stop after this many bursts have finished
    #[arg(long, value_name = "N")]
    pub max_bursts: Option<u64>,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

fn parse_kind(raw: &str) -> Result<MessageKind, ConfigureError> {
    raw.parse()
}

/// 合并后的运行参数。
#[derive(Clone, Debug)]
pub struct Settings {
    /// 控制器参数。
    pub controller: ControllerConfig,
    /// 突发请求。
    pub request: BurstRequest,
    /// 突发中止时是否停机。
    pub exit_on_failure: bool,
    /// 结束多少次突发后停机。
    pub max_bursts: Option<u64>,
}

impl Cli {
    /// 读取 `--config` 指定的文件（若有）并与命令行合并。
    pub fn settings(&self) -> Result<Settings, HarnessConfigError> {
        let file = match &self.config {
            Some(path) => HarnessConfig::load(path)?,
            None => HarnessConfig::default(),
        };
        self.resolve(file)
    }

    /// 以命令行覆盖配置文件内容。
    ///
    /// - **契约 (What)**：布尔开关取“任一方打开即打开”；可选值命令行优先；
    ///   合并后的控制器参数重新校验一次。
    pub fn resolve(&self, file: HarnessConfig) -> Result<Settings, HarnessConfigError> {
        let HarnessConfig {
            mut controller,
            burst,
        } = file;
        if let Some(listen) = self.listen {
            controller.listen = listen;
        }
        if self.send_timeout_ms.is_some() {
            controller.send_timeout_ms = self.send_timeout_ms;
        }
        controller.validate().map_err(HarnessConfigError::Invalid)?;

        let kind = self.kind.or(burst.kind).unwrap_or_default();
        Ok(Settings {
            controller,
            request: self.count.with_kind(kind),
            exit_on_failure: self.exit_on_failure || burst.exit_on_failure,
            max_bursts: self.max_bursts.or(burst.max_bursts),
        })
    }

    /// `RUST_LOG` 未设置时使用的过滤指令。
    pub fn default_filter(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
