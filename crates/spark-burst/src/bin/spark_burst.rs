use std::{process::ExitCode, sync::Arc};

use anyhow::Context;
use clap::Parser;
use spark_burst::{BurstController, BurstHarness, cli::Cli};
use spark_switch::Controller;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.default_filter());

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("spark-burst: failed to start runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(serve(cli)) {
        Ok(true) => ExitCode::FAILURE,
        Ok(false) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("spark-burst: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// 运行控制器直至停机；返回值表示是否因突发失败而停止。
async fn serve(cli: Cli) -> anyhow::Result<bool> {
    let settings = cli.settings().context("loading configuration")?;
    let controller = Controller::new(settings.controller).context("configuring controller")?;
    let shutdown = controller.shutdown_token();

    let harness = Arc::new(
        BurstHarness::new(BurstController::new(settings.request), controller.sender())
            .with_shutdown(shutdown.clone())
            .exit_on_failure(settings.exit_on_failure)
            .max_bursts(settings.max_bursts),
    );

    let bound = controller.bind().await.context("binding listener")?;
    info!(
        listen = %bound.local_addr(),
        count = settings.request.count(),
        kind = %settings.request.kind(),
        "spark-burst ready"
    );

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(err) = result {
                    warn!(error = %err, "failed to listen for ctrl-c");
                    return;
                }
                info!("ctrl-c received, shutting down");
                signal_shutdown.shutdown();
            }
            _ = signal_shutdown.wait() => {}
        }
    });

    bound.run(harness.clone()).await.context("controller stopped")?;
    Ok(harness.stopped_on_failure())
}
