//! 奖励代理服务
//!
//! 启动保活端口，解析外部集成或运行模拟事件流，之后保持运行直到收到关闭信号。

use std::sync::Arc;

use reward_agent::agent::RewardAgent;
use reward_agent::integration::IntegrationRegistry;
use reward_agent::keepalive;
use reward_shared::config::AppConfig;
use reward_shared::observability;
use tracing::{error, info};

const SERVICE_NAME: &str = "reward-agent";

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Agent failed: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let config = AppConfig::load(SERVICE_NAME)?;
    let _guard = observability::init(&config.service_name, &config.observability).await?;

    let listener = keepalive::bind(&config.server_addr()).await?;
    let server = tokio::spawn(keepalive::serve(
        listener,
        keepalive::routes(&config.agent.name),
        shutdown_signal(),
    ));

    let agent = RewardAgent::from_config(&config);
    let mode = agent.start(Arc::new(IntegrationRegistry::new())).await;
    info!(state = ?mode.state(), "Agent startup complete");

    server.await??;
    Ok(())
}

/// 等待 Ctrl+C 或 SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping keepalive server...");
}
