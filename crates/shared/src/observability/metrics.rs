//! Prometheus 指标
//!
//! 代理只记录三类计数器：事件路由结果、奖励发放结果、解析出的运行模式。
//! 未安装 recorder 时所有记录函数都是空操作，启用后由独立端口暴露 `/metrics`。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

pub const EVENTS_TOTAL: &str = "reward_events_total";
pub const DISPATCH_TOTAL: &str = "reward_dispatch_total";
pub const AGENT_MODE_TOTAL: &str = "reward_agent_mode_total";

/// 规则表之外的事件类型使用的标签值
pub const OTHER_EVENT_LABEL: &str = "other";

static RECORDER: OnceLock<PrometheusHandle> = OnceLock::new();

/// 指标导出服务，Drop 时停止监听
pub struct MetricsExporter {
    local_addr: SocketAddr,
    task: JoinHandle<()>,
}

impl MetricsExporter {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl Drop for MetricsExporter {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// 安装全局 recorder 并在 `port` 上启动导出服务
///
/// 进程内只能安装一次，重复调用返回错误。
pub async fn init(service_name: &str, port: u16) -> Result<MetricsExporter> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = RECORDER.set(handle.clone());

    describe_agent_metrics();
    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);

    let listener = TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], port))).await?;
    let local_addr = listener.local_addr()?;
    info!("Metrics server listening on {}", local_addr);

    let app = Router::new().route("/metrics", get(move || std::future::ready(handle.render())));
    let task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(MetricsExporter { local_addr, task })
}

fn describe_agent_metrics() {
    metrics::describe_counter!(EVENTS_TOTAL, "Events routed through the rule table");
    metrics::describe_counter!(DISPATCH_TOTAL, "Reward dispatch attempts by mode and status");
    metrics::describe_counter!(AGENT_MODE_TOTAL, "Operating mode chosen after capability resolution");
}

/// 当前指标快照（Prometheus 文本格式），未初始化时为 `None`
pub fn render() -> Option<String> {
    RECORDER.get().map(PrometheusHandle::render)
}

/// 记录一次事件路由，`outcome` 为 rewarded 或 no_reward
///
/// `event_type` 由调用方收敛为有限集合（规则表中的类型或 [`OTHER_EVENT_LABEL`]）。
#[inline]
pub fn record_event(event_type: &str, outcome: &str) {
    metrics::counter!(
        EVENTS_TOTAL,
        "event_type" => event_type.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// 记录一次奖励发放
///
/// `mode` 为 live 或 simulation，`status` 为 sent、failed 或 simulated。
#[inline]
pub fn record_dispatch(mode: &str, status: &str) {
    metrics::counter!(
        DISPATCH_TOTAL,
        "mode" => mode.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

#[inline]
pub fn record_agent_mode(mode: &str) {
    metrics::counter!(AGENT_MODE_TOTAL, "mode" => mode.to_string()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_without_recorder() {
        // 未安装 recorder 时记录为空操作
        record_event("daily_active", "rewarded");
        record_event("random_event", "no_reward");
        record_dispatch("simulation", "simulated");
        record_dispatch("live", "failed");
        record_agent_mode("simulating");
    }

    #[test]
    fn test_render_absent_before_init() {
        assert!(render().is_none());
    }
}
