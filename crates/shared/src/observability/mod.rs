//! 可观测性
//!
//! 进程启动时调用一次 [`init`]：先安装日志订阅器，再按配置决定是否启动指标导出。

pub mod metrics;
pub mod tracing;

use ::tracing::info;
use anyhow::Result;
use std::net::SocketAddr;

use crate::config::ObservabilityConfig;

/// 可观测性资源守卫，需在进程生命周期内持有
pub struct ObservabilityGuard {
    exporter: Option<metrics::MetricsExporter>,
}

impl ObservabilityGuard {
    /// 不持有任何资源的守卫（测试或禁用指标时使用）
    pub fn empty() -> Self {
        Self { exporter: None }
    }

    /// 指标导出服务的实际监听地址，未启用时为 `None`
    pub fn metrics_addr(&self) -> Option<SocketAddr> {
        self.exporter.as_ref().map(metrics::MetricsExporter::local_addr)
    }
}

impl Drop for ObservabilityGuard {
    fn drop(&mut self) {
        info!("Shutting down observability...");
    }
}

/// 初始化日志与指标
///
/// ```ignore
/// let config = AppConfig::load("reward-agent")?;
/// let _guard = observability::init(&config.service_name, &config.observability).await?;
/// ```
pub async fn init(service_name: &str, config: &ObservabilityConfig) -> Result<ObservabilityGuard> {
    tracing::init(config)?;

    info!(
        service = %service_name,
        json_logs = config.json_logs,
        metrics_enabled = config.metrics_enabled,
        "Observability initialized"
    );

    let exporter = if config.metrics_enabled {
        Some(metrics::init(service_name, config.metrics_port).await?)
    } else {
        None
    };

    Ok(ObservabilityGuard { exporter })
}
