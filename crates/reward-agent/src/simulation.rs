//! 模拟事件流
//!
//! 没有可用的外部集成时，按固定顺序把三个合成事件送入路由器，
//! 每个事件之前等待固定间隔。模拟事件不携带转账能力，命中规则时只记录日志。

use std::time::Duration;

use chrono::{DateTime, Utc};
use reward_shared::events::EventEnvelope;
use tokio::time::{Instant, sleep};
use tracing::{debug, info};

use crate::router::{EventContext, EventRouter, RouteOutcome};

/// 模拟执行报告
#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// 按处理顺序排列的路由结果
    pub outcomes: Vec<RouteOutcome>,
    /// 每个事件相对模拟开始的路由时刻，与 `outcomes` 一一对应
    pub offsets: Vec<Duration>,
}

impl SimulationReport {
    pub fn rewarded_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, RouteOutcome::Rewarded { .. }))
            .count()
    }
}

/// 固定的模拟事件序列
#[derive(Debug, Clone)]
pub struct Simulation {
    events: Vec<EventEnvelope>,
    interval: Duration,
}

impl Simulation {
    /// 三个固定事件：首次领水、无关事件、日活
    pub fn fixed(interval: Duration) -> Self {
        Self {
            events: vec![
                EventEnvelope::new("faucet_claim:first_time", "0xUserA"),
                EventEnvelope::new("random_event", "0xUserB"),
                EventEnvelope::new("daily_active", "0xUserC"),
            ],
            interval,
        }
    }

    pub fn events(&self) -> &[EventEnvelope] {
        &self.events
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// 逐个处理事件，全部完成后返回
    ///
    /// 事件严格串行处理，没有取消机制。
    pub async fn run(&self, router: &EventRouter) -> SimulationReport {
        let started_at = Utc::now();
        let clock = Instant::now();
        let mut outcomes = Vec::with_capacity(self.events.len());
        let mut offsets = Vec::with_capacity(self.events.len());

        for (index, event) in self.events.iter().enumerate() {
            sleep(self.interval).await;
            debug!(index, "Dispatching simulated event");

            let mut ctx = EventContext::new(event.clone());
            ctx.user = event.user.clone();

            offsets.push(clock.elapsed());
            outcomes.push(router.route(&ctx).await);
        }

        info!("Simulation complete. When you wire the WASP SDK, real rewards can be sent.");

        SimulationReport {
            started_at,
            finished_at: Utc::now(),
            outcomes,
            offsets,
        }
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::fixed(Duration::from_secs(1))
    }
}
