//! 能力解析器
//!
//! 启动时按约定名称查找外部集成，能适配则交出事件驱动权，否则运行模拟事件流。
//!
//! 状态流转：`Resolving -> SdkActive | Simulating`，两个终态都不会再回退。
//! 解析阶段的任何失败（模块缺失、构造器缺失、start 缺失、实例化或启动报错）
//! 都在本地记录后降级为模拟模式，不向调用方传播。

use std::sync::Arc;

use futures::FutureExt;
use reward_shared::events::AgentIdentity;
use reward_shared::observability::metrics::record_agent_mode;
use tracing::{error, info};

use crate::error::AgentError;
use crate::integration::{EventHandler, EventSource, IntegrationRegistry, Probe, SdkEventSource};
use crate::router::{EventContext, EventRouter};
use crate::simulation::{Simulation, SimulationReport};

/// 向外部集成订阅的事件名，`*` 为通配
pub const SUBSCRIBED_EVENTS: [&str; 3] = ["faucet_claim:first_time", "daily_active", "*"];

/// 解析器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverState {
    Resolving,
    SdkActive,
    Simulating,
}

/// 解析完成后的运行模式
#[derive(Debug, Clone)]
pub enum AgentMode {
    /// 事件由外部集成驱动
    SdkActive { module: String },
    /// 模拟事件流已跑完
    Simulating(SimulationReport),
}

impl AgentMode {
    pub fn state(&self) -> ResolverState {
        match self {
            Self::SdkActive { .. } => ResolverState::SdkActive,
            Self::Simulating(_) => ResolverState::Simulating,
        }
    }
}

/// 能力解析器
pub struct CapabilityResolver {
    registry: Arc<IntegrationRegistry>,
    module_name: String,
    identity: Arc<AgentIdentity>,
    simulation: Simulation,
    state: ResolverState,
}

impl CapabilityResolver {
    pub fn new(
        registry: Arc<IntegrationRegistry>,
        module_name: impl Into<String>,
        identity: Arc<AgentIdentity>,
        simulation: Simulation,
    ) -> Self {
        Self {
            registry,
            module_name: module_name.into(),
            identity,
            simulation,
            state: ResolverState::Resolving,
        }
    }

    pub fn state(&self) -> ResolverState {
        self.state
    }

    /// 执行解析
    ///
    /// 集成启动成功后立即返回 `SdkActive`，模拟模式下等模拟事件全部处理完再返回。
    pub async fn run(&mut self, router: Arc<EventRouter>) -> AgentMode {
        let mode = match self.activate_integration(&router).await {
            Ok(()) => {
                info!(module = %self.module_name, "Integration agent started");
                AgentMode::SdkActive {
                    module: self.module_name.clone(),
                }
            }
            Err(e) => {
                self.log_degradation(&e);
                AgentMode::Simulating(self.simulation.run(&router).await)
            }
        };

        self.state = mode.state();
        record_agent_mode(match self.state {
            ResolverState::SdkActive => "sdk_active",
            _ => "simulating",
        });
        mode
    }

    async fn activate_integration(&self, router: &Arc<EventRouter>) -> Result<(), AgentError> {
        let module = self.registry.load(&self.module_name)?;
        info!(module = %self.module_name, "Integration module loaded. Will attempt to initialize agent.");

        let Probe::Found(source) =
            SdkEventSource::probe(&self.module_name, module.as_ref(), &self.identity)?
        else {
            return Err(AgentError::ConstructorNotFound {
                module: self.module_name.clone(),
            });
        };

        // 先注册处理器，再查找启动入口
        subscribe_router(&source, router)?;
        source.start().await
    }

    fn log_degradation(&self, err: &AgentError) {
        match err {
            AgentError::ModuleNotFound { module } => info!(
                module = %module,
                "Integration module not installed — running in simulation mode"
            ),
            AgentError::ConstructorNotFound { module } => info!(
                module = %module,
                "Integration module present but Agent constructor not detected. Running simulation."
            ),
            AgentError::StartNotFound { module } => info!(
                module = %module,
                "Integration loaded but no start() found — falling back to simulation."
            ),
            e => error!(
                module = %self.module_name,
                error = %e,
                "Error initializing integration, falling back to simulation"
            ),
        }
    }
}

/// 把路由器注册为已知事件与通配事件的处理器
///
/// 来源不支持订阅时跳过，不视为错误。
pub fn subscribe_router(
    source: &dyn EventSource,
    router: &Arc<EventRouter>,
) -> Result<(), AgentError> {
    for event_name in SUBSCRIBED_EVENTS {
        if !source.subscribe(event_name, route_handler(router.clone()))? {
            info!("Event source exposes no subscription; handlers not registered");
            return Ok(());
        }
    }
    Ok(())
}

/// 把路由器包装成事件处理回调
pub fn route_handler(router: Arc<EventRouter>) -> EventHandler {
    Arc::new(move |ctx: EventContext| {
        let router = router.clone();
        async move {
            router.route(&ctx).await;
        }
        .boxed()
    })
}
