//! 奖励代理
//!
//! 组装规则表、发放器、路由器与能力解析器，并在启动时打印身份信息。

use std::sync::Arc;
use std::time::Duration;

use reward_shared::config::AppConfig;
use reward_shared::events::AgentIdentity;
use tracing::info;

use crate::dispatcher::RewardDispatcher;
use crate::integration::IntegrationRegistry;
use crate::resolver::{AgentMode, CapabilityResolver};
use crate::router::EventRouter;
use crate::rules::RuleTable;
use crate::simulation::Simulation;

/// 奖励代理
pub struct RewardAgent {
    identity: Arc<AgentIdentity>,
    router: Arc<EventRouter>,
    module_name: String,
    simulation: Simulation,
}

impl RewardAgent {
    /// 根据配置组装代理，身份与规则表之后只读
    pub fn from_config(config: &AppConfig) -> Self {
        let identity = Arc::new(AgentIdentity::from(&config.agent));
        let rules = Arc::new(RuleTable::from_config(&config.rules));
        let router = Arc::new(EventRouter::new(
            rules,
            RewardDispatcher::new(identity.token.clone()),
        ));

        Self {
            identity,
            router,
            module_name: config.integration.module_name.clone(),
            simulation: Simulation::fixed(Duration::from_millis(config.simulation.interval_ms)),
        }
    }

    pub fn identity(&self) -> &AgentIdentity {
        &self.identity
    }

    pub fn router(&self) -> Arc<EventRouter> {
        self.router.clone()
    }

    /// 启动横幅
    pub fn on_start(&self) {
        info!("Reward Agent {} is starting...", self.identity.name);
        info!("{}", self.identity.description);
        info!("Wallet: {}", self.identity.wallet);
        info!("Ready to reward in {}", self.identity.token);
    }

    /// 打印横幅后解析外部集成，返回最终运行模式
    pub async fn start(&self, registry: Arc<IntegrationRegistry>) -> AgentMode {
        self.on_start();

        let mut resolver = CapabilityResolver::new(
            registry,
            self.module_name.clone(),
            self.identity.clone(),
            self.simulation.clone(),
        );
        resolver.run(self.router.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ResolverState;

    #[test]
    fn test_from_config_uses_identity_token() {
        let config = AppConfig::from_toml_str(
            "reward-agent",
            r#"
            [agent]
            token = "TEST"
            "#,
        )
        .unwrap();
        let agent = RewardAgent::from_config(&config);

        assert_eq!(agent.identity().token, "TEST");
        assert_eq!(agent.router().rules(), &RuleTable::builtin());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_without_integration_simulates() {
        let agent = RewardAgent::from_config(&AppConfig::default());
        let mode = agent.start(Arc::new(IntegrationRegistry::new())).await;
        assert_eq!(mode.state(), ResolverState::Simulating);
    }
}
