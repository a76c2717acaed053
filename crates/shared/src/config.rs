//! 配置管理模块
//!
//! 支持多格式配置文件加载，环境变量覆盖，以及类型安全的配置访问。

use config::{Config, ConfigBuilder, Environment, File, FileFormat, builder::DefaultState};
use serde::Deserialize;
use std::path::Path;

use crate::error::{Result, RewardError};

/// 保活 HTTP 服务配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// 代理身份配置
///
/// 进程启动时读取一次，之后钱包地址与代币符号在整个生命周期内不再变化。
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub name: String,
    pub description: String,
    /// 发奖钱包地址
    pub wallet: String,
    /// 奖励代币符号
    pub token: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "Dani".to_string(),
            description: "A Reward Agent that gives UOMI for specific milestones".to_string(),
            wallet: "0x5da08546bff22a41b596424d454eb4191add0035".to_string(),
            token: "UOMI".to_string(),
        }
    }
}

/// 外部集成配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IntegrationConfig {
    /// 外部集成模块的约定名称，解析器按此名称查找
    pub module_name: String,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            module_name: "@uomi/wasp".to_string(),
        }
    }
}

/// 模拟事件流配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// 每个模拟事件之前的等待时间（毫秒）
    pub interval_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self { interval_ms: 1000 }
    }
}

/// 可观测性配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
    /// 是否输出 JSON 结构化日志
    pub json_logs: bool,
    pub metrics_enabled: bool,
    pub metrics_port: u16,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_port: 9090,
        }
    }
}

/// 单条奖励规则配置
///
/// 配置了 `rules` 时整张表替换内置规则表，按声明顺序首个命中生效。
#[derive(Debug, Clone, Deserialize)]
pub struct RuleConfig {
    /// 命中本规则的事件类型（精确匹配）
    pub event_types: Vec<String>,
    pub amount: u64,
    pub reason: String,
}

/// 应用配置
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    pub server: ServerConfig,
    pub agent: AgentConfig,
    pub integration: IntegrationConfig,
    pub simulation: SimulationConfig,
    pub observability: ObservabilityConfig,
    pub rules: Vec<RuleConfig>,
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. config/default.toml（默认配置）
    /// 2. config/{environment}.toml（环境特定配置）
    /// 3. config/{service_name}.toml（服务特定配置）
    /// 4. 环境变量（REWARD_ 前缀，`__` 分隔层级，如 REWARD_AGENT__WALLET -> agent.wallet）
    /// 5. 托管平台约定的 PORT 环境变量
    pub fn load(service_name: &str) -> Result<Self> {
        let env = std::env::var("REWARD_ENV").unwrap_or_else(|_| "development".to_string());
        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

        let builder = Self::base_builder(service_name, &env)?
            .add_source(File::from(Path::new(&config_dir).join("default.toml")).required(false))
            .add_source(
                File::from(Path::new(&config_dir).join(format!("{}.toml", env))).required(false),
            )
            .add_source(
                File::from(Path::new(&config_dir).join(format!("{}.toml", service_name)))
                    .required(false),
            )
            .add_source(
                Environment::with_prefix("REWARD")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut config: Self = builder.build()?.try_deserialize()?;

        if let Some(port) = std::env::var("PORT").ok().as_deref().and_then(parse_port) {
            config.server.port = port;
        }

        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文本加载配置，不读取文件和环境变量
    pub fn from_toml_str(service_name: &str, toml: &str) -> Result<Self> {
        let config: Self = Self::base_builder(service_name, "development")?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    fn base_builder(service_name: &str, env: &str) -> Result<ConfigBuilder<DefaultState>> {
        Ok(Config::builder()
            .set_default("service_name", service_name)?
            .set_default("environment", env)?)
    }

    /// 校验身份与规则配置
    pub fn validate(&self) -> Result<()> {
        if self.agent.wallet.trim().is_empty() {
            return Err(RewardError::InvalidArgument {
                field: "agent.wallet".to_string(),
                message: "钱包地址不能为空".to_string(),
            });
        }
        if self.agent.token.trim().is_empty() {
            return Err(RewardError::InvalidArgument {
                field: "agent.token".to_string(),
                message: "代币符号不能为空".to_string(),
            });
        }
        for (index, rule) in self.rules.iter().enumerate() {
            if rule.event_types.is_empty() {
                return Err(RewardError::Validation(format!(
                    "rules[{index}] 未声明任何事件类型"
                )));
            }
        }
        Ok(())
    }

    /// 获取保活服务地址
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// 解析端口号，非法值视为未配置
fn parse_port(value: &str) -> Option<u16> {
    value.trim().parse().ok()
}
