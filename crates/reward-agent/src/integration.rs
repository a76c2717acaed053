//! 外部集成适配
//!
//! 外部奖励平台的 SDK 形态不固定：可能导出 `Agent` 构造器、默认命名空间下的
//! `Agent`、或 `createAgent` 工厂；实例上可能有 `on`/`start`，也可能由模块
//! 提供 `start(agent)`。这里把每个可选导出建模为返回 `Option` 的能力访问器，
//! 由 [`SdkEventSource::probe`] 按固定顺序探测，收敛成统一的 [`EventSource`]。
//! 顺序为：构造器 -> 实例化 -> 订阅事件 -> 启动入口。
//!
//! 集成通过 [`IntegrationRegistry`] 按约定名称注册，解析器按名称加载。

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::BoxFuture;
use reward_shared::events::AgentIdentity;
use tracing::{debug, info};

use crate::error::AgentError;
use crate::router::EventContext;

/// 事件处理回调
///
/// 外部集成每收到一个事件就以新的上下文调用一次。
pub type EventHandler = Arc<dyn Fn(EventContext) -> BoxFuture<'static, ()> + Send + Sync>;

/// 实例化集成 Agent 的参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentOptions {
    pub name: String,
    pub description: String,
    pub wallet: String,
}

impl From<&AgentIdentity> for AgentOptions {
    fn from(identity: &AgentIdentity) -> Self {
        Self {
            name: identity.name.clone(),
            description: identity.description.clone(),
            wallet: identity.wallet.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// 外部集成需要实现的能力接口
// ---------------------------------------------------------------------------

/// Agent 构造器或工厂
pub trait AgentFactory: Send + Sync {
    fn instantiate(&self, options: &AgentOptions) -> Result<Arc<dyn SdkAgent>, AgentError>;
}

/// 事件订阅能力（`on`）
pub trait EventSubscriber: Send + Sync {
    fn on(&self, event_name: &str, handler: EventHandler) -> Result<(), AgentError>;
}

/// 实例级启动能力（`agent.start()`）
#[async_trait]
pub trait Lifecycle: Send + Sync {
    async fn start(&self) -> Result<(), AgentError>;
}

/// 模块级启动能力（`module.start(agent)`）
#[async_trait]
pub trait ModuleStart: Send + Sync {
    async fn start(&self, agent: Arc<dyn SdkAgent>) -> Result<(), AgentError>;
}

/// 集成 Agent 实例，两项能力均可缺失
pub trait SdkAgent: Send + Sync {
    fn subscriber(&self) -> Option<&dyn EventSubscriber> {
        None
    }

    fn lifecycle(&self) -> Option<&dyn Lifecycle> {
        None
    }
}

/// 已加载的集成模块，所有导出均可缺失
pub trait IntegrationModule: Send + Sync {
    /// 具名导出的 `Agent`
    fn agent(&self) -> Option<Arc<dyn AgentFactory>> {
        None
    }

    /// 默认命名空间下的 `Agent`
    fn default_agent(&self) -> Option<Arc<dyn AgentFactory>> {
        None
    }

    /// `createAgent` 工厂
    fn create_agent(&self) -> Option<Arc<dyn AgentFactory>> {
        None
    }

    fn start(&self) -> Option<Arc<dyn ModuleStart>> {
        None
    }
}

// ---------------------------------------------------------------------------
// IntegrationRegistry — 按名称加载集成模块
// ---------------------------------------------------------------------------

/// 集成模块注册表
pub struct IntegrationRegistry {
    modules: DashMap<String, Arc<dyn IntegrationModule>>,
}

impl IntegrationRegistry {
    pub fn new() -> Self {
        Self {
            modules: DashMap::new(),
        }
    }

    /// 注册集成模块，同名模块会被替换
    pub fn register(&self, name: impl Into<String>, module: Arc<dyn IntegrationModule>) {
        let name = name.into();
        debug!(module = %name, "注册集成模块");
        self.modules.insert(name, module);
    }

    /// 按名称加载集成模块
    pub fn load(&self, name: &str) -> Result<Arc<dyn IntegrationModule>, AgentError> {
        self.modules
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AgentError::ModuleNotFound {
                module: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }
}

impl Default for IntegrationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// EventSource — 解析器面向的统一接口
// ---------------------------------------------------------------------------

/// 外部事件来源
#[async_trait]
pub trait EventSource: Send + Sync {
    /// 注册事件处理回调，来源不支持订阅时返回 `Ok(false)`
    fn subscribe(&self, event_name: &str, handler: EventHandler) -> Result<bool, AgentError>;

    /// 启动来源自身的事件循环，之后由来源驱动事件
    async fn start(&self) -> Result<(), AgentError>;
}

/// 探测结果
pub enum Probe {
    Found(SdkEventSource),
    /// 未导出任何构造器或工厂
    NotFound,
}

/// 启动入口
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartEntry {
    /// 实例自身的 `start()`
    Instance,
    /// 模块导出的 `start(agent)`
    Module,
}

/// 基于集成模块的事件来源
pub struct SdkEventSource {
    module_name: String,
    agent: Arc<dyn SdkAgent>,
    module_start: Option<Arc<dyn ModuleStart>>,
}

impl SdkEventSource {
    /// 查找构造器并实例化
    ///
    /// 构造器顺序：`Agent` -> 默认命名空间 `Agent` -> `createAgent`。
    /// 实例化失败返回错误，未导出构造器返回 [`Probe::NotFound`]。
    /// 启动入口不在此处检查，订阅完成后由 [`start_entry`](Self::start_entry) 解析。
    pub fn probe(
        module_name: &str,
        module: &dyn IntegrationModule,
        identity: &AgentIdentity,
    ) -> Result<Probe, AgentError> {
        let Some(factory) = module
            .agent()
            .or_else(|| module.default_agent())
            .or_else(|| module.create_agent())
        else {
            return Ok(Probe::NotFound);
        };

        let agent = factory.instantiate(&AgentOptions::from(identity))?;
        info!(module = module_name, agent = %identity.name, "Integration agent instantiated");

        Ok(Probe::Found(Self {
            module_name: module_name.to_string(),
            agent,
            module_start: module.start(),
        }))
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    /// 启动入口：实例 `start` 优先，其次模块 `start`，都没有时为 `None`
    pub fn start_entry(&self) -> Option<StartEntry> {
        if self.agent.lifecycle().is_some() {
            Some(StartEntry::Instance)
        } else if self.module_start.is_some() {
            Some(StartEntry::Module)
        } else {
            None
        }
    }
}

#[async_trait]
impl EventSource for SdkEventSource {
    fn subscribe(&self, event_name: &str, handler: EventHandler) -> Result<bool, AgentError> {
        let Some(subscriber) = self.agent.subscriber() else {
            return Ok(false);
        };
        subscriber.on(event_name, handler)?;
        Ok(true)
    }

    async fn start(&self) -> Result<(), AgentError> {
        if let Some(lifecycle) = self.agent.lifecycle() {
            return lifecycle.start().await;
        }
        match &self.module_start {
            Some(module_start) => module_start.start(self.agent.clone()).await,
            None => Err(AgentError::StartNotFound {
                module: self.module_name.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingAgent {
        with_subscriber: bool,
        with_lifecycle: bool,
        subscribed: Mutex<Vec<String>>,
    }

    impl EventSubscriber for RecordingAgent {
        fn on(&self, event_name: &str, _handler: EventHandler) -> Result<(), AgentError> {
            self.subscribed.lock().unwrap().push(event_name.to_string());
            Ok(())
        }
    }

    #[async_trait]
    impl Lifecycle for RecordingAgent {
        async fn start(&self) -> Result<(), AgentError> {
            Ok(())
        }
    }

    impl SdkAgent for RecordingAgent {
        fn subscriber(&self) -> Option<&dyn EventSubscriber> {
            self.with_subscriber.then_some(self as &dyn EventSubscriber)
        }

        fn lifecycle(&self) -> Option<&dyn Lifecycle> {
            self.with_lifecycle.then_some(self as &dyn Lifecycle)
        }
    }

    struct Factory {
        with_subscriber: bool,
        with_lifecycle: bool,
        fail: bool,
        label: &'static str,
        created: Arc<Mutex<Vec<&'static str>>>,
    }

    impl AgentFactory for Factory {
        fn instantiate(&self, options: &AgentOptions) -> Result<Arc<dyn SdkAgent>, AgentError> {
            if self.fail {
                return Err(AgentError::Instantiation("missing api key".to_string()));
            }
            assert_eq!(options.name, "Dani");
            self.created.lock().unwrap().push(self.label);
            Ok(Arc::new(RecordingAgent {
                with_subscriber: self.with_subscriber,
                with_lifecycle: self.with_lifecycle,
                ..Default::default()
            }))
        }
    }

    struct NoopModuleStart;

    #[async_trait]
    impl ModuleStart for NoopModuleStart {
        async fn start(&self, _agent: Arc<dyn SdkAgent>) -> Result<(), AgentError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct TestModule {
        agent: Option<Arc<dyn AgentFactory>>,
        default_agent: Option<Arc<dyn AgentFactory>>,
        create_agent: Option<Arc<dyn AgentFactory>>,
        start: Option<Arc<dyn ModuleStart>>,
    }

    impl IntegrationModule for TestModule {
        fn agent(&self) -> Option<Arc<dyn AgentFactory>> {
            self.agent.clone()
        }

        fn default_agent(&self) -> Option<Arc<dyn AgentFactory>> {
            self.default_agent.clone()
        }

        fn create_agent(&self) -> Option<Arc<dyn AgentFactory>> {
            self.create_agent.clone()
        }

        fn start(&self) -> Option<Arc<dyn ModuleStart>> {
            self.start.clone()
        }
    }

    fn factory(
        label: &'static str,
        with_lifecycle: bool,
        created: &Arc<Mutex<Vec<&'static str>>>,
    ) -> Arc<dyn AgentFactory> {
        Arc::new(Factory {
            with_subscriber: true,
            with_lifecycle,
            fail: false,
            label,
            created: created.clone(),
        })
    }

    #[test]
    fn test_registry_load() {
        let registry = IntegrationRegistry::new();
        assert!(matches!(
            registry.load("@uomi/wasp"),
            Err(AgentError::ModuleNotFound { .. })
        ));

        registry.register("@uomi/wasp", Arc::new(TestModule::default()));
        assert!(registry.contains("@uomi/wasp"));
        assert!(registry.load("@uomi/wasp").is_ok());
    }

    #[test]
    fn test_probe_constructor_order() {
        let created = Arc::new(Mutex::new(Vec::new()));
        let module = TestModule {
            agent: None,
            default_agent: Some(factory("default", true, &created)),
            create_agent: Some(factory("create", true, &created)),
            start: None,
        };

        let probe = SdkEventSource::probe("m", &module, &AgentIdentity::default()).unwrap();
        assert!(matches!(probe, Probe::Found(_)));
        assert_eq!(*created.lock().unwrap(), vec!["default"]);
    }

    #[test]
    fn test_probe_without_constructor() {
        let module = TestModule {
            start: Some(Arc::new(NoopModuleStart)),
            ..Default::default()
        };
        let probe = SdkEventSource::probe("m", &module, &AgentIdentity::default()).unwrap();
        assert!(matches!(probe, Probe::NotFound));
    }

    #[test]
    fn test_start_entry_falls_back_to_module() {
        let created = Arc::new(Mutex::new(Vec::new()));
        let module = TestModule {
            create_agent: Some(factory("create", false, &created)),
            start: Some(Arc::new(NoopModuleStart)),
            ..Default::default()
        };

        let Probe::Found(source) =
            SdkEventSource::probe("m", &module, &AgentIdentity::default()).unwrap()
        else {
            panic!("应探测成功");
        };
        assert_eq!(source.start_entry(), Some(StartEntry::Module));
    }

    #[tokio::test]
    async fn test_source_without_start_entry_still_subscribes() {
        let created = Arc::new(Mutex::new(Vec::new()));
        let module = TestModule {
            agent: Some(factory("agent", false, &created)),
            ..Default::default()
        };

        let Probe::Found(source) =
            SdkEventSource::probe("m", &module, &AgentIdentity::default()).unwrap()
        else {
            panic!("有构造器时应探测成功");
        };
        assert_eq!(source.start_entry(), None);

        let handler: EventHandler = Arc::new(|_ctx: EventContext| async {}.boxed());
        assert!(source.subscribe("daily_active", handler).unwrap());
        assert!(matches!(
            source.start().await,
            Err(AgentError::StartNotFound { ref module }) if module == "m"
        ));
    }

    #[test]
    fn test_probe_instantiation_error() {
        let module = TestModule {
            agent: Some(Arc::new(Factory {
                with_subscriber: false,
                with_lifecycle: true,
                fail: true,
                label: "agent",
                created: Arc::new(Mutex::new(Vec::new())),
            })),
            ..Default::default()
        };
        let result = SdkEventSource::probe("m", &module, &AgentIdentity::default());
        assert!(matches!(result, Err(AgentError::Instantiation(_))));
    }

    #[tokio::test]
    async fn test_source_subscribe_and_start() {
        let created = Arc::new(Mutex::new(Vec::new()));
        let module = TestModule {
            agent: Some(factory("agent", true, &created)),
            ..Default::default()
        };

        let Probe::Found(source) =
            SdkEventSource::probe("m", &module, &AgentIdentity::default()).unwrap()
        else {
            panic!("应探测成功");
        };

        let handler: EventHandler = Arc::new(|_ctx: EventContext| async {}.boxed());
        assert!(source.subscribe("daily_active", handler).unwrap());
        assert_eq!(source.start_entry(), Some(StartEntry::Instance));
        assert_eq!(source.module_name(), "m");
        source.start().await.unwrap();
    }
}
