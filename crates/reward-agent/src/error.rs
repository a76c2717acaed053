//! 奖励代理专用错误类型
//!
//! 在共享库 RewardError 基础上定义本服务特有的错误变体，
//! 区分"集成解析失败/事件订阅失败/启动失败/转账失败"等原因。

use reward_shared::error::RewardError;

/// 代理错误
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// 注册表中没有该名称的集成模块
    #[error("集成模块未找到: {module}")]
    ModuleNotFound { module: String },

    /// 模块存在但未导出任何 Agent 构造器或工厂
    #[error("集成模块未导出 Agent 构造器: {module}")]
    ConstructorNotFound { module: String },

    /// 实例与模块上都没有 start 入口
    #[error("集成模块缺少 start 入口: {module}")]
    StartNotFound { module: String },

    #[error("集成 Agent 实例化失败: {0}")]
    Instantiation(String),

    #[error("事件订阅失败: {0}")]
    Subscription(String),

    #[error("集成 Agent 启动失败: {0}")]
    Start(String),

    /// 保活端口绑定或服务运行失败
    #[error("保活服务错误: {0}")]
    Keepalive(#[from] std::io::Error),

    #[error(transparent)]
    Shared(#[from] RewardError),
}

/// 转账能力返回的错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferError {
    /// 对端明确拒绝（余额不足、地址非法等）
    #[error("转账被拒绝: {0}")]
    Rejected(String),

    #[error("转账服务不可用: {0}")]
    Unavailable(String),

    #[error("转账失败: {0}")]
    Other(String),
}
