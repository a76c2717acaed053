//! 共享库
//!
//! 奖励代理各组件共用的配置、错误处理、事件模型与可观测性基础设施。

pub mod config;
pub mod error;
pub mod events;
pub mod observability;
