//! 奖励代理
//!
//! 接收外部奖励平台（或内置模拟流）的生命周期事件，按固定规则表评估，
//! 命中时通过注入的转账能力发放代币奖励。保活 HTTP 端口让托管平台
//! 认为进程处于运行状态。

pub mod agent;
pub mod dispatcher;
pub mod error;
pub mod integration;
pub mod keepalive;
pub mod resolver;
pub mod router;
pub mod rules;
pub mod simulation;

#[cfg(test)]
mod test_support;
