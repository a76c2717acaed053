//! 奖励发放器
//!
//! 通过 `RewardSender` trait 抽象真实转账能力，由外部集成按调用上下文注入。
//! 能力缺失时进入模拟模式，只记录将要执行的转账；能力调用失败时记录错误后
//! 正常返回。发放失败从不中断事件处理，也不重试。

use async_trait::async_trait;
use reward_shared::events::TransferRequest;
use reward_shared::observability::metrics::record_dispatch;
use tracing::{error, info};

use crate::error::TransferError;

/// 转账能力
///
/// 由外部集成提供，代理只调用不持有。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RewardSender: Send + Sync {
    async fn send(&self, request: TransferRequest) -> Result<(), TransferError>;
}

/// 单次发放的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// 转账能力调用成功
    Sent { request: TransferRequest },
    /// 转账能力调用失败，已记录错误
    Failed {
        request: TransferRequest,
        error: TransferError,
    },
    /// 无转账能力，仅记录日志
    Simulated { message: String },
}

impl DispatchOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent { .. })
    }
}

/// 奖励发放器
#[derive(Debug, Clone)]
pub struct RewardDispatcher {
    token: String,
}

impl RewardDispatcher {
    /// `token` 为奖励代币符号，整个进程生命周期内不变
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// 发放奖励
    ///
    /// 每次调用恰好产生一条日志（成功/失败/模拟），至多一次转账尝试。
    pub async fn dispatch(
        &self,
        capability: Option<&dyn RewardSender>,
        recipient: &str,
        amount: u64,
        reason: &str,
    ) -> DispatchOutcome {
        let Some(sender) = capability else {
            let message = simulation_message(amount, &self.token, recipient, reason);
            info!(
                recipient,
                amount,
                token = %self.token,
                "{message}"
            );
            record_dispatch("simulation", "simulated");
            return DispatchOutcome::Simulated { message };
        };

        let request = TransferRequest {
            to: recipient.to_string(),
            amount,
            token: self.token.clone(),
            memo: reason.to_string(),
        };

        match sender.send(request.clone()).await {
            Ok(()) => {
                info!(
                    recipient,
                    amount,
                    token = %self.token,
                    "Sent {} {} to {} — {}",
                    amount,
                    self.token,
                    recipient,
                    reason
                );
                record_dispatch("live", "sent");
                DispatchOutcome::Sent { request }
            }
            Err(e) => {
                error!(
                    recipient,
                    amount,
                    token = %self.token,
                    error = %e,
                    "Failed to send reward"
                );
                record_dispatch("live", "failed");
                DispatchOutcome::Failed { request, error: e }
            }
        }
    }
}

/// 模拟模式下的日志文本
pub fn simulation_message(amount: u64, token: &str, recipient: &str, reason: &str) -> String {
    format!("(SIMULATION) Would send {amount} {token} to {recipient} — {reason}")
}
