//! 事件路由
//!
//! 从事件上下文中解析事件类型与接收者，交给规则表评估，
//! 决策满足发放条件时调用发放器，否则记录无操作日志。路由从不返回错误。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use reward_shared::events::EventEnvelope;
use reward_shared::observability::metrics::{OTHER_EVENT_LABEL, record_event};
use tracing::info;
use uuid::Uuid;

use crate::dispatcher::{DispatchOutcome, RewardDispatcher, RewardSender};
use crate::rules::RuleTable;

/// 单次事件调用的上下文
///
/// 由事件来源（外部集成或模拟流）构造，消费一次后丢弃。
/// `rewards` 为本次调用可用的转账能力，缺失时走模拟发放。
#[derive(Clone)]
pub struct EventContext {
    /// 本地生成的关联 ID（UUID v7），仅用于日志串联
    pub context_id: Uuid,
    pub received_at: DateTime<Utc>,
    pub event: EventEnvelope,
    /// 事件来源给出的兜底用户
    pub user: Option<String>,
    pub rewards: Option<Arc<dyn RewardSender>>,
}

impl EventContext {
    pub fn new(event: EventEnvelope) -> Self {
        Self {
            context_id: Uuid::now_v7(),
            received_at: Utc::now(),
            event,
            user: None,
            rewards: None,
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_rewards(mut self, rewards: Arc<dyn RewardSender>) -> Self {
        self.rewards = Some(rewards);
        self
    }
}

impl std::fmt::Debug for EventContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventContext")
            .field("context_id", &self.context_id)
            .field("received_at", &self.received_at)
            .field("event", &self.event)
            .field("user", &self.user)
            .field("rewards", &self.rewards.is_some())
            .finish()
    }
}

/// 路由结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    NoReward {
        event_type: String,
    },
    Rewarded {
        event_type: String,
        recipient: String,
        amount: u64,
        reason: String,
        dispatch: DispatchOutcome,
    },
}

/// 事件路由器
///
/// 规则表与发放器在启动时构建，之后只读共享。
#[derive(Debug, Clone)]
pub struct EventRouter {
    rules: Arc<RuleTable>,
    dispatcher: RewardDispatcher,
}

impl EventRouter {
    pub fn new(rules: Arc<RuleTable>, dispatcher: RewardDispatcher) -> Self {
        Self { rules, dispatcher }
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// 指标标签：规则表中的类型原样保留，其余归入 `other`
    fn event_label<'a>(&self, event_type: &'a str) -> &'a str {
        if self.rules.contains(event_type) {
            event_type
        } else {
            OTHER_EVENT_LABEL
        }
    }

    /// 处理单个事件
    pub async fn route(&self, ctx: &EventContext) -> RouteOutcome {
        let event_type = ctx.event.resolve_event_type();
        let recipient = ctx.event.resolve_recipient(ctx.user.as_deref());
        let decision = self.rules.evaluate(event_type);
        let label = self.event_label(event_type);

        let (true, Some(amount), Some(reason)) = (
            decision.qualifies(),
            decision.amount,
            decision.reason.as_deref(),
        ) else {
            info!(
                context_id = %ctx.context_id,
                event_type,
                "No reward for event: {}",
                event_type
            );
            record_event(label, "no_reward");
            return RouteOutcome::NoReward {
                event_type: event_type.to_string(),
            };
        };

        info!(
            context_id = %ctx.context_id,
            event_type,
            recipient = %recipient,
            "Condition met: {} (event: {})",
            reason,
            event_type
        );
        record_event(label, "rewarded");

        let dispatch = self
            .dispatcher
            .dispatch(ctx.rewards.as_deref(), &recipient, amount, reason)
            .await;

        RouteOutcome::Rewarded {
            event_type: event_type.to_string(),
            recipient: recipient.into_owned(),
            amount,
            reason: reason.to_string(),
            dispatch,
        }
    }
}
