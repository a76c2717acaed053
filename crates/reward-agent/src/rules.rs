//! 奖励规则表
//!
//! 事件类型到奖励决策的有序映射。按声明顺序精确匹配，首个命中的规则生效；
//! 未命中或事件类型为空时返回不发放。评估无副作用，结果确定。

use reward_shared::config::RuleConfig;
use reward_shared::events::RewardDecision;

/// 单条奖励规则
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardRule {
    /// 命中本规则的事件类型
    pub event_types: Vec<String>,
    pub amount: u64,
    pub reason: String,
}

impl RewardRule {
    pub fn new<I, S>(event_types: I, amount: u64, reason: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            event_types: event_types.into_iter().map(Into::into).collect(),
            amount,
            reason: reason.into(),
        }
    }

    fn matches(&self, event_type: &str) -> bool {
        self.event_types.iter().any(|t| t == event_type)
    }
}

impl From<&RuleConfig> for RewardRule {
    fn from(config: &RuleConfig) -> Self {
        Self {
            event_types: config.event_types.clone(),
            amount: config.amount,
            reason: config.reason.clone(),
        }
    }
}

/// 有序规则表
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleTable {
    rules: Vec<RewardRule>,
}

impl RuleTable {
    pub fn new(rules: Vec<RewardRule>) -> Self {
        Self { rules }
    }

    /// 内置规则表
    ///
    /// | 事件类型 | 数量 | 原因 |
    /// |---|---|---|
    /// | `faucet_claim:first_time` / `first_faucet_claim` | 10 | First faucet claim |
    /// | `daily_active` | 5 | Daily active |
    pub fn builtin() -> Self {
        Self::new(vec![
            RewardRule::new(
                ["faucet_claim:first_time", "first_faucet_claim"],
                10,
                "First faucet claim",
            ),
            RewardRule::new(["daily_active"], 5, "Daily active"),
        ])
    }

    /// 配置了规则时整表替换内置规则，否则使用内置表
    pub fn from_config(rules: &[RuleConfig]) -> Self {
        if rules.is_empty() {
            Self::builtin()
        } else {
            Self::new(rules.iter().map(RewardRule::from).collect())
        }
    }

    /// 评估事件类型，返回奖励决策
    pub fn evaluate(&self, event_type: &str) -> RewardDecision {
        if event_type.is_empty() {
            return RewardDecision::no_reward();
        }

        self.rules
            .iter()
            .find(|rule| rule.matches(event_type))
            .map(|rule| RewardDecision::reward(rule.amount, rule.reason.clone()))
            .unwrap_or_else(RewardDecision::no_reward)
    }

    /// 事件类型是否出现在规则表中
    pub fn contains(&self, event_type: &str) -> bool {
        self.rules.iter().any(|rule| rule.matches(event_type))
    }

    pub fn rules(&self) -> &[RewardRule] {
        &self.rules
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::builtin()
    }
}
