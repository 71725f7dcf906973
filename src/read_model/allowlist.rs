//! Selectable guards, strategies and reward tokens for task creation.
use serde::Serialize;

use super::{degrade, short_address, ReadModel};
use crate::{
    entities::{AllowlistEntry, AllowlistKind},
    reducer::ZERO_ADDRESS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GuardOptionKind {
    Submission,
    Review,
    Global,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyOptionKind {
    Adoption,
    Reward,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardOption {
    pub address: String,
    pub label: String,
    pub kind: GuardOptionKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyOption {
    pub address: String,
    pub label: String,
    pub kind: StrategyOptionKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenOption {
    pub address: String,
    pub label: String,
    pub symbol: String,
    pub decimals: u8,
    pub is_native: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowlistOptions {
    pub guards: Vec<GuardOption>,
    pub submission_guards: Vec<GuardOption>,
    pub review_guards: Vec<GuardOption>,
    pub other_guards: Vec<GuardOption>,
    pub strategies: Vec<StrategyOption>,
    pub tokens: Vec<TokenOption>,
}

fn ids(entries: Vec<AllowlistEntry>) -> Vec<String> {
    entries.into_iter().map(|e| e.id).collect()
}

impl ReadModel {
    fn guard_option(&self, address: String) -> GuardOption {
        let c = &self.contracts;
        let (kind, name) = if address == c.submission_guard {
            (GuardOptionKind::Submission, "Submission guard")
        } else if address == c.review_guard {
            (GuardOptionKind::Review, "Review guard")
        } else if address == c.global_guard {
            (GuardOptionKind::Global, "Global guard")
        } else {
            (GuardOptionKind::Unknown, "Guard")
        };
        GuardOption {
            label: format!("{name} ({})", short_address(&address)),
            address,
            kind,
        }
    }

    fn strategy_option(&self, address: String) -> StrategyOption {
        let c = &self.contracts;
        let (kind, name) = if address == c.simple_adoption_strategy {
            (StrategyOptionKind::Adoption, "Simple adoption")
        } else if address == c.basic_reward_strategy {
            (StrategyOptionKind::Reward, "Basic reward")
        } else {
            (StrategyOptionKind::Unknown, "Strategy")
        };
        StrategyOption {
            label: format!("{name} ({})", short_address(&address)),
            address,
            kind,
        }
    }

    fn token_option(&self, address: String) -> TokenOption {
        let is_native = address == ZERO_ADDRESS;
        let token = self.tokens.get(Some(&address));
        TokenOption {
            label: if is_native {
                token.symbol.clone()
            } else {
                format!("{} ({})", token.symbol, short_address(&address))
            },
            address,
            symbol: token.symbol,
            decimals: token.decimals,
            is_native,
        }
    }

    async fn allowed_ids(&self, kind: AllowlistKind) -> Vec<String> {
        ids(degrade("loadAllowlist", self.snapshot.allowed(kind).await))
    }

    /// Currently allowed addresses, classified. Until the allowlist has been indexed each
    /// list falls back to the well-known deployment addresses.
    pub async fn load_allowlist_options(&self) -> AllowlistOptions {
        let (guards, strategies, tokens) = futures::join!(
            self.allowed_ids(AllowlistKind::Guard),
            self.allowed_ids(AllowlistKind::Strategy),
            self.allowed_ids(AllowlistKind::Token),
        );

        let c = &self.contracts;
        let guards = if guards.is_empty() {
            vec![c.submission_guard.clone(), c.review_guard.clone(), c.global_guard.clone()]
        } else {
            guards
        };
        let strategies = if strategies.is_empty() {
            vec![c.simple_adoption_strategy.clone(), c.basic_reward_strategy.clone()]
        } else {
            strategies
        };
        let tokens = if tokens.is_empty() {
            let mut configured: Vec<String> = self.tokens.addresses().map(str::to_owned).collect();
            configured.sort();
            std::iter::once(ZERO_ADDRESS.to_owned()).chain(configured).collect()
        } else {
            tokens
        };

        let guards: Vec<GuardOption> = guards.into_iter().map(|g| self.guard_option(g)).collect();
        let of_kind = |kind: GuardOptionKind| guards.iter().filter(|g| g.kind == kind).cloned().collect::<Vec<_>>();
        AllowlistOptions {
            submission_guards: of_kind(GuardOptionKind::Submission),
            review_guards: of_kind(GuardOptionKind::Review),
            other_guards: guards
                .iter()
                .filter(|g| !matches!(g.kind, GuardOptionKind::Submission | GuardOptionKind::Review))
                .cloned()
                .collect(),
            strategies: strategies.into_iter().map(|s| self.strategy_option(s)).collect(),
            tokens: tokens.into_iter().map(|t| self.token_option(t)).collect(),
            guards,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        events::{Event, GuardAllowed, GuardDisallowed, TokenAllowed},
        tests::{FailingSnapshot, Harness, MockContracts},
    };

    #[tokio::test]
    async fn falls_back_to_well_known_addresses() {
        let options = Harness::default().read_model(MockContracts::default()).load_allowlist_options().await;

        assert_eq!(options.guards.len(), 3);
        assert_eq!(options.submission_guards.len(), 1);
        assert_eq!(options.review_guards.len(), 1);
        assert_eq!(options.other_guards[0].kind, GuardOptionKind::Global);
        assert_eq!(
            options.strategies.iter().map(|s| s.kind).collect::<Vec<_>>(),
            [StrategyOptionKind::Adoption, StrategyOptionKind::Reward]
        );

        let symbols: Vec<_> = options.tokens.iter().map(|t| t.symbol.as_str()).collect();
        assert_eq!(symbols, ["ETH", "WETH", "USDC"]);
        assert!(options.tokens[0].is_native);
        assert_eq!(options.tokens[0].label, "ETH");
        assert_eq!(options.tokens[2].decimals, 6);
    }

    #[tokio::test]
    async fn indexed_entries_replace_the_fallback() {
        let mut h = Harness::default();
        h.apply(
            10,
            Event::GuardAllowed(GuardAllowed {
                guard: "0x3A0508BBF4ACD261FE3FECB1267BE0FBCCCA6DBA".to_owned(),
            }),
        )
        .unwrap();
        h.apply(
            11,
            Event::GuardAllowed(GuardAllowed {
                guard: "0x1111111111111111111111111111111111111111".to_owned(),
            }),
        )
        .unwrap();
        h.apply(
            12,
            Event::GuardAllowed(GuardAllowed {
                guard: "0x2222222222222222222222222222222222222222".to_owned(),
            }),
        )
        .unwrap();
        h.apply(
            13,
            Event::GuardDisallowed(GuardDisallowed {
                guard: "0x2222222222222222222222222222222222222222".to_owned(),
            }),
        )
        .unwrap();
        h.apply(
            14,
            Event::TokenAllowed(TokenAllowed {
                token: "0x9999999999999999999999999999999999999999".to_owned(),
            }),
        )
        .unwrap();

        let options = h.read_model(MockContracts::default()).load_allowlist_options().await;
        assert_eq!(options.guards.len(), 2);
        assert_eq!(options.review_guards.len(), 1);
        assert!(options.submission_guards.is_empty());
        assert_eq!(options.other_guards[0].kind, GuardOptionKind::Unknown);
        assert_eq!(options.other_guards[0].label, "Guard (0x1111...1111)");

        assert_eq!(options.tokens.len(), 1);
        assert_eq!(options.tokens[0].symbol, "TOKEN");
        assert!(!options.tokens[0].is_native);
        // No strategies indexed yet.
        assert_eq!(options.strategies.len(), 2);
    }

    #[tokio::test]
    async fn failed_snapshot_uses_the_fallback() {
        let options = FailingSnapshot::read_model().load_allowlist_options().await;
        assert_eq!(options.guards.len(), 3);
        assert_eq!(options.tokens.len(), 3);
    }
}
