//! User profile.
use serde::Serialize;

use super::{degrade, short_address, token::TokenAmount, ReadModel};
use crate::{
    entities::{CategoryScore, User, UserStatus},
    read_model::token::TokenInfo,
};

/// Reputation and category scores are stored with one implied decimal.
const REPUTATION_DIVISOR: i64 = 10;
const SCORE_DIVISOR: i128 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryScoreView {
    pub label: String,
    pub value: i128,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub address: String,
    pub username: String,
    pub reputation: i64,
    pub stake: TokenAmount,
    pub state: UserStatus,
    pub sbt_level: &'static str,
    pub sbt_token_id: Option<String>,
    pub task_count: u64,
    pub submission_count: u64,
    pub review_count: u64,
    pub adopted_submission_count: u64,
    pub category_scores: Vec<CategoryScoreView>,
}

fn stake_token() -> TokenInfo {
    TokenInfo {
        symbol: super::token::NATIVE_SYMBOL.to_owned(),
        decimals: super::token::DEFAULT_DECIMALS,
    }
}

impl Default for UserView {
    fn default() -> Self {
        Self {
            address: String::new(),
            username: String::new(),
            reputation: 0,
            stake: TokenAmount::new(0, &stake_token()),
            state: UserStatus::Uninitialized,
            sbt_level: sbt_level(0),
            sbt_token_id: None,
            task_count: 0,
            submission_count: 0,
            review_count: 0,
            adopted_submission_count: 0,
            category_scores: Vec::new(),
        }
    }
}

/// Tier name for a displayed (already divided) reputation.
pub fn sbt_level(reputation: i64) -> &'static str {
    match reputation {
        800.. => "Atlas III",
        600.. => "Atlas II",
        400.. => "Atlas I",
        1.. => "Explorer",
        _ => "Uninitialized",
    }
}

impl UserView {
    fn new(user: User, scores: Vec<CategoryScore>) -> Self {
        let reputation = user.reputation.div_euclid(REPUTATION_DIVISOR);
        Self {
            username: short_address(&user.id),
            reputation,
            stake: TokenAmount::new(user.staked_amount, &stake_token()),
            state: user.status,
            sbt_level: sbt_level(reputation),
            sbt_token_id: user.sbt_token_id,
            task_count: user.task_count,
            submission_count: user.submission_count,
            review_count: user.review_count,
            adopted_submission_count: user.adopted_submission_count,
            category_scores: scores
                .into_iter()
                .map(|s| CategoryScoreView {
                    label: s.category,
                    value: s.score.div_euclid(SCORE_DIVISOR),
                })
                .collect(),
            address: user.id,
        }
    }
}

impl ReadModel {
    /// The profile at `address`. Unknown users, and failed reads, are the empty profile.
    pub async fn load_user(&self, address: &str) -> UserView {
        let address = address.trim().to_ascii_lowercase();
        if address.is_empty() {
            return UserView::default();
        }

        let Some(user) = degrade("loadUser", self.snapshot.user(&address).await) else {
            return UserView::default();
        };
        let scores = degrade("loadUser category scores", self.snapshot.category_scores(&address).await);
        UserView::new(user, scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        events::{CategoryScoreUpdated, Event, UserInitialized},
        tests::{user_staked, FailingSnapshot, Harness, MockContracts},
    };

    #[test]
    fn levels() {
        assert_eq!(sbt_level(950), "Atlas III");
        assert_eq!(sbt_level(800), "Atlas III");
        assert_eq!(sbt_level(799), "Atlas II");
        assert_eq!(sbt_level(400), "Atlas I");
        assert_eq!(sbt_level(1), "Explorer");
        assert_eq!(sbt_level(0), "Uninitialized");
        assert_eq!(sbt_level(-5), "Uninitialized");
    }

    #[tokio::test]
    async fn profile_scales_scores() {
        let mut h = Harness::default();
        h.apply(
            100,
            Event::UserInitialized(UserInitialized {
                user: "0xAB".to_owned(),
                initial_reputation: 6_505,
            }),
        )
        .unwrap();
        h.apply(110, user_staked("0xab", 2_500_000_000_000_000_000)).unwrap();
        h.apply(
            120,
            Event::CategoryScoreUpdated(CategoryScoreUpdated {
                user: "0xab".to_owned(),
                category: "design".to_owned(),
                new_score: 457,
            }),
        )
        .unwrap();

        let user = h.read_model(MockContracts::default()).load_user("0xAB").await;
        assert_eq!(user.address, "0xab");
        assert_eq!(user.reputation, 650);
        assert_eq!(user.sbt_level, "Atlas II");
        assert_eq!(user.state, UserStatus::Normal);
        assert_eq!(user.stake.display, "2.5 ETH");
        assert_eq!(
            user.category_scores,
            [CategoryScoreView {
                label: "design".to_owned(),
                value: 45
            }]
        );
    }

    #[tokio::test]
    async fn absent_user_is_empty() {
        let h = Harness::default();
        let model = h.read_model(MockContracts::default());
        assert_eq!(model.load_user("0xnobody").await, UserView::default());
        assert_eq!(model.load_user("").await, UserView::default());
        assert_eq!(FailingSnapshot::read_model().load_user("0xab").await, UserView::default());
    }
}
