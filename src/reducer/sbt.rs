//! HermisSBT events. The SBT mirrors reputation manager state, so these only overwrite.
use super::{Context, Dropped, Outcome};
use crate::{
    entities::{CategoryScore, UserStatus},
    events::{CategoryScoreUpdated, ReputationUpdated, SbtMinted, StakeAmountUpdated},
    store::upsert,
};

pub(super) fn minted(cx: &mut Context<'_>, e: &SbtMinted) -> Outcome {
    cx.touch_user(&e.user).sbt_token_id = Some(e.token_id.clone());
    Ok(())
}

pub(super) fn reputation_updated(cx: &mut Context<'_>, e: &ReputationUpdated) -> Outcome {
    let status = UserStatus::from_code(e.new_status).ok_or(Dropped::UnknownCode)?;
    let user = cx.touch_user(&e.user);
    user.reputation = e.new_reputation;
    user.status = status;
    Ok(())
}

/// Overwrites the absolute score; pending score is left alone.
pub(super) fn category_score_updated(cx: &mut Context<'_>, e: &CategoryScoreUpdated) -> Outcome {
    let timestamp = cx.timestamp();
    let user = cx.touch_user(&e.user).id.clone();

    let id = CategoryScore::id_for(&user, &e.category);
    let score = upsert(&mut cx.entities.category_scores, &id, || {
        CategoryScore::fresh(&user, &e.category)
    });
    score.score = e.new_score;
    score.last_updated_at = timestamp;
    Ok(())
}

pub(super) fn stake_amount_updated(cx: &mut Context<'_>, e: &StakeAmountUpdated) -> Outcome {
    cx.touch_user(&e.user).staked_amount = e.new_stake_amount;
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{
        entities::UserStatus,
        events::{CategoryScoreClaimed, CategoryScoreUpdated, Event, ReputationUpdated, SbtMinted},
        tests::Harness,
    };

    #[test]
    fn score_update_and_claim_touch_different_fields() {
        let mut h = Harness::default();
        h.apply(
            100,
            Event::CategoryScoreClaimed(CategoryScoreClaimed {
                user: "0xa".to_owned(),
                category: "code".to_owned(),
                score_increase: 20,
                new_score: 220,
            }),
        )
        .unwrap();
        h.apply(
            200,
            Event::CategoryScoreUpdated(CategoryScoreUpdated {
                user: "0xa".to_owned(),
                category: "code".to_owned(),
                new_score: 250,
            }),
        )
        .unwrap();

        let score = &h.index.entities.category_scores["0xa_code"];
        assert_eq!(score.score, 250);
        assert_eq!(score.pending_score, -20);
        assert_eq!(score.last_claim_at, 100);
        assert_eq!(score.last_updated_at, 200);
    }

    #[test]
    fn sbt_overwrites_user_state() {
        let mut h = Harness::default();
        h.apply(
            100,
            Event::SbtMinted(SbtMinted {
                user: "0xA".to_owned(),
                token_id: "12".to_owned(),
            }),
        )
        .unwrap();
        h.apply(
            110,
            Event::ReputationUpdated(ReputationUpdated {
                user: "0xa".to_owned(),
                new_reputation: 450,
                new_status: 2,
            }),
        )
        .unwrap();

        let user = &h.index.entities.users["0xa"];
        assert_eq!(user.sbt_token_id.as_deref(), Some("12"));
        assert_eq!(user.reputation, 450);
        assert_eq!(user.status, UserStatus::AtRisk);
    }
}
