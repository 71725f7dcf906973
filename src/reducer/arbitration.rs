//! ArbitrationManager events.
use super::{normalize_address, Context, Dropped, Outcome};
use crate::{
    entities::{Arbitration, ArbitrationStatus, ArbitrationType, FeeSettlement},
    events::{ArbitrationFeeForfeited, ArbitrationFeeRefunded, ArbitrationRequested, ArbitrationResolved},
};

pub(super) fn requested(cx: &mut Context<'_>, e: &ArbitrationRequested) -> Outcome {
    let arbitration_type = ArbitrationType::from_code(e.arbitration_type).ok_or(Dropped::UnknownCode)?;
    let id = e.arbitration_id.to_string();
    if cx.entities.arbitrations.contains_key(&id) {
        return Err(Dropped::AlreadyExists);
    }

    let requester = cx.touch_user(&e.requester).id.clone();
    let block = cx.block();
    drop(cx.entities.arbitrations.insert(
        id.clone(),
        Arbitration {
            id: id.clone(),
            arbitration_id: id,
            requester,
            arbitration_type,
            target_id: e.target_id.to_string(),
            evidence: e.evidence.clone(),
            fee_amount: e.deposit_amount,
            fee_token: None,
            status: ArbitrationStatus::Pending,
            resolution: None,
            resolved_by: None,
            requested_at: block.timestamp,
            resolved_at: None,
            fee_settlement: None,
            created_block: block.clone(),
            last_block: block,
        },
    ));

    let global = &mut cx.stats.global;
    global.total_arbitrations += 1;
    global.pending_arbitrations += 1;
    cx.stats.touch(cx.meta.block_timestamp);
    Ok(())
}

/// Resolve a pending arbitration. Only the first resolution counts.
pub(super) fn resolved(cx: &mut Context<'_>, e: &ArbitrationResolved) -> Outcome {
    let decision = match ArbitrationStatus::from_code(e.decision) {
        Some(ArbitrationStatus::Pending) => return Err(Dropped::IllegalTransition),
        Some(decision) => decision,
        None => return Err(Dropped::UnknownCode),
    };

    let id = e.arbitration_id.to_string();
    let block = cx.block();
    let arbitration = cx.entities.arbitrations.get_mut(&id).ok_or(Dropped::UnknownEntity)?;
    if arbitration.status != ArbitrationStatus::Pending {
        return Err(Dropped::IllegalTransition);
    }

    arbitration.status = decision;
    arbitration.resolution = Some(e.reason.clone());
    arbitration.resolved_by = Some(normalize_address(&e.resolver));
    arbitration.resolved_at = Some(e.resolved_at);
    arbitration.last_block = block;

    let global = &mut cx.stats.global;
    global.pending_arbitrations = global.pending_arbitrations.saturating_sub(1);
    cx.stats.touch(cx.meta.block_timestamp);
    Ok(())
}

fn settle(cx: &mut Context<'_>, arbitration_id: u64, settlement: FeeSettlement) {
    let block = cx.block();
    if let Some(arbitration) = cx.entities.arbitrations.get_mut(&arbitration_id.to_string()) {
        arbitration.fee_settlement = Some(settlement);
        arbitration.last_block = block;
    }
}

pub(super) fn fee_refunded(cx: &mut Context<'_>, e: &ArbitrationFeeRefunded) -> Outcome {
    let recipient = cx.touch_user(&e.recipient).id.clone();
    settle(
        cx,
        e.arbitration_id,
        FeeSettlement::Refunded {
            recipient,
            amount: e.amount,
        },
    );
    cx.stats.touch(cx.meta.block_timestamp);
    Ok(())
}

pub(super) fn fee_forfeited(cx: &mut Context<'_>, e: &ArbitrationFeeForfeited) -> Outcome {
    let payer = e.payer.as_deref().map(|payer| cx.touch_user(payer).id.clone());
    settle(
        cx,
        e.arbitration_id,
        FeeSettlement::Forfeited {
            payer,
            amount: e.amount,
        },
    );

    let timestamp = cx.timestamp();
    let day = cx.stats.day(timestamp);
    day.total_fees_collected = day.total_fees_collected.saturating_add(e.amount);
    let global = &mut cx.stats.global;
    global.total_fees_collected = global.total_fees_collected.saturating_add(e.amount);
    cx.stats.touch(timestamp);
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{
        entities::{ArbitrationStatus, FeeSettlement},
        events::{ArbitrationFeeForfeited, ArbitrationFeeRefunded, Event},
        reducer::Dropped,
        tests::{arbitration_requested, arbitration_resolved, Harness},
    };

    #[test]
    fn pending_gauge_counts_unresolved() {
        let mut h = Harness::default();
        for id in 1..=4 {
            h.apply(100 + id, arbitration_requested(id, "0xreq")).unwrap();
        }
        h.apply(200, arbitration_resolved(1, 1)).unwrap();
        h.apply(201, arbitration_resolved(3, 3)).unwrap();

        let global = &h.index.stats.global;
        assert_eq!(global.total_arbitrations, 4);
        assert_eq!(global.pending_arbitrations, 2);

        let resolved = &h.index.entities.arbitrations["3"];
        assert_eq!(resolved.status, ArbitrationStatus::Dismissed);
        assert_eq!(resolved.resolved_by.as_deref(), Some("0xjudge"));
        assert!(resolved.resolved_at.is_some());
        assert_eq!(resolved.last_block.timestamp, 201);
    }

    #[test]
    fn second_resolution_is_ignored() {
        let mut h = Harness::default();
        h.apply(100, arbitration_requested(1, "0xreq")).unwrap();
        h.apply(200, arbitration_resolved(1, 2)).unwrap();

        assert_eq!(h.apply(210, arbitration_resolved(1, 1)), Err(Dropped::IllegalTransition));
        assert_eq!(h.index.entities.arbitrations["1"].status, ArbitrationStatus::Rejected);
        assert_eq!(h.index.stats.global.pending_arbitrations, 0);

        assert_eq!(h.apply(220, arbitration_resolved(2, 1)), Err(Dropped::UnknownEntity));
        assert_eq!(h.apply(230, arbitration_resolved(1, 0)), Err(Dropped::IllegalTransition));
        assert_eq!(h.index.stats.global.pending_arbitrations, 0);
    }

    #[test]
    fn fees_settle_against_their_parties() {
        let mut h = Harness::default();
        h.apply(100, arbitration_requested(1, "0xreq")).unwrap();
        h.apply(100, arbitration_requested(2, "0xreq")).unwrap();
        h.apply(
            200,
            Event::ArbitrationFeeRefunded(ArbitrationFeeRefunded {
                arbitration_id: 1,
                recipient: "0xREFUND".to_owned(),
                amount: 5,
            }),
        )
        .unwrap();
        h.apply(
            300,
            Event::ArbitrationFeeForfeited(ArbitrationFeeForfeited {
                arbitration_id: 2,
                payer: Some("0xPayer".to_owned()),
                amount: 7,
            }),
        )
        .unwrap();

        assert!(h.index.entities.users.contains_key("0xrefund"));
        assert!(h.index.entities.users.contains_key("0xpayer"));
        assert!(matches!(
            h.index.entities.arbitrations["1"].fee_settlement,
            Some(FeeSettlement::Refunded { amount: 5, .. })
        ));
        assert_eq!(h.index.stats.global.total_fees_collected, 7);
        assert_eq!(h.index.stats.daily[&0].total_fees_collected, 7);
    }
}
