//! Arbitration cases.
use serde::Serialize;

use super::{degrade, to_iso, token::TokenAmount, ReadModel};
use crate::{
    entities::{Arbitration, ArbitrationStatus, ArbitrationType},
    query::{ArbitrationQuery, OrderDirection, Page},
};

pub const DEFAULT_CASES: usize = 20;
pub const ALL_STATUSES: [ArbitrationStatus; 4] = [
    ArbitrationStatus::Pending,
    ArbitrationStatus::Approved,
    ArbitrationStatus::Rejected,
    ArbitrationStatus::Dismissed,
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArbitrationCase {
    pub id: String,
    pub arbitration_id: String,
    #[serde(rename = "type")]
    pub arbitration_type: ArbitrationType,
    pub status: ArbitrationStatus,
    pub filed_at: String,
    pub resolved_at: Option<String>,
    pub requester: String,
    pub target_id: String,
    pub fee: TokenAmount,
    pub evidence: Option<String>,
    pub resolution: Option<String>,
}

impl ReadModel {
    fn map_arbitration(&self, a: Arbitration) -> ArbitrationCase {
        let token = self.tokens.get(a.fee_token.as_deref());
        ArbitrationCase {
            fee: TokenAmount::new(a.fee_amount, &token),
            filed_at: to_iso(a.requested_at),
            resolved_at: a.resolved_at.map(to_iso).filter(|s| !s.is_empty()),
            evidence: (!a.evidence.is_empty()).then_some(a.evidence),
            id: a.id,
            arbitration_id: a.arbitration_id,
            arbitration_type: a.arbitration_type,
            status: a.status,
            requester: a.requester,
            target_id: a.target_id,
            resolution: a.resolution,
        }
    }

    /// Newest cases first. An empty status list means every status.
    pub async fn load_arbitrations(&self, first: Option<usize>, statuses: Vec<ArbitrationStatus>) -> Vec<ArbitrationCase> {
        let statuses = if statuses.is_empty() {
            ALL_STATUSES.to_vec()
        } else {
            statuses
        };
        let query = ArbitrationQuery {
            statuses,
            requester: None,
            page: Page::new(Some(first.unwrap_or(DEFAULT_CASES)), Some(OrderDirection::Desc)),
        };

        degrade("loadArbitrations", self.snapshot.arbitrations(&query).await)
            .into_iter()
            .map(|a| self.map_arbitration(a))
            .collect()
    }
}
