//! Per-row facts for request list views.
//!
//! Pure and deterministic: the same requests and actor always produce the
//! same rows, so lists can be re-derived on every refresh without caching.
use crate::approval::{ApprovalSummary, ChainState};
use crate::config::OfferConfig;
use crate::normalize::{ProcessStatus, PurchaseStatus};
use crate::offer::RankedOffer;
use crate::request::PurchaseRequest;
use crate::types::{PersonelId, RequestId};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestRow {
    pub id: RequestId,
    pub seri_no: String,
    pub talep_cinsi: String,
    /// The current actor has a pending record on this request.
    pub pending_for_me: bool,
    pub fully_approved: bool,
    pub chain_state: ChainState,
    pub approvals: ApprovalSummary,
    pub purchase_status: PurchaseStatus,
    pub process_status: ProcessStatus,
    pub best_offer: Option<RankedOffer>,
    pub offer_summary: String,
}

pub fn project_row(
    request: &PurchaseRequest,
    current: PersonelId,
    offers: &OfferConfig,
) -> RequestRow {
    let ranked = request.ranked_offers(&offers.default_currency);
    RequestRow {
        id: request.id,
        seri_no: request.seri_no.clone(),
        talep_cinsi: request.talep_cinsi.clone(),
        pending_for_me: request.is_pending_for(current),
        fully_approved: request.is_fully_approved(),
        chain_state: request.chain_state(),
        approvals: request.approval_summary(),
        purchase_status: request.purchase_status(),
        process_status: request.process_status(),
        offer_summary: crate::offer::summarize(
            &ranked,
            offers.summary_limit,
            &offers.summary_separator,
        ),
        best_offer: ranked.into_iter().next(),
    }
}

pub fn project_rows(
    requests: &[PurchaseRequest],
    current: PersonelId,
    offers: &OfferConfig,
) -> Vec<RequestRow> {
    requests
        .iter()
        .map(|r| project_row(r, current, offers))
        .collect()
}

/// Rows still waiting on `current`, for the "awaiting my approval" badge.
pub fn awaiting(rows: &[RequestRow]) -> impl Iterator<Item = &RequestRow> {
    rows.iter().filter(|row| row.pending_for_me)
}
