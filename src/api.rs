//! Contract with the back-office REST API.
//!
//! Transport framing belongs to the implementation. The workflow only needs
//! these calls, each a single request awaited to completion.
use crate::approval::Decision;
use crate::error::ApiError;
use crate::normalize::PurchaseStatus;
use crate::request::{ApprovalRecord, PurchaseRequest};
use crate::types::{PersonelId, RequestId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimal acknowledgement every mutating endpoint returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiMessage {
    #[serde(rename = "Message", alias = "message", default)]
    pub message: String,
}

/// Reply to a decision: the message plus the record as the backend now holds it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionResponse {
    #[serde(rename = "Message", alias = "message", default)]
    pub message: String,
    #[serde(alias = "Record")]
    pub record: ApprovalRecord,
}

/// Body of the purchase-executed marker calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseMarkerBody {
    pub not1: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Fetch(RequestId),
    Decide(RequestId, Decision),
    Purchased(RequestId),
    NotPurchased(RequestId),
    ProcessCompleted(RequestId),
    ProcessReopened(RequestId),
}

impl Endpoint {
    pub fn path(&self) -> String {
        match self {
            Endpoint::Fetch(id) => format!("satinalma/teklifler/{id}"),
            Endpoint::Decide(id, Decision::Approve) => format!("satinalma/onay/{id}/onayla"),
            Endpoint::Decide(id, Decision::Reject) => format!("satinalma/onay/{id}/reddet"),
            Endpoint::Decide(id, Decision::Comment) => format!("satinalma/onay/{id}/yorum"),
            Endpoint::Purchased(id) => format!("satinalma/isaret/satin-alindi/{id}"),
            Endpoint::NotPurchased(id) => format!("satinalma/isaret/satin-alinmadi/{id}"),
            Endpoint::ProcessCompleted(id) => format!("satinalma/isaret/surec-tamamlandi/{id}"),
            Endpoint::ProcessReopened(id) => {
                format!("satinalma/isaret/surec-tamamlandi-kaldir/{id}")
            }
        }
    }

    pub fn method(&self) -> &'static str {
        match self {
            Endpoint::Fetch(_) => "GET",
            _ => "POST",
        }
    }

    /// Marker endpoint for a purchase target; `Empty` has none.
    pub fn for_purchase(id: RequestId, target: PurchaseStatus) -> Option<Self> {
        match target {
            PurchaseStatus::Purchased => Some(Endpoint::Purchased(id)),
            PurchaseStatus::NotPurchased => Some(Endpoint::NotPurchased(id)),
            PurchaseStatus::Empty => None,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method(), self.path())
    }
}

pub trait PurchaseApi {
    /// `GET satinalma/teklifler/{id}` with the approval chain and offers nested.
    fn fetch_request(&self, id: RequestId) -> Result<PurchaseRequest, ApiError>;

    fn submit_decision(
        &self,
        id: RequestId,
        personel_id: PersonelId,
        decision: Decision,
        note: &str,
    ) -> Result<DecisionResponse, ApiError>;

    /// `satin-alindi` / `satin-alinmadi`. Must be idempotent.
    fn mark_purchase(
        &self,
        id: RequestId,
        target: PurchaseStatus,
        body: &PurchaseMarkerBody,
    ) -> Result<ApiMessage, ApiError>;

    /// `surec-tamamlandi` when `completed`, else `surec-tamamlandi-kaldir`.
    fn mark_process(&self, id: RequestId, completed: bool) -> Result<ApiMessage, ApiError>;
}

impl<T: PurchaseApi + ?Sized> PurchaseApi for &T {
    fn fetch_request(&self, id: RequestId) -> Result<PurchaseRequest, ApiError> {
        (**self).fetch_request(id)
    }
    fn submit_decision(
        &self,
        id: RequestId,
        personel_id: PersonelId,
        decision: Decision,
        note: &str,
    ) -> Result<DecisionResponse, ApiError> {
        (**self).submit_decision(id, personel_id, decision, note)
    }
    fn mark_purchase(
        &self,
        id: RequestId,
        target: PurchaseStatus,
        body: &PurchaseMarkerBody,
    ) -> Result<ApiMessage, ApiError> {
        (**self).mark_purchase(id, target, body)
    }
    fn mark_process(&self, id: RequestId, completed: bool) -> Result<ApiMessage, ApiError> {
        (**self).mark_process(id, completed)
    }
}
