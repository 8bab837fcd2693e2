//! The two status markers layered over the approval chain.
//!
//! Purchase-executed lives in `not1`, process-completed in `not5`. Both are
//! driven the same way, so each is a [`StatusMarker`] and the workflow runs one
//! generic optimistic set/rollback path over them.
use crate::api::{ApiMessage, PurchaseApi, PurchaseMarkerBody};
use crate::error::{ApiError, ValidationError};
use crate::normalize::{ProcessStatus, PurchaseStatus};
use crate::request::PurchaseRequest;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role-derived permissions, computed by the caller. The workflow only reads
/// them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub satin_alindi_yetkili_mi: bool,
    pub surec_isaret_yetkili_mi: bool,
}

/// What a marker field holds before a write, so it can be put back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerSnapshot<M> {
    pub text: Option<String>,
    pub typed: Option<M>,
}

pub trait StatusMarker: Copy + Eq + fmt::Display + fmt::Debug {
    /// Name used in logs and authorisation errors.
    const ACTION: &'static str;

    fn current(request: &PurchaseRequest) -> Self;
    fn snapshot(request: &PurchaseRequest) -> MarkerSnapshot<Self>;
    fn restore(request: &mut PurchaseRequest, snapshot: MarkerSnapshot<Self>);
    /// Writes the target's canonical text and typed value.
    fn write(self, request: &mut PurchaseRequest);
    fn allowed(caps: &Capabilities) -> bool;
    /// Targets that have an endpoint.
    fn settable(self) -> Result<(), ValidationError>;
    fn send<A: PurchaseApi>(self, api: &A, request: &PurchaseRequest) -> Result<ApiMessage, ApiError>;
}

impl StatusMarker for PurchaseStatus {
    const ACTION: &'static str = "mark purchase executed";

    fn current(request: &PurchaseRequest) -> Self {
        request.purchase_status()
    }
    fn snapshot(request: &PurchaseRequest) -> MarkerSnapshot<Self> {
        MarkerSnapshot {
            text: request.not1.clone(),
            typed: request.satin_alma_durumu,
        }
    }
    fn restore(request: &mut PurchaseRequest, snapshot: MarkerSnapshot<Self>) {
        request.not1 = snapshot.text;
        request.satin_alma_durumu = snapshot.typed;
    }
    fn write(self, request: &mut PurchaseRequest) {
        request.not1 = Some(self.note_text().to_string());
        request.satin_alma_durumu = Some(self);
    }
    fn allowed(caps: &Capabilities) -> bool {
        caps.satin_alindi_yetkili_mi
    }
    fn settable(self) -> Result<(), ValidationError> {
        match self {
            PurchaseStatus::Empty => Err(ValidationError::UnsupportedMarkerTarget("BOS")),
            _ => Ok(()),
        }
    }
    fn send<A: PurchaseApi>(self, api: &A, request: &PurchaseRequest) -> Result<ApiMessage, ApiError> {
        let body = PurchaseMarkerBody {
            not1: self.note_text().to_string(),
        };
        api.mark_purchase(request.id, self, &body)
    }
}

impl StatusMarker for ProcessStatus {
    const ACTION: &'static str = "mark process completed";

    fn current(request: &PurchaseRequest) -> Self {
        request.process_status()
    }
    fn snapshot(request: &PurchaseRequest) -> MarkerSnapshot<Self> {
        MarkerSnapshot {
            text: request.not5.clone(),
            typed: request.surec_durumu,
        }
    }
    fn restore(request: &mut PurchaseRequest, snapshot: MarkerSnapshot<Self>) {
        request.not5 = snapshot.text;
        request.surec_durumu = snapshot.typed;
    }
    fn write(self, request: &mut PurchaseRequest) {
        request.not5 = Some(self.note_text().to_string());
        request.surec_durumu = Some(self);
    }
    fn allowed(caps: &Capabilities) -> bool {
        caps.surec_isaret_yetkili_mi
    }
    fn settable(self) -> Result<(), ValidationError> {
        Ok(())
    }
    fn send<A: PurchaseApi>(self, api: &A, request: &PurchaseRequest) -> Result<ApiMessage, ApiError> {
        api.mark_process(request.id, self == ProcessStatus::Completed)
    }
}

/// Whether the control for `target` should be enabled: the actor holds the
/// capability, the target has an endpoint, and it would change the marker.
pub fn can_set<M: StatusMarker>(request: &PurchaseRequest, caps: &Capabilities, target: M) -> bool {
    M::allowed(caps) && target.settable().is_ok() && M::current(request) != target
}

/// Result of a marker call that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkerOutcome {
    /// Already at the target; nothing was sent.
    Unchanged,
    Updated(ApiMessage),
}
