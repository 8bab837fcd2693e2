use crate::types::{PersonelId, RequestId};

/// Failures caught before any call reaches the backend.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("A note is required for this action")]
    NoteRequired,
    #[error("Personel {0} has no approval record on this request")]
    NotAnApprover(PersonelId),
    #[error("Personel {0} has already decided on this request")]
    AlreadyDecided(PersonelId),
    #[error("Marker cannot be set to {0}")]
    UnsupportedMarkerTarget(&'static str),
    #[error("Request is invalid: {0}")]
    InvalidRequest(String),
}

/// Errors reported by a [`crate::api::PurchaseApi`] implementation.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("Purchase request {0} was not found")]
    NotFound(RequestId),
    #[error("Personel {personel_id} is not an approver of request {request_id}")]
    NotAnApprover {
        request_id: RequestId,
        personel_id: PersonelId,
    },
    #[error("Approval of personel {personel_id} on request {request_id} is already final")]
    AlreadyDecided {
        request_id: RequestId,
        personel_id: PersonelId,
    },
    #[error("Request rejected by backend: {0}")]
    Rejected(String),
    #[error("Transport failure: {0}")]
    Transport(String),
    #[error("Storage failure: {0}")]
    Storage(#[from] sled::Error),
    #[error("Failed to encode record: {0}")]
    Encode(String),
    #[error("Failed to decode record: {0}")]
    Decode(#[from] minicbor::decode::Error),
}

/// Everything a workflow operation can surface to the user. None of these
/// are fatal; the aggregate stays usable for a manual retry.
#[derive(thiserror::Error, Debug)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Not authorised to {0}")]
    Unauthorized(&'static str),
    #[error("Backend call failed: {0}")]
    Remote(#[from] ApiError),
}

impl<E: std::fmt::Display> From<minicbor::encode::Error<E>> for ApiError {
    fn from(value: minicbor::encode::Error<E>) -> Self {
        ApiError::Encode(value.to_string())
    }
}
