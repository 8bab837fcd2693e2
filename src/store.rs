//! sled-backed backend that plays the authoritative API.
//!
//! Aggregates are stored as CBOR under `satinalma/{id}`. Every mutation is a
//! read-modify-write of the whole aggregate inside a sled transaction, so
//! concurrent callers on the same request never drop each other's writes.
use crate::api::{ApiMessage, DecisionResponse, Endpoint, PurchaseApi, PurchaseMarkerBody};
use crate::approval::Decision;
use crate::error::{ApiError, ValidationError};
use crate::normalize::{ProcessStatus, PurchaseStatus};
use crate::request::{PurchaseRequest, RequestDraft};
use crate::types::{PersonelId, Person, RequestId, TimeStamp};
use crate::utils;
use anyhow::Context;
use sled::Batch;
use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionError,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

const KEY_PREFIX: &str = "satinalma/";
const SHARE_HRP: &str = "share";

pub struct SledStore {
    instance: Arc<sled::Db>,
}

fn key(id: RequestId) -> String {
    format!("{KEY_PREFIX}{:020}", id.0)
}

impl SledStore {
    pub fn new(instance: Arc<sled::Db>) -> Self {
        Self { instance }
    }

    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let db = sled::open(path)
            .with_context(|| format!("failed to open store at {}", path.display()))?;
        info!(path = %path.display(), "opened purchase request store");
        Ok(Self::new(Arc::new(db)))
    }

    fn load(&self, id: RequestId) -> Result<PurchaseRequest, ApiError> {
        let bytes = self
            .instance
            .get(key(id).as_bytes())?
            .ok_or(ApiError::NotFound(id))?;
        Ok(minicbor::decode(&bytes)?)
    }

    /// Atomically loads, mutates and stores one aggregate. `mutate` may run
    /// more than once when the transaction conflicts, so it must not have side
    /// effects outside the request. Unchanged aggregates are not rewritten.
    fn update<T>(
        &self,
        id: RequestId,
        mutate: impl Fn(&mut PurchaseRequest) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        let entry = key(id);
        self.instance
            .transaction(|tx| -> ConflictableTransactionResult<T, ApiError> {
                let bytes = tx
                    .get(entry.as_bytes())?
                    .ok_or(ConflictableTransactionError::Abort(ApiError::NotFound(id)))?;
                let mut request: PurchaseRequest = minicbor::decode(&bytes)
                    .map_err(|e| ConflictableTransactionError::Abort(ApiError::from(e)))?;

                let out = mutate(&mut request).map_err(ConflictableTransactionError::Abort)?;

                let cbor = minicbor::to_vec(&request)
                    .map_err(|e| ConflictableTransactionError::Abort(ApiError::from(e)))?;
                if &*bytes != cbor.as_slice() {
                    tx.insert(entry.as_bytes(), cbor)?;
                }
                Ok(out)
            })
            .map_err(|e| match e {
                TransactionError::Abort(e) => e,
                TransactionError::Storage(e) => ApiError::Storage(e),
            })
    }

    // sled ids start at 0; ours start at 1
    fn next_id(&self) -> Result<u64, ApiError> {
        Ok(self.instance.generate_id()? + 1)
    }

    /// Server-side creation: one pending record per approver, `sira` following
    /// the order given.
    pub fn create_request(
        &self,
        draft: RequestDraft,
        approvers: &[Person],
    ) -> Result<PurchaseRequest, StoreError> {
        let id = RequestId(self.next_id()?);
        let mut request = draft.validate_and_finalise(id, approvers)?;
        for record in request.onaylayan_personeller.iter_mut() {
            record.id = self.next_id()?;
        }

        let mut batch = Batch::default();
        batch.insert(key(id).as_bytes(), minicbor::to_vec(&request).map_err(ApiError::from)?);
        self.instance.apply_batch(batch)?;

        info!(
            request_id = %id,
            approvers = request.onaylayan_personeller.len(),
            "purchase request created"
        );
        Ok(request)
    }

    /// Issues the share token once; later calls return the same token.
    pub fn issue_public_token(&self, id: RequestId) -> Result<String, StoreError> {
        let fresh = utils::new_uuid_to_bech32(SHARE_HRP).map_err(StoreError::Token)?;
        let token = self.update(id, |request| {
            match request.public_token.as_deref().filter(|t| !t.is_empty()) {
                Some(existing) => Ok(existing.to_string()),
                None => {
                    request.public_token = Some(fresh.clone());
                    Ok(fresh.clone())
                }
            }
        })?;
        debug!(request_id = %id, issued = token == fresh, "public token");
        Ok(token)
    }

    pub fn attach_invoice(&self, id: RequestId, url: &str) -> Result<(), ApiError> {
        let url = url.trim();
        self.update(id, |request| {
            request.not2 = Some(url.to_string());
            Ok(())
        })
    }

    /// Every stored request, ordered by id.
    pub fn list_requests(&self) -> Result<Vec<PurchaseRequest>, ApiError> {
        self.instance
            .scan_prefix(KEY_PREFIX.as_bytes())
            .values()
            .map(|bytes| -> Result<PurchaseRequest, ApiError> {
                Ok(minicbor::decode(&bytes?)?)
            })
            .collect()
    }
}

/// Errors of the store-only operations that sit outside the API contract.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("failed to issue token: {0}")]
    Token(anyhow::Error),
}

impl From<sled::Error> for StoreError {
    fn from(value: sled::Error) -> Self {
        StoreError::Api(ApiError::Storage(value))
    }
}

impl PurchaseApi for SledStore {
    fn fetch_request(&self, id: RequestId) -> Result<PurchaseRequest, ApiError> {
        debug!(endpoint = %Endpoint::Fetch(id), "fetch");
        self.load(id)
    }

    fn submit_decision(
        &self,
        id: RequestId,
        personel_id: PersonelId,
        decision: Decision,
        note: &str,
    ) -> Result<DecisionResponse, ApiError> {
        let at = TimeStamp::new();
        let record = self.update(id, |request| {
            let record = request
                .record_for_mut(personel_id)
                .ok_or(ApiError::NotAnApprover {
                    request_id: id,
                    personel_id,
                })?;
            record.apply(id, decision, note, at.clone())?;
            Ok(record.clone())
        })?;

        info!(
            endpoint = %Endpoint::Decide(id, decision),
            personel_id = %personel_id,
            %decision,
            "decision stored"
        );
        Ok(DecisionResponse {
            message: match decision {
                Decision::Approve => "Talep onaylandı".into(),
                Decision::Reject => "Talep reddedildi".into(),
                Decision::Comment => "Not kaydedildi".into(),
            },
            record,
        })
    }

    fn mark_purchase(
        &self,
        id: RequestId,
        target: PurchaseStatus,
        body: &PurchaseMarkerBody,
    ) -> Result<ApiMessage, ApiError> {
        let endpoint = Endpoint::for_purchase(id, target).ok_or_else(|| {
            ApiError::Rejected("purchase marker can only be set, not cleared".into())
        })?;
        let text = match body.not1.trim() {
            "" => target.note_text(),
            given => given,
        };
        self.update(id, |request| {
            request.not1 = Some(text.to_string());
            request.satin_alma_durumu = Some(target);
            Ok(())
        })?;

        info!(endpoint = %endpoint, marker = %target, "purchase marker stored");
        Ok(ApiMessage {
            message: "Satın alma durumu güncellendi".into(),
        })
    }

    fn mark_process(&self, id: RequestId, completed: bool) -> Result<ApiMessage, ApiError> {
        let (endpoint, target) = if completed {
            (Endpoint::ProcessCompleted(id), ProcessStatus::Completed)
        } else {
            (Endpoint::ProcessReopened(id), ProcessStatus::Empty)
        };
        self.update(id, |request| {
            request.not5 = Some(target.note_text().to_string());
            request.surec_durumu = Some(target);
            Ok(())
        })?;

        info!(endpoint = %endpoint, marker = %target, "process marker stored");
        Ok(ApiMessage {
            message: "Süreç durumu güncellendi".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open_store() -> (tempfile::TempDir, SledStore) {
        let dir = tempdir().unwrap();
        let store = SledStore::open(dir.path().join("store.db")).unwrap();
        (dir, store)
    }

    fn draft() -> RequestDraft {
        RequestDraft::new()
            .set_talep_cinsi("Temizlik malzemesi")
            .set_talep_eden(Person::new(PersonelId(1), "Ali", "Kaya"))
    }

    #[test]
    fn ids_are_unique_and_one_based() {
        let (_dir, store) = open_store();
        let approvers = [Person::new(PersonelId(2), "Can", "Ak")];

        let a = store.create_request(draft(), &approvers).unwrap();
        let b = store.create_request(draft(), &approvers).unwrap();

        assert!(a.id.0 >= 1);
        assert_ne!(a.id, b.id);
        assert_ne!(a.onaylayan_personeller[0].id, b.onaylayan_personeller[0].id);
        assert_eq!(store.list_requests().unwrap().len(), 2);
    }

    #[test]
    fn missing_request_is_not_found() {
        let (_dir, store) = open_store();
        assert!(matches!(
            store.fetch_request(RequestId(404)),
            Err(ApiError::NotFound(RequestId(404)))
        ));
    }

    #[test]
    fn public_token_is_issued_once() {
        let (_dir, store) = open_store();
        let request = store
            .create_request(draft(), &[Person::new(PersonelId(2), "Can", "Ak")])
            .unwrap();

        let first = store.issue_public_token(request.id).unwrap();
        let second = store.issue_public_token(request.id).unwrap();

        assert!(first.starts_with("share1"));
        assert_eq!(first, second);
    }

    #[test]
    fn repeated_marks_leave_aggregate_unchanged() {
        let (_dir, store) = open_store();
        let request = store
            .create_request(draft(), &[Person::new(PersonelId(2), "Can", "Ak")])
            .unwrap();
        let body = PurchaseMarkerBody {
            not1: PurchaseStatus::Purchased.note_text().into(),
        };

        store
            .mark_purchase(request.id, PurchaseStatus::Purchased, &body)
            .unwrap();
        let once = store.fetch_request(request.id).unwrap();
        store
            .mark_purchase(request.id, PurchaseStatus::Purchased, &body)
            .unwrap();
        let twice = store.fetch_request(request.id).unwrap();

        assert_eq!(once, twice);
        assert_eq!(twice.purchase_status(), PurchaseStatus::Purchased);
    }
}
