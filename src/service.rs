//! Client-side workflow for one purchase request.
//!
//! Holds the aggregate as last seen from the backend and runs the actor's
//! actions against it: approval decisions and the two status markers. Every
//! successful mutation is followed by a full re-fetch; the backend is the
//! only authority on final state.
use crate::api::PurchaseApi;
use crate::approval::Decision;
use crate::error::{ValidationError, WorkflowError};
use crate::markers::{Capabilities, MarkerOutcome, StatusMarker, can_set};
use crate::normalize::{ProcessStatus, PurchaseStatus};
use crate::request::PurchaseRequest;
use crate::types::{PersonelId, RequestId};
use tracing::{debug, info, warn};

/// The person operating the workflow and what their role allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub personel_id: PersonelId,
    pub capabilities: Capabilities,
}

impl Actor {
    pub fn new(personel_id: PersonelId, capabilities: Capabilities) -> Self {
        Self {
            personel_id,
            capabilities,
        }
    }
}

type RefreshHook = Box<dyn FnMut(&PurchaseRequest)>;

pub struct PurchaseWorkflow<A: PurchaseApi> {
    api: A,
    actor: Actor,
    request: PurchaseRequest,
    on_refresh: Option<RefreshHook>,
}

impl<A: PurchaseApi> PurchaseWorkflow<A> {
    /// Fetches the aggregate and binds it to `actor`.
    pub fn load(api: A, id: RequestId, actor: Actor) -> Result<Self, WorkflowError> {
        let request = api.fetch_request(id)?;
        Ok(Self::new(api, request, actor))
    }

    pub fn new(api: A, request: PurchaseRequest, actor: Actor) -> Self {
        Self {
            api,
            actor,
            request,
            on_refresh: None,
        }
    }

    /// Called after every reconciled mutation, e.g. to re-render dependent views.
    pub fn on_refresh(mut self, hook: impl FnMut(&PurchaseRequest) + 'static) -> Self {
        self.on_refresh = Some(Box::new(hook));
        self
    }

    pub fn request(&self) -> &PurchaseRequest {
        &self.request
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn is_pending_for_me(&self) -> bool {
        self.request.is_pending_for(self.actor.personel_id)
    }

    /// Approve/Reject are offered only while the actor's record is pending.
    pub fn can_decide(&self) -> bool {
        self.is_pending_for_me()
    }

    /// Comments are offered whenever the actor has a record at all.
    pub fn can_comment(&self) -> bool {
        self.request.record_for(self.actor.personel_id).is_some()
    }

    pub fn can_set<M: StatusMarker>(&self, target: M) -> bool {
        can_set(&self.request, &self.actor.capabilities, target)
    }

    /// Submits the actor's decision with a mandatory note.
    ///
    /// Nothing local changes unless the backend accepts; on success the
    /// actor's record is taken from the reply and the aggregate re-fetched.
    pub fn submit_decision(
        &mut self,
        decision: impl Into<Decision>,
        note: &str,
    ) -> Result<String, WorkflowError> {
        let decision = decision.into();
        let personel_id = self.actor.personel_id;
        let request_id = self.request.id;

        if note.trim().is_empty() {
            return Err(ValidationError::NoteRequired.into());
        }
        let Some(record) = self.request.record_for(personel_id) else {
            return Err(ValidationError::NotAnApprover(personel_id).into());
        };
        if decision != Decision::Comment && !record.is_pending() {
            return Err(ValidationError::AlreadyDecided(personel_id).into());
        }

        let response = self
            .api
            .submit_decision(request_id, personel_id, decision, note.trim())
            .inspect_err(|e| {
                warn!(request_id = %request_id, personel_id = %personel_id, %decision, error = %e, "decision failed");
            })?;

        if let Some(record) = self.request.record_for_mut(personel_id) {
            record.refresh_from(&response.record);
        }
        info!(request_id = %request_id, personel_id = %personel_id, %decision, "decision submitted");

        self.reconcile();
        Ok(response.message)
    }

    /// Moves a status marker to `target` with an optimistic local write.
    ///
    /// Denied or redundant calls never reach the backend. A failed call puts
    /// the marker back exactly as it was.
    pub fn set_marker<M: StatusMarker>(&mut self, target: M) -> Result<MarkerOutcome, WorkflowError> {
        let request_id = self.request.id;

        if !M::allowed(&self.actor.capabilities) {
            return Err(WorkflowError::Unauthorized(M::ACTION));
        }
        target.settable()?;
        if M::current(&self.request) == target {
            debug!(request_id = %request_id, marker = %target, "marker already set");
            return Ok(MarkerOutcome::Unchanged);
        }

        let previous = M::snapshot(&self.request);
        target.write(&mut self.request);

        match target.send(&self.api, &self.request) {
            Ok(message) => {
                info!(request_id = %request_id, marker = %target, action = M::ACTION, "marker set");
                self.reconcile();
                Ok(MarkerOutcome::Updated(message))
            }
            Err(e) => {
                M::restore(&mut self.request, previous);
                warn!(request_id = %request_id, marker = %target, error = %e, "marker call failed, rolled back");
                Err(e.into())
            }
        }
    }

    pub fn set_purchase_marker(
        &mut self,
        target: PurchaseStatus,
    ) -> Result<MarkerOutcome, WorkflowError> {
        self.set_marker(target)
    }

    pub fn set_process_marker(&mut self, completed: bool) -> Result<MarkerOutcome, WorkflowError> {
        let target = if completed {
            ProcessStatus::Completed
        } else {
            ProcessStatus::Empty
        };
        self.set_marker(target)
    }

    /// Replaces the local aggregate with the backend's copy.
    pub fn reload(&mut self) -> Result<(), WorkflowError> {
        self.request = self.api.fetch_request(self.request.id)?;
        Ok(())
    }

    // The mutation already succeeded, so a failed re-fetch leaves the
    // provisional local state in place rather than failing the call.
    fn reconcile(&mut self) {
        let request_id = self.request.id;
        match self.api.fetch_request(request_id) {
            Ok(fresh) => {
                if let (Ok(before), Ok(after)) = (self.request.digest(), fresh.digest()) {
                    debug!(request_id = %request_id, changed = before != after, "reconciled with backend");
                }
                self.request = fresh;
            }
            Err(e) => {
                warn!(request_id = %request_id, error = %e, "re-fetch after mutation failed, local state is provisional");
            }
        }
        if let Some(hook) = self.on_refresh.as_mut() {
            hook(&self.request);
        }
    }
}
