//! Approval state machine over a request's approval chain.
//!
//! Each [`ApprovalRecord`] moves `Pending -> Approved` or `Pending -> Rejected`
//! and stays there. A comment updates the note without touching the status and
//! is accepted on terminal records too, as an append-only note trail.
//!
//! The chain is read as an unordered set of outcomes: `sira` orders display,
//! it does not gate who may act.
use crate::error::ApiError;
use crate::request::{ApprovalRecord, PurchaseRequest};
use crate::types::{PersonelId, Person, RequestId, TimeStamp};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

/// What an approver submits. Converts from the `true | false | null` shape the
/// UI sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    Approve,
    Reject,
    Comment,
}

/// Aggregate view of a whole chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChainState {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApprovalSummary {
    pub approved: usize,
    pub rejected: usize,
    pub pending: usize,
}

impl ApprovalStatus {
    /// `null`, `0` and any unknown code read as pending.
    pub fn from_code(code: Option<i64>) -> Self {
        match code {
            Some(1) => ApprovalStatus::Approved,
            Some(2) => ApprovalStatus::Rejected,
            _ => ApprovalStatus::Pending,
        }
    }
    pub fn code(self) -> i64 {
        match self {
            ApprovalStatus::Pending => 0,
            ApprovalStatus::Approved => 1,
            ApprovalStatus::Rejected => 2,
        }
    }
    pub fn label(self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "Beklemede",
            ApprovalStatus::Approved => "Onaylandı",
            ApprovalStatus::Rejected => "Reddedildi",
        }
    }
    pub fn is_terminal(self) -> bool {
        self != ApprovalStatus::Pending
    }
}

impl From<Option<bool>> for Decision {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => Decision::Approve,
            Some(false) => Decision::Reject,
            None => Decision::Comment,
        }
    }
}

impl Decision {
    pub fn target_status(self) -> Option<ApprovalStatus> {
        match self {
            Decision::Approve => Some(ApprovalStatus::Approved),
            Decision::Reject => Some(ApprovalStatus::Rejected),
            Decision::Comment => None,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Decision::Approve => "approve",
            Decision::Reject => "reject",
            Decision::Comment => "comment",
        };
        f.write_str(label)
    }
}

impl ApprovalRecord {
    pub fn pending(id: u64, sira: u32, personel_id: PersonelId, personel: Person) -> Self {
        Self {
            id,
            sira,
            personel_id,
            personel,
            durum_kod: Some(ApprovalStatus::Pending.code()),
            durum_ad: Some(ApprovalStatus::Pending.label().to_string()),
            onay_tarihi_utc: None,
            not: None,
        }
    }

    pub fn status(&self) -> ApprovalStatus {
        ApprovalStatus::from_code(self.durum_kod)
    }

    /// `durumKod` is `null` or `0`.
    pub fn is_pending(&self) -> bool {
        matches!(self.durum_kod, None | Some(0))
    }

    /// Backend-side transition. Approve/Reject leave pending and stamp the
    /// decision time; Comment only replaces the note.
    pub fn apply(
        &mut self,
        request_id: RequestId,
        decision: Decision,
        note: &str,
        at: TimeStamp<Utc>,
    ) -> Result<(), ApiError> {
        match decision.target_status() {
            Some(target) => {
                if !self.is_pending() {
                    return Err(ApiError::AlreadyDecided {
                        request_id,
                        personel_id: self.personel_id,
                    });
                }
                self.durum_kod = Some(target.code());
                self.durum_ad = Some(target.label().to_string());
                self.onay_tarihi_utc = Some(at);
                self.not = Some(note.to_string());
            }
            None => {
                self.not = Some(note.to_string());
            }
        }
        Ok(())
    }

    /// Copies what the backend reported back for this record.
    pub fn refresh_from(&mut self, server: &ApprovalRecord) {
        self.durum_kod = server.durum_kod;
        self.durum_ad = server.durum_ad.clone();
        self.onay_tarihi_utc = server.onay_tarihi_utc.clone();
        self.not = server.not.clone();
    }
}

/// Whether `personel_id` holds a pending record on this chain. Gates the
/// approve/reject/comment controls and the list badge.
pub fn is_pending_for(records: &[ApprovalRecord], personel_id: PersonelId) -> bool {
    records
        .iter()
        .any(|r| r.personel_id == personel_id && r.is_pending())
}

/// True when every record has `durumKod == 1`, regardless of `sira`.
pub fn is_fully_approved(records: &[ApprovalRecord]) -> bool {
    records.iter().all(|r| r.durum_kod == Some(1))
}

pub fn summarize(records: &[ApprovalRecord]) -> ApprovalSummary {
    records
        .iter()
        .fold(ApprovalSummary::default(), |mut acc, r| {
            match r.status() {
                ApprovalStatus::Pending => acc.pending += 1,
                ApprovalStatus::Approved => acc.approved += 1,
                ApprovalStatus::Rejected => acc.rejected += 1,
            }
            acc
        })
}

/// Any rejection rejects the chain; all approvals approve it.
pub fn chain_state(records: &[ApprovalRecord]) -> ChainState {
    if records.iter().any(|r| r.status() == ApprovalStatus::Rejected) {
        ChainState::Rejected
    } else if is_fully_approved(records) {
        ChainState::Approved
    } else {
        ChainState::Pending
    }
}

impl PurchaseRequest {
    /// benimBeklemedeMi
    pub fn is_pending_for(&self, personel_id: PersonelId) -> bool {
        is_pending_for(&self.onaylayan_personeller, personel_id)
    }

    pub fn is_fully_approved(&self) -> bool {
        is_fully_approved(&self.onaylayan_personeller)
    }

    pub fn chain_state(&self) -> ChainState {
        chain_state(&self.onaylayan_personeller)
    }

    pub fn approval_summary(&self) -> ApprovalSummary {
        summarize(&self.onaylayan_personeller)
    }

    /// One display line per approver in `sira` order, e.g.
    /// `2. Can Ak - Reddedildi (bütçe yetersiz)`.
    pub fn history_lines(&self) -> Vec<String> {
        self.approvers_in_order()
            .into_iter()
            .map(|record| {
                let note = record
                    .not
                    .as_deref()
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(|n| format!(" ({n})"))
                    .unwrap_or_default();
                format!(
                    "{}. {} - {}{}",
                    record.sira,
                    record.personel.full_name(),
                    record.status().label(),
                    note
                )
            })
            .collect()
    }
}
