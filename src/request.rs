//! The purchase request aggregate: request header, approval chain and offers
use crate::error::{ApiError, ValidationError};
use crate::normalize::{ProcessStatus, PurchaseStatus};
use crate::offer::{RankedOffer, SupplierOffer, rank_with_currency};
use crate::types::{PersonelId, Person, RequestId, Site, TimeStamp};
use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One approver's row in a request's approval chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, minicbor::Encode, minicbor::Decode)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRecord {
    #[n(0)]
    pub id: u64,
    // 1-based position, informational only
    #[n(1)]
    pub sira: u32,
    #[n(2)]
    pub personel_id: PersonelId,
    #[n(3)]
    #[serde(default)]
    pub personel: Person,
    // 0 / null pending, 1 approved, 2 rejected
    #[n(4)]
    #[serde(default)]
    pub durum_kod: Option<i64>,
    #[n(5)]
    #[serde(default)]
    pub durum_ad: Option<String>,
    #[n(6)]
    #[serde(default)]
    pub onay_tarihi_utc: Option<TimeStamp<Utc>>,
    #[n(7)]
    #[serde(default)]
    pub not: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, minicbor::Encode, minicbor::Decode)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    #[n(0)]
    pub id: RequestId,
    // display serial, never a lookup key
    #[n(1)]
    #[serde(default, deserialize_with = "loose_text")]
    pub seri_no: String,
    #[n(2)]
    #[serde(default)]
    pub tarih: Option<TimeStamp<Utc>>,
    #[n(3)]
    #[serde(default)]
    pub talep_cinsi: String,
    #[n(4)]
    #[serde(default)]
    pub aciklama: Option<String>,
    #[n(5)]
    #[serde(default)]
    pub teknik_aciklama: Option<String>,
    #[n(6)]
    #[serde(default)]
    pub talep_eden: Person,
    #[n(7)]
    #[serde(default)]
    pub not1: Option<String>,
    // invoice pdf url
    #[n(8)]
    #[serde(default)]
    pub not2: Option<String>,
    #[n(9)]
    #[serde(default)]
    pub not5: Option<String>,
    #[n(10)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub satin_alma_durumu: Option<PurchaseStatus>,
    #[n(11)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surec_durumu: Option<ProcessStatus>,
    #[n(12)]
    #[serde(default)]
    pub public_token: Option<String>,
    #[n(13)]
    #[serde(default)]
    pub onaylayan_personeller: Vec<ApprovalRecord>,
    #[n(14)]
    #[serde(default, alias = "offers", alias = "tedarikciler")]
    pub teklifler: Vec<SupplierOffer>,
    #[n(15)]
    #[serde(default)]
    pub site: Option<Site>,
}

fn loose_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    })
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}

impl PurchaseRequest {
    pub fn record_for(&self, personel_id: PersonelId) -> Option<&ApprovalRecord> {
        self.onaylayan_personeller
            .iter()
            .find(|r| r.personel_id == personel_id)
    }

    pub fn record_for_mut(&mut self, personel_id: PersonelId) -> Option<&mut ApprovalRecord> {
        self.onaylayan_personeller
            .iter_mut()
            .find(|r| r.personel_id == personel_id)
    }

    /// Typed column when the backend sent one, otherwise substring match on `not1`.
    pub fn purchase_status(&self) -> PurchaseStatus {
        self.satin_alma_durumu
            .unwrap_or_else(|| PurchaseStatus::from_note(self.not1.as_deref()))
    }

    pub fn process_status(&self) -> ProcessStatus {
        self.surec_durumu
            .unwrap_or_else(|| ProcessStatus::from_note(self.not5.as_deref()))
    }

    pub fn ranked_offers(&self, default_currency: &str) -> Vec<RankedOffer> {
        rank_with_currency(&self.teklifler, default_currency)
    }

    pub fn invoice_url(&self) -> Option<&str> {
        non_blank(self.not2.as_deref())
    }

    /// External share link; only available once the backend issued a token.
    pub fn share_link(&self, base_url: &str) -> Option<String> {
        let token = non_blank(self.public_token.as_deref())?;
        Some(format!(
            "{}/satinalma/paylas/{}",
            base_url.trim_end_matches('/'),
            token
        ))
    }

    pub fn approvers_in_order(&self) -> Vec<&ApprovalRecord> {
        let mut records: Vec<_> = self.onaylayan_personeller.iter().collect();
        records.sort_by_key(|r| r.sira);
        records
    }

    /// sha256 over the CBOR encoding. Used to tell whether a re-fetch changed
    /// anything; not a concurrency token.
    pub fn digest(&self) -> Result<String, ApiError> {
        self.serialize_with_hash().map(|(hash, _)| hash)
    }

    pub fn serialize_with_hash(&self) -> Result<(String, Vec<u8>), ApiError> {
        let cbor = minicbor::to_vec(self)?;
        let hash = sha256::digest(&cbor);

        Ok((hash, cbor))
    }
}

/// Header fields of a request before the backend assigns it an id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestDraft {
    pub seri_no: Option<String>,
    pub tarih: Option<TimeStamp<Utc>>,
    pub talep_cinsi: String,
    pub aciklama: Option<String>,
    pub teknik_aciklama: Option<String>,
    pub talep_eden: Option<Person>,
    pub site: Option<Site>,
    pub teklifler: Vec<SupplierOffer>,
}

impl RequestDraft {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_seri_no(mut self, seri_no: &str) -> Self {
        self.seri_no = Some(seri_no.to_string());
        self
    }
    pub fn set_tarih(mut self, tarih: TimeStamp<Utc>) -> Self {
        self.tarih = Some(tarih);
        self
    }
    pub fn set_talep_cinsi(mut self, talep_cinsi: &str) -> Self {
        self.talep_cinsi = talep_cinsi.to_string();
        self
    }
    pub fn set_aciklama(mut self, aciklama: &str) -> Self {
        self.aciklama = Some(aciklama.to_string());
        self
    }
    pub fn set_teknik_aciklama(mut self, note: &str) -> Self {
        self.teknik_aciklama = Some(note.to_string());
        self
    }
    pub fn set_talep_eden(mut self, person: Person) -> Self {
        self.talep_eden = Some(person);
        self
    }
    pub fn set_site(mut self, site: Site) -> Self {
        self.site = Some(site);
        self
    }
    pub fn add_offer(mut self, offer: SupplierOffer) -> Self {
        self.teklifler.push(offer);
        self
    }

    // Checks fields and turns the draft into a request carrying `id`, with an
    // approval chain of one pending record per approver in the given order.
    pub fn validate_and_finalise(
        self,
        id: RequestId,
        approvers: &[Person],
    ) -> Result<PurchaseRequest, ValidationError> {
        if self.talep_cinsi.trim().is_empty() {
            return Err(ValidationError::InvalidRequest(
                "request category is empty".into(),
            ));
        }
        let Some(talep_eden) = self.talep_eden else {
            return Err(ValidationError::InvalidRequest(
                "requester is not set".into(),
            ));
        };
        if approvers.is_empty() {
            return Err(ValidationError::InvalidRequest(
                "at least one approver is required".into(),
            ));
        }

        let mut chain = Vec::with_capacity(approvers.len());
        for (idx, person) in approvers.iter().enumerate() {
            let Some(personel_id) = person.id else {
                return Err(ValidationError::InvalidRequest(format!(
                    "approver {} has no personel id",
                    person.full_name()
                )));
            };
            if chain
                .iter()
                .any(|r: &ApprovalRecord| r.personel_id == personel_id)
            {
                return Err(ValidationError::InvalidRequest(format!(
                    "personel {personel_id} is listed twice as approver"
                )));
            }
            // record ids are assigned by the backend on insert
            chain.push(ApprovalRecord::pending(
                0,
                idx as u32 + 1,
                personel_id,
                person.clone(),
            ));
        }

        Ok(PurchaseRequest {
            id,
            seri_no: self.seri_no.unwrap_or_else(|| format!("SA-{:06}", id.0)),
            tarih: Some(self.tarih.unwrap_or_default()),
            talep_cinsi: self.talep_cinsi,
            aciklama: self.aciklama,
            teknik_aciklama: self.teknik_aciklama,
            talep_eden,
            not1: None,
            not2: None,
            not5: None,
            satin_alma_durumu: None,
            surec_durumu: None,
            public_token: None,
            onaylayan_personeller: chain,
            teklifler: self.teklifler,
            site: self.site,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approver(id: u64) -> Person {
        Person::new(PersonelId(id), "Onay", &format!("Veren{id}"))
    }

    #[test]
    fn finalise_builds_pending_chain_in_order() {
        let request = RequestDraft::new()
            .set_talep_cinsi("Kırtasiye")
            .set_talep_eden(Person::new(PersonelId(1), "Ali", "Kaya"))
            .validate_and_finalise(RequestId(7), &[approver(10), approver(11)])
            .unwrap();

        assert_eq!(request.seri_no, "SA-000007");
        assert_eq!(request.onaylayan_personeller.len(), 2);
        assert_eq!(request.onaylayan_personeller[0].sira, 1);
        assert_eq!(request.onaylayan_personeller[1].personel_id, PersonelId(11));
        assert!(
            request
                .onaylayan_personeller
                .iter()
                .all(|r| r.durum_kod == Some(0) && r.onay_tarihi_utc.is_none())
        );
    }

    #[test]
    fn finalise_rejects_duplicate_approvers() {
        let result = RequestDraft::new()
            .set_talep_cinsi("Boya")
            .set_talep_eden(Person::new(PersonelId(1), "Ali", "Kaya"))
            .validate_and_finalise(RequestId(1), &[approver(10), approver(10)]);
        assert!(matches!(result, Err(ValidationError::InvalidRequest(_))));
    }

    #[test]
    fn finalise_requires_requester_and_category() {
        let no_category = RequestDraft::new()
            .set_talep_eden(Person::new(PersonelId(1), "Ali", "Kaya"))
            .validate_and_finalise(RequestId(1), &[approver(2)]);
        assert!(no_category.is_err());

        let no_requester = RequestDraft::new()
            .set_talep_cinsi("Boya")
            .validate_and_finalise(RequestId(1), &[approver(2)]);
        assert!(no_requester.is_err());
    }

    #[test]
    fn decodes_backend_payload() {
        let payload = serde_json::json!({
            "id": 42,
            "seriNo": 1042,
            "tarih": "2024-06-15T10:30:00",
            "talepCinsi": "Elektrik malzemesi",
            "talepEden": { "id": 3, "ad": "Ayşe", "soyad": "Demir" },
            "not1": "SATIN ALINDI",
            "not2": "  ",
            "publicToken": "share1abc",
            "onaylayanPersoneller": [
                { "id": 1, "sira": 1, "personelId": 9, "personel": { "ad": "Can", "soyad": "Ak" }, "durumKod": null },
                { "id": 2, "sira": 2, "personelId": 8, "durumKod": 1, "onayTarihiUtc": "2024-06-16T08:00:00Z", "not": "uygun" }
            ],
            "teklifler": [
                { "name": "Tedarikçi A", "totalNet": 100, "totalKdv": 20 },
                { "name": "Tedarikçi B", "totalBrut": "90" }
            ]
        });

        let request: PurchaseRequest = serde_json::from_value(payload).unwrap();

        assert_eq!(request.id, RequestId(42));
        assert_eq!(request.seri_no, "1042");
        assert_eq!(request.purchase_status(), PurchaseStatus::Purchased);
        assert_eq!(request.process_status(), ProcessStatus::Empty);
        assert_eq!(request.invoice_url(), None);
        assert_eq!(
            request.share_link("https://portal.example/").as_deref(),
            Some("https://portal.example/satinalma/paylas/share1abc")
        );
        assert_eq!(request.record_for(PersonelId(9)).unwrap().durum_kod, None);
        assert_eq!(request.ranked_offers("TRY")[0].name, "Tedarikçi B");
    }

    #[test]
    fn typed_marker_column_wins_over_note_text() {
        let mut request = RequestDraft::new()
            .set_talep_cinsi("Boya")
            .set_talep_eden(Person::new(PersonelId(1), "Ali", "Kaya"))
            .validate_and_finalise(RequestId(1), &[approver(2)])
            .unwrap();
        request.not1 = Some("satın alındı".into());
        request.satin_alma_durumu = Some(PurchaseStatus::NotPurchased);

        assert_eq!(request.purchase_status(), PurchaseStatus::NotPurchased);
    }

    #[test]
    fn digest_tracks_content() {
        let request = RequestDraft::new()
            .set_talep_cinsi("Boya")
            .set_talep_eden(Person::new(PersonelId(1), "Ali", "Kaya"))
            .validate_and_finalise(RequestId(1), &[approver(2)])
            .unwrap();
        let mut changed = request.clone();
        changed.not5 = Some("Süreç Tamamlandı".into());

        assert_eq!(request.digest().unwrap(), request.digest().unwrap());
        assert_ne!(request.digest().unwrap(), changed.digest().unwrap());
    }
}
