//! Free-text status note normalisation and the markers derived from it.
//!
//! `not1` and `not5` are legacy narrative fields. Data entry is inconsistent,
//! so every phrase is matched both in its accented Turkish spelling and in its
//! ASCII-folded form, as a substring of the normalised note.
use serde::{Deserialize, Serialize};
use std::fmt;

const ALINDI: [&str; 2] = ["satın alındı", "satin alindi"];
const ALINMADI: [&str; 2] = ["satın alınmadı", "satin alinmadi"];
const TAMAMLANDI: [&str; 2] = ["tamamlandı", "tamamlandi"];

/// Trims, lower-cases with Turkish rules (`I` → `ı`, `İ` → `i`) and collapses
/// whitespace runs to a single space. `None` yields an empty string.
pub fn normalize(text: Option<&str>) -> String {
    let Some(text) = text else {
        return String::new();
    };
    let lowered: String = text.chars().flat_map(turkish_lower).collect();
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn turkish_lower(c: char) -> Vec<char> {
    match c {
        'I' => vec!['ı'],
        'İ' => vec!['i'],
        // stray combining dot left over from non-Turkish lower-casing of İ
        '\u{0307}' => vec![],
        other => other.to_lowercase().collect(),
    }
}

/// Strips Turkish diacritics from already-normalised text.
pub fn ascii_fold(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'ı' | 'î' => 'i',
            'ş' => 's',
            'ç' => 'c',
            'ğ' => 'g',
            'ö' => 'o',
            'ü' | 'û' => 'u',
            'â' => 'a',
            other => other,
        })
        .collect()
}

fn contains_phrase(note: Option<&str>, phrase: [&str; 2]) -> bool {
    let normalized = normalize(note);
    if normalized.is_empty() {
        return false;
    }
    let [accented, folded] = phrase;
    normalized.contains(accented)
        || normalized.contains(folded)
        || ascii_fold(&normalized).contains(folded)
}

pub fn is_purchased(note: Option<&str>) -> bool {
    contains_phrase(note, ALINDI)
}

pub fn is_not_purchased(note: Option<&str>) -> bool {
    contains_phrase(note, ALINMADI)
}

pub fn is_process_completed(note: Option<&str>) -> bool {
    contains_phrase(note, TAMAMLANDI)
}

/// Purchase-executed marker over `not1`.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    minicbor::Encode,
    minicbor::Decode,
)]
pub enum PurchaseStatus {
    #[default]
    #[n(0)]
    #[serde(rename = "BOS")]
    Empty,
    #[n(1)]
    #[serde(rename = "ALINDI")]
    Purchased,
    #[n(2)]
    #[serde(rename = "ALINMADI")]
    NotPurchased,
}

/// Process-completed marker over `not5`.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    minicbor::Encode,
    minicbor::Decode,
)]
pub enum ProcessStatus {
    #[default]
    #[n(0)]
    #[serde(rename = "BOS")]
    Empty,
    #[n(1)]
    #[serde(rename = "TAMAMLANDI")]
    Completed,
}

impl PurchaseStatus {
    /// "Alınmadı" is checked first so a note that mentions both reads as the
    /// negative outcome.
    pub fn from_note(note: Option<&str>) -> Self {
        if is_not_purchased(note) {
            PurchaseStatus::NotPurchased
        } else if is_purchased(note) {
            PurchaseStatus::Purchased
        } else {
            PurchaseStatus::Empty
        }
    }
    /// Text written into `not1` when the marker is set.
    pub fn note_text(self) -> &'static str {
        match self {
            PurchaseStatus::Empty => "",
            PurchaseStatus::Purchased => "Satın Alındı",
            PurchaseStatus::NotPurchased => "Satın Alınmadı",
        }
    }
}

impl ProcessStatus {
    pub fn from_note(note: Option<&str>) -> Self {
        if is_process_completed(note) {
            ProcessStatus::Completed
        } else {
            ProcessStatus::Empty
        }
    }
    pub fn note_text(self) -> &'static str {
        match self {
            ProcessStatus::Empty => "",
            ProcessStatus::Completed => "Süreç Tamamlandı",
        }
    }
}

impl fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PurchaseStatus::Empty => "BOS",
            PurchaseStatus::Purchased => "ALINDI",
            PurchaseStatus::NotPurchased => "ALINMADI",
        };
        f.write_str(label)
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProcessStatus::Empty => "BOS",
            ProcessStatus::Completed => "TAMAMLANDI",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_turkish_capitals() {
        assert_eq!(normalize(Some("SATIN ALINDI  ")), "satın alındı");
        assert_eq!(normalize(Some("  İSTANBUL\t ŞUBE ")), "istanbul şube");
        assert_eq!(normalize(None), "");
        assert_eq!(normalize(Some("   ")), "");
    }

    #[test]
    fn both_spellings_satisfy_purchased() {
        assert!(is_purchased(Some("SATIN ALINDI  ")));
        assert!(is_purchased(Some("satın   alındı")));
        assert!(is_purchased(Some("Satin Alindi")));
        assert!(is_purchased(Some("malzeme satın alındı, teslim bekleniyor")));
        assert!(!is_purchased(None));
    }

    #[test]
    fn not_purchased_never_reads_as_purchased() {
        let note = Some("satın alınmadı");
        assert!(is_not_purchased(note));
        assert!(!is_purchased(note));
        assert_eq!(PurchaseStatus::from_note(note), PurchaseStatus::NotPurchased);
        assert_eq!(
            PurchaseStatus::from_note(Some("SATIN ALINMADI")),
            PurchaseStatus::NotPurchased
        );
    }

    #[test]
    fn mixed_diacritics_still_match() {
        // dotted capital İ lower-cases to plain i, leaving "alindi" half folded
        assert!(is_purchased(Some("SATIN ALİNDİ")));
    }

    #[test]
    fn process_completed_marker() {
        assert_eq!(
            ProcessStatus::from_note(Some("SÜREÇ TAMAMLANDI")),
            ProcessStatus::Completed
        );
        assert_eq!(
            ProcessStatus::from_note(Some("surec tamamlandi")),
            ProcessStatus::Completed
        );
        assert_eq!(ProcessStatus::from_note(Some("")), ProcessStatus::Empty);
    }

    #[test]
    fn note_text_round_trips_through_detection() {
        for status in [PurchaseStatus::Purchased, PurchaseStatus::NotPurchased] {
            assert_eq!(PurchaseStatus::from_note(Some(status.note_text())), status);
        }
        assert_eq!(
            ProcessStatus::from_note(Some(ProcessStatus::Completed.note_text())),
            ProcessStatus::Completed
        );
    }
}
