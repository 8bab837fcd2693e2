//! Supplier offers and the ranking that picks the cheapest one.
//!
//! Upstream totals arrive as numbers, numeric strings, blanks or garbage.
//! Anything that is present but not a finite number is read as `0` so ranking
//! stays total over dirty data; only an absent (or `null`) field stays `None`.
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const DEFAULT_CURRENCY: &str = "TRY";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, minicbor::Encode, minicbor::Decode)]
#[serde(rename_all = "camelCase")]
pub struct SupplierOffer {
    #[n(0)]
    #[serde(default)]
    pub name: String,
    #[n(1)]
    #[serde(default, deserialize_with = "loose_amount")]
    pub total_net: Option<f64>,
    #[n(2)]
    #[serde(default, deserialize_with = "loose_amount")]
    pub total_kdv: Option<f64>,
    #[n(3)]
    #[serde(default, deserialize_with = "loose_amount")]
    pub total_brut: Option<f64>,
    // legacy single figure, read as gross with zero tax
    #[n(4)]
    #[serde(default, deserialize_with = "loose_amount")]
    pub total: Option<f64>,
    #[n(5)]
    #[serde(default)]
    pub para_birimi_text: Option<String>,
    #[n(6)]
    #[serde(default)]
    pub kapsama_text: Option<String>,
}

/// An offer with its derived totals. `best` is set on the first entry only.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedOffer {
    pub name: String,
    pub total_net: f64,
    pub total_kdv: f64,
    pub total_brut: f64,
    pub currency: String,
    pub scope: Option<String>,
    pub best: bool,
}

/// Number-like coercion: finite numbers pass, numeric strings parse, anything
/// else present becomes 0.
pub fn coerce_amount(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() { Some(0.0) } else { s.parse::<f64>().ok() }
        }
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    };
    parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
}

fn loose_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(v) => Some(coerce_amount(&v)),
    })
}

impl SupplierOffer {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
    pub fn set_net(mut self, amount: f64) -> Self {
        self.total_net = Some(amount);
        self
    }
    pub fn set_kdv(mut self, amount: f64) -> Self {
        self.total_kdv = Some(amount);
        self
    }
    pub fn set_brut(mut self, amount: f64) -> Self {
        self.total_brut = Some(amount);
        self
    }
    pub fn set_total(mut self, amount: f64) -> Self {
        self.total = Some(amount);
        self
    }
    pub fn set_currency(mut self, code: &str) -> Self {
        self.para_birimi_text = Some(code.to_string());
        self
    }
    pub fn set_scope(mut self, scope: &str) -> Self {
        self.kapsama_text = Some(scope.to_string());
        self
    }

    /// Net, KDV and gross as used for comparison.
    ///
    /// Gross is `totalBrut` when supplied, else `totalNet + totalKdv`; with
    /// neither net nor KDV present, `total` is the gross and tax is zero.
    /// Results never carry a negative zero, so `-0` and `0` tie in ranking.
    pub fn totals(&self) -> (f64, f64, f64) {
        // adding +0.0 turns -0.0 into 0.0 and leaves everything else alone
        let finite = |v: Option<f64>| v.filter(|x| x.is_finite()).map(|x| x + 0.0);
        let net = finite(self.total_net);
        let kdv = finite(self.total_kdv);

        match (finite(self.total_brut), net, kdv) {
            (Some(brut), net, kdv) => (net.unwrap_or(0.0), kdv.unwrap_or(0.0), brut),
            (None, None, None) => {
                let gross = finite(self.total).unwrap_or(0.0);
                (gross, 0.0, gross)
            }
            (None, net, kdv) => {
                let (net, kdv) = (net.unwrap_or(0.0), kdv.unwrap_or(0.0));
                (net, kdv, net + kdv)
            }
        }
    }

    pub fn gross(&self) -> f64 {
        self.totals().2
    }

    pub fn currency<'a>(&'a self, default: &'a str) -> &'a str {
        match self.para_birimi_text.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => code,
            _ => default,
        }
    }
}

/// Orders offers by gross total, cheapest first, and flags the first as best.
/// The sort is stable; an empty slice ranks to an empty vector.
pub fn rank(offers: &[SupplierOffer]) -> Vec<RankedOffer> {
    rank_with_currency(offers, DEFAULT_CURRENCY)
}

pub fn rank_with_currency(offers: &[SupplierOffer], default_currency: &str) -> Vec<RankedOffer> {
    let mut ranked: Vec<RankedOffer> = offers
        .iter()
        .map(|offer| {
            let (net, kdv, brut) = offer.totals();
            RankedOffer {
                name: offer.name.clone(),
                total_net: net,
                total_kdv: kdv,
                total_brut: brut,
                currency: offer.currency(default_currency).to_string(),
                scope: offer.kapsama_text.clone(),
                best: false,
            }
        })
        .collect();

    ranked.sort_by(|a, b| a.total_brut.total_cmp(&b.total_brut));

    if let Some(first) = ranked.first_mut() {
        first.best = true;
    }
    ranked
}

/// Formats an amount the tr-TR way: `.` groups thousands, `,` before two
/// decimals.
pub fn format_amount(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u128;
    let (whole, frac) = (cents / 100, cents % 100);

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}{grouped},{frac:02}")
}

/// "1) Name: Amount Currency" for the first `limit` ranked offers.
pub fn summarize(ranked: &[RankedOffer], limit: usize, separator: &str) -> String {
    ranked
        .iter()
        .take(limit)
        .enumerate()
        .map(|(i, offer)| {
            let name = if offer.name.trim().is_empty() {
                "-"
            } else {
                offer.name.trim()
            };
            format!(
                "{}) {}: {} {}",
                i + 1,
                name,
                format_amount(offer.total_brut),
                offer.currency
            )
        })
        .collect::<Vec<_>>()
        .join(separator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gross_derivation_rules() {
        assert_eq!(SupplierOffer::new("A").set_net(100.0).set_kdv(20.0).gross(), 120.0);
        assert_eq!(SupplierOffer::new("B").set_brut(90.0).set_net(10.0).gross(), 90.0);
        assert_eq!(SupplierOffer::new("C").set_total(75.0).totals(), (75.0, 0.0, 75.0));
        assert_eq!(SupplierOffer::new("D").set_net(50.0).gross(), 50.0);
        assert_eq!(SupplierOffer::new("E").gross(), 0.0);
    }

    #[test]
    fn ranks_cheapest_gross_first() {
        let offers = vec![
            SupplierOffer::new("A").set_net(100.0).set_kdv(20.0),
            SupplierOffer::new("B").set_brut(90.0),
        ];

        let ranked = rank(&offers);

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].name, "B");
        assert_eq!(ranked[0].total_brut, 90.0);
        assert!(ranked[0].best);
        assert_eq!(ranked[1].name, "A");
        assert_eq!(ranked[1].total_brut, 120.0);
        assert!(!ranked[1].best);
    }

    #[test]
    fn empty_input_has_no_best_offer() {
        assert!(rank(&[]).is_empty());
    }

    #[test]
    fn ties_keep_input_order() {
        let offers = vec![
            SupplierOffer::new("first").set_brut(10.0),
            SupplierOffer::new("second").set_net(10.0),
            SupplierOffer::new("third").set_total(10.0),
        ];
        let names: Vec<_> = rank(&offers).into_iter().map(|o| o.name).collect();
        assert_eq!(names, ["first", "second", "third"]);
    }

    #[test]
    fn negative_zero_ties_with_zero() {
        let offers = vec![
            SupplierOffer::new("first").set_brut(0.0),
            SupplierOffer::new("second").set_brut(-0.0),
            SupplierOffer::new("third").set_net(-0.0).set_kdv(-0.0),
        ];
        let ranked = rank(&offers);

        let names: Vec<_> = ranked.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["first", "second", "third"]);
        assert!(ranked.iter().all(|o| o.total_brut.is_sign_positive()));

        let dirty: SupplierOffer =
            serde_json::from_value(serde_json::json!({ "name": "x", "totalBrut": "-0" })).unwrap();
        assert!(dirty.gross().is_sign_positive());
    }

    #[test]
    fn malformed_totals_coerce_to_zero() {
        let offer: SupplierOffer = serde_json::from_value(serde_json::json!({
            "name": "Kirli Veri",
            "totalNet": "abc",
            "totalKdv": "18.5",
            "totalBrut": null,
        }))
        .unwrap();

        assert_eq!(offer.total_net, Some(0.0));
        assert_eq!(offer.total_kdv, Some(18.5));
        assert_eq!(offer.total_brut, None);
        assert_eq!(offer.gross(), 18.5);
        assert_eq!(offer.currency(DEFAULT_CURRENCY), "TRY");
    }

    #[test]
    fn formats_turkish_amounts() {
        assert_eq!(format_amount(0.0), "0,00");
        assert_eq!(format_amount(1234.5), "1.234,50");
        assert_eq!(format_amount(1_000_000.0), "1.000.000,00");
        assert_eq!(format_amount(-12.5), "-12,50");
    }

    #[test]
    fn summary_takes_top_three() {
        let offers = vec![
            SupplierOffer::new("D").set_brut(400.0),
            SupplierOffer::new("A").set_brut(100.0).set_currency("USD"),
            SupplierOffer::new("C").set_brut(300.0),
            SupplierOffer::new("B").set_brut(1200.0),
        ];
        let summary = summarize(&rank(&offers), 3, " | ");
        assert_eq!(summary, "1) A: 100,00 USD | 2) C: 300,00 TRY | 3) D: 400,00 TRY");
    }
}
