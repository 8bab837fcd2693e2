//! Property-based tests for supplier offer ranking
//!
//! Ranking feeds the best-offer badge and the list summary, so it must be a
//! total, stable ordering over whatever the backend sends, including offers
//! with missing or junk totals.

use proptest::prelude::*;
use purchase_approval::offer::{SupplierOffer, rank, summarize};

// PROPERTY TEST STRATEGIES

/// Strategy for an optional amount, including negative and zero values
fn amount_strategy() -> impl Strategy<Value = Option<f64>> {
    prop_oneof![
        Just(None),
        Just(Some(-0.0)),
        Just(Some(0.0)),
        (0u32..=1_000_000).prop_map(|v| Some(v as f64 / 100.0)),
        (-1000i32..=0).prop_map(|v| Some(v as f64)),
    ]
}

/// Strategy for an offer whose totals may come in any of the accepted shapes
fn offer_strategy() -> impl Strategy<Value = SupplierOffer> {
    (
        "[A-Z][a-z]{2,8}",
        amount_strategy(),
        amount_strategy(),
        amount_strategy(),
        amount_strategy(),
    )
        .prop_map(|(name, net, kdv, brut, total)| SupplierOffer {
            name,
            total_net: net,
            total_kdv: kdv,
            total_brut: brut,
            total,
            ..SupplierOffer::default()
        })
}

fn offers_strategy() -> impl Strategy<Value = Vec<SupplierOffer>> {
    prop::collection::vec(offer_strategy(), 0..=12)
}

// PROPERTY TESTS
proptest! {
    /// Property: ranking is a permutation ordered non-decreasingly by gross
    #[test]
    fn prop_rank_is_sorted_permutation(offers in offers_strategy()) {
        let ranked = rank(&offers);

        prop_assert_eq!(ranked.len(), offers.len());
        for pair in ranked.windows(2) {
            prop_assert!(pair[0].total_brut <= pair[1].total_brut);
        }

        let mut input_gross: Vec<f64> = offers.iter().map(|o| o.gross()).collect();
        let mut output_gross: Vec<f64> = ranked.iter().map(|o| o.total_brut).collect();
        input_gross.sort_by(f64::total_cmp);
        output_gross.sort_by(f64::total_cmp);
        prop_assert_eq!(input_gross, output_gross);
    }

    /// Property: exactly one best offer when non-empty, and it is the first
    #[test]
    fn prop_single_best_offer(offers in offers_strategy()) {
        let ranked = rank(&offers);
        let best = ranked.iter().filter(|o| o.best).count();

        if ranked.is_empty() {
            prop_assert_eq!(best, 0);
        } else {
            prop_assert_eq!(best, 1);
            prop_assert!(ranked[0].best);
        }
    }

    /// Property: offers with equal gross keep their input order
    #[test]
    fn prop_ties_are_stable(gross in 0u32..10_000, count in 1usize..8) {
        let offers: Vec<SupplierOffer> = (0..count)
            .map(|i| SupplierOffer::new(&format!("T{i}")).set_brut(gross as f64))
            .collect();

        let names: Vec<String> = rank(&offers).into_iter().map(|o| o.name).collect();
        let expected: Vec<String> = (0..count).map(|i| format!("T{i}")).collect();
        prop_assert_eq!(names, expected);
    }

    /// Property: zero gross of either sign ties, keeping input order
    #[test]
    fn prop_signed_zero_ties_are_stable(signs in prop::collection::vec(any::<bool>(), 1..8)) {
        let offers: Vec<SupplierOffer> = signs
            .iter()
            .enumerate()
            .map(|(i, negative)| {
                let zero = if *negative { -0.0 } else { 0.0 };
                SupplierOffer::new(&format!("Z{i}")).set_brut(zero)
            })
            .collect();

        let names: Vec<String> = rank(&offers).into_iter().map(|o| o.name).collect();
        let expected: Vec<String> = (0..signs.len()).map(|i| format!("Z{i}")).collect();
        prop_assert_eq!(names, expected);
    }

    /// Property: gross always follows the derivation rule
    #[test]
    fn prop_gross_derivation(offer in offer_strategy()) {
        let (net, kdv, gross) = offer.totals();
        match offer.total_brut {
            Some(brut) => prop_assert_eq!(gross, brut),
            None if offer.total_net.is_none() && offer.total_kdv.is_none() => {
                prop_assert_eq!(gross, offer.total.unwrap_or(0.0));
                prop_assert_eq!(kdv, 0.0);
            }
            None => prop_assert_eq!(gross, net + kdv),
        }
    }

    /// Property: the summary never lists more than the requested number of offers
    #[test]
    fn prop_summary_respects_limit(offers in offers_strategy(), limit in 0usize..5) {
        let summary = summarize(&rank(&offers), limit, " | ");
        let entries = if summary.is_empty() { 0 } else { summary.split(" | ").count() };
        prop_assert_eq!(entries, offers.len().min(limit));
    }
}
