//! Discount engine
//!
//! Computes the final unit price for a (variant, buyer) pair by stacking two
//! tier families additively: badge-gated percentage discounts and
//! holding-gated percentage-or-fixed discounts. Eligibility is read through
//! [`BalanceProbe`] capabilities so the math is testable without any token
//! accounts; a probe that errors degrades the tier to "ineligible" rather
//! than aborting the quote.

use anchor_lang::prelude::*;

use crate::errors::MerchLedgerError;
use crate::state::{DiscountKind, Variant, BPS_DENOMINATOR};

/// A balance lookup that may fail. `None` means the source erred and the
/// caller should treat the balance as unknown, not as zero-and-final.
pub trait BalanceProbe {
    fn try_balance(&self, owner: &Pubkey, mint: &Pubkey) -> Option<u64>;
}

/// Final unit price for `buyer` on `variant`.
///
/// Percentage discounts from both families accumulate additively; a stacked
/// total at or past 100% makes the item free rather than erroring. Fixed
/// discounts apply after the percentage reduction and are capped at zero.
/// Holding tiers are probed through `holding_probes` in order, falling back
/// to the next probe only when the previous one errs; if every probe errs
/// the tier is skipped.
pub fn quote(
    variant: &Variant,
    buyer: &Pubkey,
    badge_probe: &dyn BalanceProbe,
    holding_probes: &[&dyn BalanceProbe],
) -> Result<u64> {
    let base = variant.price;
    if base == 0 {
        return Ok(0);
    }

    let mut pct_bps: u64 = 0;
    let mut fixed_off: u64 = 0;

    for tier in variant.badge_tiers.iter().filter(|t| t.active) {
        let held = badge_probe
            .try_balance(buyer, &tier.badge_mint)
            .unwrap_or(0);
        if held > 0 {
            pct_bps = pct_bps
                .checked_add(tier.discount_bps as u64)
                .ok_or(MerchLedgerError::ArithmeticOverflow)?;
        }
    }

    for tier in variant.holding_tiers.iter().filter(|t| t.active) {
        let mut balance = None;
        for probe in holding_probes {
            if let Some(held) = probe.try_balance(buyer, &tier.holding_mint) {
                balance = Some(held);
                break;
            }
        }
        // Every probe erred: skip the tier instead of aborting the quote
        let Some(held) = balance else { continue };
        if held == 0 {
            continue;
        }
        match tier.kind {
            DiscountKind::Percentage => {
                pct_bps = pct_bps
                    .checked_add(tier.value)
                    .ok_or(MerchLedgerError::ArithmeticOverflow)?;
            }
            DiscountKind::Fixed => {
                fixed_off = fixed_off
                    .checked_add(tier.value)
                    .ok_or(MerchLedgerError::ArithmeticOverflow)?;
            }
        }
    }

    if pct_bps >= BPS_DENOMINATOR {
        return Ok(0);
    }

    let off = ((base as u128) * (pct_bps as u128) / BPS_DENOMINATOR as u128) as u64;
    let after_pct = base - off;
    Ok(after_pct.saturating_sub(fixed_off))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    /// Probe backed by an in-memory (owner, mint) -> balance table; pairs
    /// not in the table read as zero
    struct TableProbe {
        balances: BTreeMap<(Pubkey, Pubkey), u64>,
    }

    impl TableProbe {
        fn new(entries: &[(Pubkey, Pubkey, u64)]) -> Self {
            Self {
                balances: entries
                    .iter()
                    .map(|(owner, mint, held)| ((*owner, *mint), *held))
                    .collect(),
            }
        }
    }

    impl BalanceProbe for TableProbe {
        fn try_balance(&self, owner: &Pubkey, mint: &Pubkey) -> Option<u64> {
            Some(self.balances.get(&(*owner, *mint)).copied().unwrap_or(0))
        }
    }

    /// Probe whose every lookup errs
    struct BrokenProbe;

    impl BalanceProbe for BrokenProbe {
        fn try_balance(&self, _owner: &Pubkey, _mint: &Pubkey) -> Option<u64> {
            None
        }
    }

    fn priced_variant(price: u64) -> Variant {
        Variant {
            price,
            max_supply: 100,
            active: true,
            ..Default::default()
        }
    }

    #[test]
    fn badge_discount_applies_when_badge_is_held() {
        // price 100, one badge tier 10%, buyer holds the badge
        let buyer = Pubkey::new_unique();
        let badge = Pubkey::new_unique();
        let mut v = priced_variant(100);
        v.add_badge_tier(badge, 1_000).unwrap();

        let badges = TableProbe::new(&[(buyer, badge, 1)]);
        assert_eq!(quote(&v, &buyer, &badges, &[]).unwrap(), 90);
    }

    #[test]
    fn missing_badge_means_full_price() {
        // buyer lacks the gating badge
        let buyer = Pubkey::new_unique();
        let mut v = priced_variant(100);
        v.add_badge_tier(Pubkey::new_unique(), 2_000).unwrap();

        let badges = TableProbe::new(&[]);
        assert_eq!(quote(&v, &buyer, &badges, &[]).unwrap(), 100);
    }

    #[test]
    fn families_stack_additively() {
        // 10% badge + 20% holding -> 70
        let buyer = Pubkey::new_unique();
        let badge = Pubkey::new_unique();
        let held = Pubkey::new_unique();
        let mut v = priced_variant(100);
        v.add_badge_tier(badge, 1_000).unwrap();
        v.add_holding_tier(held, DiscountKind::Percentage, 2_000)
            .unwrap();

        let badges = TableProbe::new(&[(buyer, badge, 1)]);
        let holdings = TableProbe::new(&[(buyer, held, 3)]);
        assert_eq!(quote(&v, &buyer, &badges, &[&holdings]).unwrap(), 70);
    }

    #[test]
    fn stacked_100_percent_is_free() {
        // 50% + 50% -> 0
        let buyer = Pubkey::new_unique();
        let badge = Pubkey::new_unique();
        let held = Pubkey::new_unique();
        let mut v = priced_variant(100);
        v.add_badge_tier(badge, 5_000).unwrap();
        v.add_holding_tier(held, DiscountKind::Percentage, 5_000)
            .unwrap();

        let badges = TableProbe::new(&[(buyer, badge, 1)]);
        let holdings = TableProbe::new(&[(buyer, held, 1)]);
        assert_eq!(quote(&v, &buyer, &badges, &[&holdings]).unwrap(), 0);
    }

    #[test]
    fn over_100_percent_caps_at_free_without_error() {
        // 60% + 60% -> 0, not an error
        let buyer = Pubkey::new_unique();
        let badge = Pubkey::new_unique();
        let held = Pubkey::new_unique();
        let mut v = priced_variant(100);
        v.add_badge_tier(badge, 6_000).unwrap();
        v.add_holding_tier(held, DiscountKind::Percentage, 6_000)
            .unwrap();

        let badges = TableProbe::new(&[(buyer, badge, 1)]);
        let holdings = TableProbe::new(&[(buyer, held, 1)]);
        assert_eq!(quote(&v, &buyer, &badges, &[&holdings]).unwrap(), 0);

        // And a fixed tier on top changes nothing
        v.add_holding_tier(Pubkey::new_unique(), DiscountKind::Fixed, 40)
            .unwrap();
        assert_eq!(quote(&v, &buyer, &badges, &[&holdings]).unwrap(), 0);
    }

    #[test]
    fn fixed_discount_applies_after_percentage_and_caps_at_zero() {
        let buyer = Pubkey::new_unique();
        let badge = Pubkey::new_unique();
        let held = Pubkey::new_unique();
        let mut v = priced_variant(100);
        v.add_badge_tier(badge, 1_000).unwrap();
        v.add_holding_tier(held, DiscountKind::Fixed, 30).unwrap();

        let badges = TableProbe::new(&[(buyer, badge, 1)]);
        let holdings = TableProbe::new(&[(buyer, held, 1)]);
        // 100 - 10% = 90, minus 30 fixed = 60
        assert_eq!(quote(&v, &buyer, &badges, &[&holdings]).unwrap(), 60);

        // A fixed discount larger than the remainder floors at zero
        v.holding_tiers[0].value = 1_000;
        assert_eq!(quote(&v, &buyer, &badges, &[&holdings]).unwrap(), 0);
    }

    #[test]
    fn free_items_short_circuit_before_any_probing() {
        let buyer = Pubkey::new_unique();
        let mut v = priced_variant(0);
        v.add_badge_tier(Pubkey::new_unique(), 1_000).unwrap();
        assert_eq!(quote(&v, &buyer, &BrokenProbe, &[]).unwrap(), 0);
    }

    #[test]
    fn inactive_tiers_are_skipped() {
        let buyer = Pubkey::new_unique();
        let badge = Pubkey::new_unique();
        let held = Pubkey::new_unique();
        let mut v = priced_variant(100);
        v.add_badge_tier(badge, 1_000).unwrap();
        v.add_holding_tier(held, DiscountKind::Percentage, 2_000)
            .unwrap();
        v.set_badge_tier_active(0, false).unwrap();
        v.set_holding_tier_active(0, false).unwrap();

        let badges = TableProbe::new(&[(buyer, badge, 1)]);
        let holdings = TableProbe::new(&[(buyer, held, 1)]);
        assert_eq!(quote(&v, &buyer, &badges, &[&holdings]).unwrap(), 100);
    }

    #[test]
    fn erring_oracles_degrade_to_ineligible() {
        let buyer = Pubkey::new_unique();
        let mut v = priced_variant(100);
        v.add_badge_tier(Pubkey::new_unique(), 5_000).unwrap();
        v.add_holding_tier(Pubkey::new_unique(), DiscountKind::Percentage, 5_000)
            .unwrap();

        // Both oracle families unreachable: full price, no error
        let r = quote(&v, &buyer, &BrokenProbe, &[&BrokenProbe, &BrokenProbe]);
        assert_eq!(r.unwrap(), 100);
    }

    #[test]
    fn holding_probes_fall_back_only_on_error() {
        let buyer = Pubkey::new_unique();
        let held = Pubkey::new_unique();
        let mut v = priced_variant(100);
        v.add_holding_tier(held, DiscountKind::Percentage, 2_000)
            .unwrap();

        // First probe errs, second answers: discount applies
        let second = TableProbe::new(&[(buyer, held, 1)]);
        let badges = TableProbe::new(&[]);
        assert_eq!(
            quote(&v, &buyer, &badges, &[&BrokenProbe, &second]).unwrap(),
            80
        );

        // First probe answers zero: no fallback, no discount
        let first = TableProbe::new(&[]);
        assert_eq!(
            quote(&v, &buyer, &badges, &[&first, &second]).unwrap(),
            100
        );
    }

    #[test]
    fn quote_is_monotonic_in_stacked_percentage() {
        let buyer = Pubkey::new_unique();
        let badges = TableProbe::new(&[]);
        let mut last = u64::MAX;
        for bps in [0u64, 1_000, 2_500, 5_000, 9_999, 10_000, 12_000] {
            let mut v = priced_variant(1_000);
            if bps > 0 {
                v.add_holding_tier(Pubkey::new_unique(), DiscountKind::Percentage, bps.min(10_000))
                    .unwrap();
                if bps > 10_000 {
                    v.add_holding_tier(Pubkey::new_unique(), DiscountKind::Percentage, bps - 10_000)
                        .unwrap();
                }
            }
            let entries: Vec<_> = v
                .holding_tiers
                .iter()
                .map(|t| (buyer, t.holding_mint, 1))
                .collect();
            let holdings = TableProbe::new(&entries);
            let price = quote(&v, &buyer, &badges, &[&holdings]).unwrap();
            assert!(price <= last);
            last = price;
        }
        assert_eq!(last, 0);
    }

    #[test]
    fn fixed_discount_sum_overflow_is_reported() {
        let buyer = Pubkey::new_unique();
        let a = Pubkey::new_unique();
        let b = Pubkey::new_unique();
        let mut v = priced_variant(100);
        v.add_holding_tier(a, DiscountKind::Fixed, u64::MAX).unwrap();
        v.add_holding_tier(b, DiscountKind::Fixed, 1).unwrap();

        let badges = TableProbe::new(&[]);
        let holdings = TableProbe::new(&[(buyer, a, 1), (buyer, b, 1)]);
        assert_eq!(
            quote(&v, &buyer, &badges, &[&holdings]).unwrap_err(),
            MerchLedgerError::ArithmeticOverflow.into()
        );
    }
}
