//! State definitions for the merchandise ledger
//!
//! The whole engine lives in a single `Ledger` PDA: the variant registry,
//! per-variant royalty and discount tier lists, and per-(variant, owner)
//! ownership credits with their redemption status.

use anchor_lang::prelude::*;
use std::collections::BTreeMap;

use crate::errors::MerchLedgerError;

/// Basis-point denominator (10_000 = 100%)
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Capacity bounds. [`Ledger::SPACE`] is derived from these, so a ledger
/// saturated to every bound still serializes into the fixed allocation and
/// the `CapacityExceeded` guards fire before serialization can fail.
pub const MAX_VARIANTS: usize = 8;
pub const MAX_ROYALTY_TIERS: usize = 4;
pub const MAX_BADGE_TIERS: usize = 4;
pub const MAX_HOLDING_TIERS: usize = 4;
pub const MAX_HOLDINGS: usize = 96;
pub const MAX_URI_LEN: usize = 96;

/// One royalty share: `(recipient, share in basis points)`
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq)]
pub struct RoyaltyTier {
    /// The recipient of this share
    pub recipient: Pubkey,
    /// Share in basis points, always > 0
    pub share_bps: u16,
}

impl RoyaltyTier {
    pub const SPACE: usize = 32 + 2;
}

/// Badge-gated percentage discount tier
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq)]
pub struct BadgeTier {
    /// Mint of the badge that gates this discount
    pub badge_mint: Pubkey,
    /// Discount in basis points, 0 < bps <= 10_000
    pub discount_bps: u16,
    /// Inactive tiers are skipped at quote time
    pub active: bool,
}

impl BadgeTier {
    pub const SPACE: usize = 32 + 2 + 1;
}

/// Whether a holding tier discounts by percentage or by a fixed amount
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiscountKind {
    Percentage,
    Fixed,
}

/// Holding-gated discount tier
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq)]
pub struct HoldingTier {
    /// Mint the buyer must hold to qualify
    pub holding_mint: Pubkey,
    /// Percentage or fixed
    pub kind: DiscountKind,
    /// Basis points for Percentage (0 < v <= 10_000); payment units for
    /// Fixed, capped against the price only at quote time
    pub value: u64,
    /// Inactive tiers are skipped at quote time
    pub active: bool,
}

impl HoldingTier {
    pub const SPACE: usize = 32 + 1 + 8 + 1;
}

/// Physical-fulfillment status for one (variant, owner) pair
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RedemptionStatus {
    #[default]
    NotRequested,
    PendingFulfillment,
    Fulfilled,
}

/// Ownership credit for one (variant, owner) pair
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, Default)]
pub struct Holding {
    /// Units credited through purchases; never revoked, even after
    /// fulfillment
    pub units: u64,
    /// Redemption lifecycle state
    pub redemption: RedemptionStatus,
}

impl Holding {
    pub const SPACE: usize = 8 + 1;
}

/// One purchasable product variant
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, Default)]
pub struct Variant {
    /// Unit price in payment-mint base units
    pub price: u64,
    /// Supply cap; may only be lowered to >= minted
    pub max_supply: u64,
    /// Units minted so far, minted <= max_supply always
    pub minted: u64,
    /// Inactive variants cannot be purchased
    pub active: bool,
    /// Metadata pointer
    pub uri: String,
    /// Ordered royalty shares, sum strictly < 10_000 bps
    pub royalty_tiers: Vec<RoyaltyTier>,
    /// Running total of royalty shares
    pub royalty_total_bps: u16,
    /// Badge-gated discount tiers
    pub badge_tiers: Vec<BadgeTier>,
    /// Holding-gated discount tiers
    pub holding_tiers: Vec<HoldingTier>,
}

impl Variant {
    /// Serialized size with every tier list and the uri at capacity
    pub const SPACE: usize = 8
        + 8
        + 8
        + 1
        + (4 + MAX_URI_LEN)
        + (4 + MAX_ROYALTY_TIERS * RoyaltyTier::SPACE)
        + 2
        + (4 + MAX_BADGE_TIERS * BadgeTier::SPACE)
        + (4 + MAX_HOLDING_TIERS * HoldingTier::SPACE);

    /// Units still available for purchase
    pub fn remaining(&self) -> u64 {
        self.max_supply.saturating_sub(self.minted)
    }

    /// Append a royalty share, keeping the running total strictly below 100%
    pub fn add_royalty_recipient(&mut self, recipient: Pubkey, share_bps: u16) -> Result<()> {
        require!(
            recipient != Pubkey::default(),
            MerchLedgerError::InvalidArgument
        );
        require!(share_bps > 0, MerchLedgerError::InvalidArgument);
        require!(
            self.royalty_tiers.len() < MAX_ROYALTY_TIERS,
            MerchLedgerError::CapacityExceeded
        );
        let new_total = self
            .royalty_total_bps
            .checked_add(share_bps)
            .ok_or(MerchLedgerError::ArithmeticOverflow)?;
        // Strictly less than 100% so a remainder always flows to the treasury
        require!(
            (new_total as u64) < BPS_DENOMINATOR,
            MerchLedgerError::InvalidArgument
        );
        self.royalty_tiers.push(RoyaltyTier {
            recipient,
            share_bps,
        });
        self.royalty_total_bps = new_total;
        Ok(())
    }

    /// Drop all royalty tiers and reset the running total
    pub fn clear_royalties(&mut self) -> u32 {
        let removed = self.royalty_tiers.len() as u32;
        self.royalty_tiers.clear();
        self.royalty_total_bps = 0;
        removed
    }

    /// Split `total` across the royalty tiers, remainder to the treasury.
    ///
    /// Each recipient gets floor(total * share_bps / 10_000); rounding dust
    /// stays with the treasury. The returned amounts plus the treasury
    /// amount always sum to `total` exactly.
    pub fn split_royalties(&self, total: u64) -> Result<(Vec<(Pubkey, u64)>, u64)> {
        let mut payouts = Vec::with_capacity(self.royalty_tiers.len());
        let mut paid: u64 = 0;
        for tier in &self.royalty_tiers {
            let amount = ((total as u128) * (tier.share_bps as u128) / BPS_DENOMINATOR as u128) as u64;
            paid = paid
                .checked_add(amount)
                .ok_or(MerchLedgerError::ArithmeticOverflow)?;
            payouts.push((tier.recipient, amount));
        }
        let treasury_amount = total
            .checked_sub(paid)
            .ok_or(MerchLedgerError::ArithmeticOverflow)?;
        Ok((payouts, treasury_amount))
    }

    pub fn add_badge_tier(&mut self, badge_mint: Pubkey, discount_bps: u16) -> Result<()> {
        require!(
            discount_bps > 0 && (discount_bps as u64) <= BPS_DENOMINATOR,
            MerchLedgerError::InvalidArgument
        );
        require!(
            self.badge_tiers.len() < MAX_BADGE_TIERS,
            MerchLedgerError::CapacityExceeded
        );
        self.badge_tiers.push(BadgeTier {
            badge_mint,
            discount_bps,
            active: true,
        });
        Ok(())
    }

    /// Remove a badge tier by index. The last tier is swapped into the gap,
    /// so surviving indices are not stable across removals.
    pub fn remove_badge_tier(&mut self, index: usize) -> Result<()> {
        require!(
            index < self.badge_tiers.len(),
            MerchLedgerError::InvalidArgument
        );
        self.badge_tiers.swap_remove(index);
        Ok(())
    }

    pub fn set_badge_tier_active(&mut self, index: usize, active: bool) -> Result<()> {
        let tier = self
            .badge_tiers
            .get_mut(index)
            .ok_or(MerchLedgerError::InvalidArgument)?;
        tier.active = active;
        Ok(())
    }

    pub fn add_holding_tier(
        &mut self,
        holding_mint: Pubkey,
        kind: DiscountKind,
        value: u64,
    ) -> Result<()> {
        if kind == DiscountKind::Percentage {
            require!(
                value > 0 && value <= BPS_DENOMINATOR,
                MerchLedgerError::InvalidArgument
            );
        } else {
            // Fixed amounts are unbounded at write time and capped against
            // the price at quote time
            require!(value > 0, MerchLedgerError::InvalidArgument);
        }
        require!(
            self.holding_tiers.len() < MAX_HOLDING_TIERS,
            MerchLedgerError::CapacityExceeded
        );
        self.holding_tiers.push(HoldingTier {
            holding_mint,
            kind,
            value,
            active: true,
        });
        Ok(())
    }

    /// Remove a holding tier by index, with the same swap-remove reordering
    /// as [`Self::remove_badge_tier`].
    pub fn remove_holding_tier(&mut self, index: usize) -> Result<()> {
        require!(
            index < self.holding_tiers.len(),
            MerchLedgerError::InvalidArgument
        );
        self.holding_tiers.swap_remove(index);
        Ok(())
    }

    pub fn set_holding_tier_active(&mut self, index: usize, active: bool) -> Result<()> {
        let tier = self
            .holding_tiers
            .get_mut(index)
            .ok_or(MerchLedgerError::InvalidArgument)?;
        tier.active = active;
        Ok(())
    }
}

/// Singleton engine state
#[account]
pub struct Ledger {
    /// Administrator allowed to configure variants, royalties, discounts,
    /// and to fulfill redemptions
    pub admin: Pubkey,
    /// Receives every payment remainder after royalty shares
    pub treasury: Pubkey,
    /// Mint all purchases are paid in
    pub payment_mint: Pubkey,
    /// Operation-in-flight reentrancy guard
    pub busy: bool,
    /// Variant registry, keyed by an opaque admin-chosen id
    pub variants: BTreeMap<u64, Variant>,
    /// Ownership credits and redemption state per (variant, owner)
    pub holdings: BTreeMap<(u64, Pubkey), Holding>,
    /// Bump for the PDA
    pub bump: u8,
}

impl Ledger {
    pub const SEED: &'static [u8] = b"ledger";

    /// Allocation for a ledger saturated to every `MAX_*` bound, including
    /// the 8-byte discriminator. Must stay under the 10_240-byte limit of a
    /// single-transaction init.
    pub const SPACE: usize = 8
        + 32
        + 32
        + 32
        + 1
        + 1
        + (4 + MAX_VARIANTS * (8 + Variant::SPACE))
        + (4 + MAX_HOLDINGS * (8 + 32 + Holding::SPACE));

    pub fn variant(&self, variant_id: u64) -> Result<&Variant> {
        self.variants
            .get(&variant_id)
            .ok_or_else(|| error!(MerchLedgerError::InvalidArgument))
    }

    pub fn variant_mut(&mut self, variant_id: u64) -> Result<&mut Variant> {
        self.variants
            .get_mut(&variant_id)
            .ok_or_else(|| error!(MerchLedgerError::InvalidArgument))
    }

    /// Create or overwrite a variant record. `minted` survives an overwrite,
    /// and the cap may never drop below it.
    pub fn upsert_variant(
        &mut self,
        variant_id: u64,
        price: u64,
        max_supply: u64,
        active: bool,
        uri: String,
    ) -> Result<()> {
        require!(uri.len() <= MAX_URI_LEN, MerchLedgerError::InvalidArgument);
        if let Some(variant) = self.variants.get_mut(&variant_id) {
            require!(max_supply >= variant.minted, MerchLedgerError::InvalidState);
            variant.price = price;
            variant.max_supply = max_supply;
            variant.active = active;
            variant.uri = uri;
        } else {
            require!(
                self.variants.len() < MAX_VARIANTS,
                MerchLedgerError::CapacityExceeded
            );
            self.variants.insert(
                variant_id,
                Variant {
                    price,
                    max_supply,
                    active,
                    uri,
                    ..Default::default()
                },
            );
        }
        Ok(())
    }

    /// Units still available for purchase; supply-exhausted variants stay
    /// queryable forever
    pub fn remaining(&self, variant_id: u64) -> Result<u64> {
        Ok(self.variant(variant_id)?.remaining())
    }

    /// Units of `variant_id` credited to `owner`
    pub fn balance_of(&self, variant_id: u64, owner: &Pubkey) -> u64 {
        self.holdings
            .get(&(variant_id, *owner))
            .map(|h| h.units)
            .unwrap_or(0)
    }

    /// Credit purchased units to the buyer's ownership record
    pub fn credit(&mut self, variant_id: u64, owner: &Pubkey, quantity: u64) -> Result<()> {
        let key = (variant_id, *owner);
        if let Some(holding) = self.holdings.get_mut(&key) {
            holding.units = holding
                .units
                .checked_add(quantity)
                .ok_or(MerchLedgerError::ArithmeticOverflow)?;
        } else {
            require!(
                self.holdings.len() < MAX_HOLDINGS,
                MerchLedgerError::CapacityExceeded
            );
            self.holdings.insert(
                key,
                Holding {
                    units: quantity,
                    redemption: RedemptionStatus::NotRequested,
                },
            );
        }
        Ok(())
    }

    pub fn redemption_status(&self, variant_id: u64, owner: &Pubkey) -> RedemptionStatus {
        self.holdings
            .get(&(variant_id, *owner))
            .map(|h| h.redemption)
            .unwrap_or_default()
    }

    /// Owner-initiated NotRequested -> PendingFulfillment transition.
    /// Requires the owner to currently hold at least one unit.
    pub fn request_redemption(&mut self, variant_id: u64, owner: &Pubkey) -> Result<()> {
        let holding = self
            .holdings
            .get_mut(&(variant_id, *owner))
            .ok_or(MerchLedgerError::Unauthorized)?;
        require!(holding.units > 0, MerchLedgerError::Unauthorized);
        require!(
            holding.redemption == RedemptionStatus::NotRequested,
            MerchLedgerError::InvalidState
        );
        holding.redemption = RedemptionStatus::PendingFulfillment;
        Ok(())
    }

    /// Admin-initiated PendingFulfillment -> Fulfilled transition. The
    /// ownership credit is kept as a permanent proof of purchase.
    pub fn mark_fulfilled(&mut self, variant_id: u64, owner: &Pubkey) -> Result<()> {
        let holding = self
            .holdings
            .get_mut(&(variant_id, *owner))
            .ok_or(MerchLedgerError::InvalidState)?;
        require!(
            holding.redemption == RedemptionStatus::PendingFulfillment,
            MerchLedgerError::InvalidState
        );
        holding.redemption = RedemptionStatus::Fulfilled;
        Ok(())
    }
}
