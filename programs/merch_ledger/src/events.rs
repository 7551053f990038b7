//! Event definitions for the merchandise ledger

use anchor_lang::prelude::*;

use crate::state::{DiscountKind, RedemptionStatus};

/// Event emitted when a variant record is created or overwritten
#[event]
pub struct VariantUpserted {
    /// The variant key
    pub variant_id: u64,
    /// Unit price in payment-mint base units
    pub price: u64,
    /// Supply cap
    pub max_supply: u64,
    /// Whether the variant is purchasable
    pub active: bool,
}

/// Event emitted when a royalty recipient is appended to a variant
#[event]
pub struct RoyaltyRecipientAdded {
    /// The variant key
    pub variant_id: u64,
    /// The recipient of the royalty share
    pub recipient: Pubkey,
    /// Share in basis points
    pub share_bps: u16,
    /// Running royalty total for the variant after the append
    pub total_bps: u16,
}

/// Event emitted when a variant's royalty tiers are cleared
#[event]
pub struct RoyaltiesCleared {
    /// The variant key
    pub variant_id: u64,
    /// Number of tiers removed
    pub removed: u32,
}

/// Event emitted when a badge discount tier is appended
#[event]
pub struct BadgeTierAdded {
    /// The variant key
    pub variant_id: u64,
    /// The badge mint gating the discount
    pub badge_mint: Pubkey,
    /// Discount in basis points
    pub discount_bps: u16,
}

/// Event emitted when a badge discount tier is swap-removed
#[event]
pub struct BadgeTierRemoved {
    /// The variant key
    pub variant_id: u64,
    /// Index of the removed tier (surviving order is not preserved)
    pub index: u32,
}

/// Event emitted when a badge discount tier is toggled
#[event]
pub struct BadgeTierToggled {
    /// The variant key
    pub variant_id: u64,
    /// Index of the toggled tier
    pub index: u32,
    /// Whether the tier now participates in quotes
    pub active: bool,
}

/// Event emitted when a holding discount tier is appended
#[event]
pub struct HoldingTierAdded {
    /// The variant key
    pub variant_id: u64,
    /// The held mint gating the discount
    pub holding_mint: Pubkey,
    /// Percentage or fixed
    pub kind: DiscountKind,
    /// Basis points for Percentage, payment units for Fixed
    pub value: u64,
}

/// Event emitted when a holding discount tier is swap-removed
#[event]
pub struct HoldingTierRemoved {
    /// The variant key
    pub variant_id: u64,
    /// Index of the removed tier (surviving order is not preserved)
    pub index: u32,
}

/// Event emitted when a holding discount tier is toggled
#[event]
pub struct HoldingTierToggled {
    /// The variant key
    pub variant_id: u64,
    /// Index of the toggled tier
    pub index: u32,
    /// Whether the tier now participates in quotes
    pub active: bool,
}

/// Event emitted for each completed single purchase
#[event]
pub struct PurchaseCompleted {
    /// The buyer
    pub buyer: Pubkey,
    /// The variant key
    pub variant_id: u64,
    /// Units purchased
    pub quantity: u64,
    /// Discounted per-unit price paid
    pub unit_price: u64,
    /// Total paid across royalties and treasury
    pub total: u64,
}

/// Event emitted once per completed batch purchase
#[event]
pub struct BatchPurchaseCompleted {
    /// The buyer
    pub buyer: Pubkey,
    /// Number of line items in the batch
    pub lines: u32,
    /// Sum of all line totals
    pub grand_total: u64,
}

/// Event emitted when an owner requests physical fulfillment
#[event]
pub struct RedemptionRequested {
    /// The variant key
    pub variant_id: u64,
    /// The owner requesting fulfillment
    pub owner: Pubkey,
}

/// Event emitted when the administrator marks a redemption fulfilled
#[event]
pub struct RedemptionFulfilled {
    /// The variant key
    pub variant_id: u64,
    /// The owner whose request was fulfilled
    pub owner: Pubkey,
    /// Status after the transition
    pub status: RedemptionStatus,
}
