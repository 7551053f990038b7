//! Merchandise Inventory & Dynamic Pricing Ledger
//!
//! This program implements a merchandise ledger with:
//! - An admin-managed variant registry (price, supply cap, active flag)
//! - Stacked badge/holding discount tiers resolved at purchase time
//! - Atomic royalty splitting with the remainder routed to a treasury
//! - Single and batch purchases over an SPL-token payment rail
//! - A three-state physical-redemption workflow per (variant, owner)

use anchor_lang::prelude::*;
use anchor_spl::token::{self, Mint, Token, TokenAccount, Transfer};

pub mod errors;
pub mod events;
pub mod oracle;
pub mod pricing;
pub mod purchase;
pub mod state;

use errors::MerchLedgerError;
use events::*;
use oracle::{AtaProbe, ScanProbe};
use purchase::{LineRequest, PaymentRail};
use state::*;

declare_id!("Fg6PaFpoGXkYsidMpWTK6W2BeZ7FEfcYkg476zPFp1J6");

#[program]
pub mod merch_ledger {
    use super::*;

    /// Create the singleton ledger with its admin, treasury, and payment
    /// mint
    pub fn initialize(ctx: Context<Initialize>) -> Result<()> {
        let ledger = &mut ctx.accounts.ledger;
        ledger.admin = ctx.accounts.admin.key();
        ledger.treasury = ctx.accounts.treasury.key();
        ledger.payment_mint = ctx.accounts.payment_mint.key();
        ledger.busy = false;
        ledger.bump = ctx.bumps.ledger;
        Ok(())
    }

    /// Create or overwrite a variant record; `minted` is never reset and
    /// the cap may not drop below it
    pub fn upsert_variant(
        ctx: Context<AdminOp>,
        variant_id: u64,
        price: u64,
        max_supply: u64,
        active: bool,
        uri: String,
    ) -> Result<()> {
        let ledger = &mut ctx.accounts.ledger;
        ledger.upsert_variant(variant_id, price, max_supply, active, uri)?;
        emit!(VariantUpserted {
            variant_id,
            price,
            max_supply,
            active,
        });
        Ok(())
    }

    /// Append a royalty share for a variant, keeping the running total
    /// strictly below 100%
    pub fn add_royalty_recipient(
        ctx: Context<AdminOp>,
        variant_id: u64,
        recipient: Pubkey,
        share_bps: u16,
    ) -> Result<()> {
        let ledger = &mut ctx.accounts.ledger;
        let variant = ledger.variant_mut(variant_id)?;
        variant.add_royalty_recipient(recipient, share_bps)?;
        let total_bps = variant.royalty_total_bps;
        emit!(RoyaltyRecipientAdded {
            variant_id,
            recipient,
            share_bps,
            total_bps,
        });
        Ok(())
    }

    /// Remove every royalty tier of a variant
    pub fn clear_royalties(ctx: Context<AdminOp>, variant_id: u64) -> Result<()> {
        let ledger = &mut ctx.accounts.ledger;
        let removed = ledger.variant_mut(variant_id)?.clear_royalties();
        emit!(RoyaltiesCleared {
            variant_id,
            removed,
        });
        Ok(())
    }

    /// Append a badge-gated percentage discount tier
    pub fn add_badge_tier(
        ctx: Context<AdminOp>,
        variant_id: u64,
        badge_mint: Pubkey,
        discount_bps: u16,
    ) -> Result<()> {
        let ledger = &mut ctx.accounts.ledger;
        ledger
            .variant_mut(variant_id)?
            .add_badge_tier(badge_mint, discount_bps)?;
        emit!(BadgeTierAdded {
            variant_id,
            badge_mint,
            discount_bps,
        });
        Ok(())
    }

    /// Swap-remove a badge tier by index; surviving tier order is not
    /// preserved
    pub fn remove_badge_tier(ctx: Context<AdminOp>, variant_id: u64, index: u32) -> Result<()> {
        let ledger = &mut ctx.accounts.ledger;
        ledger.variant_mut(variant_id)?.remove_badge_tier(index as usize)?;
        emit!(BadgeTierRemoved { variant_id, index });
        Ok(())
    }

    /// Toggle a badge tier's participation in quotes
    pub fn set_badge_tier_active(
        ctx: Context<AdminOp>,
        variant_id: u64,
        index: u32,
        active: bool,
    ) -> Result<()> {
        let ledger = &mut ctx.accounts.ledger;
        ledger
            .variant_mut(variant_id)?
            .set_badge_tier_active(index as usize, active)?;
        emit!(BadgeTierToggled {
            variant_id,
            index,
            active,
        });
        Ok(())
    }

    /// Append a holding-gated percentage-or-fixed discount tier
    pub fn add_holding_tier(
        ctx: Context<AdminOp>,
        variant_id: u64,
        holding_mint: Pubkey,
        kind: DiscountKind,
        value: u64,
    ) -> Result<()> {
        let ledger = &mut ctx.accounts.ledger;
        ledger
            .variant_mut(variant_id)?
            .add_holding_tier(holding_mint, kind, value)?;
        emit!(HoldingTierAdded {
            variant_id,
            holding_mint,
            kind,
            value,
        });
        Ok(())
    }

    /// Swap-remove a holding tier by index; surviving tier order is not
    /// preserved
    pub fn remove_holding_tier(ctx: Context<AdminOp>, variant_id: u64, index: u32) -> Result<()> {
        let ledger = &mut ctx.accounts.ledger;
        ledger
            .variant_mut(variant_id)?
            .remove_holding_tier(index as usize)?;
        emit!(HoldingTierRemoved { variant_id, index });
        Ok(())
    }

    /// Toggle a holding tier's participation in quotes
    pub fn set_holding_tier_active(
        ctx: Context<AdminOp>,
        variant_id: u64,
        index: u32,
        active: bool,
    ) -> Result<()> {
        let ledger = &mut ctx.accounts.ledger;
        ledger
            .variant_mut(variant_id)?
            .set_holding_tier_active(index as usize, active)?;
        emit!(HoldingTierToggled {
            variant_id,
            index,
            active,
        });
        Ok(())
    }

    /// Purchase `quantity` units of one variant at the discounted price.
    ///
    /// Remaining accounts: royalty recipients' and the treasury's token
    /// accounts for the payment mint, plus any badge/holding token accounts
    /// of the buyer for discount eligibility.
    pub fn buy<'info>(
        ctx: Context<'_, '_, '_, 'info, Buy<'info>>,
        variant_id: u64,
        quantity: u64,
    ) -> Result<()> {
        require!(!ctx.accounts.ledger.busy, MerchLedgerError::ReentrantCall);
        ctx.accounts.ledger.busy = true;

        let buyer = ctx.accounts.buyer.key();
        let badge_probe = ScanProbe::new(ctx.remaining_accounts);
        let ata_probe = AtaProbe::new(ctx.remaining_accounts);
        let scan_probe = ScanProbe::new(ctx.remaining_accounts);
        let mut rail = SplRail {
            token_program: ctx.accounts.token_program.to_account_info(),
            from: ctx.accounts.buyer_token.to_account_info(),
            authority: ctx.accounts.buyer.to_account_info(),
            payment_mint: ctx.accounts.ledger.payment_mint,
            candidates: ctx.remaining_accounts,
        };

        let outcome = purchase::execute(
            &mut ctx.accounts.ledger,
            &buyer,
            &[LineRequest {
                variant_id,
                quantity,
            }],
            &badge_probe,
            &[&ata_probe, &scan_probe],
            &mut rail,
        )?;

        emit!(PurchaseCompleted {
            buyer,
            variant_id,
            quantity,
            unit_price: outcome.lines[0].unit_price,
            total: outcome.grand_total,
        });
        ctx.accounts.ledger.busy = false;
        Ok(())
    }

    /// Purchase several variants in one all-or-nothing batch. Every line is
    /// validated and paid before any line is minted.
    pub fn buy_batch<'info>(
        ctx: Context<'_, '_, '_, 'info, Buy<'info>>,
        variant_ids: Vec<u64>,
        quantities: Vec<u64>,
    ) -> Result<()> {
        require!(!ctx.accounts.ledger.busy, MerchLedgerError::ReentrantCall);
        ctx.accounts.ledger.busy = true;

        let buyer = ctx.accounts.buyer.key();
        let requests = purchase::zip_requests(&variant_ids, &quantities)?;
        let badge_probe = ScanProbe::new(ctx.remaining_accounts);
        let ata_probe = AtaProbe::new(ctx.remaining_accounts);
        let scan_probe = ScanProbe::new(ctx.remaining_accounts);
        let mut rail = SplRail {
            token_program: ctx.accounts.token_program.to_account_info(),
            from: ctx.accounts.buyer_token.to_account_info(),
            authority: ctx.accounts.buyer.to_account_info(),
            payment_mint: ctx.accounts.ledger.payment_mint,
            candidates: ctx.remaining_accounts,
        };

        let outcome = purchase::execute(
            &mut ctx.accounts.ledger,
            &buyer,
            &requests,
            &badge_probe,
            &[&ata_probe, &scan_probe],
            &mut rail,
        )?;

        emit!(BatchPurchaseCompleted {
            buyer,
            lines: outcome.lines.len() as u32,
            grand_total: outcome.grand_total,
        });
        ctx.accounts.ledger.busy = false;
        Ok(())
    }

    /// Owner-initiated request for physical fulfillment of a purchased
    /// item
    pub fn request_redemption(ctx: Context<RequestRedemption>, variant_id: u64) -> Result<()> {
        let ledger = &mut ctx.accounts.ledger;
        require!(!ledger.busy, MerchLedgerError::ReentrantCall);
        ledger.busy = true;

        let owner = ctx.accounts.owner.key();
        ledger.request_redemption(variant_id, &owner)?;
        emit!(RedemptionRequested { variant_id, owner });
        msg!("Redemption requested: variant {} owner {}", variant_id, owner);

        ledger.busy = false;
        Ok(())
    }

    /// Admin-initiated completion of a pending redemption; the ownership
    /// credit stays with the owner as proof of purchase
    pub fn mark_fulfilled(ctx: Context<AdminOp>, variant_id: u64, owner: Pubkey) -> Result<()> {
        let ledger = &mut ctx.accounts.ledger;
        require!(!ledger.busy, MerchLedgerError::ReentrantCall);
        ledger.busy = true;

        ledger.mark_fulfilled(variant_id, &owner)?;
        emit!(RedemptionFulfilled {
            variant_id,
            owner,
            status: RedemptionStatus::Fulfilled,
        });
        msg!("Redemption fulfilled: variant {} owner {}", variant_id, owner);

        ledger.busy = false;
        Ok(())
    }

    /// Final discounted unit price for a prospective buyer. Pure read;
    /// remaining accounts carry the buyer's badge/holding token accounts.
    pub fn quote(ctx: Context<ViewLedger>, variant_id: u64, buyer: Pubkey) -> Result<u64> {
        let ledger = &ctx.accounts.ledger;
        let variant = ledger.variant(variant_id)?;
        let badge_probe = ScanProbe::new(ctx.remaining_accounts);
        let ata_probe = AtaProbe::new(ctx.remaining_accounts);
        let scan_probe = ScanProbe::new(ctx.remaining_accounts);
        pricing::quote(variant, &buyer, &badge_probe, &[&ata_probe, &scan_probe])
    }

    /// Units still purchasable for a variant. Pure read.
    pub fn remaining(ctx: Context<ViewLedger>, variant_id: u64) -> Result<u64> {
        ctx.accounts.ledger.remaining(variant_id)
    }

    /// Redemption status for a (variant, owner) pair. Pure read.
    pub fn get_redemption_status(
        ctx: Context<ViewLedger>,
        variant_id: u64,
        owner: Pubkey,
    ) -> Result<RedemptionStatus> {
        Ok(ctx.accounts.ledger.redemption_status(variant_id, &owner))
    }
}

/// SPL-token payment rail: one transfer CPI per payout, pulling from the
/// buyer's token account. Payee token accounts are resolved from the
/// remaining accounts; a missing account or failed CPI aborts the purchase.
struct SplRail<'a, 'info> {
    token_program: AccountInfo<'info>,
    from: AccountInfo<'info>,
    authority: AccountInfo<'info>,
    payment_mint: Pubkey,
    candidates: &'a [AccountInfo<'info>],
}

impl PaymentRail for SplRail<'_, '_> {
    fn transfer_from(&mut self, _payer: &Pubkey, payee: &Pubkey, amount: u64) -> Result<()> {
        let to = oracle::find_token_account(self.candidates, payee, &self.payment_mint)
            .ok_or(MerchLedgerError::ExternalFailure)?;
        token::transfer(
            CpiContext::new(
                self.token_program.clone(),
                Transfer {
                    from: self.from.clone(),
                    to: to.clone(),
                    authority: self.authority.clone(),
                },
            ),
            amount,
        )
        .map_err(|_| error!(MerchLedgerError::ExternalFailure))
    }
}

#[derive(Accounts)]
pub struct Initialize<'info> {
    #[account(mut)]
    pub admin: Signer<'info>,

    /// CHECK: stored as the payout destination identity; its token account
    /// is validated per transfer
    pub treasury: UncheckedAccount<'info>,

    /// The mint all purchases are paid in
    pub payment_mint: Account<'info, Mint>,

    #[account(
        init,
        payer = admin,
        space = Ledger::SPACE,
        seeds = [Ledger::SEED],
        bump,
    )]
    pub ledger: Account<'info, Ledger>,

    pub system_program: Program<'info, System>,
}

/// Accounts for every admin-gated configuration or fulfillment instruction
#[derive(Accounts)]
pub struct AdminOp<'info> {
    pub admin: Signer<'info>,

    #[account(
        mut,
        seeds = [Ledger::SEED],
        bump = ledger.bump,
        constraint = ledger.admin == admin.key() @ MerchLedgerError::Unauthorized,
    )]
    pub ledger: Account<'info, Ledger>,
}

#[derive(Accounts)]
pub struct Buy<'info> {
    #[account(mut)]
    pub buyer: Signer<'info>,

    /// The buyer's payment token account; every payout pulls from it
    #[account(
        mut,
        constraint = buyer_token.owner == buyer.key() @ MerchLedgerError::InvalidArgument,
        constraint = buyer_token.mint == ledger.payment_mint @ MerchLedgerError::InvalidArgument,
    )]
    pub buyer_token: Account<'info, TokenAccount>,

    #[account(
        mut,
        seeds = [Ledger::SEED],
        bump = ledger.bump,
    )]
    pub ledger: Account<'info, Ledger>,

    pub token_program: Program<'info, Token>,
}

#[derive(Accounts)]
pub struct RequestRedemption<'info> {
    pub owner: Signer<'info>,

    #[account(
        mut,
        seeds = [Ledger::SEED],
        bump = ledger.bump,
    )]
    pub ledger: Account<'info, Ledger>,
}

#[derive(Accounts)]
pub struct ViewLedger<'info> {
    #[account(
        seeds = [Ledger::SEED],
        bump = ledger.bump,
    )]
    pub ledger: Account<'info, Ledger>,
}
