//! Purchase orchestration
//!
//! Single purchases and batches run through the same two-pass pipeline: a
//! staging pass validates every line and moves the money (royalty shares
//! plus the treasury remainder, all pulled from the buyer), and only after
//! every line has been validated and paid does the commit pass apply the
//! minted counters and ownership credits. A failure anywhere leaves the
//! ledger untouched, so a partially-applied batch can never be observed.

use anchor_lang::prelude::*;
use std::collections::BTreeMap;

use crate::errors::MerchLedgerError;
use crate::pricing::{self, BalanceProbe};
use crate::state::Ledger;

/// Value movement between parties. The on-chain implementation issues one
/// SPL transfer CPI per call; tests substitute a recorder.
pub trait PaymentRail {
    fn transfer_from(&mut self, payer: &Pubkey, payee: &Pubkey, amount: u64) -> Result<()>;
}

/// One requested purchase line
#[derive(Clone, Copy, Debug)]
pub struct LineRequest {
    pub variant_id: u64,
    pub quantity: u64,
}

/// A validated line awaiting commit
struct PendingLine {
    variant_id: u64,
    quantity: u64,
    unit_price: u64,
    line_total: u64,
    payouts: Vec<(Pubkey, u64)>,
    treasury_amount: u64,
}

/// One committed purchase line, as reported to the caller
#[derive(Clone, Copy, Debug)]
pub struct CommittedLine {
    pub variant_id: u64,
    pub quantity: u64,
    pub unit_price: u64,
    pub line_total: u64,
}

/// Result of a committed purchase
#[derive(Debug)]
pub struct PurchaseOutcome {
    pub lines: Vec<CommittedLine>,
    pub grand_total: u64,
}

/// Accumulates validated lines, then applies all mutations in one step.
///
/// Supply checks account for quantities already staged in this batch, so
/// duplicate lines for one variant cannot oversell it between passes.
#[derive(Default)]
struct BatchBuilder {
    pending: Vec<PendingLine>,
    staged_quantities: BTreeMap<u64, u64>,
    grand_total: u64,
}

impl BatchBuilder {
    fn stage(
        &mut self,
        ledger: &Ledger,
        buyer: &Pubkey,
        request: &LineRequest,
        badge_probe: &dyn BalanceProbe,
        holding_probes: &[&dyn BalanceProbe],
    ) -> Result<&PendingLine> {
        require!(request.quantity > 0, MerchLedgerError::InvalidArgument);
        let variant = ledger.variant(request.variant_id)?;
        require!(variant.active, MerchLedgerError::InvalidState);

        let staged = self
            .staged_quantities
            .get(&request.variant_id)
            .copied()
            .unwrap_or(0);
        let committed = variant
            .minted
            .checked_add(staged)
            .and_then(|m| m.checked_add(request.quantity))
            .ok_or(MerchLedgerError::ArithmeticOverflow)?;
        require!(committed <= variant.max_supply, MerchLedgerError::InvalidState);

        let unit_price = pricing::quote(variant, buyer, badge_probe, holding_probes)?;
        let line_total = unit_price
            .checked_mul(request.quantity)
            .ok_or(MerchLedgerError::ArithmeticOverflow)?;
        let (payouts, treasury_amount) = variant.split_royalties(line_total)?;

        self.grand_total = self
            .grand_total
            .checked_add(line_total)
            .ok_or(MerchLedgerError::ArithmeticOverflow)?;
        *self
            .staged_quantities
            .entry(request.variant_id)
            .or_insert(0) += request.quantity;
        self.pending.push(PendingLine {
            variant_id: request.variant_id,
            quantity: request.quantity,
            unit_price,
            line_total,
            payouts,
            treasury_amount,
        });
        Ok(self.pending.last().unwrap())
    }

    fn commit(self, ledger: &mut Ledger, buyer: &Pubkey) -> Result<PurchaseOutcome> {
        let mut lines = Vec::with_capacity(self.pending.len());
        for line in &self.pending {
            let variant = ledger.variant_mut(line.variant_id)?;
            variant.minted = variant
                .minted
                .checked_add(line.quantity)
                .ok_or(MerchLedgerError::ArithmeticOverflow)?;
            ledger.credit(line.variant_id, buyer, line.quantity)?;
            lines.push(CommittedLine {
                variant_id: line.variant_id,
                quantity: line.quantity,
                unit_price: line.unit_price,
                line_total: line.line_total,
            });
        }
        Ok(PurchaseOutcome {
            lines,
            grand_total: self.grand_total,
        })
    }
}

/// Pair up the parallel id/quantity arrays of a batch request
pub fn zip_requests(variant_ids: &[u64], quantities: &[u64]) -> Result<Vec<LineRequest>> {
    require!(
        variant_ids.len() == quantities.len(),
        MerchLedgerError::InvalidArgument
    );
    require!(!variant_ids.is_empty(), MerchLedgerError::InvalidArgument);
    Ok(variant_ids
        .iter()
        .zip(quantities)
        .map(|(&variant_id, &quantity)| LineRequest {
            variant_id,
            quantity,
        })
        .collect())
}

/// Validate, pay, and commit a purchase of one or more lines.
///
/// Pass 1 stages each line and pays it: one rail call per non-zero royalty
/// payout plus one for the treasury remainder (a zero line total makes no
/// rail calls). Pass 2 mints and credits. All rail traffic happens before
/// any ledger mutation.
pub fn execute(
    ledger: &mut Ledger,
    buyer: &Pubkey,
    requests: &[LineRequest],
    badge_probe: &dyn BalanceProbe,
    holding_probes: &[&dyn BalanceProbe],
    rail: &mut dyn PaymentRail,
) -> Result<PurchaseOutcome> {
    require!(!requests.is_empty(), MerchLedgerError::InvalidArgument);
    let treasury = ledger.treasury;

    let mut builder = BatchBuilder::default();
    for request in requests {
        let line = builder.stage(ledger, buyer, request, badge_probe, holding_probes)?;
        for (payee, amount) in line.payouts.clone() {
            if amount > 0 {
                rail.transfer_from(buyer, &payee, amount)?;
            }
        }
        if line.line_total > 0 {
            // Royalty totals are strictly below 100% and shares are floored,
            // so the remainder is never zero here
            let remainder = line.treasury_amount;
            rail.transfer_from(buyer, &treasury, remainder)?;
        }
    }

    builder.commit(ledger, buyer)
}
