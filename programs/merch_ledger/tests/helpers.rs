//! Test helpers for the merchandise ledger
//!
//! The full purchase pipeline runs on the host by substituting the two
//! collaborator capabilities: balance probes backed by an in-memory table
//! and a payment rail that records every transfer.

use anchor_lang::prelude::*;
use std::collections::BTreeMap;

use merch_ledger::pricing::BalanceProbe;
use merch_ledger::purchase::PaymentRail;
use merch_ledger::state::Ledger;

/// Deterministic pubkey for testing
pub fn test_pubkey(seed: u8) -> Pubkey {
    Pubkey::new_from_array([seed; 32])
}

/// A fresh ledger with fixed admin/treasury/mint identities
pub fn test_ledger() -> Ledger {
    Ledger {
        admin: test_pubkey(0xAD),
        treasury: test_pubkey(0x7E),
        payment_mint: test_pubkey(0x01),
        busy: false,
        variants: BTreeMap::new(),
        holdings: BTreeMap::new(),
        bump: 255,
    }
}

/// Probe backed by an (owner, mint) -> balance table; absent pairs read as
/// zero
#[derive(Default)]
pub struct TableProbe {
    balances: BTreeMap<(Pubkey, Pubkey), u64>,
}

impl TableProbe {
    pub fn set(&mut self, owner: Pubkey, mint: Pubkey, amount: u64) {
        self.balances.insert((owner, mint), amount);
    }
}

impl BalanceProbe for TableProbe {
    fn try_balance(&self, owner: &Pubkey, mint: &Pubkey) -> Option<u64> {
        Some(self.balances.get(&(*owner, *mint)).copied().unwrap_or(0))
    }
}

/// Probe whose every lookup errs
pub struct BrokenProbe;

impl BalanceProbe for BrokenProbe {
    fn try_balance(&self, _owner: &Pubkey, _mint: &Pubkey) -> Option<u64> {
        None
    }
}

/// Payment rail that records `(payer, payee, amount)` per transfer and can
/// be told to fail the nth call
#[derive(Default)]
pub struct MockRail {
    pub calls: Vec<(Pubkey, Pubkey, u64)>,
    pub fail_at: Option<usize>,
}

impl MockRail {
    /// Total moved to one payee across all recorded calls
    pub fn paid_to(&self, payee: &Pubkey) -> u64 {
        self.calls
            .iter()
            .filter(|(_, to, _)| to == payee)
            .map(|(_, _, amount)| amount)
            .sum()
    }
}

impl PaymentRail for MockRail {
    fn transfer_from(&mut self, payer: &Pubkey, payee: &Pubkey, amount: u64) -> Result<()> {
        if self.fail_at == Some(self.calls.len()) {
            return Err(merch_ledger::errors::MerchLedgerError::ExternalFailure.into());
        }
        self.calls.push((*payer, *payee, amount));
        Ok(())
    }
}
