//! Balance probes over SPL token accounts
//!
//! Eligibility reads come from token accounts the caller supplies as
//! remaining accounts. Two lookup conventions are tried in order: the
//! buyer's canonical associated token account, then a scan of every
//! supplied account. Anything missing, foreign-owned, or undecodable reads
//! as a probe error, which the discount engine degrades to "ineligible".

use anchor_lang::prelude::*;
use anchor_lang::solana_program::program_pack::Pack;
use anchor_spl::associated_token::get_associated_token_address;
use anchor_spl::token::spl_token;

use crate::pricing::BalanceProbe;

fn read_token_amount(info: &AccountInfo, owner: &Pubkey, mint: &Pubkey) -> Option<u64> {
    if info.owner != &spl_token::ID {
        return None;
    }
    let data = info.try_borrow_data().ok()?;
    let account = spl_token::state::Account::unpack(&data).ok()?;
    (account.owner == *owner && account.mint == *mint).then_some(account.amount)
}

/// Find a supplied token account holding `mint` for `owner`
pub(crate) fn find_token_account<'a, 'info>(
    accounts: &'a [AccountInfo<'info>],
    owner: &Pubkey,
    mint: &Pubkey,
) -> Option<&'a AccountInfo<'info>> {
    accounts
        .iter()
        .find(|info| read_token_amount(info, owner, mint).is_some())
}

/// Associated-token-address convention: derive the canonical ATA and look
/// it up among the supplied accounts
pub struct AtaProbe<'a, 'info> {
    accounts: &'a [AccountInfo<'info>],
}

impl<'a, 'info> AtaProbe<'a, 'info> {
    pub fn new(accounts: &'a [AccountInfo<'info>]) -> Self {
        Self { accounts }
    }
}

impl BalanceProbe for AtaProbe<'_, '_> {
    fn try_balance(&self, owner: &Pubkey, mint: &Pubkey) -> Option<u64> {
        let ata = get_associated_token_address(owner, mint);
        let info = self.accounts.iter().find(|info| info.key == &ata)?;
        read_token_amount(info, owner, mint)
    }
}

/// Scan convention: accept any supplied token account matching the owner
/// and mint, canonical or not
pub struct ScanProbe<'a, 'info> {
    accounts: &'a [AccountInfo<'info>],
}

impl<'a, 'info> ScanProbe<'a, 'info> {
    pub fn new(accounts: &'a [AccountInfo<'info>]) -> Self {
        Self { accounts }
    }
}

impl BalanceProbe for ScanProbe<'_, '_> {
    fn try_balance(&self, owner: &Pubkey, mint: &Pubkey) -> Option<u64> {
        self.accounts
            .iter()
            .find_map(|info| read_token_amount(info, owner, mint))
    }
}
