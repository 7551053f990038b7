//! Error codes for the merchandise ledger

use anchor_lang::prelude::*;

#[error_code]
pub enum MerchLedgerError {
    #[msg("Invalid argument supplied to the instruction")]
    InvalidArgument,

    #[msg("Operation not permitted in the ledger's current state")]
    InvalidState,

    #[msg("Caller is not authorized for this operation")]
    Unauthorized,

    #[msg("Payment transfer failed - purchase aborted")]
    ExternalFailure,

    #[msg("Arithmetic overflow in price or payout calculation")]
    ArithmeticOverflow,

    #[msg("A ledger operation is already in flight")]
    ReentrantCall,

    #[msg("Ledger capacity exceeded")]
    CapacityExceeded,
}
