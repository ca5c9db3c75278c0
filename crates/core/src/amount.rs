//! Token amounts.
//!
//! Every balance is an integer count of micro-units so reward splits stay exact and summable.

/// Amount in micro-units.
pub type Amount = u64;

/// Decimal places of one token.
pub const DECIMALS: u32 = 6;

/// Micro-units per whole token.
pub const UNIT: Amount = 1_000_000;

/// Whole tokens to micro-units, saturating.
pub const fn tokens(whole: u64) -> Amount {
    whole.saturating_mul(UNIT)
}

/// `amount * numerator / denominator` computed in 128 bits, rounded down.
///
/// Returns 0 when `denominator` is 0.
pub fn mul_div(amount: Amount, numerator: u128, denominator: u128) -> Amount {
    if denominator == 0 {
        return 0;
    }
    let value = (amount as u128).saturating_mul(numerator) / denominator;
    value.min(Amount::MAX as u128) as Amount
}

/// Render as `whole.fraction`, e.g. `1005000.000000`.
pub fn format_amount(amount: Amount) -> String {
    format!(
        "{}.{:0width$}",
        amount / UNIT,
        amount % UNIT,
        width = DECIMALS as usize
    )
}
