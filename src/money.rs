//! Money arithmetic
//!
//! All balances, prices and order amounts are `Decimal` with two fractional
//! digits, stored as `NUMERIC(14, 2)`. Amounts coming from clients are
//! validated here before they reach the database.

use rust_decimal::prelude::*;
use thiserror::Error;

/// Fractional digits for every stored amount
pub const MONEY_SCALE: u32 = 2;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error, PartialEq)]
pub enum MoneyError {
    #[error("Precision overflow: provided {provided} decimals, max allowed {max}")]
    PrecisionOverflow { provided: u32, max: u32 },

    #[error("Amount must be positive")]
    InvalidAmount,

    #[error("Amount too large, would overflow")]
    Overflow,
}

/// Round half away from zero to `MONEY_SCALE` digits
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Validate a client-supplied amount: strictly positive, at most two decimals.
pub fn parse_amount(value: Decimal) -> Result<Decimal, MoneyError> {
    if value <= Decimal::ZERO {
        return Err(MoneyError::InvalidAmount);
    }
    let normalized = value.normalize();
    if normalized.scale() > MONEY_SCALE {
        return Err(MoneyError::PrecisionOverflow {
            provided: normalized.scale(),
            max: MONEY_SCALE,
        });
    }
    Ok(round_money(value))
}

/// `unit_price × period_months × quantity`, rounded to cents
pub fn line_amount(
    unit_price: Decimal,
    period_months: u32,
    quantity: u32,
) -> Result<Decimal, MoneyError> {
    let total = unit_price
        .checked_mul(Decimal::from(period_months))
        .and_then(|v| v.checked_mul(Decimal::from(quantity)))
        .ok_or(MoneyError::Overflow)?;
    Ok(round_money(total))
}

/// Final amount charged after discount; never negative.
pub fn pay_amount(amount: Decimal, discount: Decimal) -> Decimal {
    round_money((amount - discount).max(Decimal::ZERO))
}
