//! Money is handled as integer minor units (cents) everywhere inside the
//! ledger. Decimal values only exist at the HTTP boundary, where they are
//! converted with a single rounding rule: half away from zero.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

pub type Amount = i64;

/// Number of decimal digits of the smallest currency unit.
pub const MINOR_UNIT_DIGITS: u32 = 2;

/// Number of decimal digits kept for split percentages.
pub const PERCENT_DIGITS: u32 = 4;

/// Largest accepted expense amount, in minor units.
pub const MAX_AMOUNT: Amount = 100_000_000_000_000;

/// Convert a decimal value to minor units, rounding half away from zero.
///
/// Returns `None` if the value does not fit in an [`Amount`].
pub fn to_minor_units(value: Decimal) -> Option<Amount> {
    value
        .round_dp_with_strategy(MINOR_UNIT_DIGITS, RoundingStrategy::MidpointAwayFromZero)
        .checked_mul(Decimal::ONE_HUNDRED)?
        .to_i64()
}

pub fn from_minor_units(amount: Amount) -> Decimal {
    Decimal::new(amount, MINOR_UNIT_DIGITS)
}

pub fn round_percent(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(PERCENT_DIGITS, RoundingStrategy::MidpointAwayFromZero)
}

/// Spread a signed `leftover` over `shares` round-robin, one minor unit at a
/// time, in the order the shares are given.
///
/// Callers pass the shares already sorted by ascending user id, so the result
/// is deterministic. A positive leftover may be larger than the number of
/// shares and wraps around. A negative leftover is only taken from shares that
/// are still positive.
pub fn distribute_remainder(mut shares: Vec<&mut Amount>, leftover: Amount) {
    if leftover == 0 {
        return;
    }

    if leftover > 0 {
        assert!(!shares.is_empty(), "no shares to hand the remainder to");
        let count = shares.len() as Amount;
        let (quota, extra) = (leftover / count, leftover % count);
        for (position, share) in shares.iter_mut().enumerate() {
            **share += quota + Amount::from((position as Amount) < extra);
        }
        return;
    }

    // Whole rounds are taken in one step, bounded by the smallest positive
    // share so that no share goes below zero.
    let mut excess = -leftover;
    while excess > 0 {
        let positive: Vec<Amount> = shares.iter().map(|s| **s).filter(|s| *s > 0).collect();
        assert!(!positive.is_empty(), "remainder is larger than the shares");
        let count = positive.len() as Amount;
        let smallest = positive.iter().copied().min().unwrap_or(1);
        let step = (excess / count).clamp(1, smallest);
        for share in shares.iter_mut().filter(|s| ***s > 0) {
            if excess == 0 {
                break;
            }
            let taken = step.min(excess);
            **share -= taken;
            excess -= taken;
        }
    }
}
