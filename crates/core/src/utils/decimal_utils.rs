use rust_decimal::Decimal;

use crate::constants::DECIMAL_PRECISION;

/// Rounds a stored valuation figure to `DECIMAL_PRECISION` places.
pub fn round_valuation(value: Decimal) -> Decimal {
    value.round_dp(DECIMAL_PRECISION)
}

/// `numerator / denominator`, or zero when the denominator is not positive.
pub fn ratio_or_zero(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator > Decimal::ZERO {
        numerator / denominator
    } else {
        Decimal::ZERO
    }
}

/// Percentage of `part` over `base`, zero when `base` is zero.
pub fn percentage_of(part: Decimal, base: Decimal) -> Decimal {
    if base.is_zero() {
        Decimal::ZERO
    } else {
        part / base * Decimal::ONE_HUNDRED
    }
}
