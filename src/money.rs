use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use separator::{separated_float, separated_int, separated_uint_with_output};

/// Round to pence, half-up on the scaled value (so `-0.005` rounds to `0.00`).
pub fn round2(amount: Decimal) -> Decimal {
    let pence = (amount * dec!(100) + dec!(0.5)).floor();
    (pence / dec!(100)).normalize()
}

/// Drop any fractional part, rounding toward zero.
pub fn truncate(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(0, RoundingStrategy::ToZero)
}

pub fn format_gbp(amount: Decimal) -> String {
    let rounded = round2(amount);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let text = format!("{:.2}", rounded.abs());
    let text = match text.strip_suffix(".00") {
        Some(whole) => whole.to_string(),
        None => text,
    };
    format!("{sign}£{}", separated_float!(text))
}
