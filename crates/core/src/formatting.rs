//! Amount formatting shared by chat messages and recap records.

use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds half away from zero and prints exactly `dp` decimals: `1500.00`.
pub fn fixed(value: Decimal, dp: u32) -> String {
    let rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    format!("{rounded:.prec$}", prec = dp as usize)
}

/// Same as [`fixed`] with `,` thousands grouping: `1,540,000.00`.
pub fn grouped(value: Decimal, dp: u32) -> String {
    let plain = fixed(value, dp);
    let (sign, unsigned) = match plain.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", plain.as_str()),
    };
    let (integer, fraction) = match unsigned.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (unsigned, None),
    };

    let mut out = String::with_capacity(plain.len() + integer.len() / 3);
    out.push_str(sign);
    for (index, digit) in integer.chars().enumerate() {
        if index > 0 && (integer.len() - index) % 3 == 0 {
            out.push(',');
        }
        out.push(digit);
    }
    if let Some(fraction) = fraction {
        out.push('.');
        out.push_str(fraction);
    }
    out
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{fixed, grouped};

    #[test]
    fn fixed_pads_and_rounds_half_away_from_zero() {
        assert_eq!(fixed(Decimal::from(1500), 2), "1500.00");
        assert_eq!(fixed(Decimal::new(12345, 3), 2), "12.35");
        assert_eq!(fixed(Decimal::new(-12345, 3), 2), "-12.35");
        assert_eq!(fixed(Decimal::new(2_000_000_000, 6), 0), "2000");
    }

    #[test]
    fn grouped_inserts_thousands_separators() {
        assert_eq!(grouped(Decimal::from(1_540_000), 2), "1,540,000.00");
        assert_eq!(grouped(Decimal::from(375_000), 2), "375,000.00");
        assert_eq!(grouped(Decimal::from(999), 2), "999.00");
        assert_eq!(grouped(Decimal::from(20_000_000), 0), "20,000,000");
        assert_eq!(grouped(Decimal::from(-1_234), 0), "-1,234");
    }
}
