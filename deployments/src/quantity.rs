//! Conversion of cluster resource quantities into the `i32` domain used by
//! environment statistics.
//!
//! A quantity is parsed into an exact decimal that keeps the digits as they
//! were written: `500m` becomes mantissa 500 with scale 3. Integral values are
//! used as-is; fractional ones fall back to their unscaled mantissa, which
//! turns milli-unit quantities into milli-unit integers.

use crate::error::{DeploymentsError, DeploymentsResult};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

const MAX_SCALE: u32 = 28;

pub fn quantity_to_i32(quantity: &Quantity) -> DeploymentsResult<i32> {
    let value = parse_quantity(quantity)?;
    match decimal_as_i64(&value) {
        Some(value) => i64_to_i32(value),
        None => decimal_to_i32(&value),
    }
}

/// Converts using the unscaled mantissa of `value`.
pub fn decimal_to_i32(value: &Decimal) -> DeploymentsResult<i32> {
    let unscaled = value
        .mantissa()
        .to_i64()
        .ok_or_else(|| DeploymentsError::QuantityNotRepresentable(value.to_string()))?;
    i64_to_i32(unscaled)
}

pub fn i64_to_i32(value: i64) -> DeploymentsResult<i32> {
    i32::try_from(value).map_err(|_| DeploymentsError::Int32Overflow(value))
}

/// The exact `i64` value of `value`, if it is integral and in range
pub fn decimal_as_i64(value: &Decimal) -> Option<i64> {
    if value.fract().is_zero() {
        value.trunc().to_i64()
    } else {
        None
    }
}

pub fn parse_quantity(quantity: &Quantity) -> DeploymentsResult<Decimal> {
    let raw = quantity.0.trim();
    let invalid = || DeploymentsError::InvalidQuantity(quantity.0.clone());

    let (negative, unsigned) = match raw.as_bytes().first() {
        Some(b'-') => (true, &raw[1..]),
        Some(b'+') => (false, &raw[1..]),
        _ => (false, raw),
    };

    let number_len = unsigned
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(unsigned.len());
    let (number, suffix) = unsigned.split_at(number_len);

    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    if (whole.is_empty() && fraction.is_empty()) || fraction.contains('.') {
        return Err(invalid());
    }

    let mut mantissa: i128 = 0;
    for digit in whole.bytes().chain(fraction.bytes()) {
        mantissa = mantissa
            .checked_mul(10)
            .and_then(|m| m.checked_add(i128::from(digit - b'0')))
            .ok_or_else(invalid)?;
    }
    if negative {
        mantissa = -mantissa;
    }
    let scale = u32::try_from(fraction.len()).map_err(|_| invalid())?;

    match parse_suffix(suffix).ok_or_else(invalid)? {
        Suffix::Binary(shift) => {
            let base = Decimal::try_from_i128_with_scale(mantissa, scale).map_err(|_| invalid())?;
            base.checked_mul(Decimal::from(1u64 << shift))
                .ok_or_else(invalid)
        }
        Suffix::Decimal(exponent) if exponent < 0 => {
            let scale = scale + exponent.unsigned_abs();
            if scale > MAX_SCALE {
                return Err(invalid());
            }
            Decimal::try_from_i128_with_scale(mantissa, scale).map_err(|_| invalid())
        }
        Suffix::Decimal(exponent) => {
            let base = Decimal::try_from_i128_with_scale(mantissa, scale).map_err(|_| invalid())?;
            let multiplier = 10i64
                .checked_pow(exponent.unsigned_abs())
                .ok_or_else(invalid)?;
            base.checked_mul(Decimal::from(multiplier))
                .ok_or_else(invalid)
        }
    }
}

enum Suffix {
    Binary(u32),
    Decimal(i32),
}

fn parse_suffix(suffix: &str) -> Option<Suffix> {
    Some(match suffix {
        "Ki" => Suffix::Binary(10),
        "Mi" => Suffix::Binary(20),
        "Gi" => Suffix::Binary(30),
        "Ti" => Suffix::Binary(40),
        "Pi" => Suffix::Binary(50),
        "Ei" => Suffix::Binary(60),
        "n" => Suffix::Decimal(-9),
        "u" => Suffix::Decimal(-6),
        "m" => Suffix::Decimal(-3),
        "" => Suffix::Decimal(0),
        "k" => Suffix::Decimal(3),
        "M" => Suffix::Decimal(6),
        "G" => Suffix::Decimal(9),
        "T" => Suffix::Decimal(12),
        "P" => Suffix::Decimal(15),
        "E" => Suffix::Decimal(18),
        exponent => {
            let digits = exponent
                .strip_prefix('e')
                .or_else(|| exponent.strip_prefix('E'))?;
            Suffix::Decimal(digits.parse().ok()?)
        }
    })
}
