//! Capacity quantity parsing.
//!
//! Pool capacities are declared as Kubernetes-style quantity strings. Only the
//! subset the control plane accounts with is understood:
//!
//! | Suffix | Meaning |
//! |--------|---------|
//! | none   | plain integer |
//! | `Ki`, `Mi`, `Gi`, `Ti` | binary multipliers (1024^n) |
//! | `m`    | milli-units, truncated to whole units |

use crate::error::{CoreError, Result};

const BINARY_SUFFIXES: [(&str, i64); 4] = [
    ("Ki", 1 << 10),
    ("Mi", 1 << 20),
    ("Gi", 1 << 30),
    ("Ti", 1 << 40),
];

/// Parse a quantity string such as `"100"`, `"16Gi"` or `"500m"` into whole units.
///
/// Milli-unit values are divided by 1000 with integer truncation, so `"500m"`
/// parses to `0` and `"2500m"` to `2`.
///
/// # Errors
///
/// Returns [`CoreError::EmptyQuantity`] for blank input and
/// [`CoreError::InvalidQuantity`] when the numeric portion is not a
/// non-negative integer or the scaled value overflows.
pub fn parse_resource_value(value: &str) -> Result<i64> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CoreError::EmptyQuantity);
    }

    for (suffix, multiplier) in BINARY_SUFFIXES {
        if let Some(number) = value.strip_suffix(suffix) {
            return parse_integer(value, number)?
                .checked_mul(multiplier)
                .ok_or_else(|| invalid(value, "value overflows"));
        }
    }

    if let Some(number) = value.strip_suffix('m') {
        return Ok(parse_integer(value, number)? / 1000);
    }

    parse_integer(value, value)
}

fn parse_integer(original: &str, number: &str) -> Result<i64> {
    let parsed: i64 = number
        .parse()
        .map_err(|e: std::num::ParseIntError| invalid(original, &e.to_string()))?;
    if parsed < 0 {
        return Err(invalid(original, "negative quantities are not allowed"));
    }
    Ok(parsed)
}

fn invalid(value: &str, reason: &str) -> CoreError {
    CoreError::InvalidQuantity {
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
