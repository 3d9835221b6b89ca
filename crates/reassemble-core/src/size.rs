//! Size threshold parsing.

use crate::ReassembleError;
use crate::Result;

const KIB: u64 = 1024;

/// Parses a size string into bytes.
///
/// Accepts digits with an optional `K`, `M` or `G` suffix (case-insensitive),
/// meaning ×1024, ×1024² and ×1024³. A decimal fraction such as `1.5M` is
/// accepted and truncated to whole bytes.
///
/// # Errors
///
/// Returns `ReassembleError::InvalidSizeFormat` for empty input, unknown
/// suffixes, non-numeric characters or values that overflow `u64`.
///
/// # Examples
///
/// ```
/// use reassemble_core::parse_size;
///
/// assert_eq!(parse_size("512").unwrap(), 512);
/// assert_eq!(parse_size("100M").unwrap(), 104_857_600);
/// assert_eq!(parse_size("1g").unwrap(), 1_073_741_824);
/// assert!(parse_size("abc").is_err());
/// ```
pub fn parse_size(input: &str) -> Result<u64> {
    let invalid = || ReassembleError::InvalidSizeFormat {
        input: input.to_string(),
    };

    let s = input.trim();
    let (digits, multiplier) = match s.as_bytes().last() {
        None => return Err(invalid()),
        Some(b'k' | b'K') => (&s[..s.len() - 1], KIB),
        Some(b'm' | b'M') => (&s[..s.len() - 1], KIB.pow(2)),
        Some(b'g' | b'G') => (&s[..s.len() - 1], KIB.pow(3)),
        Some(_) => (s, 1),
    };

    let (whole, fraction) = match digits.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (digits, None),
    };

    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let whole_bytes = whole
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .ok_or_else(invalid)?;

    let Some(fraction) = fraction else {
        return Ok(whole_bytes);
    };
    if fraction.is_empty() || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    // Fractional part in exact integer arithmetic, truncated toward zero.
    let mut scale: u128 = 1;
    let mut numerator: u128 = 0;
    for digit in fraction.bytes().take(18) {
        numerator = numerator * 10 + u128::from(digit - b'0');
        scale *= 10;
    }
    let fraction_bytes = u64::try_from(numerator * u128::from(multiplier) / scale)
        .map_err(|_| invalid())?;

    whole_bytes.checked_add(fraction_bytes).ok_or_else(invalid)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size_suffixes() {
        assert_eq!(parse_size("512").unwrap(), 512);
        assert_eq!(parse_size("1K").unwrap(), 1024);
        assert_eq!(parse_size("100M").unwrap(), 104_857_600);
        assert_eq!(parse_size("1G").unwrap(), 1_073_741_824);
    }

    #[test]
    fn test_parse_size_case_insensitive() {
        assert_eq!(parse_size("10k").unwrap(), 10 * 1024);
        assert_eq!(parse_size("2m").unwrap(), 2 * 1024 * 1024);
        assert_eq!(parse_size("1g").unwrap(), 1024 * 1024 * 1024);
    }

    #[test]
    fn test_parse_size_fraction() {
        assert_eq!(parse_size("1.5M").unwrap(), 1_572_864);
        assert_eq!(parse_size("0.5K").unwrap(), 512);
        assert_eq!(parse_size("2.0").unwrap(), 2);
    }

    #[test]
    fn test_parse_size_invalid() {
        for input in ["abc", "", "M", "10T", "-1", "1.M", ".5K", "1 0", "1.2.3G"] {
            assert!(
                matches!(
                    parse_size(input),
                    Err(ReassembleError::InvalidSizeFormat { .. })
                ),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_size_overflow() {
        assert!(parse_size("18446744073709551615K").is_err());
        assert!(parse_size("17592186044416G").is_err());
        assert_eq!(parse_size("18446744073709551615").unwrap(), u64::MAX);
    }
}
