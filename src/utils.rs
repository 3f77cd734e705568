use rust_decimal::prelude::*;

/// Native ETH decimals
pub const NATIVE_DECIMALS: u32 = 18;

/// Check for a `0x`-prefixed 20-byte hex address
pub fn is_valid_address(address: &str) -> bool {
    let Some(hex) = address.strip_prefix("0x").or_else(|| address.strip_prefix("0X")) else {
        return false;
    };
    hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit())
}

/// Trim and lower-case an address; `None` if it is not a valid address
pub fn normalize_address(address: &str) -> Option<String> {
    let trimmed = address.trim();
    if is_valid_address(trimmed) {
        Some(trimmed.to_ascii_lowercase())
    } else {
        None
    }
}

/// Scale a raw integer amount (wei, token base units) into token units
///
/// Returns `None` when the raw string is not an integer or the result
/// does not fit in a `Decimal`.
pub fn scale_raw_amount(raw: &str, decimals: u32) -> Option<Decimal> {
    let raw = raw.trim();
    let units: i128 = if let Some(hex) = raw.strip_prefix("0x") {
        i128::from_str_radix(hex, 16).ok()?
    } else {
        raw.parse().ok()?
    };
    if units < 0 || decimals > 28 {
        return None;
    }
    Decimal::try_from_i128_with_scale(units, decimals)
        .ok()
        .map(|d| d.normalize())
}
