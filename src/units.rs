//! Address and key validation, unit formatting and revert-reason parsing.

use std::sync::LazyLock;

use alloy::primitives::U256;
use regex::Regex;
use serde::Serialize;

pub const ETHER_DECIMALS: u32 = 18;
pub const GWEI_DECIMALS: u32 = 9;

/// Check that an address is `0x` followed by 40 hex characters, in any case.
pub fn validate_address(address: &str) -> bool {
    address
        .strip_prefix("0x")
        .is_some_and(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Check that a private key is 64 hex characters, with or without `0x`.
pub fn validate_private_key(key: &str) -> bool {
    let clean_key = key.strip_prefix("0x").unwrap_or(key);
    clean_key.len() == 64 && clean_key.chars().all(|c| c.is_ascii_hexdigit())
}

/// Format a base-unit amount with `decimals` decimals to a fixed number of
/// places, rounding half up.
pub fn format_units_fixed(value: U256, decimals: u32, places: u32) -> String {
    let ten = U256::from(10u8);

    let scaled = if places >= decimals {
        value * ten.pow(U256::from(places - decimals))
    } else {
        let scale = ten.pow(U256::from(decimals - places));
        (value + scale / U256::from(2u8)) / scale
    };

    if places == 0 {
        return scaled.to_string();
    }

    let denom = ten.pow(U256::from(places));
    let int_part = scaled / denom;
    let frac_part = (scaled % denom).to_string();
    format!("{}.{:0>width$}", int_part, frac_part, width = places as usize)
}

fn units_to_f64(value: U256, decimals: u32) -> f64 {
    format_units_fixed(value, decimals, decimals)
        .parse()
        .unwrap_or(f64::MAX)
}

/// Wei to ether, e.g. `1000000000000000000` with 4 decimals is `"1.0000"`.
pub fn format_wei_to_ether(wei: U256, decimals: u32) -> String {
    format_units_fixed(wei, ETHER_DECIMALS, decimals)
}

/// Wei to ether as a float, for threshold comparisons and display.
pub fn wei_to_ether(wei: U256) -> f64 {
    units_to_f64(wei, ETHER_DECIMALS)
}

/// Gas price in wei to a `"20.00 gwei"` style string.
pub fn format_gas_price(gas_price_wei: u128) -> String {
    format!(
        "{} gwei",
        format_units_fixed(U256::from(gas_price_wei), GWEI_DECIMALS, 2)
    )
}

/// Cost of a transaction at a given gas limit and price.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionCost {
    pub gas_limit: u64,
    pub gas_price_gwei: f64,
    pub total_eth: f64,
    pub total_wei: U256,
}

pub fn estimate_transaction_cost(gas_limit: u64, gas_price_wei: u128) -> TransactionCost {
    let total_wei = U256::from(gas_limit) * U256::from(gas_price_wei);

    TransactionCost {
        gas_limit,
        gas_price_gwei: units_to_f64(U256::from(gas_price_wei), GWEI_DECIMALS),
        total_eth: units_to_f64(total_wei, ETHER_DECIMALS),
        total_wei,
    }
}

static REVERT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)execution reverted: (.+?)(?:, data:|\n|$)",
        r"(?i)VM Exception while processing transaction: revert (.+?)(?:, data:|\n|$)",
        r"(?i)revert: (.+?)(?:, data:|\n|$)",
        r"(?i)reason string '(.+?)'",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

/// Extract a human-readable revert reason from a node or client error message.
///
/// Returns `None` when no known phrasing matches; custom error selectors are
/// not decoded.
pub fn parse_revert_reason(message: &str) -> Option<String> {
    REVERT_PATTERNS.iter().find_map(|re| {
        re.captures(message)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|reason| !reason.is_empty())
    })
}

/// Human-readable duration: `45s`, `2m 5s`, `1h 1m`.
pub fn format_time_remaining(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    }
}

/// Keep the first `head` and last `tail` characters of a secret.
pub fn redact(secret: &str, head: usize, tail: usize) -> String {
    if secret.is_empty() {
        return String::new();
    }
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= head + tail {
        return "***".to_string();
    }
    let start: String = chars[..head].iter().collect();
    let end: String = chars[chars.len() - tail..].iter().collect();
    format!("{}...{}", start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_address_valid() {
        let valid = [
            format!("0x{}", "1".repeat(40)),
            format!("0x{}", "A".repeat(40)),
            format!("0x{}", "aB".repeat(20)),
            "0x742d35Cc6634C0532925a3b844Bc9e7595f0F0fa".to_string(),
            "0x5aAeb6053f3E94C9b9A09f33669435E7Ef1BeAed".to_string(),
        ];
        for address in &valid {
            assert!(validate_address(address), "{} should be valid", address);
        }
    }

    #[test]
    fn test_validate_address_invalid() {
        let invalid = [
            String::new(),
            "0x".to_string(),
            format!("0x{}", "1".repeat(39)),
            format!("0x{}", "1".repeat(41)),
            "1".repeat(40),
            format!("0x{}", "G".repeat(40)),
            "not_an_address".to_string(),
            format!("0X{}", "1".repeat(40)),
        ];
        for address in &invalid {
            assert!(!validate_address(address), "{} should be invalid", address);
        }
    }

    #[test]
    fn test_validate_private_key() {
        assert!(validate_private_key(&"1".repeat(64)));
        assert!(validate_private_key(&format!("0x{}", "deadbeef".repeat(8))));
        assert!(validate_private_key(&format!("{}aAbB", "aAbBcCdDeEfF".repeat(5))));

        assert!(!validate_private_key(""));
        assert!(!validate_private_key("0x"));
        assert!(!validate_private_key(&"1".repeat(63)));
        assert!(!validate_private_key(&"1".repeat(65)));
        assert!(!validate_private_key(&"G".repeat(64)));
        assert!(!validate_private_key(&format!("0xzzzz{}", "1".repeat(60))));
    }

    #[test]
    fn test_format_wei_to_ether() {
        let one_eth = U256::from(1_000_000_000_000_000_000u128);
        assert_eq!(format_wei_to_ether(one_eth, 4), "1.0000");
        assert_eq!(format_wei_to_ether(U256::from(1_500_000_000_000_000_000u128), 2), "1.50");
        assert_eq!(format_wei_to_ether(U256::ZERO, 4), "0.0000");
        // 0.00005 ether rounds up at four places
        assert_eq!(format_wei_to_ether(U256::from(50_000_000_000_000u128), 4), "0.0001");
    }

    #[test]
    fn test_format_gas_price() {
        assert_eq!(format_gas_price(20_000_000_000), "20.00 gwei");
        assert_eq!(format_gas_price(1_500_000_000), "1.50 gwei");
    }

    #[test]
    fn test_estimate_transaction_cost() {
        let cost = estimate_transaction_cost(150_000, 20_000_000_000);
        assert_eq!(cost.total_eth, 0.003);
        assert_eq!(cost.gas_price_gwei, 20.0);
        assert_eq!(cost.total_wei, U256::from(3_000_000_000_000_000u128));
        assert_eq!(cost.gas_limit, 150_000);
    }

    #[test]
    fn test_parse_revert_reason() {
        assert_eq!(
            parse_revert_reason("execution reverted: Max supply reached"),
            Some("Max supply reached".to_string())
        );
        assert_eq!(
            parse_revert_reason("VM Exception while processing transaction: revert Mint not live\nstack"),
            Some("Mint not live".to_string())
        );
        assert_eq!(
            parse_revert_reason("Error: reverted with reason string 'Invalid proof'"),
            Some("Invalid proof".to_string())
        );
        assert_eq!(
            parse_revert_reason(r#"execution reverted: Sold out, data: "0x08c379a0""#),
            Some("Sold out".to_string())
        );
        assert_eq!(parse_revert_reason("insufficient funds for gas * price + value"), None);
    }

    #[test]
    fn test_format_time_remaining() {
        assert_eq!(format_time_remaining(45), "45s");
        assert_eq!(format_time_remaining(125), "2m 5s");
        assert_eq!(format_time_remaining(3660), "1h 1m");
    }

    #[test]
    fn test_redact() {
        assert_eq!(redact("0x1234567890abcdef", 6, 4), "0x1234...cdef");
        assert_eq!(redact("short", 6, 4), "***");
        assert_eq!(redact("", 6, 4), "");
    }
}
