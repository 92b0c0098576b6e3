//! Display formatting for card values

/// Integer balance in chain units, trailing zeros trimmed:
/// `format_balance(1_500_000_000_000, 12) == "1.5"`
pub fn format_balance(value: u128, decimals: u8) -> String {
    let digits = value.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }

    let (whole, fraction) = if digits.len() > decimals {
        let split = digits.len() - decimals;
        (digits[..split].to_string(), digits[split..].to_string())
    } else {
        ("0".to_string(), format!("{:0>width$}", digits, width = decimals))
    };

    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        whole
    } else {
        format!("{}.{}", whole, fraction)
    }
}

/// Printable UTF-8 view of a byte string, if it has one
pub fn printable_text(bytes: &[u8]) -> Option<String> {
    let text = std::str::from_utf8(bytes).ok()?;
    if text.is_empty() || text.chars().any(|c| c.is_control() && c != '\n' && c != '\t') {
        return None;
    }
    Some(text.to_string())
}

pub fn hex_string(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_balance() {
        assert_eq!(format_balance(1_500_000_000_000, 12), "1.5");
        assert_eq!(format_balance(1_000_000_000_000, 12), "1");
        assert_eq!(format_balance(1_500_000_000, 12), "0.0015");
        assert_eq!(format_balance(0, 12), "0");
        assert_eq!(format_balance(42, 0), "42");
        assert_eq!(format_balance(u128::MAX, 18), "340282366920938463463.374607431768211455");
    }

    #[test]
    fn test_printable_text() {
        assert_eq!(printable_text(b"hello"), Some("hello".to_string()));
        assert_eq!(printable_text(&[0xff, 0xfe]), None);
        assert_eq!(printable_text(&[0x00, 0x01]), None);
        assert_eq!(printable_text(b""), None);
    }
}
