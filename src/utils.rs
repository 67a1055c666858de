//! Utility functions for the gatt-central crate.

/// Format bytes as space-separated uppercase hex.
///
/// # Example
///
/// ```
/// use gatt_central::utils::format_hex;
///
/// assert_eq!(format_hex(&[0x01, 0xAB, 0xFF]), "01 AB FF");
/// assert_eq!(format_hex(&[]), "");
/// ```
pub fn format_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse a hex string into bytes.
///
/// Whitespace, `:` and `-` separators are ignored. Returns `None` on an odd
/// digit count or a non-hex character.
///
/// # Example
///
/// ```
/// use gatt_central::utils::parse_hex;
///
/// assert_eq!(parse_hex("01 ab:FF"), Some(vec![0x01, 0xAB, 0xFF]));
/// assert_eq!(parse_hex("0"), None);
/// ```
pub fn parse_hex(text: &str) -> Option<Vec<u8>> {
    let digits: Vec<u8> = text
        .bytes()
        .filter(|b| !b.is_ascii_whitespace() && *b != b':' && *b != b'-')
        .collect();
    if digits.len() % 2 != 0 || !digits.iter().all(u8::is_ascii_hexdigit) {
        return None;
    }

    digits
        .chunks(2)
        .map(|pair| {
            let pair = std::str::from_utf8(pair).ok()?;
            u8::from_str_radix(pair, 16).ok()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_hex() {
        assert_eq!(format_hex(&[0x00]), "00");
        assert_eq!(format_hex(&[0x02, 0x15, 0xBB]), "02 15 BB");
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex(""), Some(vec![]));
        assert_eq!(parse_hex("0215"), Some(vec![0x02, 0x15]));
        assert_eq!(parse_hex("aa-bb-cc"), Some(vec![0xAA, 0xBB, 0xCC]));
        assert_eq!(parse_hex("zz"), None);
        assert_eq!(parse_hex("abc"), None);
    }

    #[test]
    fn test_hex_roundtrip() {
        let record = [0x4C, 0x00, 0x02, 0x15];
        assert_eq!(parse_hex(&format_hex(&record)), Some(record.to_vec()));
    }

    #[test]
    fn test_parse_hex_rejects_signs() {
        assert_eq!(parse_hex("+1"), None);
        assert_eq!(parse_hex("0x"), None);
        assert_eq!(parse_hex("4C:00"), Some(vec![0x4C, 0x00]));
    }
}
