/// Formats an integer with `,` between groups of three digits (12345 -> "12,345").
pub fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Parse a YouTube API count. Counts are transmitted as decimal strings.
pub fn parse_count(raw: Option<&str>) -> Option<u64> {
    raw.map(str::trim).unwrap_or("0").parse().ok()
}

/// Interpret an environment flag such as `CI=true` or `GITHUB_ACTIONS=1`.
pub fn is_truthy(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "" | "0" | "false" | "no" | "off"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thousands_separator() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1000), "1,000");
        assert_eq!(format_thousands(12345), "12,345");
        assert_eq!(format_thousands(1234567890), "1,234,567,890");
    }

    #[test]
    fn counts_parse_from_strings() {
        assert_eq!(parse_count(Some("42")), Some(42));
        assert_eq!(parse_count(None), Some(0));
        assert_eq!(parse_count(Some("n/a")), None);
    }

    #[test]
    fn truthy_flags() {
        assert!(is_truthy("true"));
        assert!(is_truthy("1"));
        assert!(!is_truthy("false"));
        assert!(!is_truthy(""));
        assert!(!is_truthy("0"));
    }
}
