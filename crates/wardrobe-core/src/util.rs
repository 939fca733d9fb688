//! Shared utility functions used across multiple modules.

/// Normalize optional text by trimming whitespace and removing empties.
///
/// Returns `None` when the input is `None` or the trimmed value is empty.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Check if a string starts with `http://` or `https://`.
pub fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Truncate text to at most 180 characters for error messages.
pub fn compact_text(value: &str) -> String {
    value.trim().chars().take(180).collect()
}

/// Format a byte count as KiB with two decimals, e.g. `195.31`.
#[allow(clippy::cast_precision_loss)]
pub fn format_kib(bytes: u64) -> String {
    format!("{:.2}", bytes as f64 / 1024.0)
}

/// Format a size limit in KiB, whole when it divides evenly (`750`)
/// and with two decimals otherwise (`1465.21`).
pub fn format_kib_limit(bytes: u64) -> String {
    if bytes % 1024 == 0 {
        (bytes / 1024).to_string()
    } else {
        format_kib(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_option_rejects_empty() {
        assert_eq!(normalize_text_option(None), None);
        assert_eq!(normalize_text_option(Some("   ".to_string())), None);
    }

    #[test]
    fn normalize_text_option_trims_value() {
        assert_eq!(
            normalize_text_option(Some(" Blue Shirt ".to_string())),
            Some("Blue Shirt".to_string())
        );
    }

    #[test]
    fn is_http_url_accepts_valid_schemes() {
        assert!(is_http_url("http://localhost"));
        assert!(is_http_url("https://example.com"));
        assert!(!is_http_url("ftp://example.com"));
        assert!(!is_http_url("example.com"));
    }

    #[test]
    fn format_kib_uses_two_decimals() {
        assert_eq!(format_kib(200_000), "195.31");
        assert_eq!(format_kib(1024), "1.00");
        assert_eq!(format_kib(0), "0.00");
    }

    #[test]
    fn format_kib_limit_never_rounds_down_partial_kib() {
        assert_eq!(format_kib_limit(750 * 1024), "750");
        assert_eq!(format_kib_limit(1_500_375), "1465.21");
        assert_eq!(format_kib_limit(1_500), "1.46");
    }
}
