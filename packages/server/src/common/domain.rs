//! Syntactic validation for submitted domain names.

/// Maximum total length of a hostname per RFC 1035.
const MAX_HOSTNAME_LEN: usize = 253;

/// Maximum length of a single DNS label.
const MAX_LABEL_LEN: usize = 63;

/// Check whether `input` looks like a DNS hostname we are willing to analyze.
///
/// Accepts conservative hostname shapes only: at least two dot-separated
/// labels, each 1-63 characters of alphanumerics and hyphens with no leading
/// or trailing hyphen, and a final label that starts with a letter. This is
/// an input-shape filter, not a security boundary.
pub fn is_valid_domain(input: &str) -> bool {
    if input.is_empty() || input.len() > MAX_HOSTNAME_LEN {
        return false;
    }

    let labels: Vec<&str> = input.split('.').collect();
    if labels.len() < 2 {
        return false;
    }

    for label in &labels {
        if label.is_empty() || label.len() > MAX_LABEL_LEN {
            return false;
        }
        if label.starts_with('-') || label.ends_with('-') {
            return false;
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return false;
        }
    }

    // TLDs are alphabetic-led; this also rejects dotted-quad IPs.
    labels
        .last()
        .and_then(|tld| tld.chars().next())
        .map(|c| c.is_ascii_alphabetic())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_domains() {
        assert!(is_valid_domain("example.com"));
        assert!(is_valid_domain("sub.example.co.uk"));
        assert!(is_valid_domain("my-site.io"));
        assert!(is_valid_domain("xn--bcher-kva.example"));
        assert!(is_valid_domain("123shop.com"));
    }

    #[test]
    fn test_rejects_empty_and_missing_tld() {
        assert!(!is_valid_domain(""));
        assert!(!is_valid_domain("localhost"));
        assert!(!is_valid_domain("example"));
        assert!(!is_valid_domain("example."));
        assert!(!is_valid_domain(".com"));
    }

    #[test]
    fn test_rejects_edge_hyphens() {
        assert!(!is_valid_domain("-example.com"));
        assert!(!is_valid_domain("example-.com"));
        assert!(!is_valid_domain("sub.-example.com"));
    }

    #[test]
    fn test_rejects_bad_characters() {
        assert!(!is_valid_domain("exa mple.com"));
        assert!(!is_valid_domain("example.com/path"));
        assert!(!is_valid_domain("https://example.com"));
        assert!(!is_valid_domain("exam_ple.com"));
    }

    #[test]
    fn test_rejects_numeric_tld() {
        assert!(!is_valid_domain("192.168.0.1"));
        assert!(!is_valid_domain("example.123"));
    }

    #[test]
    fn test_rejects_oversized_labels() {
        let long_label = "a".repeat(64);
        assert!(!is_valid_domain(&format!("{}.com", long_label)));
        assert!(is_valid_domain(&format!("{}.com", "a".repeat(63))));
    }
}
