use regex::Regex;

fn asset_reference_ignores() -> &'static [Regex] {
    use std::sync::OnceLock;

    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| {
            vec![
                Regex::new(r"(?i)^[a-z][a-z0-9+.\-]*:").expect("invalid scheme regex"),
                Regex::new(r"^//").expect("invalid protocol-relative regex"),
                Regex::new(r"^#").expect("invalid fragment regex"),
            ]
        })
        .as_slice()
}

/// Determine whether a stylesheet `url(...)` reference should be left as written.
///
/// Anything carrying a scheme (`https:`, `data:`, `about:`), protocol-relative URLs and
/// fragment-only references point outside the public root and are never rewritten.
pub fn should_ignore_asset_reference(value: &str) -> bool {
    let value = value.trim();
    value.is_empty()
        || asset_reference_ignores()
            .iter()
            .any(|pattern| pattern.is_match(value))
}

#[cfg(test)]
mod tests {
    use super::should_ignore_asset_reference;

    #[test]
    fn ignores_http_urls() {
        assert!(should_ignore_asset_reference("https://example.com/a.png"));
        assert!(should_ignore_asset_reference("HTTP://example.com"));
        assert!(should_ignore_asset_reference("//cdn.example.com/a.png"));
    }

    #[test]
    fn ignores_data_uris() {
        assert!(should_ignore_asset_reference("data:image/png;base64,abc"));
        assert!(should_ignore_asset_reference("about:blank"));
    }

    #[test]
    fn ignores_fragments_and_blanks() {
        assert!(should_ignore_asset_reference("#clip"));
        assert!(should_ignore_asset_reference("  "));
    }

    #[test]
    fn keeps_relative_and_rooted_paths() {
        assert!(!should_ignore_asset_reference("../images/photo.png"));
        assert!(!should_ignore_asset_reference("/images/photo.png"));
    }
}
