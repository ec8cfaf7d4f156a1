//! Text canonicalization for grouping free-text labels.

use regex::Regex;
use std::sync::LazyLock;

/// Unicode whitespace plus the zero-width/direction marks U+200B..U+200F,
/// which show up in scraped labels as invisible spacing.
static SPACING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s\x{200B}-\x{200F}]+").expect("spacing pattern is valid"));

/// Collapses whitespace runs into a single space, trims, and lowercases.
///
/// `normalize_text(&normalize_text(x)) == normalize_text(x)` for every input.
pub fn normalize_text(text: &str) -> String {
    SPACING.replace_all(text, " ").trim().to_lowercase()
}

/// [`normalize_text`] over an optional field. Absent stays absent.
pub fn normalize_opt(text: Option<&str>) -> Option<String> {
    text.map(normalize_text)
}

/// Returns true if the salary-period label contains any of `keywords`.
///
/// The label is normalized first, so raw and already-normalized labels
/// classify the same way. Matching is by substring.
pub fn is_monthly_salary<S: AsRef<str>>(label: Option<&str>, keywords: &[S]) -> bool {
    let Some(label) = label else {
        return false;
    };
    let label = normalize_text(label);
    keywords
        .iter()
        .any(|k| label.contains(normalize_text(k.as_ref()).as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const KEYWORDS: [&str; 3] = ["месяц", "month", "мес"];

    #[test]
    fn test_collapses_mixed_whitespace() {
        assert_eq!(normalize_text("  Полный\u{00A0}\t день \n"), "полный день");
        assert_eq!(normalize_text("сменный\u{2009}\u{200B}график"), "сменный график");
        assert_eq!(normalize_text("A\u{3000}B"), "a b");
    }

    #[test]
    fn test_empty_and_blank() {
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_text(" \u{00A0} "), "");
    }

    #[test]
    fn test_absent_passes_through() {
        assert_eq!(normalize_opt(None), None);
        assert_eq!(normalize_opt(Some(" X ")), Some("x".to_string()));
    }

    #[test]
    fn test_monthly_keywords() {
        assert!(is_monthly_salary(Some("  В МЕСЯЦ "), &KEYWORDS));
        assert!(is_monthly_salary(Some("Per month,"), &KEYWORDS));
        assert!(is_monthly_salary(Some("руб./мес."), &KEYWORDS));
        assert!(!is_monthly_salary(Some("за час"), &KEYWORDS));
        assert!(!is_monthly_salary(Some("за смену"), &KEYWORDS));
        assert!(!is_monthly_salary(None, &KEYWORDS));
    }

    #[test]
    fn test_empty_keyword_list_never_matches() {
        let none: [&str; 0] = [];
        assert!(!is_monthly_salary(Some("в месяц"), &none));
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(s in "\\PC*") {
            let once = normalize_text(&s);
            prop_assert_eq!(normalize_text(&once), once);
        }

        #[test]
        fn prop_normalized_has_no_edge_or_double_spaces(s in "[ a-zA-Zа-яА-Я\u{00A0}\t\n]*") {
            let out = normalize_text(&s);
            prop_assert!(!out.starts_with(' '));
            prop_assert!(!out.ends_with(' '));
            prop_assert!(!out.contains("  "));
        }
    }
}
