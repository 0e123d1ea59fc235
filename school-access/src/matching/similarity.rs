//! String similarity scores on a 0-100 scale.
//!
//! Built on normalised Levenshtein similarity. [`weighted_ratio`] combines
//! whole-string, token-sorted and substring comparisons so that a short
//! school name still scores highly inside a longer route headsign.

use strsim::normalized_levenshtein;

/// Whole-string similarity.
pub fn ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    normalized_levenshtein(a, b) * 100.0
}

/// Similarity after sorting each string's whitespace-separated tokens.
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    ratio(&sorted_tokens(a), &sorted_tokens(b))
}

/// Best similarity between the shorter string and any window of the longer
/// string with the same number of characters.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let (short, long) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    let short_len = short.chars().count();
    if short_len == 0 {
        return 0.0;
    }

    let long_chars: Vec<char> = long.chars().collect();
    long_chars
        .windows(short_len)
        .map(|window| ratio(short, &window.iter().collect::<String>()))
        .fold(0.0, f64::max)
}

/// Weighted combination of the other scores.
///
/// Strings of similar length are compared whole and token-sorted. When one
/// is at least 1.5 times longer, substring matches count too, scaled down
/// by 0.9 (0.6 beyond a length ratio of 8).
pub fn weighted_ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let len_a = a.chars().count() as f64;
    let len_b = b.chars().count() as f64;
    let len_ratio = len_a.max(len_b) / len_a.min(len_b);

    let base = ratio(a, b);
    let token_sort = token_sort_ratio(a, b) * 0.95;
    if len_ratio < 1.5 {
        return base.max(token_sort);
    }

    let scale = if len_ratio < 8.0 { 0.9 } else { 0.6 };
    let partial = partial_ratio(a, b) * scale;
    let partial_sorted = partial_ratio(&sorted_tokens(a), &sorted_tokens(b)) * 0.95 * scale;
    base.max(partial).max(partial_sorted)
}

fn sorted_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_score_100() {
        assert_eq!(ratio("lyneham high school", "lyneham high school"), 100.0);
        assert_eq!(weighted_ratio("lyneham high school", "lyneham high school"), 100.0);
    }

    #[test]
    fn empty_strings_score_0() {
        assert_eq!(ratio("", ""), 0.0);
        assert_eq!(weighted_ratio("", "school"), 0.0);
        assert_eq!(partial_ratio("", "school"), 0.0);
    }

    #[test]
    fn token_order_is_ignored() {
        assert_eq!(token_sort_ratio("high school lyneham", "lyneham high school"), 100.0);
        assert!(ratio("high school lyneham", "lyneham high school") < 100.0);
    }

    #[test]
    fn partial_finds_substring() {
        assert_eq!(partial_ratio("dickson", "42 dickson college"), 100.0);
    }

    #[test]
    fn weighted_ratio_scales_substring_matches() {
        let score = weighted_ratio("42 lyneham high school dickson", "lyneham high school");
        assert!((score - 90.0).abs() < 1e-9, "got {score}");
    }

    #[test]
    fn unrelated_names_score_low() {
        assert!(weighted_ratio("gungahlin college", "lyneham high school") < 60.0);
    }

    #[test]
    fn symmetric() {
        let a = "belconnen high";
        let b = "42 belconnen high school";
        assert_eq!(weighted_ratio(a, b), weighted_ratio(b, a));
    }
}
