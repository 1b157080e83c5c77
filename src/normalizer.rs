// 🔤 Merchant Normalizer - Canonical comparison keys for merchant names
//
// Problem solved:
// - "AMAZON.com Pvt Ltd", "Amazon Com", "amazon" → All the same key: "amazon"
// - Bank SMS spell the same merchant a dozen ways; every classifier layer
//   compares normalized keys, never raw strings
// - Pure functions, no state, safe to call from any thread

// ============================================================================
// NORMALIZATION
// ============================================================================

/// Corporate suffix tokens stripped as whole words, wherever they appear
const SUFFIX_TOKENS: &[&str] = &[
    "pvt", "ltd", "llc", "inc", "corp", "co", "company", "limited",
];

/// Normalize a raw merchant string into its comparison key
///
/// - Lowercase
/// - Every character outside [a-z0-9 and whitespace] becomes a space
/// - Corporate suffix tokens removed as whole words
/// - Runs of whitespace collapse to a single space, trimmed
///
/// Idempotent: `normalize(normalize(x)) == normalize(x)`
///
/// Example: "AMAZON.com Pvt Ltd" → "amazon com"
pub fn normalize(raw: &str) -> String {
    let cleaned: String = raw
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    cleaned
        .split_whitespace()
        .filter(|token| !SUFFIX_TOKENS.contains(token))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split a normalized key into its tokens
pub fn tokens(normalized: &str) -> Vec<&str> {
    normalized.split_whitespace().collect()
}

/// Jaccard similarity between two token sets: |A ∩ B| / |A ∪ B|
///
/// Identical non-empty sets score 1.0, disjoint sets 0.0. An empty union
/// scores 0.0 (an empty merchant is never similar to anything).
pub fn jaccard(a: &[&str], b: &[&str]) -> f64 {
    use std::collections::HashSet;

    let set_a: HashSet<&str> = a.iter().copied().collect();
    let set_b: HashSet<&str> = b.iter().copied().collect();

    let union = set_a.union(&set_b).count();
    if union == 0 {
        return 0.0;
    }

    let intersection = set_a.intersection(&set_b).count();
    intersection as f64 / union as f64
}

// ============================================================================
// TESTS
// ============================================================================
