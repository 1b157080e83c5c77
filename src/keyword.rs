// 🔑 Keyword Classifier - Static keyword→category lookup, the fast first pass
//
// Problem solved:
// - Most merchants are recognizable from a single substring ("swiggy",
//   "netflix", "irctc") - no history needed
// - Table is insertion-ordered and first-match-wins, so classification is
//   deterministic; extensible at runtime when users map new keywords

use crate::entities::{Category, CategoryRegistry};
use crate::normalizer::normalize;
use crate::orchestrator::{CategorizationResult, CategorySource};
use serde::{Deserialize, Serialize};

/// Confidence assigned to keyword matches
///
/// Deliberately equal to the merchant-history exact-match seed: a keyword a
/// user mapped is at least as trustworthy as a learned exact match.
pub const KEYWORD_MATCH_CONFIDENCE: f64 = 0.9;

// ============================================================================
// KEYWORD ENTRY
// ============================================================================

/// One keyword→category mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordEntry {
    /// Lowercase substring tested against the normalized merchant
    pub keyword: String,
    pub category_id: String,
}

// ============================================================================
// KEYWORD CLASSIFIER
// ============================================================================

/// First-pass classifier over an ordered keyword table
pub struct KeywordClassifier {
    entries: Vec<KeywordEntry>,
    confidence: f64,
}

impl KeywordClassifier {
    /// Empty classifier (tests; real callers want `with_defaults`)
    pub fn new() -> Self {
        KeywordClassifier {
            entries: Vec::new(),
            confidence: KEYWORD_MATCH_CONFIDENCE,
        }
    }

    /// Classifier seeded with the default keyword table
    pub fn with_defaults() -> Self {
        let mut classifier = KeywordClassifier::new();
        classifier.seed_defaults();
        classifier
    }

    /// Classifier over an externally stored table (keyword store layer)
    pub fn from_entries(entries: Vec<KeywordEntry>) -> Self {
        KeywordClassifier {
            entries,
            confidence: KEYWORD_MATCH_CONFIDENCE,
        }
    }

    /// Override the match confidence
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    fn seed_defaults(&mut self) {
        let defaults: &[(&str, &str)] = &[
            // Food delivery & dining
            ("swiggy", "food_dining"),
            ("zomato", "food_dining"),
            ("dominos", "food_dining"),
            ("mcdonald", "food_dining"),
            ("starbucks", "food_dining"),
            ("cafe", "food_dining"),
            ("restaurant", "food_dining"),
            // Groceries
            ("bigbasket", "groceries"),
            ("blinkit", "groceries"),
            ("zepto", "groceries"),
            ("dmart", "groceries"),
            ("grofers", "groceries"),
            // Shopping
            ("amazon", "shopping"),
            ("flipkart", "shopping"),
            ("myntra", "shopping"),
            ("ajio", "shopping"),
            ("meesho", "shopping"),
            // Transport
            ("uber", "transport"),
            ("ola", "transport"),
            ("rapido", "transport"),
            ("irctc", "transport"),
            ("redbus", "transport"),
            ("petrol", "transport"),
            ("fuel", "transport"),
            // Entertainment
            ("netflix", "entertainment"),
            ("spotify", "entertainment"),
            ("hotstar", "entertainment"),
            ("bookmyshow", "entertainment"),
            ("prime video", "entertainment"),
            // Utilities
            ("airtel", "utilities"),
            ("jio", "utilities"),
            ("vodafone", "utilities"),
            ("electricity", "utilities"),
            ("broadband", "utilities"),
            ("recharge", "utilities"),
            // Health
            ("pharmacy", "health"),
            ("apollo", "health"),
            ("medplus", "health"),
            ("practo", "health"),
            ("hospital", "health"),
            // Travel
            ("makemytrip", "travel"),
            ("goibibo", "travel"),
            ("oyo", "travel"),
            ("indigo", "travel"),
            ("airasia", "travel"),
            // Income
            ("salary", "salary"),
            ("payroll", "salary"),
        ];

        self.entries.extend(defaults.iter().map(|(k, c)| KeywordEntry {
            keyword: k.to_string(),
            category_id: c.to_string(),
        }));
    }

    /// Map a new keyword; appended at the end (lowest priority)
    pub fn add_keyword(&mut self, keyword: &str, category_id: &str) {
        let keyword = keyword.to_lowercase();
        self.entries.retain(|e| e.keyword != keyword);
        self.entries.push(KeywordEntry {
            keyword,
            category_id: category_id.to_string(),
        });
    }

    /// Remove a keyword mapping; true if it existed
    pub fn remove_keyword(&mut self, keyword: &str) -> bool {
        let keyword = keyword.to_lowercase();
        let before = self.entries.len();
        self.entries.retain(|e| e.keyword != keyword);
        self.entries.len() != before
    }

    pub fn entries(&self) -> &[KeywordEntry] {
        &self.entries
    }

    /// Classify a merchant by keyword substring
    ///
    /// First table entry (insertion order) whose keyword is a substring of
    /// the normalized merchant wins. Keywords whose category id is unknown
    /// to the registry are skipped rather than producing a dangling result.
    pub fn classify(
        &self,
        merchant: &str,
        categories: &CategoryRegistry,
    ) -> Option<CategorizationResult> {
        let normalized = normalize(merchant);
        if normalized.is_empty() {
            return None;
        }

        self.entries
            .iter()
            .filter(|entry| normalized.contains(entry.keyword.as_str()))
            .find_map(|entry| categories.get(&entry.category_id))
            .map(|category: &Category| CategorizationResult {
                category: category.clone(),
                confidence: self.confidence,
                source: CategorySource::KeywordMatch,
            })
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn categories() -> CategoryRegistry {
        CategoryRegistry::with_defaults()
    }

    #[test]
    fn test_default_table_matches() {
        let classifier = KeywordClassifier::with_defaults();
        let result = classifier
            .classify("SWIGGY*ORDER 99213", &categories())
            .expect("swiggy should match");

        assert_eq!(result.category.id, "food_dining");
        assert_eq!(result.confidence, KEYWORD_MATCH_CONFIDENCE);
        assert_eq!(result.source, CategorySource::KeywordMatch);
    }

    #[test]
    fn test_matches_normalized_merchant() {
        let classifier = KeywordClassifier::with_defaults();
        // Suffix stripping happens before the substring test
        let result = classifier.classify("AMAZON.com Pvt Ltd", &categories());
        assert_eq!(result.unwrap().category.id, "shopping");
    }

    #[test]
    fn test_no_match_returns_none() {
        let classifier = KeywordClassifier::with_defaults();
        assert!(classifier
            .classify("Sharma General Stores", &categories())
            .is_none());
    }

    #[test]
    fn test_empty_merchant_returns_none() {
        let classifier = KeywordClassifier::with_defaults();
        assert!(classifier.classify("", &categories()).is_none());
        assert!(classifier.classify("   ", &categories()).is_none());
    }

    #[test]
    fn test_first_match_wins_in_insertion_order() {
        let mut classifier = KeywordClassifier::new();
        classifier.add_keyword("air", "travel");
        classifier.add_keyword("airtel", "utilities");

        // "air" was inserted first and is a substring of "airtel"
        let result = classifier.classify("AIRTEL PREPAID", &categories());
        assert_eq!(result.unwrap().category.id, "travel");
    }

    #[test]
    fn test_add_and_remove_keyword() {
        let mut classifier = KeywordClassifier::new();
        assert!(classifier.classify("Chai Point", &categories()).is_none());

        classifier.add_keyword("Chai Point", "food_dining");
        assert!(classifier.classify("CHAI POINT HSR", &categories()).is_some());

        assert!(classifier.remove_keyword("chai point"));
        assert!(!classifier.remove_keyword("chai point"));
        assert!(classifier.classify("CHAI POINT HSR", &categories()).is_none());
    }

    #[test]
    fn test_unknown_category_id_skipped() {
        let mut classifier = KeywordClassifier::new();
        classifier.add_keyword("zomato", "no_such_category");
        classifier.add_keyword("zomato gold", "food_dining");

        // Dangling id is skipped; nothing else matches this merchant
        assert!(classifier.classify("ZOMATO ORDER", &categories()).is_none());
    }

    #[test]
    fn test_confidence_override() {
        let classifier = KeywordClassifier::with_defaults().with_confidence(0.75);
        let result = classifier.classify("UBER RIDES", &categories()).unwrap();
        assert_eq!(result.confidence, 0.75);
    }
}
