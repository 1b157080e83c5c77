// 🧠 Merchant History Classifier - Learns each user's merchants over time
//
// Problem solved:
// - Keyword tables can't know that "Sharma Stores" is groceries for THIS
//   user; corrections teach a per-merchant profile store
// - Exact lookup first; unknown merchants fall back to token-overlap
//   candidates scored by Jaccard similarity
// - learn() is an exponentially-weighted online update: converges toward
//   1.0 under consistent feedback, floors at MIN_CONFIDENCE under
//   conflicting feedback, each update's influence shrinking with
//   observation_count
// - Read-modify-write per merchant is serialized through a sharded lock
//   table so duplicate bank notifications can't race a lost update

use crate::entities::{CategoryRegistry, MerchantProfile};
use crate::error::StoreError;
use crate::normalizer::{jaccard, normalize, tokens};
use crate::orchestrator::{CategorizationResult, CategorySource};
use crate::store::MerchantStore;
use chrono::Utc;
use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Minimum confidence for any history-based result
pub const MIN_CONFIDENCE: f64 = 0.6;

/// Confidence seeded by a user assignment on a fresh merchant
pub const EXACT_MATCH_CONFIDENCE: f64 = 0.9;

/// Similar-merchant candidates need this much evidence; a single noisy
/// observation must not pull lookalike merchants along with it
const MIN_OBSERVATIONS_FOR_SIMILARITY: u32 = 2;

/// Tokens shorter than this don't count as shared ("co", "of", initials)
const MIN_SHARED_TOKEN_LEN: usize = 3;

/// Lock shards for per-key learn serialization
const LOCK_SHARDS: usize = 16;

// ============================================================================
// CLASSIFIER
// ============================================================================

/// Adaptive classifier over the merchant profile store
///
/// The store is an injected dependency (constructor injection, no global
/// state) so tests run against `InMemoryStore`.
pub struct MerchantHistoryClassifier<S: MerchantStore> {
    store: S,
    locks: Vec<Mutex<()>>,
}

impl<S: MerchantStore> MerchantHistoryClassifier<S> {
    pub fn new(store: S) -> Self {
        MerchantHistoryClassifier {
            store,
            locks: (0..LOCK_SHARDS).map(|_| Mutex::new(())).collect(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn shard(&self, key: &str) -> &Mutex<()> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        &self.locks[hasher.finish() as usize % LOCK_SHARDS]
    }

    // ------------------------------------------------------------------------
    // CLASSIFY
    // ------------------------------------------------------------------------

    /// Classify a merchant from history
    ///
    /// Exact profile match first; otherwise the best similar merchant by
    /// `confidence * observation_count`, discounted by Jaccard similarity.
    /// Store failures degrade to None (the orchestrator moves on).
    pub fn classify(
        &self,
        merchant: &str,
        categories: &CategoryRegistry,
    ) -> Option<CategorizationResult> {
        let key = normalize(merchant);
        if key.is_empty() {
            return None;
        }

        // 1. Exact lookup
        match self.store.get(&key) {
            Ok(Some(profile))
                if profile.is_categorized() && profile.confidence >= MIN_CONFIDENCE =>
            {
                let category = categories.get(profile.category_id.as_deref()?)?;
                return Some(CategorizationResult {
                    category: category.clone(),
                    confidence: profile.confidence,
                    source: CategorySource::MerchantHistory,
                });
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(merchant = %key, error = %e, "merchant store read failed");
                return None;
            }
        }

        // 2. Similarity fallback
        let candidate = self.best_similar_candidate(&key)?;

        let similarity = jaccard(&tokens(&key), &candidate.tokens());
        let adjusted = candidate.confidence * similarity;
        if adjusted < MIN_CONFIDENCE {
            return None;
        }

        let category = categories.get(candidate.category_id.as_deref()?)?;
        Some(CategorizationResult {
            category: category.clone(),
            confidence: adjusted,
            source: CategorySource::SimilarMerchant {
                similar_to: candidate.name.clone(),
            },
        })
    }

    /// Best-evidence candidate sharing at least one token (length >= 3)
    fn best_similar_candidate(&self, key: &str) -> Option<MerchantProfile> {
        let shared_tokens: Vec<&str> = tokens(key)
            .into_iter()
            .filter(|t| t.len() >= MIN_SHARED_TOKEN_LEN)
            .collect();
        if shared_tokens.is_empty() {
            return None;
        }

        let candidates = match self.store.find_by_token_overlap(&shared_tokens) {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!(merchant = %key, error = %e, "token overlap search failed");
                return None;
            }
        };

        candidates
            .into_iter()
            .filter(|p| {
                p.is_categorized()
                    && p.confidence >= MIN_CONFIDENCE
                    && p.observation_count >= MIN_OBSERVATIONS_FOR_SIMILARITY
            })
            .max_by(|a, b| {
                a.evidence_score()
                    .partial_cmp(&b.evidence_score())
                    .unwrap_or(Ordering::Equal)
            })
    }

    /// All similarity-based suggestions clearing the confidence bar,
    /// used by `suggest_categories` for ranked UI lists
    pub fn suggestions(
        &self,
        merchant: &str,
        categories: &CategoryRegistry,
    ) -> Vec<CategorizationResult> {
        let key = normalize(merchant);
        if key.is_empty() {
            return Vec::new();
        }

        let mut results = Vec::new();

        if let Ok(Some(profile)) = self.store.get(&key) {
            if profile.is_categorized() && profile.confidence >= MIN_CONFIDENCE {
                if let Some(category) = profile.category_id.as_deref().and_then(|id| categories.get(id)) {
                    results.push(CategorizationResult {
                        category: category.clone(),
                        confidence: profile.confidence,
                        source: CategorySource::MerchantHistory,
                    });
                }
            }
        }

        let shared_tokens: Vec<&str> = tokens(&key)
            .into_iter()
            .filter(|t| t.len() >= MIN_SHARED_TOKEN_LEN)
            .collect();
        if shared_tokens.is_empty() {
            return results;
        }

        let candidates = self.store.find_by_token_overlap(&shared_tokens).unwrap_or_default();
        for candidate in candidates {
            if candidate.normalized_name == key
                || !candidate.is_categorized()
                || candidate.confidence < MIN_CONFIDENCE
                || candidate.observation_count < MIN_OBSERVATIONS_FOR_SIMILARITY
            {
                continue;
            }
            let adjusted = candidate.confidence * jaccard(&tokens(&key), &candidate.tokens());
            if adjusted < MIN_CONFIDENCE {
                continue;
            }
            if let Some(category) = candidate.category_id.as_deref().and_then(|id| categories.get(id)) {
                results.push(CategorizationResult {
                    category: category.clone(),
                    confidence: adjusted,
                    source: CategorySource::SimilarMerchant {
                        similar_to: candidate.name.clone(),
                    },
                });
            }
        }

        results
    }

    // ------------------------------------------------------------------------
    // LEARN
    // ------------------------------------------------------------------------

    /// Fold a ground-truth assignment (user correction or confirmed manual
    /// entry) into the merchant's profile
    ///
    /// Serialized per normalized key: two duplicate notifications learning
    /// the same merchant concurrently both land, neither increment is lost.
    /// A store failure is returned to the caller for retry - dropping a
    /// learning event silently would degrade future accuracy.
    pub fn learn(&self, merchant: &str, category_id: &str) -> Result<MerchantProfile, StoreError> {
        let key = normalize(merchant);
        let _guard = self.shard(&key).lock().unwrap();

        let profile = match self.store.get(&key)? {
            None => MerchantProfile::new(
                merchant,
                Some(category_id.to_string()),
                EXACT_MATCH_CONFIDENCE,
            ),
            Some(mut profile) => {
                let weight = 1.0 / (profile.observation_count as f64 + 1.0);
                let matches_stored = profile.category_id.as_deref() == Some(category_id);
                let target = if matches_stored { 1.0 } else { 0.0 };

                let new_confidence =
                    (profile.confidence * (1.0 - weight) + target * weight).max(MIN_CONFIDENCE);

                // The floor guarantees the bar is cleared, so a conflicting
                // assignment always replaces the stored category
                if !matches_stored && new_confidence >= MIN_CONFIDENCE {
                    profile.category_id = Some(category_id.to_string());
                }
                profile.confidence = new_confidence;
                profile.observation_count += 1;
                profile.updated_at = Utc::now();
                profile
            }
        };

        self.store.put(&profile)?;
        Ok(profile)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use std::sync::Arc;

    fn classifier() -> MerchantHistoryClassifier<InMemoryStore> {
        MerchantHistoryClassifier::new(InMemoryStore::new())
    }

    fn categories() -> CategoryRegistry {
        CategoryRegistry::with_defaults()
    }

    fn seed(
        c: &MerchantHistoryClassifier<InMemoryStore>,
        name: &str,
        category: &str,
        confidence: f64,
        observations: u32,
    ) {
        let mut profile = MerchantProfile::new(name, Some(category.to_string()), confidence);
        profile.observation_count = observations;
        c.store().put(&profile).unwrap();
    }

    #[test]
    fn test_exact_match_classify() {
        let c = classifier();
        seed(&c, "Amazon", "shopping", 0.9, 10);

        let result = c.classify("Amazon", &categories()).unwrap();
        assert_eq!(result.category.id, "shopping");
        assert_eq!(result.confidence, 0.9);
        assert_eq!(result.source, CategorySource::MerchantHistory);
    }

    #[test]
    fn test_exact_match_is_case_and_suffix_insensitive() {
        let c = classifier();
        seed(&c, "amazon", "shopping", 0.9, 10);

        assert!(c.classify("AMAZON Pvt Ltd", &categories()).is_some());
    }

    #[test]
    fn test_low_confidence_exact_match_rejected() {
        let c = classifier();
        seed(&c, "Amazon", "shopping", 0.5, 10);

        assert!(c.classify("Amazon", &categories()).is_none());
    }

    #[test]
    fn test_uncategorized_profile_rejected() {
        let c = classifier();
        let profile = MerchantProfile::new("Amazon", None, 0.9);
        c.store().put(&profile).unwrap();

        assert!(c.classify("Amazon", &categories()).is_none());
    }

    #[test]
    fn test_similarity_fallback() {
        let c = classifier();
        seed(&c, "Swiggy Instamart", "groceries", 0.95, 5);

        let result = c
            .classify("Swiggy Instamart Order", &categories())
            .expect("2/3 token overlap at 0.95 confidence clears the bar");
        // similarity = 2/3, adjusted = 0.95 * 2/3 ≈ 0.633
        assert_eq!(result.category.id, "groceries");
        assert!((result.confidence - 0.95 * (2.0 / 3.0)).abs() < 1e-9);
        assert_eq!(
            result.source,
            CategorySource::SimilarMerchant {
                similar_to: "Swiggy Instamart".to_string()
            }
        );
    }

    #[test]
    fn test_similarity_below_threshold_returns_none() {
        let c = classifier();
        // confidence 0.8, similarity 0.5 → adjusted 0.4 < 0.6
        seed(&c, "Amazon Pay", "shopping", 0.8, 5);

        assert!(c.classify("Amazon", &categories()).is_none());
    }

    #[test]
    fn test_single_observation_candidates_ignored() {
        let c = classifier();
        seed(&c, "Swiggy Instamart", "groceries", 0.9, 1);

        assert!(c.classify("Swiggy Instamart Order", &categories()).is_none());
    }

    #[test]
    fn test_best_candidate_by_evidence() {
        let c = classifier();
        seed(&c, "Uber Rides India", "transport", 0.9, 10);
        seed(&c, "Uber Eats India", "food_dining", 0.9, 2);

        // Both candidates share 3 of the query's 4 tokens (similarity 0.75,
        // adjusted 0.675); the one with more evidence must win
        let result = c.classify("Uber Rides Eats India", &categories()).unwrap();
        assert_eq!(result.category.id, "transport");
        assert!((result.confidence - 0.9 * 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_learn_cold_start() {
        let c = classifier();
        let profile = c.learn("NewMerchant", "shopping").unwrap();

        assert_eq!(profile.confidence, EXACT_MATCH_CONFIDENCE);
        assert_eq!(profile.observation_count, 1);
        assert_eq!(profile.category_id.as_deref(), Some("shopping"));
        assert_eq!(profile.name, "NewMerchant");

        let stored = c.store().get("newmerchant").unwrap().unwrap();
        assert_eq!(stored, profile);
    }

    #[test]
    fn test_consistent_learning_converges_up() {
        let c = classifier();
        c.learn("Zomato", "food_dining").unwrap();

        let mut last = EXACT_MATCH_CONFIDENCE;
        for i in 0..10 {
            let profile = c.learn("Zomato", "food_dining").unwrap();
            assert!(
                profile.confidence > last,
                "confidence must rise monotonically (step {i})"
            );
            assert!(profile.confidence <= 1.0);
            last = profile.confidence;
        }
        assert!(last > 0.99);
    }

    #[test]
    fn test_conflicting_learning_floors_at_min() {
        let c = classifier();
        c.learn("Corner Shop", "groceries").unwrap();

        // Alternate conflicting assignments; confidence never drops below
        // the floor, and lands exactly on it
        for category in ["shopping", "groceries", "shopping", "food_dining"] {
            let profile = c.learn("Corner Shop", category).unwrap();
            assert!(profile.confidence >= MIN_CONFIDENCE);
            assert_eq!(profile.category_id.as_deref(), Some(category));
        }

        let profile = c.learn("Corner Shop", "utilities").unwrap();
        assert_eq!(profile.confidence, MIN_CONFIDENCE);
    }

    #[test]
    fn test_observation_count_monotonic() {
        let c = classifier();
        let mut last = c.learn("Cafe", "food_dining").unwrap().observation_count;
        for category in ["food_dining", "shopping", "food_dining"] {
            let count = c.learn("Cafe", category).unwrap().observation_count;
            assert_eq!(count, last + 1);
            last = count;
        }
    }

    #[test]
    fn test_concurrent_learns_lose_no_update() {
        let c = Arc::new(classifier());
        let threads: u32 = 8;
        let per_thread: u32 = 25;

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let c = Arc::clone(&c);
                std::thread::spawn(move || {
                    for _ in 0..per_thread {
                        c.learn("Swiggy", "food_dining").unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let profile = c.store().get("swiggy").unwrap().unwrap();
        assert_eq!(profile.observation_count, threads * per_thread);
    }

    #[test]
    fn test_store_failure_degrades_to_none() {
        struct FailingStore;
        impl MerchantStore for FailingStore {
            fn get(&self, _: &str) -> Result<Option<MerchantProfile>, StoreError> {
                Err(StoreError::Unavailable("disk on fire".to_string()))
            }
            fn put(&self, _: &MerchantProfile) -> Result<(), StoreError> {
                Err(StoreError::Unavailable("disk on fire".to_string()))
            }
            fn find_by_token_overlap(
                &self,
                _: &[&str],
            ) -> Result<Vec<MerchantProfile>, StoreError> {
                Err(StoreError::Unavailable("disk on fire".to_string()))
            }
        }

        let c = MerchantHistoryClassifier::new(FailingStore);
        assert!(c.classify("Amazon", &categories()).is_none());
        assert!(c.learn("Amazon", "shopping").is_err());
    }
}
