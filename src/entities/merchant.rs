// 🏪 Merchant Profile - Adaptive per-merchant category memory
//
// Problem solved:
// - "Was AMAZON groceries or shopping for *this* user?" The answer lives
//   here, learned from corrections, never hardcoded
// - normalized_name is the unique key; name keeps the first spelling seen
// - confidence ∈ [0,1] grows under consistent feedback, decays (to a floor)
//   under conflicting feedback; observation_count never decreases

use crate::normalizer::normalize;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// MERCHANT PROFILE
// ============================================================================

/// Per-merchant category knowledge, keyed by normalized name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerchantProfile {
    /// Merchant name as first seen (for display, never for comparison)
    pub name: String,

    /// Unique key: `normalize(name)`, set once at creation
    pub normalized_name: String,

    /// Learned category, None until the first assignment
    pub category_id: Option<String>,

    /// Trust in category_id, always within [0, 1]
    pub confidence: f64,

    /// How many learning events touched this profile (monotonic)
    pub observation_count: u32,

    /// When this merchant was first observed
    pub first_seen: DateTime<Utc>,

    /// Last learning event
    pub updated_at: DateTime<Utc>,
}

impl MerchantProfile {
    /// Create a profile for a merchant seen for the first time
    pub fn new(name: &str, category_id: Option<String>, confidence: f64) -> Self {
        let now = Utc::now();

        MerchantProfile {
            name: name.to_string(),
            normalized_name: normalize(name),
            category_id,
            confidence: confidence.clamp(0.0, 1.0),
            observation_count: 1,
            first_seen: now,
            updated_at: now,
        }
    }

    /// Tokens of the normalized key (similarity comparisons)
    pub fn tokens(&self) -> Vec<&str> {
        crate::normalizer::tokens(&self.normalized_name)
    }

    /// Evidence-weighted score used to rank similar-merchant candidates
    pub fn evidence_score(&self) -> f64 {
        self.confidence * self.observation_count as f64
    }

    /// True once the profile carries a category assignment
    pub fn is_categorized(&self) -> bool {
        self.category_id.is_some()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_creation() {
        let profile = MerchantProfile::new("Amazon Pay India", Some("shopping".into()), 0.9);

        assert_eq!(profile.name, "Amazon Pay India");
        assert_eq!(profile.normalized_name, "amazon pay india");
        assert_eq!(profile.category_id, Some("shopping".to_string()));
        assert_eq!(profile.confidence, 0.9);
        assert_eq!(profile.observation_count, 1);
        assert!(profile.is_categorized());
    }

    #[test]
    fn test_confidence_clamped() {
        let profile = MerchantProfile::new("X", None, 1.7);
        assert_eq!(profile.confidence, 1.0);

        let profile = MerchantProfile::new("X", None, -0.2);
        assert_eq!(profile.confidence, 0.0);
    }

    #[test]
    fn test_evidence_score() {
        let mut profile = MerchantProfile::new("Zomato", Some("food_dining".into()), 0.8);
        profile.observation_count = 5;
        assert!((profile.evidence_score() - 4.0).abs() < 1e-9);
    }
}
