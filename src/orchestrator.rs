// 🎯 Categorization Orchestrator - Layered classification with learning
//
// Problem solved:
// - One entry point that ALWAYS produces a category: keyword table first,
//   merchant history second, "Uncategorized" as the guaranteed fallback
// - User corrections feed back through a single channel into the history
//   classifier, whichever layer produced the original answer
// - Also hosts the end-to-end SMS pipeline: raw text in, categorized
//   transaction out

use crate::entities::{Category, CategoryRegistry, MerchantProfile, Transaction};
use crate::error::StoreError;
use crate::history::MerchantHistoryClassifier;
use crate::keyword::KeywordClassifier;
use crate::store::MerchantStore;
use crate::template::{RawTransactionFields, TemplateSet};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ============================================================================
// CATEGORIZATION RESULT
// ============================================================================

/// Which strategy produced a category assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CategorySource {
    /// Keyword table substring hit
    KeywordMatch,

    /// Exact merchant-history profile
    MerchantHistory,

    /// Similarity fallback; carries the merchant it borrowed from
    SimilarMerchant { similar_to: String },

    /// Directly assigned by the user
    UserDefined,

    /// No classifier was confident; the fallback assignment
    Unmatched,
}

/// One classification outcome - transient, never persisted as-is
/// (only the chosen category id lands on the transaction)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorizationResult {
    pub category: Category,
    /// Always within [0, 1]
    pub confidence: f64,
    pub source: CategorySource,
}

impl CategorizationResult {
    /// A direct user pick - full confidence, no classifier involved.
    /// App layers build this when the user assigns a category by hand.
    pub fn user_defined(category: Category) -> Self {
        CategorizationResult {
            category,
            confidence: 1.0,
            source: CategorySource::UserDefined,
        }
    }
}

// ============================================================================
// ORCHESTRATOR
// ============================================================================

/// The categorization core wired together
pub struct Categorizer<S: MerchantStore> {
    templates: TemplateSet,
    keywords: KeywordClassifier,
    history: MerchantHistoryClassifier<S>,
    categories: CategoryRegistry,
}

impl<S: MerchantStore> Categorizer<S> {
    /// Wire the layers explicitly (tests inject an in-memory store here)
    pub fn new(
        store: S,
        templates: TemplateSet,
        keywords: KeywordClassifier,
        categories: CategoryRegistry,
    ) -> Self {
        Categorizer {
            templates,
            keywords,
            history: MerchantHistoryClassifier::new(store),
            categories,
        }
    }

    /// Default templates, keyword table, and category set over `store`
    pub fn with_defaults(store: S) -> Self {
        Self::new(
            store,
            TemplateSet::with_defaults(),
            KeywordClassifier::with_defaults(),
            CategoryRegistry::with_defaults(),
        )
    }

    pub fn categories(&self) -> &CategoryRegistry {
        &self.categories
    }

    pub fn categories_mut(&mut self) -> &mut CategoryRegistry {
        &mut self.categories
    }

    pub fn keywords_mut(&mut self) -> &mut KeywordClassifier {
        &mut self.keywords
    }

    pub fn history(&self) -> &MerchantHistoryClassifier<S> {
        &self.history
    }

    // ------------------------------------------------------------------------
    // CLASSIFICATION
    // ------------------------------------------------------------------------

    /// Categorize a merchant - total, never fails
    ///
    /// Keyword table first, merchant history second, Uncategorized with
    /// confidence 0.0 when neither layer is confident. Store failures
    /// inside a layer degrade that layer to no-result and the chain
    /// continues.
    pub fn categorize(&self, merchant: &str) -> CategorizationResult {
        if let Some(result) = self.keywords.classify(merchant, &self.categories) {
            return result;
        }
        if let Some(result) = self.history.classify(merchant, &self.categories) {
            return result;
        }

        CategorizationResult {
            category: self.categories.uncategorized(),
            confidence: 0.0,
            source: CategorySource::Unmatched,
        }
    }

    /// Ranked category suggestions for pickers - confidence descending,
    /// one entry per category id
    pub fn suggest_categories(&self, merchant: &str) -> Vec<CategorizationResult> {
        let mut suggestions = Vec::new();
        if let Some(result) = self.keywords.classify(merchant, &self.categories) {
            suggestions.push(result);
        }
        suggestions.extend(self.history.suggestions(merchant, &self.categories));

        suggestions.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut seen: HashSet<String> = HashSet::new();
        suggestions.retain(|s| seen.insert(s.category.id.clone()));
        suggestions
    }

    /// Fold a user's category choice back into the merchant history
    ///
    /// Always forwards to the history classifier's learn, regardless of
    /// which layer produced the original result - corrections are the sole
    /// adaptation channel. Errors mean the learning event did not persist;
    /// callers should retry.
    pub fn learn_from_user_input(
        &self,
        merchant: &str,
        category_id: &str,
    ) -> Result<MerchantProfile, StoreError> {
        self.history.learn(merchant, category_id)
    }

    // ------------------------------------------------------------------------
    // SMS PIPELINE
    // ------------------------------------------------------------------------

    /// Match raw SMS text against the active templates
    pub fn match_sms(&self, sender: &str, body: &str) -> Option<RawTransactionFields> {
        self.templates.match_sms(sender, body)
    }

    /// Full pipeline: raw SMS → categorized transaction
    ///
    /// `received_at` is the date fallback for bodies without a parseable
    /// date. None means the message is not a transaction (no template
    /// matched) and is silently dropped.
    pub fn process_sms(
        &self,
        sender: &str,
        body: &str,
        received_at: NaiveDate,
    ) -> Option<(Transaction, CategorizationResult)> {
        let fields = self.templates.match_sms(sender, body)?;
        let mut transaction = Transaction::from_sms(&fields, received_at)?;

        let result = self.categorize(&transaction.merchant);
        transaction.category_id = Some(result.category.id.clone());

        tracing::debug!(
            bank = %fields.bank_name,
            merchant = %transaction.merchant,
            category = %result.category.name,
            confidence = result.confidence,
            "sms parsed and categorized"
        );

        Some((transaction, result))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{TransactionKind, UNCATEGORIZED_ID};
    use crate::keyword::KEYWORD_MATCH_CONFIDENCE;
    use crate::store::InMemoryStore;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn categorizer() -> Categorizer<InMemoryStore> {
        Categorizer::with_defaults(InMemoryStore::new())
    }

    fn received() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 12).unwrap()
    }

    #[test]
    fn test_keyword_layer_first() {
        let c = categorizer();
        let result = c.categorize("SWIGGY*ORDER");

        assert_eq!(result.category.id, "food_dining");
        assert_eq!(result.confidence, KEYWORD_MATCH_CONFIDENCE);
        assert_eq!(result.source, CategorySource::KeywordMatch);
    }

    #[test]
    fn test_history_layer_when_no_keyword() {
        let c = categorizer();
        c.learn_from_user_input("Sharma General Stores", "groceries")
            .unwrap();

        let result = c.categorize("Sharma General Stores");
        assert_eq!(result.category.id, "groceries");
        assert_eq!(result.source, CategorySource::MerchantHistory);
    }

    #[test]
    fn test_fallback_never_fails() {
        let c = categorizer();

        for merchant in ["Totally Unknown Vendor", "", "   ", "!!!"] {
            let result = c.categorize(merchant);
            assert_eq!(result.category.id, UNCATEGORIZED_ID);
            assert_eq!(result.confidence, 0.0);
            assert_eq!(result.source, CategorySource::Unmatched);
        }
    }

    #[test]
    fn test_keyword_outranks_learned_history() {
        let c = categorizer();
        // User keeps correcting, but the keyword layer still answers first
        // for keyword-covered merchants; the correction shows in suggestions
        c.learn_from_user_input("Amazon", "groceries").unwrap();

        let result = c.categorize("Amazon");
        assert_eq!(result.source, CategorySource::KeywordMatch);
        assert_eq!(result.category.id, "shopping");

        let suggestions = c.suggest_categories("Amazon");
        let ids: Vec<&str> = suggestions.iter().map(|s| s.category.id.as_str()).collect();
        assert!(ids.contains(&"shopping"));
        assert!(ids.contains(&"groceries"));
    }

    #[test]
    fn test_suggestions_ranked_and_deduped() {
        let c = categorizer();
        c.learn_from_user_input("Blue Tokai Coffee", "food_dining")
            .unwrap();
        c.learn_from_user_input("Blue Tokai Coffee", "food_dining")
            .unwrap();

        let suggestions = c.suggest_categories("Blue Tokai Coffee");
        assert!(!suggestions.is_empty());
        assert!(suggestions.windows(2).all(|w| w[0].confidence >= w[1].confidence));

        let mut ids: Vec<&str> = suggestions.iter().map(|s| s.category.id.as_str()).collect();
        let before = ids.len();
        ids.dedup();
        assert_eq!(ids.len(), before, "each category id appears once");
    }

    #[test]
    fn test_learning_flows_into_classification() {
        let c = categorizer();
        assert_eq!(c.categorize("Chai Adda").category.id, UNCATEGORIZED_ID);

        c.learn_from_user_input("Chai Adda", "food_dining").unwrap();

        let result = c.categorize("Chai Adda");
        assert_eq!(result.category.id, "food_dining");
        assert_eq!(result.confidence, 0.9);
    }

    #[test]
    fn test_process_sms_end_to_end() {
        let c = categorizer();
        let (txn, result) = c
            .process_sms(
                "VM-HDFCBK",
                "Rs.249.00 debited from a/c **4321 on 12-01-24 at SWIGGY INSTAMART. Avl bal Rs.5,000",
                received(),
            )
            .expect("transactional SMS must parse");

        assert_eq!(txn.amount, Decimal::from_str("249.00").unwrap());
        assert_eq!(txn.kind, TransactionKind::Expense);
        assert_eq!(txn.merchant, "SWIGGY INSTAMART");
        assert_eq!(txn.date, NaiveDate::from_ymd_opt(2024, 1, 12).unwrap());
        assert_eq!(txn.account_suffix.as_deref(), Some("4321"));
        assert_eq!(txn.category_id.as_deref(), Some("food_dining"));
        assert_eq!(result.source, CategorySource::KeywordMatch);
    }

    #[test]
    fn test_process_sms_drops_non_transactional() {
        let c = categorizer();
        assert!(c
            .process_sms("VM-HDFCBK", "Your OTP is 445566. Valid for 10 mins.", received())
            .is_none());
        assert!(c
            .process_sms("PROMO", "Mega sale! 50% off everything!", received())
            .is_none());
    }

    #[test]
    fn test_user_defined_result() {
        let c = categorizer();
        let result =
            CategorizationResult::user_defined(c.categories().get("travel").unwrap().clone());

        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.source, CategorySource::UserDefined);
    }

    #[test]
    fn test_process_sms_degraded_merchant_still_categorized() {
        let c = categorizer();
        let (txn, result) = c
            .process_sms(
                "VM-HDFCBK",
                "Rs.99.00 debited; merchant details unavailable",
                received(),
            )
            .expect("amount + direction suffice");

        assert_eq!(txn.merchant, "");
        assert_eq!(txn.date, received());
        assert_eq!(result.category.id, UNCATEGORIZED_ID);
        assert_eq!(result.source, CategorySource::Unmatched);
    }
}
