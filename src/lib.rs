// SMS Ledger - Core Library
// Turns unstructured bank SMS text into structured, categorized
// transactions, fully on-device. Exposes all modules for the app shell,
// CLI, and tests.

pub mod entities;
pub mod error;
pub mod history;
pub mod keyword;
pub mod normalizer;
pub mod orchestrator;
pub mod store;
pub mod template;

// Re-export commonly used types
pub use entities::{
    Category, CategoryKind, CategoryRegistry, MerchantProfile, Transaction, TransactionKind,
    TransactionSource, UNCATEGORIZED_ID,
};
pub use error::{StoreError, TemplateError};
pub use history::{MerchantHistoryClassifier, EXACT_MATCH_CONFIDENCE, MIN_CONFIDENCE};
pub use keyword::{KeywordClassifier, KeywordEntry, KEYWORD_MATCH_CONFIDENCE};
pub use normalizer::{jaccard, normalize, tokens};
pub use orchestrator::{CategorizationResult, Categorizer, CategorySource};
pub use store::{InMemoryStore, MerchantStore, SqliteStore};
pub use template::{
    default_templates, parse_amount, Direction, RawTransactionFields, SmsTemplate, TemplateSet,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
