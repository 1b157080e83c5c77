// Error taxonomy for the categorization core
//
// Match failures are not errors: a non-transactional SMS simply yields None
// and is dropped. Errors exist only where state is involved - the merchant
// and keyword stores - and where template files fail to load.

use thiserror::Error;

/// Failures at the merchant/keyword store boundary
///
/// Classification layers swallow these (log + fall through to the next
/// layer); `learn` surfaces them so the caller can retry, because a lost
/// learning event silently degrades future accuracy.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store query failed: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("corrupt row for key {key}: {detail}")]
    CorruptRow { key: String, detail: String },
}

/// Failures loading or compiling SMS templates
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("invalid {field} pattern for bank {bank}: {source}")]
    BadPattern {
        bank: String,
        field: &'static str,
        #[source]
        source: regex::Error,
    },

    #[error("template file is not valid JSON: {0}")]
    BadJson(#[from] serde_json::Error),

    #[error("failed to read template file: {0}")]
    Io(#[from] std::io::Error),
}
