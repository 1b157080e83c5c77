// Entity Models - the data the pipeline produces and learns from
//
// - Transaction: structured result of a parsed SMS (or manual entry)
// - Category: spending categories with a seeded default set
// - MerchantProfile: adaptive per-merchant category memory

pub mod category;
pub mod merchant;
pub mod transaction;

pub use category::{Category, CategoryKind, CategoryRegistry, UNCATEGORIZED_ID};
pub use merchant::MerchantProfile;
pub use transaction::{Transaction, TransactionKind, TransactionSource};
