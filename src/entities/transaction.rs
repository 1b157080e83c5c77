// 💳 Transaction Entity - The pipeline's end product
//
// Problem solved:
// - Exact decimal amounts (never binary float - Rs.1500.50 stays 1500.50)
// - Provenance: every transaction knows whether it came from an SMS,
//   manual entry, or an import
// - Duplicate bank notifications detected via idempotency hash, while the
//   UUID stays the stable identity for foreign keys

use crate::template::{parse_amount, Direction, RawTransactionFields};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ============================================================================
// KIND & SOURCE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    /// Money left an account (SMS direction: debit)
    Expense,

    /// Money arrived (SMS direction: credit)
    Income,

    /// Between own accounts
    Transfer,
}

impl From<Direction> for TransactionKind {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Debit => TransactionKind::Expense,
            Direction::Credit => TransactionKind::Income,
        }
    }
}

/// Where the transaction came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionSource {
    /// Parsed automatically from a bank SMS
    Sms,

    /// Entered by hand
    Manual,

    /// Batch import (statements, other apps)
    Imported,
}

// ============================================================================
// TRANSACTION ENTITY
// ============================================================================

/// A structured financial transaction
///
/// Created by the SMS pipeline or by manual entry. Mutated only by explicit
/// user edit or category re-assignment; background re-categorization never
/// rewrites a persisted transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Stable identity (UUID) - never changes, even when values are corrected
    pub id: String,

    /// Exact decimal amount, always non-negative; kind carries the sign
    pub amount: Decimal,

    pub kind: TransactionKind,

    /// Raw merchant string as extracted (may be empty when the template's
    /// merchant pattern failed - see the degradation policy)
    pub merchant: String,

    pub date: NaiveDate,

    pub source: TransactionSource,

    /// Assigned category, None until categorized
    pub category_id: Option<String>,

    /// Last digits of the account, when the SMS carried them
    pub account_suffix: Option<String>,

    /// Bank that produced the matched template
    pub bank: Option<String>,

    /// Counterpart transaction when this is one leg of a transfer
    pub transfer_peer_id: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// Date formats banks actually put in SMS bodies
const SMS_DATE_FORMATS: &[&str] = &[
    "%d-%b-%Y",  // 15-Dec-2023
    "%d-%b-%y",  // 15-Dec-23
    "%d-%m-%Y",  // 15-12-2023
    "%d/%m/%Y",  // 15/12/2023
    "%d-%m-%y",  // 15-12-23
    "%d/%m/%y",  // 15/12/23
    "%Y-%m-%d",  // 2023-12-15
    "%d%b%y",    // 15Dec23
];

impl Transaction {
    /// Assemble a transaction from matched SMS fields
    ///
    /// `received_at` is the fallback date when the template extracted no
    /// parseable date text. Returns None only if the fields carry an
    /// unparseable amount or direction - the matcher already guarantees
    /// both, so pipeline callers never see None here.
    pub fn from_sms(fields: &RawTransactionFields, received_at: NaiveDate) -> Option<Self> {
        let amount = parse_amount(&fields.amount_text)?;
        let direction = Direction::from_text(&fields.direction_text)?;

        Some(Transaction {
            id: uuid::Uuid::new_v4().to_string(),
            amount,
            kind: direction.into(),
            merchant: fields.merchant_text.clone(),
            date: parse_sms_date(&fields.date_text).unwrap_or(received_at),
            source: TransactionSource::Sms,
            category_id: None,
            account_suffix: fields.account_suffix.clone(),
            bank: Some(fields.bank_name.clone()),
            transfer_peer_id: None,
            created_at: Utc::now(),
        })
    }

    /// Create a manual transaction
    pub fn manual(
        amount: Decimal,
        kind: TransactionKind,
        merchant: &str,
        date: NaiveDate,
    ) -> Self {
        Transaction {
            id: uuid::Uuid::new_v4().to_string(),
            amount,
            kind,
            merchant: merchant.to_string(),
            date,
            source: TransactionSource::Manual,
            category_id: None,
            account_suffix: None,
            bank: None,
            transfer_peer_id: None,
            created_at: Utc::now(),
        }
    }

    /// Compute idempotency hash for duplicate detection
    /// NOTE: This is for DEDUPLICATION, not IDENTITY!
    /// Identity = id (UUID), Deduplication = hash
    ///
    /// Two SMS notifications for the same debit (banks love sending both an
    /// "update" and a "confirmation") hash identically.
    pub fn idempotency_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!(
            "{}|{}|{}|{}",
            self.date,
            self.amount,
            self.merchant,
            self.bank.as_deref().unwrap_or(""),
        ));
        format!("{:x}", hasher.finalize())
    }
}

/// Parse SMS date text against the known bank formats
fn parse_sms_date(text: &str) -> Option<NaiveDate> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    SMS_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}

// ============================================================================
// TESTS
// ============================================================================
