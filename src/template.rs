// 📨 SMS Templates - Declarative per-bank parsing rules
//
// Problem solved:
// - Every bank formats transaction SMS differently; hardcoding per-bank
//   parsers means a code change per bank
// - Here each bank is a data-only SmsTemplate (regex strings, JSON-loadable);
//   dispatch is a linear first-match scan, so adding a bank is adding data
// - An SMS is a transaction candidate only if amount AND direction both
//   extract; merchant/date failures degrade to empty strings instead of
//   rejecting the message

use crate::error::TemplateError;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;

// ============================================================================
// DIRECTION
// ============================================================================

/// Money movement direction as banks phrase it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Debit,
    Credit,
}

impl Direction {
    /// Map matched direction text through the fixed vocabulary
    ///
    /// Unrecognized text returns None, which rejects the whole template -
    /// guessing a direction would corrupt the ledger.
    pub fn from_text(text: &str) -> Option<Direction> {
        match text.trim().to_lowercase().as_str() {
            "debited" | "debit" | "dr" | "spent" | "paid" | "withdrawn" | "sent" => {
                Some(Direction::Debit)
            }
            "credited" | "credit" | "cr" | "received" | "deposited" | "refunded" => {
                Some(Direction::Credit)
            }
            _ => None,
        }
    }
}

// ============================================================================
// TEMPLATE (DATA-ONLY)
// ============================================================================

/// One bank's parsing rules - pure data, immutable once loaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmsTemplate {
    pub bank_name: String,

    /// Matched against the SMS sender id (e.g., "VM-HDFCBK")
    pub sender_pattern: String,

    /// Must yield a capture group over the body, or the template rejects
    pub amount_pattern: String,

    pub merchant_pattern: String,

    pub date_pattern: String,

    /// Match text is mapped through `Direction::from_text`
    pub direction_pattern: String,

    #[serde(default)]
    pub account_suffix_pattern: Option<String>,

    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// Raw field strings from a successful template match
///
/// Transient: consumed immediately by `Transaction::from_sms`, never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTransactionFields {
    pub bank_name: String,
    pub amount_text: String,
    /// Empty when the merchant pattern failed (degradation policy)
    pub merchant_text: String,
    /// Empty when the date pattern failed; caller supplies a fallback date
    pub date_text: String,
    pub direction_text: String,
    pub account_suffix: Option<String>,
}

// ============================================================================
// COMPILED TEMPLATE
// ============================================================================

/// A template with its patterns compiled, ready to apply
#[derive(Debug)]
struct CompiledTemplate {
    bank_name: String,
    sender: Regex,
    amount: Regex,
    merchant: Regex,
    date: Regex,
    direction: Regex,
    account_suffix: Option<Regex>,
}

impl CompiledTemplate {
    fn compile(template: &SmsTemplate) -> Result<Self, TemplateError> {
        let build = |field: &'static str, pattern: &str| {
            Regex::new(pattern).map_err(|source| TemplateError::BadPattern {
                bank: template.bank_name.clone(),
                field,
                source,
            })
        };

        Ok(CompiledTemplate {
            bank_name: template.bank_name.clone(),
            sender: build("sender", &template.sender_pattern)?,
            amount: build("amount", &template.amount_pattern)?,
            merchant: build("merchant", &template.merchant_pattern)?,
            date: build("date", &template.date_pattern)?,
            direction: build("direction", &template.direction_pattern)?,
            account_suffix: template
                .account_suffix_pattern
                .as_deref()
                .map(|p| build("account_suffix", p))
                .transpose()?,
        })
    }

    /// Apply body patterns; None means this template does not fit the body
    fn try_match(&self, body: &str) -> Option<RawTransactionFields> {
        // Hard requirements: amount must capture AND parse as an exact
        // decimal, direction must capture AND be in the vocabulary
        let amount_text = capture(&self.amount, body)?;
        parse_amount(&amount_text)?;

        let direction_text = capture(&self.direction, body)?;
        Direction::from_text(&direction_text)?;

        // Soft fields: degrade to empty rather than rejecting the message
        let merchant_text = capture(&self.merchant, body).unwrap_or_default();
        let date_text = capture(&self.date, body).unwrap_or_default();
        let account_suffix = self
            .account_suffix
            .as_ref()
            .and_then(|re| capture(re, body));

        Some(RawTransactionFields {
            bank_name: self.bank_name.clone(),
            amount_text,
            merchant_text,
            date_text,
            direction_text,
            account_suffix,
        })
    }
}

/// First capture group if present, else the whole match, trimmed
fn capture(re: &Regex, body: &str) -> Option<String> {
    let caps = re.captures(body)?;
    let m = caps.get(1).or_else(|| caps.get(0))?;
    let text = m.as_str().trim();
    if text.is_empty() {
        return None;
    }
    Some(text.to_string())
}

/// Parse captured amount text as an exact decimal
///
/// Thousands separators are stripped; sub-unit precision is preserved.
/// Never goes through binary floating point.
pub fn parse_amount(text: &str) -> Option<Decimal> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    Decimal::from_str(&cleaned).ok()
}

// ============================================================================
// TEMPLATE SET
// ============================================================================

/// Ordered set of active templates - order is priority
#[derive(Debug)]
pub struct TemplateSet {
    templates: Vec<CompiledTemplate>,
}

impl TemplateSet {
    pub fn new() -> Self {
        TemplateSet {
            templates: Vec::new(),
        }
    }

    /// Compile a list of templates, preserving order, skipping inactive ones
    pub fn from_templates(templates: &[SmsTemplate]) -> Result<Self, TemplateError> {
        let mut set = TemplateSet::new();
        for template in templates.iter().filter(|t| t.is_active) {
            set.templates.push(CompiledTemplate::compile(template)?);
        }
        Ok(set)
    }

    /// Load templates from a JSON array
    pub fn from_json(json: &str) -> Result<Self, TemplateError> {
        let templates: Vec<SmsTemplate> = serde_json::from_str(json)?;
        Self::from_templates(&templates)
    }

    /// Load templates from a JSON file (settings layer hands us a path)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TemplateError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Template set covering common Indian bank SMS formats
    pub fn with_defaults() -> Self {
        Self::from_templates(&default_templates())
            .unwrap_or_else(|e| panic!("default templates must compile: {e}"))
    }

    /// Append a template (lowest priority)
    pub fn add(&mut self, template: &SmsTemplate) -> Result<(), TemplateError> {
        if template.is_active {
            self.templates.push(CompiledTemplate::compile(template)?);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Match an incoming SMS against the template set
    ///
    /// For each bank, only the FIRST template whose sender pattern matches
    /// is tried against the body. An unknown sender walks every bank's
    /// templates until one fits or all are exhausted. Returns None for
    /// non-transactional messages (OTPs, promos, balance alerts).
    pub fn match_sms(&self, sender: &str, body: &str) -> Option<RawTransactionFields> {
        let mut tried_banks: HashSet<&str> = HashSet::new();

        for template in &self.templates {
            if !template.sender.is_match(sender) {
                continue;
            }
            if !tried_banks.insert(template.bank_name.as_str()) {
                continue;
            }
            if let Some(fields) = template.try_match(body) {
                return Some(fields);
            }
            tracing::debug!(
                bank = %template.bank_name,
                "sender matched but body fields did not extract"
            );
        }

        None
    }
}

impl Default for TemplateSet {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Built-in templates for common Indian banks
///
/// Amount/direction patterns are deliberately broad (banks reword SMS
/// copy often); merchant and date patterns are best-effort and allowed
/// to fail per the degradation policy.
pub fn default_templates() -> Vec<SmsTemplate> {
    let standard = |bank: &str, sender: &str| SmsTemplate {
        bank_name: bank.to_string(),
        sender_pattern: sender.to_string(),
        amount_pattern: r"(?i)(?:Rs\.?|INR)\s*([0-9,]+\.?[0-9]*)".to_string(),
        merchant_pattern: r"(?i)\b(?:at|to|towards)\s+([A-Za-z0-9][A-Za-z0-9 &.*_-]*?)(?:\s+on\b|\s+ref\b|\.|,|$)"
            .to_string(),
        date_pattern: r"(?i)\bon\s+([0-9]{1,2}[-/][A-Za-z0-9]{2,3}[-/][0-9]{2,4})".to_string(),
        direction_pattern: r"(?i)\b(debited|credited|spent|paid|withdrawn|deposited|received)\b"
            .to_string(),
        account_suffix_pattern: Some(
            r"(?i)(?:a/c|account|card)\s*(?:no\.?\s*)?[Xx*]*([0-9]{3,6})".to_string(),
        ),
        is_active: true,
    };

    vec![
        standard("HDFC", r"(?i)HDFC"),
        standard("ICICI", r"(?i)ICICI"),
        standard("SBI", r"(?i)\bSBI|SBIINB|CBSSBI"),
        standard("Axis", r"(?i)AXIS"),
    ]
}

// ============================================================================
// TESTS
// ============================================================================
