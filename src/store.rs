// 🗄️ Stores - Merchant profile, keyword table, and category persistence
//
// Problem solved:
// - Classifiers depend on an explicit MerchantStore trait, injected at
//   construction (no process-wide singletons), so tests swap in the
//   in-memory implementation and concurrency tests can inject races
// - The SQLite implementation (WAL mode) is what the app ships with; one
//   database holds profiles, the keyword table, and user categories

use crate::entities::{Category, CategoryKind, MerchantProfile};
use crate::error::StoreError;
use crate::keyword::KeywordEntry;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

// ============================================================================
// MERCHANT STORE TRAIT
// ============================================================================

/// Key-value store for merchant profiles, keyed by normalized name
///
/// `find_by_token_overlap` returns every profile whose normalized name
/// contains at least one of the given tokens as a whole token. Callers
/// pre-filter tokens (the history classifier only passes tokens of
/// length >= 3).
pub trait MerchantStore {
    fn get(&self, normalized_name: &str) -> Result<Option<MerchantProfile>, StoreError>;

    fn put(&self, profile: &MerchantProfile) -> Result<(), StoreError>;

    fn find_by_token_overlap(&self, tokens: &[&str]) -> Result<Vec<MerchantProfile>, StoreError>;
}

fn shares_token(profile: &MerchantProfile, tokens: &[&str]) -> bool {
    profile.tokens().iter().any(|t| tokens.contains(t))
}

// ============================================================================
// IN-MEMORY STORE
// ============================================================================

/// In-memory merchant store for tests and ephemeral sessions
pub struct InMemoryStore {
    profiles: RwLock<HashMap<String, MerchantProfile>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        InMemoryStore {
            profiles: RwLock::new(HashMap::new()),
        }
    }

    pub fn count(&self) -> usize {
        self.profiles.read().unwrap().len()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MerchantStore for InMemoryStore {
    fn get(&self, normalized_name: &str) -> Result<Option<MerchantProfile>, StoreError> {
        Ok(self.profiles.read().unwrap().get(normalized_name).cloned())
    }

    fn put(&self, profile: &MerchantProfile) -> Result<(), StoreError> {
        self.profiles
            .write()
            .unwrap()
            .insert(profile.normalized_name.clone(), profile.clone());
        Ok(())
    }

    fn find_by_token_overlap(&self, tokens: &[&str]) -> Result<Vec<MerchantProfile>, StoreError> {
        Ok(self
            .profiles
            .read()
            .unwrap()
            .values()
            .filter(|p| shares_token(p, tokens))
            .cloned()
            .collect())
    }
}

// ============================================================================
// SQLITE STORE
// ============================================================================

/// SQLite-backed store: merchant profiles + keyword table + categories
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and set up the schema
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// In-memory SQLite database (tests)
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        setup_schema(&conn)?;
        Ok(SqliteStore { conn })
    }

    // ------------------------------------------------------------------------
    // KEYWORD TABLE
    // ------------------------------------------------------------------------

    /// All keyword mappings, insertion order (rowid)
    pub fn load_keywords(&self) -> Result<Vec<KeywordEntry>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT keyword, category_id FROM keyword_map ORDER BY rowid")?;

        let entries = stmt
            .query_map([], |row| {
                Ok(KeywordEntry {
                    keyword: row.get(0)?,
                    category_id: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    pub fn save_keyword(&self, entry: &KeywordEntry) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO keyword_map (keyword, category_id) VALUES (?1, ?2)
             ON CONFLICT(keyword) DO UPDATE SET category_id = excluded.category_id",
            params![entry.keyword, entry.category_id],
        )?;
        Ok(())
    }

    pub fn delete_keyword(&self, keyword: &str) -> Result<bool, StoreError> {
        let n = self
            .conn
            .execute("DELETE FROM keyword_map WHERE keyword = ?1", params![keyword])?;
        Ok(n > 0)
    }

    // ------------------------------------------------------------------------
    // CATEGORIES
    // ------------------------------------------------------------------------

    /// User-created categories (defaults are seeded in code, not persisted)
    pub fn load_categories(&self) -> Result<Vec<Category>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, icon, color, kind, parent_id FROM categories ORDER BY rowid",
        )?;

        let categories = stmt
            .query_map([], |row| {
                let kind: String = row.get(4)?;
                Ok(Category {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    icon: row.get(2)?,
                    color: row.get(3)?,
                    kind: match kind.as_str() {
                        "Income" => CategoryKind::Income,
                        "Transfer" => CategoryKind::Transfer,
                        _ => CategoryKind::Expense,
                    },
                    is_default: false,
                    parent_id: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(categories)
    }

    pub fn save_category(&self, category: &Category) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO categories (id, name, icon, color, kind, parent_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                icon = excluded.icon,
                color = excluded.color,
                kind = excluded.kind,
                parent_id = excluded.parent_id",
            params![
                category.id,
                category.name,
                category.icon,
                category.color,
                category.kind.as_str(),
                category.parent_id,
            ],
        )?;
        Ok(())
    }

    /// Count of stored merchant profiles
    pub fn profile_count(&self) -> Result<i64, StoreError> {
        let count =
            self.conn
                .query_row("SELECT COUNT(*) FROM merchant_profiles", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn setup_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS merchant_profiles (
            normalized_name   TEXT PRIMARY KEY,
            name              TEXT NOT NULL,
            category_id       TEXT,
            confidence        REAL NOT NULL,
            observation_count INTEGER NOT NULL,
            first_seen        TEXT NOT NULL,
            updated_at        TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS keyword_map (
            keyword     TEXT PRIMARY KEY,
            category_id TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS categories (
            id        TEXT PRIMARY KEY,
            name      TEXT NOT NULL,
            icon      TEXT,
            color     TEXT,
            kind      TEXT NOT NULL,
            parent_id TEXT
        );",
    )?;
    Ok(())
}

fn row_to_profile(row: &rusqlite::Row<'_>) -> rusqlite::Result<(MerchantProfile, String, String)> {
    let profile = MerchantProfile {
        normalized_name: row.get(0)?,
        name: row.get(1)?,
        category_id: row.get(2)?,
        confidence: row.get(3)?,
        observation_count: row.get::<_, i64>(4)? as u32,
        first_seen: Utc::now(),
        updated_at: Utc::now(),
    };
    let first_seen: String = row.get(5)?;
    let updated_at: String = row.get(6)?;
    Ok((profile, first_seen, updated_at))
}

fn parse_timestamp(key: &str, field: &str, raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::CorruptRow {
            key: key.to_string(),
            detail: format!("bad {field} timestamp {raw:?}: {e}"),
        })
}

fn finish_profile(
    (mut profile, first_seen, updated_at): (MerchantProfile, String, String),
) -> Result<MerchantProfile, StoreError> {
    profile.first_seen = parse_timestamp(&profile.normalized_name, "first_seen", &first_seen)?;
    profile.updated_at = parse_timestamp(&profile.normalized_name, "updated_at", &updated_at)?;
    Ok(profile)
}

const PROFILE_COLUMNS: &str =
    "normalized_name, name, category_id, confidence, observation_count, first_seen, updated_at";

impl MerchantStore for SqliteStore {
    fn get(&self, normalized_name: &str) -> Result<Option<MerchantProfile>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PROFILE_COLUMNS} FROM merchant_profiles WHERE normalized_name = ?1"
        ))?;

        let mut rows = stmt.query_map(params![normalized_name], row_to_profile)?;
        match rows.next() {
            Some(row) => Ok(Some(finish_profile(row?)?)),
            None => Ok(None),
        }
    }

    fn put(&self, profile: &MerchantProfile) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO merchant_profiles
                (normalized_name, name, category_id, confidence, observation_count,
                 first_seen, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(normalized_name) DO UPDATE SET
                name = excluded.name,
                category_id = excluded.category_id,
                confidence = excluded.confidence,
                observation_count = excluded.observation_count,
                updated_at = excluded.updated_at",
            params![
                profile.normalized_name,
                profile.name,
                profile.category_id,
                profile.confidence,
                profile.observation_count as i64,
                profile.first_seen.to_rfc3339(),
                profile.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn find_by_token_overlap(&self, tokens: &[&str]) -> Result<Vec<MerchantProfile>, StoreError> {
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        // Profile stores stay small (one row per distinct merchant), so a
        // scan + in-process token filter beats LIKE gymnastics in SQL
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {PROFILE_COLUMNS} FROM merchant_profiles"))?;

        let mut matches = Vec::new();
        for row in stmt.query_map([], row_to_profile)? {
            let profile = finish_profile(row?)?;
            if shares_token(&profile, tokens) {
                matches.push(profile);
            }
        }

        Ok(matches)
    }
}

// ============================================================================
// TESTS
// ============================================================================
