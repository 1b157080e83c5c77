// 🏷️ Category Entity - Spending categories with a seeded default set
//
// Problem solved:
// - Classifiers speak in category ids; the registry resolves them to
//   display-ready categories (name, icon, color)
// - Default categories have STABLE string ids so the keyword table and
//   stored profiles can reference them across runs
// - User-created categories get UUID ids and is_default = false
// - One level of nesting via parent_id ("Fast Food" under "Food & Dining")

use serde::{Deserialize, Serialize};

// ============================================================================
// CATEGORY KIND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoryKind {
    /// Money going out
    Expense,

    /// Money coming in
    Income,

    /// Between own accounts (neutral)
    Transfer,
}

impl CategoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryKind::Expense => "Expense",
            CategoryKind::Income => "Income",
            CategoryKind::Transfer => "Transfer",
        }
    }
}

// ============================================================================
// CATEGORY ENTITY
// ============================================================================

/// A spending category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// Stable id: fixed slug for defaults, UUID for user categories
    pub id: String,

    /// Display name (e.g., "Food & Dining")
    pub name: String,

    /// Optional icon for UI (e.g., "🍽️", "🚕")
    pub icon: Option<String>,

    /// Optional color for UI (e.g., "#FF5733")
    pub color: Option<String>,

    pub kind: CategoryKind,

    /// True for the seeded set, false for user-created categories
    pub is_default: bool,

    /// Parent category id (one level of nesting, None = root)
    pub parent_id: Option<String>,
}

impl Category {
    /// Create a user-defined category with a fresh UUID
    pub fn new_user(name: &str, kind: CategoryKind, parent_id: Option<String>) -> Self {
        Category {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            icon: None,
            color: None,
            kind,
            is_default: false,
            parent_id,
        }
    }

    fn seeded(id: &str, name: &str, icon: &str, color: &str, kind: CategoryKind) -> Self {
        Category {
            id: id.to_string(),
            name: name.to_string(),
            icon: Some(icon.to_string()),
            color: Some(color.to_string()),
            kind,
            is_default: true,
            parent_id: None,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

// ============================================================================
// CATEGORY REGISTRY
// ============================================================================

/// Fallback category id used when no classifier is confident
pub const UNCATEGORIZED_ID: &str = "uncategorized";

/// Lookup table id → Category
///
/// Insertion order is preserved so UI listings stay stable.
pub struct CategoryRegistry {
    categories: Vec<Category>,
}

impl CategoryRegistry {
    /// Empty registry (tests mostly; real callers want `with_defaults`)
    pub fn new() -> Self {
        CategoryRegistry {
            categories: Vec::new(),
        }
    }

    /// Registry seeded with the fixed default set
    pub fn with_defaults() -> Self {
        let mut registry = CategoryRegistry::new();
        registry.seed_defaults();
        registry
    }

    fn seed_defaults(&mut self) {
        use CategoryKind::*;

        let defaults = [
            Category::seeded("food_dining", "Food & Dining", "🍽️", "#E76F51", Expense),
            Category::seeded("groceries", "Groceries", "🛒", "#2A9D8F", Expense),
            Category::seeded("shopping", "Shopping", "🛍️", "#E9C46A", Expense),
            Category::seeded("transport", "Transport", "🚕", "#264653", Expense),
            Category::seeded("entertainment", "Entertainment", "🎬", "#9B5DE5", Expense),
            Category::seeded("utilities", "Utilities", "💡", "#F4A261", Expense),
            Category::seeded("health", "Health", "🏥", "#EF476F", Expense),
            Category::seeded("travel", "Travel", "✈️", "#118AB2", Expense),
            Category::seeded("education", "Education", "📚", "#073B4C", Expense),
            Category::seeded("rent", "Rent & Housing", "🏠", "#8D99AE", Expense),
            Category::seeded("salary", "Salary", "💰", "#06D6A0", Income),
            Category::seeded("refunds", "Refunds", "↩️", "#83C5BE", Income),
            Category::seeded("transfers", "Transfers", "🔁", "#6C757D", Transfer),
            Category::seeded(UNCATEGORIZED_ID, "Uncategorized", "❓", "#ADB5BD", Expense),
        ];

        self.categories.extend(defaults);
    }

    /// Add a category; replaces any existing entry with the same id
    pub fn add(&mut self, category: Category) {
        self.categories.retain(|c| c.id != category.id);
        self.categories.push(category);
    }

    /// Look up a category by id
    pub fn get(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    /// The fallback category
    ///
    /// Seeded registries always have it; an empty registry synthesizes one
    /// so `categorize` can keep its never-fails contract.
    pub fn uncategorized(&self) -> Category {
        self.get(UNCATEGORIZED_ID).cloned().unwrap_or_else(|| {
            Category::seeded(UNCATEGORIZED_ID, "Uncategorized", "❓", "#ADB5BD", CategoryKind::Expense)
        })
    }

    /// All categories, insertion order
    pub fn all(&self) -> &[Category] {
        &self.categories
    }

    pub fn count(&self) -> usize {
        self.categories.len()
    }
}

impl Default for CategoryRegistry {
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

    #[test]
    fn test_defaults_seeded() {
        let registry = CategoryRegistry::with_defaults();

        assert!(registry.count() >= 10);
        assert!(registry.get("food_dining").is_some());
        assert!(registry.get(UNCATEGORIZED_ID).is_some());
        assert!(registry.all().iter().all(|c| c.is_default));
    }

    #[test]
    fn test_user_category() {
        let mut registry = CategoryRegistry::with_defaults();
        let custom = Category::new_user("Pet Care", CategoryKind::Expense, None);
        let id = custom.id.clone();
        registry.add(custom);

        let found = registry.get(&id).unwrap();
        assert_eq!(found.name, "Pet Care");
        assert!(!found.is_default);
        assert!(found.is_root());
    }

    #[test]
    fn test_add_replaces_same_id() {
        let mut registry = CategoryRegistry::with_defaults();
        let before = registry.count();

        let mut food = registry.get("food_dining").unwrap().clone();
        food.name = "Eating Out".to_string();
        registry.add(food);

        assert_eq!(registry.count(), before);
        assert_eq!(registry.get("food_dining").unwrap().name, "Eating Out");
    }

    #[test]
    fn test_uncategorized_always_available() {
        let registry = CategoryRegistry::new();
        let fallback = registry.uncategorized();
        assert_eq!(fallback.id, UNCATEGORIZED_ID);
    }
}
