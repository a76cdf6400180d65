// 🏷️ Expense Item Entity - expense category ("статья расходов")

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseItem {
    pub id: String,
    pub name: String,
    pub description: String,

    /// User who created the item
    pub created_by: String,

    /// Deleting an item only clears this flag
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for creating an item
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExpenseItem {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub created_by: String,
}

impl NewExpenseItem {
    pub fn into_item(self) -> Result<ExpenseItem, String> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err("expense item name is required".to_string());
        }
        if self.created_by.trim().is_empty() {
            return Err("createdBy is required".to_string());
        }

        let now = Utc::now();
        Ok(ExpenseItem {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            description: self.description.trim().to_string(),
            created_by: self.created_by.trim().to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update; absent fields are left alone
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseItemUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

impl ExpenseItemUpdate {
    pub fn apply(&self, item: &mut ExpenseItem) -> Result<(), String> {
        if let Some(name) = &self.name {
            let name = name.trim();
            if name.is_empty() {
                return Err("expense item name cannot be empty".to_string());
            }
            item.name = name.to_string();
        }
        if let Some(description) = &self.description {
            item.description = description.trim().to_string();
        }
        if let Some(active) = self.is_active {
            item.is_active = active;
        }
        item.updated_at = Utc::now();
        Ok(())
    }
}
