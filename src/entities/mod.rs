// Entity Models
//
// Each entity has:
// - Stable identity (UUID) that never changes
// - camelCase JSON shape served by the HTTP API
// - Persistence in db.rs

pub mod card;
pub mod entrepreneur;
pub mod expense_item;
pub mod expense_task;
pub mod user;

pub use card::{normalize_mask, Card, CardType, CardWithOwner, PeriodStatus, StatusAxis, NO_CARD_SENTINELS};
pub use entrepreneur::{Entrepreneur, EntrepreneurWithCards};
pub use expense_item::{ExpenseItem, ExpenseItemUpdate, NewExpenseItem};
pub use expense_task::{ExpenseTask, NewExpenseTask, TaskError, TaskStatus, TaskUpdate};
pub use user::{hash_password, User, UserRole};
