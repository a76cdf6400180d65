// ✅ Expense Task Entity - approval task from accountant to regional manager
//
// Accountant fills the plan (amount, due date), the manager reports the
// fact (actual amount, completion date, receipt). Status lifecycle:
//
//   assigned ──► in_progress ──► completed
//      │  └──────────────────────► completed
//      └──────────┴─────────────► cancelled

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TaskError {
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },

    #[error("actual amount is required to complete a task")]
    MissingActualAmount,

    #[error("{field} must not be negative")]
    NegativeAmount { field: &'static str },

    #[error("{0} is required")]
    MissingField(&'static str),
}

// ============================================================================
// TASK STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Assigned,
    InProgress,
    Completed,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Assigned => "assigned",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Cancelled)
    }

    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        match (*self, next) {
            (a, b) if a == b => true,
            (Assigned, InProgress) | (Assigned, Completed) | (Assigned, Cancelled) => true,
            (InProgress, Completed) | (InProgress, Cancelled) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "assigned" => Ok(TaskStatus::Assigned),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            "cancelled" => Ok(TaskStatus::Cancelled),
            other => Err(format!("unknown task status: {:?}", other)),
        }
    }
}

// ============================================================================
// EXPENSE TASK
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseTask {
    pub id: String,
    pub title: String,
    pub description: String,

    // References
    pub entrepreneur: String,
    pub card_id: String,
    pub expense_item_id: String,
    pub assigned_to: String,

    /// Copied from the entrepreneur for filtering
    pub region: String,

    // Plan (accountant)
    pub planned_amount: f64,
    pub due_date: NaiveDate,
    pub comment_for_manager: String,

    // Fact (manager)
    pub actual_amount: Option<f64>,
    pub actual_completion_date: Option<NaiveDate>,
    pub manager_comment: String,
    pub receipt_photo_url: String,

    pub status: TaskStatus,
    pub created_by: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for creating a task
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExpenseTask {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub entrepreneur: String,
    pub card_id: String,
    pub expense_item_id: String,
    pub assigned_to: String,
    pub region: String,
    pub planned_amount: f64,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub comment_for_manager: String,
    pub created_by: String,
}

impl NewExpenseTask {
    pub fn into_task(self) -> Result<ExpenseTask, TaskError> {
        let required = [
            ("title", &self.title),
            ("entrepreneur", &self.entrepreneur),
            ("cardId", &self.card_id),
            ("expenseItemId", &self.expense_item_id),
            ("assignedTo", &self.assigned_to),
            ("region", &self.region),
            ("createdBy", &self.created_by),
        ];
        if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(TaskError::MissingField(*field));
        }
        if self.planned_amount < 0.0 {
            return Err(TaskError::NegativeAmount { field: "plannedAmount" });
        }

        let now = Utc::now();
        Ok(ExpenseTask {
            id: uuid::Uuid::new_v4().to_string(),
            title: self.title.trim().to_string(),
            description: self.description,
            entrepreneur: self.entrepreneur,
            card_id: self.card_id,
            expense_item_id: self.expense_item_id,
            assigned_to: self.assigned_to,
            region: self.region.trim().to_string(),
            planned_amount: self.planned_amount,
            due_date: self.due_date,
            comment_for_manager: self.comment_for_manager,
            actual_amount: None,
            actual_completion_date: None,
            manager_comment: String::new(),
            receipt_photo_url: String::new(),
            status: TaskStatus::Assigned,
            created_by: self.created_by,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update from either side of the workflow
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub assigned_to: Option<String>,
    pub planned_amount: Option<f64>,
    pub due_date: Option<NaiveDate>,
    pub comment_for_manager: Option<String>,
    pub actual_amount: Option<f64>,
    pub actual_completion_date: Option<NaiveDate>,
    pub manager_comment: Option<String>,
    pub receipt_photo_url: Option<String>,
    pub status: Option<TaskStatus>,
}

impl TaskUpdate {
    /// Apply the update, enforcing the status lifecycle
    pub fn apply(&self, task: &mut ExpenseTask) -> Result<(), TaskError> {
        if matches!(self.planned_amount, Some(a) if a < 0.0) {
            return Err(TaskError::NegativeAmount { field: "plannedAmount" });
        }
        if matches!(self.actual_amount, Some(a) if a < 0.0) {
            return Err(TaskError::NegativeAmount { field: "actualAmount" });
        }

        if let Some(next) = self.status {
            if !task.status.can_transition_to(next) {
                return Err(TaskError::InvalidTransition { from: task.status, to: next });
            }
            if next == TaskStatus::Completed
                && self.actual_amount.is_none()
                && task.actual_amount.is_none()
            {
                return Err(TaskError::MissingActualAmount);
            }
        }

        if let Some(v) = &self.title {
            task.title = v.trim().to_string();
        }
        if let Some(v) = &self.description {
            task.description = v.clone();
        }
        if let Some(v) = &self.assigned_to {
            task.assigned_to = v.clone();
        }
        if let Some(v) = self.planned_amount {
            task.planned_amount = v;
        }
        if let Some(v) = self.due_date {
            task.due_date = v;
        }
        if let Some(v) = &self.comment_for_manager {
            task.comment_for_manager = v.clone();
        }
        if let Some(v) = self.actual_amount {
            task.actual_amount = Some(v);
        }
        if let Some(v) = self.actual_completion_date {
            task.actual_completion_date = Some(v);
        }
        if let Some(v) = &self.manager_comment {
            task.manager_comment = v.clone();
        }
        if let Some(v) = &self.receipt_photo_url {
            task.receipt_photo_url = v.clone();
        }

        if let Some(next) = self.status {
            if next == TaskStatus::Completed && task.actual_completion_date.is_none() {
                task.actual_completion_date = Some(Utc::now().date_naive());
            }
            task.status = next;
        }

        task.updated_at = Utc::now();
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn new_task() -> ExpenseTask {
        NewExpenseTask {
            title: "Оплата аренды".to_string(),
            description: String::new(),
            entrepreneur: "ip-1".to_string(),
            card_id: "card-1".to_string(),
            expense_item_id: "item-1".to_string(),
            assigned_to: "manager-1".to_string(),
            region: "Region1".to_string(),
            planned_amount: 15000.0,
            due_date: NaiveDate::from_ymd_opt(2025, 10, 25).unwrap(),
            comment_for_manager: String::new(),
            created_by: "accountant-1".to_string(),
        }
        .into_task()
        .unwrap()
    }

    #[test]
    fn test_lifecycle_transitions() {
        use TaskStatus::*;
        assert!(Assigned.can_transition_to(InProgress));
        assert!(Assigned.can_transition_to(Completed));
        assert!(Assigned.can_transition_to(Cancelled));
        assert!(InProgress.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(Cancelled));
        assert!(!InProgress.can_transition_to(Assigned));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(InProgress));
        assert!(Completed.can_transition_to(Completed));
        assert!(Completed.is_terminal());
    }

    #[test]
    fn test_new_task_starts_assigned() {
        let task = new_task();
        assert_eq!(task.status, TaskStatus::Assigned);
        assert_eq!(task.actual_amount, None);
    }

    #[test]
    fn test_new_task_rejects_negative_plan_and_missing_fields() {
        let mut raw = NewExpenseTask {
            title: "x".to_string(),
            description: String::new(),
            entrepreneur: "ip".to_string(),
            card_id: "c".to_string(),
            expense_item_id: "i".to_string(),
            assigned_to: "m".to_string(),
            region: "R".to_string(),
            planned_amount: -1.0,
            due_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            comment_for_manager: String::new(),
            created_by: "a".to_string(),
        };
        assert_eq!(
            raw.clone().into_task().unwrap_err(),
            TaskError::NegativeAmount { field: "plannedAmount" }
        );

        raw.planned_amount = 1.0;
        raw.region = " ".to_string();
        assert_eq!(raw.into_task().unwrap_err(), TaskError::MissingField("region"));
    }

    #[test]
    fn test_complete_requires_actual_amount() {
        let mut task = new_task();
        let update = TaskUpdate {
            status: Some(TaskStatus::Completed),
            ..Default::default()
        };

        assert_eq!(update.apply(&mut task), Err(TaskError::MissingActualAmount));
        assert_eq!(task.status, TaskStatus::Assigned);
    }

    #[test]
    fn test_complete_stamps_completion_date() {
        let mut task = new_task();
        TaskUpdate {
            status: Some(TaskStatus::InProgress),
            ..Default::default()
        }
        .apply(&mut task)
        .unwrap();

        TaskUpdate {
            status: Some(TaskStatus::Completed),
            actual_amount: Some(14500.0),
            manager_comment: Some("чек приложен".to_string()),
            ..Default::default()
        }
        .apply(&mut task)
        .unwrap();

        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.actual_amount, Some(14500.0));
        assert!(task.actual_completion_date.is_some());
    }

    #[test]
    fn test_cancelled_is_terminal() {
        let mut task = new_task();
        TaskUpdate {
            status: Some(TaskStatus::Cancelled),
            ..Default::default()
        }
        .apply(&mut task)
        .unwrap();

        let err = TaskUpdate {
            status: Some(TaskStatus::InProgress),
            ..Default::default()
        }
        .apply(&mut task)
        .unwrap_err();

        assert_eq!(
            err,
            TaskError::InvalidTransition {
                from: TaskStatus::Cancelled,
                to: TaskStatus::InProgress
            }
        );
        assert_eq!(err.to_string(), "invalid status transition: cancelled -> in_progress");
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_value(TaskStatus::InProgress).unwrap();
        assert_eq!(json, "in_progress");
    }
}
