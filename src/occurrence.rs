use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifier of a cleaning task definition.
pub type TaskId = i64;

/// Who scheduled a batch of occurrences. Copied onto every record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribution {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
}

impl Attribution {
    pub fn new(user_id: Option<String>, employee_id: Option<String>) -> Self {
        Self {
            user_id,
            employee_id,
        }
    }
}

/// One concrete calendar instance of a recurring cleaning task.
///
/// Records start open: not completed, compliance unknown. Completion fields
/// are filled in later by whoever performs the task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledOccurrence {
    pub task_id: TaskId,
    pub scheduled_date: NaiveDate,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub is_compliant: Option<bool>,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub completion_date: Option<NaiveDate>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub employee_id: Option<String>,
}

impl ScheduledOccurrence {
    pub fn new(task_id: TaskId, scheduled_date: NaiveDate) -> Self {
        Self {
            task_id,
            scheduled_date,
            is_completed: false,
            is_compliant: None,
            comments: None,
            completion_date: None,
            photo_url: None,
            user_id: None,
            employee_id: None,
        }
    }
}
