use crate::occurrence::{Attribution, ScheduledOccurrence, TaskId};
use chrono::NaiveDate;

/// Builds persistable occurrence records from generated dates.
///
/// No deduplication happens here: uniqueness of `(task_id, scheduled_date)` is
/// enforced by the occurrence store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduledTaskMaterializer {
    attribution: Attribution,
    comments: Option<String>,
    initial_compliance: Option<bool>,
}

impl ScheduledTaskMaterializer {
    pub fn new(attribution: Attribution) -> Self {
        Self {
            attribution,
            comments: None,
            initial_compliance: None,
        }
    }

    /// Blank comments are stored as `None`.
    pub fn with_comments(mut self, comments: Option<String>) -> Self {
        self.comments = comments.filter(|text| !text.trim().is_empty());
        self
    }

    pub fn with_initial_compliance(mut self, is_compliant: Option<bool>) -> Self {
        self.initial_compliance = is_compliant;
        self
    }

    pub fn materialize(&self, task_id: TaskId, dates: &[NaiveDate]) -> Vec<ScheduledOccurrence> {
        dates
            .iter()
            .map(|date| ScheduledOccurrence {
                is_compliant: self.initial_compliance,
                comments: self.comments.clone(),
                user_id: self.attribution.user_id.clone(),
                employee_id: self.attribution.employee_id.clone(),
                ..ScheduledOccurrence::new(task_id, *date)
            })
            .collect()
    }
}
