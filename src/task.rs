use crate::occurrence::TaskId;
use crate::recurrence::RecurrenceFrequency;
use serde::{Deserialize, Serialize};

/// Display attributes of a cleaning task. The generator never reads them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningTaskDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_zone_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method_id: Option<String>,
    /// Role expected to carry out the task (e.g. "plongeur", "chef de partie").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsible_role: Option<String>,
}

/// A task definition as stored in the task catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningTaskDefinition {
    pub id: TaskId,
    pub name: String,
    pub action_to_perform: String,
    pub frequency: RecurrenceFrequency,
    #[serde(flatten)]
    pub details: CleaningTaskDetails,
    pub is_active: bool,
}

/// Insert form for a task definition; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCleaningTask {
    pub name: String,
    #[serde(default)]
    pub action_to_perform: String,
    pub frequency: RecurrenceFrequency,
    #[serde(flatten)]
    pub details: CleaningTaskDetails,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl NewCleaningTask {
    pub fn new(name: impl Into<String>, frequency: RecurrenceFrequency) -> Self {
        let name = name.into();
        Self {
            action_to_perform: name.clone(),
            name,
            frequency,
            details: CleaningTaskDetails::default(),
            is_active: true,
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action_to_perform = action.into();
        self
    }

    pub fn in_zone(mut self, zone_id: impl Into<String>) -> Self {
        self.details.zone_id = Some(zone_id.into());
        self
    }

    pub fn into_definition(self, id: TaskId) -> CleaningTaskDefinition {
        CleaningTaskDefinition {
            id,
            name: self.name,
            action_to_perform: self.action_to_perform,
            frequency: self.frequency,
            details: self.details,
            is_active: self.is_active,
        }
    }
}
