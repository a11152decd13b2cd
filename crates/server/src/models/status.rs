use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::models::resource::ResourceId;

pub type StatusUpdateId = Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub id: StatusUpdateId,
    pub resource_id: ResourceId,
    #[serde(default)]
    pub crowd_level: String,
    #[serde(default)]
    pub chips_available: String,
    #[serde(default)]
    pub queue_length: String,
    #[serde(default)]
    pub status_message: String,
    pub created_at: DateTime<Utc>,
}

impl StatusUpdate {
    pub fn new(resource_id: ResourceId, report: StatusReport) -> Self {
        Self {
            id: Uuid::new_v4(),
            resource_id,
            crowd_level: report.crowd,
            chips_available: report.chips,
            queue_length: report.queue,
            status_message: report.description,
            created_at: Utc::now(),
        }
    }
}

/// What a user reports about a resource, as named in the forms.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatusReport {
    pub description: String,
    pub crowd: String,
    pub chips: String,
    pub queue: String,
}

/// In-place patch of the current status; `created_at` is left untouched.
#[derive(Clone, Debug, Serialize)]
pub struct StatusPatch {
    pub crowd_level: String,
    pub chips_available: String,
    pub queue_length: String,
    pub status_message: String,
}

impl From<StatusReport> for StatusPatch {
    fn from(report: StatusReport) -> Self {
        Self {
            crowd_level: report.crowd,
            chips_available: report.chips,
            queue_length: report.queue,
            status_message: report.description,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct StatusForm {
    pub description: Option<String>,
    pub crowd: Option<String>,
    pub chips: Option<String>,
    pub queue: Option<String>,
}

impl StatusForm {
    pub fn into_report(self) -> Result<StatusReport, ValidationError> {
        fn required(
            value: Option<String>,
            field: &'static str,
        ) -> Result<String, ValidationError> {
            value.ok_or(ValidationError::MissingField { field })
        }
        Ok(StatusReport {
            description: required(self.description, "description")?,
            crowd: required(self.crowd, "crowd")?,
            chips: required(self.chips, "chips")?,
            queue: required(self.queue, "queue")?,
        })
    }
}
