use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::models::status::StatusReport;
use crate::models::user::UserId;

pub type ResourceId = Uuid;
const RESOURCE_NAME_LENGTH_LIMIT: usize = 100;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub image_url: String,
    pub created_by: UserId,
}

/// Fields submitted by the create post form. Everything but the title lands in
/// the initial status update of the new resource.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CreatePostForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub crowd: String,
    #[serde(default)]
    pub chips: String,
    #[serde(default)]
    pub queue: String,
}

#[derive(Clone, Debug)]
pub struct CreateResourceRequest {
    pub name: String,
    pub image_url: String,
    pub initial_status: StatusReport,
}

impl CreatePostForm {
    pub fn validate(self) -> Result<CreateResourceRequest, ValidationError> {
        let name = self.title.trim().to_string();
        validate_resource_name(&name)?;
        let image_url = self.image_url.trim().to_string();
        validate_image_url(&image_url)?;
        Ok(CreateResourceRequest {
            name,
            image_url,
            initial_status: StatusReport {
                description: self.description,
                crowd: self.crowd,
                chips: self.chips,
                queue: self.queue,
            },
        })
    }
}

pub fn validate_resource_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::MissingField { field: "title" });
    }
    if name.chars().count() > RESOURCE_NAME_LENGTH_LIMIT {
        return Err(ValidationError::InvalidInput {
            value: name.to_string(),
            reason: format!(
                "title cannot be longer than {} chars",
                RESOURCE_NAME_LENGTH_LIMIT
            ),
        });
    }
    Ok(())
}

// empty is allowed, the feed shows a placeholder
pub fn validate_image_url(url: &str) -> Result<(), ValidationError> {
    if url.is_empty() || url.starts_with("https://") || url.starts_with("http://") {
        return Ok(());
    }
    Err(ValidationError::InvalidInput {
        value: url.to_string(),
        reason: "image url must be an http(s) link".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_moves_status_fields_into_initial_status() {
        let request = CreatePostForm {
            title: "  Bellagio  ".into(),
            image_url: "https://img.example/bellagio.png".into(),
            description: "busy night".into(),
            crowd: "high".into(),
            chips: "plenty".into(),
            queue: "20 min".into(),
        }
        .validate()
        .unwrap();

        assert_eq!(request.name, "Bellagio");
        assert_eq!(request.initial_status.description, "busy night");
        assert_eq!(request.initial_status.queue, "20 min");
    }

    #[test]
    fn validate_requires_a_title() {
        let err = CreatePostForm::default().validate().unwrap_err();
        assert!(matches!(err, ValidationError::MissingField { field: "title" }));
    }

    #[test]
    fn validate_rejects_non_http_image() {
        let err = CreatePostForm {
            title: "Wynn".into(),
            image_url: "javascript:alert(1)".into(),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidInput { .. }));
    }
}
