use serde::Deserialize;

use super::repo_types::TaskPatch;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub name: String,
    #[serde(default)]
    pub details: String,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTaskRequest {
    pub name: Option<String>,
    pub details: Option<String>,
    #[serde(alias = "haveStar")]
    pub star: Option<bool>,
}

impl TryFrom<UpdateTaskRequest> for TaskPatch {
    type Error = ApiError;

    fn try_from(req: UpdateTaskRequest) -> Result<Self, Self::Error> {
        if req.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(ApiError::BadRequest("Task name must not be empty".into()));
        }
        Ok(TaskPatch {
            name: req.name,
            details: req.details,
            starred: req.star,
        })
    }
}
