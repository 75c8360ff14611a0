#![forbid(unsafe_code)]

use gw_core::model::WebhookTrigger;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateSpaceRequest {
    pub path: String,
    pub parent_id: Option<i64>,
    pub created_at_ms: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateRepositoryRowRequest {
    pub uid: String,
    pub space_id: i64,
    pub path: String,
    pub is_public: bool,
    pub default_branch: String,
    pub created_by: i64,
    pub created_at_ms: i64,
}

/// Raw create input as it arrives from a caller. The parent is given as the
/// two storage columns and validated into a single owner before insert.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateWebhookRequest {
    pub repo_id: Option<i64>,
    pub space_id: Option<i64>,
    pub created_by: i64,
    pub url: String,
    pub secret: String,
    pub enabled: bool,
    pub insecure: bool,
    pub triggers: Vec<WebhookTrigger>,
}
