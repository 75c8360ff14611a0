#![forbid(unsafe_code)]

use serde::Serialize;

use super::{Parent, WebhookTrigger};

/// Webhook registration. `id`, `created` and `parent` never change after
/// creation; `version` and `updated` are owned by the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Webhook {
    pub id: i64,
    pub version: i64,
    pub parent: Parent,
    pub created_by: i64,
    pub created: i64,
    pub updated: i64,

    pub url: String,
    #[serde(skip_serializing)]
    pub secret: String,
    pub enabled: bool,
    pub insecure: bool,
    pub triggers: Vec<WebhookTrigger>,
}

impl Webhook {
    pub fn has_secret(&self) -> bool {
        !self.secret.is_empty()
    }

    pub fn fires_on(&self, trigger: WebhookTrigger) -> bool {
        self.enabled && (self.triggers.is_empty() || self.triggers.contains(&trigger))
    }
}
