#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

/// Joins triggers in storage. No trigger name may contain it.
pub const TRIGGERS_SEPARATOR: char = ',';

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookTrigger {
    BranchCreated,
    BranchUpdated,
    BranchDeleted,
    TagCreated,
    TagUpdated,
    TagDeleted,
    PullreqCreated,
    PullreqReopened,
    PullreqBranchUpdated,
}

impl WebhookTrigger {
    pub const ALL: [WebhookTrigger; 9] = [
        Self::BranchCreated,
        Self::BranchUpdated,
        Self::BranchDeleted,
        Self::TagCreated,
        Self::TagUpdated,
        Self::TagDeleted,
        Self::PullreqCreated,
        Self::PullreqReopened,
        Self::PullreqBranchUpdated,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::BranchCreated => "branch_created",
            Self::BranchUpdated => "branch_updated",
            Self::BranchDeleted => "branch_deleted",
            Self::TagCreated => "tag_created",
            Self::TagUpdated => "tag_updated",
            Self::TagDeleted => "tag_deleted",
            Self::PullreqCreated => "pullreq_created",
            Self::PullreqReopened => "pullreq_reopened",
            Self::PullreqBranchUpdated => "pullreq_branch_updated",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown webhook trigger '{0}'")]
pub struct UnknownTriggerError(pub String);

impl std::str::FromStr for WebhookTrigger {
    type Err = UnknownTriggerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|trigger| trigger.as_str() == value)
            .ok_or_else(|| UnknownTriggerError(value.to_string()))
    }
}

impl std::fmt::Display for WebhookTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn encode_triggers(triggers: &[WebhookTrigger]) -> String {
    let mut out = String::new();
    for (index, trigger) in triggers.iter().enumerate() {
        if index > 0 {
            out.push(TRIGGERS_SEPARATOR);
        }
        out.push_str(trigger.as_str());
    }
    out
}

/// Result of reading a stored trigger list. Names this build does not know
/// (written by a newer writer) are kept aside instead of failing the read.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodedTriggers {
    pub triggers: Vec<WebhookTrigger>,
    pub unknown: Vec<String>,
}

pub fn decode_triggers(raw: &str) -> DecodedTriggers {
    let mut decoded = DecodedTriggers::default();
    if raw.is_empty() {
        return decoded;
    }
    for name in raw.split(TRIGGERS_SEPARATOR) {
        match name.parse::<WebhookTrigger>() {
            Ok(trigger) => decoded.triggers.push(trigger),
            Err(_) => decoded.unknown.push(name.to_string()),
        }
    }
    decoded
}
