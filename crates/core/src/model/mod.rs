#![forbid(unsafe_code)]

mod pagination;
mod parent;
mod repository;
mod trigger;
mod webhook;

pub use pagination::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, Pagination};
pub use parent::{Parent, ParentColumnsError, ParentKind, UnsupportedParentError};
pub use repository::{Repository, Space};
pub use trigger::{
    DecodedTriggers, TRIGGERS_SEPARATOR, UnknownTriggerError, WebhookTrigger, decode_triggers,
    encode_triggers,
};
pub use webhook::Webhook;
