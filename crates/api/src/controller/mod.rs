#![forbid(unsafe_code)]

mod repo;
mod webhook;

pub use repo::{CreateRepositoryInput, MergeCheck, RepoController};
pub use webhook::{CreateWebhookInput, UpdateWebhookInput, WebhookController};
