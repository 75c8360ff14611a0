#![forbid(unsafe_code)]

//! Request-facing layer: every mutation passes the authorization gate before
//! it reaches Git or the metadata store.

pub mod auth;
mod collaborators;
pub mod config;
mod controller;
mod error;
pub mod write_params;

pub use auth::{Authorizer, Permission, PermissionTable, Resource, ResourceKind, Scope};
pub use collaborators::{
    DiffPathParser, RefRangeParser, RepositoryResolver, RepositoryStore, StaticUrlProvider,
    UrlProvider,
};
pub use config::{Config, ConfigError};
pub use controller::{
    CreateRepositoryInput, CreateWebhookInput, MergeCheck, RepoController, UpdateWebhookInput,
    WebhookController,
};
pub use error::ApiError;
pub use write_params::assemble_write_params;
