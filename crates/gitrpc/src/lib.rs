#![forbid(unsafe_code)]

//! Git mutation contract and its execution service.
//!
//! Every operation receives its full state explicitly (paths, identities,
//! options). A backend never keeps a working copy bound to a repository
//! between calls, which lets the same service run in-process or behind a
//! remote call.

mod adapter;
mod error;
mod git2_adapter;
mod params;
mod service;

pub use adapter::{CloneOptions, CommitOptions, Credentials, GitAdapter, MergeOptions, PushOptions};
pub use error::GitError;
pub use git2_adapter::Git2Adapter;
pub use params::{
    CreateRepositoryParams, FileUpload, MergeOutput, MergeParams, WriteParams,
};
pub use service::{GitRpc, GitService, GitServiceConfig};
