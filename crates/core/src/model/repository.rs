#![forbid(unsafe_code)]

use serde::Serialize;

use crate::ids::{RepoUid, ResourcePath};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Space {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub path: ResourcePath,
    pub created: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Repository {
    pub id: i64,
    pub uid: RepoUid,
    pub space_id: i64,
    pub path: ResourcePath,
    pub is_public: bool,
    pub default_branch: String,
    pub created_by: i64,
    pub created: i64,
}
