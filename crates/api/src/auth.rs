#![forbid(unsafe_code)]

//! Authorization gate evaluated before every mutation.

use super::ApiError;
use gw_core::ids::ResourcePath;
use gw_core::model::Repository;
use gw_core::{RequestContext, Session};
use std::collections::BTreeSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Permission {
    RepoView,
    RepoEdit,
    SpaceView,
    SpaceEdit,
}

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RepoView => "repo_view",
            Self::RepoEdit => "repo_edit",
            Self::SpaceView => "space_view",
            Self::SpaceEdit => "space_edit",
        }
    }

    /// Whether holding `self` also grants `other`.
    pub fn implies(self, other: Permission) -> bool {
        match self {
            Self::SpaceEdit => true,
            Self::SpaceView => matches!(other, Self::SpaceView | Self::RepoView),
            Self::RepoEdit => matches!(other, Self::RepoEdit | Self::RepoView),
            Self::RepoView => other == Self::RepoView,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    Repository,
    Space,
}

/// Space containing the resource; empty for a root space.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scope {
    pub space_path: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resource {
    pub kind: ResourceKind,
    pub name: String,
}

pub trait Authorizer {
    /// `Ok(false)` denies; `Err` means the decision itself failed.
    fn check(
        &self,
        ctx: &RequestContext,
        session: &Session,
        scope: &Scope,
        resource: &Resource,
        permission: Permission,
    ) -> Result<bool, ApiError>;
}

pub fn check(
    ctx: &RequestContext,
    authorizer: &dyn Authorizer,
    session: &Session,
    scope: &Scope,
    resource: &Resource,
    permission: Permission,
) -> Result<(), ApiError> {
    ctx.check()?;
    let Some(principal) = session.principal() else {
        tracing::warn!(
            resource = %resource.name,
            permission = permission.as_str(),
            "anonymous access denied"
        );
        return Err(ApiError::NotAuthenticated);
    };

    if authorizer.check(ctx, session, scope, resource, permission)? {
        return Ok(());
    }
    tracing::warn!(
        principal = principal.id,
        scope = %scope.space_path,
        resource = %resource.name,
        permission = permission.as_str(),
        "access denied"
    );
    Err(ApiError::Forbidden)
}

/// Gate on a repository. With `or_public`, anyone may view a public
/// repository without consulting the authorizer.
pub fn check_repo(
    ctx: &RequestContext,
    authorizer: &dyn Authorizer,
    session: &Session,
    repo: &Repository,
    permission: Permission,
    or_public: bool,
) -> Result<(), ApiError> {
    if or_public && repo.is_public && permission == Permission::RepoView {
        ctx.check()?;
        return Ok(());
    }
    let (space, name) = repo.path.split_leaf();
    let scope = Scope {
        space_path: space.unwrap_or_default().to_string(),
    };
    let resource = Resource {
        kind: ResourceKind::Repository,
        name: name.to_string(),
    };
    check(ctx, authorizer, session, &scope, &resource, permission)
}

pub fn check_space(
    ctx: &RequestContext,
    authorizer: &dyn Authorizer,
    session: &Session,
    space_path: &ResourcePath,
    permission: Permission,
) -> Result<(), ApiError> {
    let (parent, name) = space_path.split_leaf();
    let scope = Scope {
        space_path: parent.unwrap_or_default().to_string(),
    };
    let resource = Resource {
        kind: ResourceKind::Space,
        name: name.to_string(),
    };
    check(ctx, authorizer, session, &scope, &resource, permission)
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Grant {
    principal_id: i64,
    space_path: String,
    permissions: BTreeSet<Permission>,
}

/// In-memory authorizer. A grant on a space covers the space itself, its
/// repositories and every nested space. Admin principals pass every check.
#[derive(Clone, Debug, Default)]
pub struct PermissionTable {
    grants: Vec<Grant>,
}

impl PermissionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(
        &mut self,
        principal_id: i64,
        space_path: &str,
        permissions: &[Permission],
    ) -> Result<(), ApiError> {
        let path = normalized(space_path)?;
        if let Some(existing) = self
            .grants
            .iter_mut()
            .find(|grant| grant.principal_id == principal_id && grant.space_path == path.as_str())
        {
            existing.permissions.extend(permissions.iter().copied());
            return Ok(());
        }
        self.grants.push(Grant {
            principal_id,
            space_path: path.as_str().to_string(),
            permissions: permissions.iter().copied().collect(),
        });
        Ok(())
    }
}

impl Authorizer for PermissionTable {
    fn check(
        &self,
        _ctx: &RequestContext,
        session: &Session,
        scope: &Scope,
        resource: &Resource,
        permission: Permission,
    ) -> Result<bool, ApiError> {
        let Some(principal) = session.principal() else {
            return Ok(false);
        };
        if principal.admin {
            return Ok(true);
        }

        let target = match resource.kind {
            ResourceKind::Repository => normalized(&scope.space_path)?,
            ResourceKind::Space if scope.space_path.is_empty() => normalized(&resource.name)?,
            ResourceKind::Space => normalized(&format!("{}/{}", scope.space_path, resource.name))?,
        };

        Ok(self.grants.iter().any(|grant| {
            grant.principal_id == principal.id
                && target.is_within(&grant.space_path)
                && grant.permissions.iter().any(|held| held.implies(permission))
        }))
    }
}

fn normalized(path: &str) -> Result<ResourcePath, ApiError> {
    ResourcePath::try_new(path.to_lowercase())
        .map_err(|err| ApiError::MalformedRequest(err.message().to_string()))
}
