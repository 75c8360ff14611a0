#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalKind {
    User,
    ServiceAccount,
    Service,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: i64,
    pub uid: String,
    pub kind: PrincipalKind,
    pub display_name: String,
    pub email: String,
    pub admin: bool,
}

/// Author/committer identity as written into Git objects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Identity {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && !self.email.trim().is_empty()
    }
}

/// Authenticated (or anonymous) caller of a single request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    principal: Option<Principal>,
}

impl Session {
    pub fn authenticated(principal: Principal) -> Self {
        Self {
            principal: Some(principal),
        }
    }

    pub fn anonymous() -> Self {
        Self { principal: None }
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn is_anonymous(&self) -> bool {
        self.principal.is_none()
    }

    /// Identity used for commit authorship on behalf of this session.
    pub fn identity(&self) -> Option<Identity> {
        self.principal
            .as_ref()
            .map(|principal| Identity::new(&principal.display_name, &principal.email))
    }
}
