#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParentKind {
    #[serde(rename = "repo")]
    Repository,
    #[serde(rename = "space")]
    Space,
}

impl ParentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Repository => "repo",
            Self::Space => "space",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("parent type '{0}' is not supported")]
pub struct UnsupportedParentError(pub String);

impl std::str::FromStr for ParentKind {
    type Err = UnsupportedParentError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "repo" => Ok(Self::Repository),
            "space" => Ok(Self::Space),
            other => Err(UnsupportedParentError(other.to_string())),
        }
    }
}

impl std::fmt::Display for ParentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owner of a parent-scoped entity. Exactly one owner exists by construction;
/// the nullable-column form only appears at the storage boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id")]
pub enum Parent {
    #[serde(rename = "repo")]
    Repository(i64),
    #[serde(rename = "space")]
    Space(i64),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParentColumnsError {
    #[error("both repository and space parents are set")]
    Both,
    #[error("neither repository nor space parent is set")]
    Neither,
}

impl Parent {
    pub fn new(kind: ParentKind, id: i64) -> Self {
        match kind {
            ParentKind::Repository => Self::Repository(id),
            ParentKind::Space => Self::Space(id),
        }
    }

    pub fn kind(self) -> ParentKind {
        match self {
            Self::Repository(_) => ParentKind::Repository,
            Self::Space(_) => ParentKind::Space,
        }
    }

    pub fn id(self) -> i64 {
        match self {
            Self::Repository(id) | Self::Space(id) => id,
        }
    }

    /// `(repo_id, space_id)` column pair.
    pub fn to_columns(self) -> (Option<i64>, Option<i64>) {
        match self {
            Self::Repository(id) => (Some(id), None),
            Self::Space(id) => (None, Some(id)),
        }
    }

    pub fn from_columns(
        repo_id: Option<i64>,
        space_id: Option<i64>,
    ) -> Result<Self, ParentColumnsError> {
        match (repo_id, space_id) {
            (Some(_), Some(_)) => Err(ParentColumnsError::Both),
            (Some(id), None) => Ok(Self::Repository(id)),
            (None, Some(id)) => Ok(Self::Space(id)),
            (None, None) => Err(ParentColumnsError::Neither),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_pair_must_name_exactly_one_parent() {
        assert_eq!(Parent::from_columns(Some(1), None), Ok(Parent::Repository(1)));
        assert_eq!(Parent::from_columns(None, Some(7)), Ok(Parent::Space(7)));
        assert_eq!(
            Parent::from_columns(Some(1), Some(7)),
            Err(ParentColumnsError::Both)
        );
        assert_eq!(
            Parent::from_columns(None, None),
            Err(ParentColumnsError::Neither)
        );
    }

    #[test]
    fn columns_round_trip_through_the_sum_type() {
        for parent in [Parent::Repository(3), Parent::Space(9)] {
            let (repo, space) = parent.to_columns();
            assert_eq!(Parent::from_columns(repo, space), Ok(parent));
        }
    }

    #[test]
    fn parent_kind_parse_is_closed() {
        assert_eq!("repo".parse::<ParentKind>(), Ok(ParentKind::Repository));
        assert_eq!("space".parse::<ParentKind>(), Ok(ParentKind::Space));
        assert_eq!(
            "org".parse::<ParentKind>(),
            Err(UnsupportedParentError("org".to_string()))
        );
    }
}
