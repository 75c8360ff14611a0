#![forbid(unsafe_code)]

/// Two refs selected by a diff path such as `main...feature`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompareInfo {
    pub base_ref: String,
    pub head_ref: String,
    /// `base..head` compares the tips directly instead of from the merge base.
    pub direct: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DiffPathError {
    #[error("diff path must be in the form 'base...head' or 'base..head'")]
    InvalidFormat,
    #[error("diff path has an empty base ref")]
    EmptyBase,
    #[error("diff path has an empty head ref")]
    EmptyHead,
}

pub fn parse_diff_path(path: &str) -> Result<CompareInfo, DiffPathError> {
    let path = path.trim();
    let (base, head, direct) = if let Some((base, head)) = path.split_once("...") {
        (base, head, false)
    } else if let Some((base, head)) = path.split_once("..") {
        (base, head, true)
    } else {
        return Err(DiffPathError::InvalidFormat);
    };

    let base = base.trim();
    let head = head.trim();
    if base.is_empty() {
        return Err(DiffPathError::EmptyBase);
    }
    if head.is_empty() {
        return Err(DiffPathError::EmptyHead);
    }
    // `a....b` would otherwise leave a dot glued to the head ref.
    if head.starts_with('.') {
        return Err(DiffPathError::InvalidFormat);
    }

    Ok(CompareInfo {
        base_ref: base.to_string(),
        head_ref: head.to_string(),
        direct,
    })
}
