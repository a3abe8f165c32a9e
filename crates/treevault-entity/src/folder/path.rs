//! Materialized path arithmetic.
//!
//! Every folder stores the chain of folder keys from the root down to
//! itself, e.g. `/1/4/9/`. Ancestor and descendant tests become string
//! prefix comparisons, and the full ancestor chain can be read back from
//! the string without touching the database.

use std::fmt;

use serde::{Deserialize, Serialize};

use treevault_core::error::AppError;
use treevault_core::types::FolderId;

/// Path separator, also the leading and trailing character of every path.
pub const SEPARATOR: char = '/';

/// A validated materialized path such as `/1/4/9/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MaterializedPath(String);

impl MaterializedPath {
    /// Path of a root-level folder: `/<id>/`.
    pub fn root(id: FolderId) -> Self {
        Self(format!("{SEPARATOR}{id}{SEPARATOR}"))
    }

    /// Path of a direct child of this folder.
    pub fn child(&self, id: FolderId) -> Self {
        Self(format!("{}{id}{SEPARATOR}", self.0))
    }

    /// `parent.path + id + "/"`, or `"/" + id + "/"` at the root.
    pub fn compute(parent: Option<&MaterializedPath>, id: FolderId) -> Self {
        match parent {
            Some(parent) => parent.child(id),
            None => Self::root(id),
        }
    }

    /// Parse and validate a stored path.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let inner = raw
            .strip_prefix(SEPARATOR)
            .and_then(|rest| rest.strip_suffix(SEPARATOR))
            .ok_or_else(|| AppError::internal(format!("Malformed folder path '{raw}'")))?;

        if inner.is_empty()
            || !inner
                .split(SEPARATOR)
                .all(|seg| !seg.is_empty() && seg.bytes().all(|b| b.is_ascii_digit()))
        {
            return Err(AppError::internal(format!("Malformed folder path '{raw}'")));
        }

        Ok(Self(raw.to_string()))
    }

    /// Return the path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this path equals `ancestor` or lies below it.
    pub fn is_descendant_or_self(&self, ancestor: &MaterializedPath) -> bool {
        is_descendant_or_self(&self.0, &ancestor.0)
    }

    /// Whether this path lies strictly below `ancestor`.
    pub fn is_strict_descendant_of(&self, ancestor: &MaterializedPath) -> bool {
        is_strict_descendant(&self.0, &ancestor.0)
    }

    /// Every folder key on the path, root first, ending with the folder itself.
    pub fn segments(&self) -> Vec<FolderId> {
        self.0
            .split(SEPARATOR)
            .filter(|seg| !seg.is_empty())
            .filter_map(|seg| seg.parse::<i64>().ok())
            .map(FolderId)
            .collect()
    }

    /// Keys of all ancestors, root first, excluding the folder itself.
    pub fn ancestor_ids(&self) -> Vec<FolderId> {
        let mut segments = self.segments();
        segments.pop();
        segments
    }

    /// Key of the folder this path belongs to.
    pub fn leaf_id(&self) -> Option<FolderId> {
        self.segments().last().copied()
    }

    /// Number of folders on the path (a root folder has depth 1).
    pub fn depth(&self) -> usize {
        self.0.matches(SEPARATOR).count().saturating_sub(1)
    }

    /// Swap the `old_prefix` of this path for `new_prefix`.
    ///
    /// Returns `None` when the path does not start with `old_prefix`. This
    /// is the per-row form of the bulk rewrite performed on move.
    pub fn rebase(
        &self,
        old_prefix: &MaterializedPath,
        new_prefix: &MaterializedPath,
    ) -> Option<MaterializedPath> {
        self.0
            .strip_prefix(old_prefix.as_str())
            .map(|rest| Self(format!("{}{rest}", new_prefix.as_str())))
    }
}

impl fmt::Display for MaterializedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for MaterializedPath {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<MaterializedPath> for String {
    fn from(path: MaterializedPath) -> Self {
        path.0
    }
}

/// `candidate` starts with `ancestor`.
///
/// Both paths end with the separator, so `/1/` never matches `/12/`.
pub fn is_descendant_or_self(candidate: &str, ancestor: &str) -> bool {
    candidate.starts_with(ancestor)
}

/// `candidate` starts with `ancestor` and is not equal to it.
pub fn is_strict_descendant(candidate: &str, ancestor: &str) -> bool {
    candidate.len() > ancestor.len() && candidate.starts_with(ancestor)
}
