use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BookMagicError;

const MAX_PROJECT_ID_LEN: usize = 128;

/// Opaque key naming one manuscript and every artifact derived from it.
///
/// The id is used verbatim as a file stem under the uploads, output and
/// export directories, so it is restricted to a path-safe alphabet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectId(String);

impl ProjectId {
    pub fn parse(raw: &str) -> Result<Self, BookMagicError> {
        let invalid = |reason| BookMagicError::InvalidProjectId {
            id: raw.to_owned(),
            reason,
        };

        let id = raw.trim();
        if id.is_empty() {
            return Err(invalid("must not be empty"));
        }
        if id.len() > MAX_PROJECT_ID_LEN {
            return Err(invalid("must be at most 128 characters"));
        }
        if id.starts_with('.') {
            return Err(invalid("must not start with '.'"));
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(invalid("only ASCII letters, digits, '-', '_' and '.' are allowed"));
        }

        Ok(Self(id.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `proj-5` becomes `Proj-5`; used for generated titles.
    pub fn display_title(&self) -> String {
        let mut chars = self.0.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ProjectId {
    type Err = BookMagicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ProjectId {
    type Error = BookMagicError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ProjectId> for String {
    fn from(value: ProjectId) -> Self {
        value.0
    }
}

impl AsRef<str> for ProjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
