use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::project::ProjectId;

/// Manuscript formats accepted for upload, in probe order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    Docx,
    Markdown,
    Rtf,
}

impl SourceFormat {
    pub const ALL: [SourceFormat; 3] = [Self::Docx, Self::Markdown, Self::Rtf];

    pub fn extension(self) -> &'static str {
        match self {
            Self::Docx => "docx",
            Self::Markdown => "md",
            Self::Rtf => "rtf",
        }
    }

    /// Case-insensitive; accepts a leading dot.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        Self::ALL.into_iter().find(|f| f.extension() == ext)
    }

    /// Reader name passed to the external converter's `--from`.
    pub fn converter_reader(self) -> &'static str {
        match self {
            Self::Docx => "docx",
            Self::Markdown => "markdown",
            Self::Rtf => "rtf",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ".{}", self.extension())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub path: PathBuf,
    /// Lowercased extension without the dot; empty when the file has none.
    pub extension: String,
    /// `None` for extensions the pipeline does not support.
    pub format: Option<SourceFormat>,
}

impl SourceDocument {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        let format = SourceFormat::from_extension(&extension);
        Self {
            path,
            extension,
            format,
        }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Probes `{id}.docx`, `{id}.md`, `{id}.rtf` in order and returns the first
/// regular file found. Absence is not an error; callers decide.
pub fn locate(uploads_dir: &Path, project: &ProjectId) -> Option<SourceDocument> {
    for format in SourceFormat::ALL {
        let path = uploads_dir.join(format!("{project}.{}", format.extension()));
        tracing::debug!(path = %path.display(), "probing for uploaded file");
        if path.is_file() {
            tracing::info!(project = %project, path = %path.display(), "found uploaded file");
            return Some(SourceDocument {
                path,
                extension: format.extension().to_owned(),
                format: Some(format),
            });
        }
    }

    tracing::info!(project = %project, "no uploaded file found");
    None
}
