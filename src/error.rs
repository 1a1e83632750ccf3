//! User-facing failures of the pipeline.
//!
//! Stage-local problems (converter missing, conversion failing, EPUB fallback)
//! never reach this type: they are logged and downgraded to a fallback result.
//! What remains here are the failures a caller has to act on, so the HTTP host
//! can map them to 4xx responses while everything else stays an
//! [`anyhow::Error`] and becomes a 5xx.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BookMagicError {
    #[error("invalid project id {id:?}: {reason}")]
    InvalidProjectId { id: String, reason: &'static str },

    #[error("invalid file type {extension:?}. Supported formats: .docx, .md, .rtf")]
    UnsupportedFormat { extension: String },

    #[error("file too large ({size} bytes). Maximum size is 50MB.")]
    UploadTooLarge { size: u64 },

    #[error("missing {field} in upload request")]
    MissingUploadField { field: &'static str },

    #[error("no uploaded file found for project {project_id}. Please upload a file first.")]
    NoSource { project_id: String },

    #[error("no template selected for project {project_id}")]
    NoTemplate { project_id: String },
}

impl BookMagicError {
    /// Finds a typed failure anywhere in an `anyhow` context chain.
    pub fn find(err: &anyhow::Error) -> Option<&BookMagicError> {
        err.chain().find_map(|cause| cause.downcast_ref::<BookMagicError>())
    }
}
