use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Serialize;

use crate::atomic;
use crate::config::Layout;
use crate::error::BookMagicError;
use crate::locator::SourceFormat;
use crate::project::ProjectId;

/// Uploads must be strictly smaller than this (50 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    pub project_id: ProjectId,
    pub file_name: String,
    pub file_size: u64,
    pub saved_path: PathBuf,
    /// With the leading dot, as uploaded (lowercased).
    pub file_extension: String,
}

/// Checks the client-supplied name and size before anything touches disk.
pub fn validate(file_name: &str, size: u64) -> Result<SourceFormat, BookMagicError> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");
    let format =
        SourceFormat::from_extension(extension).ok_or_else(|| BookMagicError::UnsupportedFormat {
            extension: if extension.is_empty() {
                String::new()
            } else {
                format!(".{}", extension.to_ascii_lowercase())
            },
        })?;

    if size >= MAX_UPLOAD_BYTES {
        return Err(BookMagicError::UploadTooLarge { size });
    }

    Ok(format)
}

/// Persists an upload as the project's single source file.
///
/// Other-extension sources for the same project are removed so the locator
/// cannot pick a stale file, and any cached preview is dropped.
pub async fn save_upload(
    layout: &Layout,
    project: &ProjectId,
    file_name: &str,
    data: &[u8],
) -> anyhow::Result<UploadReceipt> {
    let format = validate(file_name, data.len() as u64)?;

    let saved_path = layout.upload_path(project, format.extension());
    atomic::write_atomic_async(&saved_path, data)
        .await
        .with_context(|| format!("save upload: {}", saved_path.display()))?;
    tracing::info!(
        project = %project,
        file_name,
        bytes = data.len(),
        path = %saved_path.display(),
        "saved upload"
    );

    for other in SourceFormat::ALL.into_iter().filter(|f| *f != format) {
        remove_if_present(&layout.upload_path(project, other.extension())).await?;
    }
    invalidate_preview(layout, project).await?;

    Ok(UploadReceipt {
        project_id: project.clone(),
        file_name: file_name.to_owned(),
        file_size: data.len() as u64,
        saved_path,
        file_extension: format.to_string(),
    })
}

pub async fn invalidate_preview(layout: &Layout, project: &ProjectId) -> anyhow::Result<()> {
    for path in [
        layout.preview_final_path(project),
        layout.preview_meta_path(project),
        layout.preview_html_path(project),
    ] {
        remove_if_present(&path).await?;
    }
    Ok(())
}

async fn remove_if_present(path: &Path) -> anyhow::Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "removed");
            Ok(())
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).with_context(|| format!("remove: {}", path.display())),
    }
}
