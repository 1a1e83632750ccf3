use std::io::Write as _;
use std::path::Path;

use anyhow::Context as _;
use serde::Serialize;

use crate::html;
use crate::pandoc::Pandoc;
use crate::project::ProjectId;

const PREVIEW_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EpubOutcome {
    /// A real EPUB 3 container from the converter.
    Converted,
    /// Plain-text stand-in; not a valid EPUB container.
    Placeholder,
}

/// Writes `{output}` from the styled document: through the converter when it
/// is available, else as a text placeholder.
pub fn write_epub(
    pandoc: &Pandoc,
    styled_html: &str,
    output: &Path,
    project: &ProjectId,
) -> anyhow::Result<EpubOutcome> {
    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create epub dir: {}", parent.display()))?;
    }

    if pandoc.is_available() {
        match convert(pandoc, styled_html, output, project) {
            Ok(()) => {
                tracing::info!(path = %output.display(), "generated epub with pandoc");
                return Ok(EpubOutcome::Converted);
            }
            Err(err) => {
                tracing::warn!(project = %project, "pandoc epub generation failed; writing placeholder: {err:#}");
            }
        }
    }

    std::fs::write(output, placeholder_text(project, styled_html))
        .with_context(|| format!("write epub placeholder: {}", output.display()))?;
    tracing::info!(path = %output.display(), "wrote placeholder epub");
    Ok(EpubOutcome::Placeholder)
}

fn convert(
    pandoc: &Pandoc,
    styled_html: &str,
    output: &Path,
    project: &ProjectId,
) -> anyhow::Result<()> {
    let dir = output.parent().unwrap_or_else(|| Path::new("."));
    // Removed on drop, whatever pandoc does.
    let mut scratch = tempfile::Builder::new()
        .prefix(&format!("{project}."))
        .suffix(".temp.html")
        .tempfile_in(dir)
        .with_context(|| format!("create temp html in {}", dir.display()))?;
    scratch
        .write_all(styled_html.as_bytes())
        .context("write temp html")?;
    scratch.flush().context("flush temp html")?;

    pandoc.html_to_epub(scratch.path(), output, &format!("{project} - Formatted Book"))
}

fn placeholder_text(project: &ProjectId, styled_html: &str) -> String {
    let (body, _css) = html::take_style_blocks(styled_html);
    let preview = html::strip_tags(&body)
        .chars()
        .take(PREVIEW_CHARS)
        .collect::<String>();

    format!(
        "EPUB File for {project}

This is a sample EPUB file generated by BookMagic.
In a production environment, this would be a proper EPUB file created by Pandoc.

Content Preview:
{preview}...

Generated by BookMagic - Professional Book Formatting
"
    )
}
