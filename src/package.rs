use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Serialize;

use crate::atomic;
use crate::config::Layout;
use crate::project::ProjectId;

pub const LICENSE_ENTRY: &str = "LICENSE.txt";
pub const CHECKLIST_ENTRY: &str = "KDP_Checklist.txt";

const LICENSE_TEXT: &str = "Font License Agreement

This package includes fonts that are licensed for use in published books.

Included Fonts:
- EB Garamond (Open Font License)
- Lora (Open Font License)
- Source Serif Pro (Open Font License)

These fonts are free to use for both personal and commercial projects.
For more information, visit the respective font foundries.

Generated by BookMagic - Professional Book Formatting
";

const CHECKLIST_TEXT: &str = "KDP Publishing Checklist

✓ Manuscript formatted with professional template
✓ Proper page margins and spacing
✓ Consistent typography throughout
✓ Table of contents generated
✓ Print-ready PDF created
✓ EPUB file validated
✓ Font licenses included
✓ Ready for upload to KDP

Generated by BookMagic
Visit https://kdp.amazon.com for publishing guidelines
";

/// Where the export landed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Package {
    pub pdf_path: PathBuf,
    pub epub_path: PathBuf,
    pub zip_path: PathBuf,
    /// ZIP entry names in archive order.
    pub entries: Vec<String>,
}

/// Creates the font license and publishing checklist when missing. Existing
/// files are left untouched so operators can replace them.
pub fn ensure_static_assets(layout: &Layout) -> anyhow::Result<()> {
    for (path, text) in [
        (layout.license_path(), LICENSE_TEXT),
        (layout.checklist_path(), CHECKLIST_TEXT),
    ] {
        if path.is_file() {
            continue;
        }
        atomic::write_atomic(&path, text.as_bytes())
            .with_context(|| format!("write static asset: {}", path.display()))?;
        tracing::info!(path = %path.display(), "created static asset");
    }
    Ok(())
}

/// Copies the rendered PDF and EPUB into the project's export directory and
/// bundles them with the static assets. The archive appears only once it is
/// complete.
pub fn assemble(layout: &Layout, project: &ProjectId) -> anyhow::Result<Package> {
    ensure_static_assets(layout)?;

    let export_dir = layout.export_project_dir(project);
    std::fs::create_dir_all(&export_dir)
        .with_context(|| format!("create export dir: {}", export_dir.display()))?;

    let pdf_path = layout.export_pdf_path(project);
    let epub_path = layout.export_epub_path(project);
    copy_if_present(&layout.pdf_path(project), &pdf_path)?;
    copy_if_present(&layout.epub_path(project), &epub_path)?;

    let sources = [
        (layout.pdf_path(project), format!("{project}.pdf")),
        (layout.epub_path(project), format!("{project}.epub")),
        (layout.license_path(), LICENSE_ENTRY.to_owned()),
        (layout.checklist_path(), CHECKLIST_ENTRY.to_owned()),
    ];
    let members = sources
        .into_iter()
        .filter(|(path, name)| {
            let present = path.is_file();
            if !present {
                tracing::warn!(path = %path.display(), entry = %name, "missing package member; skipping");
            }
            present
        })
        .collect::<Vec<_>>();

    let zip_path = layout.export_zip_path(project);
    let tmp_path = atomic::tmp_path_for(&zip_path);
    let written = write_zip(&tmp_path, &members).and_then(|()| {
        std::fs::rename(&tmp_path, &zip_path)
            .with_context(|| format!("rename tmp to final: {}", zip_path.display()))
    });
    if let Err(err) = written {
        if let Err(rm_err) = std::fs::remove_file(&tmp_path)
            && rm_err.kind() != io::ErrorKind::NotFound
        {
            tracing::warn!(path = %tmp_path.display(), ?rm_err, "failed to remove partial zip");
        }
        return Err(err.context("write export zip"));
    }

    let entries = members.into_iter().map(|(_, name)| name).collect::<Vec<_>>();
    tracing::info!(zip = %zip_path.display(), ?entries, "export package created");

    Ok(Package {
        pdf_path,
        epub_path,
        zip_path,
        entries,
    })
}

fn copy_if_present(from: &Path, to: &Path) -> anyhow::Result<()> {
    if !from.is_file() {
        return Ok(());
    }
    std::fs::copy(from, to)
        .with_context(|| format!("copy {} to {}", from.display(), to.display()))?;
    Ok(())
}

fn write_zip(out_zip: &Path, members: &[(PathBuf, String)]) -> anyhow::Result<()> {
    let file =
        File::create(out_zip).with_context(|| format!("create zip: {}", out_zip.display()))?;
    let mut zip = zip::ZipWriter::new(file);

    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .compression_level(Some(9))
        .unix_permissions(0o644);

    for (path, name) in members {
        zip.start_file(name.as_str(), options)
            .with_context(|| format!("zip start_file {name}"))?;
        let mut member =
            File::open(path).with_context(|| format!("open: {}", path.display()))?;
        io::copy(&mut member, &mut zip).with_context(|| format!("zip write {name}"))?;
    }

    zip.finish().context("zip finish")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Read as _;

    use super::*;

    fn zip_entries(path: &Path) -> anyhow::Result<Vec<(String, String)>> {
        let mut archive = zip::ZipArchive::new(File::open(path)?)?;
        let mut out = Vec::new();
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let mut text = String::new();
            entry.read_to_string(&mut text)?;
            out.push((entry.name().to_owned(), text));
        }
        Ok(out)
    }

    #[test]
    fn assemble_bundles_all_four_members() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let layout = Layout::under(temp.path());
        layout.ensure_dirs()?;
        let project = ProjectId::parse("p1")?;
        std::fs::write(layout.pdf_path(&project), "%PDF-fake")?;
        std::fs::write(layout.epub_path(&project), "EPUB File for p1")?;

        let package = assemble(&layout, &project)?;
        assert_eq!(
            package.entries,
            ["p1.pdf", "p1.epub", "LICENSE.txt", "KDP_Checklist.txt"]
        );
        assert_eq!(std::fs::read_to_string(&package.pdf_path)?, "%PDF-fake");
        assert_eq!(std::fs::read_to_string(&package.epub_path)?, "EPUB File for p1");

        let entries = zip_entries(&package.zip_path)?;
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0], ("p1.pdf".to_owned(), "%PDF-fake".to_owned()));
        assert!(entries[2].1.starts_with("Font License Agreement"));
        assert!(entries[3].1.starts_with("KDP Publishing Checklist"));

        let leftovers = std::fs::read_dir(layout.export_project_dir(&project))?
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp."))
            .count();
        assert_eq!(leftovers, 0);
        Ok(())
    }

    #[test]
    fn static_assets_are_not_overwritten() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let layout = Layout::under(temp.path());
        std::fs::create_dir_all(layout.license_path().parent().unwrap())?;
        std::fs::write(layout.license_path(), "custom")?;

        ensure_static_assets(&layout)?;
        assert_eq!(std::fs::read_to_string(layout.license_path())?, "custom");
        assert!(std::fs::read_to_string(layout.checklist_path())?.contains("✓ Ready for upload to KDP"));
        Ok(())
    }

    #[test]
    fn failed_archive_leaves_no_zip() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let layout = Layout::under(temp.path());
        layout.ensure_dirs()?;
        let project = ProjectId::parse("p1")?;
        // A directory where the zip should go makes the final rename fail.
        std::fs::create_dir_all(layout.export_zip_path(&project).join("blocker"))?;
        std::fs::write(layout.pdf_path(&project), "%PDF")?;

        assert!(assemble(&layout, &project).is_err());
        let leftovers = std::fs::read_dir(layout.export_project_dir(&project))?
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp."))
            .count();
        assert_eq!(leftovers, 0);
        Ok(())
    }
}
