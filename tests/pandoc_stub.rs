#![cfg(unix)]

mod support;

use std::io::Read as _;
use std::os::unix::fs::PermissionsExt as _;
use std::path::{Path, PathBuf};

use bookmagic::epub::EpubOutcome;
use bookmagic::pipeline::Plan;
use bookmagic::project::ProjectId;
use bookmagic::upload;

use support::{pipeline, settings};

const FAKE_PANDOC: &str = r#"#!/bin/sh
if [ "$1" = "--version" ]; then
  echo "pandoc 3.1.11 (stub)"
  exit 0
fi
out="$3"
to="$7"
case "$to" in
  html5)
    cat > "$out" <<'HTML'
<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8" />
<title>converted</title>
<style>body { margin: 0; }</style>
</head>
<body>
<h1 class="title">My Book</h1>
<h1 id="chapter-one">Chapter <em>One</em></h1>
<p>It began.</p>
<h2 id="the-setting">The Setting</h2>
<p>A town.</p>
<h3 id="details">Details</h3>
<h1 id="chapter-two">Chapter Two</h1>
<p>It ended.</p>
</body>
</html>
HTML
    ;;
  epub3)
    printf 'PK-stub-epub' > "$out"
    ;;
  *)
    echo "unsupported target $to" >&2
    exit 2
    ;;
esac
"#;

const BROKEN_PANDOC: &str = r#"#!/bin/sh
if [ "$1" = "--version" ]; then
  echo "pandoc 3.1.11 (stub)"
  exit 0
fi
echo "Could not parse document" >&2
exit 64
"#;

fn install_script(dir: &Path, name: &str, body: &str) -> anyhow::Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, body)?;
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
    Ok(path)
}

#[tokio::test]
async fn converter_output_gets_a_contents_page() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let pandoc = install_script(temp.path(), "pandoc", FAKE_PANDOC)?;
    let (pipeline, _renderer) = pipeline(settings(temp.path(), pandoc));
    let layout = pipeline.settings().layout.clone();
    let project = ProjectId::parse("book")?;
    layout.ensure_dirs()?;
    upload::save_upload(&layout, &project, "book.docx", b"PK\x03\x04").await?;

    let summary = pipeline.export(&project, "serif-classic", Plan::Pro).await?;
    assert!(summary.used_converter);
    assert_eq!(summary.extraction, "pandoc");
    assert_eq!(summary.toc_entries, 4);
    assert_eq!(summary.epub, EpubOutcome::Converted);

    let styled = std::fs::read_to_string(&summary.html_path)?;
    let toc_at = styled.find("class=\"table-of-contents\"").expect("toc inserted");
    let title_at = styled.find("<h1 class=\"title\">").expect("title kept");
    let chapter_at = styled.find("<h1 id=\"chapter-one\">").expect("chapter kept");
    assert!(title_at < toc_at && toc_at < chapter_at);

    assert!(styled.contains("<span class=\"toc-text\">Chapter One</span>"));
    assert!(styled.contains("style=\"margin-left: 1.5em;\""));
    assert!(styled.contains("style=\"margin-left: 3em;\""));
    for page in 2..=5 {
        assert!(styled.contains(&format!("<span class=\"toc-page\">{page}</span>")));
    }
    assert!(!styled.contains("<span class=\"toc-page\">6</span>"));

    // The converter's own style block is merged with the template css.
    assert_eq!(styled.matches("<style>").count(), 1);
    assert!(styled.contains("body { margin: 0; }"));

    let mut archive = zip::ZipArchive::new(std::fs::File::open(&summary.zip_path)?)?;
    let mut epub = String::new();
    archive.by_name("book.epub")?.read_to_string(&mut epub)?;
    assert_eq!(epub, "PK-stub-epub");
    Ok(())
}

#[tokio::test]
async fn top_level_only_contents_lists_chapters() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let pandoc = install_script(temp.path(), "pandoc", FAKE_PANDOC)?;
    let mut settings = settings(temp.path(), pandoc);
    settings.include_sub_levels = false;
    let (pipeline, _renderer) = pipeline(settings);
    let layout = pipeline.settings().layout.clone();
    let project = ProjectId::parse("book")?;
    layout.ensure_dirs()?;
    upload::save_upload(&layout, &project, "book.md", b"# ignored by the stub").await?;

    let summary = pipeline.export(&project, "serif-classic", Plan::Pro).await?;
    assert_eq!(summary.toc_entries, 2);

    let styled = std::fs::read_to_string(&summary.html_path)?;
    assert!(styled.contains("<span class=\"toc-text\">Chapter Two</span>"));
    assert!(!styled.contains("<span class=\"toc-text\">The Setting</span>"));
    assert!(styled.contains("<span class=\"toc-page\">3</span>"));
    Ok(())
}

#[tokio::test]
async fn failing_converter_falls_back_to_builtin() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let pandoc = install_script(temp.path(), "pandoc", BROKEN_PANDOC)?;
    let (pipeline, _renderer) = pipeline(settings(temp.path(), pandoc));
    let layout = pipeline.settings().layout.clone();
    let project = ProjectId::parse("book")?;
    layout.ensure_dirs()?;
    upload::save_upload(&layout, &project, "book.md", b"# Hello\n\nPlain words.").await?;

    let summary = pipeline.export(&project, "trade-clean", Plan::Pro).await?;
    assert!(!summary.used_converter);
    assert_eq!(summary.extraction, "builtin");
    assert_eq!(summary.epub, EpubOutcome::Placeholder);

    let styled = std::fs::read_to_string(&summary.html_path)?;
    assert!(styled.contains("<h1>Hello</h1>\n<p>Plain words.</p>"));
    Ok(())
}

#[tokio::test]
async fn preview_uses_the_converter_too() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let pandoc = install_script(temp.path(), "pandoc", FAKE_PANDOC)?;
    let (pipeline, _renderer) = pipeline(settings(temp.path(), pandoc));
    let layout = pipeline.settings().layout.clone();
    let project = ProjectId::parse("book")?;
    layout.ensure_dirs()?;
    upload::save_upload(&layout, &project, "Book.RTF", br"{\rtf1 hi}").await?;

    let preview = pipeline.preview(&project, Some("novella-a5")).await?;
    assert!(preview.used_converter);
    assert_eq!(preview.input_file, "book.rtf");
    assert_eq!(preview.toc_entries, 4);
    assert!(preview.html.contains("<title>converted</title>"));
    assert!(preview.html.contains("'Book Antiqua'"));
    Ok(())
}
