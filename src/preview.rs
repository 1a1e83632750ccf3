//! Styled HTML preview of an uploaded manuscript, cached per template.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::atomic;
use crate::config::Settings;
use crate::error::BookMagicError;
use crate::extract::ContentExtractor;
use crate::locator;
use crate::project::ProjectId;
use crate::style;
use crate::templates::{self, TemplateRegistry};
use crate::toc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResult {
    pub project_id: ProjectId,
    pub template_id: String,
    pub html: String,
    pub html_path: PathBuf,
    pub input_file: String,
    pub used_converter: bool,
    pub toc_entries: usize,
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_secs: Option<u64>,
}

/// Sidecar next to the cached preview recording what produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct PreviewMeta {
    template_id: String,
    input_file: String,
    used_converter: bool,
    toc_entries: usize,
    generated_at: DateTime<Utc>,
}

/// Serves a fresh cached preview or builds a new one. Blocking.
pub fn generate(
    settings: &Settings,
    registry: &TemplateRegistry,
    extractor: &ContentExtractor,
    project: &ProjectId,
    template_id: &str,
) -> anyhow::Result<PreviewResult> {
    let layout = &settings.layout;
    let source = locator::locate(&layout.uploads_dir, project).ok_or_else(|| {
        BookMagicError::NoSource {
            project_id: project.to_string(),
        }
    })?;

    if let Some(cached) = load_cached(settings, project, template_id)? {
        return Ok(cached);
    }

    tracing::info!(project = %project, template_id, source = %source.path.display(), "generating preview");
    std::fs::create_dir_all(&layout.output_dir)
        .with_context(|| format!("create output dir: {}", layout.output_dir.display()))?;

    let extraction = extractor.extract(&source, &layout.preview_html_path(project));
    let entries = toc::derive_toc(&extraction.html, settings.include_sub_levels);
    let css = format!(
        "{}{}",
        registry.template_css(template_id, &layout.template_css_dir),
        templates::toc_css(template_id)
    );
    let html = style::style_document(
        &extraction.html,
        &toc::render_toc(&entries),
        &css,
        &format!("Preview - {project}"),
    );

    let html_path = layout.preview_final_path(project);
    atomic::write_atomic(&html_path, html.as_bytes()).context("write preview html")?;

    let meta = PreviewMeta {
        template_id: template_id.to_owned(),
        input_file: extraction.source_name.clone(),
        used_converter: extraction.used_converter,
        toc_entries: entries.len(),
        generated_at: Utc::now(),
    };
    let meta_json = serde_json::to_vec_pretty(&meta).context("serialize preview meta")?;
    atomic::write_atomic(&layout.preview_meta_path(project), &meta_json)
        .context("write preview meta")?;

    tracing::info!(project = %project, path = %html_path.display(), chars = html.len(), "preview generated");

    Ok(PreviewResult {
        project_id: project.clone(),
        template_id: template_id.to_owned(),
        html,
        html_path,
        input_file: meta.input_file,
        used_converter: meta.used_converter,
        toc_entries: meta.toc_entries,
        cached: false,
        age_secs: None,
    })
}

fn load_cached(
    settings: &Settings,
    project: &ProjectId,
    template_id: &str,
) -> anyhow::Result<Option<PreviewResult>> {
    let layout = &settings.layout;
    let html_path = layout.preview_final_path(project);
    let meta_path = layout.preview_meta_path(project);

    let Some(age) = file_age(&html_path) else {
        return Ok(None);
    };
    if age >= settings.preview_ttl {
        tracing::debug!(project = %project, age_secs = age.as_secs(), "cached preview expired");
        return Ok(None);
    }

    let meta = match std::fs::read(&meta_path) {
        Ok(bytes) => match serde_json::from_slice::<PreviewMeta>(&bytes) {
            Ok(meta) => meta,
            Err(err) => {
                tracing::warn!(path = %meta_path.display(), ?err, "ignoring unreadable preview meta");
                return Ok(None);
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err).with_context(|| format!("read: {}", meta_path.display()));
        }
    };
    if meta.template_id != template_id {
        tracing::debug!(project = %project, cached = %meta.template_id, requested = template_id, "cached preview is for another template");
        return Ok(None);
    }

    let html = std::fs::read_to_string(&html_path)
        .with_context(|| format!("read cached preview: {}", html_path.display()))?;
    tracing::info!(project = %project, age_secs = age.as_secs(), "serving cached preview");

    Ok(Some(PreviewResult {
        project_id: project.clone(),
        template_id: meta.template_id,
        html,
        html_path,
        input_file: meta.input_file,
        used_converter: meta.used_converter,
        toc_entries: meta.toc_entries,
        cached: true,
        age_secs: Some(age.as_secs()),
    }))
}

fn file_age(path: &std::path::Path) -> Option<Duration> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    Some(modified.elapsed().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pandoc::Pandoc;

    struct Fixture {
        _temp: tempfile::TempDir,
        settings: Settings,
        registry: TemplateRegistry,
        extractor: ContentExtractor,
        project: ProjectId,
    }

    fn fixture() -> anyhow::Result<Fixture> {
        let temp = tempfile::TempDir::new()?;
        let mut settings = Settings::new(temp.path());
        settings.pandoc = PathBuf::from("/nonexistent/bookmagic/pandoc");
        settings.layout.ensure_dirs()?;
        let project = ProjectId::parse("p1")?;
        std::fs::write(
            settings.layout.upload_path(&project, "md"),
            "# Title\n\nHello *world*.",
        )?;
        Ok(Fixture {
            extractor: ContentExtractor::new(Pandoc::new(&settings.pandoc)),
            registry: TemplateRegistry::builtin(),
            settings,
            project,
            _temp: temp,
        })
    }

    #[test]
    fn builds_then_serves_from_cache() -> anyhow::Result<()> {
        let f = fixture()?;

        let first = generate(&f.settings, &f.registry, &f.extractor, &f.project, "trade-clean")?;
        assert!(!first.cached);
        assert!(!first.used_converter);
        assert_eq!(first.input_file, "p1.md");
        assert_eq!(first.toc_entries, 0);
        assert!(first.html.contains("<title>Preview - p1</title>"));
        assert!(first.html.contains("<h1>Title</h1>\n<p>Hello <em>world</em>.</p>"));
        assert!(first.html.contains("font-family: 'Georgia', serif;"));
        assert_eq!(first.html.matches("<style>").count(), 1);
        assert_eq!(std::fs::read_to_string(&first.html_path)?, first.html);

        let second = generate(&f.settings, &f.registry, &f.extractor, &f.project, "trade-clean")?;
        assert!(second.cached);
        assert_eq!(second.html, first.html);
        assert!(second.age_secs.is_some());
        Ok(())
    }

    #[test]
    fn cache_is_per_template() -> anyhow::Result<()> {
        let f = fixture()?;
        generate(&f.settings, &f.registry, &f.extractor, &f.project, "trade-clean")?;

        let other = generate(&f.settings, &f.registry, &f.extractor, &f.project, "novella-a5")?;
        assert!(!other.cached);
        assert!(other.html.contains("'Book Antiqua'"));
        Ok(())
    }

    #[test]
    fn expired_cache_is_rebuilt() -> anyhow::Result<()> {
        let mut f = fixture()?;
        f.settings.preview_ttl = Duration::ZERO;
        generate(&f.settings, &f.registry, &f.extractor, &f.project, "serif-classic")?;
        let again = generate(&f.settings, &f.registry, &f.extractor, &f.project, "serif-classic")?;
        assert!(!again.cached);
        Ok(())
    }

    #[test]
    fn missing_source_is_typed() -> anyhow::Result<()> {
        let f = fixture()?;
        let other = ProjectId::parse("nothing-here")?;
        let err = generate(&f.settings, &f.registry, &f.extractor, &other, "serif-classic").unwrap_err();
        assert_eq!(
            BookMagicError::find(&err),
            Some(&BookMagicError::NoSource {
                project_id: "nothing-here".to_owned()
            })
        );
        assert!(!f.settings.layout.preview_final_path(&other).exists());
        Ok(())
    }

    #[test]
    fn template_css_override_on_disk_wins() -> anyhow::Result<()> {
        let f = fixture()?;
        std::fs::write(
            f.settings.layout.template_css_dir.join("serif-classic.css"),
            "body { color: rebeccapurple; }",
        )?;
        let out = generate(&f.settings, &f.registry, &f.extractor, &f.project, "serif-classic")?;
        assert!(out.html.contains("rebeccapurple"));
        assert!(out.html.contains(".toc-title"));
        Ok(())
    }
}
