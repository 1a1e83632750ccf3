use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::atomic;
use crate::config::Settings;
use crate::epub::{self, EpubOutcome};
use crate::error::BookMagicError;
use crate::extract::ContentExtractor;
use crate::locator;
use crate::package;
use crate::pandoc::Pandoc;
use crate::pdf::{self, PdfRenderer};
use crate::preview::{self, PreviewResult};
use crate::project::ProjectId;
use crate::stats::DocumentStats;
use crate::style;
use crate::templates::{self, TemplateRegistry};
use crate::toc;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Free,
    Pro,
}

impl Plan {
    pub fn watermarked(self) -> bool {
        matches!(self, Self::Free)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    pub project_id: ProjectId,
    /// The template actually applied (unknown ids fall back).
    pub template_id: String,
    pub plan: Plan,
    pub source_file: String,
    pub used_sample: bool,
    pub used_converter: bool,
    pub extraction: &'static str,
    pub toc_entries: usize,
    pub stats: DocumentStats,
    pub watermarked: bool,
    pub epub: EpubOutcome,
    pub html_path: PathBuf,
    pub pdf_path: PathBuf,
    pub epub_path: PathBuf,
    pub zip_path: PathBuf,
    pub zip_entries: Vec<String>,
}

/// Which export artifacts currently exist on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Readiness {
    pub pdf: bool,
    pub epub: bool,
    pub zip: bool,
}

impl Readiness {
    pub fn all(self) -> bool {
        self.pdf && self.epub && self.zip
    }
}

/// Everything one conversion run needs. Cheap to clone.
#[derive(Clone)]
pub struct Pipeline {
    settings: Arc<Settings>,
    registry: Arc<TemplateRegistry>,
    extractor: Arc<ContentExtractor>,
    pandoc: Pandoc,
    renderer: Arc<dyn PdfRenderer>,
}

impl Pipeline {
    pub fn new(settings: Settings, registry: TemplateRegistry, renderer: Arc<dyn PdfRenderer>) -> Self {
        let pandoc = Pandoc::new(&settings.pandoc);
        Self {
            extractor: Arc::new(ContentExtractor::new(pandoc.clone())),
            settings: Arc::new(settings),
            registry: Arc::new(registry),
            pandoc,
            renderer,
        }
    }

    pub fn with_extractor(mut self, extractor: ContentExtractor) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    /// Styled preview for `template_id`; a template is mandatory.
    pub async fn preview(
        &self,
        project: &ProjectId,
        template_id: Option<&str>,
    ) -> anyhow::Result<PreviewResult> {
        let template_id = template_id
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| BookMagicError::NoTemplate {
                project_id: project.to_string(),
            })?
            .to_owned();

        let settings = Arc::clone(&self.settings);
        let registry = Arc::clone(&self.registry);
        let extractor = Arc::clone(&self.extractor);
        let project = project.clone();
        tokio::task::spawn_blocking(move || {
            preview::generate(&settings, &registry, &extractor, &project, &template_id)
        })
        .await
        .context("join preview task")?
    }

    /// Locate → extract → TOC + styling → PDF → EPUB → package.
    pub async fn export(
        &self,
        project: &ProjectId,
        template_id: &str,
        plan: Plan,
    ) -> anyhow::Result<ExportSummary> {
        let descriptor = self.registry.resolve(template_id).clone();
        if descriptor.id != template_id {
            tracing::warn!(requested = template_id, using = %descriptor.id, "unknown template; falling back");
        }
        tracing::info!(project = %project, template_id = %descriptor.id, ?plan, "starting export");

        let styled = {
            let settings = Arc::clone(&self.settings);
            let registry = Arc::clone(&self.registry);
            let extractor = Arc::clone(&self.extractor);
            let project = project.clone();
            let template_id = descriptor.id.clone();
            tokio::task::spawn_blocking(move || {
                style_for_export(&settings, &registry, &extractor, &project, &template_id)
            })
            .await
            .context("join styling task")??
        };

        let layout = &self.settings.layout;
        let printable = if plan.watermarked() {
            tracing::info!(project = %project, "adding free-plan watermark");
            pdf::apply_watermark(&styled.html)
        } else {
            styled.html.clone()
        };
        let pdf_bytes = self
            .renderer
            .render(&printable, &descriptor.page)
            .await
            .context("render pdf")?;
        let pdf_path = layout.pdf_path(project);
        atomic::write_atomic_async(&pdf_path, &pdf_bytes)
            .await
            .context("write pdf")?;
        tracing::info!(path = %pdf_path.display(), bytes = pdf_bytes.len(), "wrote pdf");

        let (epub_outcome, package) = {
            let settings = Arc::clone(&self.settings);
            let pandoc = self.pandoc.clone();
            let project = project.clone();
            let html = styled.html.clone();
            tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
                let layout = &settings.layout;
                let outcome = epub::write_epub(&pandoc, &html, &layout.epub_path(&project), &project)
                    .context("write epub")?;
                let package = package::assemble(layout, &project).context("assemble package")?;
                Ok((outcome, package))
            })
            .await
            .context("join packaging task")??
        };

        let summary = ExportSummary {
            project_id: project.clone(),
            template_id: descriptor.id,
            plan,
            source_file: styled.source_file,
            used_sample: styled.used_sample,
            used_converter: styled.used_converter,
            extraction: styled.strategy,
            toc_entries: styled.toc_entries,
            stats: DocumentStats::from_html(&styled.html),
            watermarked: plan.watermarked(),
            epub: epub_outcome,
            html_path: layout.html_path(project),
            pdf_path: package.pdf_path,
            epub_path: package.epub_path,
            zip_path: package.zip_path,
            zip_entries: package.entries,
        };
        tracing::info!(
            project = %project,
            zip = %summary.zip_path.display(),
            words = summary.stats.word_count,
            "export complete"
        );
        Ok(summary)
    }

    pub fn readiness(&self, project: &ProjectId) -> Readiness {
        let layout = &self.settings.layout;
        Readiness {
            pdf: layout.export_pdf_path(project).is_file(),
            epub: layout.export_epub_path(project).is_file(),
            zip: layout.export_zip_path(project).is_file(),
        }
    }
}

struct StyledExport {
    html: String,
    source_file: String,
    used_sample: bool,
    used_converter: bool,
    strategy: &'static str,
    toc_entries: usize,
}

fn style_for_export(
    settings: &Settings,
    registry: &TemplateRegistry,
    extractor: &ContentExtractor,
    project: &ProjectId,
    template_id: &str,
) -> anyhow::Result<StyledExport> {
    let layout = &settings.layout;
    layout.ensure_dirs()?;
    package::ensure_static_assets(layout)?;

    let html_path = layout.html_path(project);
    let (extraction, used_sample) = match locator::locate(&layout.uploads_dir, project) {
        Some(source) => (extractor.extract(&source, &html_path), false),
        None => {
            tracing::info!(project = %project, "no uploaded file; using sample manuscript");
            (extractor.extract_sample(project), true)
        }
    };

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
        &format!("{project} - Formatted Book"),
    );
    atomic::write_atomic(&html_path, html.as_bytes()).context("write styled html")?;
    tracing::info!(path = %html_path.display(), chars = html.len(), toc_entries = entries.len(), "saved styled html");

    Ok(StyledExport {
        html,
        source_file: extraction.source_name,
        used_sample,
        used_converter: extraction.used_converter,
        strategy: extraction.strategy,
        toc_entries: entries.len(),
    })
}
