use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use serde::Serialize;

use crate::project::ProjectId;

pub const DEFAULT_PREVIEW_TTL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(60);

/// Filesystem conventions shared by the CLI, the HTTP host and the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct Layout {
    pub uploads_dir: PathBuf,
    pub output_dir: PathBuf,
    pub export_dir: PathBuf,
    pub template_css_dir: PathBuf,
    pub assets_dir: PathBuf,
}

impl Layout {
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            uploads_dir: root.join("uploads"),
            output_dir: root.join("output"),
            export_dir: root.join("exports"),
            template_css_dir: root.join("template-css"),
            assets_dir: root.join("assets"),
        }
    }

    pub fn ensure_dirs(&self) -> anyhow::Result<()> {
        for dir in [
            &self.uploads_dir,
            &self.output_dir,
            &self.export_dir,
            &self.template_css_dir,
            &self.assets_dir,
        ] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("create dir: {}", dir.display()))?;
        }
        Ok(())
    }

    pub fn upload_path(&self, project: &ProjectId, extension: &str) -> PathBuf {
        self.uploads_dir.join(format!("{project}.{extension}"))
    }

    pub fn html_path(&self, project: &ProjectId) -> PathBuf {
        self.output_dir.join(format!("{project}.html"))
    }

    pub fn preview_html_path(&self, project: &ProjectId) -> PathBuf {
        self.output_dir.join(format!("{project}.preview.html"))
    }

    pub fn preview_final_path(&self, project: &ProjectId) -> PathBuf {
        self.output_dir.join(format!("{project}.preview.final.html"))
    }

    pub fn preview_meta_path(&self, project: &ProjectId) -> PathBuf {
        self.output_dir.join(format!("{project}.preview.json"))
    }

    pub fn pdf_path(&self, project: &ProjectId) -> PathBuf {
        self.output_dir.join(format!("{project}.pdf"))
    }

    pub fn epub_path(&self, project: &ProjectId) -> PathBuf {
        self.output_dir.join(format!("{project}.epub"))
    }

    pub fn export_project_dir(&self, project: &ProjectId) -> PathBuf {
        self.export_dir.join(project.as_str())
    }

    pub fn export_pdf_path(&self, project: &ProjectId) -> PathBuf {
        self.export_project_dir(project)
            .join(format!("{project}.pdf"))
    }

    pub fn export_epub_path(&self, project: &ProjectId) -> PathBuf {
        self.export_project_dir(project)
            .join(format!("{project}.epub"))
    }

    pub fn export_zip_path(&self, project: &ProjectId) -> PathBuf {
        self.export_project_dir(project).join("export.zip")
    }

    pub fn license_path(&self) -> PathBuf {
        self.assets_dir.join("fonts").join("LICENSE.txt")
    }

    pub fn checklist_path(&self) -> PathBuf {
        self.assets_dir.join("checklist").join("kdp.txt")
    }
}

/// Runtime knobs for one process. Built from the environment, then
/// overridden by command-line flags.
#[derive(Debug, Clone)]
pub struct Settings {
    pub layout: Layout,
    pub pandoc: PathBuf,
    pub chrome_executable: Option<PathBuf>,
    pub templates_file: Option<PathBuf>,
    pub include_sub_levels: bool,
    pub preview_ttl: Duration,
    pub render_timeout: Duration,
}

impl Settings {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            layout: Layout::under(root),
            pandoc: PathBuf::from("pandoc"),
            chrome_executable: None,
            templates_file: None,
            include_sub_levels: true,
            preview_ttl: DEFAULT_PREVIEW_TTL,
            render_timeout: DEFAULT_RENDER_TIMEOUT,
        }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let root = env_non_empty("BOOKMAGIC_ROOT").unwrap_or_else(|| ".".to_owned());
        let mut settings = Self::new(root);

        if let Some(pandoc) = env_non_empty("BOOKMAGIC_PANDOC") {
            settings.pandoc = PathBuf::from(pandoc);
        }
        settings.chrome_executable = env_non_empty("BOOKMAGIC_CHROME").map(PathBuf::from);
        settings.templates_file = env_non_empty("BOOKMAGIC_TEMPLATES").map(PathBuf::from);

        if let Some(raw) = env_non_empty("BOOKMAGIC_PREVIEW_TTL_SECS") {
            let secs = raw.parse::<u64>().with_context(|| {
                format!("invalid BOOKMAGIC_PREVIEW_TTL_SECS={raw:?}. expected seconds")
            })?;
            settings.preview_ttl = Duration::from_secs(secs);
        }

        Ok(settings)
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}
