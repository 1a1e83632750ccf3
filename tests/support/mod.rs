use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bookmagic::config::Settings;
use bookmagic::pdf::PdfRenderer;
use bookmagic::pipeline::Pipeline;
use bookmagic::templates::{PageGeometry, TemplateRegistry};

pub const NO_PANDOC: &str = "/nonexistent/bookmagic/pandoc";

/// Records every document it is asked to print and returns a tiny fake PDF.
#[derive(Default)]
pub struct RecordingRenderer {
    printed: Mutex<Vec<(String, PageGeometry)>>,
}

#[allow(dead_code)]
impl RecordingRenderer {
    pub fn last_html(&self) -> Option<String> {
        self.printed
            .lock()
            .unwrap()
            .last()
            .map(|(html, _)| html.clone())
    }

    pub fn last_page(&self) -> Option<PageGeometry> {
        self.printed
            .lock()
            .unwrap()
            .last()
            .map(|(_, page)| page.clone())
    }
}

#[async_trait]
impl PdfRenderer for RecordingRenderer {
    async fn render(&self, html: &str, page: &PageGeometry) -> anyhow::Result<Vec<u8>> {
        self.printed
            .lock()
            .unwrap()
            .push((html.to_owned(), page.clone()));
        Ok(b"%PDF-1.7\n%stub\n".to_vec())
    }
}

pub fn settings(root: &Path, pandoc: impl Into<PathBuf>) -> Settings {
    let mut settings = Settings::new(root);
    settings.pandoc = pandoc.into();
    settings
}

pub fn pipeline(settings: Settings) -> (Pipeline, Arc<RecordingRenderer>) {
    let renderer = Arc::new(RecordingRenderer::default());
    let pipeline = Pipeline::new(settings, TemplateRegistry::builtin(), renderer.clone());
    (pipeline, renderer)
}

#[allow(dead_code)]
pub fn zip_entry_names(path: &Path) -> anyhow::Result<Vec<String>> {
    let mut archive = zip::ZipArchive::new(std::fs::File::open(path)?)?;
    let mut names = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        names.push(archive.by_index(i)?.name().to_owned());
    }
    Ok(names)
}
