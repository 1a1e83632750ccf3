use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use futures::StreamExt as _;

use crate::html;
use crate::templates::PageGeometry;

pub const WATERMARK_TEXT: &str = "FREE EXPORT";

const WATERMARK_STYLE: &str = "position: fixed; bottom: 0.5in; right: 0.5in; opacity: 0.15; \
font-size: 12px; font-weight: normal; color: #999999; transform: rotate(-45deg); \
transform-origin: center; z-index: 1; pointer-events: none; font-family: Arial, sans-serif;";

/// Prints a styled HTML document to PDF bytes.
#[async_trait]
pub trait PdfRenderer: Send + Sync {
    async fn render(&self, html: &str, page: &PageGeometry) -> anyhow::Result<Vec<u8>>;
}

/// Headless Chromium, one browser per render.
#[derive(Debug, Clone)]
pub struct ChromiumPdfRenderer {
    chrome_executable: Option<PathBuf>,
    timeout: Duration,
}

impl ChromiumPdfRenderer {
    pub fn new(chrome_executable: Option<PathBuf>, timeout: Duration) -> Self {
        Self {
            chrome_executable,
            timeout,
        }
    }
}

#[async_trait]
impl PdfRenderer for ChromiumPdfRenderer {
    async fn render(&self, html: &str, page: &PageGeometry) -> anyhow::Result<Vec<u8>> {
        let params = print_params(page)?;

        let mut builder = BrowserConfig::builder();
        if let Some(chrome) = &self.chrome_executable {
            builder = builder.chrome_executable(chrome);
        }
        let config = builder
            .build()
            .map_err(|err| anyhow::anyhow!("browser config: {err}"))?;

        tracing::info!(chrome = ?self.chrome_executable, "launching headless browser");
        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .context("launch headless browser")?;
        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let printed = tokio::time::timeout(self.timeout, print_page(&browser, html, params)).await;

        if let Err(err) = browser.close().await {
            tracing::warn!(?err, "failed to close headless browser");
        }
        events.abort();

        let bytes = printed.map_err(|_| {
            anyhow::anyhow!("pdf render timed out after {}s", self.timeout.as_secs())
        })??;
        tracing::info!(bytes = bytes.len(), "rendered pdf");
        Ok(bytes)
    }
}

/// Resolves once the `load` event has fired, every image has finished
/// (loaded or failed) and web fonts are ready.
const SETTLED_JS: &str = r#"(async () => {
  if (document.readyState !== 'complete') {
    await new Promise((resolve) => window.addEventListener('load', resolve, { once: true }));
  }
  await Promise.all(
    Array.from(document.images)
      .filter((img) => !img.complete)
      .map((img) => new Promise((resolve) => {
        img.addEventListener('load', resolve, { once: true });
        img.addEventListener('error', resolve, { once: true });
      })),
  );
  await document.fonts.ready;
  return true;
})()"#;

/// Loads `html` into a fresh page and prints it once the network has settled.
async fn print_page(
    browser: &Browser,
    html: &str,
    params: PrintToPdfParams,
) -> anyhow::Result<Vec<u8>> {
    let page = browser
        .new_page("about:blank")
        .await
        .context("open browser page")?;
    // Returns after the frame's navigation lifecycle completes.
    page.set_content(html)
        .await
        .context("load styled html")?;
    page.evaluate(SETTLED_JS)
        .await
        .context("wait for network idle")?;
    let pdf = page.pdf(params).await.context("print pdf")?;
    if let Err(err) = page.close().await {
        tracing::debug!(?err, "failed to close browser page");
    }
    Ok(pdf)
}

/// Paper size and margins come from the template; CSS `@page` is ignored.
pub fn print_params(page: &PageGeometry) -> anyhow::Result<PrintToPdfParams> {
    let (width, height) = page.dimensions_in().context("resolve page size")?;
    Ok(PrintToPdfParams {
        landscape: Some(false),
        display_header_footer: Some(false),
        print_background: Some(true),
        scale: Some(1.0),
        paper_width: Some(width),
        paper_height: Some(height),
        margin_top: Some(page.margins.top_in),
        margin_bottom: Some(page.margins.bottom_in),
        margin_left: Some(page.margins.left_in),
        margin_right: Some(page.margins.right_in),
        prefer_css_page_size: Some(false),
        ..Default::default()
    })
}

/// Adds the free-plan overlay just before `</body>` (or at the end).
pub fn apply_watermark(document: &str) -> String {
    let overlay =
        format!("<div class=\"bookmagic-watermark\" style=\"{WATERMARK_STYLE}\">{WATERMARK_TEXT}</div>\n");
    match html::find_ignore_case(document, "</body>") {
        Some(at) => format!("{}{overlay}{}", &document[..at], &document[at..]),
        None => format!("{document}{overlay}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::TemplateRegistry;

    #[test]
    fn watermark_lands_inside_body() {
        let out = apply_watermark("<html><body><p>x</p></body></html>");
        let mark = out.find(WATERMARK_TEXT).expect("watermark");
        assert!(mark < out.find("</body>").expect("body end"));
        assert!(out.contains("opacity: 0.15"));
        assert!(out.contains("rotate(-45deg)"));
        assert!(out.contains("pointer-events: none"));
    }

    #[test]
    fn watermark_appends_to_fragments() {
        let out = apply_watermark("<p>x</p>");
        assert!(out.starts_with("<p>x</p><div class=\"bookmagic-watermark\""));
    }

    #[test]
    fn print_params_follow_template_geometry() -> anyhow::Result<()> {
        let registry = TemplateRegistry::builtin();

        let params = print_params(&registry.resolve("serif-classic").page)?;
        assert_eq!(params.paper_width, Some(6.0));
        assert_eq!(params.paper_height, Some(9.0));
        assert_eq!(params.margin_left, Some(0.875));
        assert_eq!(params.margin_right, Some(0.625));
        assert_eq!(params.print_background, Some(true));
        assert_eq!(params.prefer_css_page_size, Some(false));

        let params = print_params(&registry.resolve("novella-a5").page)?;
        assert_eq!(params.paper_width, Some(5.83));
        assert_eq!(params.paper_height, Some(8.27));
        Ok(())
    }

    #[test]
    fn unknown_template_prints_with_default_geometry() -> anyhow::Result<()> {
        let registry = TemplateRegistry::builtin();
        let params = print_params(&registry.resolve("does-not-exist").page)?;
        assert_eq!(params.paper_width, Some(6.0));
        Ok(())
    }

    #[test]
    fn settle_script_waits_for_load_images_and_fonts() {
        assert!(SETTLED_JS.contains("addEventListener('load'"));
        assert!(SETTLED_JS.contains("document.images"));
        assert!(SETTLED_JS.contains("addEventListener('error'"));
        assert!(SETTLED_JS.contains("await document.fonts.ready"));
    }
}
