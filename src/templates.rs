use std::path::Path;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TEMPLATE_ID: &str = "serif-classic";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageSize {
    /// A paper format the print pipeline knows by name (`A5`, `A4`, `Letter`, `Legal`).
    Named { format: String },
    Custom { width_in: f64, height_in: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub top_in: f64,
    pub bottom_in: f64,
    pub left_in: f64,
    pub right_in: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub size: PageSize,
    pub margins: Margins,
}

impl PageGeometry {
    /// Paper width and height in inches.
    pub fn dimensions_in(&self) -> anyhow::Result<(f64, f64)> {
        match &self.size {
            PageSize::Custom {
                width_in,
                height_in,
            } => Ok((*width_in, *height_in)),
            PageSize::Named { format } => match format.to_ascii_lowercase().as_str() {
                "a5" => Ok((5.83, 8.27)),
                "a4" => Ok((8.27, 11.7)),
                "letter" => Ok((8.5, 11.0)),
                "legal" => Ok((8.5, 14.0)),
                other => anyhow::bail!("unknown page format: {other}"),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateDescriptor {
    pub id: String,
    pub name: String,
    pub trim_size: String,
    pub font_family: String,
    pub font_size_pt: f32,
    pub description: String,
    pub page: PageGeometry,
    /// Inline stylesheet; only templates loaded from a registry file carry one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    templates: Vec<TemplateDescriptor>,
}

#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    templates: Vec<TemplateDescriptor>,
    default: TemplateDescriptor,
}

impl TemplateRegistry {
    pub fn builtin() -> Self {
        let templates = builtin_templates();
        let default = templates
            .iter()
            .find(|t| t.id == DEFAULT_TEMPLATE_ID)
            .cloned()
            .unwrap_or_else(serif_classic);
        Self { templates, default }
    }

    /// Built-in templates, extended (or overridden by id) from a YAML file.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut registry = Self::builtin();
        let Some(path) = path else {
            return Ok(registry);
        };

        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("read template registry: {}", path.display()))?;
        let file: RegistryFile = serde_yaml::from_str(&yaml)
            .with_context(|| format!("parse template registry: {}", path.display()))?;
        for template in &file.templates {
            if !is_path_safe(&template.id) {
                anyhow::bail!("invalid template id in registry: {:?}", template.id);
            }
            template
                .page
                .dimensions_in()
                .with_context(|| format!("template {}", template.id))?;
        }

        tracing::info!(
            path = %path.display(),
            count = file.templates.len(),
            "loaded template registry file"
        );
        registry.merge(file.templates);
        Ok(registry)
    }

    pub fn merge(&mut self, extra: Vec<TemplateDescriptor>) {
        for template in extra {
            if template.id == DEFAULT_TEMPLATE_ID {
                self.default = template.clone();
            }
            match self.templates.iter_mut().find(|t| t.id == template.id) {
                Some(existing) => *existing = template,
                None => self.templates.push(template),
            }
        }
    }

    pub fn all(&self) -> &[TemplateDescriptor] {
        &self.templates
    }

    pub fn get(&self, id: &str) -> Option<&TemplateDescriptor> {
        self.templates.iter().find(|t| t.id == id)
    }

    /// Unknown ids resolve to `serif-classic`.
    pub fn resolve(&self, id: &str) -> &TemplateDescriptor {
        self.get(id).unwrap_or(&self.default)
    }

    /// Stylesheet for a template: `{css_dir}/{id}.css`, then the registry's
    /// inline CSS, then the built-in stylesheet, then `serif-classic`.
    pub fn template_css(&self, id: &str, css_dir: &Path) -> String {
        if is_path_safe(id) {
            let css_path = css_dir.join(format!("{id}.css"));
            match std::fs::read_to_string(&css_path) {
                Ok(css) => {
                    tracing::info!(path = %css_path.display(), chars = css.len(), "loaded template css");
                    return css;
                }
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => {
                    tracing::warn!(path = %css_path.display(), ?err, "failed to read template css; using fallback");
                }
            }
        }

        if let Some(css) = self.get(id).and_then(|t| t.css.clone()) {
            return css;
        }

        tracing::debug!(template_id = id, "using built-in template css");
        builtin_css(id).to_owned()
    }
}

/// Template ids double as file stems under the template CSS directory.
pub fn is_path_safe(id: &str) -> bool {
    !id.is_empty()
        && !id.starts_with('.')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

fn builtin_templates() -> Vec<TemplateDescriptor> {
    vec![
        serif_classic(),
        TemplateDescriptor {
            id: "trade-clean".to_owned(),
            name: "Trade Clean".to_owned(),
            trim_size: "5.5\" × 8.5\"".to_owned(),
            font_family: "Lora".to_owned(),
            font_size_pt: 10.0,
            description: "Modern, clean look for nonfiction.".to_owned(),
            page: PageGeometry {
                size: PageSize::Custom {
                    width_in: 5.5,
                    height_in: 8.5,
                },
                margins: Margins {
                    top_in: 1.0,
                    bottom_in: 1.0,
                    left_in: 1.0,
                    right_in: 0.75,
                },
            },
            css: None,
        },
        TemplateDescriptor {
            id: "novella-a5".to_owned(),
            name: "Novella A5".to_owned(),
            trim_size: "A5".to_owned(),
            font_family: "Source Serif".to_owned(),
            font_size_pt: 9.0,
            description: "Compact size, great for novellas.".to_owned(),
            page: PageGeometry {
                size: PageSize::Named {
                    format: "A5".to_owned(),
                },
                margins: Margins {
                    top_in: 0.75,
                    bottom_in: 0.75,
                    left_in: 0.75,
                    right_in: 0.5,
                },
            },
            css: None,
        },
    ]
}

fn serif_classic() -> TemplateDescriptor {
    TemplateDescriptor {
        id: DEFAULT_TEMPLATE_ID.to_owned(),
        name: "Serif Classic".to_owned(),
        trim_size: "6\" × 9\"".to_owned(),
        font_family: "EB Garamond".to_owned(),
        font_size_pt: 11.0,
        description: "Timeless style with literary charm.".to_owned(),
        page: PageGeometry {
            size: PageSize::Custom {
                width_in: 6.0,
                height_in: 9.0,
            },
            margins: Margins {
                top_in: 0.75,
                bottom_in: 0.75,
                left_in: 0.875,
                right_in: 0.625,
            },
        },
        css: None,
    }
}

fn builtin_css(id: &str) -> &'static str {
    match id {
        "trade-clean" => TRADE_CLEAN_CSS,
        "novella-a5" => NOVELLA_A5_CSS,
        _ => SERIF_CLASSIC_CSS,
    }
}

/// Contents-page rules shared by every template plus the template's overrides.
pub fn toc_css(id: &str) -> String {
    let overrides = match id {
        "trade-clean" => TOC_TRADE_CLEAN_CSS,
        "novella-a5" => TOC_NOVELLA_A5_CSS,
        _ => TOC_SERIF_CLASSIC_CSS,
    };
    format!("{TOC_BASE_CSS}{overrides}")
}

const SERIF_CLASSIC_CSS: &str = r#"
body {
  font-family: 'Times New Roman', 'Times', serif;
  font-size: 11pt;
  line-height: 1.4;
  margin: 1in;
  text-align: justify;
  color: #333;
}
h1 {
  font-size: 18pt;
  font-weight: bold;
  text-align: center;
  margin: 2em 0 1em 0;
  page-break-before: always;
}
h2 { font-size: 14pt; font-weight: bold; margin: 1.5em 0 0.5em 0; }
h3 { font-size: 12pt; font-weight: bold; margin: 1em 0 0.5em 0; }
p { margin: 0 0 0.5em 0; text-indent: 1.5em; }
p:first-child, h1 + p, h2 + p, h3 + p { text-indent: 0; }
blockquote {
  margin: 1em 2em;
  font-style: italic;
  border-left: 3px solid #ccc;
  padding-left: 1em;
}
ul, ol { margin: 1em 0; padding-left: 2em; }
"#;

const TRADE_CLEAN_CSS: &str = r#"
body {
  font-family: 'Georgia', serif;
  font-size: 10pt;
  line-height: 1.5;
  margin: 1in;
  text-align: left;
  color: #2c2c2c;
}
h1 {
  font-size: 16pt;
  font-weight: normal;
  margin: 3em 0 2em 0;
  text-transform: uppercase;
  letter-spacing: 0.1em;
}
h2 { font-size: 12pt; font-weight: bold; margin: 2em 0 1em 0; }
h3 { font-size: 11pt; font-weight: bold; margin: 1.5em 0 0.5em 0; }
p { margin: 0 0 1em 0; text-indent: 0; }
blockquote { margin: 1.5em 1em; font-style: italic; color: #555; }
"#;

const NOVELLA_A5_CSS: &str = r#"
body {
  font-family: 'Book Antiqua', 'Palatino', serif;
  font-size: 9pt;
  line-height: 1.3;
  margin: 0.75in;
  text-align: justify;
  color: #1a1a1a;
}
h1 { font-size: 14pt; font-weight: bold; margin: 1.5em 0 1em 0; text-align: center; }
h2 { font-size: 11pt; font-weight: bold; margin: 1em 0 0.5em 0; }
h3 { font-size: 10pt; font-weight: bold; margin: 0.8em 0 0.3em 0; }
p { margin: 0 0 0.3em 0; text-indent: 1em; }
p:first-child, h1 + p, h2 + p, h3 + p { text-indent: 0; }
blockquote { margin: 0.8em 1.5em; font-style: italic; font-size: 0.95em; }
"#;

const TOC_BASE_CSS: &str = r#"
.table-of-contents { margin: 2em 0; page-break-after: always; }
.toc-title { text-align: center; margin-bottom: 2em; font-weight: bold; }
.toc-entries { margin: 0; padding: 0; }
.toc-entry { display: flex; margin: 0.5em 0; align-items: baseline; page-break-inside: avoid; }
.toc-text { flex: 0 0 auto; }
.toc-dots { flex: 1 1 auto; border-bottom: 1px dotted #666; margin: 0 0.5em; height: 0.8em; }
.toc-page { flex: 0 0 auto; font-weight: bold; }
.toc-level-2 { font-size: 0.9em; }
.toc-level-3 { font-size: 0.8em; font-style: italic; }
"#;

const TOC_SERIF_CLASSIC_CSS: &str = r#"
.toc-title { font-size: 18pt; text-transform: uppercase; letter-spacing: 0.05em; }
.toc-entry { font-size: 11pt; line-height: 1.4; }
"#;

const TOC_NOVELLA_A5_CSS: &str = r#"
.toc-title { font-size: 14pt; text-transform: capitalize; }
.toc-entry { font-size: 9pt; line-height: 1.3; margin: 0.3em 0; }
"#;

const TOC_TRADE_CLEAN_CSS: &str = r#"
.toc-title { font-size: 16pt; font-weight: normal; }
.toc-entry { font-size: 10pt; line-height: 1.5; }
"#;
