use std::fmt::Write as _;

use serde::Serialize;

use crate::html;

/// One contents-page line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    pub level: u8,
    pub anchor_id: String,
    pub text: String,
    /// Synthetic: the contents page is page 1, entry `i` is page `i + 2`.
    pub page_number: u32,
}

/// Collects `h1`..`h3` headings that carry an `id`. Headings classed `title`
/// are the document title, not a chapter, and are skipped. Without sub-levels
/// only `h1` is kept.
///
/// Built-in markdown output has no ids, so it never yields entries.
pub fn derive_toc(html: &str, include_sub_levels: bool) -> Vec<TocEntry> {
    let tags = html::scan_tags(html);
    let mut entries = Vec::new();
    let mut resume_at = 0;

    for (idx, tag) in tags.iter().enumerate() {
        if tag.closing || tag.start < resume_at {
            continue;
        }
        let Some(level) = heading_level(&tag.name) else {
            continue;
        };
        let Some(anchor_id) = tag.attribute("id") else {
            continue;
        };
        let Some(close) = tags[idx + 1..]
            .iter()
            .find(|t| t.closing && heading_level(&t.name).is_some())
        else {
            break;
        };
        resume_at = close.end;

        if tag.has_class("title") || (level > 1 && !include_sub_levels) {
            continue;
        }

        let text = html::collapse_whitespace(&html::strip_tags(&html[tag.end..close.start]));
        entries.push(TocEntry {
            level,
            anchor_id: anchor_id.to_owned(),
            text,
            page_number: u32::try_from(entries.len()).unwrap_or(u32::MAX - 2) + 2,
        });
    }

    tracing::debug!(entries = entries.len(), include_sub_levels, "derived table of contents");
    entries
}

fn heading_level(name: &str) -> Option<u8> {
    match name {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        _ => None,
    }
}

/// Contents-page markup. Empty input renders nothing so callers can skip
/// insertion.
pub fn render_toc(entries: &[TocEntry]) -> String {
    if entries.is_empty() {
        return String::new();
    }

    let mut out = String::from(
        "\n<div class=\"table-of-contents\" style=\"page-break-after: always;\">\n  <h1 class=\"toc-title\">Contents</h1>\n  <div class=\"toc-entries\">\n",
    );
    for entry in entries {
        let indent = if entry.level > 1 {
            format!("margin-left: {}em;", f64::from(entry.level - 1) * 1.5)
        } else {
            String::new()
        };
        let _ = write!(
            out,
            "\n    <div class=\"toc-entry toc-level-{level}\" style=\"{indent}\">\n      <span class=\"toc-text\">{text}</span>\n      <span class=\"toc-dots\"></span>\n      <span class=\"toc-page\">{page}</span>\n    </div>",
            level = entry.level,
            text = entry.text,
            page = entry.page_number,
        );
    }
    out.push_str("\n  </div>\n</div>");

    out
}
