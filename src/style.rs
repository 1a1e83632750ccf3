//! Turns intermediate HTML into the styled document handed to the renderers:
//! contents page inserted, exactly one `<style>` block, complete shell.

use crate::html;

/// Styles a document in one pass: TOC first, then CSS.
pub fn style_document(html: &str, toc_html: &str, css: &str, title: &str) -> String {
    let with_toc = insert_toc(html, toc_html);
    inject_css(&with_toc, css, title)
}

/// Places the contents page before the first chapter heading (first `<h1>`
/// that is not the document title), else before `</body>`, else at the end.
pub fn insert_toc(html: &str, toc_html: &str) -> String {
    if toc_html.is_empty() {
        return html.to_owned();
    }

    let first_chapter = html::scan_tags(html)
        .into_iter()
        .find(|t| !t.closing && t.name == "h1" && !t.has_class("title"))
        .map(|t| t.start);
    let position = first_chapter.or_else(|| html::find_ignore_case(html, "</body>"));

    match position {
        Some(at) => {
            let mut out = String::with_capacity(html.len() + toc_html.len());
            out.push_str(&html[..at]);
            out.push_str(toc_html);
            out.push_str(&html[at..]);
            out
        }
        None => format!("{html}{toc_html}"),
    }
}

/// Full documents get their existing `<style>` blocks merged with `css` into a
/// single block before `</head>`. Fragments are wrapped in a minimal shell.
pub fn inject_css(html: &str, css: &str, title: &str) -> String {
    let (html, existing) = html::take_style_blocks(html);
    let css = if existing.is_empty() {
        css.to_owned()
    } else {
        format!("{}\n{css}", existing.join("\n"))
    };

    if let Some(head_end) = html::find_ignore_case(&html, "</head>") {
        let mut out = String::with_capacity(html.len() + css.len() + 16);
        out.push_str(&html[..head_end]);
        out.push_str("<style>");
        out.push_str(&css);
        out.push_str("</style>\n");
        out.push_str(&html[head_end..]);
        return out;
    }

    format!(
        "<!DOCTYPE html>
<html lang=\"en\">
<head>
    <meta charset=\"UTF-8\">
    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">
    <title>{title}</title>
    <style>{css}</style>
</head>
<body>
    {html}
</body>
</html>"
    )
}
