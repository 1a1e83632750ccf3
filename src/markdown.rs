//! Minimal markdown-to-HTML transform used when the external converter is
//! unavailable.
//!
//! This is deliberately not CommonMark. It recognizes exactly: `#`/`##`/`###`
//! headings, `**bold**`, `*italic*`, `> ` quote lines, `- ` and `N. ` list
//! items (consecutive items share one `<ul>`), and blank-line separated
//! paragraphs. Template CSS and the TOC deriver depend on this tag vocabulary.
//! Embedded HTML is passed through unescaped.

/// Converts markdown into an HTML fragment (no document shell).
pub fn to_html(markdown: &str) -> String {
    let normalized = markdown.replace("\r\n", "\n");

    let lines = normalized.split('\n').map(transform_line).collect::<Vec<_>>();
    let body = group_list_items(lines).join("\n");

    body.split("\n\n")
        .map(paragraph)
        .collect::<Vec<_>>()
        .join("\n")
}

enum Line {
    Item(String),
    Other(String),
}

fn transform_line(line: &str) -> Line {
    if let Some(rest) = line.strip_prefix("### ") {
        return Line::Other(format!("<h3>{}</h3>", inline(rest)));
    }
    if let Some(rest) = line.strip_prefix("## ") {
        return Line::Other(format!("<h2>{}</h2>", inline(rest)));
    }
    if let Some(rest) = line.strip_prefix("# ") {
        return Line::Other(format!("<h1>{}</h1>", inline(rest)));
    }
    if let Some(rest) = line.strip_prefix("> ") {
        return Line::Other(format!("<blockquote>{}</blockquote>", inline(rest)));
    }
    if let Some(rest) = line.strip_prefix("- ").or_else(|| strip_ordered_marker(line)) {
        return Line::Item(format!("<li>{}</li>", inline(rest)));
    }
    Line::Other(inline(line))
}

/// `12. text` -> `text`.
fn strip_ordered_marker(line: &str) -> Option<&str> {
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    line[digits..].strip_prefix(". ")
}

fn group_list_items(lines: Vec<Line>) -> Vec<String> {
    let mut out = Vec::with_capacity(lines.len());
    let mut run: Vec<String> = Vec::new();

    for line in lines {
        match line {
            Line::Item(item) => run.push(item),
            Line::Other(text) => {
                if !run.is_empty() {
                    out.push(format!("<ul>{}</ul>", run.join("\n")));
                    run.clear();
                }
                out.push(text);
            }
        }
    }
    if !run.is_empty() {
        out.push(format!("<ul>{}</ul>", run.join("\n")));
    }

    out
}

fn inline(text: &str) -> String {
    let bold = wrap_delimited(text, "**", "strong");
    wrap_delimited(&bold, "*", "em")
}

/// Wraps each `delim…delim` pair (shortest match, left to right) in `tag`.
fn wrap_delimited(text: &str, delim: &str, tag: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(delim) {
        let after = &rest[start + delim.len()..];
        let Some(end) = after.find(delim) else {
            break;
        };
        out.push_str(&rest[..start]);
        out.push_str(&format!("<{tag}>{}</{tag}>", &after[..end]));
        rest = &after[end + delim.len()..];
    }

    out.push_str(rest);
    out
}

fn paragraph(block: &str) -> String {
    let block = block.trim();
    if block.is_empty()
        || block.starts_with("<h")
        || block.starts_with("<blockquote")
        || block.starts_with("<ul")
    {
        return block.to_owned();
    }
    format!("<p>{}</p>", block.replace('\n', " "))
}
