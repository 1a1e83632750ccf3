//! Byte-level HTML helpers. Not a parser: tags are located with a quote-aware
//! scan and everything between tags is treated as opaque text.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag<'a> {
    /// Offset of `<`.
    pub start: usize,
    /// Offset just past `>`.
    pub end: usize,
    pub raw: &'a str,
    /// Lowercased element name.
    pub name: String,
    pub closing: bool,
}

impl Tag<'_> {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        attribute(self.raw, name)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attribute("class")
            .is_some_and(|v| v.split_ascii_whitespace().any(|c| c == class))
    }
}

/// Element tags in document order. Comments, doctypes and stray `<` are skipped.
pub fn scan_tags(html: &str) -> Vec<Tag<'_>> {
    let bytes = html.as_bytes();
    let mut tags = Vec::new();
    let mut cursor = 0;

    while let Some(rel_lt) = html[cursor..].find('<') {
        let lt = cursor + rel_lt;
        let next = bytes.get(lt + 1).copied();

        let closing = next == Some(b'/');
        let name_start = if closing { lt + 2 } else { lt + 1 };
        let name_len = bytes[name_start.min(bytes.len())..]
            .iter()
            .take_while(|b| b.is_ascii_alphanumeric())
            .count();

        let is_markup = matches!(next, Some(b'!' | b'?'));
        if !is_markup && (name_len == 0 || !bytes[name_start].is_ascii_alphabetic()) {
            // Literal `<` in text.
            cursor = lt + 1;
            continue;
        }

        let Some(gt) = tag_end(html, lt) else {
            break;
        };

        if !is_markup {
            tags.push(Tag {
                start: lt,
                end: gt + 1,
                raw: &html[lt..=gt],
                name: html[name_start..name_start + name_len].to_ascii_lowercase(),
                closing,
            });
        }
        cursor = gt + 1;
    }

    tags
}

/// Index of the `>` closing the tag opened at `lt`, ignoring `>` inside quotes.
pub fn tag_end(html: &str, lt: usize) -> Option<usize> {
    let bytes = html.as_bytes();
    let mut in_quote: Option<u8> = None;

    for (offset, &b) in bytes[lt + 1..].iter().enumerate() {
        match in_quote {
            Some(q) if b == q => in_quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => in_quote = Some(b),
            None if b == b'>' => return Some(lt + 1 + offset),
            None => {}
        }
    }
    None
}

/// Value of `name` in a raw start tag; quoted or bare. Names compare
/// case-insensitively.
pub fn attribute<'a>(raw_tag: &'a str, name: &str) -> Option<&'a str> {
    let inner = raw_tag
        .trim_start_matches('<')
        .trim_end_matches('>')
        .trim_end_matches('/');
    let bytes = inner.as_bytes();

    // Skip the element name.
    let mut i = bytes
        .iter()
        .position(|b| b.is_ascii_whitespace())
        .unwrap_or(bytes.len());

    while i < bytes.len() {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let key_start = i;
        while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'=' {
            i += 1;
        }
        let key = &inner[key_start..i];
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }

        let mut value = "";
        if i < bytes.len() && bytes[i] == b'=' {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if i < bytes.len() && matches!(bytes[i], b'"' | b'\'') {
                let quote = bytes[i];
                let value_start = i + 1;
                let value_end = inner[value_start..]
                    .bytes()
                    .position(|b| b == quote)
                    .map_or(bytes.len(), |p| value_start + p);
                value = &inner[value_start..value_end];
                i = (value_end + 1).min(bytes.len());
            } else {
                let value_start = i;
                while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
                value = &inner[value_start..i];
            }
        }

        if !key.is_empty() && key.eq_ignore_ascii_case(name) {
            return Some(value);
        }
        if i == key_start {
            break;
        }
    }

    None
}

/// Drops every `<...>` run; text outside tags is kept verbatim.
pub fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(lt) = rest.find('<') {
        out.push_str(&rest[..lt]);
        match rest[lt..].find('>') {
            Some(gt) => rest = &rest[lt + gt + 1..],
            None => {
                out.push_str(&rest[lt..]);
                return out;
            }
        }
    }

    out.push_str(rest);
    out
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// ASCII case-insensitive `find`.
pub fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    let needle = needle.as_bytes();
    if needle.is_empty() {
        return Some(0);
    }
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle))
}

/// Removes every `<style>...</style>` element and returns the remaining
/// document with the blocks' contents in order.
pub fn take_style_blocks(html: &str) -> (String, Vec<String>) {
    let mut out = String::with_capacity(html.len());
    let mut blocks = Vec::new();
    let mut cursor = 0;

    while let Some(rel) = find_ignore_case(&html[cursor..], "<style") {
        let open = cursor + rel;
        let after_name = html.as_bytes().get(open + "<style".len()).copied();
        if !matches!(after_name, Some(b'>' | b'/') | Some(b' ' | b'\t' | b'\n' | b'\r')) {
            out.push_str(&html[cursor..open + 1]);
            cursor = open + 1;
            continue;
        }

        let Some(open_end) = tag_end(html, open) else {
            break;
        };
        let body_start = open_end + 1;
        let Some(rel_close) = find_ignore_case(&html[body_start..], "</style") else {
            break;
        };
        let close = body_start + rel_close;
        let close_end = tag_end(html, close).map_or(html.len(), |gt| gt + 1);

        out.push_str(&html[cursor..open]);
        blocks.push(html[body_start..close].to_owned());
        cursor = close_end;
    }

    out.push_str(&html[cursor..]);
    (out, blocks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_tags_respects_quotes_and_skips_markup() {
        let html = r#"<!DOCTYPE html><h1 id="a" data-x="1 > 0">T</h1> 3 < 4 <br/>"#;
        let tags = scan_tags(html);
        let names = tags
            .iter()
            .map(|t| (t.name.as_str(), t.closing))
            .collect::<Vec<_>>();
        assert_eq!(names, [("h1", false), ("h1", true), ("br", false)]);
        assert_eq!(tags[0].raw, r#"<h1 id="a" data-x="1 > 0">"#);
        assert_eq!(&html[tags[0].end..tags[1].start], "T");
    }

    #[test]
    fn attribute_forms() {
        let raw = r#"<h2 class='title main' ID="ch-1" data-n=3 hidden>"#;
        assert_eq!(attribute(raw, "id"), Some("ch-1"));
        assert_eq!(attribute(raw, "class"), Some("title main"));
        assert_eq!(attribute(raw, "data-n"), Some("3"));
        assert_eq!(attribute(raw, "hidden"), Some(""));
        assert_eq!(attribute(raw, "href"), None);
    }

    #[test]
    fn nameless_attributes_before_multibyte_text() {
        let raw = r#"<h1 ="x"é id="a">"#;
        assert_eq!(attribute(raw, "id"), Some("a"));
        assert_eq!(attribute(raw, "class"), None);

        let raw = "<p =\"ü\"ß ='Ω'日本 class=\"title\" =>";
        assert_eq!(attribute(raw, "class"), Some("title"));
        assert_eq!(attribute(raw, "href"), None);

        let tags = scan_tags(r#"<h1 ="x"é class="title">Hi</h1>"#);
        assert!(tags[0].has_class("title"));
        assert_eq!(tags[0].attribute("é"), Some(""));
    }

    #[test]
    fn has_class_matches_whole_tokens() {
        let tags = scan_tags(r#"<h1 class="subtitle">"#);
        assert!(!tags[0].has_class("title"));
        let tags = scan_tags(r#"<h1 class="book title">"#);
        assert!(tags[0].has_class("title"));
    }

    #[test]
    fn strip_tags_keeps_text_and_utf8() {
        assert_eq!(strip_tags("<p>Café <em>ok</em></p>"), "Café ok");
        assert_eq!(strip_tags("a < b"), "a < b");
    }

    #[test]
    fn style_blocks_are_taken_in_order() {
        let (rest, blocks) = take_style_blocks("<p>a</p><style>x{}</style><STYLE media=\"print\">y{}</STYLE>b");
        assert_eq!(rest, "<p>a</p>b");
        assert_eq!(blocks, ["x{}", "y{}"]);

        let (rest, blocks) = take_style_blocks("<styles><stylex>");
        assert!(blocks.is_empty());
        assert_eq!(rest, "<styles><stylex>");
    }

    #[test]
    fn find_ignore_case_works() {
        assert_eq!(find_ignore_case("<HEAD></HEAD>", "</head>"), Some(6));
        assert_eq!(find_ignore_case("abc", "x"), None);
    }
}
