//! Replacing one pipeline section inside an existing Confluence page.
//!
//! A section starts at an `<h2>` whose text equals the section key (ignoring
//! case and whitespace runs) and extends up to the next `<h2>` or the end of
//! the page. Everything outside that span is kept byte for byte.
//!
//! Header text is what a reader sees: inline markup such as `<strong>` is
//! dropped and the common entities are decoded before comparing.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h2(?:\s[^>]*)?>(.*?)</h2\s*>").expect("valid regex"));

static HEADER_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<h2(?:\s[^>]*)?>").expect("valid regex"));

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

// `&amp;` goes last so `&amp;lt;` decodes to the text `&lt;`.
const ENTITIES: [(&str, &str); 7] = [
    ("&nbsp;", " "),
    ("&#160;", " "),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&amp;", "&"),
];

/// What the splice did to the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpliceAction {
    Replaced,
    /// No section with the key existed; it was added at the end.
    Appended,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spliced {
    pub content: String,
    pub action: SpliceAction,
}

/// Puts `section` in place of the section keyed `key`, or appends it.
pub fn splice_section(content: &str, key: &str, section: &str) -> Spliced {
    match find_section(content, key) {
        Some(span) => {
            let mut spliced =
                String::with_capacity(content.len() - span.len() + section.len());
            spliced.push_str(&content[..span.start]);
            spliced.push_str(section);
            spliced.push_str(&content[span.end..]);

            Spliced {
                content: spliced,
                action: SpliceAction::Replaced,
            }
        }
        None => Spliced {
            content: format!("{content}{section}"),
            action: SpliceAction::Appended,
        },
    }
}

/// Byte range of the first section keyed `key`, header included.
pub fn find_section(content: &str, key: &str) -> Option<Range<usize>> {
    let wanted = normalize(key);

    let header = HEADER_RE
        .captures_iter(content)
        .find(|captures| normalize(&header_text(&captures[1])) == wanted)?
        .get(0)?;

    let end = HEADER_START_RE
        .find_at(content, header.end())
        .map_or(content.len(), |next| next.start());

    Some(header.start()..end)
}

/// Visible text of a header's inner HTML.
fn header_text(inner: &str) -> String {
    ENTITIES
        .iter()
        .fold(TAG_RE.replace_all(inner, "").into_owned(), |text, (entity, plain)| {
            text.replace(*entity, plain)
        })
}

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
