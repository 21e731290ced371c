//! Display formatting for generated cover letters: placeholder substitution,
//! paragraph splitting and `**bold**` spans.

use serde::Serialize;

use crate::generation::models::SourceAttribution;

/// Source id the generator uses when it had nothing to attribute.
const UNKNOWN_SOURCE: &str = "unknown";

/// Values substituted for the generator's placeholder tokens. Empty values
/// leave the token in place.
#[derive(Debug, Clone, Default)]
pub struct Placeholders<'a> {
    pub company: &'a str,
    pub position: &'a str,
    pub department: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Span {
    pub text: String,
    pub bold: bool,
}

pub type Paragraph = Vec<Span>;

pub fn fill_placeholders(text: &str, values: &Placeholders<'_>) -> String {
    let mut out = text.to_string();
    for (token, value) in [
        ("[targetCompany]", values.company),
        ("[position]", values.position),
        ("[specific department]", values.department),
    ] {
        if !value.is_empty() {
            out = out.replace(token, value);
        }
    }
    out
}

/// Splits one paragraph into plain and bold spans. An unmatched `**` (as in a
/// still-streaming result) stays literal.
pub fn bold_spans(paragraph: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut rest = paragraph;

    while let Some(open) = rest.find("**") {
        let after_open = &rest[open + 2..];
        let Some(close) = after_open.find("**") else {
            break;
        };
        let inner = &after_open[..close];
        // `****` or a span containing `*` is not bold.
        if inner.is_empty() || inner.contains('*') {
            push_plain(&mut spans, &rest[..open + 2]);
            rest = after_open;
            continue;
        }
        push_plain(&mut spans, &rest[..open]);
        spans.push(Span {
            text: inner.to_string(),
            bold: true,
        });
        rest = &after_open[close + 2..];
    }
    push_plain(&mut spans, rest);
    spans
}

fn push_plain(spans: &mut Vec<Span>, text: &str) {
    if text.is_empty() {
        return;
    }
    match spans.last_mut() {
        Some(last) if !last.bold => last.text.push_str(text),
        _ => spans.push(Span {
            text: text.to_string(),
            bold: false,
        }),
    }
}

/// Full rendering: placeholders filled, split on blank lines, bold marked.
pub fn render(text: &str, values: &Placeholders<'_>) -> Vec<Paragraph> {
    fill_placeholders(text, values)
        .split("\n\n")
        .map(bold_spans)
        .collect()
}

/// Sources worth showing: none when the list is empty or the generator
/// reported an unknown origin.
pub fn visible_sources(sources: Option<&[SourceAttribution]>) -> Option<&[SourceAttribution]> {
    match sources {
        Some(list) if list.first().is_some_and(|s| s.id != UNKNOWN_SOURCE) => Some(list),
        _ => None,
    }
}
