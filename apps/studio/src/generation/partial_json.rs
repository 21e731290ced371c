//! Incremental object decoding.
//!
//! The generator streams the text of one JSON document. After every fragment
//! the accumulated prefix is repaired into the closest complete document:
//! an open string value is closed, an unfinished key, a dangling `,` or `:`,
//! a partial literal or a number that cannot end yet are cut back to the last
//! complete value, and every open array/object is closed.

use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("generation ended before any result was produced")]
    Empty,

    #[error("generated result does not match the expected shape: {0}")]
    Shape(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    /// After `{`: a key or `}`.
    KeyOrClose,
    /// After `,` in an object.
    Key,
    /// After a key.
    Colon,
    /// After `:` or `,` in an array.
    Value,
    /// After `[`: a value or `]`.
    ValueOrClose,
    /// After a complete value.
    CommaOrClose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Object,
    Array,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    None,
    /// Inside a string; `key` tells whether it is an object key.
    Str { key: bool, escape_at: Option<usize> },
    Number,
    Literal,
}

/// Cut point: the prefix `[..len]` becomes valid once `depth` frames are closed.
#[derive(Debug, Clone, Copy)]
struct SafePoint {
    len: usize,
    depth: usize,
}

/// Repairs a JSON prefix. Returns `None` when no value has started yet.
pub fn repair(prefix: &str) -> Option<String> {
    let bytes = prefix.as_bytes();
    let mut stack: Vec<Frame> = Vec::new();
    let mut expect = Expect::Value;
    let mut token = Token::None;
    let mut safe: Option<SafePoint> = None;
    // Pending escape: byte offset of the backslash and bytes still owed.
    let mut escape_left = 0usize;

    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match token {
            Token::Str { key, escape_at } => {
                if escape_left > 0 {
                    escape_left -= 1;
                    if b == b'u' && escape_at == Some(i - 1) {
                        escape_left = 4;
                    }
                    if escape_left == 0 {
                        token = Token::Str {
                            key,
                            escape_at: None,
                        };
                    }
                } else if b == b'\\' {
                    escape_left = 1;
                    token = Token::Str {
                        key,
                        escape_at: Some(i),
                    };
                } else if b == b'"' {
                    token = Token::None;
                    if key {
                        expect = Expect::Colon;
                    } else {
                        expect = Expect::CommaOrClose;
                        safe = Some(SafePoint {
                            len: i + 1,
                            depth: stack.len(),
                        });
                    }
                }
                i += 1;
                continue;
            }
            Token::Number => {
                if matches!(b, b'0'..=b'9' | b'.' | b'e' | b'E' | b'+' | b'-') {
                    i += 1;
                    continue;
                }
                token = Token::None;
                expect = Expect::CommaOrClose;
                safe = Some(SafePoint {
                    len: i,
                    depth: stack.len(),
                });
                // Reprocess the delimiter below.
            }
            Token::Literal => {
                if b.is_ascii_alphabetic() {
                    i += 1;
                    continue;
                }
                token = Token::None;
                expect = Expect::CommaOrClose;
                safe = Some(SafePoint {
                    len: i,
                    depth: stack.len(),
                });
            }
            Token::None => {}
        }

        match b {
            b' ' | b'\n' | b'\r' | b'\t' => {}
            b'"' => {
                let key = matches!(expect, Expect::Key | Expect::KeyOrClose);
                token = Token::Str {
                    key,
                    escape_at: None,
                };
            }
            b'{' => {
                stack.push(Frame::Object);
                expect = Expect::KeyOrClose;
                safe = Some(SafePoint {
                    len: i + 1,
                    depth: stack.len(),
                });
            }
            b'[' => {
                stack.push(Frame::Array);
                expect = Expect::ValueOrClose;
                safe = Some(SafePoint {
                    len: i + 1,
                    depth: stack.len(),
                });
            }
            b'}' | b']' => {
                stack.pop();
                expect = Expect::CommaOrClose;
                safe = Some(SafePoint {
                    len: i + 1,
                    depth: stack.len(),
                });
            }
            b',' => {
                expect = match stack.last() {
                    Some(Frame::Object) => Expect::Key,
                    _ => Expect::Value,
                };
            }
            b':' => expect = Expect::Value,
            b'-' | b'0'..=b'9' => token = Token::Number,
            b't' | b'f' | b'n' => token = Token::Literal,
            _ => {}
        }
        i += 1;
    }

    let close = |body: &str, depth: usize| {
        let mut out = String::with_capacity(body.len() + depth + 1);
        out.push_str(body);
        for frame in stack[..depth].iter().rev() {
            out.push(match frame {
                Frame::Object => '}',
                Frame::Array => ']',
            });
        }
        out
    };

    match token {
        Token::Str {
            key: false,
            escape_at,
        } => {
            let end = escape_at.unwrap_or(bytes.len());
            let mut body = prefix[..end].to_string();
            body.push('"');
            Some(close(&body, stack.len()))
        }
        Token::Number if bytes.last().is_some_and(u8::is_ascii_digit) => {
            Some(close(prefix, stack.len()))
        }
        _ => safe.map(|p| close(&prefix[..p.len], p.depth)),
    }
}

/// Accumulates streamed text and yields each new partial value.
#[derive(Debug)]
pub struct PartialObjectDecoder<T> {
    buffer: String,
    last: Option<T>,
}

impl<T> Default for PartialObjectDecoder<T> {
    fn default() -> Self {
        Self {
            buffer: String::new(),
            last: None,
        }
    }
}

impl<T: DeserializeOwned + PartialEq + Clone> PartialObjectDecoder<T> {
    /// Appends a fragment. Returns the repaired value only when it differs
    /// from the previously returned one.
    pub fn push(&mut self, fragment: &str) -> Option<T> {
        self.buffer.push_str(fragment);
        let repaired = repair(&self.buffer)?;
        let value: T = serde_json::from_str(&repaired).ok()?;
        if self.last.as_ref() == Some(&value) {
            return None;
        }
        self.last = Some(value.clone());
        Some(value)
    }

    /// Strictly parses the complete document into its final shape.
    pub fn finish<F: DeserializeOwned>(&self) -> Result<F, DecodeError> {
        if self.buffer.trim().is_empty() {
            return Err(DecodeError::Empty);
        }
        Ok(serde_json::from_str(&self.buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn repaired(prefix: &str) -> Option<String> {
        repair(prefix)
    }

    #[test]
    fn test_empty_prefix_has_no_value() {
        assert_eq!(repaired(""), None);
        assert_eq!(repaired("   "), None);
    }

    #[test]
    fn test_open_string_value_is_closed() {
        assert_eq!(repaired(r#"{"text":"Dear hir"#).unwrap(), r#"{"text":"Dear hir"}"#);
    }

    #[test]
    fn test_partial_key_is_dropped() {
        assert_eq!(repaired(r#"{"text":"A","sou"#).unwrap(), r#"{"text":"A"}"#);
        assert_eq!(repaired(r#"{"te"#).unwrap(), "{}");
    }

    #[test]
    fn test_dangling_colon_and_comma_are_dropped() {
        assert_eq!(repaired(r#"{"text":"A","sources":"#).unwrap(), r#"{"text":"A"}"#);
        assert_eq!(repaired(r#"{"text":"A","#).unwrap(), r#"{"text":"A"}"#);
        assert_eq!(repaired(r#"{"text": "#).unwrap(), "{}");
    }

    #[test]
    fn test_nested_arrays_and_objects_are_closed() {
        assert_eq!(
            repaired(r#"{"text":"A","sources":[{"id":"x","contributions":4"#).unwrap(),
            r#"{"text":"A","sources":[{"id":"x","contributions":4}]}"#
        );
        assert_eq!(
            repaired(r#"{"text":"A","sources":["#).unwrap(),
            r#"{"text":"A","sources":[]}"#
        );
        assert_eq!(
            repaired(r#"{"sources":[{"id":"x"},{"#).unwrap(),
            r#"{"sources":[{"id":"x"},{}]}"#
        );
    }

    #[test]
    fn test_unterminated_number_is_cut_back() {
        assert_eq!(
            repaired(r#"{"sources":[{"id":"x","contributions":4."#).unwrap(),
            r#"{"sources":[{"id":"x"}]}"#
        );
        assert_eq!(
            repaired(r#"{"a":-"#).unwrap(),
            "{}"
        );
    }

    #[test]
    fn test_partial_literal_is_cut_back() {
        assert_eq!(repaired(r#"{"a":1,"b":tr"#).unwrap(), r#"{"a":1}"#);
        assert_eq!(repaired(r#"{"a":null,"#).unwrap(), r#"{"a":null}"#);
    }

    #[test]
    fn test_escape_sequences() {
        assert_eq!(repaired(r#"{"text":"say \"hi"#).unwrap(), r#"{"text":"say \"hi"}"#);
        // A dangling backslash or unfinished \u escape is not emitted.
        assert_eq!(repaired(r#"{"text":"line\"#).unwrap(), r#"{"text":"line"}"#);
        assert_eq!(repaired(r#"{"text":"a\u00"#).unwrap(), r#"{"text":"a"}"#);
        assert_eq!(repaired(r#"{"text":"aéb"#).unwrap(), r#"{"text":"aéb"}"#);
        assert_eq!(repaired(r#"{"text":"a\\"#).unwrap(), r#"{"text":"a\\"}"#);
    }

    #[test]
    fn test_braces_inside_strings_are_text() {
        assert_eq!(repaired(r#"{"text":"{[,:"#).unwrap(), r#"{"text":"{[,:"}"#);
    }

    #[test]
    fn test_non_ascii_text_survives() {
        assert_eq!(
            repaired(r#"{"text":"안녕하세요"#).unwrap(),
            r#"{"text":"안녕하세요"}"#
        );
    }

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    struct Doc {
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        sources: Option<Vec<serde_json::Value>>,
    }

    #[test]
    fn test_decoder_emits_only_changes() {
        let mut decoder = PartialObjectDecoder::<Doc>::default();
        let first = decoder.push(r#"{"text":"A"#).unwrap();
        assert_eq!(first.text.as_deref(), Some("A"));

        // Whitespace and a dangling comma don't change the value.
        assert!(decoder.push(r#"", "#).is_none());

        let next = decoder.push(r#""sources":[]}"#).unwrap();
        assert_eq!(next.sources, Some(vec![]));
    }

    #[test]
    fn test_decoder_finish_requires_complete_document() {
        let mut decoder = PartialObjectDecoder::<Doc>::default();
        decoder.push(r#"{"text":"AB""#);
        assert!(matches!(decoder.finish::<Doc>(), Err(DecodeError::Shape(_))));

        decoder.push("}");
        let done: Doc = decoder.finish().unwrap();
        assert_eq!(done.text.as_deref(), Some("AB"));
    }

    #[test]
    fn test_decoder_finish_on_empty_stream() {
        let decoder = PartialObjectDecoder::<Doc>::default();
        assert!(matches!(decoder.finish::<Doc>(), Err(DecodeError::Empty)));
    }
}
