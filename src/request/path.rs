//! Escaped path handling
//!
//! Both the GET URL and the `path` attribute use `/` as separator and `!`
//! as escape character: `!/` is a literal slash, `!!` a literal `!` and
//! `!"` a literal double quote.

use crate::error::{RequestError, RequestResult};

const ESCAPE: char = '!';
const SEPARATOR: char = '/';

/// Split an escaped string into unescaped segments
///
/// An empty input yields no segments.
///
/// # Errors
/// [`RequestError::Decode`] for a dangling `!` or an unknown escape.
pub fn split_escaped(input: &str) -> RequestResult<Vec<String>> {
    if input.is_empty() {
        return Ok(Vec::new());
    }

    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match c {
            ESCAPE => match chars.next() {
                Some(escaped @ (ESCAPE | SEPARATOR | '"')) => current.push(escaped),
                Some(other) => {
                    return Err(RequestError::Decode(format!(
                        "invalid escape sequence '!{}' in '{}'",
                        other, input
                    )))
                }
                None => {
                    return Err(RequestError::Decode(format!(
                        "dangling escape character at the end of '{}'",
                        input
                    )))
                }
            },
            SEPARATOR => segments.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    segments.push(current);

    Ok(segments)
}

/// Escape a single segment so that [`split_escaped`] restores it
pub fn escape_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for c in segment.chars() {
        if c == ESCAPE || c == SEPARATOR {
            out.push(ESCAPE);
        }
        out.push(c);
    }
    out
}

/// Join segments into an escaped path
///
/// `None` for an empty sequence and for a single empty segment, which
/// would render as `""` and split back into no segments at all.
pub fn join_escaped(segments: &[String]) -> Option<String> {
    match segments {
        [] => return None,
        [only] if only.is_empty() => return None,
        _ => {}
    }
    Some(
        segments
            .iter()
            .map(|s| escape_segment(s))
            .collect::<Vec<_>>()
            .join("/"),
    )
}

/// Path segments as stored on a request
///
/// A lone empty segment has no escaped form, so it collapses to no path.
pub fn normalize_path(mut segments: Vec<String>) -> Vec<String> {
    if matches!(segments.as_slice(), [only] if only.is_empty()) {
        segments.clear();
    }
    segments
}

/// Lex a GET path info (`/read/java.lang:type=Memory/HeapMemoryUsage`)
///
/// A leading `/` and any trailing empty segments are ignored, and a final
/// `-` segment (meaning "nothing more") is dropped.
pub fn split_url_path(pathinfo: &str) -> RequestResult<Vec<String>> {
    let trimmed = pathinfo.strip_prefix(SEPARATOR).unwrap_or(pathinfo);
    let mut segments = split_escaped(trimmed)?;

    pop_empty(&mut segments);
    if segments.last().is_some_and(|s| s == "-") {
        segments.pop();
        pop_empty(&mut segments);
    }
    Ok(segments)
}

fn pop_empty(segments: &mut Vec<String>) {
    while segments.last().is_some_and(|s| s.is_empty()) {
        segments.pop();
    }
}
