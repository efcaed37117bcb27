//! Fixed-width line reflow
//!
//! Lines longer than the limit are cut at fixed offsets and the pieces are
//! emitted in order, immediately after each other. This is not word
//! wrapping: a cut may fall in the middle of a word.
//!
//! Two measures of length are supported:
//!
//! - [`limit_to`] counts characters (Unicode scalar values), so a cut never
//!   splits a UTF-8 sequence.
//! - [`limit_to_markup`] additionally counts an escaped entity such as
//!   `&lt;` or `&#39;` as a single character and never cuts through one.
//!   Lines are escaped before they reach the template engine, so this is the
//!   variant the `limit_to` template filter uses.
//!
//! [`markup_len`] measures an escaped line the same way [`limit_to_markup`]
//! does, for templates that size their frame to the longest line.

use thiserror::Error;

/// Longest entity name (between `&` and `;`) treated as a single character
const MAX_ENTITY_LEN: usize = 10;

/// Error returned when reflowing with a zero maximum length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("maximum line length must be positive")]
pub struct ZeroLengthError;

/// Reflow `lines` so that no element is longer than `max_size` characters
///
/// Every line within the limit is emitted unchanged. That includes a blank
/// line: it stays a blank element, so `lines=a%0A%0Ab` keeps its empty row.
/// Longer lines are emitted as consecutive pieces of exactly `max_size`
/// characters followed by the shorter remainder. Only an empty remainder
/// yields nothing, and one never occurs: cutting stops as soon as the rest of
/// the line fits.
///
/// # Errors
///
/// Returns [`ZeroLengthError`] if `max_size` is zero.
///
/// # Example
///
/// ```rust
/// use makeconsole::template::wrap::limit_to;
///
/// let wrapped = limit_to(&["Hello World"], 6).unwrap();
/// assert_eq!(wrapped, vec!["Hello ", "World"]);
/// ```
pub fn limit_to<S: AsRef<str>>(lines: &[S], max_size: usize) -> Result<Vec<String>, ZeroLengthError> {
    reflow(lines, max_size, char_split)
}

/// Reflow already-escaped `lines`, counting each entity as one character
///
/// # Errors
///
/// Returns [`ZeroLengthError`] if `max_size` is zero.
///
/// # Example
///
/// ```rust
/// use makeconsole::template::wrap::limit_to_markup;
///
/// let wrapped = limit_to_markup(&["a&lt;b&gt;c"], 2).unwrap();
/// assert_eq!(wrapped, vec!["a&lt;", "b&gt;", "c"]);
/// ```
pub fn limit_to_markup<S: AsRef<str>>(
    lines: &[S],
    max_size: usize,
) -> Result<Vec<String>, ZeroLengthError> {
    reflow(lines, max_size, markup_split)
}

/// Length of an escaped line, counting each entity as one character
///
/// # Example
///
/// ```rust
/// use makeconsole::template::wrap::markup_len;
///
/// assert_eq!(markup_len("a&lt;b"), 3);
/// ```
#[must_use]
pub fn markup_len(line: &str) -> usize {
    let mut offset = 0;
    let mut count = 0;
    while let Some(len) = unit_len(&line[offset..]) {
        offset += len;
        count += 1;
    }
    count
}

fn reflow<S, F>(lines: &[S], max_size: usize, split: F) -> Result<Vec<String>, ZeroLengthError>
where
    S: AsRef<str>,
    F: Fn(&str, usize) -> Option<usize>,
{
    if max_size == 0 {
        return Err(ZeroLengthError);
    }

    let mut result = Vec::with_capacity(lines.len());
    for line in lines {
        let mut rest = line.as_ref();
        while let Some(at) = split(rest, max_size) {
            let (head, tail) = rest.split_at(at);
            result.push(head.to_owned());
            rest = tail;
        }
        result.push(rest.to_owned());
    }

    Ok(result)
}

/// Byte offset of character number `max_size`, if the line is longer than that
fn char_split(line: &str, max_size: usize) -> Option<usize> {
    line.char_indices().nth(max_size).map(|(offset, _)| offset)
}

/// Like [`char_split`], but an entity counts as a single character
fn markup_split(line: &str, max_size: usize) -> Option<usize> {
    let mut offset = 0;
    for _ in 0..max_size {
        offset += unit_len(&line[offset..])?;
    }
    (offset < line.len()).then_some(offset)
}

/// Byte length of the character or entity at the start of `s`
fn unit_len(s: &str) -> Option<usize> {
    let first = s.chars().next()?;
    Some(entity_len(s).unwrap_or_else(|| first.len_utf8()))
}

/// Byte length of the entity at the start of `s`, if `s` starts with one
fn entity_len(s: &str) -> Option<usize> {
    let body = s.strip_prefix('&')?;
    let end = body.find(';')?;
    let name = &body[..end];
    let valid = !name.is_empty()
        && name.len() <= MAX_ENTITY_LEN
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '#');
    valid.then_some(end + 2)
}
