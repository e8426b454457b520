//! Text scanning shared by the builder stages.
//!
//! Shader text is treated as bytes. Every offset produced here sits on an
//! ASCII byte (`@`, `(`, `)`, `,`) or at the end of the text, so slicing the
//! original `&str` at these offsets is always valid.

use std::ops::Range;

use smallvec::SmallVec;

use crate::errors::SyntaxErrorKind;

/// Keywords that open or close a block.
const BLOCK_KEYWORDS: [&str; 5] = ["end", "else", "foreach", "property", "piece"];

#[inline]
pub(crate) fn is_identifier_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// 1-based line of `offset` in `text`.
pub(crate) fn line_number(text: &str, offset: usize) -> usize {
    let end = offset.min(text.len());
    1 + text.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count()
}

/// A `@keyword` occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Directive {
    /// Offset of the `@`.
    pub start: usize,
    /// Index of the matched keyword in the list that was searched.
    pub keyword: usize,
    /// Offset just past the keyword.
    pub end: usize,
}

/// Terminators match as a literal prefix: `@end0` is `@end` followed by `0`.
const TERMINATOR_KEYWORDS: [&str; 2] = ["end", "else"];

/// Finds the next `@name` at or after `from` whose name is exactly one of
/// `keywords`. `@propertyX` does not match `property`; the block terminators
/// `@end` and `@else` also match when an identifier follows them directly.
pub(crate) fn find_directive(text: &str, from: usize, keywords: &[&str]) -> Option<Directive> {
    let bytes = text.as_bytes();
    let mut pos = from;
    while pos < bytes.len() {
        let at = pos + bytes[pos..].iter().position(|&b| b == b'@')?;
        let name_start = at + 1;
        let name_len = bytes[name_start..]
            .iter()
            .take_while(|&&b| is_identifier_byte(b))
            .count();
        let name = &text[name_start..name_start + name_len];
        if let Some(keyword) = keywords.iter().position(|&k| k == name) {
            return Some(Directive {
                start: at,
                keyword,
                end: name_start + name_len,
            });
        }
        if let Some(keyword) = keywords
            .iter()
            .position(|&k| TERMINATOR_KEYWORDS.contains(&k) && name.starts_with(k))
        {
            return Some(Directive {
                start: at,
                keyword,
                end: name_start + keywords[keyword].len(),
            });
        }
        pos = name_start;
    }
    None
}

#[inline]
pub(crate) fn contains_directive(text: &str, keywords: &[&str]) -> bool {
    find_directive(text, 0, keywords).is_some()
}

/// Offset of the `)` matching the `(` at `open`.
pub(crate) fn find_closing_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, &b) in text.as_bytes()[open..].iter().enumerate() {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// The parenthesized span following a directive keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParenSpan {
    /// Text between the parentheses.
    pub inner: Range<usize>,
    /// Offset just past the closing `)`.
    pub end: usize,
}

/// Locates `( ... )` after `from`, allowing leading blanks.
///
/// Failure here is structural: without the closing parenthesis the rest of
/// the text cannot be interpreted.
pub(crate) fn paren_span(
    text: &str,
    from: usize,
    directive: &'static str,
) -> Result<ParenSpan, SyntaxErrorKind> {
    let bytes = text.as_bytes();
    let open = from
        + bytes[from..]
            .iter()
            .take_while(|&&b| b == b' ' || b == b'\t')
            .count();
    if bytes.get(open) != Some(&b'(') {
        return Err(SyntaxErrorKind::MalformedArguments {
            directive,
            reason: "expected '('".to_owned(),
        });
    }
    let close =
        find_closing_paren(text, open).ok_or(SyntaxErrorKind::UnmatchedParenthesis(directive))?;
    Ok(ParenSpan {
        inner: open + 1..close,
        end: close + 1,
    })
}

/// Splits a comma separated argument list; blanks around arguments are ignored.
pub(crate) fn split_arguments<'a>(
    inner: &'a str,
    directive: &'static str,
) -> Result<SmallVec<[&'a str; 3]>, SyntaxErrorKind> {
    let mut values = SmallVec::new();
    for raw in inner.split(',') {
        let arg = raw.trim();
        if arg.is_empty() {
            return Err(SyntaxErrorKind::MalformedArguments {
                directive,
                reason: "empty argument".to_owned(),
            });
        }
        if arg
            .bytes()
            .any(|b| matches!(b, b'(' | b')' | b'@' | b'&' | b'|') || b.is_ascii_whitespace())
        {
            return Err(SyntaxErrorKind::MalformedArguments {
                directive,
                reason: format!("',' or ')' expected in '{arg}'"),
            });
        }
        values.push(arg);
    }
    Ok(values)
}

/// A block body delimited by `@end`, optionally split by `@else`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Block {
    pub body: Range<usize>,
    pub else_body: Option<Range<usize>>,
    /// Offset past `@end` and the single line break or blank that follows it.
    pub end: usize,
}

/// Finds the `@end` closing a block whose body starts at `from`.
///
/// Nested `@foreach`/`@property`/`@piece` blocks are skipped. On failure the
/// error carries the offset it should be reported at.
pub(crate) fn find_block_end(
    text: &str,
    from: usize,
    allow_else: bool,
    directive: &'static str,
) -> Result<Block, (SyntaxErrorKind, usize)> {
    let bytes = text.as_bytes();
    let mut nesting = 0usize;
    let mut else_marker: Option<Range<usize>> = None;
    let mut pos = from;

    loop {
        let Some(found) = find_directive(text, pos, &BLOCK_KEYWORDS) else {
            return Err((SyntaxErrorKind::UnterminatedBlock(directive), from));
        };
        match (BLOCK_KEYWORDS[found.keyword], nesting) {
            ("end", 0) => {
                let body_end = else_marker.as_ref().map_or(found.start, |m| m.start);
                let else_body = else_marker.map(|m| m.end..found.start);
                let mut end = found.end;
                if bytes.get(end) == Some(&b'\r') && bytes.get(end + 1) == Some(&b'\n') {
                    end += 2;
                } else if bytes.get(end).is_some_and(u8::is_ascii_whitespace) {
                    end += 1;
                }
                return Ok(Block {
                    body: from..body_end,
                    else_body,
                    end,
                });
            }
            ("end", _) => nesting -= 1,
            ("else", 0) => {
                if !allow_else || else_marker.is_some() {
                    return Err((SyntaxErrorKind::UnexpectedElse, found.start));
                }
                else_marker = Some(found.start..found.end);
            }
            ("else", _) => {}
            _ => nesting += 1,
        }
        pos = found.end;
    }
}

/// Parses an integer literal, `None` when `arg` is a property name.
#[inline]
pub(crate) fn parse_literal(arg: &str) -> Option<i32> {
    arg.parse::<i32>().ok()
}
