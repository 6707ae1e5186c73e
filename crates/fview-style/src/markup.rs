#![forbid(unsafe_code)]

//! Attribute markup keyed by declared attribute names.
//!
//! # Syntax
//!
//! - `[Bold]text[/Bold]` - flag attribute set to `true`
//! - `[Bold=false]text[/Bold]` - flag attribute set explicitly
//! - `[ForegroundColor=red]text[/ForegroundColor]` - color attribute
//! - `[BackgroundColor=#102030]`, `[ForegroundColor=ansi(208)]` - other color forms
//!
//! Tag names are the declared [`AttributeKey`] names and match exactly.
//! Nested tags merge with the same rule as [`AttributeSet::merge`]: the
//! innermost assignment wins per key and outer keys persist.
//!
//! ## Escaping
//! - `\[` - Literal `[`
//! - `\]` - Literal `]`
//! - `\\` - Literal `\`
//!
//! [`to_markup`] produces text that [`parse_markup`] turns back into an equal
//! [`StyledText`].
//!
//! # Example
//! ```
//! use fview_style::markup::{parse_markup, to_markup};
//! use fview_style::{AttributeSet, StyledText};
//!
//! let text = parse_markup("[Bold]hello [Bold=false][Underline]world[/Underline][/Bold][/Bold]").unwrap();
//! assert_eq!(text.plain(), "hello world");
//! assert_eq!(text.attributes_at(0), AttributeSet::new().bold(true));
//! assert_eq!(text.attributes_at(6), AttributeSet::new().bold(false).underline(true));
//!
//! assert_eq!(parse_markup(&to_markup(&text)).unwrap(), text);
//! ```

use std::fmt;

use crate::attributes::{AttributeKey, AttributeKind, AttributeSet, AttributeValue};
use crate::color::Color;
use crate::styled_text::StyledText;

const MAX_DEPTH: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupError {
    /// A closing tag doesn't match any open tag.
    UnmatchedTag {
        expected: Option<String>,
        found: String,
        position: usize,
    },
    /// An opening tag was never closed.
    UnclosedTag { tag: String, position: usize },
    /// The tag name is not a declared attribute name.
    UnknownAttribute { name: String, position: usize },
    /// The value does not parse as the attribute's value type.
    InvalidValue {
        name: String,
        value: String,
        position: usize,
    },
    /// Empty tag name.
    EmptyTag { position: usize },
    /// Nesting depth limit exceeded.
    DepthLimitExceeded { position: usize },
}

impl fmt::Display for MarkupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnmatchedTag {
                expected,
                found,
                position,
            } => {
                if let Some(exp) = expected {
                    write!(
                        f,
                        "unmatched tag at position {position}: expected [/{exp}], found [/{found}]"
                    )
                } else {
                    write!(
                        f,
                        "unexpected closing tag [/{found}] at position {position} with no matching opening tag"
                    )
                }
            }
            Self::UnclosedTag { tag, position } => {
                write!(f, "unclosed tag [{tag}] opened at position {position}")
            }
            Self::UnknownAttribute { name, position } => {
                write!(f, "unknown attribute '{name}' at position {position}")
            }
            Self::InvalidValue {
                name,
                value,
                position,
            } => write!(
                f,
                "invalid value '{value}' for attribute {name} at position {position}"
            ),
            Self::EmptyTag { position } => write!(f, "empty tag at position {position}"),
            Self::DepthLimitExceeded { position } => {
                write!(f, "nesting depth limit exceeded at position {position}")
            }
        }
    }
}

impl std::error::Error for MarkupError {}

/// An open tag on the parser stack.
#[derive(Debug, Clone)]
struct OpenTag {
    key: AttributeKey,
    position: usize,
    delta: AttributeSet,
}

/// Parse attribute markup into [`StyledText`].
///
/// # Errors
///
/// See [`MarkupError`].
pub fn parse_markup(input: &str) -> Result<StyledText, MarkupError> {
    let mut stack: Vec<OpenTag> = Vec::new();
    let mut current = AttributeSet::new();
    let mut styled = StyledText::default();
    let mut pending = String::new();

    let mut chars = input.char_indices().peekable();
    while let Some((pos, ch)) = chars.next() {
        match ch {
            '\\' => {
                if let Some(&(_, next_ch)) = chars.peek()
                    && matches!(next_ch, '[' | ']' | '\\')
                {
                    chars.next();
                    pending.push(next_ch);
                    continue;
                }
                pending.push(ch);
            }
            '[' => {
                let mut tag = String::new();
                let mut closed = false;
                for (_, tag_ch) in chars.by_ref() {
                    if tag_ch == ']' {
                        closed = true;
                        break;
                    }
                    tag.push(tag_ch);
                    if tag_ch == '\n' {
                        break;
                    }
                }
                if !closed {
                    // Not a tag; keep it literal.
                    pending.push('[');
                    pending.push_str(&tag);
                    continue;
                }

                styled.push_str(&std::mem::take(&mut pending), current);

                let tag = tag.trim();
                if let Some(name) = tag.strip_prefix('/') {
                    close_tag(&mut stack, name.trim(), pos)?;
                } else {
                    if stack.len() >= MAX_DEPTH {
                        return Err(MarkupError::DepthLimitExceeded { position: pos });
                    }
                    stack.push(open_tag(tag, pos)?);
                }
                current = stack
                    .iter()
                    .fold(AttributeSet::new(), |acc, open| acc.merge(&open.delta));
            }
            _ => pending.push(ch),
        }
    }
    styled.push_str(&pending, current);

    if let Some(open) = stack.first() {
        return Err(MarkupError::UnclosedTag {
            tag: open.key.name().to_string(),
            position: open.position,
        });
    }
    Ok(styled)
}

fn open_tag(tag: &str, position: usize) -> Result<OpenTag, MarkupError> {
    let (name, value) = match tag.split_once('=') {
        Some((name, value)) => (name.trim(), Some(value.trim())),
        None => (tag, None),
    };
    if name.is_empty() {
        return Err(MarkupError::EmptyTag { position });
    }
    let key = AttributeKey::from_name(name).ok_or_else(|| MarkupError::UnknownAttribute {
        name: name.to_string(),
        position,
    })?;
    let invalid = || MarkupError::InvalidValue {
        name: name.to_string(),
        value: value.unwrap_or_default().to_string(),
        position,
    };

    let parsed = match (key.kind(), value) {
        (AttributeKind::Flag, None) => AttributeValue::Flag(true),
        (AttributeKind::Flag, Some(raw)) => match raw {
            "true" => AttributeValue::Flag(true),
            "false" => AttributeValue::Flag(false),
            _ => return Err(invalid()),
        },
        (AttributeKind::Color, Some(raw)) => {
            AttributeValue::Color(raw.parse::<Color>().map_err(|_| invalid())?)
        }
        (AttributeKind::Color, None) => return Err(invalid()),
    };

    let mut delta = AttributeSet::new();
    delta.set(key, parsed).map_err(|_| invalid())?;
    Ok(OpenTag {
        key,
        position,
        delta,
    })
}

fn close_tag(stack: &mut Vec<OpenTag>, name: &str, position: usize) -> Result<(), MarkupError> {
    if name.is_empty() {
        return Err(MarkupError::EmptyTag { position });
    }
    let idx = stack
        .iter()
        .rposition(|open| open.key.name() == name)
        .ok_or_else(|| MarkupError::UnmatchedTag {
            expected: stack.last().map(|open| open.key.name().to_string()),
            found: name.to_string(),
            position,
        })?;
    stack.remove(idx);
    Ok(())
}

/// Serialize `text` into markup that [`parse_markup`] reads back unchanged.
#[must_use]
pub fn to_markup(text: &StyledText) -> String {
    let mut out = String::with_capacity(text.len() * 2);
    for (segment, attributes) in text.segments() {
        let assigned: Vec<_> = attributes.iter().collect();
        for (key, value) in &assigned {
            match value {
                AttributeValue::Flag(true) => out.push_str(&format!("[{key}]")),
                value => out.push_str(&format!("[{key}={value}]")),
            }
        }
        escape_into(segment, &mut out);
        for (key, _) in assigned.iter().rev() {
            out.push_str(&format!("[/{key}]"));
        }
    }
    out
}

fn escape_into(segment: &str, out: &mut String) {
    for ch in segment.chars() {
        if matches!(ch, '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passes_through() {
        let text = parse_markup("just text").unwrap();
        assert_eq!(text, StyledText::new("just text"));
    }

    #[test]
    fn flag_and_color_tags() {
        let text = parse_markup("[Bold]a[/Bold][ForegroundColor=#ff0000]b[/ForegroundColor]").unwrap();
        assert_eq!(text.plain(), "ab");
        assert_eq!(text.attributes_at(0), AttributeSet::new().bold(true));
        assert_eq!(
            text.attributes_at(1),
            AttributeSet::new().foreground(Color::rgb(255, 0, 0))
        );
    }

    #[test]
    fn nesting_follows_merge_rule() {
        let text = parse_markup("[Bold]x[Bold=false][Underline]y[/Underline][/Bold]z[/Bold]").unwrap();
        assert_eq!(text.attributes_at(0), AttributeSet::new().bold(true));
        assert_eq!(
            text.attributes_at(1),
            AttributeSet::new().bold(false).underline(true)
        );
        assert_eq!(text.attributes_at(2), AttributeSet::new().bold(true));
    }

    #[test]
    fn interleaved_close_replays_remaining_tags() {
        let text = parse_markup("[Bold][Italic]a[/Bold]b[/Italic]").unwrap();
        assert_eq!(text.attributes_at(0), AttributeSet::new().bold(true).italic(true));
        assert_eq!(text.attributes_at(1), AttributeSet::new().italic(true));
    }

    #[test]
    fn escapes() {
        let text = parse_markup(r"\[Bold\] \\ x]").unwrap();
        assert_eq!(text.plain(), r"[Bold] \ x]");
        assert!(text.runs()[0].attributes.is_empty());
    }

    #[test]
    fn unterminated_bracket_is_literal() {
        let text = parse_markup("a [Bold b").unwrap();
        assert_eq!(text.plain(), "a [Bold b");
        let text = parse_markup("a [b\nc]").unwrap();
        assert_eq!(text.plain(), "a [b\nc]");
    }

    #[test]
    fn errors() {
        assert_eq!(
            parse_markup("[bold]x[/bold]").unwrap_err(),
            MarkupError::UnknownAttribute {
                name: "bold".into(),
                position: 0
            }
        );
        assert_eq!(
            parse_markup("[Bold]x").unwrap_err(),
            MarkupError::UnclosedTag {
                tag: "Bold".into(),
                position: 0
            }
        );
        assert_eq!(
            parse_markup("x[/Bold]").unwrap_err(),
            MarkupError::UnmatchedTag {
                expected: None,
                found: "Bold".into(),
                position: 1
            }
        );
        assert!(matches!(
            parse_markup("[ForegroundColor]x[/ForegroundColor]"),
            Err(MarkupError::InvalidValue { .. })
        ));
        assert!(matches!(
            parse_markup("[Bold=yes]x[/Bold]"),
            Err(MarkupError::InvalidValue { .. })
        ));
        assert_eq!(
            parse_markup("[]").unwrap_err(),
            MarkupError::EmptyTag { position: 0 }
        );
    }

    #[test]
    fn depth_limit() {
        let input = "[Bold]".repeat(MAX_DEPTH + 1);
        assert!(matches!(
            parse_markup(&input),
            Err(MarkupError::DepthLimitExceeded { .. })
        ));
    }

    #[test]
    fn serializes_every_attribute_by_name() {
        let attrs = AttributeSet::new()
            .background(Color::Ansi256(17))
            .foreground(Color::RED)
            .bold(true)
            .italic(false)
            .strikethrough(true)
            .underline(true)
            .inverted(true);
        let text = StyledText::from_segments([("x", attrs)]);
        let markup = to_markup(&text);
        assert_eq!(
            markup,
            "[BackgroundColor=ansi(17)][ForegroundColor=red][Bold][Italic=false][Strikethrough][Underline][Inverted]x[/Inverted][/Underline][/Strikethrough][/Italic][/Bold][/ForegroundColor][/BackgroundColor]"
        );
        assert_eq!(parse_markup(&markup).unwrap(), text);
    }

    #[test]
    fn serialization_escapes_brackets() {
        let text = StyledText::from_segments([
            ("[a]", AttributeSet::new().bold(true)),
            (r"\b", AttributeSet::new()),
        ]);
        let markup = to_markup(&text);
        assert_eq!(markup, r"[Bold]\[a\][/Bold]\\b");
        assert_eq!(parse_markup(&markup).unwrap(), text);
    }
}
