#![forbid(unsafe_code)]

//! Styling attributes for fview with nested-override merge semantics.
//!
//! This crate provides:
//! - [`AttributeKey`] / [`AttributeSet`]: the seven-attribute scope and its merge rule
//! - [`StyledText`]: text carrying canonical attribute runs
//! - [`markup`]: name-keyed attribute markup (parse and serialize)
//! - [`Color`]: values for the two color attributes

pub mod attributes;
pub mod color;
pub mod markup;
pub mod styled_text;

pub use attributes::{AttributeError, AttributeKey, AttributeKind, AttributeSet, AttributeValue};
pub use color::{Ansi16Color, Color, ColorParseError, Rgb};
pub use markup::{MarkupError, parse_markup, to_markup};
pub use styled_text::{Run, StyleError, StyledText};
