#![forbid(unsafe_code)]

//! The attribute scope: the closed set of styling attributes text can carry.
//!
//! There are exactly seven keys. Two carry a [`Color`], five carry a flag:
//!
//! | Key | Name | Value |
//! |-----|------|-------|
//! | [`AttributeKey::BackgroundColor`] | `BackgroundColor` | color |
//! | [`AttributeKey::ForegroundColor`] | `ForegroundColor` | color |
//! | [`AttributeKey::Bold`] | `Bold` | flag |
//! | [`AttributeKey::Italic`] | `Italic` | flag |
//! | [`AttributeKey::Strikethrough`] | `Strikethrough` | flag |
//! | [`AttributeKey::Underline`] | `Underline` | flag |
//! | [`AttributeKey::Inverted`] | `Inverted` | flag |
//!
//! Keys are identified by their declared name; markup and serialization are
//! keyed by it.
//!
//! # Merge
//!
//! [`AttributeSet::merge`] combines an outer set with an inner one. Per key
//! the inner assignment wins, keys the inner set leaves unset keep the outer
//! value, and keys unset in both stay unset (the renderer applies no
//! treatment). Merge is associative, and the empty set is its identity on
//! both sides.

use std::fmt;

use crate::color::Color;

/// One of the seven styling attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AttributeKey {
    BackgroundColor,
    ForegroundColor,
    Bold,
    Italic,
    Strikethrough,
    Underline,
    Inverted,
}

/// The value type an [`AttributeKey`] accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    Color,
    Flag,
}

impl AttributeKey {
    /// Every key, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::BackgroundColor,
        Self::ForegroundColor,
        Self::Bold,
        Self::Italic,
        Self::Strikethrough,
        Self::Underline,
        Self::Inverted,
    ];

    /// Declared external name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::BackgroundColor => "BackgroundColor",
            Self::ForegroundColor => "ForegroundColor",
            Self::Bold => "Bold",
            Self::Italic => "Italic",
            Self::Strikethrough => "Strikethrough",
            Self::Underline => "Underline",
            Self::Inverted => "Inverted",
        }
    }

    /// Resolve a declared name. Matching is exact.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.name() == name)
    }

    #[must_use]
    pub const fn kind(self) -> AttributeKind {
        match self {
            Self::BackgroundColor | Self::ForegroundColor => AttributeKind::Color,
            Self::Bold | Self::Italic | Self::Strikethrough | Self::Underline | Self::Inverted => {
                AttributeKind::Flag
            }
        }
    }
}

impl fmt::Display for AttributeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A value stored under an [`AttributeKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeValue {
    Color(Color),
    Flag(bool),
}

impl AttributeValue {
    #[must_use]
    pub const fn kind(self) -> AttributeKind {
        match self {
            Self::Color(_) => AttributeKind::Color,
            Self::Flag(_) => AttributeKind::Flag,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Color(color) => color.fmt(f),
            Self::Flag(flag) => flag.fmt(f),
        }
    }
}

impl From<Color> for AttributeValue {
    fn from(color: Color) -> Self {
        Self::Color(color)
    }
}

impl From<bool> for AttributeValue {
    fn from(flag: bool) -> Self {
        Self::Flag(flag)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttributeError {
    /// The value's type does not match the key's declared value type.
    #[error("attribute {key} expects a {expected:?} value, got {value}")]
    KindMismatch {
        key: AttributeKey,
        expected: AttributeKind,
        value: AttributeValue,
    },
}

/// A partial assignment of the seven attributes.
///
/// ```
/// use fview_style::{AttributeKey, AttributeSet, AttributeValue, Color};
///
/// let outer = AttributeSet::new().bold(true).foreground(Color::RED);
/// let inner = AttributeSet::new().bold(false).underline(true);
/// let merged = outer.merge(&inner);
///
/// assert_eq!(merged.get(AttributeKey::Bold), Some(AttributeValue::Flag(false)));
/// assert_eq!(merged.get(AttributeKey::Underline), Some(AttributeValue::Flag(true)));
/// assert_eq!(merged.get(AttributeKey::ForegroundColor), Some(AttributeValue::Color(Color::RED)));
/// assert_eq!(merged.get(AttributeKey::Italic), None);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttributeSet {
    #[cfg_attr(
        feature = "serde",
        serde(rename = "BackgroundColor", default, skip_serializing_if = "Option::is_none")
    )]
    background_color: Option<Color>,
    #[cfg_attr(
        feature = "serde",
        serde(rename = "ForegroundColor", default, skip_serializing_if = "Option::is_none")
    )]
    foreground_color: Option<Color>,
    #[cfg_attr(
        feature = "serde",
        serde(rename = "Bold", default, skip_serializing_if = "Option::is_none")
    )]
    bold: Option<bool>,
    #[cfg_attr(
        feature = "serde",
        serde(rename = "Italic", default, skip_serializing_if = "Option::is_none")
    )]
    italic: Option<bool>,
    #[cfg_attr(
        feature = "serde",
        serde(rename = "Strikethrough", default, skip_serializing_if = "Option::is_none")
    )]
    strikethrough: Option<bool>,
    #[cfg_attr(
        feature = "serde",
        serde(rename = "Underline", default, skip_serializing_if = "Option::is_none")
    )]
    underline: Option<bool>,
    #[cfg_attr(
        feature = "serde",
        serde(rename = "Inverted", default, skip_serializing_if = "Option::is_none")
    )]
    inverted: Option<bool>,
}

impl AttributeSet {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            background_color: None,
            foreground_color: None,
            bold: None,
            italic: None,
            strikethrough: None,
            underline: None,
            inverted: None,
        }
    }

    #[must_use]
    pub const fn background(mut self, color: Color) -> Self {
        self.background_color = Some(color);
        self
    }

    #[must_use]
    pub const fn foreground(mut self, color: Color) -> Self {
        self.foreground_color = Some(color);
        self
    }

    #[must_use]
    pub const fn bold(mut self, on: bool) -> Self {
        self.bold = Some(on);
        self
    }

    #[must_use]
    pub const fn italic(mut self, on: bool) -> Self {
        self.italic = Some(on);
        self
    }

    #[must_use]
    pub const fn strikethrough(mut self, on: bool) -> Self {
        self.strikethrough = Some(on);
        self
    }

    #[must_use]
    pub const fn underline(mut self, on: bool) -> Self {
        self.underline = Some(on);
        self
    }

    #[must_use]
    pub const fn inverted(mut self, on: bool) -> Self {
        self.inverted = Some(on);
        self
    }

    /// True when no key is assigned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        AttributeKey::ALL.into_iter().all(|key| self.get(key).is_none())
    }

    #[must_use]
    pub const fn get(&self, key: AttributeKey) -> Option<AttributeValue> {
        match key {
            AttributeKey::BackgroundColor => match self.background_color {
                Some(color) => Some(AttributeValue::Color(color)),
                None => None,
            },
            AttributeKey::ForegroundColor => match self.foreground_color {
                Some(color) => Some(AttributeValue::Color(color)),
                None => None,
            },
            _ => match *self.flag_slot(key) {
                Some(flag) => Some(AttributeValue::Flag(flag)),
                None => None,
            },
        }
    }

    /// Color assigned to a color key; `None` for flag keys or unset colors.
    #[must_use]
    pub const fn color(&self, key: AttributeKey) -> Option<Color> {
        match key {
            AttributeKey::BackgroundColor => self.background_color,
            AttributeKey::ForegroundColor => self.foreground_color,
            _ => None,
        }
    }

    /// Flag assigned to a flag key; `None` for color keys or unset flags.
    #[must_use]
    pub const fn flag(&self, key: AttributeKey) -> Option<bool> {
        match key.kind() {
            AttributeKind::Flag => *self.flag_slot(key),
            AttributeKind::Color => None,
        }
    }

    /// Assign `value` to `key`.
    ///
    /// # Errors
    ///
    /// [`AttributeError::KindMismatch`] if the value type does not fit the key.
    pub fn set(
        &mut self,
        key: AttributeKey,
        value: impl Into<AttributeValue>,
    ) -> Result<(), AttributeError> {
        let value = value.into();
        match (key, value) {
            (AttributeKey::BackgroundColor, AttributeValue::Color(color)) => {
                self.background_color = Some(color);
            }
            (AttributeKey::ForegroundColor, AttributeValue::Color(color)) => {
                self.foreground_color = Some(color);
            }
            (_, AttributeValue::Flag(flag)) if key.kind() == AttributeKind::Flag => {
                *self.flag_slot_mut(key) = Some(flag);
            }
            _ => {
                return Err(AttributeError::KindMismatch {
                    key,
                    expected: key.kind(),
                    value,
                });
            }
        }
        Ok(())
    }

    /// Unassign `key`, returning its previous value.
    pub fn remove(&mut self, key: AttributeKey) -> Option<AttributeValue> {
        let previous = self.get(key);
        match key {
            AttributeKey::BackgroundColor => self.background_color = None,
            AttributeKey::ForegroundColor => self.foreground_color = None,
            _ => *self.flag_slot_mut(key) = None,
        }
        previous
    }

    /// Combine with a more specific (inner) set. Inner wins per key.
    #[must_use]
    pub const fn merge(&self, inner: &Self) -> Self {
        Self {
            background_color: or(inner.background_color, self.background_color),
            foreground_color: or(inner.foreground_color, self.foreground_color),
            bold: or(inner.bold, self.bold),
            italic: or(inner.italic, self.italic),
            strikethrough: or(inner.strikethrough, self.strikethrough),
            underline: or(inner.underline, self.underline),
            inverted: or(inner.inverted, self.inverted),
        }
    }

    /// Assigned keys and values, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (AttributeKey, AttributeValue)> + '_ {
        AttributeKey::ALL
            .into_iter()
            .filter_map(|key| self.get(key).map(|value| (key, value)))
    }

    // Color keys map to `inverted`; callers only pass flag keys.
    const fn flag_slot(&self, key: AttributeKey) -> &Option<bool> {
        match key {
            AttributeKey::Bold => &self.bold,
            AttributeKey::Italic => &self.italic,
            AttributeKey::Strikethrough => &self.strikethrough,
            AttributeKey::Underline => &self.underline,
            _ => &self.inverted,
        }
    }

    fn flag_slot_mut(&mut self, key: AttributeKey) -> &mut Option<bool> {
        match key {
            AttributeKey::Bold => &mut self.bold,
            AttributeKey::Italic => &mut self.italic,
            AttributeKey::Strikethrough => &mut self.strikethrough,
            AttributeKey::Underline => &mut self.underline,
            _ => &mut self.inverted,
        }
    }
}

const fn or<T: Copy>(preferred: Option<T>, fallback: Option<T>) -> Option<T> {
    match preferred {
        Some(value) => Some(value),
        None => fallback,
    }
}

impl FromIterator<(AttributeKey, AttributeValue)> for AttributeSet {
    /// Later pairs win. Pairs whose value does not fit the key are skipped.
    fn from_iter<I: IntoIterator<Item = (AttributeKey, AttributeValue)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (key, value) in iter {
            let _ = set.set(key, value);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for key in AttributeKey::ALL {
            assert_eq!(AttributeKey::from_name(key.name()), Some(key));
        }
        assert_eq!(AttributeKey::from_name("bold"), None);
        assert_eq!(AttributeKey::from_name("Blink"), None);
    }

    #[test]
    fn kinds() {
        assert_eq!(AttributeKey::BackgroundColor.kind(), AttributeKind::Color);
        assert_eq!(AttributeKey::ForegroundColor.kind(), AttributeKind::Color);
        let flags = AttributeKey::ALL
            .into_iter()
            .filter(|k| k.kind() == AttributeKind::Flag)
            .count();
        assert_eq!(flags, 5);
    }

    #[test]
    fn set_checks_value_kind() {
        let mut set = AttributeSet::new();
        set.set(AttributeKey::Bold, true).unwrap();
        set.set(AttributeKey::ForegroundColor, Color::CYAN).unwrap();

        let err = set.set(AttributeKey::Italic, Color::RED).unwrap_err();
        assert_eq!(
            err,
            AttributeError::KindMismatch {
                key: AttributeKey::Italic,
                expected: AttributeKind::Flag,
                value: AttributeValue::Color(Color::RED),
            }
        );
        assert!(set.set(AttributeKey::BackgroundColor, false).is_err());
        assert_eq!(set.flag(AttributeKey::Italic), None);
        assert_eq!(set.color(AttributeKey::BackgroundColor), None);
    }

    #[test]
    fn typed_accessors_ignore_other_kind() {
        let set = AttributeSet::new().inverted(true).background(Color::BLUE);
        assert_eq!(set.flag(AttributeKey::Inverted), Some(true));
        assert_eq!(set.flag(AttributeKey::BackgroundColor), None);
        assert_eq!(set.color(AttributeKey::Inverted), None);
        assert_eq!(set.color(AttributeKey::BackgroundColor), Some(Color::BLUE));
    }

    #[test]
    fn remove_returns_previous() {
        let mut set = AttributeSet::new().underline(true);
        assert_eq!(
            set.remove(AttributeKey::Underline),
            Some(AttributeValue::Flag(true))
        );
        assert_eq!(set.remove(AttributeKey::Underline), None);
        assert!(set.is_empty());
    }

    #[test]
    fn merge_inner_wins_per_key() {
        let outer = AttributeSet::new().bold(true);
        let inner = AttributeSet::new().bold(false).underline(true);
        let merged = outer.merge(&inner);
        assert_eq!(merged, AttributeSet::new().bold(false).underline(true));
    }

    #[test]
    fn merge_keeps_outer_for_unset_inner_keys() {
        let outer = AttributeSet::new()
            .foreground(Color::RED)
            .italic(true)
            .strikethrough(false);
        let inner = AttributeSet::new().italic(false);
        let merged = outer.merge(&inner);
        assert_eq!(merged.color(AttributeKey::ForegroundColor), Some(Color::RED));
        assert_eq!(merged.flag(AttributeKey::Italic), Some(false));
        assert_eq!(merged.flag(AttributeKey::Strikethrough), Some(false));
        assert_eq!(merged.get(AttributeKey::Inverted), None);
    }

    #[test]
    fn empty_set_is_merge_identity() {
        let set = AttributeSet::new().bold(true).background(Color::Ansi256(17));
        assert_eq!(set.merge(&AttributeSet::new()), set);
        assert_eq!(AttributeSet::new().merge(&set), set);
    }

    #[test]
    fn iter_is_declaration_ordered() {
        let set = AttributeSet::new()
            .inverted(true)
            .bold(true)
            .background(Color::BLACK);
        let keys: Vec<_> = set.iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec![
                AttributeKey::BackgroundColor,
                AttributeKey::Bold,
                AttributeKey::Inverted
            ]
        );
    }

    #[test]
    fn from_iter_later_pairs_win() {
        let set: AttributeSet = [
            (AttributeKey::Bold, AttributeValue::Flag(true)),
            (AttributeKey::Bold, AttributeValue::Flag(false)),
            (AttributeKey::Italic, AttributeValue::Color(Color::RED)),
        ]
        .into_iter()
        .collect();
        assert_eq!(set, AttributeSet::new().bold(false));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serializes_by_declared_name() {
        let set = AttributeSet::new().bold(true).foreground(Color::RED);
        let json = serde_json::to_string(&set).unwrap();
        assert!(json.contains("\"Bold\":true"));
        assert!(json.contains("\"ForegroundColor\""));
        assert!(!json.contains("Italic"));
        let back: AttributeSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }
}
