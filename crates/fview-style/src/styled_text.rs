#![forbid(unsafe_code)]

//! Text with attribute runs.
//!
//! [`StyledText`] keeps its runs contiguous and canonical:
//!
//! 1. Runs cover `0..text.len()` exactly, in order, without gaps.
//! 2. No run is empty.
//! 3. Adjacent runs never carry equal attribute sets.
//!
//! Because of (3), two `StyledText` values that style every byte the same way
//! compare equal regardless of how they were built.

use std::fmt;
use std::ops::Range;

use crate::attributes::AttributeSet;

/// A byte range of the text and the attributes in effect over it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub range: Range<usize>,
    pub attributes: AttributeSet,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleError {
    /// The range is reversed, out of bounds, or splits a UTF-8 sequence.
    InvalidRange { range: Range<usize>, len: usize },
}

impl fmt::Display for StyleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRange { range, len } => write!(
                f,
                "invalid range {}..{} for text of {} bytes",
                range.start, range.end, len
            ),
        }
    }
}

impl std::error::Error for StyleError {}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyledText {
    text: String,
    runs: Vec<Run>,
}

impl StyledText {
    /// Unstyled text.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let runs = if text.is_empty() {
            Vec::new()
        } else {
            vec![Run {
                range: 0..text.len(),
                attributes: AttributeSet::new(),
            }]
        };
        Self { text, runs }
    }

    /// Concatenate styled segments.
    pub fn from_segments<S: AsRef<str>>(
        segments: impl IntoIterator<Item = (S, AttributeSet)>,
    ) -> Self {
        let mut styled = Self::default();
        for (segment, attributes) in segments {
            styled.push_str(segment.as_ref(), attributes);
        }
        styled
    }

    /// Append `segment` carrying exactly `attributes`.
    pub fn push_str(&mut self, segment: &str, attributes: AttributeSet) {
        if segment.is_empty() {
            return;
        }
        let start = self.text.len();
        self.text.push_str(segment);
        let end = self.text.len();
        match self.runs.last_mut() {
            Some(last) if last.attributes == attributes => last.range.end = end,
            _ => self.runs.push(Run {
                range: start..end,
                attributes,
            }),
        }
    }

    #[must_use]
    pub fn plain(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    #[must_use]
    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    /// Iterate `(text, attributes)` per run.
    pub fn segments(&self) -> impl Iterator<Item = (&str, &AttributeSet)> + '_ {
        self.runs
            .iter()
            .map(|run| (&self.text[run.range.clone()], &run.attributes))
    }

    /// Attributes in effect at byte `offset`; empty when out of bounds.
    #[must_use]
    pub fn attributes_at(&self, offset: usize) -> AttributeSet {
        let idx = self.runs.partition_point(|run| run.range.end <= offset);
        self.runs
            .get(idx)
            .filter(|run| run.range.contains(&offset))
            .map(|run| run.attributes)
            .unwrap_or_default()
    }

    /// Merge `attributes` into every byte of `range`.
    ///
    /// The applied set is the inner (more specific) one: per key it overrides
    /// what the range already carries, and keys it leaves unset are kept.
    ///
    /// # Errors
    ///
    /// [`StyleError::InvalidRange`] if `range` is reversed, exceeds the text,
    /// or does not fall on `char` boundaries.
    pub fn apply(
        &mut self,
        attributes: &AttributeSet,
        range: Range<usize>,
    ) -> Result<(), StyleError> {
        self.check_range(&range)?;
        if range.is_empty() || attributes.is_empty() {
            return Ok(());
        }

        self.split_at(range.start);
        self.split_at(range.end);
        for run in &mut self.runs {
            if run.range.start >= range.start && run.range.end <= range.end {
                run.attributes = run.attributes.merge(attributes);
            }
        }
        self.coalesce();
        Ok(())
    }

    /// Builder form of [`apply`](Self::apply).
    ///
    /// # Errors
    ///
    /// Same as [`apply`](Self::apply).
    pub fn with(mut self, attributes: &AttributeSet, range: Range<usize>) -> Result<Self, StyleError> {
        self.apply(attributes, range)?;
        Ok(self)
    }

    /// Merge `attributes` into the whole text.
    pub fn apply_all(&mut self, attributes: &AttributeSet) {
        for run in &mut self.runs {
            run.attributes = run.attributes.merge(attributes);
        }
        self.coalesce();
    }

    fn check_range(&self, range: &Range<usize>) -> Result<(), StyleError> {
        let valid = range.start <= range.end
            && range.end <= self.text.len()
            && self.text.is_char_boundary(range.start)
            && self.text.is_char_boundary(range.end);
        if valid {
            Ok(())
        } else {
            Err(StyleError::InvalidRange {
                range: range.clone(),
                len: self.text.len(),
            })
        }
    }

    fn split_at(&mut self, offset: usize) {
        let idx = self.runs.partition_point(|run| run.range.end <= offset);
        let Some(run) = self.runs.get_mut(idx) else {
            return;
        };
        if run.range.start >= offset {
            return;
        }
        let tail = Run {
            range: offset..run.range.end,
            attributes: run.attributes,
        };
        run.range.end = offset;
        self.runs.insert(idx + 1, tail);
    }

    fn coalesce(&mut self) {
        let mut merged: Vec<Run> = Vec::with_capacity(self.runs.len());
        for run in self.runs.drain(..) {
            match merged.last_mut() {
                Some(last) if last.attributes == run.attributes => last.range.end = run.range.end,
                _ => merged.push(run),
            }
        }
        self.runs = merged;
    }
}

impl From<&str> for StyledText {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for StyledText {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}
