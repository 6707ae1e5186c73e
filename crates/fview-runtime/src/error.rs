#![forbid(unsafe_code)]

//! Errors raised by state access.
//!
//! Every variant indicates a defect in how the framework or application uses a
//! state handle, not a recoverable data condition. The panicking accessors
//! ([`State::get`](crate::State::get), [`State::set`](crate::State::set))
//! surface them immediately; the `try_` variants return them.

/// Failure to resolve or type-check a state slot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    /// The handle was used before its view was instantiated into the tree.
    #[error("state accessed before its view was instantiated")]
    Unattached,

    /// The node owning the slot has been destroyed.
    #[error("state '{label}' accessed after its node was destroyed")]
    NodeDropped { label: String },

    /// The slot holds a value of a different type than requested.
    #[error("state '{label}' holds a {found} but was accessed as {expected}")]
    TypeMismatch {
        label: String,
        expected: &'static str,
        found: &'static str,
    },
}

impl StateError {
    /// True for the two detachment variants.
    #[must_use]
    pub const fn is_detached(&self) -> bool {
        matches!(self, Self::Unattached | Self::NodeDropped { .. })
    }
}
