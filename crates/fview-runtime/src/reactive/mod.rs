#![forbid(unsafe_code)]

//! State and bindings for fview views.
//!
//! - [`State`]: a labelled slot on an identity node, read and written through
//!   a handle that lives in the view descriptor.
//! - [`Binding`]: a getter/setter pair derived from a state (or anything
//!   else), with lens-style projection.
//!
//! # Architecture
//!
//! Handles hold a weak node reference plus a label, shared between clones
//! through `Rc`. Values are stored type-erased in the node's
//! [`StateSlots`](crate::StateSlots). A write invalidates the node through its
//! application; the application coalesces and defers the actual pass.
//!
//! # Invariants
//!
//! 1. A slot that was never written reads as the handle's initial value.
//! 2. Every successful write produces exactly one invalidation request.
//! 3. Handles resolved against a destroyed node fail loudly.

pub mod binding;
pub mod state;

pub use binding::Binding;
pub use state::{AnyState, State};
