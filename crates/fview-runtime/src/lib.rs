#![forbid(unsafe_code)]

//! Reactive state core for fview.
//!
//! # Role in fview
//! `fview-runtime` turns view descriptors into a persistent identity tree and
//! keeps it consistent as state changes. It owns:
//!
//! - [`Node`]: identity nodes with per-label state slots and environments
//! - [`State`] / [`Binding`]: node-owned state and projections onto it
//! - [`Application`]: coalescing invalidation and render-pass scheduling
//! - [`EnvironmentValues`]: copy-on-write, type-keyed scoped values
//! - [`Coordinator`]: main-thread execution of work requested off-thread
//! - [`OnAppear`]: actions run exactly once after first layout
//! - [`tree_dump`]: indented dumps of the identity tree
//!
//! # How it fits in the system
//! Styling attributes and their merge rule come from `fview-style`; cell
//! geometry and the append-only debug log come from `fview-core`. The `fview`
//! facade re-exports all three.

pub mod config;
pub mod control;
pub mod coordinator;
pub mod environment;
pub mod error;
pub mod node;
pub mod on_appear;
pub mod reactive;
pub mod scheduler;
pub mod tree_dump;
pub mod view;

pub use config::RuntimeConfig;
pub use control::{Control, ControlContext, LeafControl, StackControl};
pub use coordinator::{ActionToken, Coordinator, CoordinatorHandle};
pub use environment::{
    BackgroundColorKey, BoldKey, EnvironmentKey, EnvironmentOverride, EnvironmentValues,
    ForegroundColorKey, InvertedKey, ItalicKey, StrikethroughKey, UnderlineKey,
};
pub use error::StateError;
pub use node::{Invalidator, Node, NodeId, StateSlots, WeakNode};
pub use on_appear::{OnAppear, OnAppearControl};
pub use reactive::{AnyState, Binding, State};
pub use scheduler::{Application, RenderPass};
pub use view::{Text, VStack, View, ViewExt};
