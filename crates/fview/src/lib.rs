#![forbid(unsafe_code)]

//! fview public facade.
//!
//! Re-exports the workspace crates under one name and provides a
//! [`prelude`] with the types most applications need.
//!
//! ```
//! use fview::prelude::*;
//!
//! struct Greeting {
//!     name: State<String>,
//! }
//!
//! impl View for Greeting {
//!     fn declared_state(&self) -> Vec<(&'static str, &dyn AnyState)> {
//!         vec![("name", &self.name)]
//!     }
//! }
//!
//! let greeting = Greeting { name: State::new("world".to_string()) };
//! let name = greeting.name.clone();
//! let app = Application::new(greeting.bold());
//!
//! name.set("fview".to_string());
//! let pass = app.tick().expect("write schedules a pass");
//! assert_eq!(pass.len(), 1);
//! assert_eq!(name.get(), "fview");
//! ```

pub use fview_core as core;
pub use fview_runtime as runtime;
pub use fview_style as style;

pub use fview_core::{DebugLog, Size, debug_log};
pub use fview_runtime::tree_dump;

/// Commonly used types.
pub mod prelude {
    pub use fview_core::{DebugLog, Size};
    pub use fview_runtime::{
        AnyState, Application, BackgroundColorKey, Binding, BoldKey, Control, EnvironmentKey,
        EnvironmentValues, ForegroundColorKey, InvertedKey, ItalicKey, Node, OnAppear,
        RenderPass, RuntimeConfig, State, StateError, StrikethroughKey, Text, UnderlineKey,
        VStack, View, ViewExt,
    };
    pub use fview_style::{
        AttributeKey, AttributeSet, AttributeValue, Color, StyledText, parse_markup, to_markup,
    };
}
