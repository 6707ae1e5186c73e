#![forbid(unsafe_code)]

//! View descriptors.
//!
//! A [`View`] is a cheap, rebuildable description of part of the UI. The
//! runtime instantiates it into an identity [`Node`](crate::Node), binds its
//! declared state to that node, and later asks it for a backing control.
//!
//! [`ViewExt`] provides the modifier surface: styling attributes, lifecycle
//! actions, and arbitrary environment overrides all wrap the receiver in
//! another view.

use std::rc::Rc;
use std::sync::Arc;

use fview_core::Size;
use fview_style::{AttributeSet, Color, StyledText};
use unicode_width::UnicodeWidthStr;

use crate::control::{Control, ControlContext, LeafControl, default_control};
use crate::environment::{
    BackgroundColorKey, BoldKey, EnvironmentKey, EnvironmentOverride, EnvironmentValues,
    ForegroundColorKey, InvertedKey, ItalicKey, StrikethroughKey, UnderlineKey,
};
use crate::on_appear::OnAppear;
use crate::reactive::AnyState;

/// A declarative UI element.
pub trait View: 'static {
    /// Name used for reconciliation and tree dumps.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// State handles this view owns, with the label each is stored under.
    fn declared_state(&self) -> Vec<(&'static str, &dyn AnyState)> {
        Vec::new()
    }

    fn children(&self) -> Vec<Rc<dyn View>> {
        Vec::new()
    }

    /// Environment handed to this view's children.
    fn child_environment(&self, inherited: &EnvironmentValues) -> EnvironmentValues {
        inherited.clone()
    }

    /// Build the backing control from the children's controls.
    fn make_control(
        &self,
        cx: ControlContext<'_>,
        children: Vec<Arc<dyn Control>>,
    ) -> Arc<dyn Control> {
        let _ = cx;
        default_control(children)
    }
}

/// A run of styled text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Text {
    content: StyledText,
}

impl Text {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            content: StyledText::new(text),
        }
    }

    #[must_use]
    pub fn styled(content: StyledText) -> Self {
        Self { content }
    }

    #[must_use]
    pub fn content(&self) -> &StyledText {
        &self.content
    }

    /// Cells needed to show the text unwrapped: widest line by one row per line.
    #[must_use]
    pub fn intrinsic_size(&self) -> Size {
        let mut width = 0usize;
        let mut height = 0usize;
        for line in self.content.plain().split('\n') {
            width = width.max(line.width());
            height += 1;
        }
        Size::new(
            u16::try_from(width).unwrap_or(u16::MAX),
            u16::try_from(height).unwrap_or(u16::MAX),
        )
    }

    /// The text with the environment's attributes as the outer scope and the
    /// text's own runs as the inner one.
    #[must_use]
    pub fn resolve(&self, environment: &EnvironmentValues) -> StyledText {
        let outer: AttributeSet = environment.attributes();
        let mut resolved = StyledText::default();
        for (segment, inner) in self.content.segments() {
            resolved.push_str(segment, outer.merge(inner));
        }
        resolved
    }
}

impl View for Text {
    fn make_control(
        &self,
        _cx: ControlContext<'_>,
        _children: Vec<Arc<dyn Control>>,
    ) -> Arc<dyn Control> {
        Arc::new(LeafControl::new(self.intrinsic_size()))
    }
}

/// Vertical container.
#[derive(Clone, Default)]
pub struct VStack {
    children: Vec<Rc<dyn View>>,
}

impl VStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn child(mut self, view: impl View) -> Self {
        self.children.push(Rc::new(view));
        self
    }
}

impl View for VStack {
    fn children(&self) -> Vec<Rc<dyn View>> {
        self.children.clone()
    }
}

/// Modifiers available on every view.
pub trait ViewExt: View + Sized {
    /// Override `K` for this view's subtree.
    fn environment<K: EnvironmentKey>(self, value: K::Value) -> EnvironmentOverride<K, Self> {
        EnvironmentOverride::new(self, value)
    }

    fn bold(self) -> EnvironmentOverride<BoldKey, Self> {
        self.environment::<BoldKey>(true)
    }

    fn italic(self) -> EnvironmentOverride<ItalicKey, Self> {
        self.environment::<ItalicKey>(true)
    }

    fn underline(self, active: bool) -> EnvironmentOverride<UnderlineKey, Self> {
        self.environment::<UnderlineKey>(active)
    }

    fn strikethrough(self) -> EnvironmentOverride<StrikethroughKey, Self> {
        self.environment::<StrikethroughKey>(true)
    }

    fn inverted(self) -> EnvironmentOverride<InvertedKey, Self> {
        self.environment::<InvertedKey>(true)
    }

    fn foreground_color(self, color: Color) -> EnvironmentOverride<ForegroundColorKey, Self> {
        self.environment::<ForegroundColorKey>(Some(color))
    }

    fn background_color(self, color: Color) -> EnvironmentOverride<BackgroundColorKey, Self> {
        self.environment::<BackgroundColorKey>(Some(color))
    }

    /// Run `action` on the main thread after the first layout of this view.
    fn on_appear(self, action: impl Fn() + 'static) -> OnAppear<Self> {
        OnAppear::new(self, action)
    }
}

impl<V: View> ViewExt for V {}
