#![forbid(unsafe_code)]

//! Scoped, type-keyed environment values.
//!
//! An [`EnvironmentValues`] is a persistent map from key types to values. Each
//! key type declares its value type and a default, so lookup is total: a key
//! nobody set reads as its default.
//!
//! Deriving a child environment with [`with_value`](EnvironmentValues::with_value)
//! never mutates the parent. The map is shared behind an `Arc` and copied only
//! when a derived environment actually adds a key, so environments handed to
//! siblings and ancestors are unaffected by each other's overrides.
//!
//! The seven built-in attribute keys ([`BoldKey`], [`ForegroundColorKey`], ...)
//! carry the styling scope; [`EnvironmentValues::attributes`] collects the
//! explicitly set ones into an [`AttributeSet`].

use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::Arc;

use ahash::AHashMap;
use fview_style::{AttributeSet, Color};

use crate::view::View;

/// A key type for [`EnvironmentValues`].
pub trait EnvironmentKey: 'static {
    type Value: Clone + Send + Sync + 'static;

    /// Name shown in debug output.
    const NAME: &'static str;

    /// Value reported when the key was never set.
    fn default_value() -> Self::Value;
}

#[derive(Clone)]
struct Entry {
    name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
}

/// Copy-on-write map of environment values.
#[derive(Clone, Default)]
pub struct EnvironmentValues {
    entries: Arc<AHashMap<TypeId, Entry>>,
}

impl EnvironmentValues {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Value for `K`, or its default when unset.
    #[must_use]
    pub fn get<K: EnvironmentKey>(&self) -> K::Value {
        self.entries
            .get(&TypeId::of::<K>())
            .and_then(|entry| entry.value.downcast_ref::<K::Value>())
            .cloned()
            .unwrap_or_else(K::default_value)
    }

    /// A derived environment with `K` set to `value`. `self` is unchanged.
    #[must_use]
    pub fn with_value<K: EnvironmentKey>(&self, value: K::Value) -> Self {
        let mut entries = Arc::clone(&self.entries);
        Arc::make_mut(&mut entries).insert(
            TypeId::of::<K>(),
            Entry {
                name: K::NAME,
                value: Arc::new(value),
            },
        );
        Self { entries }
    }

    /// Whether `K` was explicitly set somewhere up the chain.
    #[must_use]
    pub fn contains<K: EnvironmentKey>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<K>())
    }

    /// Number of explicitly set keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether both environments share one backing map.
    #[must_use]
    pub fn shares_storage(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries)
    }

    fn explicit<K: EnvironmentKey>(&self) -> Option<K::Value> {
        self.contains::<K>().then(|| self.get::<K>())
    }

    /// The styling attributes explicitly set in this environment.
    ///
    /// Flag keys set to `false` are included (they cancel an outer `true`);
    /// a color key set to `None` is treated as unset.
    #[must_use]
    pub fn attributes(&self) -> AttributeSet {
        let mut set = AttributeSet::new();
        if let Some(Some(color)) = self.explicit::<BackgroundColorKey>() {
            set = set.background(color);
        }
        if let Some(Some(color)) = self.explicit::<ForegroundColorKey>() {
            set = set.foreground(color);
        }
        if let Some(on) = self.explicit::<BoldKey>() {
            set = set.bold(on);
        }
        if let Some(on) = self.explicit::<ItalicKey>() {
            set = set.italic(on);
        }
        if let Some(on) = self.explicit::<StrikethroughKey>() {
            set = set.strikethrough(on);
        }
        if let Some(on) = self.explicit::<UnderlineKey>() {
            set = set.underline(on);
        }
        if let Some(on) = self.explicit::<InvertedKey>() {
            set = set.inverted(on);
        }
        set
    }
}

impl fmt::Debug for EnvironmentValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.entries.values().map(|entry| entry.name).collect();
        names.sort_unstable();
        f.debug_struct("EnvironmentValues")
            .field("keys", &names)
            .finish()
    }
}

macro_rules! flag_key {
    ($(#[$meta:meta])* $key:ident, $name:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $key;

        impl EnvironmentKey for $key {
            type Value = bool;
            const NAME: &'static str = $name;

            fn default_value() -> bool {
                false
            }
        }
    };
}

macro_rules! color_key {
    ($(#[$meta:meta])* $key:ident, $name:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $key;

        impl EnvironmentKey for $key {
            type Value = Option<Color>;
            const NAME: &'static str = $name;

            fn default_value() -> Option<Color> {
                None
            }
        }
    };
}

flag_key!(/// Bold text.
    BoldKey, "Bold");
flag_key!(/// Italic text.
    ItalicKey, "Italic");
flag_key!(/// Strikethrough text.
    StrikethroughKey, "Strikethrough");
flag_key!(/// Underlined text.
    UnderlineKey, "Underline");
flag_key!(/// Swapped foreground and background.
    InvertedKey, "Inverted");
color_key!(/// Text color.
    ForegroundColorKey, "ForegroundColor");
color_key!(/// Fill color behind text.
    BackgroundColorKey, "BackgroundColor");

// ---------------------------------------------------------------------------
// EnvironmentOverride
// ---------------------------------------------------------------------------

/// Wraps `content`, giving its subtree an environment with `K` overridden.
pub struct EnvironmentOverride<K: EnvironmentKey, V> {
    content: Rc<V>,
    value: K::Value,
    _key: PhantomData<fn() -> K>,
}

impl<K: EnvironmentKey, V: View> EnvironmentOverride<K, V> {
    pub fn new(content: V, value: K::Value) -> Self {
        Self {
            content: Rc::new(content),
            value,
            _key: PhantomData,
        }
    }

    #[must_use]
    pub fn value(&self) -> &K::Value {
        &self.value
    }
}

impl<K: EnvironmentKey, V: View> View for EnvironmentOverride<K, V> {
    fn children(&self) -> Vec<Rc<dyn View>> {
        vec![Rc::clone(&self.content) as Rc<dyn View>]
    }

    fn child_environment(&self, inherited: &EnvironmentValues) -> EnvironmentValues {
        inherited.with_value::<K>(self.value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fview_style::AttributeKey;

    struct Depth;

    impl EnvironmentKey for Depth {
        type Value = u32;
        const NAME: &'static str = "Depth";

        fn default_value() -> u32 {
            7
        }
    }

    #[test]
    fn unset_key_reads_default() {
        let env = EnvironmentValues::new();
        assert_eq!(env.get::<Depth>(), 7);
        assert!(!env.get::<BoldKey>());
        assert_eq!(env.get::<ForegroundColorKey>(), None);
        assert!(env.is_empty());
    }

    #[test]
    fn with_value_leaves_parent_untouched() {
        let parent = EnvironmentValues::new().with_value::<Depth>(1);
        let child = parent.with_value::<Depth>(2);
        let sibling = parent.with_value::<BoldKey>(true);

        assert_eq!(parent.get::<Depth>(), 1);
        assert_eq!(child.get::<Depth>(), 2);
        assert_eq!(sibling.get::<Depth>(), 1);
        assert!(!child.get::<BoldKey>());
        assert!(sibling.get::<BoldKey>());
    }

    #[test]
    fn clone_shares_storage_until_written() {
        let parent = EnvironmentValues::new().with_value::<Depth>(1);
        let copy = parent.clone();
        assert!(copy.shares_storage(&parent));
        let derived = copy.with_value::<Depth>(3);
        assert!(!derived.shares_storage(&parent));
        assert_eq!(parent.get::<Depth>(), 1);
    }

    #[test]
    fn attributes_include_explicit_false() {
        let env = EnvironmentValues::new()
            .with_value::<BoldKey>(false)
            .with_value::<ForegroundColorKey>(Some(Color::RED))
            .with_value::<BackgroundColorKey>(None);
        let attrs = env.attributes();
        assert_eq!(attrs.flag(AttributeKey::Bold), Some(false));
        assert_eq!(attrs.color(AttributeKey::ForegroundColor), Some(Color::RED));
        assert_eq!(attrs.get(AttributeKey::BackgroundColor), None);
        assert_eq!(attrs.get(AttributeKey::Italic), None);
    }

    #[test]
    fn debug_lists_key_names() {
        let env = EnvironmentValues::new()
            .with_value::<UnderlineKey>(true)
            .with_value::<BoldKey>(true);
        assert_eq!(
            format!("{env:?}"),
            r#"EnvironmentValues { keys: ["Bold", "Underline"] }"#
        );
    }
}
