#![forbid(unsafe_code)]

//! Indented dumps of the identity tree.
//!
//! One line per node, depth-first pre-order: two spaces per level of depth,
//! an arrow, and the node's type name with module paths stripped (including
//! inside generic arguments), e.g.
//!
//! ```text
//! → VStack
//!   → EnvironmentOverride<BoldKey, Text>
//!     → Text
//! ```

use std::fmt;

use crate::node::Node;

/// Lazy pre-order walk yielding one formatted line per node.
pub struct TreeLines {
    stack: Vec<(Node, usize)>,
}

impl Iterator for TreeLines {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let (node, depth) = self.stack.pop()?;
        for child in node.children().into_iter().rev() {
            self.stack.push((child, depth + 1));
        }
        Some(format_line(&node, depth))
    }
}

impl fmt::Debug for TreeLines {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeLines")
            .field("remaining_roots", &self.stack.len())
            .finish()
    }
}

/// Lines describing `root` and its descendants.
#[must_use]
pub fn lines(root: &Node) -> TreeLines {
    TreeLines {
        stack: vec![(root.clone(), 0)],
    }
}

/// The whole dump as one newline-terminated string.
#[must_use]
pub fn render(root: &Node) -> String {
    lines(root).fold(String::new(), |mut out, line| {
        out.push_str(&line);
        out.push('\n');
        out
    })
}

fn format_line(node: &Node, depth: usize) -> String {
    format!("{:indent$}→ {}", "", short_type_name(node.type_name()), indent = depth * 2)
}

/// Strip module paths from every path segment of a type name.
///
/// `alloc::vec::Vec<my::Item>` becomes `Vec<Item>`.
#[must_use]
pub fn short_type_name(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut segment_start = 0;
    for (index, ch) in full.char_indices() {
        if is_separator(ch) {
            out.push_str(last_path_segment(&full[segment_start..index]));
            out.push(ch);
            segment_start = index + ch.len_utf8();
        }
    }
    out.push_str(last_path_segment(&full[segment_start..]));
    out
}

fn is_separator(ch: char) -> bool {
    matches!(ch, '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | '&' | ';')
}

fn last_path_segment(segment: &str) -> &str {
    segment.rsplit("::").next().unwrap_or(segment)
}

impl Node {
    /// Append the tree dump to the debug log.
    pub fn log_tree(&self) {
        for line in lines(self) {
            fview_core::log(line);
        }
    }
}
