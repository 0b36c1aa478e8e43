#![forbid(unsafe_code)]

//! Visible-row projection of an annotated tree.
//!
//! The rendering side draws one row per visible branch. A row shows an
//! expander when the node has navigable branches and a static marker
//! otherwise; children of a collapsed node are not visible.

use crate::annotate::AnnotatedNode;
use crate::rule::RuleType;

/// Leading control of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowToggle {
    /// The node has branches and can be opened or closed.
    Expander { expanded: bool },
    /// Nothing to open.
    Leaf,
}

/// One visible row of the navigation tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavRow {
    pub id: String,
    pub depth: usize,
    pub rule_type: RuleType,
    pub title: String,
    /// Target type names of an object rule, comma separated.
    pub subtitle: Option<String>,
    pub toggle: RowToggle,
    pub highlighted: bool,
}

impl NavRow {
    fn from_node(node: &AnnotatedNode, depth: usize) -> Self {
        let rule = node.rule();
        let subtitle = if rule.rule_type().is_branch() {
            let names: Vec<&str> = rule.type_names().collect();
            (!names.is_empty()).then(|| names.join(", "))
        } else {
            None
        };
        let toggle = if node.has_branches() {
            RowToggle::Expander {
                expanded: node.is_expanded(),
            }
        } else {
            RowToggle::Leaf
        };
        Self {
            id: node.id().to_owned(),
            depth,
            rule_type: node.rule_type(),
            title: rule.title().to_owned(),
            subtitle,
            toggle,
            highlighted: node.is_highlighted(),
        }
    }

    /// Whether the row's children are currently shown.
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self.toggle, RowToggle::Expander { expanded: true })
    }
}

/// Flatten the visible branches of `root` in pre-order.
#[must_use]
pub fn visible_rows(root: &AnnotatedNode) -> Vec<NavRow> {
    let mut out = Vec::with_capacity(visible_count(root));
    push_visible(root, 0, &mut out);
    out
}

/// Number of rows [`visible_rows`] would produce.
#[must_use]
pub fn visible_count(node: &AnnotatedNode) -> usize {
    let mut count = 1;
    if node.is_expanded() {
        for child in node.branches() {
            count += visible_count(child);
        }
    }
    count
}

fn push_visible(node: &AnnotatedNode, depth: usize, out: &mut Vec<NavRow>) {
    out.push(NavRow::from_node(node, depth));
    if !node.is_expanded() {
        return;
    }
    for child in node.branches() {
        push_visible(child, depth + 1, out);
    }
}
