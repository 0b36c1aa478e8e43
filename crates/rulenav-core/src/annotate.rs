#![forbid(unsafe_code)]

//! Derives display state for a mapping hierarchy.
//!
//! [`annotate`] walks a raw hierarchy and builds a fresh [`AnnotatedNode`]
//! tree carrying an `expanded` and a `highlighted` flag per rule. The input
//! is only borrowed; nothing derived is ever written back into it, and the
//! output depends on nothing but the hierarchy, the [`ExpansionState`] and
//! the selected id.
//!
//! # Highlight rules
//!
//! A rule is highlighted when any of these holds:
//!
//! 1. its id equals the selected id;
//! 2. a selection exists and its URI rule id equals the selected id;
//! 3. it is a root rule and there is no selection;
//! 4. one of its non-object property rules has the selected id. The
//!    containing rule is then also forced expanded, so selecting a value
//!    rule lights up the object that shows it.
//!
//! An empty selected id counts as no selection.
//!
//! Every property rule is annotated, leaves included, so the output can be
//! turned back into a hierarchy with [`AnnotatedNode::to_rule`] and
//! re-annotated to the same flags. Navigation only descends through
//! [`AnnotatedNode::branches`].

use crate::expansion::ExpansionState;
use crate::rule::{MappingRule, RuleType};

/// A mapping rule together with its derived display flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedNode {
    /// The rule itself with its property rules stripped; see `children`.
    rule: MappingRule,
    expanded: bool,
    highlighted: bool,
    children: Vec<AnnotatedNode>,
}

impl AnnotatedNode {
    /// Rule id.
    #[must_use]
    pub fn id(&self) -> &str {
        self.rule.id()
    }

    /// Rule kind.
    #[must_use]
    pub fn rule_type(&self) -> RuleType {
        self.rule.rule_type()
    }

    /// The rule's own data. Its property rules are empty; use
    /// [`children`](Self::children) instead.
    #[must_use]
    pub fn rule(&self) -> &MappingRule {
        &self.rule
    }

    /// Whether children are shown.
    #[must_use]
    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    /// Whether this rule represents the current selection.
    #[must_use]
    pub fn is_highlighted(&self) -> bool {
        self.highlighted
    }

    /// All annotated property rules, in order.
    #[must_use]
    pub fn children(&self) -> &[AnnotatedNode] {
        &self.children
    }

    /// Annotated property rules that are navigable branches.
    pub fn branches(&self) -> impl Iterator<Item = &AnnotatedNode> {
        self.children
            .iter()
            .filter(|child| child.rule_type().is_branch())
    }

    /// Whether any navigable branch exists below this node.
    #[must_use]
    pub fn has_branches(&self) -> bool {
        self.branches().next().is_some()
    }

    /// Depth-first search by id.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&AnnotatedNode> {
        if self.id() == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    /// Count this node and all descendants.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.children
            .iter()
            .fold(1usize, |acc, child| acc.saturating_add(child.node_count()))
    }

    /// Ids of every highlighted node, in pre-order.
    #[must_use]
    pub fn highlighted_ids(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_highlighted(&mut out);
        out
    }

    fn collect_highlighted<'a>(&'a self, out: &mut Vec<&'a str>) {
        if self.highlighted {
            out.push(self.id());
        }
        for child in &self.children {
            child.collect_highlighted(out);
        }
    }

    /// Rebuild the raw rule, dropping the derived flags.
    #[must_use]
    pub fn to_rule(&self) -> MappingRule {
        self.rule
            .clone()
            .with_children(self.children.iter().map(AnnotatedNode::to_rule).collect())
    }
}

/// Annotate `raw` with expansion and highlight flags.
///
/// Returns `None` when there is no hierarchy or it is empty.
#[must_use]
pub fn annotate(
    raw: Option<&MappingRule>,
    expansion: &ExpansionState,
    selected: Option<&str>,
) -> Option<AnnotatedNode> {
    let root = raw.filter(|rule| !rule.is_empty())?;
    let selected = selected.filter(|id| !id.is_empty());

    #[cfg(feature = "tracing")]
    let span = tracing::debug_span!(
        "tree.annotate",
        total_nodes = root.node_count(),
        highlighted = tracing::field::Empty,
    );
    #[cfg(feature = "tracing")]
    let _guard = span.enter();

    let annotated = mark(root, expansion, selected);

    #[cfg(feature = "tracing")]
    span.record("highlighted", annotated.highlighted_ids().len());

    Some(annotated)
}

fn matches_selection(rule: &MappingRule, selected: Option<&str>) -> bool {
    match selected {
        Some(sel) => rule.id() == sel || rule.uri_rule_id() == Some(sel),
        None => rule.rule_type().is_root(),
    }
}

fn mark(rule: &MappingRule, expansion: &ExpansionState, selected: Option<&str>) -> AnnotatedNode {
    let mut expanded = expansion.get(rule.id());
    let mut highlighted = matches_selection(rule, selected);

    let mut children = Vec::with_capacity(rule.children().len());
    for child in rule.children() {
        let sub = mark(child, expansion, selected);
        if !sub.rule_type().is_branch() && selected == Some(sub.id()) {
            highlighted = true;
            expanded = true;
        }
        children.push(sub);
    }

    AnnotatedNode {
        rule: rule.shallow_clone(),
        expanded,
        highlighted,
        children,
    }
}
