#![forbid(unsafe_code)]

//! Navigation-tree coordinator.
//!
//! [`MappingsNav`] is the [`Model`] behind the mapping-rule navigation tree.
//! It owns the raw hierarchy and the [`ExpansionState`], reacts to bus
//! notifications, fetch completions and user actions, and produces a
//! [`NavView`] for the renderer on demand.
//!
//! # Lifecycle
//!
//! ```text
//!            init / Reload                 fetch ok
//!   ──────────────► Loading ─────────────────────────► Ready
//!                     │  ▲                               │
//!         fetch failed│  └──────── Reload ───────────────┤
//!                     ▼                                  │
//!                   Error ◄──────── fetch failed ────────┘
//! ```
//!
//! - Reload never resets expansion choices.
//! - The first successful load seeds the root id as expanded, but only if
//!   no expansion entry exists yet.
//! - A failed fetch keeps whatever tree was loaded before.
//! - Overlapping fetches are not sequenced: the last one to complete wins.
//! - Results arriving after [`NavMsg::Teardown`] are ignored.

use crate::bus::{Notification, NotificationBus, Topic};
use crate::program::{Cmd, Model, TaskSpec};
use crate::source::{FetchError, HierarchySource};
use crate::subscription::Subscription;
use rulenav_core::{AnnotatedNode, ExpansionState, Hierarchy, MappingRule, NavRow, annotate};
use std::sync::Arc;
use std::time::Duration;
use web_time::Instant;

/// Coordinator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavPhase {
    /// A fetch has been issued and not yet answered.
    Loading,
    /// The last fetch succeeded.
    Ready,
    /// The last fetch failed.
    Error,
}

/// Coordinator behavior switches.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct NavOptions {
    /// Expand the root after the first load when nothing is expanded yet.
    pub seed_root_expanded: bool,
    /// Drop fetch results that arrive after teardown.
    pub ignore_after_teardown: bool,
}

impl Default for NavOptions {
    fn default() -> Self {
        Self {
            seed_root_expanded: true,
            ignore_after_teardown: true,
        }
    }
}

/// Messages understood by [`MappingsNav`].
#[derive(Debug, Clone, PartialEq)]
pub enum NavMsg {
    /// Re-fetch the hierarchy.
    Reload,
    /// A rule was selected elsewhere; expand it and its parent.
    SelectionChanged {
        new_selected_id: String,
        parent_id: Option<String>,
    },
    /// Flip the expansion of a node.
    ToggleExpand(String),
    /// The user picked a node in the tree.
    Navigate(String),
    /// The externally selected rule changed.
    CurrentRule(Option<String>),
    /// A fetch completed.
    HierarchyLoaded {
        request: u64,
        elapsed: Duration,
        result: Result<Hierarchy, FetchError>,
    },
    /// The tree is going away.
    Teardown,
}

impl From<Notification> for NavMsg {
    fn from(notification: Notification) -> Self {
        match notification {
            Notification::Reload => Self::Reload,
            Notification::SelectionChanged {
                new_selected_id,
                parent_id,
            } => Self::SelectionChanged {
                new_selected_id,
                parent_id,
            },
        }
    }
}

/// Render input: the annotated tree, the loading flag and the callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavView {
    pub tree: Option<AnnotatedNode>,
    pub loading: bool,
}

impl NavView {
    /// Visible rows, empty when there is no tree.
    #[must_use]
    pub fn rows(&self) -> Vec<NavRow> {
        self.tree
            .as_ref()
            .map(rulenav_core::visible_rows)
            .unwrap_or_default()
    }

    /// Whether there is nothing to draw besides a spinner.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.is_none()
    }

    /// Message for the expander of row `id`.
    pub fn on_toggle_expand(id: impl Into<String>) -> NavMsg {
        NavMsg::ToggleExpand(id.into())
    }

    /// Message for a click on row `id`.
    pub fn on_navigate(id: impl Into<String>) -> NavMsg {
        NavMsg::Navigate(id.into())
    }
}

/// The navigation-tree model.
pub struct MappingsNav {
    source: Arc<dyn HierarchySource>,
    bus: NotificationBus,
    options: NavOptions,
    phase: NavPhase,
    tree: Option<MappingRule>,
    expansion: ExpansionState,
    current_rule: Option<String>,
    last_error: Option<FetchError>,
    requests: u64,
    torn_down: bool,
}

impl MappingsNav {
    /// Create a coordinator reading from `source` and listening on `bus`.
    pub fn new(source: impl HierarchySource, bus: NotificationBus) -> Self {
        Self::with_source(Arc::new(source), bus)
    }

    /// Create a coordinator around a shared source.
    pub fn with_source(source: Arc<dyn HierarchySource>, bus: NotificationBus) -> Self {
        Self {
            source,
            bus,
            options: NavOptions::default(),
            phase: NavPhase::Loading,
            tree: None,
            expansion: ExpansionState::new(),
            current_rule: None,
            last_error: None,
            requests: 0,
            torn_down: false,
        }
    }

    /// Replace the behavior switches.
    #[must_use]
    pub fn with_options(mut self, options: NavOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the externally selected rule. An empty id means no selection.
    pub fn set_current_rule(&mut self, id: Option<String>) {
        self.current_rule = id.filter(|id| !id.is_empty());
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> NavPhase {
        self.phase
    }

    /// Whether a fetch is outstanding.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.phase == NavPhase::Loading
    }

    /// Last successfully loaded hierarchy root.
    #[must_use]
    pub fn tree(&self) -> Option<&MappingRule> {
        self.tree.as_ref()
    }

    /// Expansion flags.
    #[must_use]
    pub fn expansion(&self) -> &ExpansionState {
        &self.expansion
    }

    /// The externally selected rule.
    #[must_use]
    pub fn current_rule(&self) -> Option<&str> {
        self.current_rule.as_deref()
    }

    /// Error of the most recent fetch, cleared by the next success.
    #[must_use]
    pub fn last_error(&self) -> Option<&FetchError> {
        self.last_error.as_ref()
    }

    /// Number of fetches issued.
    #[must_use]
    pub fn requests_issued(&self) -> u64 {
        self.requests
    }

    /// Whether teardown has happened.
    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// The notification bus this tree listens on.
    #[must_use]
    pub fn bus(&self) -> &NotificationBus {
        &self.bus
    }

    fn fetch(&mut self) -> Cmd<NavMsg> {
        self.requests += 1;
        self.phase = NavPhase::Loading;
        let request = self.requests;
        tracing::debug!(message = "nav.reload", request, phase = ?self.phase);

        let source = Arc::clone(&self.source);
        Cmd::task(TaskSpec::new("hierarchy.get"), move || {
            let started = Instant::now();
            let result = source.get_hierarchy();
            NavMsg::HierarchyLoaded {
                request,
                elapsed: started.elapsed(),
                result,
            }
        })
    }

    fn loaded(&mut self, request: u64, elapsed: Duration, result: Result<Hierarchy, FetchError>) {
        match result {
            Ok(hierarchy) => {
                let root = hierarchy.into_root();
                let seeded = match &root {
                    Some(root) if self.options.seed_root_expanded => {
                        self.expansion.seed_if_empty(root.id())
                    }
                    _ => false,
                };
                tracing::debug!(
                    message = "nav.loaded",
                    request,
                    root_id = root.as_ref().map_or("", MappingRule::id),
                    node_count = root.as_ref().map_or(0, MappingRule::node_count),
                    seeded,
                    elapsed_us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX),
                );
                self.tree = root;
                self.last_error = None;
                self.phase = NavPhase::Ready;
            }
            Err(error) => {
                tracing::warn!(
                    message = "nav.fetch_failed",
                    request,
                    error = %error,
                    kept_tree = self.tree.is_some(),
                );
                self.last_error = Some(error);
                self.phase = NavPhase::Error;
            }
        }
    }
}

impl Model for MappingsNav {
    type Message = NavMsg;
    type View = NavView;

    fn init(&mut self) -> Cmd<NavMsg> {
        self.fetch()
    }

    fn update(&mut self, msg: NavMsg) -> Cmd<NavMsg> {
        match msg {
            NavMsg::Reload => {
                if self.torn_down {
                    return Cmd::none();
                }
                self.fetch()
            }
            NavMsg::SelectionChanged {
                new_selected_id,
                parent_id,
            } => {
                tracing::debug!(
                    message = "nav.selection_changed",
                    new_selected_id = %new_selected_id,
                    parent_id = parent_id.as_deref().unwrap_or(""),
                );
                self.expansion.expand(new_selected_id);
                if let Some(parent_id) = parent_id {
                    self.expansion.expand(parent_id);
                }
                Cmd::none()
            }
            NavMsg::ToggleExpand(id) => {
                if self.tree.is_some() {
                    let expanded = self.expansion.toggle(&id);
                    tracing::debug!(message = "nav.toggle", id = %id, expanded);
                }
                Cmd::none()
            }
            NavMsg::Navigate(id) => {
                let delivered = self
                    .bus
                    .publish(Notification::selection_changed(id, None::<String>));
                tracing::trace!(delivered, "nav.navigate");
                Cmd::none()
            }
            NavMsg::CurrentRule(id) => {
                self.set_current_rule(id);
                Cmd::none()
            }
            NavMsg::HierarchyLoaded {
                request,
                elapsed,
                result,
            } => {
                if self.torn_down && self.options.ignore_after_teardown {
                    tracing::debug!(request, "nav.late_response_ignored");
                } else {
                    self.loaded(request, elapsed, result);
                }
                Cmd::none()
            }
            NavMsg::Teardown => {
                self.torn_down = true;
                Cmd::none()
            }
        }
    }

    fn subscriptions(&self) -> Vec<Box<dyn Subscription<NavMsg>>> {
        if self.torn_down {
            return Vec::new();
        }
        vec![
            Box::new(self.bus.subscription::<NavMsg>(Topic::Reload)),
            Box::new(self.bus.subscription::<NavMsg>(Topic::SelectionChanged)),
        ]
    }

    fn view(&self) -> NavView {
        NavView {
            tree: annotate(
                self.tree.as_ref(),
                &self.expansion,
                self.current_rule.as_deref(),
            ),
            loading: self.is_loading(),
        }
    }
}

impl std::fmt::Debug for MappingsNav {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappingsNav")
            .field("phase", &self.phase)
            .field("tree", &self.tree.as_ref().map(MappingRule::id))
            .field("expansion", &self.expansion)
            .field("current_rule", &self.current_rule)
            .field("last_error", &self.last_error)
            .field("requests", &self.requests)
            .field("torn_down", &self.torn_down)
            .finish()
    }
}
