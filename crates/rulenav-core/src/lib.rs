#![forbid(unsafe_code)]

//! rulenav core
//!
//! Data model and pure state logic behind the mapping-rule navigation
//! tree.
//!
//! # Key Components
//!
//! - [`MappingRule`] / [`Hierarchy`] - the raw hierarchy as delivered by a source
//! - [`ExpansionState`] - per-node expanded flags
//! - [`annotate`] - derives [`AnnotatedNode`]s with expanded/highlighted flags
//! - [`visible_rows`] - flattens an annotated tree into [`NavRow`]s for drawing
//!
//! # Role in rulenav
//! `rulenav-core` does no I/O and holds no long-lived state of its own. The
//! runtime crate owns an [`ExpansionState`], feeds it events, and calls
//! [`annotate`] whenever a renderer asks for a fresh view.

pub mod annotate;
pub mod expansion;
pub mod outline;
pub mod rule;

pub use annotate::{AnnotatedNode, annotate};
pub use expansion::ExpansionState;
pub use outline::{NavRow, RowToggle, visible_count, visible_rows};
pub use rule::{
    Hierarchy, MappingRule, MappingTarget, RuleMetadata, RuleSet, RuleType, TypeRule, UriRuleRef,
};
