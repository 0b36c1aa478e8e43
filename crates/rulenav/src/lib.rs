#![forbid(unsafe_code)]
//! rulenav public facade crate.
//!
//! Re-exports the hierarchy model, the expansion/annotation logic and the
//! navigation-tree coordinator, and offers a prelude for hosts that embed
//! the tree.
//!
//! ```
//! use rulenav::prelude::*;
//!
//! let tree = MappingRule::root("root").child(MappingRule::object("person"));
//! let bus = NotificationBus::new();
//! let mut sim = ProgramSimulator::new(MappingsNav::new(StaticSource::new(Hierarchy::new(tree)), bus));
//! sim.init();
//!
//! let rows = sim.view().rows();
//! assert_eq!(rows.len(), 2);
//! assert!(rows[0].highlighted);
//! ```

use std::fmt;
use std::sync::Arc;

// --- Core re-exports -------------------------------------------------------

pub use rulenav_core::{
    AnnotatedNode, ExpansionState, Hierarchy, MappingRule, NavRow, RowToggle, RuleType, annotate,
    visible_rows,
};

// --- Runtime re-exports ----------------------------------------------------

pub use rulenav_runtime::{
    Cmd, FetchError, HierarchySource, MappingsNav, Model, NavConfig, NavMsg, NavOptions, NavPhase,
    NavView, Notification, NotificationBus, Program, ProgramConfig, ProgramSimulator, StaticSource,
    TaskMode,
};
#[cfg(feature = "json")]
pub use rulenav_runtime::{JsonFileSource, parse_hierarchy};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for rulenav hosts.
#[derive(Debug, Clone)]
pub enum Error {
    /// The hierarchy could not be fetched.
    Fetch(FetchError),
    /// Configuration could not be loaded.
    Config(Arc<rulenav_runtime::ConfigError>),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "configuration error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Fetch(err) => Some(err),
            Self::Config(err) => Some(err.as_ref()),
        }
    }
}

impl From<FetchError> for Error {
    fn from(err: FetchError) -> Self {
        Self::Fetch(err)
    }
}

impl From<rulenav_runtime::ConfigError> for Error {
    fn from(err: rulenav_runtime::ConfigError) -> Self {
        Self::Config(Arc::new(err))
    }
}

/// Standard result type for rulenav APIs.
pub type Result<T> = std::result::Result<T, Error>;

/// Fetch once from `source` outside of any program, e.g. for a host-side
/// preflight check.
pub fn fetch_hierarchy(source: &dyn HierarchySource) -> Result<Hierarchy> {
    Ok(source.get_hierarchy()?)
}

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        Error, ExpansionState, Hierarchy, HierarchySource, MappingRule, MappingsNav, NavMsg,
        NavView, Notification, NotificationBus, Program, ProgramConfig, ProgramSimulator, Result,
        RuleType, StaticSource,
    };
    pub use crate::{core, runtime};
}

pub use rulenav_core as core;
pub use rulenav_runtime as runtime;
