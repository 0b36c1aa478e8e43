#![forbid(unsafe_code)]

//! rulenav runtime
//!
//! Event plumbing and the coordinator that keeps the navigation tree in
//! step with its hierarchy source and its host.
//!
//! # Key Components
//!
//! - [`Program`] - Elm-style runtime driving a [`Model`]
//! - [`Cmd`] - Commands for side effects, including background tasks
//! - [`Subscription`] - Trait for continuous event sources
//! - [`NotificationBus`] - Cloneable publish/subscribe handle for reload and selection events
//! - [`HierarchySource`] - Where the hierarchy comes from
//! - [`MappingsNav`] - The navigation-tree model
//! - [`ProgramSimulator`] - Deterministic driver for tests
//!
//! # How it fits together
//! A host creates a [`NotificationBus`] and a [`HierarchySource`], builds a
//! [`MappingsNav`] from them and hands it to a [`Program`]. The program
//! runs fetches as tasks, forwards bus notifications into the model through
//! subscriptions, and asks the model for a [`NavView`] whenever a frame is
//! drawn.

pub mod bus;
pub mod config;
pub mod nav;
pub mod program;
pub mod simulator;
pub mod source;
pub mod subscription;

pub use bus::{BusSubscription, Notification, NotificationBus, Topic};
pub use config::{ConfigError, NavConfig, ProgramSettings};
pub use nav::{MappingsNav, NavMsg, NavOptions, NavPhase, NavView};
pub use program::{Cmd, Model, Program, ProgramConfig, TaskMode, TaskSpec};
pub use simulator::ProgramSimulator;
#[cfg(feature = "json")]
pub use source::{JsonFileSource, parse_hierarchy};
pub use source::{FetchError, HierarchySource, StaticSource};
pub use subscription::{MockSubscription, StopSignal, SubId, Subscription};
