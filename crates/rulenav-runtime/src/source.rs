#![forbid(unsafe_code)]

//! Hierarchy sources.
//!
//! A [`HierarchySource`] answers the `hierarchy.get` request. Calls are
//! blocking; the program runs them off the model thread as a `Cmd::Task`,
//! which is what makes the fetch asynchronous from the tree's point of view.

use rulenav_core::Hierarchy;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Failure to retrieve the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Backend or transport could not be reached.
    Unavailable(String),
    /// Backend answered with an error status.
    Backend { status: u16, message: String },
    /// Local I/O failure of a file-backed source.
    Io {
        kind: std::io::ErrorKind,
        message: String,
    },
    /// Payload could not be decoded.
    Decode(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(msg) => write!(f, "hierarchy source unavailable: {msg}"),
            Self::Backend { status, message } => {
                write!(f, "hierarchy request failed with status {status}: {message}")
            }
            Self::Io { kind, message } => write!(f, "I/O error ({kind:?}): {message}"),
            Self::Decode(msg) => write!(f, "malformed hierarchy payload: {msg}"),
        }
    }
}

impl std::error::Error for FetchError {}

impl From<std::io::Error> for FetchError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[cfg(feature = "json")]
impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Provider of the mapping hierarchy.
pub trait HierarchySource: Send + Sync + 'static {
    /// Fetch the current hierarchy.
    fn get_hierarchy(&self) -> Result<Hierarchy, FetchError>;
}

impl<F> HierarchySource for F
where
    F: Fn() -> Result<Hierarchy, FetchError> + Send + Sync + 'static,
{
    fn get_hierarchy(&self) -> Result<Hierarchy, FetchError> {
        self()
    }
}

/// In-memory source returning a replaceable canned response.
///
/// Clones share the response and the fetch counter, so a test can keep a
/// handle while the coordinator owns another.
#[derive(Debug, Clone)]
pub struct StaticSource {
    response: Arc<Mutex<Result<Hierarchy, FetchError>>>,
    fetches: Arc<AtomicUsize>,
}

impl StaticSource {
    /// Source answering with `hierarchy`.
    #[must_use]
    pub fn new(hierarchy: Hierarchy) -> Self {
        Self::with_response(Ok(hierarchy))
    }

    /// Source answering with `error`.
    #[must_use]
    pub fn failing(error: FetchError) -> Self {
        Self::with_response(Err(error))
    }

    fn with_response(response: Result<Hierarchy, FetchError>) -> Self {
        Self {
            response: Arc::new(Mutex::new(response)),
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Replace the response served by subsequent fetches.
    pub fn set_response(&self, response: Result<Hierarchy, FetchError>) {
        *self.response.lock().unwrap_or_else(PoisonError::into_inner) = response;
    }

    /// Number of fetches served so far.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Acquire)
    }
}

impl HierarchySource for StaticSource {
    fn get_hierarchy(&self) -> Result<Hierarchy, FetchError> {
        self.fetches.fetch_add(1, Ordering::AcqRel);
        self.response
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Decode a `{ "hierarchy": ... }` response body.
#[cfg(feature = "json")]
pub fn parse_hierarchy(json: &str) -> Result<Hierarchy, FetchError> {
    Ok(serde_json::from_str(json)?)
}

/// Source reading a JSON response body from a file on every fetch.
#[cfg(feature = "json")]
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: std::path::PathBuf,
}

#[cfg(feature = "json")]
impl JsonFileSource {
    /// Read from `path`.
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File this source reads.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[cfg(feature = "json")]
impl HierarchySource for JsonFileSource {
    fn get_hierarchy(&self) -> Result<Hierarchy, FetchError> {
        let body = std::fs::read_to_string(&self.path)?;
        parse_hierarchy(&body)
    }
}
