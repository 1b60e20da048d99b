//! Deterministic headless page loading for tests.
//!
//! A [`WebClient`] fetches a document through a pluggable [`ResourceFetcher`],
//! builds a DOM, and drains the page's scripts in document order against a
//! per-page scripting runtime. A script that changes the page location cancels
//! every task still queued on the old page (its `onload` handler included) and
//! the client continues on a fresh page session for the new URL.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::error::Error as StdError;
use std::fmt;
use std::rc::Rc;

use url::Url;

mod bridge;
mod client;
mod dom;
mod error_report;
mod fetch;
mod host;
mod html;
mod js_regex;
mod lifecycle;
mod loader;
mod navigation;
mod script;
mod session;
mod task_queue;
mod trace;

pub use client::WebClient;
pub use error_report::{
    FaultKind, FetchFailure, LoadError, RuntimeFault, ScriptExecutionError, ScriptFailureCause,
    SourceLocation, wrap_script_error,
};
pub use fetch::{FetchIoError, HttpMethod, MockConnection, ResourceFetcher, WebRequest, WebResponse};
pub use lifecycle::{PageResult, PageStatus};
pub use navigation::NavigationKind;
pub use session::Page;

use dom::{Dom, NodeId};
use host::{HostRef, WrapperRegistry};
use navigation::{NavigationGate, NavigationRequest};
use script::{Flow, Interpreter, ObjectClass, ScriptRuntime, Value, new_array, new_object};
use session::PageSession;
use task_queue::{ScriptTask, ScriptTaskQueue};
use trace::TraceState;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    HtmlParse(String),
    InvalidUrl(String),
    Load(LoadError),
    Script(ScriptExecutionError),
    ElementNotFound(String),
    NavigationLimit { url: String, limit: usize },
    InvalidConfig(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HtmlParse(msg) => write!(f, "html parse error: {msg}"),
            Self::InvalidUrl(url) => write!(f, "invalid url: {url}"),
            Self::Load(err) => write!(f, "{err}"),
            Self::Script(err) => write!(f, "{err}"),
            Self::ElementNotFound(id) => write!(f, "element not found: {id}"),
            Self::NavigationLimit { url, limit } => write!(
                f,
                "navigation limit of {limit} exceeded while loading {url}"
            ),
            Self::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Load(err) => Some(err),
            Self::Script(err) => Some(err),
            _ => None,
        }
    }
}

impl From<LoadError> for Error {
    fn from(value: LoadError) -> Self {
        Self::Load(value)
    }
}

impl From<ScriptExecutionError> for Error {
    fn from(value: ScriptExecutionError) -> Self {
        Self::Script(value)
    }
}

pub(crate) fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|err| Error::InvalidUrl(format!("{raw}: {err}")))
}
