//! # Error Handling
//!
//! This module defines the centralized error type for `k8s-deployer`. It uses
//! the `thiserror` library to build a single `Error` enum covering every
//! failure a deployment pass can run into, with descriptive messages that are
//! logged verbatim by the binary before it exits non-zero.
//!
//! ## Taxonomy
//!
//! - **Configuration** (`ConfigParse`, `Yaml`, `Template`): malformed or missing
//!   configuration. Raised before any side effect.
//! - **State store** (`StoreUnavailable`, `Store`): the store could not be
//!   reached at startup (fatal), or a single key operation failed (callers
//!   downgrade this to a warning).
//! - **Source control** (`GitClone`, `GitCommand`, `CommitNotFound`): fetching
//!   or resolving a repository failed. Always fatal for the run.
//! - **Cluster** (`Apply`, `Namespace`): the external cluster tool exited
//!   non-zero. Always fatal; the captured stderr is carried along.
//!
//! There is no retry anywhere. The whole process is expected to be re-invoked.

use thiserror::Error;

/// Main error type for k8s-deployer operations
#[derive(Error, Debug)]
pub enum Error {
    /// The configuration file could not be understood.
    ///
    /// Optionally carries a hint about how to fix it.
    #[error("Configuration error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// No connection to the state store could be established.
    #[error("State store unavailable at {addr}: {message}")]
    StoreUnavailable { addr: String, message: String },

    /// A read or write of a single state key failed.
    #[error("State store error for {key}: {message}")]
    Store { key: String, message: String },

    /// Cloning a repository failed (unreachable remote, rejected credentials).
    #[error("Git clone error for {url}@{r#ref}: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    GitClone {
        url: String,
        r#ref: String,
        message: String,
        /// Optional hint for how to resolve the clone issue
        hint: Option<String>,
    },

    /// A git command other than clone failed.
    #[error("Git command failed for {url}: {command} - {stderr}")]
    GitCommand {
        command: String,
        url: String,
        stderr: String,
    },

    /// The requested ref does not resolve to a commit in the fetched history.
    #[error("Could not find commit {r#ref} in {url}")]
    CommitNotFound { url: String, r#ref: String },

    /// The cluster tool rejected a manifest.
    #[error("Apply of {manifest} to namespace {namespace} failed: {stderr}")]
    Apply {
        manifest: String,
        namespace: String,
        stderr: String,
    },

    /// The target namespace could not be created.
    #[error("Could not create namespace {namespace}: {stderr}")]
    Namespace { namespace: String, stderr: String },

    /// A manifest or the configuration could not be rendered.
    #[error("Template processing error: {message}{}", variable.as_ref().map(|v| format!(" (variable: {})", v)).unwrap_or_default())]
    Template {
        message: String,
        /// The template variable that caused the error, if applicable
        variable: Option<String>,
    },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
