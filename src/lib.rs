//! # k8s-deployer Library
//!
//! This library provides the core of the `k8s-deployer` command-line tool: a
//! poll-and-apply continuous deployment pass that keeps a cluster namespace in
//! sync with a list of git repositories.
//!
//! ## Quick Example
//!
//! ```
//! use k8s_deployer::config::Repository;
//! use k8s_deployer::resolver::{resolve, RefSpec};
//!
//! let repo = Repository {
//!     name: Some("app".to_string()),
//!     uri: "git@host:org/app.git".to_string(),
//!     pinned_commit: None,
//! };
//!
//! // Nothing recorded yet: deploy the tip of the default branch.
//! let resolution = resolve(None, &repo, None, "main");
//! assert_eq!(resolution.target, RefSpec::default_branch("main"));
//! assert_eq!(resolution.previous, None);
//! ```
//!
//! ## Core Concepts
//!
//! - **Configuration (`config`)**: The YAML file naming the namespace and the
//!   repositories, rendered against the environment before parsing.
//! - **Ref resolution (`resolver`)**: Picks the ref to deploy per repository
//!   from an override signal, recorded state, a pinned commit, or the default
//!   branch.
//! - **Fetching (`repository`, `git`)**: Fresh full clone, ref resolution to a
//!   concrete commit, and extraction of only the manifest files.
//! - **State (`state`)**: The last applied commit per namespace and repository.
//! - **Cluster (`kubernetes`, `template`)**: Rendering and applying manifests
//!   through `kubectl`.
//! - **Driver (`reconcile`)**: One pass over every repository, applying only
//!   what changed.
//!
//! ## Execution Flow
//!
//! For each repository, in configuration order:
//!
//! 1.  **Resolve**: Decide the ref to deploy and the previously applied commit.
//! 2.  **Fetch**: Clone and extract the manifests at that ref.
//! 3.  **Apply**: Apply each manifest if the commit changed.
//! 4.  **Record**: Store the commit for the next pass.
//!
//! The first error from fetching or applying aborts the pass.

pub mod config;
pub mod defaults;
pub mod error;
pub mod git;
pub mod kubernetes;
pub mod reconcile;
pub mod repository;
pub mod resolver;
pub mod state;
pub mod suggestions;
pub mod template;
