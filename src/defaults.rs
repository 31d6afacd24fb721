//! Default values for k8s-deployer configuration.
//!
//! This module provides centralized default values used across the
//! configuration layer and the commands, ensuring consistency and avoiding
//! duplication.

use std::path::PathBuf;

/// Namespace used when neither the configuration nor `--namespace` names one.
pub const DEFAULT_NAMESPACE: &str = "dev";

/// Branch whose tip is deployed when no other ref is known.
pub const DEFAULT_BRANCH: &str = "master";

/// Path prefix identifying deployable files inside a repository.
pub const DEFAULT_MANIFEST_PREFIX: &str = "k8s";

/// Prefix of every key written to the state store.
pub const STATE_KEY_PREFIX: &str = "k8s-deployer";

/// Name of the remote created by clone; symbolic refs are built against it.
pub const REMOTE_NAME: &str = "origin";

/// What an unset variable renders to in the configuration and manifests.
///
/// The configuration layer treats a value equal to this as absent.
pub const NO_VALUE: &str = "<no value>";

/// Returns the default root under which repositories are checked out.
pub fn default_work_dir() -> PathBuf {
    PathBuf::from("/tmp/deployer")
}
