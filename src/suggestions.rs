//! # Error Suggestions
//!
//! Helper functions for command-level errors that should tell the operator
//! what went wrong AND how to fix it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use k8s_deployer::suggestions;
//!
//! // Instead of:
//! anyhow::bail!("Configuration file not found: {}", path.display());
//!
//! // Use:
//! return Err(suggestions::config_not_found(path));
//! ```

use std::path::Path;

/// Generate an error for when no configuration file was given.
pub fn config_required() -> anyhow::Error {
    anyhow::anyhow!(
        "Missing required option: --config\n\n\
         hint: Pass the deployment configuration with -c/--config <PATH>\n\
         hint: Or set the K8S_DEPLOYER_CONFIG environment variable\n\
         hint: --clear-state is the only mode that runs without a configuration"
    )
}

/// Generate an error for when the configuration file is not found.
pub fn config_not_found(path: &Path) -> anyhow::Error {
    anyhow::anyhow!(
        "Configuration file not found: {path}\n\n\
         hint: Check the path given to -c/--config\n\
         hint: Relative paths are resolved from the current directory",
        path = path.display()
    )
}

/// Generate an error for when the state store cannot be reached.
pub fn store_unreachable(addr: &str, error: impl std::fmt::Display) -> anyhow::Error {
    anyhow::anyhow!(
        "{error}\n\n\
         hint: Check that Redis is listening on {addr}\n\
         hint: Omit --redis to deploy without recording state",
    )
}
