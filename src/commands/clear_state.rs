//! Clear-state command implementation
//!
//! Deletes every recorded commit of one namespace, so that the next pass
//! re-applies all repositories from their pinned commit or default branch.

use anyhow::Result;
use log::info;

use k8s_deployer::state::{RedisStore, StateStore};
use k8s_deployer::suggestions;

/// Arguments for clearing a namespace's state
#[derive(Debug)]
pub struct ClearStateArgs {
    pub namespace: String,
    pub redis: String,
}

/// Execute the clear-state command
pub fn execute(args: ClearStateArgs) -> Result<()> {
    let mut store = RedisStore::connect(&args.redis)
        .map_err(|e| suggestions::store_unreachable(&args.redis, e))?;
    store.clear_namespace(&args.namespace)?;
    info!("Cleared state for namespace {}", args.namespace);
    Ok(())
}
