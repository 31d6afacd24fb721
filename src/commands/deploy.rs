//! Deploy command implementation
//!
//! Runs one deployment pass:
//! 1. Load and render the configuration
//! 2. Connect to the state store, when one is given
//! 3. Make sure the target namespace exists
//! 4. Apply the local manifests, then reconcile every configured repository
//! 5. Write the artifact, when requested

use anyhow::Result;
use clap::Args;
use log::info;
use std::path::PathBuf;

use k8s_deployer::config;
use k8s_deployer::kubernetes::{self, Kubectl, ManifestApplier};
use k8s_deployer::reconcile::{self, Artifact, Reconciler};
use k8s_deployer::repository::GitFetcher;
use k8s_deployer::state::RedisStore;
use k8s_deployer::suggestions;
use k8s_deployer::template;

/// Arguments for a deployment pass
#[derive(Args, Debug)]
pub struct DeployArgs {
    /// Path to the deployment configuration file
    #[arg(short, long, value_name = "PATH", env = "K8S_DEPLOYER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Redis address (host:port) used to record what is deployed; state is
    /// not persisted when omitted
    #[arg(long, value_name = "ADDR")]
    pub redis: Option<String>,

    /// Namespace to deploy into, overriding the configuration
    #[arg(short, long, value_name = "NAMESPACE")]
    pub namespace: Option<String>,

    /// Write a YAML record of what was deployed to this file
    #[arg(long, value_name = "PATH")]
    pub artifact: Option<PathBuf>,
}

/// Execute a deployment pass
pub fn execute(args: DeployArgs) -> Result<()> {
    let config_path = args.config.ok_or_else(suggestions::config_required)?;
    if !config_path.exists() {
        return Err(suggestions::config_not_found(&config_path));
    }

    let env = template::env_to_map();
    let mut config = config::from_file(&config_path, &env)?;
    if let Some(namespace) = args.namespace.filter(|n| !n.is_empty()) {
        config.namespace = namespace;
    }

    let mut store = match &args.redis {
        Some(addr) => {
            Some(RedisStore::connect(addr).map_err(|e| suggestions::store_unreachable(addr, e))?)
        }
        None => None,
    };

    info!("Namespace: {}", config.namespace);

    let cluster = Kubectl;
    kubernetes::ensure_namespace(&cluster, &config.namespace)?;

    let mut manifest_env = env.clone();
    manifest_env.insert("NAMESPACE".to_string(), config.namespace.clone());

    let mut artifact = Artifact::new(&config.manifest_prefix);
    let cwd = std::env::current_dir()?;
    if let Some(local) = reconcile::local_checkout(&cwd)? {
        artifact.repositories.push(local);
    }

    let applier = ManifestApplier::new(
        cluster,
        &config.namespace,
        manifest_env,
        config.work_dir.clone(),
    );
    let fetcher = GitFetcher::new(config.work_dir.clone());

    let mut reconciler =
        Reconciler::new(&config, &fetcher, &applier).with_override(config.override_signal(&env));
    if let Some(store) = store.as_mut() {
        reconciler = reconciler.with_store(store);
    }

    let deployed = reconciler.run(&cwd.join(&config.manifest_prefix))?;
    artifact.repositories.extend(deployed);

    if let Some(path) = &args.artifact {
        artifact.write(path)?;
        info!("Wrote {}", path.display());
    }

    Ok(())
}
