//! # Reconciliation Driver
//!
//! One deployment pass over every configured repository, in declaration
//! order:
//!
//! 1. Look up the last applied commit in the state store (if one is
//!    configured) under `k8s-deployer/<namespace>/<uri>`.
//! 2. Resolve the ref to deploy (see [`crate::resolver`]).
//! 3. Fetch the manifests at that ref. Each extracted file is applied only if
//!    the concrete commit differs from the previously applied one.
//! 4. Record the concrete commit in the state store. A failed write is logged
//!    and otherwise ignored: the deployment already happened.
//! 5. Append `(name, uri, commit)` to the result.
//!
//! Any fetch or apply error aborts the whole pass. Before the loop, manifests
//! found directly in the local manifest directory are applied unconditionally.

use std::fs;
use std::path::Path;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::config::{Config, Repository};
use crate::error::Result;
use crate::git;
use crate::kubernetes::Applier;
use crate::repository::Fetcher;
use crate::resolver::{self, OverrideSignal};
use crate::state::{state_key, StateStore};

/// What was deployed for one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployedRepository {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub uri: String,
    pub commit: String,
}

/// Provenance record of one pass, written with `--artifact`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub manifest_prefix: String,
    pub repositories: Vec<DeployedRepository>,
}

impl Artifact {
    pub fn new(manifest_prefix: &str) -> Self {
        Self {
            manifest_prefix: manifest_prefix.to_string(),
            repositories: Vec::new(),
        }
    }

    /// Serialize as YAML to `path`.
    pub fn write(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;
        Ok(())
    }
}

/// If `dir` is a git checkout, describe what it has checked out.
///
/// The name is the directory's base name, the URI is its `origin` remote.
pub fn local_checkout(dir: &Path) -> Result<Option<DeployedRepository>> {
    if !dir.join(".git").exists() {
        return Ok(None);
    }

    let absolute = dir.canonicalize()?;
    let name = absolute
        .file_name()
        .map(|n| n.to_string_lossy().to_string());

    Ok(Some(DeployedRepository {
        name,
        uri: git::local_remote(dir)?,
        commit: git::local_head(dir)?,
    }))
}

/// Drives one deployment pass.
pub struct Reconciler<'a> {
    config: &'a Config,
    fetcher: &'a dyn Fetcher,
    applier: &'a dyn Applier,
    store: Option<&'a mut dyn StateStore>,
    signal: Option<OverrideSignal>,
}

impl<'a> Reconciler<'a> {
    pub fn new(config: &'a Config, fetcher: &'a dyn Fetcher, applier: &'a dyn Applier) -> Self {
        Self {
            config,
            fetcher,
            applier,
            store: None,
            signal: None,
        }
    }

    /// Persist and consult state in `store`. Without one, every pass starts
    /// from the pinned commits and default branch.
    pub fn with_store(mut self, store: &'a mut dyn StateStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_override(mut self, signal: Option<OverrideSignal>) -> Self {
        self.signal = signal;
        self
    }

    /// Apply the local manifests in `local_manifests`, then reconcile every
    /// configured repository.
    pub fn run(&mut self, local_manifests: &Path) -> Result<Vec<DeployedRepository>> {
        self.apply_local_manifests(local_manifests)?;

        let config = self.config;
        let mut deployed = Vec::with_capacity(config.repositories.len());
        for repo in &config.repositories {
            deployed.push(self.reconcile_repository(repo)?);
        }
        Ok(deployed)
    }

    /// Apply every file directly inside `dir`, in file name order.
    ///
    /// Returns how many were applied. A missing directory applies nothing.
    pub fn apply_local_manifests(&self, dir: &Path) -> Result<usize> {
        if !dir.is_dir() {
            info!("No local manifests at {}", dir.display());
            return Ok(0);
        }

        let mut applied = 0;
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            info!("{}", entry.path().display());
            self.applier.apply(entry.path(), "")?;
            applied += 1;
        }
        Ok(applied)
    }

    /// Bring one repository to its resolved ref.
    pub fn reconcile_repository(&mut self, repo: &Repository) -> Result<DeployedRepository> {
        let key = state_key(&self.config.namespace, &repo.uri);

        let stored = match self.store.as_mut() {
            Some(store) => store.get(&key).unwrap_or_else(|e| {
                warn!("{}; treating as no recorded state", e);
                None
            }),
            None => None,
        };

        let resolution = resolver::resolve(
            self.signal.as_ref(),
            repo,
            stored.as_deref(),
            &self.config.default_branch,
        );
        debug!(
            "{}: target {}, previously applied {}",
            repo.uri,
            resolution.target,
            resolution.previous.as_deref().unwrap_or("nothing")
        );

        let applier = self.applier;
        let previous = resolution.previous.as_deref();
        let mut applied = 0usize;
        let commit = self.fetcher.fetch(
            &repo.uri,
            &resolution.target,
            &self.config.manifest_prefix,
            &mut |path, commit| {
                let file = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                info!("{} {} {}", repo.uri, commit, file);
                if previous != Some(commit) {
                    applier.apply(path, commit)?;
                    applied += 1;
                }
                Ok(())
            },
        )?;

        if applied == 0 {
            info!("{} already at {}, nothing applied", repo.uri, commit);
        } else {
            info!("{} now at {}, {} manifest(s) applied", repo.uri, commit, applied);
        }

        if let Some(store) = self.store.as_mut() {
            if let Err(e) = store.set(&key, &commit) {
                warn!("Could not record state: {}", e);
            }
        }

        Ok(DeployedRepository {
            name: repo.name.clone(),
            uri: repo.uri.clone(),
            commit,
        })
    }
}
