//! # Cluster Operations
//!
//! Everything that touches the cluster goes through the `kubectl` binary. The
//! [`ClusterOperations`] trait is the seam that lets the rest of the crate be
//! tested without a cluster; [`Kubectl`] is the real implementation.
//!
//! [`ManifestApplier`] sits on top: it renders a manifest against the
//! environment (with `TAG` set to the commit being deployed), writes the
//! result to a temporary file in the work dir and hands that file to the
//! cluster.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::{info, warn};

use crate::error::{Error, Result};
use crate::template::{self, EnvMap};

/// Trait for cluster operations - allows mocking in tests
pub trait ClusterOperations {
    /// Whether `namespace` exists.
    fn namespace_exists(&self, namespace: &str) -> bool;

    /// Create `namespace`.
    fn create_namespace(&self, namespace: &str) -> Result<()>;

    /// Apply the manifest at `file` in `namespace`.
    fn apply(&self, file: &Path, namespace: &str) -> Result<()>;
}

/// The default implementation of `ClusterOperations`, which runs `kubectl`.
#[derive(Debug, Clone, Default)]
pub struct Kubectl;

impl ClusterOperations for Kubectl {
    fn namespace_exists(&self, namespace: &str) -> bool {
        Command::new("kubectl")
            .args(["get", "namespace", namespace])
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    fn create_namespace(&self, namespace: &str) -> Result<()> {
        let output = Command::new("kubectl")
            .args(["create", "namespace", namespace])
            .output()
            .map_err(|e| Error::Namespace {
                namespace: namespace.to_string(),
                stderr: e.to_string(),
            })?;
        log_stdout(&output.stdout);

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(
                "Command 'kubectl create namespace {}' returned with non-zero code: {}",
                namespace, output.status
            );
            return Err(Error::Namespace {
                namespace: namespace.to_string(),
                stderr,
            });
        }

        Ok(())
    }

    fn apply(&self, file: &Path, namespace: &str) -> Result<()> {
        let output = Command::new("kubectl")
            .args(["-n", namespace, "apply", "-f"])
            .arg(file)
            .output()
            .map_err(|e| Error::Apply {
                manifest: file.display().to_string(),
                namespace: namespace.to_string(),
                stderr: e.to_string(),
            })?;
        log_stdout(&output.stdout);

        if !output.status.success() {
            warn!(
                "Command 'kubectl -n {} apply -f {}' returned with non-zero code: {}",
                namespace,
                file.display(),
                output.status
            );
            return Err(Error::Apply {
                manifest: file.display().to_string(),
                namespace: namespace.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}

fn log_stdout(stdout: &[u8]) {
    let text = String::from_utf8_lossy(stdout);
    let text = text.trim_matches(['\r', '\n']);
    if !text.is_empty() {
        info!("{}", text);
    }
}

/// Create `namespace` unless it already exists.
pub fn ensure_namespace(cluster: &dyn ClusterOperations, namespace: &str) -> Result<()> {
    if cluster.namespace_exists(namespace) {
        return Ok(());
    }
    info!("Creating namespace {}", namespace);
    cluster.create_namespace(namespace)
}

/// Anything that can deploy one manifest file.
pub trait Applier {
    /// Deploy `manifest`, which belongs to commit `tag` (empty for local files).
    fn apply(&self, manifest: &Path, tag: &str) -> Result<()>;
}

/// Renders manifests and applies them through a [`ClusterOperations`].
pub struct ManifestApplier<C: ClusterOperations> {
    cluster: C,
    namespace: String,
    env: EnvMap,
    scratch_dir: PathBuf,
}

impl<C: ClusterOperations> ManifestApplier<C> {
    /// `env` should already contain `NAMESPACE`. Rendered files go to `scratch_dir`.
    pub fn new(cluster: C, namespace: &str, env: EnvMap, scratch_dir: PathBuf) -> Self {
        Self {
            cluster,
            namespace: namespace.to_string(),
            env,
            scratch_dir,
        }
    }

    pub fn cluster(&self) -> &C {
        &self.cluster
    }
}

impl<C: ClusterOperations> Applier for ManifestApplier<C> {
    fn apply(&self, manifest: &Path, tag: &str) -> Result<()> {
        let source = fs::read_to_string(manifest)?;

        let mut env = self.env.clone();
        env.insert("TAG".to_string(), tag.to_string());
        let rendered = template::render(&source, &env)?;

        fs::create_dir_all(&self.scratch_dir)?;
        let mut out = tempfile::Builder::new()
            .prefix(tag)
            .tempfile_in(&self.scratch_dir)?;
        out.write_all(rendered.as_bytes())?;
        out.flush()?;

        self.cluster.apply(out.path(), &self.namespace)
    }
}
