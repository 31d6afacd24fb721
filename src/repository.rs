//! # Repository Fetching
//!
//! This module provides the [`Fetcher`] seam used by the reconciliation driver
//! and [`GitFetcher`], its implementation on top of the system `git` binary.
//!
//! A fetch always starts from scratch: the repository's directory under the
//! work dir is wiped, the remote is cloned in full, and the requested ref is
//! resolved to a concrete commit. Only the files of that commit whose path
//! starts with the manifest prefix are written to disk, with their recorded
//! file mode. Symlinks are never materialized or applied. Each written file is handed to a callback as soon as it exists,
//! together with the resolved commit hash, so the caller can apply manifests
//! one by one while the tree is being walked.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::{Error, Result};
use crate::git::{self, EntryKind, TreeEntry};
use crate::resolver::RefSpec;

/// Callback invoked for each materialized manifest with `(local path, commit)`.
pub type ManifestCallback<'a> = dyn FnMut(&Path, &str) -> Result<()> + 'a;

/// Trait for fetching manifests from a repository - allows mocking in tests
pub trait Fetcher {
    /// Check out the files under `manifest_prefix` of `uri` at `target`.
    ///
    /// Calls `on_manifest` once per extracted file, always with the same
    /// commit hash, and returns that hash.
    fn fetch(
        &self,
        uri: &str,
        target: &RefSpec,
        manifest_prefix: &str,
        on_manifest: &mut ManifestCallback<'_>,
    ) -> Result<String>;
}

/// The default implementation of `Fetcher`, which shells out to `git`.
pub struct GitFetcher {
    work_dir: PathBuf,
}

impl GitFetcher {
    pub fn new(work_dir: PathBuf) -> Self {
        Self { work_dir }
    }

    /// Where `uri` gets checked out.
    pub fn checkout_dir(&self, uri: &str) -> PathBuf {
        self.work_dir.join(git::repo_dir_name(uri))
    }
}

impl Fetcher for GitFetcher {
    fn fetch(
        &self,
        uri: &str,
        target: &RefSpec,
        manifest_prefix: &str,
        on_manifest: &mut ManifestCallback<'_>,
    ) -> Result<String> {
        let name = git::repo_dir_name(uri);
        if name.is_empty() || name == "." || name == ".." {
            return Err(Error::GitClone {
                url: uri.to_string(),
                r#ref: target.as_str().to_string(),
                message: format!("cannot derive a checkout directory from {:?}", uri),
                hint: Some("Repository URIs must end in a repository name".to_string()),
            });
        }
        let dir = self.work_dir.join(name);
        info!("{} {}", uri, target);

        git::clone_full(uri, target.as_str(), &dir)?;

        let commit = match target {
            RefSpec::Symbolic(name) => git::resolve_reference(&dir, uri, name)?,
            RefSpec::Concrete(hash) => git::find_commit(&dir, uri, hash)?,
        };
        debug!("{} resolved {} to {}", uri, target, commit);

        for entry in git::list_tree(&dir, uri, &commit)? {
            if entry.kind != EntryKind::Blob || !entry.path.starts_with(manifest_prefix) {
                continue;
            }
            if entry.is_symlink() {
                debug!("{} skipping symlink {}", uri, entry.path);
                continue;
            }

            let local = dir.join(&entry.path);
            materialize(&dir, uri, &entry, &local)?;
            on_manifest(&local, &commit)?;
        }

        Ok(commit)
    }
}

/// Write one blob entry to `local` with its recorded mode.
fn materialize(repo_dir: &Path, uri: &str, entry: &TreeEntry, local: &Path) -> Result<()> {
    if let Some(parent) = local.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = git::read_blob(repo_dir, uri, &entry.object)?;
    fs::write(local, &content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(local, fs::Permissions::from_mode(entry.mode & 0o777))?;
    }

    Ok(())
}
