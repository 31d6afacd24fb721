//! Shared test utilities for integration and E2E tests.
//!
//! Provides throwaway git repositories built with the system `git` binary,
//! and a recording [`Applier`] that stands in for the cluster.
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     if !git_available() {
//!         return;
//!     }
//!     let upstream = GitRepoFixture::new().with_file("k8s/app.yaml", "kind: Service");
//!     let head = upstream.commit("initial");
//! }
//! ```

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_fs::prelude::*;
use k8s_deployer::error::Result;
use k8s_deployer::kubernetes::Applier;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_cmd::cargo::cargo_bin_cmd;
    #[allow(unused_imports)]
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::{git_available, GitRepoFixture, RecordingApplier};
}

/// Whether a usable `git` binary is on PATH.
///
/// Tests that build repositories return early when it is not.
#[allow(dead_code)]
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// A git repository in a temporary directory, with `main` as its branch.
#[allow(dead_code)]
pub struct GitRepoFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl GitRepoFixture {
    /// Initialise an empty repository.
    pub fn new() -> Self {
        let temp_dir = assert_fs::TempDir::new().expect("Failed to create temp directory");
        let fixture = Self { temp_dir };
        fixture.git(&["init", "-q"]);
        fixture.git(&["symbolic-ref", "HEAD", "refs/heads/main"]);
        fixture
    }

    /// Write a file into the working tree (not yet committed).
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.write(path, content);
        self
    }

    pub fn write(&self, path: &str, content: &str) {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
    }

    /// Stage everything and commit; returns the new commit hash.
    pub fn commit(&self, message: &str) -> String {
        self.git(&["add", "-A"]);
        self.git(&[
            "-c",
            "user.name=Deployer Test",
            "-c",
            "user.email=deployer@example.com",
            "-c",
            "commit.gpgsign=false",
            "commit",
            "-q",
            "-m",
            message,
        ]);
        self.head()
    }

    pub fn head(&self) -> String {
        self.git(&["rev-parse", "HEAD"])
    }

    /// URI to clone this repository from.
    pub fn uri(&self) -> String {
        self.temp_dir.path().to_string_lossy().to_string()
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Run git in the repository and return trimmed stdout.
    pub fn git(&self, args: &[&str]) -> String {
        let output = Command::new("git")
            .arg("-C")
            .arg(self.temp_dir.path())
            .args(args)
            .output()
            .expect("Failed to run git");
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }
}

impl Default for GitRepoFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Applier that records `(path, tag, content)` instead of deploying.
#[derive(Default)]
#[allow(dead_code)]
pub struct RecordingApplier {
    pub applied: RefCell<Vec<(PathBuf, String, String)>>,
}

#[allow(dead_code)]
impl RecordingApplier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.applied.borrow().len()
    }

    /// Paths of applied files relative to `root`, in apply order.
    pub fn relative_paths(&self, root: &Path) -> Vec<String> {
        self.applied
            .borrow()
            .iter()
            .map(|(p, _, _)| {
                p.strip_prefix(root)
                    .unwrap_or(p)
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }
}

impl Applier for RecordingApplier {
    fn apply(&self, manifest: &Path, tag: &str) -> Result<()> {
        let content = std::fs::read_to_string(manifest)?;
        self.applied
            .borrow_mut()
            .push((manifest.to_path_buf(), tag.to_string(), content));
        Ok(())
    }
}
