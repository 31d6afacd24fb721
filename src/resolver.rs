//! # Ref Resolution
//!
//! Decides, for one repository, which ref a deployment pass should check out
//! and which concrete commit counts as "previously applied".
//!
//! Rules, first match wins:
//!
//! 1. An override signal naming this repository forces its ref.
//! 2. A stored ref (what is actually running) is used when present.
//! 3. Otherwise the pinned commit from the configuration is used as a seed.
//! 4. Otherwise the tip of the default branch on the remote is deployed.
//!
//! The previously applied commit is whatever rules 2 and 3 would have
//! produced, independent of whether an override fired. It is compared against
//! the concrete commit that the fetch resolves to.

use std::fmt;

use crate::config::Repository;
use crate::defaults::REMOTE_NAME;
use crate::template::EnvMap;

/// A revision to check out.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RefSpec {
    /// A fully-qualified reference such as `refs/remotes/origin/main`.
    Symbolic(String),
    /// A commit hash.
    Concrete(String),
}

impl RefSpec {
    /// Tag a user-supplied ref string: anything under `refs/` is symbolic.
    pub fn parse(value: &str) -> Self {
        if value.starts_with("refs/") {
            RefSpec::Symbolic(value.to_string())
        } else {
            RefSpec::Concrete(value.to_string())
        }
    }

    /// The remote-tracking reference for the tip of `branch`.
    pub fn default_branch(branch: &str) -> Self {
        RefSpec::Symbolic(format!("refs/remotes/{}/{}", REMOTE_NAME, branch))
    }

    pub fn as_str(&self) -> &str {
        match self {
            RefSpec::Symbolic(name) => name,
            RefSpec::Concrete(hash) => hash,
        }
    }
}

impl fmt::Display for RefSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Out-of-band request to deploy one repository at one ref for this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideSignal {
    /// Name of the targeted repository.
    pub repository: String,
    /// Ref to deploy for it.
    pub r#ref: String,
}

impl OverrideSignal {
    /// Read the signal from the variables named `repo_var` and `ref_var`.
    ///
    /// Returns `None` unless both names are given and both values are non-empty.
    pub fn from_env(repo_var: Option<&str>, ref_var: Option<&str>, env: &EnvMap) -> Option<Self> {
        let repository = env.get(repo_var?)?.trim();
        let r#ref = env.get(ref_var?)?.trim();
        if repository.is_empty() || r#ref.is_empty() {
            return None;
        }

        Some(Self {
            repository: repository.to_string(),
            r#ref: r#ref.to_string(),
        })
    }

    /// Whether this signal targets `repo`. Unnamed repositories never match.
    pub fn targets(&self, repo: &Repository) -> bool {
        repo.name.as_deref() == Some(self.repository.as_str())
    }
}

/// Outcome of resolving one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// What to check out.
    pub target: RefSpec,
    /// The ref considered already applied, if any.
    pub previous: Option<String>,
}

/// Pick the ref to deploy for `repo`.
///
/// `stored` is the value read from the state store under this repository's
/// key, if any. Never fails: the default branch is the last resort.
///
/// `previous` is the stored or pinned commit even when an override targets
/// `repo`, so overriding to the commit already deployed applies nothing.
pub fn resolve(
    signal: Option<&OverrideSignal>,
    repo: &Repository,
    stored: Option<&str>,
    default_branch: &str,
) -> Resolution {
    let seed = stored
        .filter(|s| !s.is_empty())
        .map(|s| RefSpec::Concrete(s.to_string()))
        .or_else(|| {
            repo.pinned_commit
                .as_deref()
                .filter(|s| !s.is_empty())
                .map(RefSpec::parse)
        });
    let previous = seed.as_ref().map(|s| s.as_str().to_string());

    let target = match signal {
        Some(signal) if signal.targets(repo) => RefSpec::parse(&signal.r#ref),
        _ => seed.unwrap_or_else(|| RefSpec::default_branch(default_branch)),
    };

    Resolution { target, previous }
}
