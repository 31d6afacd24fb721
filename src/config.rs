//! # Configuration Schema and Parsing
//!
//! This module defines the deployment configuration file and the logic for
//! loading it. A configuration names the target namespace, the repositories to
//! deploy and a handful of knobs:
//!
//! ```yaml
//! namespace: "{{ .DEPLOY_ENV }}"
//! defaultBranch: main
//! manifestPrefix: k8s
//! workDir: /tmp/deployer
//! overrideRepoVar: DEPLOY_REPO
//! overrideRefVar: DEPLOY_REF
//! repositories:
//!   - name: api
//!     uri: git@github.com:example/api.git
//!   - uri: git@github.com:example/worker.git
//!     pinnedCommit: 1f3c9e0...
//! ```
//!
//! ## Loading
//!
//! [`from_file`] renders the file against the environment (see
//! [`crate::template`]) before parsing it, so any value can come from a
//! variable. A variable that is not set renders as `<no value>`, and that
//! literal is treated like an omitted key, so the documented defaults apply.
//!
//! The keys used by older configuration files (`kubernetesFolder`, `baseDir`,
//! `updateRepoVar`, `updateRefVar`, `commit`) are accepted as aliases.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::defaults::{
    default_work_dir, DEFAULT_BRANCH, DEFAULT_MANIFEST_PREFIX, DEFAULT_NAMESPACE, NO_VALUE,
};
use crate::error::{Error, Result};
use crate::resolver::OverrideSignal;
use crate::template::{self, EnvMap};

/// A repository to deploy from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    /// Human identifier; needed only to be targeted by an override signal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Clone location. Also part of the state key, so it must stay stable.
    #[serde(default)]
    pub uri: String,
    /// Commit to deploy when nothing has been recorded for this repository yet.
    #[serde(default, alias = "commit", skip_serializing_if = "Option::is_none")]
    pub pinned_commit: Option<String>,
}

/// The configuration file as written.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfig {
    #[serde(default)]
    namespace: Option<String>,
    #[serde(default)]
    repositories: Vec<Repository>,
    #[serde(default)]
    default_branch: Option<String>,
    #[serde(default, alias = "kubernetesFolder")]
    manifest_prefix: Option<String>,
    #[serde(default, alias = "baseDir")]
    work_dir: Option<String>,
    #[serde(default, alias = "updateRepoVar")]
    override_repo_var: Option<String>,
    #[serde(default, alias = "updateRefVar")]
    override_ref_var: Option<String>,
}

/// A validated configuration with every default filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Cluster namespace to deploy into.
    pub namespace: String,
    /// Repositories, in the order they are reconciled.
    pub repositories: Vec<Repository>,
    /// Branch deployed when no ref is known for a repository.
    pub default_branch: String,
    /// Path prefix of deployable files inside each repository.
    pub manifest_prefix: String,
    /// Root under which repositories are checked out.
    pub work_dir: PathBuf,
    /// Name of the variable holding the override repository name.
    pub override_repo_var: Option<String>,
    /// Name of the variable holding the override ref.
    pub override_ref_var: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            repositories: Vec::new(),
            default_branch: DEFAULT_BRANCH.to_string(),
            manifest_prefix: DEFAULT_MANIFEST_PREFIX.to_string(),
            work_dir: default_work_dir(),
            override_repo_var: None,
            override_ref_var: None,
        }
    }
}

impl Config {
    /// The override signal present in `env`, if the configuration names one.
    pub fn override_signal(&self, env: &EnvMap) -> Option<OverrideSignal> {
        OverrideSignal::from_env(
            self.override_repo_var.as_deref(),
            self.override_ref_var.as_deref(),
            env,
        )
    }
}

/// Treat empty values and unrendered variables as absent.
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && v != NO_VALUE)
}

/// Parse an already rendered configuration.
pub fn parse(yaml_content: &str) -> Result<Config> {
    let raw: RawConfig = if yaml_content.trim().is_empty() {
        RawConfig::default()
    } else {
        serde_yaml::from_str(yaml_content).map_err(|e| Error::ConfigParse {
            message: e.to_string(),
            hint: None,
        })?
    };

    let mut repositories = Vec::with_capacity(raw.repositories.len());
    for (index, repo) in raw.repositories.into_iter().enumerate() {
        let uri = repo.uri.trim().to_string();
        if uri.is_empty() || uri == NO_VALUE {
            return Err(Error::ConfigParse {
                message: format!("repository #{} has no uri", index + 1),
                hint: Some("Add 'uri:' to the repository entry".to_string()),
            });
        }
        repositories.push(Repository {
            name: present(repo.name),
            uri,
            pinned_commit: present(repo.pinned_commit),
        });
    }

    let defaults = Config::default();
    let manifest_prefix = present(raw.manifest_prefix)
        .map(|p| p.trim_end_matches('/').to_string())
        .filter(|p| !p.is_empty())
        .unwrap_or(defaults.manifest_prefix);

    Ok(Config {
        namespace: present(raw.namespace).unwrap_or(defaults.namespace),
        repositories,
        default_branch: present(raw.default_branch).unwrap_or(defaults.default_branch),
        manifest_prefix,
        work_dir: present(raw.work_dir)
            .map(PathBuf::from)
            .unwrap_or(defaults.work_dir),
        override_repo_var: present(raw.override_repo_var),
        override_ref_var: present(raw.override_ref_var),
    })
}

/// Load a configuration file, rendering it against `env` first.
pub fn from_file<P: AsRef<Path>>(path: P, env: &EnvMap) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(Error::Io)?;
    let rendered = template::render(&content, env)?;
    parse(&rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
namespace: staging
defaultBranch: main
manifestPrefix: deploy/k8s/
workDir: /var/lib/deployer
overrideRepoVar: DEPLOY_REPO
overrideRefVar: DEPLOY_REF
repositories:
  - name: api
    uri: git@github.com:example/api.git
  - uri: git@github.com:example/worker.git
    pinnedCommit: 1f3c9e0
"#;
        let config = parse(yaml).unwrap();
        assert_eq!(config.namespace, "staging");
        assert_eq!(config.default_branch, "main");
        assert_eq!(config.manifest_prefix, "deploy/k8s");
        assert_eq!(config.work_dir, PathBuf::from("/var/lib/deployer"));
        assert_eq!(config.override_repo_var.as_deref(), Some("DEPLOY_REPO"));
        assert_eq!(config.override_ref_var.as_deref(), Some("DEPLOY_REF"));
        assert_eq!(config.repositories.len(), 2);
        assert_eq!(config.repositories[0].name.as_deref(), Some("api"));
        assert_eq!(config.repositories[0].pinned_commit, None);
        assert_eq!(config.repositories[1].name, None);
        assert_eq!(config.repositories[1].pinned_commit.as_deref(), Some("1f3c9e0"));
    }

    #[test]
    fn test_parse_applies_defaults() {
        let config = parse("repositories: []").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.namespace, "dev");
        assert_eq!(config.default_branch, "master");
        assert_eq!(config.manifest_prefix, "k8s");
        assert_eq!(config.work_dir, PathBuf::from("/tmp/deployer"));
    }

    #[test]
    fn test_parse_empty_config() {
        assert_eq!(parse("").unwrap(), Config::default());
    }

    #[test]
    fn test_parse_no_value_counts_as_absent() {
        let yaml = r#"
namespace: "<no value>"
defaultBranch: ""
repositories:
  - name: "<no value>"
    uri: git@host:org/app.git
"#;
        let config = parse(yaml).unwrap();
        assert_eq!(config.namespace, "dev");
        assert_eq!(config.default_branch, "master");
        assert_eq!(config.repositories[0].name, None);
    }

    #[test]
    fn test_parse_legacy_keys() {
        let yaml = r#"
kubernetesFolder: manifests
baseDir: /srv/checkouts
updateRepoVar: REPO
updateRefVar: REF
repositories:
  - uri: git@host:org/app.git
    commit: abc123
"#;
        let config = parse(yaml).unwrap();
        assert_eq!(config.manifest_prefix, "manifests");
        assert_eq!(config.work_dir, PathBuf::from("/srv/checkouts"));
        assert_eq!(config.override_repo_var.as_deref(), Some("REPO"));
        assert_eq!(config.override_ref_var.as_deref(), Some("REF"));
        assert_eq!(config.repositories[0].pinned_commit.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_parse_missing_uri_fails() {
        let err = parse("repositories:\n  - name: api\n").unwrap_err();
        let display = err.to_string();
        assert!(display.contains("repository #1 has no uri"));
        assert!(display.contains("hint:"));
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let err = parse("repositories: [unclosed").unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
    }

    #[test]
    fn test_from_file_nonexistent() {
        let result = from_file("/nonexistent/deployer.yaml", &EnvMap::new());
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_from_file_renders_environment() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("deployer.yaml");
        fs::write(
            &path,
            "namespace: \"{{ .DEPLOY_ENV }}\"\ndefaultBranch: \"{{ .UNSET_BRANCH }}\"\nrepositories:\n  - uri: git@host:org/app.git\n",
        )
        .unwrap();

        let env: EnvMap = [("DEPLOY_ENV".to_string(), "qa".to_string())]
            .into_iter()
            .collect();
        let config = from_file(&path, &env).unwrap();
        assert_eq!(config.namespace, "qa");
        assert_eq!(config.default_branch, "master");
    }

    #[test]
    fn test_override_signal_uses_configured_names() {
        let config = parse("overrideRepoVar: R\noverrideRefVar: F\n").unwrap();
        let env: EnvMap = [
            ("R".to_string(), "api".to_string()),
            ("F".to_string(), "abc".to_string()),
        ]
        .into_iter()
        .collect();
        let signal = config.override_signal(&env).unwrap();
        assert_eq!(signal.repository, "api");
        assert_eq!(signal.r#ref, "abc");

        assert_eq!(Config::default().override_signal(&env), None);
    }

    #[test]
    #[serial]
    fn test_process_environment_drives_config_and_override() {
        env::set_var("K8S_DEPLOYER_TEST_NS", "review-42");
        env::set_var("K8S_DEPLOYER_TEST_REPO", "api");
        env::set_var("K8S_DEPLOYER_TEST_REF", "refs/tags/v1.2.0");

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("deployer.yaml");
        fs::write(
            &path,
            "namespace: \"{{ .K8S_DEPLOYER_TEST_NS }}\"\n\
             overrideRepoVar: K8S_DEPLOYER_TEST_REPO\n\
             overrideRefVar: K8S_DEPLOYER_TEST_REF\n\
             repositories:\n  - name: api\n    uri: git@host:org/api.git\n",
        )
        .unwrap();

        let process_env = template::env_to_map();
        let config = from_file(&path, &process_env);
        let signal = config
            .as_ref()
            .ok()
            .and_then(|c| c.override_signal(&process_env));

        env::remove_var("K8S_DEPLOYER_TEST_NS");
        env::remove_var("K8S_DEPLOYER_TEST_REPO");
        env::remove_var("K8S_DEPLOYER_TEST_REF");

        assert_eq!(config.unwrap().namespace, "review-42");
        let signal = signal.unwrap();
        assert_eq!(signal.repository, "api");
        assert_eq!(signal.r#ref, "refs/tags/v1.2.0");
    }
}
