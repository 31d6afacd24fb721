use std::ffi::OsStr;
use std::fs;
use std::path::Path;
use std::process::Command;

use crate::defaults::REMOTE_NAME;
use crate::error::{Error, Result};

/// Kind of object a tree entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Blob,
    Tree,
    /// A submodule.
    Commit,
}

/// One line of `git ls-tree -r`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Git file mode, e.g. `0o100644`, `0o100755` or `0o120000` for symlinks.
    pub mode: u32,
    pub kind: EntryKind,
    pub object: String,
    /// Path relative to the repository root, `/`-separated.
    pub path: String,
}

impl TreeEntry {
    pub fn is_symlink(&self) -> bool {
        self.mode & 0o170000 == 0o120000
    }
}

/// Directory name a repository is checked out under: the last path segment
/// of the URI with any `.git` suffix removed.
pub fn repo_dir_name(uri: &str) -> String {
    let trimmed = uri.trim_end_matches('/');
    let last = trimmed
        .rsplit(['/', ':'])
        .next()
        .unwrap_or(trimmed);
    last.strip_suffix(".git").unwrap_or(last).to_string()
}

/// Clone a repository with its full history, without checking anything out.
///
/// This uses the system git command, which automatically handles:
/// - SSH keys held by ssh-agent or found in ~/.ssh/
/// - Git credential helpers
/// - Any authentication configured in ~/.gitconfig
///
/// Any existing directory at `target_dir` is removed first.
pub fn clone_full(url: &str, ref_name: &str, target_dir: &Path) -> Result<()> {
    if target_dir.exists() {
        fs::remove_dir_all(target_dir)?;
    }
    if let Some(parent) = target_dir.parent() {
        fs::create_dir_all(parent)?;
    }

    let output = Command::new("git")
        .args(["clone", "--quiet", "--no-checkout", "--origin", REMOTE_NAME, url])
        .arg(target_dir)
        .output()
        .map_err(|e| Error::GitClone {
            url: url.to_string(),
            r#ref: ref_name.to_string(),
            message: e.to_string(),
            hint: Some("Is git installed and on PATH?".to_string()),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);

        let hint = if stderr.contains("Authentication failed")
            || stderr.contains("Permission denied")
            || stderr.contains("Could not read from remote repository")
        {
            Some(
                "Make sure the deploy key is loaded in ssh-agent (ssh-add -l) \
                 and has read access to the repository"
                    .to_string(),
            )
        } else {
            None
        };

        return Err(Error::GitClone {
            url: url.to_string(),
            r#ref: ref_name.to_string(),
            message: stderr.trim().to_string(),
            hint,
        });
    }

    Ok(())
}

/// Run `git -C <dir> <args>` and return stdout.
fn run<I, S>(dir: &Path, url: &str, args: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args: Vec<_> = args.into_iter().map(|a| a.as_ref().to_os_string()).collect();
    let command = args
        .iter()
        .map(|a| a.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ");

    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(&args)
        .output()
        .map_err(|e| Error::GitCommand {
            command: command.clone(),
            url: url.to_string(),
            stderr: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(Error::GitCommand {
            command,
            url: url.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(output.stdout)
}

/// Commit a fully-qualified reference (e.g. `refs/remotes/origin/main`) points to.
pub fn resolve_reference(dir: &Path, url: &str, name: &str) -> Result<String> {
    let spec = format!("{}^{{commit}}", name);
    match run(dir, url, ["rev-parse", "--verify", "--quiet", spec.as_str()]) {
        Ok(stdout) => Ok(String::from_utf8_lossy(&stdout).trim().to_string()),
        Err(Error::GitCommand { .. }) => Err(Error::CommitNotFound {
            url: url.to_string(),
            r#ref: name.to_string(),
        }),
        Err(e) => Err(e),
    }
}

/// Find `hash` in the history reachable from HEAD.
///
/// Walks `rev-list HEAD` (newest first) and stops at the first exact match.
pub fn find_commit(dir: &Path, url: &str, hash: &str) -> Result<String> {
    let not_found = || Error::CommitNotFound {
        url: url.to_string(),
        r#ref: hash.to_string(),
    };
    // An empty repository has no HEAD to walk.
    let stdout = match run(dir, url, ["rev-list", "HEAD"]) {
        Ok(stdout) => stdout,
        Err(Error::GitCommand { .. }) => return Err(not_found()),
        Err(e) => return Err(e),
    };
    String::from_utf8_lossy(&stdout)
        .lines()
        .map(str::trim)
        .find(|line| *line == hash)
        .map(str::to_string)
        .ok_or_else(not_found)
}

/// Every entry recorded in the tree of `commit`, recursively, in tree order.
pub fn list_tree(dir: &Path, url: &str, commit: &str) -> Result<Vec<TreeEntry>> {
    let stdout = run(dir, url, ["ls-tree", "-r", "-z", "--full-tree", commit])?;
    parse_ls_tree(&stdout).map_err(|message| Error::GitCommand {
        command: format!("ls-tree -r -z --full-tree {}", commit),
        url: url.to_string(),
        stderr: message,
    })
}

/// Parse NUL-separated `ls-tree -z` output.
pub fn parse_ls_tree(output: &[u8]) -> std::result::Result<Vec<TreeEntry>, String> {
    let mut entries = Vec::new();
    for record in output.split(|b| *b == 0).filter(|r| !r.is_empty()) {
        let record = String::from_utf8_lossy(record);
        let (meta, path) = record
            .split_once('\t')
            .ok_or_else(|| format!("malformed tree entry: {}", record))?;
        let mut fields = meta.split(' ');
        let (Some(mode), Some(kind), Some(object)) = (fields.next(), fields.next(), fields.next())
        else {
            return Err(format!("malformed tree entry: {}", record));
        };

        let mode = u32::from_str_radix(mode, 8).map_err(|e| format!("bad mode {}: {}", mode, e))?;
        let kind = match kind {
            "blob" => EntryKind::Blob,
            "tree" => EntryKind::Tree,
            "commit" => EntryKind::Commit,
            other => return Err(format!("unknown object type {}", other)),
        };

        entries.push(TreeEntry {
            mode,
            kind,
            object: object.to_string(),
            path: path.to_string(),
        });
    }
    Ok(entries)
}

/// Raw content of a blob.
pub fn read_blob(dir: &Path, url: &str, object: &str) -> Result<Vec<u8>> {
    run(dir, url, ["cat-file", "blob", object])
}

/// URL of the `origin` remote of the checkout at `dir`.
pub fn local_remote(dir: &Path) -> Result<String> {
    let stdout = run(dir, ".", ["remote", "get-url", REMOTE_NAME])?;
    Ok(String::from_utf8_lossy(&stdout).trim().to_string())
}

/// Commit HEAD points to in the checkout at `dir`.
pub fn local_head(dir: &Path) -> Result<String> {
    let stdout = run(dir, ".", ["rev-parse", "HEAD"])?;
    Ok(String::from_utf8_lossy(&stdout).trim().to_string())
}
