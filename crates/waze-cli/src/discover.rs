//! Locating git directories and the packs inside them.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

/// A `.pack` file and its sibling `.idx`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackPair {
    pub pack: PathBuf,
    pub idx: PathBuf,
}

/// Resolve a command-line path to a git directory.
///
/// Accepts a git directory itself (bare or `.git`), or a work tree whose
/// `.git` is a directory or a `gitdir:` file.
pub fn resolve_git_dir(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        bail!("not a git repository: '{}'", path.display());
    }

    let dot_git = path.join(".git");
    if dot_git.is_dir() {
        return Ok(dot_git);
    }
    if dot_git.is_file() {
        let target = read_gitdir_file(&dot_git)?;
        return Ok(if target.is_absolute() { target } else { path.join(target) });
    }
    if path.join("objects").is_dir() {
        return Ok(path.to_path_buf());
    }
    bail!("not a git repository: '{}'", path.display())
}

fn read_gitdir_file(dot_git: &Path) -> Result<PathBuf> {
    let content = fs::read_to_string(dot_git)
        .with_context(|| format!("cannot read '{}'", dot_git.display()))?;
    match content.trim().strip_prefix("gitdir:") {
        Some(target) => Ok(PathBuf::from(target.trim())),
        None => bail!("invalid gitfile format: '{}'", dot_git.display()),
    }
}

/// Find every pack under `<git_dir>/objects`, in path order.
///
/// Packs without an index are skipped; git has not finished writing them
/// or they are leftovers of an interrupted repack.
pub fn find_packs(git_dir: &Path) -> Result<Vec<PackPair>> {
    let objects = git_dir.join("objects");
    if !objects.is_dir() {
        bail!("no object directory in '{}'", git_dir.display());
    }

    let mut packs = Vec::new();
    let mut pending = vec![objects];
    while let Some(dir) = pending.pop() {
        let entries = fs::read_dir(&dir).with_context(|| format!("cannot read '{}'", dir.display()))?;
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if file_type.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "pack") {
                let idx = path.with_extension("idx");
                if idx.is_file() {
                    packs.push(PackPair { pack: path, idx });
                } else {
                    tracing::warn!(pack = %path.display(), "skipping pack without index");
                }
            }
        }
    }

    packs.sort_by(|a, b| a.pack.cmp(&b.pack));
    Ok(packs)
}
