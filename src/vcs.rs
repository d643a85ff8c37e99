//! A thin wrapper over git, used as onyo's version-control backend.
//! Every mutation onyo makes to the worktree goes through here so commits,
//! staging, and tracked-file enumeration stay in one place.

use std::path::{Path, PathBuf};
use std::process::Command;

use git2::{Repository, Signature, StatusOptions};

use crate::consts::ONYO_DIR;
use crate::error::{OnyoError, Result};

pub struct GitVcs {
    repo: Repository,
    root: PathBuf,
}

impl GitVcs {
    /// Equivalent to `root_of`: discovers the repository root from `start`,
    /// and verifies a `.onyo` directory exists there.
    pub fn discover(start: &Path) -> Result<GitVcs> {
        let repo = Repository::discover(start).map_err(|_| OnyoError::NotARepo(start.to_path_buf()))?;
        let root = repo
            .workdir()
            .ok_or_else(|| OnyoError::NotARepo(start.to_path_buf()))?
            .to_path_buf();
        if !root.join(ONYO_DIR).is_dir() {
            return Err(OnyoError::NotARepo(start.to_path_buf()));
        }
        Ok(GitVcs { repo, root })
    }

    /// Initializes a brand-new git repository at `path` (no `.onyo` check;
    /// that scaffolding is the caller's job -- see `cmd::init`).
    pub fn init(path: &Path) -> Result<GitVcs> {
        let repo = Repository::init(path)?;
        Ok(GitVcs {
            repo,
            root: path.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// True iff there are no staged, unstaged, or untracked changes.
    pub fn is_clean_worktree(&self) -> Result<bool> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(true).recurse_untracked_dirs(true);
        let statuses = self.repo.statuses(Some(&mut opts))?;
        Ok(statuses.is_empty())
    }

    pub fn stage(&self, paths: &[PathBuf]) -> Result<()> {
        let mut index = self.repo.index()?;
        for p in paths {
            let rel = self.to_relative(p);
            if self.root.join(&rel).exists() {
                index.add_path(&rel)?;
            } else {
                index.remove_path(&rel).ok();
            }
        }
        index.write()?;
        Ok(())
    }

    pub fn stage_remove(&self, paths: &[PathBuf]) -> Result<()> {
        let mut index = self.repo.index()?;
        for p in paths {
            let rel = self.to_relative(p);
            index.remove_path(&rel).ok();
        }
        index.write()?;
        Ok(())
    }

    /// Resets the index entries for `paths` to `HEAD` and checks the
    /// worktree copies back out from `HEAD`. The Rust equivalent of
    /// `git restore --source=HEAD --staged --worktree <paths>`.
    pub fn unstage_and_restore(&self, paths: &[PathBuf]) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let head = self.repo.head().ok().and_then(|h| h.peel_to_tree().ok());
        let mut index = self.repo.index()?;
        for p in paths {
            let rel = self.to_relative(p);
            if let Some(tree) = &head {
                if let Ok(entry) = tree.get_path(&rel) {
                    let obj = entry.to_object(&self.repo)?;
                    if let Some(blob) = obj.as_blob() {
                        index.add_frombuffer(
                            &git2::IndexEntry {
                                ctime: git2::IndexTime::new(0, 0),
                                mtime: git2::IndexTime::new(0, 0),
                                dev: 0,
                                ino: 0,
                                mode: entry.filemode() as u32,
                                uid: 0,
                                gid: 0,
                                file_size: blob.content().len() as u32,
                                id: entry.id(),
                                flags: 0,
                                flags_extended: 0,
                                path: rel.to_string_lossy().as_bytes().to_vec(),
                            },
                            blob.content(),
                        )?;
                        if let Some(full) = self.root.join(&rel).parent() {
                            std::fs::create_dir_all(full)?;
                        }
                        std::fs::write(self.root.join(&rel), blob.content())?;
                        continue;
                    }
                }
            }
            // Not present in HEAD: this path was newly created this
            // transaction, so rolling back means removing it entirely.
            index.remove_path(&rel).ok();
            let full = self.root.join(&rel);
            if full.is_dir() {
                std::fs::remove_dir_all(&full).ok();
            } else {
                std::fs::remove_file(&full).ok();
            }
        }
        index.write()?;
        Ok(())
    }

    /// A plain filesystem rename followed by staging both old and new
    /// paths; git's own similarity-based rename detection needs no
    /// explicit call, mirroring how the Python original never invokes
    /// `git mv`.
    pub fn rename(&self, src: &Path, dst: &Path) -> Result<()> {
        if let Some(parent) = dst.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::rename(src, dst)?;
        self.stage(&[src.to_path_buf(), dst.to_path_buf()])
    }

    pub fn commit(&self, message: &str) -> Result<git2::Oid> {
        let mut index = self.repo.index()?;
        let tree_id = index.write_tree()?;
        let tree = self.repo.find_tree(tree_id)?;
        let sig = self
            .repo
            .signature()
            .or_else(|_| Signature::now("onyo", "onyo@localhost"))?;

        let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        let oid = self
            .repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)?;
        Ok(oid)
    }

    pub fn files_staged(&self) -> Result<Vec<PathBuf>> {
        self.status_paths(|s| s.is_index_new() || s.is_index_modified() || s.is_index_deleted() || s.is_index_renamed())
    }

    /// Every path git currently tracks (the index, i.e. HEAD plus anything
    /// staged), as absolute paths under the repo root. `.gitignore`'d files
    /// never enter the index, so they're excluded here regardless of
    /// whether they happen to sit inside an inventory directory.
    pub fn tracked_files(&self) -> Result<Vec<PathBuf>> {
        let index = self.repo.index()?;
        Ok(index
            .iter()
            .map(|entry| self.root.join(String::from_utf8_lossy(&entry.path).into_owned()))
            .collect())
    }

    pub fn files_changed(&self) -> Result<Vec<PathBuf>> {
        self.status_paths(|s| s.is_wt_modified() || s.is_wt_deleted() || s.is_wt_renamed())
    }

    pub fn files_untracked(&self) -> Result<Vec<PathBuf>> {
        self.status_paths(|s| s.is_wt_new())
    }

    fn status_paths(&self, predicate: impl Fn(git2::Status) -> bool) -> Result<Vec<PathBuf>> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(true).recurse_untracked_dirs(true);
        let statuses = self.repo.statuses(Some(&mut opts))?;
        let mut out = Vec::new();
        for entry in statuses.iter() {
            if predicate(entry.status()) {
                if let Some(path) = entry.path() {
                    out.push(self.root.join(path));
                }
            }
        }
        Ok(out)
    }

    fn to_relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.root).unwrap_or(path).to_path_buf()
    }

    /// Spawns the user-configured non-interactive history command,
    /// inheriting stdio and propagating the exit status unchanged.
    pub fn log(&self, command: &str, path: Option<&Path>) -> Result<i32> {
        self.spawn_history(command, path)
    }

    pub fn log_interactive(&self, command: &str, path: Option<&Path>) -> Result<i32> {
        self.spawn_history(command, path)
    }

    fn spawn_history(&self, command: &str, path: Option<&Path>) -> Result<i32> {
        let mut parts = command.split_whitespace();
        let program = parts.next().unwrap_or("git");
        let mut cmd = Command::new(program);
        cmd.args(parts).current_dir(&self.root);
        if let Some(p) = path {
            cmd.arg(p);
        }
        let status = cmd.status()?;
        Ok(status.code().unwrap_or(1))
    }
}
