//! Stages operations, enforces invariants across the pending set, produces
//! a diff, confirms, executes, commits, or rolls back.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::{OnyoError, Result};
use crate::message;
use crate::operations::Operation;
use crate::paths::{self, PathClass};
use crate::record::Record;
use crate::store::AssetStore;
use crate::vcs::GitVcs;

/// A transaction's lifecycle: operations accumulate while `Staging`, a
/// `diff()` call moves it to `Previewed` without changing its contents,
/// and `commit`/`abort` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Empty,
    Staging,
    Previewed,
    Committed,
    Aborted,
}

pub struct Transaction<'r> {
    vcs: &'r GitVcs,
    store: AssetStore<'r>,
    state: TxState,
    operations: Vec<Operation>,
    /// Whether the operand at the same index was, at stage time, an asset
    /// directory -- needed for the move/rename/remove duality rule.
    was_asset_dir: Vec<bool>,
    touched: Vec<PathBuf>,
}

impl<'r> Transaction<'r> {
    pub fn new(vcs: &'r GitVcs) -> Self {
        Transaction {
            vcs,
            store: AssetStore::new(vcs),
            state: TxState::Empty,
            operations: Vec::new(),
            was_asset_dir: Vec::new(),
            touched: Vec::new(),
        }
    }

    pub fn store(&self) -> &AssetStore<'r> {
        &self.store
    }

    pub fn vcs(&self) -> &GitVcs {
        self.vcs
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    fn transition_to_staging(&mut self) -> Result<()> {
        match self.state {
            TxState::Empty | TxState::Staging | TxState::Previewed => {
                self.state = TxState::Staging;
                Ok(())
            }
            _ => Err(OnyoError::IllegalState(format!(
                "cannot stage from state {:?}",
                self.state
            ))),
        }
    }

    /// Leaf uniqueness against (existing assets ∪ pending new assets ∖
    /// pending removals).
    fn pending_leaf_names(&self) -> HashSet<String> {
        let mut names = HashSet::new();
        for op in &self.operations {
            match op {
                Operation::NewAsset(_, path, _) | Operation::RenameAsset { dst: path, .. } => {
                    if let Some(n) = path.file_name().and_then(|n| n.to_str()) {
                        names.insert(n.to_string());
                    }
                }
                _ => {}
            }
        }
        names
    }

    fn existing_leaf_names(&self) -> Result<HashSet<String>> {
        Ok(self
            .store
            .enumerate_assets()?
            .into_iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(|s| s.to_string()))
            .collect())
    }

    fn check_unique(&self, leaf: &str) -> Result<()> {
        if self.existing_leaf_names()?.contains(leaf) || self.pending_leaf_names().contains(leaf) {
            return Err(OnyoError::DuplicateAssetName(leaf.to_string()));
        }
        Ok(())
    }

    /// Stages a single pre-validated operation.
    pub fn stage(&mut self, op: Operation, is_asset_dir: bool) -> Result<()> {
        self.transition_to_staging()?;
        self.operations.push(op);
        self.was_asset_dir.push(is_asset_dir);
        Ok(())
    }

    pub fn add_asset(&mut self, path: PathBuf, record: Record, is_asset_dir: bool) -> Result<()> {
        let leaf = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| OnyoError::InvalidPath(path.clone()))?;
        if !paths::is_valid_asset_leaf(leaf) {
            return Err(OnyoError::InvalidAssetName(leaf.to_string()));
        }
        self.check_unique(leaf)?;
        self.stage(Operation::NewAsset(record, path, is_asset_dir), is_asset_dir)
    }

    pub fn add_directory(&mut self, path: PathBuf) -> Result<()> {
        if path.exists() {
            return Err(OnyoError::PathExists(path));
        }
        self.stage(Operation::NewDirectory(path), false)
    }

    pub fn modify_asset(&mut self, path: PathBuf, old: Record, new: Record) -> Result<()> {
        let is_dir = path.is_dir();
        self.stage(Operation::ModifyAsset { path, old, new }, is_dir)
    }

    /// Stages the executor-level flip of an asset file into an asset
    /// directory (`set is_asset_directory=true`).
    pub fn promote_asset_dir(&mut self, path: PathBuf, old: Record, new: Record) -> Result<()> {
        self.stage(Operation::PromoteAssetDir { path, old, new }, false)
    }

    /// The reverse flip: an asset directory back into a plain asset file.
    pub fn demote_asset_dir(&mut self, path: PathBuf, old: Record, new: Record) -> Result<()> {
        self.stage(Operation::DemoteAssetDir { path, old, new }, true)
    }

    pub fn move_asset(&mut self, src: PathBuf, dst_dir: PathBuf) -> Result<()> {
        self.validate_move_destination(&dst_dir)?;
        let leaf = src
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| OnyoError::InvalidPath(src.clone()))?;
        if dst_dir.join(leaf).exists() {
            return Err(OnyoError::PathExists(dst_dir.join(leaf)));
        }
        let is_dir = src.is_dir();
        self.stage(Operation::MoveAsset { src, dst_dir }, is_dir)
    }

    pub fn move_directory(&mut self, src: PathBuf, dst_dir: PathBuf) -> Result<()> {
        self.validate_move_destination(&dst_dir)?;
        let leaf = src
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| OnyoError::InvalidPath(src.clone()))?;
        if dst_dir.join(leaf).exists() {
            return Err(OnyoError::PathExists(dst_dir.join(leaf)));
        }
        self.stage(Operation::MoveDirectory { src, dst_dir }, false)
    }

    fn validate_move_destination(&self, dst_dir: &Path) -> Result<()> {
        let root = self.store.root();
        if !matches!(paths::classify(root, dst_dir), PathClass::InventoryDir) {
            return Err(OnyoError::NotAnInventoryDir(dst_dir.to_path_buf()));
        }
        Ok(())
    }

    pub fn rename_asset(&mut self, src: PathBuf, dst: PathBuf) -> Result<()> {
        self.validate_rename_destination(&src, &dst)?;
        let leaf = dst
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| OnyoError::InvalidPath(dst.clone()))?;
        if !paths::is_valid_asset_leaf(leaf) {
            return Err(OnyoError::InvalidAssetName(leaf.to_string()));
        }
        self.check_unique(leaf)?;
        let is_dir = src.is_dir();
        self.stage(Operation::RenameAsset { src, dst }, is_dir)
    }

    pub fn rename_directory(&mut self, src: PathBuf, dst: PathBuf) -> Result<()> {
        self.validate_rename_destination(&src, &dst)?;
        self.stage(Operation::RenameDirectory { src, dst }, false)
    }

    fn validate_rename_destination(&self, _src: &Path, dst: &Path) -> Result<()> {
        if dst.exists() {
            return Err(OnyoError::PathExists(dst.to_path_buf()));
        }
        match dst.parent() {
            Some(parent) if parent.is_dir() => Ok(()),
            _ => Err(OnyoError::PathAbsent(dst.to_path_buf())),
        }
    }

    pub fn remove_asset(&mut self, path: PathBuf) -> Result<()> {
        let is_dir = path.is_dir();
        self.stage(Operation::RemoveAsset(path), is_dir)
    }

    pub fn remove_directory(&mut self, path: PathBuf, recursive: bool) -> Result<()> {
        self.stage(Operation::RemoveDirectory { path, recursive }, false)
    }

    /// Concatenation of each operation's differ output; transitions
    /// `Staging -> Previewed`.
    pub fn diff(&mut self) -> Vec<String> {
        self.state = TxState::Previewed;
        self.operations.iter().flat_map(|op| op.diff()).collect()
    }

    pub fn abort(&mut self) {
        self.operations.clear();
        self.was_asset_dir.clear();
        self.touched.clear();
        self.state = TxState::Aborted;
    }

    /// Drives executors in staged order, stages/removes each operation's
    /// returned paths, then commits. On the first executor failure,
    /// unwinds already-applied operations via `unstage_and_restore` on all
    /// touched paths and raises `TransactionAborted`.
    pub fn commit(
        &mut self,
        cmd: &str,
        keys: &[String],
        message_override: Option<&str>,
        destination: Option<&Path>,
    ) -> Result<git2::Oid> {
        if !matches!(self.state, TxState::Staging | TxState::Previewed) {
            return Err(OnyoError::IllegalState(format!(
                "cannot commit from state {:?}",
                self.state
            )));
        }

        for (idx, op) in self.operations.iter().enumerate() {
            debug!("executing operation {}/{}", idx + 1, self.operations.len());
            match op.execute(&self.store) {
                Ok(outcome) => {
                    self.touched.extend(outcome.to_stage.iter().cloned());
                    self.touched.extend(outcome.to_remove.iter().cloned());
                    if !outcome.to_stage.is_empty() {
                        self.vcs.stage(&outcome.to_stage)?;
                    }
                    if !outcome.to_remove.is_empty() {
                        self.vcs.stage_remove(&outcome.to_remove)?;
                    }
                }
                Err(e) => {
                    warn!("rolling back after executor failure: {}", e);
                    if let Err(rollback_err) = self.vcs.unstage_and_restore(&self.touched) {
                        warn!("rollback itself failed: {}", rollback_err);
                    }
                    self.state = TxState::Aborted;
                    return Err(OnyoError::TransactionAborted {
                        first_failure: Box::new(e),
                    });
                }
            }
        }

        let msg = message::synthesize(cmd, self, keys, message_override, destination)?;
        let oid = self.vcs.commit(&msg)?;
        self.state = TxState::Committed;
        Ok(oid)
    }

    pub fn was_asset_dir(&self, idx: usize) -> bool {
        self.was_asset_dir.get(idx).copied().unwrap_or(false)
    }

    pub fn root(&self) -> &Path {
        self.store.root()
    }
}
