//! Integrity checks (fsck): named pass/fail checks, run in order, first
//! failure raises `InvalidRepo{which}`.

use std::collections::HashSet;

use crate::error::{OnyoError, Result};
use crate::store::AssetStore;
use crate::vcs::GitVcs;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsckCheck {
    CleanTree,
    Anchors,
    AssetUnique,
    AssetYaml,
    AssetValidity,
    PseudoKeys,
}

pub const ALL: [FsckCheck; 6] = [
    FsckCheck::CleanTree,
    FsckCheck::Anchors,
    FsckCheck::AssetUnique,
    FsckCheck::AssetYaml,
    FsckCheck::AssetValidity,
    FsckCheck::PseudoKeys,
];

impl FsckCheck {
    pub fn name(&self) -> &'static str {
        match self {
            FsckCheck::CleanTree => "clean-tree",
            FsckCheck::Anchors => "anchors",
            FsckCheck::AssetUnique => "asset-unique",
            FsckCheck::AssetYaml => "asset-yaml",
            FsckCheck::AssetValidity => "asset-validity",
            FsckCheck::PseudoKeys => "pseudo-keys",
        }
    }

    fn run(&self, store: &AssetStore, vcs: &GitVcs, name_keys: &[String]) -> Result<()> {
        match self {
            FsckCheck::CleanTree => {
                if !vcs.is_clean_worktree()? {
                    return Err(OnyoError::InvalidRepo { which: "clean-tree" });
                }
                Ok(())
            }
            FsckCheck::Anchors => {
                for dir in store.enumerate_inventory_dirs()? {
                    if !dir.join(".anchor").is_file() {
                        return Err(OnyoError::InvalidRepo { which: "anchors" });
                    }
                }
                Ok(())
            }
            FsckCheck::AssetUnique => {
                let mut seen = HashSet::new();
                for asset in store.enumerate_assets()? {
                    if let Some(leaf) = asset.file_name().and_then(|n| n.to_str()) {
                        if !seen.insert(leaf.to_string()) {
                            return Err(OnyoError::InvalidRepo { which: "asset-unique" });
                        }
                    }
                }
                Ok(())
            }
            FsckCheck::AssetYaml => {
                for asset in store.enumerate_assets()? {
                    if store.read_asset(&asset).is_err() {
                        return Err(OnyoError::InvalidRepo { which: "asset-yaml" });
                    }
                }
                Ok(())
            }
            // Placeholder for pluggable `.onyo/validation/` rules; no such
            // rules are implemented yet, so this check always passes.
            FsckCheck::AssetValidity => Ok(()),
            FsckCheck::PseudoKeys => {
                for asset in store.enumerate_assets()? {
                    if let Ok(record) = store.read_asset(&asset) {
                        for key in name_keys {
                            if record.has(key) {
                                return Err(OnyoError::InvalidRepo { which: "pseudo-keys" });
                            }
                        }
                    }
                }
                Ok(())
            }
        }
    }
}

/// `name_keys` is the repository's configured `onyo.assets.name-format` list
/// (see `query::Query::name_keys`); the `pseudo-keys` check rejects asset
/// content carrying any of these, not just the literal `type`/`make`/
/// `model`/`serial` default.
pub fn run_all(store: &AssetStore, vcs: &GitVcs, name_keys: &[String]) -> Result<()> {
    for check in ALL {
        check.run(store, vcs, name_keys)?;
    }
    Ok(())
}
