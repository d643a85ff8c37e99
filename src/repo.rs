//! Repository orchestrator: wires the VCS adapter, asset store, and config
//! together, and implements the name-synthesis / template materialization
//! ordering on top of a `Transaction`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde_yaml::Value;

use crate::config::RepoConfig;
use crate::consts::*;
use crate::error::{OnyoError, Result};
use crate::paths::{self, PathClass};
use crate::record::{deep_merge, faux_serials, Record};
use crate::store::AssetStore;
use crate::transaction::Transaction;
use crate::vcs::GitVcs;

pub struct Repo {
    pub vcs: GitVcs,
    pub config: RepoConfig,
}

/// Reads the reserved `is_asset_directory` key as a bool, accepting either
/// a native YAML boolean or the string forms a TSV/CLI override would
/// produce. `None` means the key was not set at all.
fn wants_asset_directory(record: &Record) -> Option<bool> {
    match record.get("is_asset_directory") {
        Some(Value::Bool(b)) => Some(*b),
        Some(Value::String(s)) if s == "true" => Some(true),
        Some(Value::String(s)) if s == "false" => Some(false),
        _ => None,
    }
}

impl Repo {
    pub fn discover(start: &Path) -> Result<Repo> {
        let vcs = GitVcs::discover(start)?;
        let config = RepoConfig::new(vcs.root());
        Ok(Repo { vcs, config })
    }

    /// Scaffolds `.onyo/` (config, templates/, validation/, anchors),
    /// initializes git if needed, and commits the initial state.
    pub fn init(path: &Path) -> Result<Repo> {
        std::fs::create_dir_all(path)?;
        let vcs = if path.join(GIT_DIR).is_dir() {
            GitVcs::discover(path).or_else(|_| GitVcs::init(path))?
        } else {
            GitVcs::init(path)?
        };

        let onyo_dir = path.join(ONYO_DIR);
        if onyo_dir.is_dir() {
            return Err(OnyoError::PathExists(onyo_dir));
        }
        std::fs::create_dir_all(onyo_dir.join(TEMPLATES_DIR))?;
        std::fs::create_dir_all(onyo_dir.join(VALIDATION_DIR))?;
        std::fs::write(onyo_dir.join(ANCHOR_FILE), "")?;
        std::fs::write(onyo_dir.join(TEMPLATES_DIR).join(ANCHOR_FILE), "")?;
        std::fs::write(onyo_dir.join(VALIDATION_DIR).join(ANCHOR_FILE), "")?;
        std::fs::write(onyo_dir.join(CONFIG_FILE), "")?;
        std::fs::write(onyo_dir.join(TEMPLATES_DIR).join(DEFAULT_TEMPLATE_NAME), "")?;

        let config = RepoConfig::new(path);
        config.set(CFG_REPO_VERSION, REPO_VERSION)?;

        vcs.stage(&[onyo_dir.clone()])?;
        vcs.commit("onyo init")?;

        Ok(Repo { vcs, config })
    }

    pub fn store(&self) -> AssetStore<'_> {
        AssetStore::new(&self.vcs)
    }

    pub fn root(&self) -> &Path {
        self.vcs.root()
    }

    pub fn transaction(&self) -> Transaction<'_> {
        Transaction::new(&self.vcs)
    }

    /// Resolves the configured name-key list and formats a leaf name from
    /// a record's values, in that order -- threading `onyo.assets.name-format`
    /// through rather than hard-coding the four keys.
    pub fn format_leaf(&self, record: &Record) -> Result<String> {
        let keys = self.config.name_keys()?;
        if keys.len() != 4 {
            return Err(OnyoError::MissingNameKey("name-format".to_string()));
        }
        let mut values = Vec::with_capacity(4);
        for key in &keys {
            let value = record
                .get_string(key)
                .ok_or_else(|| OnyoError::MissingNameKey(key.clone()))?;
            values.push((key.as_str(), value));
        }
        paths::format_name(&values)
    }

    /// Materializes a template by name: reads the named template (or the
    /// repository-configured default if `None`), falling back to an empty
    /// record if even that is unset.
    pub fn materialize_template(&self, template_name: Option<&str>) -> Result<Record> {
        let store = self.store();
        let name = match template_name {
            Some(n) => n.to_string(),
            None => self.config.default_template()?,
        };
        if name.is_empty() {
            return Ok(Record::new());
        }
        store.read_template(&name)
    }

    /// Strips the configured name keys from a record before it is persisted:
    /// those values live in the asset's filename and must not also appear
    /// as literal content, which is exactly what `fsck`'s `pseudo-keys`
    /// check rejects.
    fn strip_name_keys(&self, mut record: Record) -> Result<Record> {
        for key in self.config.name_keys()? {
            record.del(&key);
        }
        Ok(record)
    }

    /// Generates `num` faux serials, unique against every asset serial
    /// currently in the repository.
    pub fn faux_serials(&self, num: usize, length: usize) -> Result<Vec<String>> {
        let store = self.store();
        let mut existing = HashSet::new();
        for asset in store.enumerate_assets()? {
            if let Some(leaf) = asset.file_name().and_then(|n| n.to_str()) {
                if let Ok(parsed) = paths::parse_asset_leaf(leaf) {
                    existing.insert(parsed.serial);
                }
            }
        }
        faux_serials(num, length, &existing)
    }

    /// Stages a `new_asset` operation for a single spec: applies
    /// `deep_merge(template, overrides)`, computes the leaf name, and
    /// resolves the destination path from the reserved `directory` key or
    /// a caller-supplied base directory.
    pub fn stage_new_asset(
        &self,
        tx: &mut Transaction,
        template_name: Option<&str>,
        overrides: &Record,
        base_dir: &Path,
    ) -> Result<PathBuf> {
        let template = self.materialize_template(template_name)?;
        let merged = deep_merge(&template, overrides);

        let directory = merged
            .get_string("directory")
            .map(PathBuf::from)
            .unwrap_or_else(|| base_dir.to_path_buf());
        let directory = paths::absolute(self.root(), &directory);

        if !matches!(paths::classify(self.root(), &directory), PathClass::InventoryDir) {
            return Err(OnyoError::NotAnInventoryDir(directory));
        }

        let is_asset_directory = wants_asset_directory(&merged).unwrap_or(false);

        let base_record = merged.without_reserved_keys();
        let leaf = self.format_leaf(&base_record)?;
        let path = directory.join(&leaf);

        if path.exists() {
            return Err(OnyoError::DuplicateAssetName(leaf));
        }

        let record = self.strip_name_keys(base_record)?;
        tx.add_asset(path.clone(), record, is_asset_directory)?;

        Ok(path)
    }

    /// Applies `set`-style key overrides to an existing asset, computing
    /// whether the leaf name changes and refusing a silent rename unless
    /// `allow_rename` is set.
    pub fn stage_modify_or_rename(
        &self,
        tx: &mut Transaction,
        asset_path: &Path,
        overrides: &Record,
        allow_rename: bool,
    ) -> Result<()> {
        let store = self.store();
        let old = store.read_asset(asset_path)?;

        let current_leaf = asset_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();

        // `old` never carries the name keys -- they're stripped before
        // persisting -- so seed the merge with the keys parsed back out of
        // the current filename, mapped positionally against the repo's
        // configured name-key order. Without this, a partial override like
        // `type=notebook` would lose make/model/serial entirely and
        // `format_leaf` below would fail with a spurious `MissingNameKey`.
        let mut seed = Record::new();
        if let Ok(parsed) = paths::parse_asset_leaf(current_leaf) {
            let fields = [parsed.type_, parsed.make, parsed.model, parsed.serial];
            for (key, value) in self.config.name_keys()?.into_iter().zip(fields) {
                seed.set(&key, Value::String(value));
            }
        }
        let merged = deep_merge(&deep_merge(&seed, &old), overrides).without_reserved_keys();

        let currently_dir = asset_path.is_dir();
        match wants_asset_directory(overrides) {
            Some(true) if !currently_dir => {
                let new = self.strip_name_keys(merged)?;
                tx.promote_asset_dir(asset_path.to_path_buf(), old, new)?;
                return Ok(());
            }
            Some(false) if currently_dir => {
                let new = self.strip_name_keys(merged)?;
                tx.demote_asset_dir(asset_path.to_path_buf(), old, new)?;
                return Ok(());
            }
            _ => {}
        }

        // `format_leaf` needs the name keys, so the persisted record is only
        // stripped of them after the new leaf name has been computed.
        let new_leaf = self.format_leaf(&merged)?;
        let new = self.strip_name_keys(merged)?;

        if new_leaf != current_leaf {
            if !allow_rename {
                return Err(OnyoError::RenameRequired(new_leaf));
            }
            let dst = asset_path
                .parent()
                .map(|p| p.join(&new_leaf))
                .ok_or_else(|| OnyoError::InvalidPath(asset_path.to_path_buf()))?;
            tx.modify_asset(asset_path.to_path_buf(), old, new)?;
            tx.rename_asset(asset_path.to_path_buf(), dst)?;
        } else {
            tx.modify_asset(asset_path.to_path_buf(), old, new)?;
        }
        Ok(())
    }
}
