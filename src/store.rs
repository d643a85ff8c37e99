//! Asset store: read/write YAML asset records, handle the asset-file vs.
//! asset-directory duality, manage anchors, enumerate assets/dirs/templates.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::consts::{ANCHOR_FILE, ASSET_DIR_FILE, ONYO_DIR, TEMPLATES_DIR};
use crate::error::{OnyoError, Result};
use crate::paths::{self, PathClass};
use crate::record::Record;
use crate::vcs::GitVcs;

pub struct AssetStore<'r> {
    pub vcs: &'r GitVcs,
}

impl<'r> AssetStore<'r> {
    pub fn new(vcs: &'r GitVcs) -> Self {
        AssetStore { vcs }
    }

    pub fn root(&self) -> &Path {
        self.vcs.root()
    }

    /// Resolves the on-disk record location for an asset path: the file
    /// itself for an asset file, or `<dir>/.asset` for an asset directory.
    pub fn record_path(&self, asset_path: &Path) -> PathBuf {
        if asset_path.is_dir() {
            asset_path.join(ASSET_DIR_FILE)
        } else {
            asset_path.to_path_buf()
        }
    }

    pub fn read_asset(&self, asset_path: &Path) -> Result<Record> {
        let record_path = self.record_path(asset_path);
        let content = std::fs::read_to_string(&record_path)?;
        Record::from_yaml_str(&content).map_err(|_| OnyoError::InvalidYaml {
            path: record_path.clone(),
            detail: "failed to parse asset YAML".to_string(),
        })
    }

    /// Writes YAML preserving key order; an empty record writes an empty
    /// file (mirrors `write_asset_file`'s behavior for `{}`).
    pub fn write_asset(&self, asset_path: &Path, record: &Record) -> Result<()> {
        let record_path = self.record_path(asset_path);
        if let Some(parent) = record_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = if record.0.is_empty() {
            String::new()
        } else {
            record.to_yaml_string()?
        };
        std::fs::write(&record_path, content)?;
        Ok(())
    }

    pub fn create_anchor(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let anchor = dir.join(ANCHOR_FILE);
        if !anchor.exists() {
            std::fs::write(&anchor, "")?;
        }
        Ok(anchor)
    }

    /// Converts an asset file into an asset directory: removes the old
    /// file, creates the directory, writes `record` into `.asset`, and
    /// anchors it.
    pub fn promote_to_asset_dir(&self, asset_path: &Path, record: &Record) -> Result<()> {
        std::fs::remove_file(asset_path)?;
        std::fs::create_dir_all(asset_path)?;
        self.write_asset(asset_path, record)?;
        self.create_anchor(asset_path)?;
        Ok(())
    }

    /// Converts an asset directory back to a plain asset file, discarding
    /// the anchor and sidecar, or retaining the directory as a plain
    /// inventory directory if the caller set `is_asset_directory = false`
    /// without removing the content.
    pub fn demote_to_asset_file(&self, asset_path: &Path, record: &Record) -> Result<()> {
        let sidecar = asset_path.join(ASSET_DIR_FILE);
        let anchor = asset_path.join(ANCHOR_FILE);
        std::fs::remove_file(&sidecar).ok();
        std::fs::remove_file(&anchor).ok();
        std::fs::remove_dir(asset_path)?;
        self.write_asset(asset_path, record)?;
        Ok(())
    }

    /// Every tracked asset (file or directory), classified from the VCS's
    /// tracked-file listing rather than a raw filesystem walk, so a
    /// `.gitignore`'d file sitting in an inventory directory is never
    /// mistaken for a tracked asset even if its name matches the asset-leaf
    /// grammar.
    pub fn enumerate_assets(&self) -> Result<Vec<PathBuf>> {
        let mut out = Vec::new();
        for path in self.tracked_candidates()? {
            if matches!(
                paths::classify(self.root(), &path),
                PathClass::AssetDir | PathClass::AssetFile
            ) {
                out.push(path);
            }
        }
        Ok(out)
    }

    pub fn enumerate_inventory_dirs(&self) -> Result<Vec<PathBuf>> {
        let mut out = Vec::new();
        for path in self.tracked_candidates()? {
            if matches!(paths::classify(self.root(), &path), PathClass::InventoryDir) {
                out.push(path);
            }
        }
        Ok(out)
    }

    /// Tracked files plus the directories that contain them -- git only
    /// tracks blobs, so a directory's own tracked-ness has to be inferred
    /// from a tracked child (typically its `.anchor` or `.asset` sidecar).
    fn tracked_candidates(&self) -> Result<Vec<PathBuf>> {
        let root = self.root().to_path_buf();
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for path in self.vcs.tracked_files()? {
            let rel = path.strip_prefix(&root).unwrap_or(&path);
            if paths::is_protected(rel) && rel.file_name().map(|n| n != ANCHOR_FILE).unwrap_or(true) {
                continue;
            }
            if seen.insert(path.clone()) {
                out.push(path.clone());
            }
            let mut dir = path.parent();
            while let Some(d) = dir {
                if d == root || !d.starts_with(&root) {
                    break;
                }
                if seen.insert(d.to_path_buf()) {
                    out.push(d.to_path_buf());
                }
                dir = d.parent();
            }
        }
        Ok(out)
    }

    pub fn enumerate_templates(&self) -> Result<HashMap<String, PathBuf>> {
        let dir = self.root().join(ONYO_DIR).join(TEMPLATES_DIR);
        let mut out = HashMap::new();
        if !dir.is_dir() {
            return Ok(out);
        }
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_file() && path.file_name().and_then(|n| n.to_str()) != Some(ANCHOR_FILE) {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    out.insert(name.to_string(), path);
                }
            }
        }
        Ok(out)
    }

    pub fn read_template(&self, name: &str) -> Result<Record> {
        let templates = self.enumerate_templates()?;
        let path = templates
            .get(name)
            .ok_or_else(|| OnyoError::NoTemplate(name.to_string()))?;
        let content = std::fs::read_to_string(path)?;
        Record::from_yaml_str(&content)
    }
}
