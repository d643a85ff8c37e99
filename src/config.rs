//! Repository configuration: `.onyo/config` is a real git-style ini file,
//! read and written through `git2::Config::open`. There is no user-level
//! config file layered on top -- the repository's own `.onyo/config` is
//! the sole configuration source.

use std::path::{Path, PathBuf};

use crate::consts::*;
use crate::error::{OnyoError, Result};

pub struct RepoConfig {
    path: PathBuf,
}

impl RepoConfig {
    pub fn new(root: &Path) -> Self {
        RepoConfig {
            path: root.join(ONYO_DIR).join(CONFIG_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads a raw config value by its dotted name, for `onyo config` with
    /// no value argument.
    pub fn get_raw(&self, name: &str) -> Result<Option<String>> {
        self.get(name)
    }

    fn get(&self, name: &str) -> Result<Option<String>> {
        let cfg = git2::Config::open(&self.path)?;
        match cfg.get_string(name) {
            Ok(v) => Ok(Some(v)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn set(&self, name: &str, value: &str) -> Result<()> {
        let mut cfg = git2::Config::open(&self.path)?;
        cfg.set_str(name, value)?;
        Ok(())
    }

    /// Unsetting a missing key surfaces exit code 5, the dedicated exit
    /// code for a config passthrough that found nothing to remove.
    pub fn unset(&self, name: &str) -> Result<()> {
        let mut cfg = git2::Config::open(&self.path)?;
        match cfg.remove(name) {
            Ok(()) => Ok(()),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Err(OnyoError::VcsError {
                code: 5,
                stderr: format!("key '{}' not found", name),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// The configured name-key list, defaulting to `type,make,model,serial`.
    /// Read through this accessor everywhere a name key is needed, rather
    /// than hard-coded, so a repository that renames these keys still
    /// gets correct behavior throughout.
    pub fn name_keys(&self) -> Result<Vec<String>> {
        match self.get(CFG_NAME_FORMAT)? {
            Some(v) => Ok(v.split(',').map(|s| s.trim().to_string()).collect()),
            None => Ok(DEFAULT_NAME_KEYS.iter().map(|s| s.to_string()).collect()),
        }
    }

    pub fn editor(&self) -> Result<String> {
        if let Some(v) = self.get(CFG_EDITOR)? {
            return Ok(v);
        }
        if let Ok(v) = std::env::var("EDITOR") {
            if !v.is_empty() {
                return Ok(v);
            }
        }
        Ok(DEFAULT_EDITOR.to_string())
    }

    pub fn history_interactive(&self) -> Result<String> {
        Ok(self
            .get(CFG_HISTORY_INTERACTIVE)?
            .unwrap_or_else(|| DEFAULT_HISTORY_INTERACTIVE.to_string()))
    }

    pub fn history_non_interactive(&self) -> Result<String> {
        Ok(self
            .get(CFG_HISTORY_NON_INTERACTIVE)?
            .unwrap_or_else(|| DEFAULT_HISTORY_NON_INTERACTIVE.to_string()))
    }

    pub fn default_template(&self) -> Result<String> {
        Ok(self
            .get(CFG_NEW_TEMPLATE)?
            .unwrap_or_else(|| DEFAULT_TEMPLATE_NAME.to_string()))
    }

    pub fn repo_version(&self) -> Result<String> {
        Ok(self
            .get(CFG_REPO_VERSION)?
            .unwrap_or_else(|| REPO_VERSION.to_string()))
    }
}
