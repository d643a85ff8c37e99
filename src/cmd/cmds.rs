//! Command implementations: one `impl Cmd` per subcommand, dispatched via
//! `enum_dispatch` over `Repo`/`Transaction`/`Query`.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command as Process;

use enum_dispatch::enum_dispatch;
use serde_yaml::Value;

use crate::cmd::opts::*;
use crate::cmd::table::{print_rows, print_tsv};
use crate::error::{OnyoError, Result};
use crate::paths::{self, PathClass};
use crate::query::{Filter, Query, SortDirection};
use crate::record::{parse_scalar, Record};
use crate::repo::Repo;
use crate::ui::Ui;

/// Options that apply across every subcommand, threaded down from
/// `OnyoArgs`'s global flags.
pub struct GlobalArgs<'a> {
    pub yes: bool,
    pub quiet: bool,
    pub message: Option<&'a str>,
    pub dry_run: bool,
}

#[enum_dispatch]
pub trait Cmd {
    fn exec(&self, repo: &Repo, globals: &GlobalArgs, ui: &dyn Ui) -> Result<()>;
}

/// Previews a staged transaction, confirms unless `--yes`/`--quiet`, and
/// commits unless `--dry-run`. Shared by every mutating subcommand so the
/// confirm/commit/abort dance is written exactly once.
fn finish(
    mut tx: crate::transaction::Transaction,
    cmd: &str,
    keys: &[String],
    globals: &GlobalArgs,
    ui: &dyn Ui,
    destination: Option<&Path>,
) -> Result<()> {
    let diff = tx.diff();
    if globals.quiet && !globals.yes {
        return Err(OnyoError::FlagConflict(
            "--quiet requires --yes".to_string(),
        ));
    }
    if !globals.quiet {
        for line in &diff {
            ui.print(line);
        }
    }

    if globals.dry_run {
        tx.abort();
        return Ok(());
    }

    if diff.is_empty() {
        tx.abort();
        return Ok(());
    }

    if !globals.yes && !ui.confirm("Run the above changes?") {
        tx.abort();
        return Err(OnyoError::UserCancelled);
    }

    tx.commit(cmd, keys, globals.message, destination)?;
    Ok(())
}

/// Parses `key=value` CLI arguments into YAML scalars: `true`/`false` to
/// booleans, integers/floats to numbers, everything else to a string.
fn parse_kv(pairs: &[String]) -> Result<Record> {
    let mut record = Record::new();
    for pair in pairs {
        let (key, raw) = pair
            .split_once('=')
            .ok_or_else(|| OnyoError::InvalidPath(PathBuf::from(pair)))?;
        record.set(key, parse_scalar(raw));
    }
    Ok(record)
}

impl Cmd for InitCmd {
    fn exec(&self, _repo: &Repo, _globals: &GlobalArgs, ui: &dyn Ui) -> Result<()> {
        ui.print("Initialized onyo repository");
        Ok(())
    }
}

impl Cmd for NewCmd {
    fn exec(&self, repo: &Repo, globals: &GlobalArgs, ui: &dyn Ui) -> Result<()> {
        let cli_overrides = parse_kv(&self.keys)?;

        if self.directory.is_some() && cli_overrides.has("directory") {
            return Err(OnyoError::ConflictingKeys(
                "--directory conflicts with the 'directory' key".to_string(),
            ));
        }
        if self.template.is_some() && cli_overrides.has("template") {
            return Err(OnyoError::ConflictingKeys(
                "--template conflicts with the 'template' key".to_string(),
            ));
        }

        let base_dir = self
            .directory
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        let base_dir = paths::absolute(repo.root(), &base_dir);

        // §6 TSV ingestion: a header-declared table, one new asset per row,
        // `--keys` supplementing every row. Without `--tsv`, `--faux-count`
        // lets a single `--keys` group spawn a batch of assets that share
        // every key except a freshly generated faux serial apiece.
        let mut specs: Vec<Record> = if let Some(tsv_path) = &self.tsv {
            let content = std::fs::read_to_string(tsv_path)?;
            crate::tsv::parse(&content, &cli_overrides)?
        } else if cli_overrides.get_string("serial").as_deref() == Some("faux") && self.faux_count > 1 {
            (0..self.faux_count).map(|_| cli_overrides.clone()).collect()
        } else {
            vec![cli_overrides.clone()]
        };

        let faux_needed = specs
            .iter()
            .filter(|s| s.get_string("serial").as_deref() == Some("faux"))
            .count();
        if faux_needed > 0 {
            let mut serials = repo.faux_serials(faux_needed, self.faux_length)?.into_iter();
            for spec in specs.iter_mut() {
                if spec.get_string("serial").as_deref() == Some("faux") {
                    spec.set("serial", Value::String(serials.next().unwrap()));
                }
            }
        }

        let mut tx = repo.transaction();
        let mut created = Vec::new();
        for spec in &specs {
            let template_name = spec.get_string("template").or_else(|| self.template.clone());
            let path = repo.stage_new_asset(&mut tx, template_name.as_deref(), spec, &base_dir)?;
            created.push(path);
        }

        finish(tx, "new", &[], globals, ui, created.first().map(|p| p.as_path()))
    }
}

impl Cmd for MkdirCmd {
    fn exec(&self, repo: &Repo, globals: &GlobalArgs, ui: &dyn Ui) -> Result<()> {
        let mut tx = repo.transaction();
        for dir in &self.directories {
            let abs = paths::absolute(repo.root(), dir);
            tx.add_directory(abs)?;
        }
        finish(tx, "mkdir", &[], globals, ui, None)
    }
}

impl Cmd for RemoveCmd {
    fn exec(&self, repo: &Repo, globals: &GlobalArgs, ui: &dyn Ui) -> Result<()> {
        let mut tx = repo.transaction();
        for path in &self.paths {
            let abs = paths::absolute(repo.root(), path);
            match paths::classify(repo.root(), &abs) {
                PathClass::AssetFile | PathClass::AssetDir => tx.remove_asset(abs)?,
                PathClass::InventoryDir => tx.remove_directory(abs, self.recursive)?,
                _ => return Err(OnyoError::InvalidPath(abs)),
            }
        }
        finish(tx, "rm", &[], globals, ui, None)
    }
}

impl Cmd for MoveCmd {
    fn exec(&self, repo: &Repo, globals: &GlobalArgs, ui: &dyn Ui) -> Result<()> {
        let dst = paths::absolute(repo.root(), &self.destination);
        let mut tx = repo.transaction();
        for src in &self.sources {
            let abs = paths::absolute(repo.root(), src);
            match paths::classify(repo.root(), &abs) {
                PathClass::AssetFile => tx.move_asset(abs, dst.clone())?,
                PathClass::AssetDir => tx.move_asset(abs, dst.clone())?,
                PathClass::InventoryDir => tx.move_directory(abs, dst.clone())?,
                _ => return Err(OnyoError::InvalidPath(abs)),
            }
        }
        finish(tx, "mv", &[], globals, ui, Some(&dst))
    }
}

impl Cmd for SetCmd {
    fn exec(&self, repo: &Repo, globals: &GlobalArgs, ui: &dyn Ui) -> Result<()> {
        let overrides = parse_kv(&self.keys)?;
        let mut tx = repo.transaction();
        for path in &self.paths {
            let abs = paths::absolute(repo.root(), path);
            repo.stage_modify_or_rename(&mut tx, &abs, &overrides, self.rename)?;
        }
        let key_names: Vec<String> = self
            .keys
            .iter()
            .map(|kv| kv.split('=').next().unwrap_or(kv).to_string())
            .collect();
        finish(tx, "set", &key_names, globals, ui, None)
    }
}

impl Cmd for UnsetCmd {
    fn exec(&self, repo: &Repo, globals: &GlobalArgs, ui: &dyn Ui) -> Result<()> {
        let mut tx = repo.transaction();
        let store = repo.store();
        for path in &self.paths {
            let abs = paths::absolute(repo.root(), path);
            let old = store.read_asset(&abs)?;
            let mut record = old.clone();
            for key in &self.keys {
                record.del(key);
            }

            // `record` never carries the name keys -- they're stripped before
            // persisting, same as every other write path -- so `format_leaf`
            // needs them seeded back from the current filename first, the
            // same way `Repo::stage_modify_or_rename` does it.
            let current_leaf = abs.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            let mut seeded = record.clone();
            if let Ok(parsed) = paths::parse_asset_leaf(current_leaf) {
                let fields = [parsed.type_, parsed.make, parsed.model, parsed.serial];
                for (key, value) in repo.config.name_keys()?.into_iter().zip(fields) {
                    if !seeded.has(&key) {
                        seeded.set(&key, Value::String(value));
                    }
                }
            }
            let new_leaf = repo.format_leaf(&seeded)?;
            if new_leaf != current_leaf {
                if !self.rename {
                    return Err(OnyoError::RenameRequired(new_leaf));
                }
                let dst = abs.parent().unwrap().join(&new_leaf);
                tx.modify_asset(abs.clone(), old, record)?;
                tx.rename_asset(abs, dst)?;
            } else {
                tx.modify_asset(abs, old, record)?;
            }
        }
        finish(tx, "unset", &self.keys, globals, ui, None)
    }
}

impl Cmd for GetCmd {
    fn exec(&self, repo: &Repo, _globals: &GlobalArgs, _ui: &dyn Ui) -> Result<()> {
        let store = repo.store();
        let scopes: Vec<PathBuf> = if self.scopes.is_empty() {
            vec![repo.root().to_path_buf()]
        } else {
            self.scopes.iter().map(|p| paths::absolute(repo.root(), p)).collect()
        };

        let filters = self
            .filters
            .iter()
            .map(|f| Filter::parse(f))
            .collect::<Result<Vec<_>>>()?;

        let sort = if self.sort_ascending {
            SortDirection::Ascending
        } else if self.sort_descending {
            SortDirection::Descending
        } else {
            SortDirection::None
        };

        let name_keys = repo.config.name_keys()?;

        let query = Query {
            scopes,
            depth: self.depth,
            projections: self.keys.clone(),
            filters,
            sort,
            name_keys: name_keys.clone(),
        };

        let rows = query.run(&store)?;
        let headers: Vec<String> = if self.keys.is_empty() { name_keys } else { self.keys.clone() };

        if self.machine_readable {
            print_tsv(&headers, &rows, self.header);
        } else {
            print_rows(&headers, &rows, self.header);
        }
        Ok(())
    }
}

impl Cmd for CatCmd {
    fn exec(&self, repo: &Repo, _globals: &GlobalArgs, ui: &dyn Ui) -> Result<()> {
        let store = repo.store();
        for path in &self.paths {
            let abs = paths::absolute(repo.root(), path);
            let record = store.read_asset(&abs)?;
            ui.print(&record.to_yaml_string()?);
        }
        Ok(())
    }
}

impl Cmd for EditCmd {
    fn exec(&self, repo: &Repo, globals: &GlobalArgs, ui: &dyn Ui) -> Result<()> {
        let editor = repo.config.editor()?;
        let store = repo.store();
        let mut tx = repo.transaction();

        for path in &self.paths {
            let abs = paths::absolute(repo.root(), path);
            let old = store.read_asset(&abs)?;
            let record_path = store.record_path(&abs);

            // Spawn the editor, re-prompting on invalid YAML rather than
            // failing outright.
            let new = loop {
                let mut parts = editor.split_whitespace();
                let program = parts.next().ok_or_else(|| OnyoError::InvalidPath(abs.clone()))?;
                let status = Process::new(program)
                    .args(parts)
                    .arg(&record_path)
                    .status()?;
                if !status.success() {
                    return Err(OnyoError::VcsError {
                        code: status.code().unwrap_or(1),
                        stderr: "editor exited with a non-zero status".to_string(),
                    });
                }

                let content = std::fs::read_to_string(&record_path)?;
                match Record::from_yaml_str(&content) {
                    Ok(rec) => break rec,
                    Err(e) => {
                        ui.log(&format!("invalid YAML in '{}': {}", record_path.display(), e));
                        if ui.confirm("Reopen the editor to fix it? (no discards the edit)") {
                            continue;
                        }
                        store.write_asset(&abs, &old)?;
                        break old.clone();
                    }
                }
            };

            if new != old {
                tx.modify_asset(abs, old, new)?;
            }
        }

        finish(tx, "edit", &[], globals, ui, None)
    }
}

impl Cmd for ShowCmd {
    fn exec(&self, repo: &Repo, _globals: &GlobalArgs, ui: &dyn Ui) -> Result<()> {
        let store = repo.store();
        let roots: Vec<PathBuf> = if self.paths.is_empty() {
            vec![repo.root().to_path_buf()]
        } else {
            self.paths.iter().map(|p| paths::absolute(repo.root(), p)).collect()
        };

        let mut assets = Vec::new();
        for root in &roots {
            match paths::classify(repo.root(), root) {
                PathClass::AssetFile | PathClass::AssetDir => assets.push(root.clone()),
                PathClass::InventoryDir | PathClass::Regular => {
                    for asset in store.enumerate_assets()? {
                        if asset.starts_with(root) {
                            assets.push(asset);
                        }
                    }
                }
                _ => return Err(OnyoError::InvalidPath(root.clone())),
            }
        }
        assets.sort();
        assets.dedup();

        for (i, asset) in assets.iter().enumerate() {
            if i > 0 {
                ui.print("---");
            }
            let record = store.read_asset(asset)?;
            let yaml = record.to_yaml_string()?;
            ui.print(yaml.trim_end());
        }
        Ok(())
    }
}

impl Cmd for TreeCmd {
    fn exec(&self, repo: &Repo, _globals: &GlobalArgs, ui: &dyn Ui) -> Result<()> {
        let abs = paths::absolute(repo.root(), &self.path);
        print_tree(&abs, self.depth, ui, 0);
        Ok(())
    }
}

fn print_tree(dir: &Path, max_depth: Option<usize>, ui: &dyn Ui, depth: usize) {
    if let Some(max) = max_depth {
        if depth > max {
            return;
        }
    }
    let Ok(mut entries) = std::fs::read_dir(dir).map(|e| e.filter_map(|x| x.ok()).collect::<Vec<_>>()) else {
        return;
    };
    entries.sort_by_key(|e| e.file_name());
    for entry in entries {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if paths::is_protected(Path::new(name.as_ref())) {
            continue;
        }
        ui.print(&format!("{}{}", "  ".repeat(depth), name));
        if entry.path().is_dir() {
            print_tree(&entry.path(), max_depth, ui, depth + 1);
        }
    }
}

impl Cmd for HistoryCmd {
    fn exec(&self, repo: &Repo, _globals: &GlobalArgs, _ui: &dyn Ui) -> Result<()> {
        let path = self.path.as_ref().map(|p| paths::absolute(repo.root(), p));
        let code = if self.interactive {
            let command = repo.config.history_interactive()?;
            repo.vcs.log_interactive(&command, path.as_deref())?
        } else {
            let command = repo.config.history_non_interactive()?;
            repo.vcs.log(&command, path.as_deref())?
        };
        if code != 0 {
            return Err(OnyoError::VcsError {
                code,
                stderr: "history command exited non-zero".to_string(),
            });
        }
        Ok(())
    }
}

impl Cmd for ConfigCmd {
    fn exec(&self, repo: &Repo, _globals: &GlobalArgs, ui: &dyn Ui) -> Result<()> {
        if self.unset {
            repo.config.unset(&self.name)?;
            return Ok(());
        }
        match &self.value {
            Some(v) => repo.config.set(&self.name, v),
            None => {
                if let Some(v) = repo.config.get_raw(&self.name)? {
                    ui.print(&v);
                }
                Ok(())
            }
        }
    }
}

impl Cmd for FsckCmd {
    fn exec(&self, repo: &Repo, _globals: &GlobalArgs, ui: &dyn Ui) -> Result<()> {
        let store = repo.store();
        let name_keys = repo.config.name_keys()?;
        crate::fsck::run_all(&store, &repo.vcs, &name_keys)?;
        ui.print("OK");
        Ok(())
    }
}
