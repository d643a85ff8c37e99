//! Typed, staged units of change: one `enum Operation`, with one `execute`,
//! one `diff`, and one `record` function, each dispatching by variant
//! rather than a callable-registry table.

use std::path::{Path, PathBuf};

use crate::consts::{ANCHOR_FILE, ASSET_DIR_FILE};
use crate::error::{OnyoError, Result};
use crate::paths::{inline_path_diff, relative_posix};
use crate::record::Record;
use crate::store::AssetStore;

/// Paths touched by an operation's executor: the first list needs staging
/// for commit, the second needs staging as newly-tracked content. Mirrors
/// the original executors' `(paths_to_commit, paths_to_stage)` tuple.
pub struct ExecutionOutcome {
    pub to_stage: Vec<PathBuf>,
    pub to_remove: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub enum Operation {
    /// `is_dir` mirrors the reserved `is_asset_directory` key: when set,
    /// the executor creates `path` as a directory with a `.asset` sidecar
    /// and an anchor instead of a plain file.
    NewAsset(Record, PathBuf, bool),
    NewDirectory(PathBuf),
    ModifyAsset { path: PathBuf, old: Record, new: Record },
    /// An existing asset file turned into an asset directory via `set
    /// is_asset_directory=true`.
    PromoteAssetDir { path: PathBuf, old: Record, new: Record },
    /// The reverse: an asset directory turned back into a plain file.
    DemoteAssetDir { path: PathBuf, old: Record, new: Record },
    MoveAsset { src: PathBuf, dst_dir: PathBuf },
    MoveDirectory { src: PathBuf, dst_dir: PathBuf },
    RenameAsset { src: PathBuf, dst: PathBuf },
    RenameDirectory { src: PathBuf, dst: PathBuf },
    RemoveAsset(PathBuf),
    RemoveDirectory { path: PathBuf, recursive: bool },
}

impl Operation {
    pub fn execute(&self, store: &AssetStore) -> Result<ExecutionOutcome> {
        match self {
            Operation::NewAsset(record, path, is_dir) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                if *is_dir {
                    std::fs::create_dir_all(path)?;
                    store.write_asset(path, record)?;
                    let anchor = store.create_anchor(path)?;
                    Ok(ExecutionOutcome {
                        to_stage: vec![path.join(ASSET_DIR_FILE), anchor],
                        to_remove: vec![],
                    })
                } else {
                    store.write_asset(path, record)?;
                    Ok(ExecutionOutcome {
                        to_stage: vec![path.clone()],
                        to_remove: vec![],
                    })
                }
            }
            Operation::NewDirectory(path) => {
                let anchor = store.create_anchor(path)?;
                Ok(ExecutionOutcome {
                    to_stage: vec![anchor],
                    to_remove: vec![],
                })
            }
            Operation::ModifyAsset { path, new, .. } => {
                store.write_asset(path, new)?;
                Ok(ExecutionOutcome {
                    to_stage: vec![path.clone()],
                    to_remove: vec![],
                })
            }
            Operation::PromoteAssetDir { path, new, .. } => {
                store.promote_to_asset_dir(path, new)?;
                Ok(ExecutionOutcome {
                    to_stage: vec![path.join(ASSET_DIR_FILE), path.join(ANCHOR_FILE)],
                    to_remove: vec![path.clone()],
                })
            }
            Operation::DemoteAssetDir { path, new, .. } => {
                store.demote_to_asset_file(path, new)?;
                Ok(ExecutionOutcome {
                    to_stage: vec![path.clone()],
                    to_remove: vec![path.join(ASSET_DIR_FILE), path.join(ANCHOR_FILE)],
                })
            }
            Operation::MoveAsset { src, dst_dir } | Operation::MoveDirectory { src, dst_dir } => {
                let dst = dst_dir.join(src.file_name().ok_or_else(|| OnyoError::InvalidPath(src.clone()))?);
                store.vcs.rename(src, &dst)?;
                Ok(ExecutionOutcome {
                    to_stage: vec![src.clone(), dst],
                    to_remove: vec![],
                })
            }
            Operation::RenameAsset { src, dst } | Operation::RenameDirectory { src, dst } => {
                store.vcs.rename(src, dst)?;
                Ok(ExecutionOutcome {
                    to_stage: vec![src.clone(), dst.clone()],
                    to_remove: vec![],
                })
            }
            Operation::RemoveAsset(path) => {
                if path.is_dir() {
                    let anchor = path.join(ANCHOR_FILE);
                    let sidecar = path.join(ASSET_DIR_FILE);
                    std::fs::remove_file(&sidecar).ok();

                    let has_nested_content = std::fs::read_dir(path)?
                        .filter_map(|e| e.ok())
                        .any(|e| e.file_name() != std::ffi::OsString::from(ANCHOR_FILE));

                    if has_nested_content {
                        // The directory still holds nested inventory content: retain it
                        // as a plain inventory directory, regenerating its anchor and
                        // dropping `is_asset_directory`, rather than deleting it.
                        if !anchor.is_file() {
                            std::fs::write(&anchor, "")?;
                        }
                        Ok(ExecutionOutcome {
                            to_stage: vec![anchor],
                            to_remove: vec![sidecar],
                        })
                    } else {
                        std::fs::remove_file(&anchor).ok();
                        std::fs::remove_dir(path).ok();
                        Ok(ExecutionOutcome {
                            to_stage: vec![],
                            to_remove: vec![anchor, sidecar],
                        })
                    }
                } else {
                    std::fs::remove_file(path)?;
                    Ok(ExecutionOutcome {
                        to_stage: vec![],
                        to_remove: vec![path.clone()],
                    })
                }
            }
            Operation::RemoveDirectory { path, recursive } => {
                let mut entries = std::fs::read_dir(path)?
                    .filter_map(|e| e.ok())
                    .map(|e| e.path())
                    .filter(|p| p.file_name().and_then(|n| n.to_str()) != Some(ANCHOR_FILE));
                let has_content = entries.next().is_some();
                if has_content && !recursive {
                    return Err(OnyoError::PathExists(path.clone()));
                }

                // Every previously-tracked file beneath `path` needs an explicit
                // `stage_remove` -- `git2::Index::remove_path` only drops a literal
                // index entry, and git has no directory entries of its own, so
                // staging just `path` would leave the index (and thus the next
                // commit's tree) out of sync with the now-deleted files.
                let mut removed: Vec<PathBuf> = Vec::new();
                if has_content && *recursive {
                    for entry in walkdir::WalkDir::new(path).into_iter().filter_map(|e| e.ok()) {
                        if entry.file_type().is_file() {
                            removed.push(entry.path().to_path_buf());
                        }
                    }
                    std::fs::remove_dir_all(path)?;
                } else {
                    removed.push(path.join(ANCHOR_FILE));
                    std::fs::remove_file(path.join(ANCHOR_FILE)).ok();
                    std::fs::remove_dir(path)?;
                }
                Ok(ExecutionOutcome {
                    to_stage: vec![],
                    to_remove: removed,
                })
            }
        }
    }

    /// Unified-diff-style lines sufficient for a human reviewer.
    pub fn diff(&self) -> Vec<String> {
        match self {
            Operation::NewAsset(record, path, _) => diff_assets(&Record::new(), record, path, path),
            Operation::NewDirectory(path) => vec![format!("+{}", path.display())],
            Operation::ModifyAsset { path, old, new } => diff_assets(old, new, path, path),
            Operation::PromoteAssetDir { path, old, new } => {
                let mut lines = diff_assets(old, new, path, path);
                lines.push(format!("+{}/{}", path.display(), ANCHOR_FILE));
                lines
            }
            Operation::DemoteAssetDir { path, old, new } => {
                let mut lines = diff_assets(old, new, path, path);
                lines.push(format!("-{}/{}", path.display(), ANCHOR_FILE));
                lines
            }
            Operation::MoveAsset { src, dst_dir } | Operation::MoveDirectory { src, dst_dir } => {
                let dst = dst_dir.join(src.file_name().unwrap_or_default());
                vec![format!("{} -> {}", src.display(), dst.display())]
            }
            Operation::RenameAsset { src, dst } | Operation::RenameDirectory { src, dst } => {
                vec![format!("{} -> {}", src.display(), dst.display())]
            }
            Operation::RemoveAsset(path) => vec![format!("-{}", path.display())],
            Operation::RemoveDirectory { path, .. } => vec![format!("-{}", path.display())],
        }
    }

    /// `(section_title, bullet_line)` pairs. A single filesystem
    /// move/rename/removal of an asset directory yields *two* pairs, per
    /// the asset/directory duality rule.
    pub fn record(&self, root: &Path, src_is_asset_dir: bool) -> Vec<(&'static str, String)> {
        match self {
            Operation::NewAsset(_, path, _) => vec![("New assets:", bullet(root, path))],
            Operation::NewDirectory(path) => vec![("New directories:", bullet(root, path))],
            Operation::ModifyAsset { path, .. } => vec![("Modified assets:", bullet(root, path))],
            Operation::PromoteAssetDir { path, .. } => vec![
                ("Modified assets:", bullet(root, path)),
                ("New directories:", bullet(root, path)),
            ],
            Operation::DemoteAssetDir { path, .. } => vec![
                ("Modified assets:", bullet(root, path)),
                ("Removed directories:", bullet(root, path)),
            ],
            Operation::MoveAsset { src, dst_dir } => {
                let mut out = vec![("Moved assets:", move_bullet(root, src, dst_dir))];
                if src_is_asset_dir {
                    out.push(("Moved directories:", move_bullet(root, src, dst_dir)));
                }
                out
            }
            Operation::MoveDirectory { src, dst_dir } => {
                let mut out = vec![("Moved directories:", move_bullet(root, src, dst_dir))];
                if src_is_asset_dir {
                    out.push(("Moved assets:", move_bullet(root, src, dst_dir)));
                }
                out
            }
            Operation::RenameAsset { src, dst } => {
                let mut out = vec![("Renamed assets:", rename_bullet(root, src, dst))];
                if src_is_asset_dir {
                    out.push(("Renamed directories:", rename_bullet(root, src, dst)));
                }
                out
            }
            Operation::RenameDirectory { src, dst } => {
                let mut out = vec![("Renamed directories:", rename_bullet(root, src, dst))];
                if src_is_asset_dir {
                    out.push(("Renamed assets:", rename_bullet(root, src, dst)));
                }
                out
            }
            Operation::RemoveAsset(path) => vec![("Removed assets:", bullet(root, path))],
            Operation::RemoveDirectory { path, .. } => vec![("Removed directories:", bullet(root, path))],
        }
    }
}

fn bullet(root: &Path, path: &Path) -> String {
    format!("- {}", relative_posix(root, path))
}

fn move_bullet(root: &Path, src: &Path, dst_dir: &Path) -> String {
    let dst = dst_dir.join(src.file_name().unwrap_or_default());
    format!(
        "- {} -> {}",
        relative_posix(root, src),
        relative_posix(root, &dst)
    )
}

fn rename_bullet(root: &Path, src: &Path, dst: &Path) -> String {
    format!(
        "- {}",
        inline_path_diff(&relative_posix(root, src).into(), &relative_posix(root, dst).into())
    )
}

/// Unified-diff-style line comparison between two records' serialized YAML,
/// hand-rolled (no external diff crate) on an LCS line matcher.
fn diff_assets(old: &Record, new: &Record, old_path: &Path, new_path: &Path) -> Vec<String> {
    let old_text = old.to_yaml_string().unwrap_or_default();
    let new_text = new.to_yaml_string().unwrap_or_default();
    let old_lines: Vec<&str> = old_text.lines().collect();
    let new_lines: Vec<&str> = new_text.lines().collect();

    if old_lines == new_lines {
        return vec![];
    }

    let mut out = vec![
        format!("--- {}", old_path.display()),
        format!("+++ {}", new_path.display()),
    ];
    out.extend(unified_lines(&old_lines, &new_lines));
    out
}

fn unified_lines(a: &[&str], b: &[&str]) -> Vec<String> {
    let n = a.len();
    let m = b.len();
    let mut lcs = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if a[i] == b[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if a[i] == b[j] {
            out.push(format!(" {}", a[i]));
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            out.push(format!("-{}", a[i]));
            i += 1;
        } else {
            out.push(format!("+{}", b[j]));
            j += 1;
        }
    }
    while i < n {
        out.push(format!("-{}", a[i]));
        i += 1;
    }
    while j < m {
        out.push(format!("+{}", b[j]));
        j += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modify_identical_records_produces_empty_diff() {
        let mut r = Record::new();
        r.set("a", serde_yaml::Value::String("1".into()));
        let diff = diff_assets(&r, &r.clone(), Path::new("x"), Path::new("x"));
        assert!(diff.is_empty());
    }

    #[test]
    fn inline_path_diff_used_in_rename_bullet() {
        let line = rename_bullet(
            Path::new("/repo"),
            Path::new("/repo/shelf/laptop_apple_macbookpro.1"),
            Path::new("/repo/shelf/notebook_apple_macbookpro.1"),
        );
        assert!(line.contains("{laptop -> notebook}"));
    }
}
