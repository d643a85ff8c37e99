//! Path classification and asset-name grammar: pure path-helper functions
//! plus the `type_make_model.serial` leaf-name parser/formatter.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::consts::{ANCHOR_FILE, ASSET_DIR_FILE, GIT_DIR, ONYO_DIR};
use crate::error::{OnyoError, Result};

static NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^._]+)_([^._]+)_([^._]+)\.([^/]+)$").unwrap());

/// Classification of a path within the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathClass {
    Protected,
    AnchorOfRoot,
    Template,
    AssetFile,
    AssetDir,
    InventoryDir,
    Regular,
    Absent,
}

/// Any path containing `.anchor`, `.git`, or `.onyo` as a component.
pub fn is_protected(path: &Path) -> bool {
    path.components().any(|c| {
        let s = c.as_os_str();
        s == ANCHOR_FILE || s == GIT_DIR || s == ONYO_DIR
    })
}

/// Returns true iff `name` matches `^[^._]+_[^._]+_[^._]+\.[^/]+$` with all
/// four captures non-empty.
pub fn is_valid_asset_leaf(name: &str) -> bool {
    NAME_REGEX.is_match(name)
}

/// The four name-key values parsed out of an asset leaf name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    pub type_: String,
    pub make: String,
    pub model: String,
    pub serial: String,
}

pub fn parse_asset_leaf(name: &str) -> Result<ParsedName> {
    let caps = NAME_REGEX
        .captures(name)
        .ok_or_else(|| OnyoError::InvalidAssetName(name.to_string()))?;
    Ok(ParsedName {
        type_: caps[1].to_string(),
        make: caps[2].to_string(),
        model: caps[3].to_string(),
        serial: caps[4].to_string(),
    })
}

/// Classifies `path` (relative to `root`, or absolute under `root`) by
/// inspecting the filesystem and the path's own components.
pub fn classify(root: &Path, path: &Path) -> PathClass {
    let abs = if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    };
    let rel = abs.strip_prefix(root).unwrap_or(path);

    if is_protected(rel) && rel.file_name().map(|n| n == ANCHOR_FILE).unwrap_or(false) {
        // `.anchor` itself is protected, but its containing directory isn't
        // automatically protected merely by virtue of holding an anchor.
        if rel == Path::new(ANCHOR_FILE) {
            return PathClass::AnchorOfRoot;
        }
        return PathClass::Protected;
    }
    if is_protected(rel) {
        return PathClass::Protected;
    }

    if !abs.exists() {
        return PathClass::Absent;
    }

    if let Ok(onyo_rel) = rel.strip_prefix(crate::consts::ONYO_DIR) {
        if onyo_rel.starts_with(crate::consts::TEMPLATES_DIR) && onyo_rel != Path::new(crate::consts::TEMPLATES_DIR)
        {
            return PathClass::Template;
        }
    }

    if abs.is_dir() {
        if abs.join(ASSET_DIR_FILE).is_file() {
            return PathClass::AssetDir;
        }
        if abs.join(ANCHOR_FILE).is_file() {
            return PathClass::InventoryDir;
        }
        return PathClass::Regular;
    }

    if let Some(leaf) = abs.file_name().and_then(|n| n.to_str()) {
        if is_valid_asset_leaf(leaf) {
            return PathClass::AssetFile;
        }
    }

    PathClass::Regular
}

/// Assembles `<type>_<make>_<model>.<serial>` from the required name keys,
/// in the configured name-key order.
pub fn format_name(values: &[(&str, String)]) -> Result<String> {
    for (key, value) in values {
        if value.is_empty() {
            return Err(OnyoError::EmptyNameKey((*key).to_string()));
        }
    }
    if values.len() != 4 {
        return Err(OnyoError::MissingNameKey("name-format".to_string()));
    }
    Ok(format!(
        "{}_{}_{}.{}",
        values[0].1, values[1].1, values[2].1, values[3].1
    ))
}

/// Groups a path's differing components into `a/{x -> y}/b` brace notation,
/// for use in commit-message bodies describing a move or rename.
///
/// Operates on path *components*, not characters: a matching-blocks pass
/// (the same recursive longest-match search `difflib.SequenceMatcher` uses)
/// finds the common components between `src` and `dst`, and the gaps
/// between them become `{old -> new}` groups. A lone component sitting
/// between two such gaps (or at one edge of a single gap) is folded into
/// the adjoining group rather than rendered as a stray single-component
/// equal run, which is what lets `one/two/Bingo Bob` -> `one/two/three/Bingo
/// Bob` read as `one/{two -> two/three}/Bingo Bob` instead of
/// `one/two{ -> /three}/Bingo Bob`.
///
/// A path with no parent directory at all on either side (a bare leaf name)
/// has nothing to diff structurally, so it's reported as a plain move with
/// no bracing: `Bingo Bob -> one/two/Bingo Bob`, never `{ -> one/two/}Bingo
/// Bob`.
pub fn inline_path_diff(src: &Path, dst: &Path) -> String {
    let src_str = src.to_string_lossy().replace('\\', "/");
    let dst_str = dst.to_string_lossy().replace('\\', "/");

    if src_str == dst_str {
        return src_str;
    }

    let src_parts: Vec<&str> = src_str.split('/').collect();
    let dst_parts: Vec<&str> = dst_str.split('/').collect();

    if src_parts.len() < 2 || dst_parts.len() < 2 {
        return format!("{} -> {}", src_str, dst_str);
    }

    let (src_parent, src_leaf) = src_parts.split_at(src_parts.len() - 1);
    let (dst_parent, dst_leaf) = dst_parts.split_at(dst_parts.len() - 1);
    let (src_leaf, dst_leaf) = (src_leaf[0], dst_leaf[0]);

    let parent = render_component_diff(src_parent, dst_parent);
    let leaf = if src_leaf == dst_leaf {
        src_leaf.to_string()
    } else {
        format!("{{{} -> {}}}", src_leaf, dst_leaf)
    };
    format!("{}/{}", parent, leaf)
}

enum Op {
    Equal(Vec<String>),
    Insert(Vec<String>),
    Delete(Vec<String>),
    Replace(Vec<String>, Vec<String>),
}

enum Seg {
    Lit(Vec<String>),
    Group(Vec<String>, Vec<String>),
}

/// Diffs two lists of path components, rendering the result as literal
/// components interleaved with `{old -> new}` groups.
fn render_component_diff(a: &[&str], b: &[&str]) -> String {
    let blocks = matching_blocks(a, b);
    let mut ops = opcodes_from_blocks(a, b, &blocks);

    let mut out: Vec<Seg> = Vec::new();
    for i in 0..ops.len() {
        let op = std::mem::replace(&mut ops[i], Op::Equal(Vec::new()));
        match op {
            Op::Equal(toks) => {
                if !toks.is_empty() {
                    out.push(Seg::Lit(toks));
                }
            }
            Op::Replace(o, n) => out.push(Seg::Group(o, n)),
            Op::Insert(n) => push_gap(&mut out, &mut ops, i, Vec::new(), n),
            Op::Delete(o) => push_gap(&mut out, &mut ops, i, o, Vec::new()),
        }
    }

    out.into_iter()
        .map(|seg| match seg {
            Seg::Lit(toks) => toks.join("/"),
            Seg::Group(o, n) => format!("{{{} -> {}}}", o.join("/"), n.join("/")),
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Appends a `{old -> new}` group for a pure insert/delete gap, folding in
/// a lone neighboring equal component (preferring the one that follows,
/// falling back to the one that precedes) so the group never shows an
/// empty side next to a single stray component.
fn push_gap(out: &mut Vec<Seg>, ops: &mut [Op], i: usize, mut old: Vec<String>, mut new: Vec<String>) {
    let mut absorbed_forward = false;
    if let Some(Op::Equal(toks)) = ops.get_mut(i + 1) {
        if !toks.is_empty() {
            let first = toks.remove(0);
            old.push(first.clone());
            new.push(first);
            absorbed_forward = true;
            if toks.is_empty() {
                if let Some(next) = ops.get_mut(i + 2) {
                    match std::mem::replace(next, Op::Equal(Vec::new())) {
                        Op::Insert(n2) => new.extend(n2),
                        Op::Delete(o2) => old.extend(o2),
                        other => *next = other,
                    }
                }
            }
        }
    }
    if !absorbed_forward {
        if let Some(Seg::Lit(prev)) = out.last_mut() {
            if let Some(tok) = prev.pop() {
                old.insert(0, tok.clone());
                new.insert(0, tok);
                if prev.is_empty() {
                    out.pop();
                }
            }
        }
    }
    out.push(Seg::Group(old, new));
}

fn opcodes_from_blocks(a: &[&str], b: &[&str], blocks: &[(usize, usize, usize)]) -> Vec<Op> {
    let mut ops = Vec::new();
    let (mut i, mut j) = (0usize, 0usize);
    for &(ai, bj, size) in blocks {
        if i < ai && j < bj {
            ops.push(Op::Replace(
                a[i..ai].iter().map(|s| s.to_string()).collect(),
                b[j..bj].iter().map(|s| s.to_string()).collect(),
            ));
        } else if i < ai {
            ops.push(Op::Delete(a[i..ai].iter().map(|s| s.to_string()).collect()));
        } else if j < bj {
            ops.push(Op::Insert(b[j..bj].iter().map(|s| s.to_string()).collect()));
        }
        i = ai + size;
        j = bj + size;
        if size > 0 {
            ops.push(Op::Equal(a[ai..ai + size].iter().map(|s| s.to_string()).collect()));
        }
    }
    ops
}

/// Recursive longest-matching-block search over two component slices,
/// following the same divide-and-conquer shape as `difflib.SequenceMatcher`:
/// find the single longest common run, then recurse on the pieces to its
/// left and right.
fn matching_blocks(a: &[&str], b: &[&str]) -> Vec<(usize, usize, usize)> {
    let mut blocks = Vec::new();
    let mut queue = vec![(0usize, a.len(), 0usize, b.len())];
    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, k) = find_longest_match(a, b, alo, ahi, blo, bhi);
        if k > 0 {
            blocks.push((i, j, k));
            if alo < i && blo < j {
                queue.push((alo, i, blo, j));
            }
            if i + k < ahi && j + k < bhi {
                queue.push((i + k, ahi, j + k, bhi));
            }
        }
    }
    blocks.sort_unstable();
    blocks.push((a.len(), b.len(), 0));
    blocks
}

fn find_longest_match(
    a: &[&str],
    b: &[&str],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let mut j2len: HashMap<usize, usize> = HashMap::new();
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0usize);
    for i in alo..ahi {
        let mut new_j2len: HashMap<usize, usize> = HashMap::new();
        for j in blo..bhi {
            if a[i] == b[j] {
                let prev = j
                    .checked_sub(1)
                    .and_then(|pj| j2len.get(&pj))
                    .copied()
                    .unwrap_or(0);
                let k = prev + 1;
                new_j2len.insert(j, k);
                if k > best_size {
                    best_size = k;
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                }
            }
        }
        j2len = new_j2len;
    }
    (best_i, best_j, best_size)
}

/// Returns the repository-root-relative POSIX-style form of `path`.
pub fn relative_posix(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

pub fn absolute(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
