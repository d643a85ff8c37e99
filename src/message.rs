//! Commit message synthesis: builds the subject line and the per-operation
//! footer for a transaction's commit.
//!
//! The subject is generated through a three-tier fallback -- long (quoted
//! repo-relative paths), medium (quoted leaf names), short (`'type (count)'`
//! groups) -- each tried in order, the last returned unconditionally with
//! no further truncation.

use std::collections::BTreeSet;
use std::path::Path;

use crate::consts::{ANCHOR_FILE, COMMIT_SUBJECT_MAX_LEN, OPERATIONS_FOOTER_HEADER};
use crate::error::Result;
use crate::paths::relative_posix;
use crate::transaction::Transaction;

pub fn synthesize(
    cmd: &str,
    tx: &Transaction,
    keys: &[String],
    user_message: Option<&str>,
    destination: Option<&Path>,
) -> Result<String> {
    let root = tx.root();

    let sections = build_sections(tx);

    let (subject, body) = if let Some(msg) = user_message {
        let mut paragraphs = msg.splitn(2, "\n\n");
        let subject = paragraphs.next().unwrap_or("").trim().to_string();
        let body = paragraphs.next().unwrap_or("").trim().to_string();
        (subject, body)
    } else {
        let staged_paths = staged_change_paths(tx)?;
        let dest = destination.map(|d| relative_posix(root, d));
        let subject = generate_subject(cmd, keys, &staged_paths, dest.as_deref());
        (subject, String::new())
    };

    let mut footer = String::from(OPERATIONS_FOOTER_HEADER);
    footer.push('\n');
    for (title, lines) in &sections {
        footer.push_str(title);
        footer.push('\n');
        for line in lines {
            footer.push_str(line);
            footer.push('\n');
        }
    }

    if body.is_empty() {
        Ok(format!("{}\n\n{}", subject, footer.trim_end()))
    } else {
        Ok(format!("{}\n\n{}\n\n{}", subject, body, footer.trim_end()))
    }
}

/// Groups recorder output by section title, in first-encountered order --
/// matching the original's dict-insertion-order iteration over titles.
fn build_sections(tx: &Transaction) -> Vec<(&'static str, Vec<String>)> {
    let mut order: Vec<&'static str> = Vec::new();
    let mut grouped: std::collections::HashMap<&'static str, Vec<String>> = std::collections::HashMap::new();

    for (idx, op) in tx.operations().iter().enumerate() {
        for (title, line) in op.record(tx.root(), tx.was_asset_dir(idx)) {
            if !grouped.contains_key(title) {
                order.push(title);
            }
            grouped.entry(title).or_default().push(line);
        }
    }

    order
        .into_iter()
        .map(|title| (title, grouped.remove(title).unwrap_or_default()))
        .collect()
}

/// Repo-relative POSIX paths of everything actually staged for this
/// transaction, sorted. A staged `.anchor` is reported under its parent
/// directory, matching `Repo.generate_commit_message`'s treatment of
/// anchor files as standing in for the directory they mark.
fn staged_change_paths(tx: &Transaction) -> Result<Vec<String>> {
    let root = tx.root();
    let mut paths: Vec<String> = tx
        .vcs()
        .files_staged()?
        .into_iter()
        .map(|p| {
            if p.file_name().map(|n| n == ANCHOR_FILE).unwrap_or(false) {
                p.parent().map(|d| d.to_path_buf()).unwrap_or(p)
            } else {
                p
            }
        })
        .map(|p| relative_posix(root, &p))
        .collect();
    paths.sort();
    paths.dedup();
    Ok(paths)
}

/// The three-tier fallback subject generator, reproduced exactly from
/// `_generate_commit_message_subject`. `keys` is the `set`/`unset` key list
/// (empty for every other command) and renders as a sorted `"(k1,k2)"`
/// suffix on the dummy header, matching `Repo.generate_commit_message`.
fn generate_subject(cmd: &str, keys: &[String], paths: &[String], destination: Option<&str>) -> String {
    let keys_str = if keys.is_empty() {
        String::new()
    } else {
        let mut sorted: Vec<&str> = keys.iter().map(|k| k.as_str()).collect();
        sorted.sort_unstable();
        sorted.dedup();
        format!(" ({})", sorted.join(","))
    };
    let dummy = format!("{} [{}]{}", cmd, paths.len(), keys_str);

    // Tier 1: full paths.
    let quoted: Vec<String> = paths.iter().map(|p| format!("'{}'", p)).collect();
    let mut msg = format!("{}: {}", dummy, quoted.join(","));
    if let Some(d) = destination {
        msg = format!("{} -> '{}'", msg, d);
    }
    if msg.len() < COMMIT_SUBJECT_MAX_LEN {
        return msg;
    }

    // Tier 2: leaf names only.
    let leaves: Vec<String> = paths
        .iter()
        .map(|p| p.rsplit('/').next().unwrap_or(p).to_string())
        .collect();
    let quoted: Vec<String> = leaves.iter().map(|p| format!("'{}'", p)).collect();
    let mut msg = format!("{}: {}", dummy, quoted.join(","));
    if let Some(d) = destination {
        let leaf = d.rsplit('/').next().unwrap_or(d);
        msg = format!("{} -> '{}'", msg, leaf);
    }
    if msg.len() < COMMIT_SUBJECT_MAX_LEN {
        return msg;
    }

    // Tier 3: "'type (count)'" groups, sorted by type name.
    let types: Vec<String> = paths
        .iter()
        .map(|p| {
            let leaf = p.rsplit('/').next().unwrap_or(p);
            leaf.split('_').next().unwrap_or(leaf).to_string()
        })
        .collect();
    let unique_types: BTreeSet<String> = types.iter().cloned().collect();
    let mut groups: Vec<String> = unique_types
        .into_iter()
        .map(|t| {
            let count = types.iter().filter(|x| **x == t).count();
            format!("'{} ({})'", t, count)
        })
        .collect();
    groups.sort();
    let mut msg = format!("{}: {}", dummy, groups.join(","));
    if let Some(d) = destination {
        let leaf = d.rsplit('/').next().unwrap_or(d);
        msg = format!("{} -> '{}'", msg, leaf);
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_message_fits_within_bound_for_trivial_case() {
        let paths = vec!["shelf/laptop_apple_macbookpro.1".to_string()];
        let subject = generate_subject("new", &[], &paths, None);
        assert!(subject.starts_with("new [1]"));
        assert!(subject.contains("shelf/laptop_apple_macbookpro.1"));
    }

    #[test]
    fn keys_render_as_sorted_deduped_parenthetical() {
        let paths = vec!["shelf/laptop_apple_macbookpro.1".to_string()];
        let keys = vec!["ram".to_string(), "color".to_string(), "ram".to_string()];
        let subject = generate_subject("set", &keys, &paths, None);
        assert!(subject.starts_with("set [1] (color,ram):"), "subject was: {}", subject);
    }
}
