//! Shared CLI test harness: one thin wrapper per `onyo` subcommand, each
//! spawning the real binary through `assert_cmd`, mirroring
//! `examples/pwinckles-rocfl/tests/common/mod.rs`'s
//! one-helper-per-subcommand shape.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;

fn onyo(path: &Path, subcommand: &str) -> Command {
    let mut cmd = Command::cargo_bin("onyo").unwrap();
    cmd.arg("-C").arg(path).arg(subcommand);
    cmd
}

/// Like `onyo`, but with `--yes` already set so mutating subcommands run
/// non-interactively by default; individual tests can still add `--quiet`,
/// `--dry-run`, etc. on top.
fn onyo_yes(path: &Path, subcommand: &str) -> Command {
    let mut cmd = onyo(path, subcommand);
    cmd.arg("--yes");
    cmd
}

pub fn init(path: &Path) -> Command {
    onyo(path, "init")
}

pub fn new(path: &Path) -> Command {
    onyo_yes(path, "new")
}

pub fn mkdir(path: &Path) -> Command {
    onyo_yes(path, "mkdir")
}

pub fn rm(path: &Path) -> Command {
    onyo_yes(path, "rm")
}

pub fn mv(path: &Path) -> Command {
    onyo_yes(path, "mv")
}

pub fn set(path: &Path) -> Command {
    onyo_yes(path, "set")
}

pub fn unset(path: &Path) -> Command {
    onyo_yes(path, "unset")
}

pub fn get(path: &Path) -> Command {
    onyo(path, "get")
}

pub fn cat(path: &Path) -> Command {
    onyo(path, "cat")
}

pub fn show(path: &Path) -> Command {
    onyo(path, "show")
}

pub fn tree(path: &Path) -> Command {
    onyo(path, "tree")
}

pub fn config(path: &Path) -> Command {
    onyo(path, "config")
}

pub fn fsck(path: &Path) -> Command {
    onyo(path, "fsck")
}

/// Initializes a fresh onyo repository under `temp/repo` and returns its path.
pub fn init_repo(temp: &assert_fs::TempDir) -> PathBuf {
    let repo = temp.path().join("repo");
    init(&repo).assert().success();
    repo
}

/// The subject and body of the repository's most recent commit, fetched
/// with a direct `git log` call rather than onyo's own `history` command
/// (which is itself under test elsewhere).
pub fn commit_message(repo: &Path) -> String {
    let output = std::process::Command::new("git")
        .args(["-C", &repo.to_string_lossy(), "log", "-1", "--pretty=%B"])
        .output()
        .expect("git log must be on PATH for these tests");
    String::from_utf8_lossy(&output.stdout).into_owned()
}
