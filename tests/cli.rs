//! End-to-end CLI scenarios, driven through the real `onyo` binary via
//! `assert_cmd`. Mirrors the black-box style of
//! `examples/pwinckles-rocfl/tests/cli-tests.rs`, adapted to onyo's
//! subcommands and exit-code taxonomy.

mod common;

use assert_fs::TempDir;
use predicates::prelude::*;

#[test]
fn create_laptop_asset() {
    let temp = TempDir::new().unwrap();
    let repo = common::init_repo(&temp);
    common::mkdir(&repo).arg("shelf").assert().success();

    common::new(&repo)
        .arg("--directory")
        .arg("shelf")
        .arg("--keys")
        .arg("type=laptop")
        .arg("make=apple")
        .arg("model=macbookpro")
        .arg("serial=1")
        .assert()
        .success();

    let asset = repo.join("shelf/laptop_apple_macbookpro.1");
    assert!(asset.is_file());

    // type/make/model/serial are pseudo-keys derived from the filename and
    // must not be duplicated into the asset's own content.
    let content = std::fs::read_to_string(&asset).unwrap();
    assert!(
        content.trim().is_empty(),
        "expected an empty asset body, got: {}",
        content
    );

    let msg = common::commit_message(&repo);
    assert!(msg.starts_with("new [1]"), "subject was: {}", msg);
    assert!(msg.contains("'shelf/laptop_apple_macbookpro.1'"));
    assert!(msg.contains("New assets:"));
    assert!(msg.contains("- shelf/laptop_apple_macbookpro.1"));

    common::fsck(&repo).assert().success();
}

#[test]
fn rename_via_set() {
    let temp = TempDir::new().unwrap();
    let repo = common::init_repo(&temp);
    common::mkdir(&repo).arg("shelf").assert().success();
    common::new(&repo)
        .arg("--directory")
        .arg("shelf")
        .arg("--keys")
        .arg("type=laptop")
        .arg("make=apple")
        .arg("model=macbookpro")
        .arg("serial=1")
        .assert()
        .success();

    common::set(&repo)
        .arg("--rename")
        .arg("--keys")
        .arg("type=notebook")
        .arg("shelf/laptop_apple_macbookpro.1")
        .assert()
        .success();

    assert!(!repo.join("shelf/laptop_apple_macbookpro.1").exists());
    assert!(repo.join("shelf/notebook_apple_macbookpro.1").is_file());

    let msg = common::commit_message(&repo);
    assert!(msg.starts_with("set [1] (type):"), "subject was: {}", msg);
    assert!(msg.contains("Renamed assets:"));
    assert!(msg.contains("{laptop_apple_macbookpro.1 -> notebook_apple_macbookpro.1}"));

    common::fsck(&repo).assert().success();
}

#[test]
fn duplicate_asset_name_is_rejected_cleanly() {
    let temp = TempDir::new().unwrap();
    let repo = common::init_repo(&temp);
    common::mkdir(&repo).arg("a").assert().success();
    common::mkdir(&repo).arg("b").assert().success();

    common::new(&repo)
        .arg("--directory")
        .arg("a")
        .arg("--keys")
        .arg("type=laptop")
        .arg("make=apple")
        .arg("model=macbookpro")
        .arg("serial=1")
        .assert()
        .success();

    // Same type/make/model/serial in a different directory: a repo-wide
    // leaf-name collision, not a plain path collision.
    common::new(&repo)
        .arg("--directory")
        .arg("b")
        .arg("--keys")
        .arg("type=laptop")
        .arg("make=apple")
        .arg("model=macbookpro")
        .arg("serial=1")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("already exists"));

    // The failed attempt must leave no trace behind.
    common::fsck(&repo).assert().success();
    assert!(!repo.join("b/laptop_apple_macbookpro.1").exists());
}

#[test]
fn query_projection_sorted_ascending_shows_unset_for_missing_field() {
    let temp = TempDir::new().unwrap();
    let repo = common::init_repo(&temp);
    common::mkdir(&repo).arg("shelf").assert().success();

    common::new(&repo)
        .arg("--directory")
        .arg("shelf")
        .arg("--keys")
        .arg("type=laptop")
        .arg("make=apple")
        .arg("model=macbookpro")
        .arg("serial=1")
        .arg("build-date=2021-01-01")
        .assert()
        .success();
    common::new(&repo)
        .arg("--directory")
        .arg("shelf")
        .arg("--keys")
        .arg("type=laptop")
        .arg("make=apple")
        .arg("model=macbookpro")
        .arg("serial=2")
        .arg("build-date=2020-01-01")
        .assert()
        .success();
    common::new(&repo)
        .arg("--directory")
        .arg("shelf")
        .arg("--keys")
        .arg("type=laptop")
        .arg("make=apple")
        .arg("model=macbookpro")
        .arg("serial=3")
        .assert()
        .success();

    let assert = common::get(&repo)
        .arg("--filter")
        .arg("type=laptop")
        .arg("--key")
        .arg("build-date")
        .arg("--sort-ascending")
        .arg("-H")
        .arg("--machine-readable")
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    let idx_2020 = stdout.find("2020-01-01").expect("2020 row present");
    let idx_2021 = stdout.find("2021-01-01").expect("2021 row present");
    let idx_unset = stdout.find("<unset>").expect("unset row present");
    assert!(
        idx_2020 < idx_2021 && idx_2021 < idx_unset,
        "rows out of order:\n{}",
        stdout
    );
}

#[test]
fn promoting_asset_to_directory_adds_sidecar_and_anchor() {
    let temp = TempDir::new().unwrap();
    let repo = common::init_repo(&temp);
    common::mkdir(&repo).arg("shelf").assert().success();
    common::new(&repo)
        .arg("--directory")
        .arg("shelf")
        .arg("--keys")
        .arg("type=laptop")
        .arg("make=apple")
        .arg("model=macbookpro")
        .arg("serial=1")
        .assert()
        .success();

    common::set(&repo)
        .arg("--keys")
        .arg("is_asset_directory=true")
        .arg("shelf/laptop_apple_macbookpro.1")
        .assert()
        .success();

    let asset_dir = repo.join("shelf/laptop_apple_macbookpro.1");
    assert!(asset_dir.is_dir());
    assert!(asset_dir.join(".asset").is_file());
    assert!(asset_dir.join(".anchor").is_file());

    let msg = common::commit_message(&repo);
    assert!(msg.contains("Modified assets:"));
    assert!(msg.contains("New directories:"));

    common::fsck(&repo).assert().success();
}

#[test]
fn recursive_remove_cleans_up_nested_anchors_and_assets() {
    let temp = TempDir::new().unwrap();
    let repo = common::init_repo(&temp);
    common::mkdir(&repo).arg("a").assert().success();
    common::mkdir(&repo).arg("a/b").assert().success();
    common::mkdir(&repo).arg("a/b/c").assert().success();

    common::new(&repo)
        .arg("--directory")
        .arg("a/b/c")
        .arg("--keys")
        .arg("type=camera")
        .arg("make=nikon")
        .arg("model=f3")
        .arg("serial=1")
        .assert()
        .success();

    common::rm(&repo).arg("--recursive").arg("a").assert().success();

    assert!(!repo.join("a").exists());

    // The prior recursive delete must leave the git index in sync with the
    // worktree, not just the filesystem.
    common::fsck(&repo).assert().success();
}

#[test]
fn removing_a_non_empty_directory_without_recursive_fails() {
    let temp = TempDir::new().unwrap();
    let repo = common::init_repo(&temp);
    common::mkdir(&repo).arg("a").assert().success();
    common::new(&repo)
        .arg("--directory")
        .arg("a")
        .arg("--keys")
        .arg("type=camera")
        .arg("make=nikon")
        .arg("model=f3")
        .arg("serial=1")
        .assert()
        .success();

    common::rm(&repo).arg("a").assert().failure().code(1);

    assert!(repo.join("a").is_dir());
    common::fsck(&repo).assert().success();
}

#[test]
fn unset_removes_a_key_without_touching_the_name() {
    let temp = TempDir::new().unwrap();
    let repo = common::init_repo(&temp);
    common::mkdir(&repo).arg("shelf").assert().success();
    common::new(&repo)
        .arg("--directory")
        .arg("shelf")
        .arg("--keys")
        .arg("type=laptop")
        .arg("make=apple")
        .arg("model=macbookpro")
        .arg("serial=1")
        .arg("ram=16")
        .assert()
        .success();

    common::unset(&repo)
        .arg("--keys")
        .arg("ram")
        .arg("shelf/laptop_apple_macbookpro.1")
        .assert()
        .success();

    let asset = repo.join("shelf/laptop_apple_macbookpro.1");
    assert!(asset.is_file());
    let content = std::fs::read_to_string(&asset).unwrap();
    assert!(!content.contains("ram"));

    let msg = common::commit_message(&repo);
    assert!(msg.starts_with("unset [1] (ram):"), "subject was: {}", msg);

    common::fsck(&repo).assert().success();
}

#[test]
fn rename_without_flag_is_rejected() {
    let temp = TempDir::new().unwrap();
    let repo = common::init_repo(&temp);
    common::mkdir(&repo).arg("shelf").assert().success();
    common::new(&repo)
        .arg("--directory")
        .arg("shelf")
        .arg("--keys")
        .arg("type=laptop")
        .arg("make=apple")
        .arg("model=macbookpro")
        .arg("serial=1")
        .assert()
        .success();

    common::set(&repo)
        .arg("--keys")
        .arg("type=notebook")
        .arg("shelf/laptop_apple_macbookpro.1")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("requires --rename"));

    assert!(repo.join("shelf/laptop_apple_macbookpro.1").is_file());
}

#[test]
fn faux_serial_length_below_minimum_is_rejected() {
    let temp = TempDir::new().unwrap();
    let repo = common::init_repo(&temp);
    common::mkdir(&repo).arg("shelf").assert().success();

    common::new(&repo)
        .arg("--directory")
        .arg("shelf")
        .arg("--faux-length")
        .arg("3")
        .arg("--keys")
        .arg("type=laptop")
        .arg("make=apple")
        .arg("model=macbookpro")
        .arg("serial=faux")
        .assert()
        .failure()
        .code(2);
}

#[test]
fn sort_ascending_and_descending_conflict_at_clap_level() {
    let temp = TempDir::new().unwrap();
    let repo = common::init_repo(&temp);
    common::get(&repo)
        .arg("--sort-ascending")
        .arg("--sort-descending")
        .assert()
        .failure()
        .code(2);
}

#[test]
fn quiet_without_yes_is_a_usage_error() {
    let temp = TempDir::new().unwrap();
    let repo = temp.path().join("repo");
    common::fsck(&repo)
        .arg("--quiet")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("--quiet requires --yes"));
}

#[test]
fn config_set_then_get_roundtrips() {
    let temp = TempDir::new().unwrap();
    let repo = common::init_repo(&temp);
    common::config(&repo)
        .arg("onyo.core.editor")
        .arg("vim")
        .assert()
        .success();

    common::config(&repo)
        .arg("onyo.core.editor")
        .assert()
        .success()
        .stdout(predicate::str::contains("vim"));
}

#[test]
fn config_unset_missing_key_exits_five() {
    let temp = TempDir::new().unwrap();
    let repo = common::init_repo(&temp);
    common::config(&repo)
        .arg("onyo.core.editor")
        .arg("--unset")
        .assert()
        .failure()
        .code(5);
}

#[test]
fn cat_prints_asset_yaml() {
    let temp = TempDir::new().unwrap();
    let repo = common::init_repo(&temp);
    common::mkdir(&repo).arg("shelf").assert().success();
    common::new(&repo)
        .arg("--directory")
        .arg("shelf")
        .arg("--keys")
        .arg("type=laptop")
        .arg("make=apple")
        .arg("model=macbookpro")
        .arg("serial=1")
        .arg("ram=16")
        .assert()
        .success();

    common::cat(&repo)
        .arg("shelf/laptop_apple_macbookpro.1")
        .assert()
        .success()
        .stdout(predicate::str::contains("ram: 16"));
}

#[test]
fn show_expands_directory_into_a_yaml_document_stream() {
    let temp = TempDir::new().unwrap();
    let repo = common::init_repo(&temp);
    common::mkdir(&repo).arg("shelf").assert().success();
    common::new(&repo)
        .arg("--directory")
        .arg("shelf")
        .arg("--keys")
        .arg("type=laptop")
        .arg("make=apple")
        .arg("model=macbookpro")
        .arg("serial=1")
        .assert()
        .success();
    common::new(&repo)
        .arg("--directory")
        .arg("shelf")
        .arg("--keys")
        .arg("type=laptop")
        .arg("make=apple")
        .arg("model=macbookpro")
        .arg("serial=2")
        .assert()
        .success();

    common::show(&repo)
        .arg("shelf")
        .assert()
        .success()
        .stdout(predicate::str::contains("---"));
}
