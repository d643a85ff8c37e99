//! Library-level round-trip checks driven straight through `Repo`,
//! `Transaction`, and `Query`, skipping the CLI layer -- the onyo
//! equivalent of `examples/pwinckles-rocfl/tests/fs-tests.rs`'s
//! direct-repo integration style.

use assert_fs::TempDir;
use serde_yaml::Value;

use onyo::fsck;
use onyo::query::{Filter, Query, SortDirection};
use onyo::record::Record;
use onyo::repo::Repo;
use onyo::store::AssetStore;

fn laptop_overrides(serial: &str) -> Record {
    let mut r = Record::new();
    r.set("type", Value::String("laptop".into()));
    r.set("make", Value::String("apple".into()));
    r.set("model", Value::String("macbookpro".into()));
    r.set("serial", Value::String(serial.into()));
    r
}

#[test]
fn store_write_then_read_round_trips_a_record() {
    let temp = TempDir::new().unwrap();
    let repo = Repo::init(temp.path()).unwrap();
    let store = repo.store();

    let mut record = Record::new();
    record.set("color", Value::String("red".into()));
    record.set("count", Value::Number(3.into()));

    let asset_path = repo.root().join("widget_acme_model1.1");
    store.write_asset(&asset_path, &record).unwrap();

    let read_back = store.read_asset(&asset_path).unwrap();
    assert_eq!(read_back, record);
}

#[test]
fn modify_with_no_real_change_yields_an_empty_diff() {
    let temp = TempDir::new().unwrap();
    let repo = Repo::init(temp.path()).unwrap();

    let mut tx = repo.transaction();
    tx.add_directory(repo.root().join("shelf")).unwrap();
    tx.commit("mkdir", &[], None, None).unwrap();

    let mut overrides = laptop_overrides("1");
    overrides.set("owner", Value::String("alice".into()));
    let mut tx = repo.transaction();
    let path = repo
        .stage_new_asset(&mut tx, None, &overrides, &repo.root().join("shelf"))
        .unwrap();
    tx.commit("new", &[], None, None).unwrap();

    // An empty override set must be a true no-op: same leaf name (the
    // filename's type/make/model/serial are recovered for the merge even
    // though they're never persisted as content), same content.
    let mut tx = repo.transaction();
    repo.stage_modify_or_rename(&mut tx, &path, &Record::new(), false)
        .unwrap();
    let diff = tx.diff();
    assert!(diff.is_empty(), "expected no diff, got: {:?}", diff);
    tx.abort();

    assert_eq!(path, repo.root().join("shelf/laptop_apple_macbookpro.1"));
    let content = repo.store().read_asset(&path).unwrap();
    assert_eq!(content.get_string("owner"), Some("alice".to_string()));
}

#[test]
fn moving_an_asset_out_and_back_restores_its_original_path() {
    let temp = TempDir::new().unwrap();
    let repo = Repo::init(temp.path()).unwrap();

    let mut tx = repo.transaction();
    tx.add_directory(repo.root().join("a")).unwrap();
    tx.add_directory(repo.root().join("b")).unwrap();
    tx.commit("mkdir", &[], None, None).unwrap();

    let mut overrides = laptop_overrides("1");
    overrides.set("owner", Value::String("bob".into()));
    let mut tx = repo.transaction();
    let original_path = repo
        .stage_new_asset(&mut tx, None, &overrides, &repo.root().join("a"))
        .unwrap();
    tx.commit("new", &[], None, None).unwrap();

    let mut tx = repo.transaction();
    tx.move_asset(original_path.clone(), repo.root().join("b"))
        .unwrap();
    tx.commit("mv", &[], None, Some(&repo.root().join("b"))).unwrap();

    let moved_path = repo.root().join("b/laptop_apple_macbookpro.1");
    assert!(moved_path.is_file());
    assert!(!original_path.exists());

    let mut tx = repo.transaction();
    tx.move_asset(moved_path.clone(), repo.root().join("a"))
        .unwrap();
    tx.commit("mv", &[], None, Some(&repo.root().join("a"))).unwrap();

    assert!(original_path.is_file());
    assert!(!moved_path.exists());

    let content = repo.store().read_asset(&original_path).unwrap();
    assert_eq!(content.get_string("owner"), Some("bob".to_string()));

    fsck::run_all(&repo.store(), &repo.vcs, &repo.config.name_keys().unwrap()).unwrap();
}

#[test]
fn removing_then_recreating_an_asset_reproduces_its_original_content() {
    let temp = TempDir::new().unwrap();
    let repo = Repo::init(temp.path()).unwrap();

    let mut tx = repo.transaction();
    tx.add_directory(repo.root().join("shelf")).unwrap();
    tx.commit("mkdir", &[], None, None).unwrap();

    let mut overrides = laptop_overrides("1");
    overrides.set("owner", Value::String("carol".into()));
    let mut tx = repo.transaction();
    let path = repo
        .stage_new_asset(&mut tx, None, &overrides, &repo.root().join("shelf"))
        .unwrap();
    tx.commit("new", &[], None, None).unwrap();
    let original_content = repo.store().read_asset(&path).unwrap();

    let mut tx = repo.transaction();
    tx.remove_asset(path.clone()).unwrap();
    tx.commit("rm", &[], None, None).unwrap();
    assert!(!path.exists());

    let mut tx = repo.transaction();
    let recreated_path = repo
        .stage_new_asset(&mut tx, None, &overrides, &repo.root().join("shelf"))
        .unwrap();
    tx.commit("new", &[], None, None).unwrap();

    assert_eq!(recreated_path, path);
    let recreated_content = repo.store().read_asset(&recreated_path).unwrap();
    assert_eq!(recreated_content, original_content);

    fsck::run_all(&repo.store(), &repo.vcs, &repo.config.name_keys().unwrap()).unwrap();
}

#[test]
fn fsck_rejects_a_literal_pseudo_key_left_in_asset_content() {
    let temp = TempDir::new().unwrap();
    let repo = Repo::init(temp.path()).unwrap();

    // Bypass the transaction layer entirely to simulate a repo corrupted
    // by something other than onyo itself (a hand-edited file, a bad
    // merge): the store will happily persist a `type` field that only
    // `repo::Repo` would normally strip.
    let store = AssetStore::new(&repo.vcs);
    let asset_path = repo.root().join("laptop_apple_macbookpro.1");
    let mut corrupt = Record::new();
    corrupt.set("type", Value::String("laptop".into()));
    store.write_asset(&asset_path, &corrupt).unwrap();
    repo.vcs.stage(&[asset_path]).unwrap();
    repo.vcs.commit("corrupt").unwrap();

    let err = fsck::run_all(&repo.store(), &repo.vcs, &repo.config.name_keys().unwrap()).unwrap_err();
    assert!(matches!(
        err,
        onyo::OnyoError::InvalidRepo { which: "pseudo-keys" }
    ));
}

#[test]
fn query_filters_by_pseudo_key_and_sorts_ascending_by_projected_real_key() {
    let temp = TempDir::new().unwrap();
    let repo = Repo::init(temp.path()).unwrap();

    let mut tx = repo.transaction();
    tx.add_directory(repo.root().join("shelf")).unwrap();
    tx.commit("mkdir", &[], None, None).unwrap();

    for (serial, priority) in [("1", 30), ("2", 10), ("3", 20)] {
        let mut overrides = laptop_overrides(serial);
        overrides.set("priority", Value::Number(priority.into()));
        let mut tx = repo.transaction();
        repo.stage_new_asset(&mut tx, None, &overrides, &repo.root().join("shelf"))
            .unwrap();
        tx.commit("new", &[], None, None).unwrap();
    }

    let query = Query {
        scopes: vec![repo.root().join("shelf")],
        depth: 0,
        projections: vec!["priority".to_string()],
        filters: vec![Filter::parse("type=laptop").unwrap()],
        sort: SortDirection::Ascending,
        name_keys: repo.config.name_keys().unwrap(),
    };
    let rows = query.run(&repo.store()).unwrap();

    assert_eq!(rows.len(), 3);
    let values: Vec<&str> = rows.iter().map(|r| r.values[0].as_str()).collect();
    assert_eq!(values, vec!["10", "20", "30"]);
}
