use std::fs;

use tasknest::config::{Config, CONFIG_FILE};
use tasknest::credential::hasher_from_config;
use tasknest::error::Error;
use tasknest::task::{SortKey, SortOrder};

#[test]
fn partial_file_keeps_other_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(
        dir.path().join(CONFIG_FILE),
        "[tasks]\ndefault_sort_order = \"desc\"\n",
    )
    .expect("write config");

    let cfg = Config::load_from_dir(dir.path());
    let spec = cfg.tasks.sort_spec().expect("sort spec");
    assert_eq!(spec.key, Some(SortKey::DueDate));
    assert_eq!(spec.order, SortOrder::Descending);
    assert_eq!(cfg.credentials.scheme, "argon2");
}

#[test]
fn invalid_order_is_a_config_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join(CONFIG_FILE);
    fs::write(&path, "[tasks]\ndefault_sort_order = \"sideways\"\n").expect("write config");

    let err = Config::load(&path).expect_err("invalid order");
    assert!(matches!(err, Error::InvalidConfig(_)));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn zero_cost_argon2_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join(CONFIG_FILE);
    fs::write(&path, "[credentials]\niterations = 0\n").expect("write config");

    assert!(matches!(Config::load(&path), Err(Error::InvalidConfig(_))));
}

#[test]
fn oversized_parallelism_is_a_config_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join(CONFIG_FILE);
    fs::write(&path, "[credentials]\nparallelism = 600000000\n").expect("write config");

    assert!(matches!(Config::load(&path), Err(Error::InvalidConfig(_))));
    let cfg = Config::load_from_dir(dir.path());
    assert_eq!(cfg.credentials.parallelism, 1);
}

#[test]
fn saved_config_loads_back() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join(CONFIG_FILE);

    let mut cfg = Config::default();
    cfg.tasks.default_sort_key = "title".to_string();
    cfg.credentials.scheme = "plaintext".to_string();
    cfg.save(&path).expect("save");

    let loaded = Config::load(&path).expect("load");
    assert_eq!(loaded.tasks.sort_spec().expect("spec").key, Some(SortKey::Title));
    assert_eq!(
        hasher_from_config(&loaded.credentials).expect("hasher").scheme(),
        "plaintext"
    );
}
