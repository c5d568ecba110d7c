//! CLI tests for the ks binary

use assert_cmd::Command;
use khirstore::{Record, Store};
use predicates::prelude::*;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

#[derive(Debug, Serialize, Deserialize)]
struct Row {
    id: String,
    phase: String,
    updated_at: i64,
}

impl Record for Row {
    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }

    fn collection_name() -> &'static str {
        "sessions"
    }
}

fn seeded_store() -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let store = Store::open(dir.path()).expect("Failed to open store");
    store
        .upsert(&Row {
            id: "a@x.com::ch1".to_string(),
            phase: "learning".to_string(),
            updated_at: 1_700_000_000_000,
        })
        .expect("Failed to seed store");
    dir
}

#[test]
fn test_collections_lists_sessions() {
    let dir = seeded_store();
    Command::cargo_bin("ks")
        .unwrap()
        .arg("--store")
        .arg(dir.path())
        .arg("collections")
        .assert()
        .success()
        .stdout(predicate::str::contains("sessions"));
}

#[test]
fn test_list_shows_ids() {
    let dir = seeded_store();
    Command::cargo_bin("ks")
        .unwrap()
        .arg("--store")
        .arg(dir.path())
        .args(["list", "sessions"])
        .assert()
        .success()
        .stdout(predicate::str::contains("a@x.com::ch1"));
}

#[test]
fn test_get_prints_json() {
    let dir = seeded_store();
    Command::cargo_bin("ks")
        .unwrap()
        .arg("--store")
        .arg(dir.path())
        .args(["get", "sessions", "a@x.com::ch1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"phase\": \"learning\""));
}

#[test]
fn test_get_missing_fails() {
    let dir = seeded_store();
    Command::cargo_bin("ks")
        .unwrap()
        .arg("--store")
        .arg(dir.path())
        .args(["get", "sessions", "nobody::ch9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}
