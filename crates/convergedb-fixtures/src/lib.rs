//! Fixture loader for convergedb's golden end-to-end scenarios.
//!
//! A typed loader that walks up from `CARGO_MANIFEST_DIR` to find the
//! `fixtures` directory, so it works from any crate in the workspace.

use serde::de::DeserializeOwned;
use std::path::PathBuf;

fn fixtures_root() -> PathBuf {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
    let mut path = PathBuf::from(&manifest_dir);

    while !path.join("fixtures").exists() {
        if !path.pop() {
            panic!("could not find a fixtures directory from CARGO_MANIFEST_DIR={manifest_dir}");
        }
    }
    path.join("fixtures")
}

/// Load and deserialize a JSON fixture file, relative to the fixtures root.
///
/// # Panics
/// Panics if the file doesn't exist or can't be deserialized — fixtures are
/// part of the test suite's fixed inputs, not runtime data.
pub fn load_fixture<T: DeserializeOwned>(relative_path: &str) -> T {
    let path = fixtures_root().join(relative_path);
    let content = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
    serde_json::from_str(&content).unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
}

/// Load a fixture file as raw JSON.
pub fn load_fixture_value(relative_path: &str) -> serde_json::Value {
    load_fixture(relative_path)
}
