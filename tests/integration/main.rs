//! Integration tests for vulcan-mutations

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use serde_json::{json, Value};
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    const CONFIG: &str = r#"
[[collections]]
type_name = "Foo"
collection_name = "Foos"
multi_resolver_name = "foos"
fragment = "_id hello"
"#;

    fn vulcan() -> Command {
        cargo_bin_cmd!("vulcan-mutations")
    }

    /// Command with an isolated config file and no local config discovery
    fn vulcan_with_config(dir: &Path) -> Command {
        let config = dir.join("config.toml");
        if !config.exists() {
            std::fs::write(&config, CONFIG).unwrap();
        }
        let mut cmd = vulcan();
        cmd.arg("--no-local").arg("--config").arg(config);
        cmd
    }

    fn write_json(dir: &Path, name: &str, value: &Value) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
        path
    }

    fn read_json(path: &Path) -> Value {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    fn foos_key(terms: Value) -> String {
        format!("foos({})", json!({"input": {"terms": terms}}))
    }

    #[test]
    fn help_displays() {
        vulcan()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("patch cached list queries"));
    }

    #[test]
    fn version_displays() {
        vulcan()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("vulcan-mutations"));
    }

    #[test]
    fn config_path() {
        let temp = TempDir::new().unwrap();
        vulcan_with_config(temp.path())
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let temp = TempDir::new().unwrap();
        vulcan_with_config(temp.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[transport]"))
            .stdout(predicate::str::contains("collection_name = \"Foos\""));
    }

    #[test]
    fn config_init_writes_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");
        vulcan()
            .arg("--no-local")
            .arg("--config")
            .arg(&path)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration initialized"));
        assert!(path.exists());
    }

    #[test]
    fn missing_explicit_config_fails_with_hint() {
        let temp = TempDir::new().unwrap();
        vulcan()
            .arg("--no-local")
            .arg("--config")
            .arg(temp.path().join("absent.toml"))
            .args(["collections"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Configuration file not found"))
            .stderr(predicate::str::contains("config init"));
    }

    #[test]
    fn collections_plain() {
        let temp = TempDir::new().unwrap();
        vulcan_with_config(temp.path())
            .args(["collections", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Foos"));
    }

    #[test]
    fn build_create_prints_document() {
        let temp = TempDir::new().unwrap();
        vulcan_with_config(temp.path())
            .args(["build", "create", "--collection", "Foos"])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "mutation createFoo($data: CreateFooDataInput!)",
            ))
            .stdout(predicate::str::contains("...FoosDefaultFragment"))
            .stdout(predicate::str::contains("fragment FoosDefaultFragment on Foo"));
    }

    #[test]
    fn build_delete_with_hash() {
        let temp = TempDir::new().unwrap();
        vulcan_with_config(temp.path())
            .args(["build", "delete", "--collection", "Foo", "--hash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("$selector: FooSelectorUniqueInput!"))
            .stdout(predicate::str::contains("# sha256:"));
    }

    #[test]
    fn unknown_collection_fails_with_hint() {
        let temp = TempDir::new().unwrap();
        vulcan_with_config(temp.path())
            .args(["build", "create", "--collection", "Bars"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown collection: Bars"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn apply_inserts_created_document() {
        let temp = TempDir::new().unwrap();
        let key = foos_key(json!({}));
        let cache = write_json(
            temp.path(),
            "cache.json",
            &json!({"ROOT_QUERY": {key.clone(): {"results": [], "totalCount": 0}}}),
        );
        let response = write_json(
            temp.path(),
            "response.json",
            &json!({"data": {"createFoo": {"data": {"_id": 1, "hello": "world", "__typename": "Foo"}}}}),
        );

        vulcan_with_config(temp.path())
            .args(["apply", "--collection", "Foos", "--operation", "create", "--format", "json"])
            .arg("--response")
            .arg(&response)
            .arg("--cache")
            .arg(&cache)
            .assert()
            .success()
            .stdout(predicate::str::contains("\"inserted\": 1"));

        let snapshot = read_json(&cache);
        assert_eq!(snapshot["ROOT_QUERY"][&key]["totalCount"], json!(1));
        assert_eq!(snapshot["ROOT_QUERY"][&key]["results"][0]["_id"], json!(1));
    }

    #[test]
    fn apply_skips_non_matching_query() {
        let temp = TempDir::new().unwrap();
        let key = foos_key(json!({"selector": {"val": {"$gt": 42}}}));
        let cache = write_json(
            temp.path(),
            "cache.json",
            &json!({"ROOT_QUERY": {key.clone(): {"results": [], "totalCount": 0}}}),
        );
        let response = write_json(
            temp.path(),
            "response.json",
            &json!({"data": {"createFoo": {"data": {"_id": 1, "val": 41}}}}),
        );
        let output = temp.path().join("patched.json");

        vulcan_with_config(temp.path())
            .args(["apply", "--collection", "Foos", "--operation", "createFoo", "--format", "json"])
            .arg("--response")
            .arg(&response)
            .arg("--cache")
            .arg(&cache)
            .arg("--output")
            .arg(&output)
            .assert()
            .success()
            .stdout(predicate::str::contains("\"unchanged\": 1"))
            .stdout(predicate::str::contains("\"written\": 0"));

        assert_eq!(read_json(&output)["ROOT_QUERY"][&key]["totalCount"], json!(0));
    }

    #[test]
    fn apply_reports_graphql_errors() {
        let temp = TempDir::new().unwrap();
        let cache = write_json(temp.path(), "cache.json", &json!({"ROOT_QUERY": {}}));
        let response = write_json(
            temp.path(),
            "response.json",
            &json!({"data": {"deleteFoo": null}, "errors": [{"message": "app.document_not_found"}]}),
        );

        vulcan_with_config(temp.path())
            .args(["apply", "--collection", "Foos", "--operation", "delete"])
            .arg("--response")
            .arg(&response)
            .arg("--cache")
            .arg(&cache)
            .assert()
            .failure()
            .stderr(predicate::str::contains("app.document_not_found"));
    }

    #[test]
    fn apply_without_snapshot_fails() {
        let temp = TempDir::new().unwrap();
        let response = write_json(temp.path(), "response.json", &json!({"data": {}}));

        vulcan_with_config(temp.path())
            .args(["apply", "--collection", "Foos", "--operation", "create"])
            .arg("--response")
            .arg(&response)
            .assert()
            .failure()
            .stderr(predicate::str::contains("No cache snapshot"));
    }
}
