//! Integration tests for jarsign-cache

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    /// An empty but valid zip archive
    const EMPTY_JAR: &[u8] = b"PK\x05\x06\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0";

    /// Command running in `dir`, isolated from the caller's environment
    fn jarsign(dir: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("jarsign-cache");
        cmd.current_dir(dir);
        for var in [
            "JARSIGN_CONFIG",
            "JARSIGN_CACHE_ID",
            "JARSIGN_ALIAS",
            "JARSIGN_KEYSTORE",
            "JARSIGN_STOREPASS",
            "JARSIGN_KEYPASS",
            "CI",
        ] {
            cmd.env_remove(var);
        }
        cmd
    }

    #[test]
    fn help_displays() {
        let temp = TempDir::new().unwrap();
        jarsign(temp.path())
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Sign and verify every archive"));
    }

    #[test]
    fn version_displays() {
        let temp = TempDir::new().unwrap();
        jarsign(temp.path())
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("jarsign-cache"));
    }

    #[test]
    fn config_path() {
        let temp = TempDir::new().unwrap();
        jarsign(temp.path())
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("jarsign.toml"));
    }

    #[test]
    fn config_show_defaults() {
        let temp = TempDir::new().unwrap();
        jarsign(temp.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("types = \"jar\""));
    }

    #[test]
    fn config_show_redacts_passwords() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("jarsign.toml"),
            "id = \"release\"\n\n[identity]\nalias = \"release\"\nstorepass = \"hunter2\"\n",
        )
        .unwrap();

        jarsign(temp.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("alias = \"release\""))
            .stdout(predicate::str::contains("hunter2").not());
    }

    #[test]
    fn invalid_config_fails() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("jarsign.toml"), "force_sign = \"maybe\"\n").unwrap();

        jarsign(temp.path())
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn sign_requires_id() {
        let temp = TempDir::new().unwrap();
        jarsign(temp.path())
            .args(["sign", "-d", "build"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Missing required option: id"));
    }

    #[test]
    fn cache_path_is_next_to_repository() {
        let temp = TempDir::new().unwrap();
        let repository = temp.path().join("repo");

        jarsign(temp.path())
            .args(["cache", "path", "--id", "release", "--repository"])
            .arg(&repository)
            .assert()
            .success()
            .stdout(predicate::str::contains(
                temp.path()
                    .join("jarsign-cache")
                    .join("release")
                    .display()
                    .to_string(),
            ));
    }

    #[test]
    fn sign_empty_directory() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("build")).unwrap();

        jarsign(temp.path())
            .args(["sign", "--id", "ci", "-d", "build", "--format", "json", "--repository"])
            .arg(temp.path().join("repo"))
            .assert()
            .success()
            .stdout(predicate::str::contains("\"total\": 0"));

        assert!(temp.path().join("jarsign-cache").join("ci").is_dir());
    }

    #[test]
    fn cache_status_lists_new_archives() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("build/lib")).unwrap();
        fs::write(temp.path().join("build/lib/a.jar"), EMPTY_JAR).unwrap();

        jarsign(temp.path())
            .args(["cache", "status", "--id", "ci", "-d", "build", "--format", "json"])
            .arg("--repository")
            .arg(temp.path().join("repo"))
            .assert()
            .success()
            .stdout(predicate::str::contains("\"NEW\""))
            .stdout(predicate::str::contains("a.jar"));
    }

    #[test]
    fn sign_without_alias_fails_before_signing() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("build")).unwrap();
        fs::write(temp.path().join("build/a.jar"), EMPTY_JAR).unwrap();

        jarsign(temp.path())
            .args(["sign", "--id", "ci", "-d", "build", "--repository"])
            .arg(temp.path().join("repo"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("Missing required option: identity.alias"));
    }

    #[test]
    fn missing_jarsigner_is_reported() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("build")).unwrap();
        fs::write(temp.path().join("build/a.jar"), EMPTY_JAR).unwrap();
        fs::write(
            temp.path().join("jarsign.toml"),
            "[tools]\njarsigner = \"/nonexistent/bin/jarsigner\"\n",
        )
        .unwrap();

        jarsign(temp.path())
            .args(["sign", "--id", "ci", "-d", "build", "--alias", "release"])
            .arg("--repository")
            .arg(temp.path().join("repo"))
            .assert()
            .failure()
            .stdout(predicate::str::contains("Archives: 1"))
            .stdout(predicate::str::contains("Signed: 0"))
            .stderr(predicate::str::contains("Failed to launch jarsigner"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn failed_sign_still_prints_json_report() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("build")).unwrap();
        fs::write(temp.path().join("build/a.jar"), EMPTY_JAR).unwrap();
        fs::write(temp.path().join("build/b.jar"), EMPTY_JAR).unwrap();
        fs::write(
            temp.path().join("jarsign.toml"),
            "[tools]\njarsigner = \"/nonexistent/bin/jarsigner\"\n",
        )
        .unwrap();

        jarsign(temp.path())
            .args(["sign", "--id", "ci", "-d", "build", "--alias", "release"])
            .args(["--format", "json", "--repository"])
            .arg(temp.path().join("repo"))
            .assert()
            .failure()
            .stdout(predicate::str::contains("\"total\": 2"))
            .stdout(predicate::str::contains("\"verified\": 0"))
            .stderr(predicate::str::contains("Failed to launch jarsigner"));
    }
}
