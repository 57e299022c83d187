//! Integration tests for memoize

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use memoize::cache::fingerprint;
    use predicates::prelude::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// Isolated home and working directory per test
    struct Sandbox {
        home: TempDir,
        work: TempDir,
    }

    impl Sandbox {
        fn new() -> Self {
            Self {
                home: TempDir::new().unwrap(),
                work: TempDir::new().unwrap(),
            }
        }

        fn memoize(&self) -> Command {
            self.memoize_in(self.work.path())
        }

        fn memoize_in(&self, dir: &Path) -> Command {
            let mut cmd = cargo_bin_cmd!("memoize");
            cmd.env("HOME", self.home.path())
                .env_remove("MEMOIZE_CONFIG")
                .current_dir(dir);
            cmd
        }

        fn history(&self) -> PathBuf {
            self.home.path().join(".memoize").join("history")
        }

        fn entry_for(&self, command: &str, dir: &Path) -> PathBuf {
            let cwd = dir.canonicalize().unwrap();
            self.history().join(fingerprint(command, &cwd).entry_file_name())
        }

        fn entries(&self) -> usize {
            fs::read_dir(self.history())
                .map(|dir| {
                    dir.filter_map(Result::ok)
                        .filter(|e| e.file_name().to_string_lossy().ends_with(".txt"))
                        .count()
                })
                .unwrap_or(0)
        }

        fn runs(&self) -> usize {
            fs::read_to_string(self.work.path().join("runs"))
                .map(|s| s.lines().count())
                .unwrap_or(0)
        }
    }

    #[test]
    fn help_displays() {
        Sandbox::new()
            .memoize()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("replay its output from cache"));
    }

    #[test]
    fn version_displays() {
        Sandbox::new()
            .memoize()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("memoize"));
    }

    #[test]
    fn no_command_prints_usage() {
        Sandbox::new()
            .memoize()
            .assert()
            .code(1)
            .stdout(predicate::str::is_empty())
            .stderr(predicate::str::contains("Usage:"));
    }

    #[test]
    fn reset_without_command_prints_usage() {
        Sandbox::new()
            .memoize()
            .arg("--reset")
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Usage:"));
    }

    #[test]
    fn echo_is_cached_and_replayed() {
        let sandbox = Sandbox::new();

        sandbox
            .memoize()
            .args(["echo", "hello"])
            .assert()
            .success()
            .stdout("hello\n");

        let entry = sandbox.entry_for("echo hello ", sandbox.work.path());
        assert_eq!(fs::read(&entry).unwrap(), b"hello\n");

        sandbox
            .memoize()
            .args(["echo", "hello"])
            .assert()
            .success()
            .stdout("hello\n");
    }

    #[test]
    fn hit_does_not_rerun_command() {
        let sandbox = Sandbox::new();
        let args = ["echo x >> runs;", "echo", "counted"];

        sandbox.memoize().args(args).assert().success().stdout("counted\n");
        sandbox.memoize().args(args).assert().success().stdout("counted\n");

        assert_eq!(sandbox.runs(), 1);
    }

    #[test]
    fn reset_reruns_command() {
        let sandbox = Sandbox::new();
        let args = ["echo x >> runs;", "wc -l < runs"];

        sandbox.memoize().args(args).assert().success();
        sandbox
            .memoize()
            .arg("--reset")
            .args(args)
            .assert()
            .success()
            .stdout(predicate::str::contains("2"));

        assert_eq!(sandbox.runs(), 2);
        sandbox
            .memoize()
            .args(args)
            .assert()
            .success()
            .stdout(predicate::str::contains("2"));
        assert_eq!(sandbox.runs(), 2);
    }

    #[test]
    fn removed_entry_reruns_command() {
        let sandbox = Sandbox::new();
        let args = ["echo x >> runs;", "echo", "again"];

        sandbox.memoize().args(args).assert().success();
        let entry = sandbox.entry_for("echo x >> runs; echo again ", sandbox.work.path());
        fs::remove_file(entry).unwrap();
        sandbox.memoize().args(args).assert().success().stdout("again\n");

        assert_eq!(sandbox.runs(), 2);
    }

    #[test]
    fn directories_have_separate_entries() {
        let sandbox = Sandbox::new();
        let other = TempDir::new().unwrap();

        sandbox.memoize().arg("pwd").assert().success();
        sandbox.memoize_in(other.path()).arg("pwd").assert().success();

        assert_eq!(sandbox.entries(), 2);
        assert!(sandbox.entry_for("pwd ", sandbox.work.path()).exists());
        assert!(sandbox.entry_for("pwd ", other.path()).exists());
    }

    #[test]
    fn leftover_wip_is_ignored() {
        let sandbox = Sandbox::new();
        let entry = sandbox.entry_for("echo recovered ", sandbox.work.path());
        fs::create_dir_all(sandbox.history()).unwrap();
        let wip = PathBuf::from(format!("{}.wip", entry.display()));
        fs::write(&wip, b"interrupted").unwrap();

        sandbox
            .memoize()
            .args(["echo", "recovered"])
            .assert()
            .success()
            .stdout("recovered\n");

        assert_eq!(fs::read(&entry).unwrap(), b"recovered\n");
        assert!(!wip.exists());
    }

    #[test]
    fn stdout_matches_entry() {
        let sandbox = Sandbox::new();

        let output = sandbox
            .memoize()
            .args(["seq", "1", "30000"])
            .output()
            .unwrap();

        let entry = sandbox.entry_for("seq 1 30000 ", sandbox.work.path());
        assert_eq!(output.stdout, fs::read(entry).unwrap());
    }

    #[test]
    fn failing_command_output_is_cached() {
        let sandbox = Sandbox::new();
        let args = ["echo x >> runs;", "echo", "broken;", "exit 7"];

        sandbox.memoize().args(args).assert().success().stdout("broken\n");
        sandbox.memoize().args(args).assert().success().stdout("broken\n");

        assert_eq!(sandbox.runs(), 1);
    }

    #[test]
    fn failing_command_skipped_when_configured() {
        let sandbox = Sandbox::new();
        let config = sandbox.home.path().join("memoize.toml");
        fs::write(&config, "[cache]\ncache_failures = false\n").unwrap();
        let args = ["echo x >> runs;", "exit 7"];

        sandbox.memoize().env("MEMOIZE_CONFIG", &config).args(args).assert().success();
        sandbox.memoize().env("MEMOIZE_CONFIG", &config).args(args).assert().success();

        assert_eq!(sandbox.runs(), 2);
        assert_eq!(sandbox.entries(), 0);
    }

    #[test]
    fn stderr_is_not_cached() {
        let sandbox = Sandbox::new();
        let args = ["echo out;", "echo err >&2"];

        sandbox
            .memoize()
            .args(args)
            .assert()
            .success()
            .stdout("out\n")
            .stderr(predicate::str::contains("err"));

        sandbox
            .memoize()
            .args(args)
            .assert()
            .success()
            .stdout("out\n")
            .stderr(predicate::str::contains("err").not());
    }

    #[test]
    fn miss_is_logged() {
        let sandbox = Sandbox::new();

        sandbox.memoize().args(["echo", "logged"]).assert().success();
        sandbox.memoize().args(["echo", "logged"]).assert().success();

        let log = fs::read_to_string(sandbox.home.path().join(".memoize/log.txt")).unwrap();
        assert_eq!(log.lines().count(), 1);
        assert!(log.contains("echo logged "));
    }

    #[test]
    fn invalid_config_fails() {
        let sandbox = Sandbox::new();
        fs::create_dir_all(sandbox.home.path().join(".memoize")).unwrap();
        fs::write(sandbox.home.path().join(".memoize/config.toml"), "[cache").unwrap();

        sandbox
            .memoize()
            .args(["echo", "hi"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn list_and_clear_entries() {
        let sandbox = Sandbox::new();
        sandbox.memoize().args(["echo", "one"]).assert().success();
        sandbox.memoize().args(["echo", "two"]).assert().success();

        let key = fingerprint("echo one ", &sandbox.work.path().canonicalize().unwrap());
        sandbox
            .memoize()
            .arg("--list-entries")
            .assert()
            .success()
            .stdout(predicate::str::contains(key.as_str()));

        sandbox
            .memoize()
            .arg("--clear")
            .assert()
            .success()
            .stdout(predicate::str::contains("Removed 4 cached files"));
        assert_eq!(sandbox.entries(), 0);
        assert_eq!(fs::read_dir(sandbox.history()).unwrap().count(), 0);

        sandbox
            .memoize()
            .arg("--list-entries")
            .assert()
            .success()
            .stdout(predicate::str::contains("No cached entries"));
    }
}
