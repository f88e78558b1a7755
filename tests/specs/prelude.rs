//! Test helpers for behavioral specifications.
//!
//! Provides a small DSL for running wsc against an isolated state and
//! config directory.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// API server address nothing listens on
pub const UNREACHABLE_SERVER: &str = "http://127.0.0.1:9";

/// Returns the path to a binary, checking the llvm-cov target directory
/// first and falling back to cargo's own lookup.
fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    let llvm_cov_path = manifest_dir.join("target/llvm-cov-target/debug").join(name);
    if llvm_cov_path.exists() {
        return llvm_cov_path;
    }

    let standard = manifest_dir.join("target/debug").join(name);
    if standard.exists() {
        return standard;
    }

    assert_cmd::cargo::cargo_bin(name)
}

fn wsc_binary() -> PathBuf {
    binary_path("wsc")
}

/// Create a CLI builder for wsc commands
pub fn cli() -> CliBuilder {
    CliBuilder::new()
}

/// High-level CLI builder for fluent test assertions
pub struct CliBuilder {
    args: Vec<String>,
    envs: Vec<(String, String)>,
}

impl CliBuilder {
    fn new() -> Self {
        Self {
            args: Vec::new(),
            envs: vec![("NO_COLOR".into(), "1".into())],
        }
    }

    /// Add CLI arguments
    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    /// Set environment variable
    pub fn env(mut self, key: &str, value: impl AsRef<Path>) -> Self {
        self.envs.push((
            key.to_string(),
            value.as_ref().to_string_lossy().to_string(),
        ));
        self
    }

    /// Build the command without running it
    pub fn command(self) -> Command {
        let mut cmd = Command::new(wsc_binary());
        cmd.args(&self.args);

        // Keep the caller's cluster settings out of the specs
        for var in ["WSC_SERVER", "WSC_TOKEN", "WSC_CONFIG", "WSC_STATE_DIR", "RUST_LOG"] {
            cmd.env_remove(var);
        }
        for (key, value) in self.envs {
            cmd.env(key, value);
        }
        cmd
    }

    /// Run and expect success (exit code 0)
    pub fn passes(self) -> RunAssert {
        let output = self.command().output().expect("command should run");
        assert!(
            output.status.success(),
            "expected command to pass, got exit code {:?}\nstdout: {}\nstderr: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }

    /// Run and expect failure (non-zero exit code)
    pub fn fails(self) -> RunAssert {
        let output = self.command().output().expect("command should run");
        assert!(
            !output.status.success(),
            "expected command to fail, but it passed\nstdout: {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }
}

/// Result of a CLI run for chaining assertions
pub struct RunAssert {
    output: Output,
}

impl RunAssert {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    pub fn code(self, expected: i32) -> Self {
        assert_eq!(self.output.status.code(), Some(expected), "stderr: {}", self.stderr());
        self
    }

    /// Assert stdout equals expected exactly (with diff on failure).
    pub fn stdout_eq(self, expected: &str) -> Self {
        similar_asserts::assert_eq!(self.stdout(), expected);
        self
    }

    /// Assert stdout contains substring.
    pub fn stdout_has(self, expected: &str) -> Self {
        let stdout = self.stdout();
        assert!(
            stdout.contains(expected),
            "stdout does not contain '{}'\nstdout: {}",
            expected,
            stdout
        );
        self
    }

    /// Assert stderr contains substring.
    pub fn stderr_has(self, expected: &str) -> Self {
        let stderr = self.stderr();
        assert!(
            stderr.contains(expected),
            "stderr does not contain '{}'\nstderr: {}",
            expected,
            stderr
        );
        self
    }

    /// Assert the failure was reported on exactly one `Error:` line.
    pub fn one_error_line(self) -> Self {
        let stderr = self.stderr();
        let count = stderr.lines().filter(|l| l.starts_with("Error: ")).count();
        assert_eq!(count, 1, "expected one Error: line\nstderr: {}", stderr);
        self
    }
}

// =============================================================================
// Sandbox
// =============================================================================

/// Isolated config and state directories for one test.
pub struct Sandbox {
    config_dir: tempfile::TempDir,
    state_dir: tempfile::TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        Self {
            config_dir: tempfile::tempdir().unwrap(),
            state_dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.path().join("config.toml")
    }

    pub fn state_path(&self) -> &Path {
        self.state_dir.path()
    }

    /// Write the config file
    pub fn config(&self, content: &str) {
        std::fs::write(self.config_path(), content).unwrap();
    }

    /// Contents of the CLI log file
    pub fn log(&self) -> String {
        std::fs::read_to_string(self.state_path().join("wsc.log")).unwrap_or_default()
    }

    /// Run wsc with this sandbox's config and state
    pub fn wsc(&self) -> CliBuilder {
        cli()
            .env("WSC_CONFIG", self.config_path())
            .env("WSC_STATE_DIR", self.state_path())
    }
}
