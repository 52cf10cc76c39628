#![allow(dead_code)]

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Throwaway `<tmp>/repo/examples` tree that is removed on drop.
pub struct ExampleTree {
    _temp: TempDir,
    pub repo: PathBuf,
    pub root: PathBuf,
}

impl ExampleTree {
    pub fn new() -> Result<Self> {
        let temp = TempDir::new().context("creating temp dir")?;
        let repo = temp.path().join("repo");
        let root = repo.join("examples");
        fs::create_dir_all(&root).with_context(|| format!("creating {}", root.display()))?;
        Ok(Self {
            _temp: temp,
            repo,
            root,
        })
    }

    /// Write `contents` at `relative` below the examples root.
    pub fn write(&self, relative: &str, contents: &str) -> Result<PathBuf> {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }

    /// An example whose command is `sh -c <script>`.
    pub fn shell_example(&self, relative: &str, script: &str, extra: &str) -> Result<PathBuf> {
        let script = script.replace('\\', "\\\\").replace('"', "\\\"");
        let header = format!("# ---\n# cmd: [\"sh\", \"-c\", \"{script}\"]\n{extra}# ---\n");
        self.write(relative, &format!("{header}print('unused')\n"))
    }

    /// Write `contents` at `relative` below the repository root.
    pub fn write_repo(&self, relative: &str, contents: &str) -> Result<PathBuf> {
        let path = self.repo.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }

    /// Run `git` in the repository root, failing on a non-zero exit.
    pub fn git(&self, args: &[&str]) -> Result<()> {
        let mut cmd = Command::new("git");
        cmd.current_dir(&self.repo)
            .args(["-c", "user.name=Example Docs", "-c", "user.email=docs@example.invalid"])
            .args(["-c", "commit.gpgsign=false"])
            .args(args);
        let output = run_command(cmd)?;
        if !output.status.success() {
            bail!("git {} failed: {}", args.join(" "), stderr(&output));
        }
        Ok(())
    }

    pub fn scratch(&self, name: &str) -> PathBuf {
        self.repo.join(name)
    }

    /// Run the `example-docs` binary against this tree.
    pub fn run(&self, args: &[&str]) -> Result<Output> {
        let mut cmd = self.command();
        cmd.args(args);
        run_command(cmd)
    }

    /// `example-docs --root <root>`, ready for more arguments.
    pub fn command(&self) -> Command {
        let mut cmd = examples_command();
        cmd.arg("--root").arg(&self.root);
        cmd
    }
}

pub fn example_docs_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_example-docs"))
}

pub fn examples_command() -> Command {
    let mut cmd = Command::new(example_docs_binary());
    cmd.env_remove("EXAMPLES_ROOT")
        .env_remove("EXAMPLES_RUN_TIMEOUT_SECS")
        .env_remove("EXAMPLES_DOCS_EXCLUDE")
        .env_remove("EXAMPLES_EXTRA_ROOTS")
        .env_remove("GITHUB_EVENT_PATH")
        .env("RUST_LOG", "off");
    cmd
}

pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .is_ok_and(|output| output.status.success())
}

pub fn run_command(mut cmd: Command) -> Result<Output> {
    let output = cmd
        .output()
        .with_context(|| format!("failed to execute {:?}", cmd.get_program()))?;
    Ok(output)
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

pub fn assert_exit(output: &Output, expected: i32) -> Result<()> {
    match output.status.code() {
        Some(code) if code == expected => Ok(()),
        other => bail!(
            "expected exit {expected}, got {other:?}\nstdout:\n{}\nstderr:\n{}",
            stdout(output),
            stderr(output)
        ),
    }
}

pub fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}
