//! External command execution.
//!
//! Stylesheet compilers and template renderers are external programs. They
//! are driven through [`Cmd`], a small builder over [`std::process::Command`]
//! that pipes stdin, captures both output streams and turns a non-zero exit
//! into an error carrying the tool's stderr.
//!
//! ```ignore
//! use crate::utils::exec::Cmd;
//!
//! let css = Cmd::from_slice(&["sass", "--embed-source-map", "src/styles/main.scss"])
//!     .cwd(root)
//!     .run()?
//!     .stdout;
//!
//! let html = Cmd::new("pug").args(["--path", "src/index.pug"]).stdin(source).run()?;
//! ```

use anyhow::{Context, Result};
use regex::Regex;
use std::{
    ffi::{OsStr, OsString},
    io::Write,
    path::{Path, PathBuf},
    process::{Command, Output, Stdio},
    sync::LazyLock,
};

/// Placeholder replaced by the input file path in configured commands.
pub const INPUT_PLACEHOLDER: &str = "$INPUT";

/// Command builder for external process execution.
#[derive(Debug, Default)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    stdin_data: Option<Vec<u8>>,
}

impl Cmd {
    /// Create a new command builder.
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            ..Default::default()
        }
    }

    /// Create from a command array (e.g., `["lessc"]` or `["npx", "sass"]`).
    pub fn from_slice<S: AsRef<OsStr>>(cmd: &[S]) -> Self {
        let mut iter = cmd.iter();
        let program = iter
            .next()
            .map(|s| s.as_ref().to_owned())
            .unwrap_or_default();
        Self::new(program).args(iter)
    }

    /// Build from a configured command line, substituting [`INPUT_PLACEHOLDER`].
    ///
    /// The input path is appended when no part mentions the placeholder.
    pub fn from_template<S: AsRef<str>>(cmd: &[S], input: &Path) -> Self {
        let input_str = input.to_string_lossy();
        let mut substituted = false;
        let parts: Vec<OsString> = cmd
            .iter()
            .map(|part| {
                let part = part.as_ref();
                if part.contains(INPUT_PLACEHOLDER) {
                    substituted = true;
                    OsString::from(part.replace(INPUT_PLACEHOLDER, &input_str))
                } else {
                    OsString::from(part)
                }
            })
            .collect();

        let cmd = Self::from_slice(&parts);
        if substituted { cmd } else { cmd.arg(input) }
    }

    /// Add a single argument. Empty arguments are dropped.
    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        let arg = arg.as_ref();
        if !arg.is_empty() {
            self.args.push(arg.to_owned());
        }
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        args.into_iter().fold(self, Self::arg)
    }

    /// Set working directory.
    pub fn cwd<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.cwd = Some(dir.as_ref().to_owned());
        self
    }

    /// Set stdin data to pipe to the process.
    pub fn stdin<D: AsRef<[u8]>>(mut self, data: D) -> Self {
        self.stdin_data = Some(data.as_ref().to_vec());
        self
    }

    /// Program name for messages.
    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().to_string()
    }

    /// Fail early with a readable message when the program is not on `PATH`.
    pub fn check_installed(&self) -> Result<()> {
        if which::which(&self.program).is_err() {
            anyhow::bail!("`{}` not found, is it installed and on PATH?", self.program_name());
        }
        Ok(())
    }

    /// Execute the command and return its output.
    ///
    /// A non-zero exit status is an error whose message contains the tool's
    /// stderr with ANSI colors stripped.
    pub fn run(self) -> Result<Output> {
        let name = self.program_name();
        if self.program.is_empty() {
            anyhow::bail!("empty command");
        }

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(if self.stdin_data.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to spawn `{name}`"))?;

        if let (Some(data), Some(mut stdin)) = (self.stdin_data, child.stdin.take()) {
            stdin
                .write_all(&data)
                .with_context(|| format!("Failed to write stdin to `{name}`"))?;
        }

        let output = child
            .wait_with_output()
            .with_context(|| format!("Failed to wait for `{name}`"))?;

        if !output.status.success() {
            anyhow::bail!(format_error(&name, &output));
        }
        Ok(output)
    }
}

/// Strip ANSI escape codes from string.
pub fn strip_ansi(s: &str) -> std::borrow::Cow<'_, str> {
    static RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*m").expect("valid ansi regex"));
    RE.replace_all(s, "")
}

/// Format error message for failed command.
fn format_error(name: &str, output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = strip_ansi(stderr.trim());

    let mut msg = format!("Command `{name}` failed with {}", output.status);
    if !stderr.is_empty() {
        msg.push('\n');
        msg.push_str(&stderr);
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmd_builder() {
        let cmd = Cmd::new("echo")
            .arg("hello")
            .args(["world", "!"])
            .cwd("/tmp");

        assert_eq!(cmd.program, OsString::from("echo"));
        assert_eq!(cmd.args.len(), 3);
        assert_eq!(cmd.cwd, Some(PathBuf::from("/tmp")));
    }

    #[test]
    fn test_from_slice_splits_program() {
        let cmd = Cmd::from_slice(&["npx", "sass", "", "main.scss"]);
        assert_eq!(cmd.program, OsString::from("npx"));
        assert_eq!(cmd.args, vec![OsString::from("sass"), OsString::from("main.scss")]);
    }

    #[test]
    fn test_from_template_substitutes_input() {
        let cmd = Cmd::from_template(&["sass", "--no-color", "$INPUT"], Path::new("src/a.scss"));
        assert_eq!(cmd.program, OsString::from("sass"));
        assert_eq!(
            cmd.args,
            vec![OsString::from("--no-color"), OsString::from("src/a.scss")]
        );
    }

    #[test]
    fn test_from_template_appends_input() {
        let cmd = Cmd::from_template(&["lessc"], Path::new("src/a.less"));
        assert_eq!(cmd.args, vec![OsString::from("src/a.less")]);
    }

    #[test]
    fn test_check_installed() {
        assert!(Cmd::new("assetflow-definitely-missing-tool").check_installed().is_err());
    }

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\x1b[31mRed\x1b[0m"), "Red");
        assert_eq!(strip_ansi("Plain text"), "Plain text");
    }

    #[cfg(unix)]
    #[test]
    fn test_stdin_pipe() {
        let output = Cmd::new("cat").stdin(b"test data").run().unwrap();
        assert_eq!(output.stdout, b"test data");
    }

    #[cfg(unix)]
    #[test]
    fn test_failure_carries_stderr() {
        let err = Cmd::from_slice(&["sh", "-c", "echo boom >&2; exit 3"])
            .run()
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("`sh` failed"));
        assert!(msg.contains("boom"));
    }

    #[test]
    fn test_missing_program() {
        assert!(Cmd::new("assetflow-definitely-missing-tool").run().is_err());
        assert!(Cmd::from_slice::<&str>(&[]).run().is_err());
    }
}
