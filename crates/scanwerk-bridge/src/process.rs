// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Child-process helper shared by the script-driven gateways.

use std::ffi::OsStr;
use std::path::Path;
use std::process::Command;

use scanwerk_core::error::{Result, ScanwerkError};
use tracing::debug;

/// Captured result of a finished child process.
#[derive(Debug)]
pub(crate) struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Run `program` to completion and capture its output.
///
/// A missing executable maps to `PlatformUnavailable`.
pub(crate) fn run<I, S>(program: &Path, args: I) -> Result<CommandOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = Command::new(program).args(args).output().map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            ScanwerkError::PlatformUnavailable
        } else {
            ScanwerkError::Io(err)
        }
    })?;

    let result = CommandOutput {
        success: output.status.success(),
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };
    debug!(
        program = %program.display(),
        code = ?result.code,
        stdout_len = result.stdout.len(),
        stderr_len = result.stderr.len(),
        "child process finished"
    );
    Ok(result)
}

/// First meaningful line of an error stream, or "Unknown error".
pub(crate) fn first_line_or_unknown(stderr: &str) -> String {
    stderr
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| "Unknown error".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stderr_is_unknown_error() {
        assert_eq!(first_line_or_unknown(""), "Unknown error");
        assert_eq!(first_line_or_unknown("  \n\n"), "Unknown error");
    }

    #[test]
    fn first_non_blank_line_wins() {
        assert_eq!(first_line_or_unknown("\n  jammed  \nmore"), "jammed");
    }

    #[test]
    fn missing_program_is_platform_unavailable() {
        let err = run(Path::new("/definitely/not/a/scanner-tool"), ["-L"]).unwrap_err();
        assert!(matches!(err, ScanwerkError::PlatformUnavailable));
    }
}
