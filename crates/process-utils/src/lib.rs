//! Helpers for spawning the external media tools (ffmpeg, ffprobe).

use std::ffi::OsStr;
use std::io;
use std::process::Stdio;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Apply the Windows `CREATE_NO_WINDOW` flag to child processes.
///
/// On non-Windows targets this is a no-op.
pub trait NoWindowExt {
    fn no_window(&mut self) -> &mut Self;
}

impl NoWindowExt for tokio::process::Command {
    fn no_window(&mut self) -> &mut Self {
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            self.as_std_mut().creation_flags(CREATE_NO_WINDOW);
        }
        self
    }
}

/// Create a `tokio::process::Command` for a media tool.
///
/// The child gets `LC_ALL=C` so numeric output (durations) is never localized,
/// no stdin, and is killed if the handle is dropped before it exits.
pub fn tool_command(program: impl AsRef<OsStr>) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new(program);
    cmd.no_window()
        .env("LC_ALL", "C")
        .stdin(Stdio::null())
        .kill_on_drop(true);
    cmd
}

/// Run `<program> -version` and return the first line it prints.
///
/// Used at startup to fail fast when ffmpeg is missing from `PATH`.
pub async fn tool_version(program: impl AsRef<OsStr>) -> io::Result<String> {
    let output = tool_command(program.as_ref())
        .arg("-version")
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .await?;

    if !output.status.success() {
        return Err(io::Error::other(format!(
            "{} -version exited with {}",
            program.as_ref().to_string_lossy(),
            output.status
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout.lines().next().unwrap_or_default().trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tool_version_missing_binary() {
        let result = tool_version("definitely-not-a-real-media-tool").await;
        assert!(result.is_err());
    }

    #[test]
    fn test_tool_command_program() {
        let cmd = tool_command("ffmpeg");
        assert_eq!(cmd.as_std().get_program(), "ffmpeg");
    }
}
