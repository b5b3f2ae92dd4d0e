//! ffmpeg/ffprobe invocation for GIF conversion.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use process_utils::tool_command;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::ConversionError;

/// Number of trailing stderr lines kept for error reports.
const STDERR_TAIL_LINES: usize = 5;

/// GIF output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GifSettings {
    /// Output frame rate.
    pub fps: u32,
    /// Output width in pixels; `0` keeps the source width.
    pub width: u32,
    /// Palette size, between 2 and 256.
    pub colors: u32,
}

impl Default for GifSettings {
    fn default() -> Self {
        Self {
            fps: 10,
            width: 480,
            colors: 256,
        }
    }
}

/// Scale filter for the configured width, height following the aspect ratio.
pub fn scale_filter(width: u32) -> String {
    if width > 0 {
        format!("scale={}:-1:flags=lanczos", width)
    } else {
        "scale=-1:-1:flags=lanczos".to_string()
    }
}

/// Filter graph for the palette generation pass.
pub fn palette_filter(settings: &GifSettings) -> String {
    format!(
        "fps={},{},palettegen=max_colors={}",
        settings.fps,
        scale_filter(settings.width),
        settings.colors
    )
}

/// Filter graph for the palette application pass.
pub fn paletteuse_filter(settings: &GifSettings) -> String {
    format!(
        "fps={},{}[x];[x][1:v]paletteuse",
        settings.fps,
        scale_filter(settings.width)
    )
}

/// Parse the bare number printed by
/// `ffprobe -show_entries format=duration -of default=noprint_wrappers=1:nokey=1`.
fn parse_duration(output: &str) -> Option<f64> {
    output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .and_then(|line| line.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
}

/// Wrapper around the ffmpeg and ffprobe binaries.
#[derive(Debug, Clone)]
pub struct FfmpegConverter {
    ffmpeg_path: String,
    ffprobe_path: String,
    settings: GifSettings,
}

impl FfmpegConverter {
    pub fn new(
        ffmpeg_path: impl Into<String>,
        ffprobe_path: impl Into<String>,
        settings: GifSettings,
    ) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            ffprobe_path: ffprobe_path.into(),
            settings,
        }
    }

    /// Verify ffmpeg can be executed, returning its version banner.
    pub async fn check_available(&self) -> crate::Result<String> {
        let version = process_utils::tool_version(&self.ffmpeg_path)
            .await
            .map_err(|e| {
                crate::Error::config(format!(
                    "ffmpeg not found at '{}': {}",
                    self.ffmpeg_path, e
                ))
            })?;
        info!(version = %version, "ffmpeg available");
        Ok(version)
    }

    /// Duration of a media file in seconds.
    pub async fn probe_duration(&self, input: &Path) -> Result<f64, ConversionError> {
        let output = tool_command(&self.ffprobe_path)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(input)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ConversionError::Duration(format!("failed to spawn ffprobe: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ConversionError::Duration(format!(
                "ffprobe exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_duration(&stdout).ok_or_else(|| {
            ConversionError::Duration(format!("unparseable duration '{}'", stdout.trim()))
        })
    }

    /// Convert `input` into a GIF at `output` using a generated palette.
    ///
    /// The intermediate palette sits next to the output and is removed
    /// whether or not the second pass succeeds.
    pub async fn convert_to_gif(&self, input: &Path, output: &Path) -> Result<(), ConversionError> {
        let palette = palette_path(output);

        let mut palette_cmd = tool_command(&self.ffmpeg_path);
        palette_cmd
            .arg("-hide_banner")
            .arg("-i")
            .arg(input)
            .arg("-vf")
            .arg(palette_filter(&self.settings))
            .arg("-y")
            .arg(&palette);
        run_ffmpeg(&mut palette_cmd)
            .await
            .map_err(|e| ConversionError::Convert(format!("palette generation: {}", e)))?;

        let mut gif_cmd = tool_command(&self.ffmpeg_path);
        gif_cmd
            .arg("-hide_banner")
            .arg("-i")
            .arg(input)
            .arg("-i")
            .arg(&palette)
            .arg("-lavfi")
            .arg(paletteuse_filter(&self.settings))
            .arg("-y")
            .arg(output);
        let result = run_ffmpeg(&mut gif_cmd).await;

        if let Err(e) = tokio::fs::remove_file(&palette).await {
            debug!(path = %palette.display(), error = %e, "Failed to remove palette");
        }

        result.map_err(ConversionError::Convert)
    }
}

fn palette_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".palette.png");
    PathBuf::from(name)
}

/// Run an ffmpeg command to completion, streaming its stderr to the log.
///
/// On failure the error carries the exit status and the last few stderr lines.
async fn run_ffmpeg(command: &mut Command) -> Result<(), String> {
    command.stdout(Stdio::null()).stderr(Stdio::piped());

    let mut child = command
        .spawn()
        .map_err(|e| format!("failed to spawn ffmpeg: {}", e))?;

    let tail = match child.stderr.take() {
        Some(stderr) => drain_stderr(BufReader::new(stderr)).await,
        None => VecDeque::new(),
    };

    let status = child
        .wait()
        .await
        .map_err(|e| format!("failed to wait for ffmpeg: {}", e))?;

    if status.success() {
        Ok(())
    } else {
        let tail: Vec<String> = tail.into_iter().collect();
        Err(format!("ffmpeg exited with {}: {}", status, tail.join(" | ")))
    }
}

/// Log every stderr line and return the last few.
///
/// Lines are decoded lossily so non-UTF-8 output (metadata titles, file names)
/// does not stop the pipe from being drained.
async fn drain_stderr<R: AsyncBufRead + Unpin>(mut reader: R) -> VecDeque<String> {
    let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(error = %e, "Failed to read ffmpeg stderr");
                break;
            }
        }

        let line = String::from_utf8_lossy(&buf)
            .trim_end_matches(['\r', '\n'])
            .to_string();
        if line.to_lowercase().contains("error") {
            warn!("ffmpeg: {}", line);
        } else {
            debug!("ffmpeg: {}", line);
        }
        if tail.len() == STDERR_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line);
    }

    tail
}
