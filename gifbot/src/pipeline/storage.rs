//! Per-task scratch space and source download.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::scheduler::{ChatId, MessageId};
use crate::{Error, Result};

/// Temporary directory holding one task's input video and output GIF.
///
/// The directory and everything in it is removed when the workspace is dropped.
#[derive(Debug)]
pub struct TaskWorkspace {
    dir: TempDir,
}

impl TaskWorkspace {
    /// Create `gifbot_<chat>_<message>_*` under the system temp directory.
    pub fn create(chat_id: ChatId, message_id: MessageId) -> Result<Self> {
        Self::create_in(std::env::temp_dir(), chat_id, message_id)
    }

    pub fn create_in(root: impl AsRef<Path>, chat_id: ChatId, message_id: MessageId) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(&format!("gifbot_{}_{}_", chat_id, message_id))
            .tempdir_in(root)?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn video_path(&self) -> PathBuf {
        self.dir.path().join("video.mp4")
    }

    pub fn gif_path(&self) -> PathBuf {
        self.dir.path().join("output.gif")
    }
}

/// Stream `url` into `dest`, returning the number of bytes written.
pub async fn download_to_file(client: &reqwest::Client, url: &str, dest: &Path) -> Result<u64> {
    // Download URLs embed the bot token; keep it out of error messages.
    let response = client
        .get(url)
        .send()
        .await
        .map_err(reqwest::Error::without_url)?;
    let status = response.status();
    if !status.is_success() {
        return Err(Error::Other(format!("bad status: {}", status)));
    }

    let mut file = tokio::fs::File::create(dest).await?;
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(reqwest::Error::without_url)?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    debug!(path = %dest.display(), bytes = written, "Download complete");
    Ok(written)
}
