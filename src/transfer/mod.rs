//! Moving the bytes of a single media item: a buffered local copy or a streamed HTTP download.
//!
//! Both paths refuse to overwrite an existing destination and stamp the destination with the
//! item's capture time.

mod pool;

pub use pool::{ResultCollector, WorkerPool};

use crate::error::TransferError;
use std::fs::FileTimes;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::trace;

/// Receives transfer progress. Implementations must be cheap; they are called per buffer.
pub trait ProgressSink: Send + Sync {
    /// A transfer of `total_bytes` (0 when unknown) is starting.
    fn on_start(&self, name: &str, total_bytes: u64);
    /// `n` more bytes have been written.
    fn on_bytes(&self, name: &str, n: u64);
}

/// Default sink: emits `trace` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn on_start(&self, name: &str, total_bytes: u64) {
        trace!(file = name, total_bytes, "Transfer started");
    }

    fn on_bytes(&self, name: &str, n: u64) {
        trace!(file = name, bytes = n, "Transfer progress");
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

async fn create_new(dest: &Path) -> Result<File, TransferError> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dest)
        .await
        .map_err(|err| match err.kind() {
            std::io::ErrorKind::AlreadyExists => TransferError::AlreadyExists(dest.to_path_buf()),
            _ => TransferError::Io(err),
        })
}

async fn set_modified(file: File, modified: SystemTime) -> Result<(), TransferError> {
    let file = file.into_std().await;
    tokio::task::spawn_blocking(move || file.set_times(FileTimes::new().set_modified(modified)))
        .await
        .map_err(|err| TransferError::Io(std::io::Error::other(err)))??;
    Ok(())
}

/// Copies `source` into a new file at `dest` through a buffer of `buffer_size` bytes, then sets
/// the destination's modification time. Returns the number of bytes copied.
///
/// A partially written destination is removed again on failure.
pub async fn copy_file(
    source: &Path,
    dest: &Path,
    buffer_size: usize,
    modified: SystemTime,
    progress: &dyn ProgressSink,
) -> Result<u64, TransferError> {
    let metadata = tokio::fs::metadata(source).await?;
    if !metadata.is_file() {
        return Err(TransferError::NotARegularFile(source.to_path_buf()));
    }

    let mut output = create_new(dest).await?;
    let result = async {
        let name = display_name(source);
        progress.on_start(&name, metadata.len());

        let mut input = File::open(source).await?;
        let mut buffer = vec![0u8; buffer_size.max(1)];
        let mut copied = 0u64;
        loop {
            let n = input.read(&mut buffer).await?;
            if n == 0 {
                break;
            }
            output.write_all(&buffer[..n]).await?;
            copied += n as u64;
            progress.on_bytes(&name, n as u64);
        }
        output.flush().await?;
        Ok::<u64, TransferError>(copied)
    }
    .await;

    match result {
        Ok(copied) => {
            set_modified(output, modified).await?;
            Ok(copied)
        }
        Err(err) => {
            drop(output);
            let _ = tokio::fs::remove_file(dest).await;
            Err(err)
        }
    }
}

/// `<dest>.tmp`, next to the final file.
pub fn temp_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    dest.with_file_name(name)
}

/// Streams an HTTP response body into `<dest>.tmp`, applies the capture time and renames the
/// temp file to `dest` once the whole body has arrived.
pub async fn download_to(
    mut response: reqwest::Response,
    dest: &Path,
    modified: SystemTime,
    progress: &dyn ProgressSink,
) -> Result<u64, TransferError> {
    if !response.status().is_success() {
        return Err(TransferError::UnexpectedStatus {
            url: response.url().to_string(),
            status: response.status().as_u16(),
        });
    }
    if tokio::fs::try_exists(dest).await? {
        return Err(TransferError::AlreadyExists(dest.to_path_buf()));
    }

    let name = display_name(dest);
    let temp = temp_path(dest);
    progress.on_start(&name, response.content_length().unwrap_or(0));

    let mut output = File::create(&temp).await?;
    let mut written = 0u64;
    let streamed = async {
        while let Some(chunk) = response.chunk().await? {
            output.write_all(&chunk).await?;
            written += chunk.len() as u64;
            progress.on_bytes(&name, chunk.len() as u64);
        }
        output.flush().await?;
        Ok::<(), TransferError>(())
    }
    .await;

    if let Err(err) = streamed {
        drop(output);
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(err);
    }
    set_modified(output, modified).await?;
    tokio::fs::rename(&temp, dest).await?;
    Ok(written)
}
