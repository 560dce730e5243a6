//! Streaming zip archives of session directories.
//!
//! The archive is written by a blocking task into a bounded channel of
//! chunks while the caller drains the other end, so no archive file touches
//! the disk and memory stays bounded by the channel capacity. A failure after
//! streaming has started is delivered as an error item so the response body
//! aborts instead of ending as a truncated but well-formed zip.

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use rclip_models::SessionId;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{StorageError, StorageResult};
use crate::layout::StorageLayout;

/// Deflate level used for every entry.
pub const ARCHIVE_COMPRESSION_LEVEL: i64 = 9;

const CHUNK_SIZE: usize = 64 * 1024;
const CHANNEL_CAPACITY: usize = 4;

/// Archive being streamed for one session.
#[derive(Debug)]
pub struct SessionArchive {
    session_id: SessionId,
    stream: ReceiverStream<io::Result<Bytes>>,
}

impl SessionArchive {
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Download name, `clips_<sessionId>.zip`.
    pub fn file_name(&self) -> String {
        format!("clips_{}.zip", self.session_id)
    }

    /// Archive bytes, in chunks. Ends with an `Err` item if writing failed.
    pub fn into_stream(self) -> ReceiverStream<io::Result<Bytes>> {
        self.stream
    }
}

/// Bundles a session's output directory into a zip on demand.
#[derive(Debug, Clone)]
pub struct SessionArchiver {
    layout: StorageLayout,
}

impl SessionArchiver {
    pub fn new(layout: StorageLayout) -> Self {
        Self { layout }
    }

    /// Start streaming the archive for `session_id`.
    ///
    /// Returns `NotFound` when the id is not a UUID or the session directory
    /// does not exist. The directory listing happens here, so walk failures
    /// surface before any byte is streamed.
    pub async fn open(&self, session_id: &str) -> StorageResult<SessionArchive> {
        let session_id =
            SessionId::parse(session_id).map_err(|_| StorageError::not_found(session_id))?;
        let dir = self.layout.session_dir(&session_id);

        match tokio::fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => {}
            _ => return Err(StorageError::not_found(session_id.as_str())),
        }

        let files = tokio::task::spawn_blocking(move || collect_files(&dir))
            .await
            .map_err(|e| StorageError::archive(format!("listing task failed: {}", e)))??;

        Ok(stream_entries(session_id, files))
    }
}

/// Spawn the blocking writer for `files` and hand back the receiving side.
fn stream_entries(session_id: SessionId, files: Vec<(String, PathBuf)>) -> SessionArchive {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let error_tx = tx.clone();

    let id = session_id.clone();
    tokio::task::spawn_blocking(move || match write_archive(&files, ChunkWriter::new(tx)) {
        Ok(count) => info!(session_id = %id, "Archived {} clips", count),
        Err(StorageError::Io(e)) if e.kind() == io::ErrorKind::BrokenPipe => {
            debug!(session_id = %id, "Archive download aborted by client")
        }
        Err(e) => {
            warn!(session_id = %id, "Archive stream failed: {}", e);
            let _ = error_tx.blocking_send(Err(io::Error::other(e.to_string())));
        }
    });

    SessionArchive {
        session_id,
        stream: ReceiverStream::new(rx),
    }
}

/// `Write` adapter that forwards fixed-size chunks into the archive channel.
///
/// A closed receiver surfaces as `BrokenPipe`.
struct ChunkWriter {
    tx: mpsc::Sender<io::Result<Bytes>>,
    buf: Vec<u8>,
}

impl ChunkWriter {
    fn new(tx: mpsc::Sender<io::Result<Bytes>>) -> Self {
        Self {
            tx,
            buf: Vec::with_capacity(CHUNK_SIZE),
        }
    }

    fn send_buffered(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let chunk = std::mem::replace(&mut self.buf, Vec::with_capacity(CHUNK_SIZE));
        self.tx
            .blocking_send(Ok(Bytes::from(chunk)))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "archive reader closed"))
    }
}

impl Write for ChunkWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        if self.buf.len() >= CHUNK_SIZE {
            self.send_buffered()?;
        }
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.send_buffered()
    }
}

fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(ARCHIVE_COMPRESSION_LEVEL))
}

/// Write `files` into a zip on `writer`. Files removed since they were
/// listed are skipped. Returns the number of entries written.
fn write_archive<W: Write>(files: &[(String, PathBuf)], writer: W) -> StorageResult<usize> {
    let mut zip = ZipWriter::new_stream(writer);
    let mut seen = HashSet::new();
    let mut count = 0;

    for (name, path) in files {
        if seen.contains(name) {
            warn!("Skipping duplicate archive entry {}", path.display());
            continue;
        }

        // Open before the entry header goes out so a vanished file leaves no trace
        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Skipping {} removed before archiving", path.display());
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        seen.insert(name.clone());
        zip.start_file(name.as_str(), entry_options())?;
        io::copy(&mut file, &mut zip)?;
        count += 1;
    }

    let mut inner = zip.finish()?;
    inner.flush()?;
    Ok(count)
}

/// Regular files under `dir`, flattened to their file names.
fn collect_files(dir: &Path) -> StorageResult<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.io_error().map(io::Error::kind) == Some(io::ErrorKind::NotFound) => {
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        files.push((name, entry.into_path()));
    }

    Ok(files)
}
