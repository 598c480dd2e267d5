/// Stream sources: `(offset, size) -> bytes`, blocking or asynchronous.
///
/// An asynchronous read completes by publishing its outcome on the shared
/// `StreamRequest`: the bytes are stored first, then the status is
/// released, so a reader that observes `Ready` with acquire ordering also
/// sees the data.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use crate::error::{Error, Result};

const SOURCE: &str = "galaxy3d::Streaming";

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    Pending = 0,
    Ready = 1,
    /// Cancelled on request; not an error
    Aborted = 2,
    Failed = 3,
}

impl StreamStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => StreamStatus::Ready,
            2 => StreamStatus::Aborted,
            3 => StreamStatus::Failed,
            _ => StreamStatus::Pending,
        }
    }
}

/// One asynchronous read, shared between the controller and the I/O side
pub struct StreamRequest {
    offset: u64,
    size: u32,
    status: AtomicU8,
    abort_requested: AtomicBool,
    data: Mutex<Option<Vec<u8>>>,
}

impl StreamRequest {
    pub fn new(offset: u64, size: u32) -> Arc<Self> {
        Arc::new(Self {
            offset,
            size,
            status: AtomicU8::new(StreamStatus::Pending as u8),
            abort_requested: AtomicBool::new(false),
            data: Mutex::new(None),
        })
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn status(&self) -> StreamStatus {
        StreamStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    /// Ask the I/O side to drop the read; completion reports `Aborted`.
    pub fn abort(&self) {
        self.abort_requested.store(true, Ordering::Release);
    }

    pub fn is_abort_requested(&self) -> bool {
        self.abort_requested.load(Ordering::Acquire)
    }

    /// Publish the outcome of the read. An abort request wins over data;
    /// an empty buffer counts as a failure.
    pub fn complete(&self, result: Result<Vec<u8>>) {
        if self.status() != StreamStatus::Pending {
            return;
        }
        let status = if self.is_abort_requested() {
            StreamStatus::Aborted
        } else {
            match result {
                Ok(bytes) if !bytes.is_empty() => {
                    *self.data.lock().unwrap_or_else(PoisonError::into_inner) = Some(bytes);
                    StreamStatus::Ready
                }
                Ok(_) => StreamStatus::Failed,
                Err(err) => {
                    crate::engine_warn!(SOURCE, "Read of {} bytes at {} failed: {}", self.size, self.offset, err);
                    StreamStatus::Failed
                }
            }
        };
        self.status.store(status as u8, Ordering::Release);
    }

    /// Take the bytes of a `Ready` request.
    pub fn take_data(&self) -> Option<Vec<u8>> {
        if self.status() != StreamStatus::Ready {
            return None;
        }
        self.data.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}

pub trait StreamSource: Send + Sync {
    /// Blocking read
    fn read_sync(&self, offset: u64, size: u32) -> Result<Vec<u8>>;

    /// Start an asynchronous read; the outcome lands on `request`.
    fn start_read(&self, request: Arc<StreamRequest>);
}

// ===== FILE =====

/// Reads ranges of a file, asynchronous reads run on the rayon pool
pub struct FileStreamSource {
    path: PathBuf,
}

impl FileStreamSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_range(path: &Path, offset: u64, size: u32) -> Result<Vec<u8>> {
        let mut file = File::open(path)?;
        file.seek(SeekFrom::Start(offset))?;
        let mut bytes = vec![0u8; size as usize];
        file.read_exact(&mut bytes)?;
        Ok(bytes)
    }
}

impl StreamSource for FileStreamSource {
    fn read_sync(&self, offset: u64, size: u32) -> Result<Vec<u8>> {
        Self::read_range(&self.path, offset, size)
    }

    fn start_read(&self, request: Arc<StreamRequest>) {
        let path = self.path.clone();
        rayon::spawn(move || {
            if request.is_abort_requested() {
                request.complete(Ok(Vec::new()));
                return;
            }
            let result = Self::read_range(&path, request.offset(), request.size());
            request.complete(result);
        });
    }
}

// ===== MEMORY =====

/// In-memory blob; asynchronous reads complete when `pump` is called
pub struct MemoryStreamSource {
    data: Vec<u8>,
    queue: Mutex<VecDeque<Arc<StreamRequest>>>,
    failing: AtomicBool,
}

impl MemoryStreamSource {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            queue: Mutex::new(VecDeque::new()),
            failing: AtomicBool::new(false),
        }
    }

    /// While set, every read fails with an I/O error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Release);
    }

    pub fn pending_count(&self) -> usize {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Complete every queued read. Returns the number completed.
    pub fn pump(&self) -> usize {
        let requests: Vec<Arc<StreamRequest>> =
            self.queue.lock().unwrap_or_else(PoisonError::into_inner).drain(..).collect();
        for request in &requests {
            request.complete(self.read_sync(request.offset(), request.size()));
        }
        requests.len()
    }

    fn read_range(&self, offset: u64, size: u32) -> Result<Vec<u8>> {
        if self.failing.load(Ordering::Acquire) {
            return Err(Error::IoError(format!("simulated failure at {}", offset)));
        }
        let start = usize::try_from(offset).map_err(|_| Error::IoError(format!("offset {} out of range", offset)))?;
        let available = self.data.len().saturating_sub(start);
        if size as usize > available {
            return Err(Error::UnexpectedEndOfData { needed: size as usize, available });
        }
        Ok(self.data[start..start + size as usize].to_vec())
    }
}

impl StreamSource for MemoryStreamSource {
    fn read_sync(&self, offset: u64, size: u32) -> Result<Vec<u8>> {
        self.read_range(offset, size)
    }

    fn start_read(&self, request: Arc<StreamRequest>) {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).push_back(request);
    }
}
