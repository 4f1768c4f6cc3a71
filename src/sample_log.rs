//! Newline-delimited JSON sample log.
//!
//! Each line is one [`UsageSample`]. The writer appends and fsyncs every record
//! and holds `<log>.lock` for its lifetime so two samplers never share a file.
//! Readers take no lock.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::LogError;
use crate::types::UsageSample;

pub fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

/// Exclusive marker for the single writer of a log. Removed on drop.
#[derive(Debug)]
struct WriterLock {
    path: PathBuf,
}

impl WriterLock {
    fn acquire(log: &Path) -> Result<Self, LogError> {
        Self::acquire_with(log, |f| writeln!(f, "{}", std::process::id()))
    }

    fn acquire_with<F>(log: &Path, write_owner: F) -> Result<Self, LogError>
    where
        F: FnOnce(&mut File) -> io::Result<()>,
    {
        let path = lock_path(log);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut f) => {
                let lock = Self { path };
                // from here on a failure drops `lock`, which removes the file
                write_owner(&mut f)?;
                Ok(lock)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(LogError::Locked {
                path: log.to_path_buf(),
                lock: path,
            }),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for WriterLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(lock = %self.path.display(), error = %e, "failed to remove sample log lock");
        }
    }
}

/// Append-only writer for one sampling run.
#[derive(Debug)]
pub struct SampleLog {
    path: PathBuf,
    file: File,
    // dropped after `file`, so the lock outlives every write
    _lock: WriterLock,
}

impl SampleLog {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LogError> {
        let path = path.as_ref().to_path_buf();
        let lock = WriterLock::acquire(&path)?;
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file, _lock: lock })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write one sample as a single line and force it to disk.
    pub fn append(&mut self, sample: &UsageSample) -> Result<(), LogError> {
        let mut line = serde_json::to_vec(sample)?;
        line.push(b'\n');
        self.file.write_all(&line)?;
        self.file.flush()?;
        self.file.sync_data()?;
        Ok(())
    }
}

pub fn encode_sample(sample: &UsageSample) -> Result<String, serde_json::Error> {
    serde_json::to_string(sample)
}

pub fn decode_sample(line: &str) -> Result<UsageSample, serde_json::Error> {
    serde_json::from_str(line)
}

/// Iterator over the samples of a log. A missing file yields nothing.
///
/// Lines are read as raw bytes. Lines that fail to decode, including ones that
/// are not UTF-8, are logged and skipped; after a crash the last line may be a
/// partial write. Only I/O errors from the underlying reader are yielded.
pub struct SampleReader<R> {
    reader: R,
    buf: Vec<u8>,
    line_no: usize,
    skipped: usize,
}

impl SampleReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Option<Self>> {
        match File::open(path.as_ref()) {
            Ok(f) => Ok(Some(Self::new(BufReader::new(f)))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl<R: BufRead> SampleReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            line_no: 0,
            skipped: 0,
        }
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl<R: BufRead> Iterator for SampleReader<R> {
    type Item = io::Result<UsageSample>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Some(Err(e)),
            }
            self.line_no += 1;
            if self.buf.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            match serde_json::from_slice::<UsageSample>(&self.buf) {
                Ok(sample) => return Some(Ok(sample)),
                Err(e) => {
                    self.skipped += 1;
                    warn!(line = self.line_no, error = %e, "skipping unreadable sample log line");
                }
            }
        }
    }
}
