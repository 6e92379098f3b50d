//! Append-only log file for persisted reports

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::TraceError;

/// Log file that reports are appended to.
///
/// Appends and truncation hold an exclusive advisory lock on the file (on
/// Unix) as well as an in-process mutex, so concurrent writers never
/// interleave inside one report.
#[derive(Debug)]
pub struct TraceSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl TraceSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = path.into();
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Append `text`, creating the file and its parent directory if needed
    pub fn append(&self, text: &str) -> Result<(), TraceError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|source| TraceError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let _guard = self.write_lock.lock();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| TraceError::io(&self.path, e))?;

        let lock = FileLock::exclusive(&file).map_err(|e| TraceError::io(&self.path, e))?;
        let mut writer = &file;
        writer
            .write_all(text.as_bytes())
            .and_then(|()| writer.flush())
            .map_err(|e| TraceError::io(&self.path, e))?;
        drop(lock);

        tracing::debug!(
            path = %self.path.display(),
            bytes = text.len(),
            "Appended stack trace"
        );
        Ok(())
    }

    /// Truncate the log to zero length. A missing log is left missing.
    pub fn clear(&self) -> Result<(), TraceError> {
        let _guard = self.write_lock.lock();
        let file = match OpenOptions::new().write(true).open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(TraceError::io(&self.path, e)),
        };

        let _lock = FileLock::exclusive(&file).map_err(|e| TraceError::io(&self.path, e))?;
        file.set_len(0).map_err(|e| TraceError::io(&self.path, e))?;

        tracing::debug!(path = %self.path.display(), "Cleared stack trace log");
        Ok(())
    }

    /// Last `line_count` lines of the log, line terminators included.
    ///
    /// Returns `None` when the log file does not exist.
    pub fn tail(&self, line_count: usize) -> Result<Option<String>, TraceError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(TraceError::io(&self.path, e)),
        };
        let contents = String::from_utf8_lossy(&bytes);

        let lines: Vec<&str> = contents.split_inclusive('\n').collect();
        let start = lines.len().saturating_sub(line_count);
        Ok(Some(lines[start..].concat()))
    }
}

/// Exclusive advisory lock released when dropped
struct FileLock<'a> {
    #[cfg_attr(not(unix), allow(dead_code))]
    file: &'a File,
}

impl<'a> FileLock<'a> {
    #[cfg(unix)]
    fn exclusive(file: &'a File) -> io::Result<Self> {
        use std::os::unix::io::AsRawFd;

        // SAFETY: the descriptor is owned by `file`, which outlives the lock
        let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(Self { file })
    }

    #[cfg(not(unix))]
    fn exclusive(file: &'a File) -> io::Result<Self> {
        Ok(Self { file })
    }
}

impl Drop for FileLock<'_> {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;

            // SAFETY: see `FileLock::exclusive`
            let rc = unsafe { libc::flock(self.file.as_raw_fd(), libc::LOCK_UN) };
            if rc != 0 {
                tracing::warn!(
                    error = %io::Error::last_os_error(),
                    "Failed to release log file lock"
                );
            }
        }
    }
}
