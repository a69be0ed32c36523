use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::models::error::{ExPageError, Result};

/// Append-only log file shared with other processes.
///
/// Every [`append`](Self::append) is one write made under an exclusive
/// advisory lock, so blocks from concurrent processes never interleave.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `content` plus a trailing newline. Returns the bytes written.
    pub fn append(&self, content: &str) -> Result<usize> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| ExPageError::Storage(format!("failed to open '{}': {}", self.path.display(), e)))?;

        let mut block = String::with_capacity(content.len() + 1);
        block.push_str(content);
        block.push('\n');

        let _lock = ExclusiveLock::acquire(&file, &self.path)?;
        write_block(&file, block.as_bytes())
            .map_err(|e| ExPageError::Storage(format!("write to '{}' failed: {}", self.path.display(), e)))?;

        Ok(block.len())
    }
}

fn write_block(mut file: &File, block: &[u8]) -> std::io::Result<()> {
    file.write_all(block)?;
    file.flush()
}

/// Exclusive advisory lock held for the duration of a single append.
struct ExclusiveLock<'a> {
    file: &'a File,
}

impl<'a> ExclusiveLock<'a> {
    /// Blocks until the other writer releases the file.
    fn acquire(file: &'a File, path: &Path) -> Result<Self> {
        file.lock().map_err(|e| ExPageError::LockFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Self { file })
    }
}

impl Drop for ExclusiveLock<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            log::warn!("failed to unlock log file: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn append_creates_and_extends() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path().join("app.log"));

        assert_eq!(sink.append("first").unwrap(), 6);
        sink.append("second").unwrap();

        assert_eq!(fs::read_to_string(sink.path()).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn missing_directory_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path().join("missing").join("app.log"));

        assert!(matches!(sink.append("x"), Err(ExPageError::Storage(_))));
    }

    #[test]
    fn lock_is_released_after_append() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path().join("app.log"));
        sink.append("block").unwrap();

        let other = File::open(sink.path()).unwrap();
        assert!(other.try_lock().is_ok());
    }

    #[test]
    fn append_waits_for_other_writer() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path().join("app.log"));

        let holder = OpenOptions::new().create(true).append(true).open(sink.path()).unwrap();
        holder.lock().unwrap();

        let writer = sink.clone();
        let handle = thread::spawn(move || writer.append("second").unwrap());
        thread::sleep(Duration::from_millis(100));
        (&holder).write_all(b"first\n").unwrap();
        holder.unlock().unwrap();
        handle.join().unwrap();

        assert_eq!(fs::read_to_string(sink.path()).unwrap(), "first\nsecond\n");
    }
}
