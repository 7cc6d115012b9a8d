//! Captured telemetry region on disk

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tracing::debug;

use super::SharedRegion;
use crate::{Result, TelemetryError};

/// A region image saved to a file, for replaying a capture offline.
///
/// There is no writer, so every wait reports new data and the decoder sees the
/// same sample on every poll.
#[derive(Debug)]
pub struct FileRegion {
    path: PathBuf,
    file: Mutex<Option<File>>,
    len: usize,
}

impl FileRegion {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| TelemetryError::file_error(path.clone(), e))?;
        let len = file
            .metadata()
            .map_err(|e| TelemetryError::file_error(path.clone(), e))?
            .len();
        let len = usize::try_from(len).map_err(|_| {
            TelemetryError::parse("Region file", format!("{} bytes does not fit in memory", len))
        })?;

        debug!(path = %path.display(), len, "Opened region file");
        Ok(Self { path, file: Mutex::new(Some(file)), len })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl SharedRegion for FileRegion {
    fn len(&self) -> usize {
        self.len
    }

    fn read_at(&self, offset: usize, length: usize) -> Result<Vec<u8>> {
        match offset.checked_add(length) {
            Some(end) if end <= self.len => {}
            _ => return Err(TelemetryError::out_of_range(offset, length, self.len)),
        }

        let mut guard = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        let file =
            guard.as_mut().ok_or_else(|| TelemetryError::connection_failed("Region file is closed"))?;

        let mut buf = vec![0u8; length];
        file.seek(SeekFrom::Start(offset as u64))
            .and_then(|_| file.read_exact(&mut buf))
            .map_err(|e| TelemetryError::file_error(self.path.clone(), e))?;
        Ok(buf)
    }

    async fn wait_for_signal(&self, _timeout: Duration) -> bool {
        true
    }

    fn close(&mut self) {
        self.file.lock().unwrap_or_else(PoisonError::into_inner).take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(name: &str, bytes: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("livetiming-{}-{}", std::process::id(), name));
        let mut file = File::create(&path).unwrap();
        file.write_all(bytes).unwrap();
        path
    }

    #[tokio::test]
    async fn reads_capture_from_disk() {
        let path = temp_file("capture.bin", &[1, 2, 3, 4, 5, 6]);
        let mut region = FileRegion::open(&path).unwrap();

        assert_eq!(region.len(), 6);
        assert_eq!(region.read_at(2, 3).unwrap(), vec![3, 4, 5]);
        assert!(matches!(region.read_at(4, 3), Err(TelemetryError::OutOfRange { .. })));
        assert!(region.wait_for_signal(Duration::from_millis(1)).await);

        region.close();
        region.close();
        assert!(matches!(region.read_at(0, 1), Err(TelemetryError::Connection { .. })));

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn missing_file_is_a_file_error() {
        let result = FileRegion::open("/definitely/not/here.bin");
        assert!(matches!(result, Err(TelemetryError::File { .. })));
    }
}
