//! Durable storage for queued operations.
//!
//! Operations are appended to a JSON-lines file, one serialized
//! [`QueuedOperation`] per line, so append order survives process restart.
//! A line that fails to parse on load is skipped with a warning rather than
//! poisoning the rest of the queue.

use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;

use super::operation::QueuedOperation;

/// Filename of the queue log inside the data directory.
const QUEUE_FILENAME: &str = "offline_queue.jsonl";

/// File-backed append log for queued operations.
#[derive(Clone, Debug)]
pub struct QueueStore {
    data_dir: PathBuf,
}

impl QueueStore {
    /// Creates a store rooted at a custom data directory.
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Creates a store rooted at the platform default data directory.
    pub fn default_location() -> Self {
        let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(base.join("sproutling"))
    }

    /// Returns the full path of the queue file.
    pub fn path(&self) -> PathBuf {
        self.data_dir.join(QUEUE_FILENAME)
    }

    /// Appends one operation to the log.
    ///
    /// Creates the data directory if it doesn't exist.
    pub fn append(&self, op: &QueuedOperation) -> Result<(), StoreError> {
        fs::create_dir_all(&self.data_dir)
            .map_err(|e| StoreError::Io(self.data_dir.clone(), e))?;

        let line = serde_json::to_string(op).map_err(StoreError::Encode)?;
        let path = self.path();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| StoreError::Io(path.clone(), e))?;

        writeln!(file, "{}", line).map_err(|e| StoreError::Io(path, e))?;
        Ok(())
    }

    /// Reads every stored operation in append order.
    ///
    /// Returns an empty vec if the file doesn't exist yet.
    pub fn read_all(&self) -> Result<Vec<QueuedOperation>, StoreError> {
        let path = self.path();
        let file = match fs::File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::Io(path, e)),
        };

        let mut ops = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| StoreError::Io(path.clone(), e))?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(op) => ops.push(op),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable queue entry");
                }
            }
        }
        Ok(ops)
    }

    /// Removes the queue file entirely.
    pub fn clear(&self) -> Result<(), StoreError> {
        let path = self.path();
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(path, e)),
        }
    }
}

/// Errors from the durable queue store.
#[derive(Debug)]
pub enum StoreError {
    /// I/O error reading or writing the queue file.
    Io(PathBuf, io::Error),
    /// An operation could not be encoded as JSON.
    Encode(serde_json::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io(path, e) => write!(f, "I/O error for {}: {}", path.display(), e),
            StoreError::Encode(e) => write!(f, "Failed to encode queue entry: {}", e),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(_, e) => Some(e),
            StoreError::Encode(e) => Some(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::operation::{OperationKind, Priority};
    use crate::record::EntityKind;
    use tempfile::TempDir;

    fn test_store() -> (QueueStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = QueueStore::new(temp_dir.path().to_path_buf());
        (store, temp_dir)
    }

    fn op(priority: Priority, marker: &str) -> QueuedOperation {
        QueuedOperation::new(
            OperationKind::save(EntityKind::Feeding),
            priority,
            serde_json::json!({ "marker": marker }),
        )
    }

    #[test]
    fn test_read_all_missing_file() {
        let (store, _temp) = test_store();
        assert!(store.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_append_preserves_order() {
        let (store, _temp) = test_store();
        store.append(&op(Priority::Low, "first")).unwrap();
        store.append(&op(Priority::Critical, "second")).unwrap();
        store.append(&op(Priority::Normal, "third")).unwrap();

        let ops = store.read_all().unwrap();
        let markers: Vec<&str> = ops
            .iter()
            .map(|o| o.payload["marker"].as_str().unwrap())
            .collect();
        assert_eq!(markers, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_order_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        {
            let store = QueueStore::new(temp_dir.path().to_path_buf());
            store.append(&op(Priority::High, "a")).unwrap();
            store.append(&op(Priority::Low, "b")).unwrap();
        }

        let reopened = QueueStore::new(temp_dir.path().to_path_buf());
        let ops = reopened.read_all().unwrap();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].payload["marker"], "a");
        assert_eq!(ops[1].payload["marker"], "b");
    }

    #[test]
    fn test_clear() {
        let (store, _temp) = test_store();
        store.append(&op(Priority::Normal, "x")).unwrap();
        store.clear().unwrap();
        assert!(store.read_all().unwrap().is_empty());
        // clearing an already-missing file is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_corrupt_line_is_skipped() {
        let (store, _temp) = test_store();
        store.append(&op(Priority::Normal, "good")).unwrap();

        use std::io::Write as _;
        let mut file = OpenOptions::new()
            .append(true)
            .open(store.path())
            .unwrap();
        writeln!(file, "not json at all").unwrap();

        store.append(&op(Priority::Normal, "also good")).unwrap();

        let ops = store.read_all().unwrap();
        assert_eq!(ops.len(), 2);
    }
}
