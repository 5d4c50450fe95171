use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::{fs, io::AsyncWriteExt, sync::Mutex};
use tracing::{debug, warn};

use super::{WeatherStore, latest_for};
use crate::{StorageError, WeatherRecord};

/// Append-only JSON-lines file, one record per line.
///
/// Writes are serialized through an internal lock; reads scan the whole file.
/// Ids are recomputed from the file on every save, so several processes may
/// append to the same path.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

struct Snapshot {
    records: Vec<WeatherRecord>,
    tail: Tail,
}

/// State of the file's last line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tail {
    Clean,
    /// Valid record, but no trailing newline.
    MissingNewline,
    /// Unparsable partial write; the file is valid up to `keep` bytes.
    Torn { keep: u64 },
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every record in the file, in the order they were written.
    ///
    /// An unparsable final line without a trailing newline is a torn write
    /// and is skipped; any other unparsable line is an error.
    pub async fn load_all(&self) -> Result<Vec<WeatherRecord>, StorageError> {
        Ok(self.snapshot().await?.records)
    }

    async fn snapshot(&self) -> Result<Snapshot, StorageError> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Snapshot {
                    records: Vec::new(),
                    tail: Tail::Clean,
                });
            }
            Err(err) => return Err(err.into()),
        };

        let unterminated = !contents.is_empty() && !contents.ends_with('\n');
        let line_count = contents.lines().count();
        let mut records = Vec::with_capacity(line_count);
        let mut tail = if unterminated {
            Tail::MissingNewline
        } else {
            Tail::Clean
        };

        for (idx, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(record) => records.push(record),
                Err(source) if unterminated && idx + 1 == line_count => {
                    warn!(
                        path = %self.path.display(),
                        line = idx + 1,
                        error = %source,
                        "skipping truncated last record"
                    );
                    let keep = contents.rfind('\n').map_or(0, |pos| pos + 1);
                    tail = Tail::Torn { keep: keep as u64 };
                }
                Err(source) => {
                    return Err(StorageError::Corrupt {
                        line: idx + 1,
                        source,
                    });
                }
            }
        }

        Ok(Snapshot { records, tail })
    }
}

#[async_trait]
impl WeatherStore for FileStore {
    async fn find_latest(&self, city: &str) -> Result<Option<WeatherRecord>, StorageError> {
        let records = self.load_all().await?;
        Ok(latest_for(&records, city).cloned())
    }

    async fn save(&self, mut record: WeatherRecord) -> Result<WeatherRecord, StorageError> {
        let _guard = self.write_lock.lock().await;

        let snapshot = self.snapshot().await?;
        let id = snapshot.records.iter().filter_map(|r| r.id).max().unwrap_or(0) + 1;
        record.id = Some(id);

        let mut line = String::new();
        if snapshot.tail == Tail::MissingNewline {
            line.push('\n');
        }
        line.push_str(&serde_json::to_string(&record).map_err(StorageError::Serialize)?);
        line.push('\n');

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        if let Tail::Torn { keep } = snapshot.tail {
            let file = fs::OpenOptions::new().write(true).open(&self.path).await?;
            file.set_len(keep).await?;
            warn!(path = %self.path.display(), keep, "dropped truncated last record");
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        debug!(city = %record.city_name, id, path = %self.path.display(), "appended weather record");

        Ok(record)
    }
}
