//! Insert-or-ignore record store backed by a JSON-lines file.
//!
//! Each record has a key; a record whose key is already present in the file
//! is ignored, so re-running a batch never duplicates rows.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

/// Default number of records written between flushes.
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// A record with a unique key.
pub trait Keyed {
    fn key(&self) -> String;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Corrupt record on line {line} of {path}: {source}")]
    Corrupt {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },

    #[error("Failed to encode record {key}: {source}")]
    Encode {
        key: String,
        source: serde_json::Error,
    },
}

/// Counts of one insert call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertSummary {
    pub inserted: usize,
    pub ignored: usize,
}

/// JSON-lines store of records of type `R`.
#[derive(Debug)]
pub struct RecordStore<R> {
    path: PathBuf,
    keys: HashSet<String>,
    batch_size: usize,
    _record: PhantomData<R>,
}

impl<R> RecordStore<R>
where
    R: Keyed + Serialize + DeserializeOwned,
{
    /// Open the store at `path`, creating parent directories.
    ///
    /// The file itself is created on the first insert.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let keys = if path.exists() {
            load_keys::<R>(&path)?
        } else {
            HashSet::new()
        };
        debug!(path = %path.display(), existing = keys.len(), "Opened record store");

        Ok(Self {
            path,
            keys,
            batch_size: DEFAULT_BATCH_SIZE,
            _record: PhantomData,
        })
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Number of records present in the store.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Append records whose key is not yet present.
    ///
    /// Duplicate keys within `records` are ignored after the first.
    pub fn insert_or_ignore<'a, I>(&mut self, records: I) -> Result<InsertSummary, StoreError>
    where
        I: IntoIterator<Item = &'a R>,
        R: 'a,
    {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source: std::io::Error| StoreError::Io { path, source }
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(io_err(&self.path))?;
        let mut writer = BufWriter::new(file);

        let mut summary = InsertSummary::default();
        let mut pending = 0;

        for record in records {
            let key = record.key();
            if self.keys.contains(&key) {
                summary.ignored += 1;
                continue;
            }

            let line = serde_json::to_string(record).map_err(|source| StoreError::Encode {
                key: key.clone(),
                source,
            })?;
            writeln!(writer, "{}", line).map_err(io_err(&self.path))?;
            self.keys.insert(key);
            summary.inserted += 1;
            pending += 1;

            if pending >= self.batch_size {
                writer.flush().map_err(io_err(&self.path))?;
                pending = 0;
            }
        }

        writer.flush().map_err(io_err(&self.path))?;
        debug!(?summary, "Inserted records");
        Ok(summary)
    }

    /// Read every record in the store, in insertion order.
    pub fn read_all(&self) -> Result<Vec<R>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        read_records(&self.path)
    }
}

fn load_keys<R>(path: &Path) -> Result<HashSet<String>, StoreError>
where
    R: Keyed + DeserializeOwned,
{
    Ok(read_records::<R>(path)?.iter().map(Keyed::key).collect())
}

fn read_records<R: DeserializeOwned>(path: &Path) -> Result<Vec<R>, StoreError> {
    let file = File::open(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut records = Vec::new();
    for (line_num, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|source| StoreError::Corrupt {
            path: path.to_path_buf(),
            line: line_num + 1,
            source,
        })?;
        records.push(record);
    }
    Ok(records)
}
