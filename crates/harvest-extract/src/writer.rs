use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use harvest_crawler::{BatchWriter, ContentRecord, WriteError};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

/// Names of the JSON keys of an output record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordKeys {
    #[serde(default = "default_url_key")]
    pub url: String,
    #[serde(default = "default_title_key")]
    pub title: String,
    #[serde(default = "default_body_key")]
    pub body: String,
}

impl Default for RecordKeys {
    fn default() -> Self {
        Self {
            url: default_url_key(),
            title: default_title_key(),
            body: default_body_key(),
        }
    }
}

impl RecordKeys {
    pub fn validate(&self) -> Result<(), String> {
        let keys = [&self.url, &self.title, &self.body];
        if keys.iter().any(|k| k.is_empty()) {
            return Err("keys can't be empty".into());
        }
        if self.url == self.title || self.url == self.body || self.title == self.body {
            return Err(format!("keys must be distinct, got {keys:?}"));
        }
        Ok(())
    }
}

fn default_url_key() -> String {
    String::from("url")
}

fn default_title_key() -> String {
    String::from("title")
}

fn default_body_key() -> String {
    String::from("content")
}

struct Keyed<'a> {
    keys: &'a RecordKeys,
    record: &'a ContentRecord,
}

impl Serialize for Keyed<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry(&self.keys.url, &self.record.url)?;
        map.serialize_entry(&self.keys.title, &self.record.title)?;
        map.serialize_entry(&self.keys.body, &self.record.body)?;
        map.end()
    }
}

struct KeyedBatch<'a> {
    keys: &'a RecordKeys,
    batch: &'a [ContentRecord],
}

impl Serialize for KeyedBatch<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.batch.iter().map(|record| Keyed {
            keys: self.keys,
            record,
        }))
    }
}

/// Pretty JSON of a single record, non-ASCII characters are kept as is.
pub fn record_to_json(keys: &RecordKeys, record: &ContentRecord) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&Keyed { keys, record })
}

/// Pretty JSON array of records, non-ASCII characters are kept as is.
pub fn batch_to_json(keys: &RecordKeys, batch: &[ContentRecord]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&KeyedBatch { keys, batch })
}

/// Writes the batch as a JSON array, atomically replacing `path`.
#[derive(Debug, Clone)]
pub struct JsonBatchWriter {
    path: PathBuf,
    keys: RecordKeys,
}

impl JsonBatchWriter {
    pub fn new(path: impl Into<PathBuf>, keys: RecordKeys) -> Self {
        Self {
            path: path.into(),
            keys,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BatchWriter for JsonBatchWriter {
    fn write(&self, batch: &[ContentRecord]) -> Result<(), WriteError> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs_err::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        {
            let mut wtr = BufWriter::new(tmp.as_file_mut());
            let batch = KeyedBatch {
                keys: &self.keys,
                batch,
            };
            serde_json::to_writer_pretty(&mut wtr, &batch)
                .map_err(|e| WriteError::Encode(Box::new(e)))?;
            wtr.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| WriteError::Persist {
            path: self.path.clone(),
            source: e.error,
        })?;

        log::info!("Wrote {} records to {}", batch.len(), self.path.display());
        Ok(())
    }
}
