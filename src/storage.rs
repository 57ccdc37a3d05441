use std::fmt::{Display, Formatter};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const DOCUMENTS_MARKER: &str = "\n=== DOCUMENTS ===\n";

#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    TomlDecode(toml::de::Error),
    TomlEncode(toml::ser::Error),
    JsonDecode(serde_json::Error),
    JsonEncode(serde_json::Error),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(err) => write!(f, "io error: {err}"),
            StorageError::TomlDecode(err) => write!(f, "failed to parse TOML header: {err}"),
            StorageError::TomlEncode(err) => write!(f, "failed to encode TOML header: {err}"),
            StorageError::JsonDecode(err) => write!(f, "failed to parse JSONL document: {err}"),
            StorageError::JsonEncode(err) => write!(f, "failed to encode JSONL document: {err}"),
        }
    }
}

impl std::error::Error for StorageError {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardHeader {
    pub schema_version: u32,
    pub created_at: DateTime<Utc>,
}

impl BoardHeader {
    pub fn new() -> Self {
        Self {
            schema_version: 1,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDocument {
    pub key: String,
    pub revision: u64,
    pub data: serde_json::Value,
}

pub trait DocumentStore {
    fn load(&self, key: &str) -> Option<StoredDocument>;
    fn save(&mut self, document: StoredDocument) -> Result<(), StorageError>;
}

#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    header: BoardHeader,
    documents: Vec<StoredDocument>,
}

impl FileStore {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let raw = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Self::fresh(path)),
            Err(err) => return Err(StorageError::Io(err)),
        };

        if raw.trim().is_empty() {
            return Ok(Self::fresh(path));
        }

        let (header_blob, documents_blob) =
            if let Some((header, documents)) = raw.split_once(DOCUMENTS_MARKER) {
                (header, documents)
            } else {
                (raw.as_str(), "")
            };

        let header: BoardHeader = toml::from_str(header_blob).map_err(StorageError::TomlDecode)?;
        let mut documents = Vec::new();
        for line in documents_blob.lines() {
            if line.trim().is_empty() {
                continue;
            }
            documents.push(serde_json::from_str(line).map_err(StorageError::JsonDecode)?);
        }

        Ok(Self {
            path: path.to_path_buf(),
            header,
            documents,
        })
    }

    fn fresh(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            header: BoardHeader::new(),
            documents: Vec::new(),
        }
    }

    pub fn write(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(StorageError::Io)?;
            }
        }

        let header = toml::to_string_pretty(&self.header).map_err(StorageError::TomlEncode)?;
        let mut file = fs::File::create(&self.path).map_err(StorageError::Io)?;
        file.write_all(header.as_bytes())
            .map_err(StorageError::Io)?;
        file.write_all(DOCUMENTS_MARKER.as_bytes())
            .map_err(StorageError::Io)?;

        for document in &self.documents {
            let line = serde_json::to_string(document).map_err(StorageError::JsonEncode)?;
            file.write_all(line.as_bytes()).map_err(StorageError::Io)?;
            file.write_all(b"\n").map_err(StorageError::Io)?;
        }

        Ok(())
    }
}

impl DocumentStore for FileStore {
    fn load(&self, key: &str) -> Option<StoredDocument> {
        self.documents
            .iter()
            .find(|document| document.key == key)
            .cloned()
    }

    fn save(&mut self, document: StoredDocument) -> Result<(), StorageError> {
        match self
            .documents
            .iter_mut()
            .find(|existing| existing.key == document.key)
        {
            Some(existing) => *existing = document,
            None => self.documents.push(document),
        }
        self.write()
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Vec<StoredDocument>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryStore {
    fn load(&self, key: &str) -> Option<StoredDocument> {
        self.documents
            .iter()
            .find(|document| document.key == key)
            .cloned()
    }

    fn save(&mut self, document: StoredDocument) -> Result<(), StorageError> {
        match self
            .documents
            .iter_mut()
            .find(|existing| existing.key == document.key)
        {
            Some(existing) => *existing = document,
            None => self.documents.push(document),
        }
        Ok(())
    }
}
