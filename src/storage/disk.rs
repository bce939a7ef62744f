//! Local disk backend.
//!
//! Each record lives in its own file under the root directory. The file name is the
//! SHA-256 hex digest of the record id, so arbitrary ids (up to the key size limit)
//! map to valid, bounded file names.
//!
//! File layout: the record id as a JSON string on the first line, followed by the raw
//! payload. Listing only reads the first line of each file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};

use super::{
    StorageError, StorageInterface, StorageLimits, StorageResult, StoreListOptions, StoreListing,
    paginate,
};

const RECORD_EXTENSION: &str = "json";
const TEMP_EXTENSION: &str = "tmp";

/// Worst-case growth of a record id once written as a JSON string (`\u00XX`).
const HEADER_ESCAPE_RATIO: usize = 6;

#[derive(Debug)]
struct DiskRecord {
    record_id: String,
    data: String,
}

impl DiskRecord {
    fn encode(&self) -> StorageResult<Vec<u8>> {
        let mut content = serde_json::to_vec(&self.record_id)
            .map_err(|e| StorageError::serialization(e.to_string()))?;
        content.reserve(self.data.len() + 1);
        content.push(b'\n');
        content.extend_from_slice(self.data.as_bytes());
        Ok(content)
    }

    fn decode(path: &Path, mut content: Vec<u8>) -> StorageResult<Self> {
        let split = content
            .iter()
            .position(|byte| *byte == b'\n')
            .ok_or_else(|| StorageError::corrupted(path, "missing record header"))?;
        let data = content.split_off(split + 1);
        content.truncate(split);

        Ok(Self {
            record_id: decode_header(path, &content)?,
            data: String::from_utf8(data)
                .map_err(|e| StorageError::corrupted(path, e.to_string()))?,
        })
    }
}

fn decode_header(path: &Path, header: &[u8]) -> StorageResult<String> {
    serde_json::from_slice(header).map_err(|e| StorageError::corrupted(path, e.to_string()))
}

/// File-per-record implementation of [`StorageInterface`].
#[derive(Debug, Clone)]
pub struct LocalDiskStore {
    root: PathBuf,
    limits: StorageLimits,
}

impl LocalDiskStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub async fn open(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .map_err(|e| StorageError::io(&root, e))?;
        Ok(Self {
            root,
            limits: StorageLimits::default(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, record_id: &str) -> PathBuf {
        let digest = Sha256::digest(record_id.as_bytes());
        self.root
            .join(format!("{:x}", digest))
            .with_extension(RECORD_EXTENSION)
    }

    async fn load(path: &Path) -> StorageResult<Option<DiskRecord>> {
        let content = match fs::read(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::io(path, e)),
        };
        DiskRecord::decode(path, content).map(Some)
    }

    /// Read only the header line of a record file.
    async fn load_record_id(&self, path: &Path) -> StorageResult<Option<String>> {
        let file = match fs::File::open(path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::io(path, e)),
        };

        // quotes and newline on top of the escaped id
        let max_header = self.limits.max_key_size * HEADER_ESCAPE_RATIO + 3;
        let mut header = Vec::new();
        BufReader::new(file)
            .take(max_header as u64)
            .read_until(b'\n', &mut header)
            .await
            .map_err(|e| StorageError::io(path, e))?;

        if header.pop() != Some(b'\n') {
            return Err(StorageError::corrupted(path, "missing record header"));
        }
        decode_header(path, &header).map(Some)
    }

    /// Write via a uniquely named sibling temp file and rename, so readers never see
    /// partial content and concurrent writers of one record never share a temp file.
    async fn save(&self, path: &Path, record: &DiskRecord) -> StorageResult<()> {
        let content = record.encode()?;
        let tmp_path = path.with_extension(format!(
            "{:016x}.{}",
            rand::random::<u64>(),
            TEMP_EXTENSION
        ));
        fs::write(&tmp_path, &content)
            .await
            .map_err(|e| StorageError::io(&tmp_path, e))?;
        if let Err(e) = fs::rename(&tmp_path, path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::io(path, e));
        }
        Ok(())
    }

    async fn scan_keys(&self) -> StorageResult<Vec<String>> {
        let mut dir = fs::read_dir(&self.root)
            .await
            .map_err(|e| StorageError::io(&self.root, e))?;

        let mut keys = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| StorageError::io(&self.root, e))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            match self.load_record_id(&path).await {
                Ok(Some(record_id)) => keys.push(record_id),
                Ok(None) => {}
                Err(e) => tracing::warn!("Skipping unreadable record file: {}", e),
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[async_trait]
impl StorageInterface for LocalDiskStore {
    async fn read(&self, record_id: &str) -> StorageResult<Option<String>> {
        let record = Self::load(&self.record_path(record_id)).await?;
        Ok(record
            .filter(|record| record.record_id == record_id)
            .map(|record| record.data))
    }

    async fn write(&self, record_id: &str, data: &str) -> StorageResult<()> {
        let path = self.record_path(record_id);
        let record = DiskRecord {
            record_id: record_id.to_string(),
            data: data.to_string(),
        };
        self.save(&path, &record).await?;
        tracing::debug!(path = %path.display(), "Stored record {}", record_id);
        Ok(())
    }

    async fn delete(&self, record_id: &str) -> StorageResult<()> {
        let path = self.record_path(record_id);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(path, e)),
        }
    }

    async fn list(&self, options: StoreListOptions) -> StorageResult<StoreListing> {
        let keys = self.scan_keys().await?;
        paginate(keys, &options)
    }

    fn limits(&self) -> StorageLimits {
        self.limits
    }
}
