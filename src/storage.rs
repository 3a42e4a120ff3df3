use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime};
use sysinfo::Disks;
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, ErrorKind};
use uuid::Uuid;

use crate::config::{TEMP_FILE_PREFIX, TEMP_FILE_SUFFIX};

#[derive(Clone, Debug)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub async fn ensure_root(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root).await
    }

    pub fn root_path(&self) -> &Path {
        &self.root
    }

    /// A stored name must be a single normal path component. Separators,
    /// parent references, absolute paths and the reserved temp prefix are
    /// rejected before touching the filesystem.
    pub fn resolve_name(&self, name: &str) -> Result<PathBuf, StorageError> {
        let trimmed = name.trim();
        if trimmed.is_empty()
            || trimmed.starts_with(TEMP_FILE_PREFIX)
            || trimmed.contains(['/', '\\'])
        {
            return Err(StorageError::InvalidName);
        }
        let mut components = Path::new(trimmed).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(segment)), None) => Ok(self.root.join(segment)),
            _ => Err(StorageError::InvalidName),
        }
    }

    /// Writes `data` to `root/name`, overwriting any existing file of that
    /// name. The bytes land in a temp file first and are renamed into place.
    pub async fn store_file(&self, name: &str, data: &[u8]) -> Result<PathBuf, StorageError> {
        let target = self.resolve_name(name)?;
        self.ensure_root().await?;

        let temp_path = self.root.join(format!(
            "{TEMP_FILE_PREFIX}{}{TEMP_FILE_SUFFIX}",
            Uuid::new_v4()
        ));
        if let Err(err) = write_all_synced(&temp_path, data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(err.into());
        }
        if let Err(err) = fs::rename(&temp_path, &target).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(err.into());
        }
        Ok(target)
    }

    /// Metadata for every regular file directly inside the root,
    /// non-recursive, in directory-enumeration order. A missing root yields
    /// an empty listing.
    pub async fn list_files(&self) -> Result<Vec<FileInfo>, StorageError> {
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut entries = Vec::new();

        while let Some(entry) = dir.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with(TEMP_FILE_PREFIX) {
                continue;
            }
            let last_modified = metadata
                .modified()
                .ok()
                .map(epoch_millis)
                .unwrap_or_default();
            entries.push(FileInfo {
                name,
                size: metadata.len(),
                last_modified,
            });
        }

        Ok(entries)
    }

    pub async fn open_file(&self, name: &str) -> Result<(File, std::fs::Metadata), StorageError> {
        let target = self.resolve_name(name)?;
        let metadata = fs::metadata(&target).await?;
        if !metadata.is_file() {
            return Err(not_a_regular_file(name));
        }
        let file = File::open(&target).await?;
        Ok((file, metadata))
    }

    pub async fn delete_file(&self, name: &str) -> Result<(), StorageError> {
        let target = self.resolve_name(name)?;
        let metadata = fs::metadata(&target).await?;
        if !metadata.is_file() {
            return Err(not_a_regular_file(name));
        }
        fs::remove_file(&target).await?;
        Ok(())
    }

    /// Capacity of the volume backing the root plus the summed size of the
    /// stored files. The root is created first so the query cannot race its
    /// lazy creation.
    pub async fn disk_usage(&self) -> Result<DiskUsage, StorageError> {
        self.ensure_root().await?;
        let root = fs::canonicalize(&self.root).await?;
        let uploaded_files_size = self.list_files().await?.iter().map(|file| file.size).sum();
        let (total_space, free_space) = volume_space(&root)?;
        Ok(DiskUsage::new(
            total_space,
            free_space,
            uploaded_files_size,
            &root,
        ))
    }

    /// Removes temp files older than `ttl`, left behind by interrupted
    /// uploads. Returns the number of entries removed.
    pub async fn cleanup_stale_temp(&self, ttl: Duration) -> io::Result<u64> {
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(0),
            Err(err) => return Err(err),
        };
        let now = SystemTime::now();
        let mut removed = 0;

        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.starts_with(TEMP_FILE_PREFIX) {
                continue;
            }
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let stale = metadata
                .modified()
                .ok()
                .and_then(|ts| now.duration_since(ts).ok())
                .is_some_and(|age| age >= ttl);
            if stale && fs::remove_file(entry.path()).await.is_ok() {
                removed += 1;
            }
        }

        Ok(removed)
    }
}

async fn write_all_synced(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut file = File::create(path).await?;
    file.write_all(data).await?;
    file.sync_all().await
}

fn not_a_regular_file(name: &str) -> StorageError {
    StorageError::Io(io::Error::new(
        ErrorKind::NotFound,
        format!("{name} is not a regular file"),
    ))
}

fn epoch_millis(ts: SystemTime) -> i64 {
    DateTime::<Utc>::from(ts).timestamp_millis()
}

/// Total and available bytes of the volume holding `root`, resolved to the
/// disk with the longest matching mount point.
fn volume_space(root: &Path) -> Result<(u64, u64), StorageError> {
    let disks = Disks::new_with_refreshed_list();
    let disk = disks
        .list()
        .iter()
        .filter(|disk| root.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len())
        .ok_or_else(|| StorageError::Io(io::Error::other("no volume found for storage root")))?;
    Ok((disk.total_space(), disk.available_space()))
}

#[derive(Debug)]
pub enum StorageError {
    InvalidName,
    Io(io::Error),
}

impl From<io::Error> for StorageError {
    fn from(err: io::Error) -> Self {
        StorageError::Io(err)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub name: String,
    pub size: u64,
    pub last_modified: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskUsage {
    pub total_space: u64,
    pub free_space: u64,
    pub used_space: u64,
    pub usage_percentage: f64,
    pub uploaded_files_size: u64,
    pub upload_directory: String,
}

impl DiskUsage {
    pub fn new(total_space: u64, free_space: u64, uploaded_files_size: u64, root: &Path) -> Self {
        let used_space = total_space.saturating_sub(free_space);
        let usage_percentage = if total_space == 0 {
            0.0
        } else {
            used_space as f64 / total_space as f64 * 100.0
        };
        Self {
            total_space,
            free_space,
            used_space,
            usage_percentage,
            uploaded_files_size,
            upload_directory: root.display().to_string(),
        }
    }
}
