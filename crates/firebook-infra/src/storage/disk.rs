//! Directory-backed file storage.

use std::fmt::Display;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use futures::{Stream, StreamExt};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use firebook_core::error::StorageError;
use firebook_core::storage::leaf_name;

use super::FileNamer;

/// File storage rooted at one directory.
///
/// Files are addressed by a bare filename; anything that is not a single
/// path component is treated as missing.
pub struct DiskStorage {
    root: PathBuf,
    namer: FileNamer,
}

/// An opened stored file, ready to be streamed.
pub struct StoredFile {
    pub name: String,
    pub len: u64,
    file: File,
}

impl DiskStorage {
    /// Open the storage directory, creating it if needed.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;

        info!(path = %root.display(), "Initialized file storage");

        Ok(Self {
            root,
            namer: FileNamer::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> Option<PathBuf> {
        leaf_name(name).map(|leaf| self.root.join(leaf))
    }

    /// Open a stored file for reading.
    pub async fn open(&self, name: &str) -> Result<StoredFile, StorageError> {
        let Some(path) = self.resolve(name) else {
            debug!(name = %name, "Rejected storage path");
            return Err(StorageError::NotFound);
        };

        let file = File::open(&path).await.map_err(not_found_or_io)?;
        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(StorageError::NotFound);
        }

        Ok(StoredFile {
            name: name.to_string(),
            len: metadata.len(),
            file,
        })
    }

    /// Write a request body to a freshly named file and return the name.
    ///
    /// A failed copy removes the partial file.
    pub async fn save<S, B, E>(&self, extension: &str, mut body: S) -> Result<String, StorageError>
    where
        S: Stream<Item = Result<B, E>> + Unpin,
        B: AsRef<[u8]>,
        E: Display,
    {
        let (name, path, mut file) = loop {
            let name = self.namer.next_name(extension);
            let Some(path) = self.resolve(&name) else {
                return Err(StorageError::Io(io::Error::new(
                    ErrorKind::InvalidInput,
                    format!("generated name `{name}` is not a plain filename"),
                )));
            };
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => break (name, path, file),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!(name = %name, "Upload name taken, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        };

        match copy_body(&mut file, &mut body).await {
            Ok(written) => {
                info!(name = %name, bytes = written, "Stored upload");
                Ok(name)
            }
            Err(e) => {
                drop(file);
                if let Err(cleanup) = fs::remove_file(&path).await {
                    warn!(name = %name, error = %cleanup, "Failed to remove partial upload");
                }
                Err(e.into())
            }
        }
    }

    /// Delete a stored file. Returns whether a file was removed.
    pub async fn remove(&self, name: &str) -> Result<bool, StorageError> {
        let Some(path) = self.resolve(name) else {
            return Ok(false);
        };

        match fs::remove_file(&path).await {
            Ok(()) => {
                info!(name = %name, "Removed stored file");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

impl StoredFile {
    /// Read the file as a stream of `Bytes` chunks.
    pub fn into_stream(self) -> ReaderStream<File> {
        ReaderStream::new(self.file)
    }
}

async fn copy_body<S, B, E>(file: &mut File, body: &mut S) -> io::Result<u64>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Display,
{
    let mut written = 0;
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| io::Error::other(e.to_string()))?;
        let bytes = chunk.as_ref();
        file.write_all(bytes).await?;
        written += bytes.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

fn not_found_or_io(err: io::Error) -> StorageError {
    match err.kind() {
        ErrorKind::NotFound | ErrorKind::PermissionDenied => StorageError::NotFound,
        _ => StorageError::Io(err),
    }
}
