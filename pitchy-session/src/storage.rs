//! Persistence of saved recordings

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

/// Destination for encoded recordings
pub trait Storage: Send + Sync {
    /// Persist `bytes` under `id`, returning where they ended up
    fn write(&self, id: &str, bytes: &[u8]) -> io::Result<PathBuf>;
}

/// Writes `<dir>/<id>.wav`
///
/// Files are written to a temporary name in the same directory and renamed
/// into place, so a reader never sees a partial recording. The temporary file
/// is removed if any step fails.
#[derive(Debug, Clone)]
pub struct FsStorage {
    dir: PathBuf,
}

impl FsStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Final path for `id`
    pub fn path_for(&self, id: &str) -> io::Result<PathBuf> {
        validate_id(id)?;
        Ok(self.dir.join(format!("{}.wav", id)))
    }
}

impl Storage for FsStorage {
    fn write(&self, id: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        let path = self.path_for(id)?;
        fs::create_dir_all(&self.dir)?;

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;

        debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }
}

fn validate_id(id: &str) -> io::Result<()> {
    let invalid = id.is_empty()
        || id.starts_with('.')
        || id.contains(['/', '\\']);

    if invalid {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Invalid recording id: {:?}", id),
        ));
    }
    Ok(())
}
