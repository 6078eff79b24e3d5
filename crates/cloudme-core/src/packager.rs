//! Build-context packaging.
//!
//! Produces an uncompressed tar holding the top-level regular files of a
//! directory. Subdirectories are skipped, not recursed.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use tokio::task::spawn_blocking;
use tracing::{debug, warn};

use crate::error::CloudmeError;

/// A packaged build context on disk.
///
/// The file is not removed automatically; call `remove` once consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContextArchive {
    path: PathBuf,
    entries: usize,
}

impl BuildContextArchive {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of files in the archive.
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Best-effort cleanup.
    pub async fn remove(self) {
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            warn!(path = %self.path.display(), error = %e, "failed to remove build context");
        }
    }
}

/// Package `source_dir` into a new temporary archive.
pub async fn package_context(source_dir: &Path) -> Result<BuildContextArchive, CloudmeError> {
    let source_dir = source_dir.to_owned();
    let join_dir = source_dir.clone();
    spawn_blocking(move || package_context_sync(&source_dir))
        .await
        .map_err(|e| CloudmeError::Packaging {
            path: join_dir,
            source: std::io::Error::other(e),
        })?
}

fn package_context_sync(source_dir: &Path) -> Result<BuildContextArchive, CloudmeError> {
    let packaging = |source: std::io::Error| CloudmeError::Packaging {
        path: source_dir.to_path_buf(),
        source,
    };

    let mut entries: Vec<_> = std::fs::read_dir(source_dir)
        .map_err(packaging)?
        .collect::<Result<_, _>>()
        .map_err(packaging)?;
    // read_dir order is filesystem dependent
    entries.sort_by_key(|entry| entry.file_name());

    let (file, path) = tempfile::Builder::new()
        .prefix("docker")
        .suffix(".tar")
        .tempfile()
        .map_err(packaging)?
        .keep()
        .map_err(|e| packaging(e.error))?;

    let mut builder = tar::Builder::new(BufWriter::new(file));
    let mut count = 0;

    for entry in entries {
        let metadata = entry.metadata().map_err(packaging)?;
        if !metadata.is_file() {
            continue;
        }

        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_size(metadata.len());
        header.set_mode(permission_bits(&metadata));
        header.set_mtime(mtime_secs(&metadata));

        let source = File::open(entry.path()).map_err(packaging)?;
        builder
            .append_data(&mut header, entry.file_name(), source)
            .map_err(packaging)?;
        count += 1;
    }

    builder
        .into_inner()
        .and_then(|mut writer| std::io::Write::flush(&mut writer))
        .map_err(packaging)?;

    debug!(
        source = %source_dir.display(),
        archive = %path.display(),
        entries = count,
        "packaged build context"
    );

    Ok(BuildContextArchive {
        path,
        entries: count,
    })
}

#[cfg(unix)]
fn permission_bits(metadata: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn permission_bits(metadata: &std::fs::Metadata) -> u32 {
    if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

fn mtime_secs(metadata: &std::fs::Metadata) -> u64 {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
