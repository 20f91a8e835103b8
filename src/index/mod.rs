//! Dedup index of images already present in the cache directory tree.
//!
//! The index is a flat set of identifiers (file names without their
//! extension) collected once at startup. It is never updated during a run:
//! images saved by the current run are not added back, so the same
//! identifier found on two different pages is downloaded twice.
//!
//! # Example
//!
//! ```no_run
//! use harvester_core::index::DedupIndex;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let index = DedupIndex::build(Path::new("./images/cache")).await?;
//! if index.contains("pexels-photo-1234") {
//!     println!("already cached");
//! }
//! # Ok(())
//! # }
//! ```

mod error;

pub use error::IndexError;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, instrument, trace};

/// Maximum number of directories listed at the same time.
const MAX_CONCURRENT_SCANS: usize = 8;

/// Strips the trailing extension from a file name.
///
/// The extension is the last `.` followed by one or more characters that
/// are neither `.` nor `/`. Names without such a suffix are returned as-is.
///
/// # Examples
///
/// ```
/// use harvester_core::trim_extension;
///
/// assert_eq!(trim_extension("pexels-photo-42.jpeg"), "pexels-photo-42");
/// assert_eq!(trim_extension("archive.tar.gz"), "archive.tar");
/// assert_eq!(trim_extension("no-extension"), "no-extension");
/// assert_eq!(trim_extension("trailing."), "trailing.");
/// ```
#[must_use]
pub fn trim_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(dot) if dot + 1 < name.len() && !name[dot + 1..].contains('/') => &name[..dot],
        _ => name,
    }
}

/// Set of identifiers already present on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupIndex {
    identifiers: HashSet<String>,
}

/// Result of listing a single directory.
#[derive(Debug, Default)]
struct Listing {
    files: Vec<String>,
    subdirs: Vec<PathBuf>,
}

impl DedupIndex {
    /// Builds the index by recursively listing `root`.
    ///
    /// Every non-directory entry contributes its name with the extension
    /// stripped. Subdirectories are listed concurrently under a small fixed
    /// fan-out and every scan is joined before this function returns.
    ///
    /// Symlinks are followed. Each directory is listed once by canonical
    /// path, so a link back up the tree ends the walk instead of looping.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] if any directory in the tree cannot be listed
    /// or any entry cannot be inspected. Pending scans are aborted.
    #[instrument(fields(root = %root.display()))]
    pub async fn build(root: &Path) -> Result<Self, IndexError> {
        let limiter = Arc::new(Semaphore::new(MAX_CONCURRENT_SCANS));
        let mut scans = JoinSet::new();
        let mut identifiers = HashSet::new();
        let mut visited = HashSet::new();

        let root = tokio::fs::canonicalize(root)
            .await
            .map_err(|e| IndexError::read_dir(root, e))?;
        visited.insert(root.clone());
        spawn_scan(&mut scans, &limiter, root);

        while let Some(joined) = scans.join_next().await {
            let listing = joined.map_err(|source| IndexError::ScanTask { source })??;

            identifiers.extend(
                listing
                    .files
                    .iter()
                    .map(|name| trim_extension(name))
                    .filter(|id| !id.is_empty())
                    .map(str::to_string),
            );

            for dir in listing.subdirs {
                if visited.insert(dir.clone()) {
                    spawn_scan(&mut scans, &limiter, dir);
                } else {
                    trace!(dir = %dir.display(), "directory already scanned");
                }
            }
        }

        debug!(
            directories = visited.len(),
            identifiers = identifiers.len(),
            "dedup index built"
        );

        Ok(Self { identifiers })
    }

    /// Creates an index from an explicit set of identifiers.
    #[must_use]
    pub fn from_identifiers<I, S>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            identifiers: identifiers.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true if `identifier` was present at build time.
    #[must_use]
    pub fn contains(&self, identifier: &str) -> bool {
        self.identifiers.contains(identifier)
    }

    /// Returns the number of distinct identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    /// Returns true if the index holds no identifiers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }

    /// Iterates over the identifiers in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.identifiers.iter().map(String::as_str)
    }
}

fn spawn_scan(
    scans: &mut JoinSet<Result<Listing, IndexError>>,
    limiter: &Arc<Semaphore>,
    dir: PathBuf,
) {
    let limiter = Arc::clone(limiter);
    scans.spawn(async move {
        let _permit = limiter
            .acquire_owned()
            .await
            .map_err(|_| IndexError::LimiterClosed)?;
        scan_directory(&dir).await
    });
}

/// Lists one directory, splitting entries into file names and subdirectories.
///
/// Symlinks are followed: a link to a file is indexed under the link's own
/// name, and a link to a directory is reported by its canonical target.
async fn scan_directory(dir: &Path) -> Result<Listing, IndexError> {
    trace!(dir = %dir.display(), "scanning directory");

    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| IndexError::read_dir(dir, e))?;
    let mut listing = Listing::default();

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| IndexError::read_dir(dir, e))?
    {
        let path = entry.path();
        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| IndexError::metadata(&path, e))?;

        if metadata.is_dir() {
            let target = tokio::fs::canonicalize(&path)
                .await
                .map_err(|e| IndexError::metadata(&path, e))?;
            listing.subdirs.push(target);
        } else {
            listing
                .files
                .push(entry.file_name().to_string_lossy().into_owned());
        }
    }

    Ok(listing)
}
