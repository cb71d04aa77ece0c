//! Scoped scratch files for backends that compile from disk.
//!
//! A `ScopedFile` owns one source file and every auxiliary file a LaTeX run leaves
//! next to it. Dropping the guard removes all of them, whatever happened in between.
//! Cleanup failures are logged and swallowed so they never replace the real outcome.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, warn};

/// Extensions removed alongside the primary file on scope exit.
pub const AUXILIARY_EXTENSIONS: &[&str] = &[
    "aux",
    "log",
    "fls",
    "fdb_latexmk",
    "synctex.gz",
    "out",
    "pdf",
];

/// A uniquely named file that is deleted, with its siblings, when dropped.
#[derive(Debug)]
pub struct ScopedFile {
    path: PathBuf,
    dir: PathBuf,
    stem: String,
    extension: String,
}

impl ScopedFile {
    /// Creates `base_dir` if needed and writes `content` to
    /// `<prefix><timestamp>.<extension>` inside it.
    pub async fn create(
        base_dir: &Path,
        name_prefix: &str,
        extension: &str,
        content: &str,
    ) -> io::Result<Self> {
        tokio::fs::create_dir_all(base_dir).await?;

        let stem = format!("{name_prefix}{}", Utc::now().format("%Y%m%d%H%M%S%9f"));
        let extension = extension.trim_start_matches('.').to_string();
        let path = base_dir.join(format!("{stem}.{extension}"));

        // Guard exists before the write so a partial file is still removed.
        let scoped = Self {
            path,
            dir: base_dir.to_path_buf(),
            stem,
            extension,
        };
        tokio::fs::write(&scoped.path, content).await?;
        debug!("Scratch file created: {}", scoped.path.display());
        Ok(scoped)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of a sibling sharing this file's stem, e.g. `sibling("pdf")`.
    pub fn sibling(&self, extension: &str) -> PathBuf {
        self.dir.join(format!("{}.{extension}", self.stem))
    }

    fn cleanup_targets(&self) -> Vec<PathBuf> {
        let mut targets = vec![self.path.clone()];
        targets.extend(
            AUXILIARY_EXTENSIONS
                .iter()
                .filter(|ext| **ext != self.extension)
                .map(|ext| self.sibling(ext)),
        );
        targets
    }
}

impl Drop for ScopedFile {
    fn drop(&mut self) {
        for target in self.cleanup_targets() {
            match std::fs::remove_file(&target) {
                Ok(()) => debug!("Removed scratch file {}", target.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove scratch file {}: {e}", target.display()),
            }
        }
    }
}

/// Runs `work` with the path of a freshly written scratch file and removes the file
/// and its siblings before returning `work`'s result.
pub async fn with_scoped_file<F, Fut, T>(
    base_dir: &Path,
    name_prefix: &str,
    extension: &str,
    content: &str,
    work: F,
) -> io::Result<T>
where
    F: FnOnce(PathBuf) -> Fut,
    Fut: Future<Output = T>,
{
    let scoped = ScopedFile::create(base_dir, name_prefix, extension, content).await?;
    let result = work(scoped.path().to_path_buf()).await;
    drop(scoped);
    Ok(result)
}
