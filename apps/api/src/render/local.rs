//! Local compiler backend — runs a LaTeX binary against a scratch file.
//!
//! The source, the PDF and every auxiliary file live inside one scoped scratch file, so
//! nothing is left in the scratch directory whether the compiler succeeds, fails,
//! times out or cannot be started.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::process::Command;
use tracing::{debug, warn};
use url::Url;

use crate::document::Document;
use crate::render::backend::{excerpt, BackendFailure, RenderBackend, ResponseShape};
use crate::scratch::with_scoped_file;

const SOURCE_PREFIX: &str = "resume_";
const SOURCE_EXTENSION: &str = "tex";

#[derive(Debug, Clone)]
pub struct LocalLatexBackend {
    command: String,
    scratch_dir: PathBuf,
    timeout: Duration,
    shape: ResponseShape,
}

impl LocalLatexBackend {
    pub fn new(command: impl Into<String>, scratch_dir: PathBuf, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            scratch_dir,
            timeout,
            shape: ResponseShape::RawBinary,
        }
    }

    async fn compile(&self, source: &Path) -> Result<Bytes, BackendFailure> {
        // The compiler runs inside the scratch dir, so paths handed to it are relative
        // to that dir even when SCRATCH_DIR itself is relative.
        let dir = match source.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let file_name = source.file_name().ok_or_else(|| {
            BackendFailure::Compiler(format!("scratch path {} has no file name", source.display()))
        })?;
        debug!("Compiling {} with '{}'", source.display(), self.command);

        let mut cmd = Command::new(&self.command);
        cmd.arg("-interaction=nonstopmode")
            .arg("-halt-on-error")
            .arg("-output-directory=.")
            .arg(file_name)
            .current_dir(dir)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| {
                BackendFailure::Compiler(format!(
                    "'{}' timed out after {}s",
                    self.command,
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| BackendFailure::Compiler(format!("failed to start '{}': {e}", self.command)))?;

        if output.status.success() {
            let pdf = tokio::fs::read(source.with_extension("pdf"))
                .await
                .map_err(|e| BackendFailure::Compiler(format!("compiler produced no PDF: {e}")))?;
            return Ok(Bytes::from(pdf));
        }

        // pdflatex prints the interesting part (the `!` line) near the end of stdout.
        let stdout = String::from_utf8_lossy(&output.stdout);
        let error_line = stdout
            .lines()
            .find(|l| l.starts_with('!'))
            .unwrap_or_else(|| stdout.lines().last().unwrap_or_default());
        Err(BackendFailure::Compiler(format!(
            "'{}' exited with {}: {}",
            self.command,
            output.status,
            excerpt(error_line)
        )))
    }
}

#[async_trait]
impl RenderBackend for LocalLatexBackend {
    fn name(&self) -> &str {
        "local"
    }

    fn response_shape(&self) -> &ResponseShape {
        &self.shape
    }

    async fn submit(&self, document: &Document) -> Result<Bytes, BackendFailure> {
        with_scoped_file(
            &self.scratch_dir,
            SOURCE_PREFIX,
            SOURCE_EXTENSION,
            document.as_str(),
            |source| async move { self.compile(&source).await },
        )
        .await
        .map_err(|e| {
            warn!("Could not stage scratch file in {}: {e}", self.scratch_dir.display());
            BackendFailure::Compiler(format!("could not write scratch file: {e}"))
        })?
    }

    async fn fetch(&self, url: &Url) -> Result<Bytes, BackendFailure> {
        Err(BackendFailure::Unsupported(format!(
            "local backend cannot fetch {url}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_entries(dir: &std::path::Path) -> usize {
        std::fs::read_dir(dir).map(|rd| rd.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn test_missing_compiler_fails_and_leaves_no_files() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = LocalLatexBackend::new(
            "definitely-not-a-latex-binary",
            tmp.path().to_path_buf(),
            Duration::from_secs(5),
        );

        let err = backend
            .submit(&Document::from("\\documentclass{article}\\end{document}"))
            .await
            .unwrap_err();

        match err {
            BackendFailure::Compiler(reason) => assert!(reason.contains("failed to start")),
            other => panic!("expected Compiler failure, got {other:?}"),
        }
        assert_eq!(scratch_entries(tmp.path()), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_compiler_reports_exit_and_cleans_up() {
        let tmp = tempfile::tempdir().unwrap();
        // `false` ignores its arguments and exits 1, like a LaTeX run that halts.
        let backend = LocalLatexBackend::new("false", tmp.path().to_path_buf(), Duration::from_secs(5));

        let err = backend
            .submit(&Document::from("\\documentclass{article}\\end{document}"))
            .await
            .unwrap_err();

        assert!(matches!(err, BackendFailure::Compiler(ref r) if r.contains("exited with")));
        assert_eq!(scratch_entries(tmp.path()), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_run_without_pdf_is_a_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = LocalLatexBackend::new("true", tmp.path().to_path_buf(), Duration::from_secs(5));

        let err = backend
            .submit(&Document::from("\\documentclass{article}\\end{document}"))
            .await
            .unwrap_err();

        assert!(matches!(err, BackendFailure::Compiler(ref r) if r.contains("no PDF")));
        assert_eq!(scratch_entries(tmp.path()), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_relative_scratch_dir_compiles() {
        use std::os::unix::fs::PermissionsExt;

        // Stand-in compiler: needs its last argument to exist relative to its cwd and
        // writes `<stem>.pdf` next to it, like pdflatex with -output-directory=.
        let bin = tempfile::tempdir().unwrap();
        let script = bin.path().join("fake-pdflatex");
        std::fs::write(
            &script,
            "#!/bin/sh\n\
             for last; do :; done\n\
             [ -f \"$last\" ] || { echo \"! I can't find file $last\"; exit 1; }\n\
             out=\"${last%.tex}.pdf\"\n\
             printf '%%PDF-1.5\\n' > \"$out\"\n\
             i=0; while [ $i -lt 40 ]; do printf '%050d\\n' 0 >> \"$out\"; i=$((i+1)); done\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        // Created in the process cwd, then addressed by its bare name.
        let scratch = tempfile::tempdir_in(".").unwrap();
        let relative = PathBuf::from(scratch.path().file_name().unwrap());
        assert!(relative.is_relative());
        let backend = LocalLatexBackend::new(
            script.to_string_lossy(),
            relative.clone(),
            Duration::from_secs(5),
        );

        let pdf = backend
            .submit(&Document::from("\\documentclass{article}\\end{document}"))
            .await
            .unwrap();

        assert!(pdf.starts_with(b"%PDF"));
        assert!(pdf.len() > 1000);
        assert_eq!(scratch_entries(&relative), 0);
    }

    #[tokio::test]
    async fn test_fetch_is_unsupported() {
        let backend = LocalLatexBackend::new("pdflatex", PathBuf::from("/tmp"), Duration::from_secs(1));
        let url = Url::parse("https://example.com/x.pdf").unwrap();
        assert!(matches!(
            backend.fetch(&url).await,
            Err(BackendFailure::Unsupported(_))
        ));
    }
}
